//! dict Producer
//!
//! キーは呼び出し側が昇順に追記する。Producer はキーをソートしない。
//! `Validation::Strict`（デフォルト）では直前のキー以下のキーを
//! `IllegalState(UnorderedKey)` で拒否し、出力は変更しない。
//!
//! ```text
//! d <len>:<key> <value> <len>:<key> <value> ... e
//! ```

use alloc::vec::Vec;

use crate::encoder::Encoder;
use crate::error::{ProducerError, StateError};
use crate::list::ListProducer;
use crate::scalar::BtScalar;
use crate::{Config, Validation};

/// キーを `<len>:<key>` の断片にする
fn key_parts<'a>(digits: &'a mut itoa::Buffer, key: &'a [u8]) -> [&'a [u8]; 3] {
    [digits.format(key.len()).as_bytes(), b":", key]
}

/// キーと値の断片をまとめて 1 回で書き込む
fn emit_pair<'a>(
    enc: &mut Encoder<'_>,
    key: &[&'a [u8]],
    value: &[&'a [u8]],
) -> Result<(), ProducerError> {
    let total = key.len() + value.len();
    if total <= 6 {
        let empty: &[u8] = &[];
        let mut parts = [empty; 6];
        parts[..key.len()].copy_from_slice(key);
        parts[key.len()..total].copy_from_slice(value);
        enc.emit(&parts[..total])
    } else {
        let joined: Vec<&[u8]> = key.iter().chain(value).copied().collect();
        enc.emit(&joined)
    }
}

/// bt dict を出力バッファに直接書き込む Producer
///
/// 生成した時点で `de` が書かれ、以後どの追記の後でも出力は閉じた有効な bt データになる。
/// ライフタイムは [`ListProducer`] と同じ。
pub struct DictProducer<'p, 'b> {
    list: ListProducer<'p, 'b>,
    /// 最後に書いたキー（Strict のときのみ記録）
    last_key: Option<Vec<u8>>,
}

impl DictProducer<'static, 'static> {
    /// 内部の伸長可能なバッファに書き込む dict Producer を生成する
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// 設定を指定して Owned モードの dict Producer を生成する
    pub fn with_config(config: Config) -> Self {
        DictProducer::from_list(ListProducer::owned_root(b'd', config))
    }
}

impl Default for DictProducer<'static, 'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> DictProducer<'b, 'b> {
    /// 呼び出し側のバッファ `buf` に書き込む dict Producer を生成する
    ///
    /// # エラー
    /// - `CapacityExceeded`: `buf` が `de`（2 バイト）を保持できない
    pub fn with_buffer(buf: &'b mut [u8]) -> Result<Self, ProducerError> {
        Self::with_buffer_config(buf, Config::default())
    }

    /// 設定を指定して外部バッファモードの dict Producer を生成する
    pub fn with_buffer_config(buf: &'b mut [u8], config: Config) -> Result<Self, ProducerError> {
        Ok(DictProducer::from_list(ListProducer::external_root(
            buf, b'd', config,
        )?))
    }
}

impl<'p, 'b> DictProducer<'p, 'b> {
    pub(crate) fn from_list(list: ListProducer<'p, 'b>) -> Self {
        DictProducer {
            list,
            last_key: None,
        }
    }

    /// 子の有無とキー順序を確認する（出力は変更しない）
    pub(crate) fn check_key(&self, key: &[u8]) -> Result<(), ProducerError> {
        self.list.check_innermost()?;
        if self.list.validation() == Validation::Strict {
            if let Some(last) = &self.last_key {
                if key <= last.as_slice() {
                    log::warn!(
                        "bt: dict key {:?} is not greater than previous key {:?}",
                        key,
                        last
                    );
                    return Err(StateError::UnorderedKey.into());
                }
            }
        }
        Ok(())
    }

    /// 値を書いた後に呼ぶ
    fn remember(last_key: &mut Option<Vec<u8>>, validation: Validation, key: &[u8]) {
        if validation == Validation::Strict {
            let slot = last_key.get_or_insert_with(Vec::new);
            slot.clear();
            slot.extend_from_slice(key);
        }
    }

    /// キーと値を 1 組追記する
    ///
    /// `value` が `None` の場合はキーも含めて何も書かない。
    /// キーと値は 1 回の書き込みで行うので、容量不足で失敗しても値のないキーは残らない。
    ///
    /// # エラー
    /// - `IllegalState(ChildActive)`: 子 list/dict が開いたまま
    /// - `IllegalState(UnorderedKey)`: キーが直前のキー以下（Strict のみ）
    /// - `CapacityExceeded`: 外部バッファに収まらない
    pub fn append<K, V>(&mut self, key: K, value: V) -> Result<(), ProducerError>
    where
        K: AsRef<[u8]>,
        V: BtScalar,
    {
        if value.is_absent() {
            return Ok(());
        }
        let key = key.as_ref();
        self.check_key(key)?;

        let mut digits = itoa::Buffer::new();
        let kp = key_parts(&mut digits, key);
        let enc = self.list.enc_mut();
        value.with_parts(|vp| emit_pair(enc, &kp, vp))?;

        let validation = self.list.validation();
        Self::remember(&mut self.last_key, validation, key);
        Ok(())
    }

    /// キーと値の組を順に追記する
    ///
    /// 途中で失敗した場合、そこまでの組は閉じた状態で残る。
    pub fn extend<I, K, V>(&mut self, pairs: I) -> Result<(), ProducerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: BtScalar,
    {
        for (key, value) in pairs {
            self.append(key, value)?;
        }
        Ok(())
    }

    /// `key` の値として子 list を開く
    pub fn append_list<K: AsRef<[u8]>>(
        &mut self,
        key: K,
    ) -> Result<ListProducer<'_, 'b>, ProducerError> {
        let key = key.as_ref();
        self.check_key(key)?;
        let validation = self.list.validation();

        let mut digits = itoa::Buffer::new();
        let kp = key_parts(&mut digits, key);
        let child = self.list.open_child(&kp, b'l')?;
        Self::remember(&mut self.last_key, validation, key);
        Ok(child)
    }

    /// `key` の値として子 dict を開く
    pub fn append_dict<K: AsRef<[u8]>>(
        &mut self,
        key: K,
    ) -> Result<DictProducer<'_, 'b>, ProducerError> {
        let key = key.as_ref();
        self.check_key(key)?;
        let validation = self.list.validation();

        let mut digits = itoa::Buffer::new();
        let kp = key_parts(&mut digits, key);
        let child = self.list.open_child(&kp, b'd')?;
        Self::remember(&mut self.last_key, validation, key);
        Ok(DictProducer::from_list(child))
    }

    /// `key` の値として `items` を要素とする list を追記する
    pub fn append_list_from<K, I>(&mut self, key: K, items: I) -> Result<(), ProducerError>
    where
        K: AsRef<[u8]>,
        I: IntoIterator,
        I::Item: BtScalar,
    {
        self.append_list(key)?.extend(items)
    }

    /// `key` の値としてエンコード済みの bt 値をそのまま追記する
    ///
    /// 検査は [`ListProducer::append_encoded`] と同じ。
    pub fn append_encoded<K: AsRef<[u8]>>(
        &mut self,
        key: K,
        encoded: &[u8],
    ) -> Result<(), ProducerError> {
        let key = key.as_ref();
        self.check_key(key)?;
        let validation = self.list.validation();
        if validation == Validation::Strict && !crate::encoded::is_valid(encoded) {
            log::warn!(
                "bt: rejected {} bytes of invalid pre-encoded data for key {:?}",
                encoded.len(),
                key
            );
            return Err(StateError::InvalidEncoded.into());
        }

        let mut digits = itoa::Buffer::new();
        let kp = key_parts(&mut digits, key);
        emit_pair(self.list.enc_mut(), &kp, &[encoded])?;
        Self::remember(&mut self.last_key, validation, key);
        Ok(())
    }

    /// この dict のバイト列（末尾の終端 `e` を含む）
    pub fn view(&self) -> &[u8] {
        self.list.view()
    }

    /// 署名対象となるバイト列: `view()` から最後の終端 `e` を除いたもの
    pub fn view_for_signing(&self) -> &[u8] {
        self.list.view_for_signing()
    }

    /// この dict の終端 `e` の次のオフセット
    pub fn end(&self) -> usize {
        self.list.end()
    }

    /// ルートから見た書き込み済みバイト列全体
    pub fn output(&self) -> &[u8] {
        self.list.output()
    }

    /// 最後に書いたキー（`Validation::Unchecked` では常に `None`）
    pub fn last_key(&self) -> Option<&[u8]> {
        self.last_key.as_deref()
    }

    pub fn is_root(&self) -> bool {
        self.list.is_root()
    }

    pub fn is_external(&self) -> bool {
        self.list.is_external()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.list.capacity()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.list.reserve(additional);
    }

    /// 出力を取り出し、この Producer を空の dict（`de`）に戻す
    ///
    /// エラー条件は [`ListProducer::take_bytes`] と同じ。
    pub fn take_bytes(&mut self) -> Result<Vec<u8>, ProducerError> {
        let out = self.list.take_bytes()?;
        self.last_key = None;
        Ok(out)
    }

    /// このスコープを閉じる（[`ListProducer::finish`] を参照）
    pub fn finish(self) -> Result<(), ProducerError> {
        self.list.finish()
    }
}
