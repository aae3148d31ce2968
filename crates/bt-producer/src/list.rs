//! list Producer
//!
//! ## 使い方
//!
//! ```
//! use bt_producer::ListProducer;
//!
//! let mut list = ListProducer::new();
//! list.append(1)?;
//! {
//!     let mut sub = list.append_list()?;
//!     sub.append("ab")?;
//!     // この時点でも出力は閉じた有効な bt データ
//!     assert_eq!(sub.output(), b"li1el2:abee");
//! }
//! list.append(-3)?;
//! assert_eq!(list.take_bytes()?, b"li1el2:abei-3ee");
//! # Ok::<(), bt_producer::ProducerError>(())
//! ```

use alloc::vec::Vec;

use crate::dict::DictProducer;
use crate::encoded;
use crate::encoder::Encoder;
use crate::error::{ProducerError, StateError};
use crate::scalar::BtScalar;
use crate::{Config, Validation};

/// 共有状態への参照: ルートは所有し、子は親から可変借用する
pub(crate) enum Core<'p, 'b> {
    Root(Encoder<'b>),
    Nested(&'p mut Encoder<'b>),
}

impl<'p, 'b> Core<'p, 'b> {
    fn enc(&self) -> &Encoder<'b> {
        match self {
            Core::Root(enc) => enc,
            Core::Nested(enc) => enc,
        }
    }

    fn enc_mut(&mut self) -> &mut Encoder<'b> {
        match self {
            Core::Root(enc) => enc,
            Core::Nested(enc) => enc,
        }
    }
}

/// bt list を出力バッファに直接書き込む Producer
///
/// 生成した時点で `le` が書かれ、以後どの追記の後でも出力は閉じた有効な bt データになる。
///
/// ## ライフタイム
/// - `'b`: 外部バッファの借用期間（Owned モードでは `'static`）
/// - `'p`: 子 Producer が親から借用している期間（ルートでは `'b` または `'static`）
///
/// 子 list/dict は親を可変借用するので、子が生きている間は親を操作できない。
/// 子を drop すると（または `finish()` を呼ぶと）そのスコープが閉じ、親が再び使えるようになる。
pub struct ListProducer<'p, 'b> {
    core: Core<'p, 'b>,
    /// ネストの深さ（ルート = 0）
    level: usize,
}

impl ListProducer<'static, 'static> {
    /// 内部の伸長可能なバッファに書き込む list Producer を生成する
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// 設定を指定して Owned モードの list Producer を生成する
    pub fn with_config(config: Config) -> Self {
        ListProducer::owned_root(b'l', config)
    }

    pub(crate) fn owned_root(token: u8, config: Config) -> Self {
        ListProducer {
            core: Core::Root(Encoder::owned(token, config)),
            level: 0,
        }
    }
}

impl Default for ListProducer<'static, 'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'b> ListProducer<'b, 'b> {
    /// 呼び出し側のバッファ `buf` に書き込む list Producer を生成する
    ///
    /// バッファは伸長されない。書き込みがバッファ長を超える場合は
    /// `CapacityExceeded` を返し、バッファの内容は変更しない。
    ///
    /// # エラー
    /// - `CapacityExceeded`: `buf` が `le`（2 バイト）を保持できない
    pub fn with_buffer(buf: &'b mut [u8]) -> Result<Self, ProducerError> {
        Self::with_buffer_config(buf, Config::default())
    }

    /// 設定を指定して外部バッファモードの list Producer を生成する
    pub fn with_buffer_config(buf: &'b mut [u8], config: Config) -> Result<Self, ProducerError> {
        ListProducer::external_root(buf, b'l', config)
    }

    pub(crate) fn external_root(
        buf: &'b mut [u8],
        token: u8,
        config: Config,
    ) -> Result<Self, ProducerError> {
        Ok(ListProducer {
            core: Core::Root(Encoder::external(buf, token, config)?),
            level: 0,
        })
    }
}

impl<'p, 'b> ListProducer<'p, 'b> {
    pub(crate) fn enc_mut(&mut self) -> &mut Encoder<'b> {
        self.core.enc_mut()
    }

    pub(crate) fn check_innermost(&self) -> Result<(), ProducerError> {
        self.core.enc().check_innermost(self.level)
    }

    pub(crate) fn validation(&self) -> Validation {
        self.core.enc().config().validation
    }

    /// `lead` と開始トークンを書き、子スコープを開く
    pub(crate) fn open_child(
        &mut self,
        lead: &[&[u8]],
        token: u8,
    ) -> Result<ListProducer<'_, 'b>, ProducerError> {
        let level = self.level;
        let enc = self.core.enc_mut();
        enc.check_innermost(level)?;
        let child = enc.open(lead, token)?;
        Ok(ListProducer {
            core: Core::Nested(enc),
            level: child,
        })
    }

    /// 値を 1 つ追記する
    ///
    /// 整数は `i<10進>e`、`bool` は `i1e` / `i0e`、バイト列・文字列は `<長さ>:<バイト列>`。
    /// `None` を渡した場合は何も追記しない。
    ///
    /// # エラー
    /// - `IllegalState(ChildActive)`: 子 list/dict が開いたまま
    /// - `CapacityExceeded`: 外部バッファに収まらない
    pub fn append<T: BtScalar>(&mut self, value: T) -> Result<(), ProducerError> {
        let level = self.level;
        let enc = self.core.enc_mut();
        enc.check_innermost(level)?;
        value.with_parts(|parts| enc.emit(parts))
    }

    /// 要素を子 list を作らずにこの list へ順に追記する
    ///
    /// `append()` を繰り返すのと同じで、途中で失敗した場合もそこまでの要素は
    /// 閉じた状態で残る。
    pub fn extend<I>(&mut self, items: I) -> Result<(), ProducerError>
    where
        I: IntoIterator,
        I::Item: BtScalar,
    {
        for item in items {
            self.append(item)?;
        }
        Ok(())
    }

    /// 子 list を開く
    ///
    /// 返された子 Producer が drop されるまで、この list には追記できない。
    pub fn append_list(&mut self) -> Result<ListProducer<'_, 'b>, ProducerError> {
        self.open_child(&[], b'l')
    }

    /// 子 dict を開く
    ///
    /// 返された子 Producer が drop されるまで、この list には追記できない。
    pub fn append_dict(&mut self) -> Result<DictProducer<'_, 'b>, ProducerError> {
        let child = self.open_child(&[], b'd')?;
        Ok(DictProducer::from_list(child))
    }

    /// 子 list を開き、`items` をすべて追記して閉じる
    pub fn append_list_from<I>(&mut self, items: I) -> Result<(), ProducerError>
    where
        I: IntoIterator,
        I::Item: BtScalar,
    {
        self.append_list()?.extend(items)
    }

    /// エンコード済みの bt 値をそのまま追記する
    ///
    /// 一部のキーしか解釈できない署名付きデータを再エンコードせずに埋め込む用途を想定。
    /// `Validation::Strict` では完全な bt 値 1 つであることを確認してから書き込む。
    /// `Validation::Unchecked` では検査しないため、不正な入力は出力を壊す。
    ///
    /// # エラー
    /// - `IllegalState(InvalidEncoded)`: `encoded` が完全な bt 値ではない（Strict のみ）
    pub fn append_encoded(&mut self, encoded: &[u8]) -> Result<(), ProducerError> {
        self.check_innermost()?;
        if self.validation() == Validation::Strict && !encoded::is_valid(encoded) {
            log::warn!("bt: rejected {} bytes of invalid pre-encoded data", encoded.len());
            return Err(StateError::InvalidEncoded.into());
        }
        self.core.enc_mut().emit(&[encoded])
    }

    /// この list のバイト列（末尾の終端 `e` を含む）
    ///
    /// 子が開いている場合は、子の内容と子孫の終端もすべて含む。
    pub fn view(&self) -> &[u8] {
        self.core.enc().view(self.level)
    }

    /// 署名対象となるバイト列: `view()` から最後の終端 `e` を除いたもの
    ///
    /// 次に追記すると上書きされる `e` を含まないので、
    /// ここまでに追記したすべての要素をカバーする。
    pub fn view_for_signing(&self) -> &[u8] {
        let view = self.view();
        &view[..view.len() - 1]
    }

    /// この list の終端 `e` の次のオフセット
    ///
    /// ルートではエンコード済みデータの長さと一致するので、
    /// 外部バッファモードで `&buf[..end]` として結果を取り出せる。
    pub fn end(&self) -> usize {
        self.core.enc().end(self.level)
    }

    /// ルートから見た書き込み済みバイト列全体
    ///
    /// 子 Producer から呼んでも、ルートの先頭からのデータを返す。
    pub fn output(&self) -> &[u8] {
        self.core.enc().output()
    }

    /// ルート Producer か
    pub fn is_root(&self) -> bool {
        self.level == 0
    }

    /// 外部バッファに書き込んでいるか
    pub fn is_external(&self) -> bool {
        self.core.enc().is_external()
    }

    /// 外部バッファの長さ（Owned モードでは `None`）
    pub fn capacity(&self) -> Option<usize> {
        self.core.enc().capacity()
    }

    /// Owned モードで `additional` バイトの容量を確保する（外部バッファでは何もしない）
    pub fn reserve(&mut self, additional: usize) {
        self.core.enc_mut().reserve(additional);
    }

    /// 出力を取り出し、この Producer を空の list（`le`）に戻す
    ///
    /// # エラー
    /// - `IllegalState(NotRoot)`: 子 Producer で呼んだ
    /// - `IllegalState(ExternalBuffer)`: 外部バッファモード
    /// - `IllegalState(ChildActive)`: 子が閉じられていない
    pub fn take_bytes(&mut self) -> Result<Vec<u8>, ProducerError> {
        let level = self.level;
        self.core.enc_mut().take(level)
    }

    /// このスコープを閉じる
    ///
    /// drop と同じだが、閉じられていない子孫（`mem::forget` された子など）が
    /// 残っていた場合に `IllegalState(ChildActive)` を返す。
    /// その場合も子孫ごと閉じるので、出力は有効なまま。
    pub fn finish(self) -> Result<(), ProducerError> {
        let result = self.check_innermost();
        drop(self);
        result
    }
}

impl Drop for ListProducer<'_, '_> {
    fn drop(&mut self) {
        if let Core::Nested(enc) = &mut self.core {
            if !enc.close(self.level) {
                log::error!(
                    "bt: scope at level {} closed while a nested list/dict was still open",
                    self.level
                );
            }
        }
    }
}
