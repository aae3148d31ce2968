//! 署名フック
//!
//! ここまでに書いたデータ（終端 `e` を除く）を署名関数に渡し、
//! 返された署名を次の要素として追記する。
//!
//! ```text
//! l i1e i2e        ← 署名関数に渡る範囲
//! l i1e i2e 3:SIG e
//! ```
//!
//! dict では署名を [`SIGNATURE_KEY`](crate::SIGNATURE_KEY) のような、
//! 他のどのキーよりも後ろに並ぶキーに置くのが慣例。

use alloc::string::ToString;
use core::fmt::Display;

use crate::dict::DictProducer;
use crate::error::ProducerError;
use crate::list::ListProducer;

impl<'p, 'b> ListProducer<'p, 'b> {
    /// `view_for_signing()` を `sign` に渡し、返されたバイト列を文字列として追記する
    ///
    /// # エラー
    /// - `IllegalState(ChildActive)`: 子 list/dict が開いたまま（`sign` は呼ばれない）
    /// - `CapacityExceeded`: 署名が外部バッファに収まらない
    pub fn append_signature<F, S>(&mut self, sign: F) -> Result<(), ProducerError>
    where
        F: FnOnce(&[u8]) -> S,
        S: AsRef<[u8]>,
    {
        self.check_innermost()?;
        let signature = sign(self.view_for_signing());
        self.append(signature.as_ref())
    }

    /// 失敗しうる署名関数を使う `append_signature()`
    ///
    /// `sign` が `Err` を返した場合は何も追記せず、`ProducerError::Signer` を返す。
    pub fn try_append_signature<F, S, E>(&mut self, sign: F) -> Result<(), ProducerError>
    where
        F: FnOnce(&[u8]) -> Result<S, E>,
        S: AsRef<[u8]>,
        E: Display,
    {
        self.check_innermost()?;
        let signature = sign(self.view_for_signing()).map_err(|e| {
            log::error!("bt: signer failed: {}", e);
            ProducerError::Signer(e.to_string())
        })?;
        self.append(signature.as_ref())
    }
}

impl<'p, 'b> DictProducer<'p, 'b> {
    /// `view_for_signing()` を `sign` に渡し、返された署名を `key` の値として追記する
    ///
    /// キー順序の確認は `sign` を呼ぶ前に行う。
    pub fn append_signature<K, F, S>(&mut self, key: K, sign: F) -> Result<(), ProducerError>
    where
        K: AsRef<[u8]>,
        F: FnOnce(&[u8]) -> S,
        S: AsRef<[u8]>,
    {
        let key = key.as_ref();
        self.check_key(key)?;
        let signature = sign(self.view_for_signing());
        self.append(key, signature.as_ref())
    }

    /// 失敗しうる署名関数を使う `append_signature()`
    pub fn try_append_signature<K, F, S, E>(
        &mut self,
        key: K,
        sign: F,
    ) -> Result<(), ProducerError>
    where
        K: AsRef<[u8]>,
        F: FnOnce(&[u8]) -> Result<S, E>,
        S: AsRef<[u8]>,
        E: Display,
    {
        let key = key.as_ref();
        self.check_key(key)?;
        let signature = sign(self.view_for_signing()).map_err(|e| {
            log::error!("bt: signer failed for key {:?}: {}", key, e);
            ProducerError::Signer(e.to_string())
        })?;
        self.append(key, signature.as_ref())
    }
}
