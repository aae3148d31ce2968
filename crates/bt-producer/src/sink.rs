//! 出力バッファ（Sink）
//!
//! Producer の書き込み先は次の 2 種類:
//!
//! ```text
//! Owned    : Vec<u8>      内部で管理し、必要に応じて伸長する
//! External : &mut [u8]    呼び出し側が渡した固定長バッファ。伸長・移動しない
//! ```
//!
//! どちらのモードかの判定はこのモジュールの中だけで行う。

use alloc::vec::Vec;

use crate::error::ProducerError;

/// list/dict を閉じる終端バイト
pub(crate) const END: u8 = b'e';

pub(crate) enum Sink<'b> {
    /// 伸長可能な内部バッファ
    Owned(Vec<u8>),
    /// 呼び出し側の固定長バッファ
    External(&'b mut [u8]),
}

impl<'b> Sink<'b> {
    /// `at` の位置に `parts` を順に書き込み、その直後に `ends` 個の終端バイトを書く
    ///
    /// `at` 以降にあった終端バイト列は上書きされる。
    /// 外部バッファでは、終端バイトまで含めて収まることを確認してから書き込むため、
    /// 容量不足で失敗した場合バッファは一切変更されない。
    ///
    /// # 戻り値
    /// 書き込んだペイロードのバイト数（終端バイトは含まない）
    pub(crate) fn write(
        &mut self,
        at: usize,
        parts: &[&[u8]],
        ends: usize,
    ) -> Result<usize, ProducerError> {
        let len: usize = parts.iter().map(|p| p.len()).sum();

        match self {
            Sink::Owned(buf) => {
                // 前回書いた終端バイト列を捨ててから追記する
                buf.truncate(at);
                buf.reserve(len + ends);
                for part in parts {
                    buf.extend_from_slice(part);
                }
                buf.resize(at + len + ends, END);
            }
            Sink::External(buf) => {
                let needed = at.saturating_add(len).saturating_add(ends);
                if needed > buf.len() {
                    return Err(ProducerError::CapacityExceeded {
                        needed,
                        capacity: buf.len(),
                    });
                }
                let mut pos = at;
                for part in parts {
                    buf[pos..pos + part.len()].copy_from_slice(part);
                    pos += part.len();
                }
                buf[pos..needed].fill(END);
            }
        }

        Ok(len)
    }

    /// バッファ全体（外部バッファでは未使用領域を含む）
    pub(crate) fn bytes(&self) -> &[u8] {
        match self {
            Sink::Owned(buf) => buf,
            Sink::External(buf) => buf,
        }
    }

    /// 外部バッファモードか
    pub(crate) fn is_external(&self) -> bool {
        matches!(self, Sink::External(_))
    }

    /// 外部バッファの長さ（Owned モードでは `None`）
    pub(crate) fn capacity(&self) -> Option<usize> {
        match self {
            Sink::Owned(_) => None,
            Sink::External(buf) => Some(buf.len()),
        }
    }

    /// Owned モードで容量を確保する（外部バッファでは何もしない）
    pub(crate) fn reserve(&mut self, additional: usize) {
        if let Sink::Owned(buf) = self {
            buf.reserve(additional);
        }
    }

    /// Owned モードのバッファを取り出し、`leave` を新しい内容として残す
    ///
    /// 外部バッファモードでは `None` を返し、何も変更しない。
    pub(crate) fn replace_owned(&mut self, leave: &[u8]) -> Option<Vec<u8>> {
        match self {
            Sink::Owned(buf) => {
                let mut fresh = Vec::with_capacity(leave.len());
                fresh.extend_from_slice(leave);
                Some(core::mem::replace(buf, fresh))
            }
            Sink::External(_) => None,
        }
    }
}
