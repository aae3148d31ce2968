//! # bt-producer
//!
//! bt エンコード（bencode 互換）の list/dict を、出力バッファへ直接ストリーミングで書き込むクレート。
//! 中間の値ツリーを作らず、どの追記の直後でもバッファは閉じた有効な bt データになっている。
//! `no_std` + `alloc` 環境（WASM を含む）で動作する。
//!
//! ## bt エンコード
//!
//! ```text
//! integer := "i" <10 進数> "e"              例: i42e, i-3e
//! string  := <10 進の長さ> ":" <バイト列>    例: 3:abc, 0:
//! list    := "l" <value>* "e"               例: li1e2:abe
//! dict    := "d" (<string> <value>)* "e"    例: d1:ai1e1:b1:xe（キーはバイト順で昇順）
//! ```
//!
//! ## 逐次終端（incremental closing）
//!
//! 開いているスコープの数だけ `e` を常に末尾に書いておき、
//! 次の追記はその `e` の位置から上書きする。
//!
//! ```text
//! ListProducer::new()      → le
//! append(1)                → li1ee
//! append_list()            → li1elee
//!   (子) append("ab")      → li1el2:abee
//! 子を drop                 → li1el2:abee   (カーソルが子の e の後ろに進むだけ)
//! append(3)                → li1el2:abei3ee
//! ```
//!
//! ## 出力先
//!
//! - Owned: `ListProducer::new()` / `DictProducer::new()`。内部の `Vec<u8>` に書き込み、
//!   `take_bytes()` で取り出す
//! - External: `with_buffer(&mut buf)`。固定長バッファに書き込み、収まらない追記は
//!   `CapacityExceeded` で失敗する（バッファは変更されない）

#![no_std]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod dict;
pub mod encoded;
mod encoder;
mod error;
mod list;
mod scalar;
mod signature;
mod sink;

pub use dict::DictProducer;
pub use encoded::is_valid;
pub use error::{ProducerError, StateError};
pub use list::ListProducer;
pub use scalar::BtScalar;

/// 署名を格納する dict キーの慣例値
///
/// `"~"`（0x7E）は ASCII の英数字キーよりも後ろに並ぶため、dict の最後の要素として追記できる。
pub const SIGNATURE_KEY: &str = "~";

/// 追記時の入力検査
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Validation {
    /// dict キーの昇順と `append_encoded()` の入力を検査する
    #[default]
    Strict,
    /// 検査しない（呼び出し側が正しさを保証する）
    Unchecked,
}

/// ルート Producer の設定
///
/// 子 Producer はルートの設定を引き継ぐ。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// 入力検査の方針
    pub validation: Validation,
    /// Owned モードで最初に確保するバッファ容量（バイト）
    pub reserve: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            validation: Validation::Strict,
            reserve: 64,
        }
    }
}

impl Config {
    /// 入力検査を無効にする
    pub fn unchecked(mut self) -> Self {
        self.validation = Validation::Unchecked;
        self
    }

    /// Owned モードの初期容量を設定する
    pub fn with_reserve(mut self, reserve: usize) -> Self {
        self.reserve = reserve;
        self
    }
}
