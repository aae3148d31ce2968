//! # bt-value
//!
//! bt データの値ツリー [`BtValue`] と、それを `bt-producer` の Producer に書き込む拡張トレイト。
//!
//! 値ツリーは構築・テスト用で、エンコードは常に Producer を経由する。
//! 大きなデータを組み立てる場合は Producer に直接追記する方が中間ツリーを作らずに済む。
//!
//! ```
//! use bt_value::{BtValue, ListExt};
//! use bt_producer::ListProducer;
//!
//! let value: BtValue = [("a", BtValue::from(1u8)), ("b", BtValue::from("x"))]
//!     .into_iter()
//!     .collect();
//! assert_eq!(value.to_bytes()?, b"d1:ai1e1:b1:xe");
//!
//! let mut list = ListProducer::new();
//! list.append_value(&value)?;
//! assert_eq!(list.take_bytes()?, b"ld1:ai1e1:b1:xee");
//! # Ok::<(), bt_producer::ProducerError>(())
//! ```

#![no_std]
extern crate alloc;

mod append;
mod value;

pub use append::{DictExt, ListExt};
pub use value::BtValue;
