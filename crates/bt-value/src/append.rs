//! Producer に値ツリーを追記する拡張トレイト
//!
//! 入れ子の list/dict は子 Producer を開いて再帰的に書き込む。
//!
//! 途中の要素で失敗した場合、それまでに書いた要素は残る（開いた子は閉じられるので
//! 出力は有効な bt データのまま）。全体を書くか何も書かないかを保証したいときは、
//! 先に [`BtValue::encoded_len`](crate::BtValue::encoded_len) で容量を確認するか、
//! [`BtValue::to_bytes`](crate::BtValue::to_bytes) の結果を `append_encoded` で埋め込む。

use bt_producer::{DictProducer, ListProducer, ProducerError};

use crate::BtValue;

/// [`ListProducer`] に [`BtValue`] を追記する
pub trait ListExt {
    /// `value` を 1 要素として追記する
    ///
    /// # エラー
    /// 入れ子の途中で失敗すると、部分的に埋まった子 list/dict が閉じた状態で残る。
    fn append_value(&mut self, value: &BtValue) -> Result<(), ProducerError>;
}

/// [`DictProducer`] に [`BtValue`] を追記する
pub trait DictExt {
    /// `value` を `key` の値として追記する
    ///
    /// # エラー
    /// スカラー値と `key` は 1 回の書き込みで追記する。入れ子の途中で失敗した場合は
    /// `key` と部分的に埋まった子が閉じた状態で残る。
    fn append_value<K: AsRef<[u8]>>(&mut self, key: K, value: &BtValue)
        -> Result<(), ProducerError>;
}

impl ListExt for ListProducer<'_, '_> {
    fn append_value(&mut self, value: &BtValue) -> Result<(), ProducerError> {
        match value {
            BtValue::Bytes(b) => self.append(b.as_slice()),
            BtValue::UInt(v) => self.append(*v),
            BtValue::Int(v) => self.append(*v),
            BtValue::List(items) => {
                let mut sub = self.append_list()?;
                for item in items {
                    sub.append_value(item)?;
                }
                sub.finish()
            }
            BtValue::Dict(map) => {
                let mut sub = self.append_dict()?;
                for (k, v) in map {
                    sub.append_value(k, v)?;
                }
                sub.finish()
            }
        }
    }
}

impl DictExt for DictProducer<'_, '_> {
    fn append_value<K: AsRef<[u8]>>(
        &mut self,
        key: K,
        value: &BtValue,
    ) -> Result<(), ProducerError> {
        match value {
            BtValue::Bytes(b) => self.append(key, b.as_slice()),
            BtValue::UInt(v) => self.append(key, *v),
            BtValue::Int(v) => self.append(key, *v),
            BtValue::List(items) => {
                let mut sub = self.append_list(key)?;
                for item in items {
                    sub.append_value(item)?;
                }
                sub.finish()
            }
            BtValue::Dict(map) => {
                let mut sub = self.append_dict(key)?;
                for (k, v) in map {
                    sub.append_value(k, v)?;
                }
                sub.finish()
            }
        }
    }
}
