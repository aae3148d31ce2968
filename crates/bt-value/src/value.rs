//! 値ツリー

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use bt_producer::{BtScalar, Config, DictProducer, ListProducer, ProducerError};

use crate::append::{DictExt, ListExt};

/// bt で表現できる値
///
/// dict のキーは `BTreeMap` が保持するので、常にバイト順で昇順かつ重複しない。
/// 非負の整数は `UInt`、負の整数は `Int` で表すのが標準形（エンコード結果は同じ）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BtValue {
    Bytes(Vec<u8>),
    UInt(u64),
    Int(i64),
    List(Vec<BtValue>),
    Dict(BTreeMap<Vec<u8>, BtValue>),
}

impl BtValue {
    /// 空の list
    pub fn list() -> Self {
        BtValue::List(Vec::new())
    }

    /// 空の dict
    pub fn dict() -> Self {
        BtValue::Dict(BTreeMap::new())
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            BtValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[BtValue]> {
        match self {
            BtValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Vec<u8>, BtValue>> {
        match self {
            BtValue::Dict(map) => Some(map),
            _ => None,
        }
    }

    /// 整数値を `i128` として取り出す（`UInt` / `Int` のどちらでも）
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            BtValue::UInt(v) => Some(i128::from(*v)),
            BtValue::Int(v) => Some(i128::from(*v)),
            _ => None,
        }
    }

    /// エンコード後のバイト数
    pub fn encoded_len(&self) -> usize {
        match self {
            BtValue::Bytes(b) => b.as_slice().encoded_len(),
            BtValue::UInt(v) => v.encoded_len(),
            BtValue::Int(v) => v.encoded_len(),
            BtValue::List(items) => 2 + items.iter().map(BtValue::encoded_len).sum::<usize>(),
            BtValue::Dict(map) => {
                2 + map
                    .iter()
                    .map(|(k, v)| k.as_slice().encoded_len() + v.encoded_len())
                    .sum::<usize>()
            }
        }
    }

    /// スカラー値のトークンを `f` に渡す（list/dict では `None`）
    fn with_scalar_parts<R>(&self, f: impl FnOnce(&[&[u8]]) -> R) -> Option<R> {
        match self {
            BtValue::Bytes(b) => Some(b.with_parts(f)),
            BtValue::UInt(v) => Some(v.with_parts(f)),
            BtValue::Int(v) => Some(v.with_parts(f)),
            BtValue::List(_) | BtValue::Dict(_) => None,
        }
    }

    /// bt エンコードしたバイト列を返す
    ///
    /// `encoded_len()` ぶんの容量を先に確保してから Producer で書き込む。
    pub fn to_bytes(&self) -> Result<Vec<u8>, ProducerError> {
        let config = Config::default().with_reserve(self.encoded_len());
        match self {
            BtValue::List(items) => {
                let mut list = ListProducer::with_config(config);
                for item in items {
                    list.append_value(item)?;
                }
                list.take_bytes()
            }
            BtValue::Dict(map) => {
                let mut dict = DictProducer::with_config(config);
                for (key, value) in map {
                    dict.append_value(key, value)?;
                }
                dict.take_bytes()
            }
            scalar => Ok(scalar
                .with_scalar_parts(|parts| parts.concat())
                .unwrap_or_default()),
        }
    }

    /// 呼び出し側のバッファ `buf` の先頭に書き込み、書き込んだバイト数を返す
    ///
    /// # エラー
    /// - `CapacityExceeded`: `buf` に収まらない（失敗時点までの内容は閉じた状態で残る）
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, ProducerError> {
        match self {
            BtValue::List(items) => {
                let mut list = ListProducer::with_buffer(buf)?;
                for item in items {
                    list.append_value(item)?;
                }
                Ok(list.end())
            }
            BtValue::Dict(map) => {
                let mut dict = DictProducer::with_buffer(buf)?;
                for (key, value) in map {
                    dict.append_value(key, value)?;
                }
                Ok(dict.end())
            }
            scalar => {
                let needed = scalar.encoded_len();
                if needed > buf.len() {
                    return Err(ProducerError::CapacityExceeded {
                        needed,
                        capacity: buf.len(),
                    });
                }
                scalar.with_scalar_parts(|parts| {
                    let mut pos = 0;
                    for part in parts {
                        buf[pos..pos + part.len()].copy_from_slice(part);
                        pos += part.len();
                    }
                });
                Ok(needed)
            }
        }
    }
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BtValue {
                fn from(v: $ty) -> Self {
                    BtValue::UInt(u64::from(v))
                }
            }
        )*
    };
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for BtValue {
                fn from(v: $ty) -> Self {
                    BtValue::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_unsigned!(u8, u16, u32, u64);
impl_from_signed!(i8, i16, i32, i64);

impl From<bool> for BtValue {
    fn from(v: bool) -> Self {
        BtValue::UInt(u64::from(v))
    }
}

impl From<&[u8]> for BtValue {
    fn from(v: &[u8]) -> Self {
        BtValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for BtValue {
    fn from(v: Vec<u8>) -> Self {
        BtValue::Bytes(v)
    }
}

impl From<&str> for BtValue {
    fn from(v: &str) -> Self {
        BtValue::Bytes(v.as_bytes().to_vec())
    }
}

impl From<String> for BtValue {
    fn from(v: String) -> Self {
        BtValue::Bytes(v.into_bytes())
    }
}

impl From<Vec<BtValue>> for BtValue {
    fn from(v: Vec<BtValue>) -> Self {
        BtValue::List(v)
    }
}

impl From<BTreeMap<Vec<u8>, BtValue>> for BtValue {
    fn from(v: BTreeMap<Vec<u8>, BtValue>) -> Self {
        BtValue::Dict(v)
    }
}

impl FromIterator<BtValue> for BtValue {
    fn from_iter<I: IntoIterator<Item = BtValue>>(iter: I) -> Self {
        BtValue::List(iter.into_iter().collect())
    }
}

impl<K: Into<Vec<u8>>> FromIterator<(K, BtValue)> for BtValue {
    fn from_iter<I: IntoIterator<Item = (K, BtValue)>>(iter: I) -> Self {
        BtValue::Dict(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
