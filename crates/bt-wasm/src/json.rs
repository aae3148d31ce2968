//! JSON → bt 変換
//!
//! | JSON           | bt                                   |
//! |----------------|--------------------------------------|
//! | string         | バイト列（UTF-8）                     |
//! | 整数           | integer（u64 / i64 の範囲）           |
//! | true / false   | `i1e` / `i0e`                        |
//! | array          | list                                 |
//! | object         | dict（キーはバイト順に並べ替える）    |
//! | null           | コンテナ内では要素ごと省略。単独ではエラー |
//! | 小数・範囲外   | エラー                               |

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use base64::Engine as _;
use bt_producer::ProducerError;
use bt_value::BtValue;
use serde_json::Value;

/// JSON 変換エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    /// JSON として解析できない（serde_json のメッセージ）
    Json(String),
    /// 整数で表せない数値（小数、または u64/i64 の範囲外）
    NotInteger(String),
    /// トップレベルが null
    NullAtTopLevel,
    /// bt エンコードの失敗
    Encode(ProducerError),
}

impl From<ProducerError> for JsonError {
    fn from(err: ProducerError) -> Self {
        JsonError::Encode(err)
    }
}

impl core::fmt::Display for JsonError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            JsonError::Json(msg) => write!(f, "Invalid JSON: {}", msg),
            JsonError::NotInteger(n) => write!(f, "Number is not a 64-bit integer: {}", n),
            JsonError::NullAtTopLevel => write!(f, "Top-level null has no bt encoding"),
            JsonError::Encode(e) => write!(f, "Encoding failed: {}", e),
        }
    }
}

impl std::error::Error for JsonError {}

/// serde_json の値を [`BtValue`] に変換する
///
/// # 戻り値
/// `null` の場合は `None`（呼び出し側のコンテナで省略する）
pub fn json_to_value(json: &Value) -> Result<Option<BtValue>, JsonError> {
    let value = match json {
        Value::Null => return Ok(None),
        Value::Bool(b) => BtValue::from(*b),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                BtValue::UInt(u)
            } else if let Some(i) = n.as_i64() {
                BtValue::Int(i)
            } else {
                return Err(JsonError::NotInteger(n.to_string()));
            }
        }
        Value::String(s) => BtValue::from(s.as_str()),
        Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                if let Some(v) = json_to_value(item)? {
                    list.push(v);
                }
            }
            BtValue::List(list)
        }
        Value::Object(map) => {
            let mut dict = BTreeMap::new();
            for (key, item) in map {
                if let Some(v) = json_to_value(item)? {
                    dict.insert(key.as_bytes().to_vec(), v);
                }
            }
            BtValue::Dict(dict)
        }
    };
    Ok(Some(value))
}

/// JSON テキストを解析して [`BtValue`] に変換する
pub fn parse_json(text: &str) -> Result<BtValue, JsonError> {
    let json: Value = serde_json::from_str(text).map_err(|e| JsonError::Json(e.to_string()))?;
    json_to_value(&json)?.ok_or(JsonError::NullAtTopLevel)
}

/// JSON テキストを bt バイト列にエンコードする
pub fn encode_json(text: &str) -> Result<Vec<u8>, JsonError> {
    let value = parse_json(text)?;
    let bytes = value.to_bytes()?;
    log::debug!("bt: encoded {} JSON bytes into {} bt bytes", text.len(), bytes.len());
    Ok(bytes)
}

/// JSON テキストを bt エンコードし、Base64（標準アルファベット、パディングあり）で返す
pub fn encode_json_base64(text: &str) -> Result<String, JsonError> {
    let bytes = encode_json(text)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars() {
        assert_eq!(encode_json("1").unwrap(), b"i1e");
        assert_eq!(encode_json("-5").unwrap(), b"i-5e");
        assert_eq!(encode_json("true").unwrap(), b"i1e");
        assert_eq!(encode_json("\"hi\"").unwrap(), b"2:hi");
        assert_eq!(encode_json("18446744073709551615").unwrap(), b"i18446744073709551615e");
    }

    #[test]
    fn test_object_keys_sorted() {
        assert_eq!(
            encode_json(r#"{"b":"x","a":1}"#).unwrap(),
            b"d1:ai1e1:b1:xe"
        );
    }

    #[test]
    fn test_null_handling() {
        assert_eq!(encode_json("[1,null,2]").unwrap(), b"li1ei2ee");
        assert_eq!(encode_json(r#"{"a":null,"b":0}"#).unwrap(), b"d1:bi0ee");
        assert_eq!(encode_json("null"), Err(JsonError::NullAtTopLevel));
    }

    #[test]
    fn test_rejects_non_integers() {
        assert!(matches!(encode_json("1.5"), Err(JsonError::NotInteger(_))));
        assert!(matches!(
            encode_json("[18446744073709551616]"),
            Err(JsonError::NotInteger(_))
        ));
        assert!(matches!(encode_json("[1,"), Err(JsonError::Json(_))));
    }

    #[test]
    fn test_base64_output() {
        assert_eq!(encode_json_base64("[1]").unwrap(), "bGkxZWU=");
        assert_eq!(
            encode_json_base64(r#"{"a":1,"b":"x"}"#).unwrap(),
            "ZDE6YWkxZTE6YjE6eGU="
        );
    }

    #[test]
    fn test_unicode_keys_are_bytes() {
        let bytes = encode_json(r#"{"é":1,"z":2}"#).unwrap();
        // "z"(0x7A) < "é"(0xC3 0xA9)
        assert_eq!(bytes, "d1:zi2e2:éi1ee".as_bytes());
        assert!(bt_producer::is_valid(&bytes));
    }
}
