//! # bt-wasm
//!
//! wasm-bindgen エクスポート：JavaScript から bt データを組み立てる公開 API。
//!
//! ## 使用方法（TypeScript）
//!
//! ```typescript
//! import { BtListBuilder, encodeJson, encodeJsonBase64, isValid, init_panic_hook } from './bt-wasm-pkg/bt_wasm';
//!
//! // パニック時のスタックトレースを有効化（開発時）
//! init_panic_hook();
//!
//! // JSON から一括変換
//! const bytes: Uint8Array = encodeJson('{"a":1,"b":"x"}');   // d1:ai1e1:b1:xe
//! const text: string = encodeJsonBase64('[1]');               // "bGkxZWU="
//!
//! // 1 要素ずつ組み立てて最後に署名
//! const builder = new BtListBuilder();
//! builder.appendInt(1n);
//! builder.appendSignature((data) => sign(data));
//! const signed = builder.finish();
//! isValid(signed); // true
//! ```

use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;

pub mod builder;
pub mod json;

pub use builder::BtListBuilder;
pub use json::{encode_json, encode_json_base64, json_to_value, parse_json, JsonError};

extern crate alloc;

/// パニック時にブラウザコンソールにスタックトレースを出力する
///
/// 開発時に必ず呼び出すこと。本番ビルドでは feature flag で無効化可能。
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// JSON テキストを bt エンコードする
///
/// # 引数
/// - `json`: JSON テキスト（例: `'{"a":1,"b":"x"}'`）
///
/// # エラー
/// - JSON の構文エラー
/// - 小数・64 ビット範囲外の数値
/// - トップレベルが `null`
#[wasm_bindgen(js_name = "encodeJson")]
pub fn encode_json_js(json: &str) -> Result<Uint8Array, JsError> {
    let bytes = encode_json(json).map_err(|e| JsError::new(&alloc::format!("{}", e)))?;
    let arr = Uint8Array::new_with_length(bytes.len() as u32);
    arr.copy_from(&bytes);
    Ok(arr)
}

/// JSON テキストを bt エンコードし、Base64 文字列で返す
#[wasm_bindgen(js_name = "encodeJsonBase64")]
pub fn encode_json_base64_js(json: &str) -> Result<String, JsError> {
    encode_json_base64(json).map_err(|e| JsError::new(&alloc::format!("{}", e)))
}

/// `bytes` がちょうど 1 つの完全な bt 値か（dict キー順序と正準形を含めて検査する）
#[wasm_bindgen(js_name = "isValid")]
pub fn is_valid_js(bytes: &[u8]) -> bool {
    bt_producer::is_valid(bytes)
}
