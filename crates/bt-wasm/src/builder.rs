//! BtListBuilder wasm-bindgen エクスポート
//!
//! JS から bt list を 1 要素ずつ組み立てる。内部では `ListProducer` に直接書き込むので、
//! `view()` はいつ呼んでも閉じた有効な bt データを返す。
//!
//! JS 向けメソッド（`appendInt` 等）は薄いラッパーで、実処理は Rust 側の
//! `push*` メソッドにある（native テストから呼べるように `JsError` を使わない）。

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use js_sys::{Function, Uint8Array};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use bt_producer::{BtScalar, Config, ListProducer, ProducerError};
use bt_value::ListExt;

use crate::json::{parse_json, JsonError};

/// `stats()` が返す JSON
#[derive(Debug, Serialize)]
struct BuilderStats {
    /// 現在のエンコード済みバイト数（終端を含む）
    len: usize,
    /// 成功した追記の回数
    appends: u32,
    /// 署名を追記したか
    signed: bool,
}

/// JS から使う bt list ビルダー
///
/// ## 使用例（TypeScript）
///
/// ```typescript
/// const builder = new BtListBuilder();
/// builder.appendInt(1n);
/// builder.appendString("ab");
/// builder.appendJson('{"k":[1,2]}');
/// builder.appendSignature((data: Uint8Array) => ed25519.sign(data, secretKey));
/// const bytes: Uint8Array = builder.finish();
/// ```
#[wasm_bindgen]
pub struct BtListBuilder {
    list: ListProducer<'static, 'static>,
    appends: u32,
    signed: bool,
}

impl Default for BtListBuilder {
    fn default() -> Self {
        BtListBuilder::new(None)
    }
}

fn to_js_error(e: impl core::fmt::Display) -> JsError {
    JsError::new(&format!("{}", e))
}

fn to_uint8_array(bytes: &[u8]) -> Uint8Array {
    let arr = Uint8Array::new_with_length(bytes.len() as u32);
    arr.copy_from(bytes);
    arr
}

#[wasm_bindgen]
impl BtListBuilder {
    /// 空の list（`le`）で初期化する
    ///
    /// # 引数
    /// - `reserve`: 内部バッファの初期容量（バイト）。省略時はデフォルト値。
    #[wasm_bindgen(constructor)]
    pub fn new(reserve: Option<u32>) -> BtListBuilder {
        let mut config = Config::default();
        if let Some(n) = reserve {
            config = config.with_reserve(n as usize);
        }
        BtListBuilder {
            list: ListProducer::with_config(config),
            appends: 0,
            signed: false,
        }
    }

    /// 整数を追記する（JS の BigInt）
    #[wasm_bindgen(js_name = "appendInt")]
    pub fn append_int(&mut self, value: i64) -> Result<(), JsError> {
        self.push(value).map_err(to_js_error)
    }

    /// 符号なし整数を追記する（JS の BigInt）
    #[wasm_bindgen(js_name = "appendUint")]
    pub fn append_uint(&mut self, value: u64) -> Result<(), JsError> {
        self.push(value).map_err(to_js_error)
    }

    /// 文字列を UTF-8 バイト列として追記する
    #[wasm_bindgen(js_name = "appendString")]
    pub fn append_string(&mut self, value: &str) -> Result<(), JsError> {
        self.push(value).map_err(to_js_error)
    }

    /// バイト列を追記する
    #[wasm_bindgen(js_name = "appendBytes")]
    pub fn append_bytes(&mut self, value: &[u8]) -> Result<(), JsError> {
        self.push(value).map_err(to_js_error)
    }

    /// JSON テキストを変換して 1 要素として追記する（変換規則は `encodeJson` と同じ）
    #[wasm_bindgen(js_name = "appendJson")]
    pub fn append_json(&mut self, json: &str) -> Result<(), JsError> {
        self.push_json(json).map_err(to_js_error)
    }

    /// ここまでのデータ（終端 `e` を除く）を `sign` に渡し、返された署名を追記する
    ///
    /// # 引数
    /// - `sign`: `(data: Uint8Array) => Uint8Array`
    ///
    /// # エラー
    /// - `sign` が例外を投げた、または `Uint8Array` 以外を返した（何も追記しない）
    #[wasm_bindgen(js_name = "appendSignature")]
    pub fn append_signature(&mut self, sign: &Function) -> Result<(), JsError> {
        self.push_signature_with(|data| {
            let ret = sign
                .call1(&JsValue::NULL, &Uint8Array::from(data))
                .map_err(|e| e.as_string().unwrap_or_else(|| String::from("sign callback threw")))?;
            ret.dyn_into::<Uint8Array>()
                .map(|arr| arr.to_vec())
                .map_err(|_| String::from("sign callback must return a Uint8Array"))
        })
        .map_err(to_js_error)
    }

    /// 現在のエンコード済みバイト列（閉じた有効な bt データ）
    pub fn view(&self) -> Uint8Array {
        to_uint8_array(self.bytes())
    }

    /// 統計を JSON 文字列で返す
    ///
    /// ```json
    /// { "len": 12, "appends": 3, "signed": false }
    /// ```
    pub fn stats(&self) -> Result<String, JsError> {
        self.stats_json().map_err(to_js_error)
    }

    /// エンコード結果を取り出し、ビルダーを空の list に戻す
    pub fn finish(&mut self) -> Result<Uint8Array, JsError> {
        let bytes = self.take().map_err(to_js_error)?;
        Ok(to_uint8_array(&bytes))
    }

    /// `finish()` の結果を Base64 文字列で返す
    #[wasm_bindgen(js_name = "finishBase64")]
    pub fn finish_base64(&mut self) -> Result<String, JsError> {
        use base64::Engine as _;
        let bytes = self.take().map_err(to_js_error)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }
}

impl BtListBuilder {
    /// スカラー値を追記する
    pub fn push<T: BtScalar>(&mut self, value: T) -> Result<(), ProducerError> {
        self.list.append(value)?;
        self.appends += 1;
        Ok(())
    }

    /// JSON テキストを変換して追記する
    pub fn push_json(&mut self, json: &str) -> Result<(), JsonError> {
        let value = parse_json(json)?;
        self.list.append_value(&value)?;
        self.appends += 1;
        Ok(())
    }

    /// 署名関数でここまでのデータに署名し、署名を追記する
    pub fn push_signature_with<F>(&mut self, sign: F) -> Result<(), ProducerError>
    where
        F: FnOnce(&[u8]) -> Result<Vec<u8>, String>,
    {
        self.list.try_append_signature(sign)?;
        self.appends += 1;
        self.signed = true;
        Ok(())
    }

    /// 現在のエンコード済みバイト列
    pub fn bytes(&self) -> &[u8] {
        self.list.view()
    }

    /// エンコード結果を取り出し、空の list に戻す
    pub fn take(&mut self) -> Result<Vec<u8>, ProducerError> {
        let bytes = self.list.take_bytes()?;
        self.appends = 0;
        self.signed = false;
        Ok(bytes)
    }

    /// 統計 JSON
    pub fn stats_json(&self) -> Result<String, JsonError> {
        let stats = BuilderStats {
            len: self.list.view().len(),
            appends: self.appends,
            signed: self.signed,
        };
        serde_json::to_string(&stats).map_err(|e| JsonError::Json(e.to_string()))
    }
}
