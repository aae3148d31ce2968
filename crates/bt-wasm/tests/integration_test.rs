//! bt-wasm 統合テスト
//!
//! JSON → 値ツリー → Producer → バイト列 → デコード の完全なパイプラインをテストする。
//! wasm-bindgen の JS 境界は通らず、Rust 側の API を native で呼び出す。

use std::collections::BTreeMap;

use bt_producer::{
    is_valid, Config, DictProducer, ListProducer, ProducerError, StateError, SIGNATURE_KEY,
};
use bt_value::{BtValue, DictExt, ListExt};
use bt_wasm::{encode_json, encode_json_base64, parse_json, BtListBuilder, JsonError};

// ==============================================================
// ヘルパー: テスト用デコーダ
// ==============================================================

fn decode(input: &[u8]) -> Option<BtValue> {
    let (value, end) = decode_at(input, 0)?;
    (end == input.len()).then_some(value)
}

fn decode_at(input: &[u8], pos: usize) -> Option<(BtValue, usize)> {
    match *input.get(pos)? {
        b'i' => {
            let end = pos + 1 + input[pos + 1..].iter().position(|&b| b == b'e')?;
            let text = std::str::from_utf8(&input[pos + 1..end]).ok()?;
            let value = if text.starts_with('-') {
                BtValue::Int(text.parse().ok()?)
            } else {
                BtValue::UInt(text.parse().ok()?)
            };
            Some((value, end + 1))
        }
        b'0'..=b'9' => {
            let colon = pos + input[pos..].iter().position(|&b| b == b':')?;
            let len: usize = std::str::from_utf8(&input[pos..colon]).ok()?.parse().ok()?;
            let bytes = input.get(colon + 1..colon + 1 + len)?;
            Some((BtValue::Bytes(bytes.to_vec()), colon + 1 + len))
        }
        b'l' => {
            let mut items = Vec::new();
            let mut pos = pos + 1;
            while *input.get(pos)? != b'e' {
                let (item, next) = decode_at(input, pos)?;
                items.push(item);
                pos = next;
            }
            Some((BtValue::List(items), pos + 1))
        }
        b'd' => {
            let mut map = BTreeMap::new();
            let mut pos = pos + 1;
            while *input.get(pos)? != b'e' {
                let (key, next) = decode_at(input, pos)?;
                let (value, next) = decode_at(input, next)?;
                map.insert(key.as_bytes()?.to_vec(), value);
                pos = next;
            }
            Some((BtValue::Dict(map), pos + 1))
        }
        _ => None,
    }
}

/// テスト用の署名関数（本物の署名ではなく、入力に依存する 8 バイトを返す）
fn fake_sign(data: &[u8]) -> [u8; 8] {
    let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in data {
        acc ^= u64::from(b);
        acc = acc.wrapping_mul(0x0100_0000_01b3);
    }
    acc.to_be_bytes()
}

// ==============================================================
// テスト: 基本シナリオ
// ==============================================================

#[test]
fn test_basic_scenarios() {
    let mut list = ListProducer::new();
    assert_eq!(list.take_bytes().unwrap(), b"le");

    list.append(1).unwrap();
    list.append("ab").unwrap();
    assert_eq!(list.take_bytes().unwrap(), b"li1e2:abe");

    let mut dict = DictProducer::new();
    dict.append("a", 1).unwrap();
    dict.append("b", "x").unwrap();
    assert_eq!(dict.take_bytes().unwrap(), b"d1:ai1e1:b1:xe");

    {
        let _empty = list.append_list().unwrap();
    }
    list.append(1).unwrap();
    assert_eq!(list.take_bytes().unwrap(), b"llei1ee");

    list.append(1).unwrap();
    list.append(2).unwrap();
    list.append_signature(|_| *b"SIG").unwrap();
    assert_eq!(list.take_bytes().unwrap(), b"li1ei2e3:SIGe");
}

// ==============================================================
// テスト: JSON パイプライン
// ==============================================================

#[test]
fn test_json_pipeline_round_trip() {
    let json = r#"{
        "name": "node-1",
        "ports": [22, 443, 8080],
        "delta": -40,
        "meta": {"z": true, "a": false, "skip": null},
        "nested": [[], {}, [[1]]]
    }"#;

    let bytes = encode_json(json).unwrap();
    assert!(is_valid(&bytes), "出力が有効な bt データではない");

    let decoded = decode(&bytes).expect("デコードできない");
    assert_eq!(decoded, parse_json(json).unwrap(), "往復が一致しない");

    let meta = decoded.as_dict().unwrap().get(&b"meta"[..]).unwrap();
    assert_eq!(
        meta.as_dict().unwrap().keys().collect::<Vec<_>>(),
        vec![&b"a".to_vec(), &b"z".to_vec()],
        "null の値はキーごと省略される"
    );
}

#[test]
fn test_json_errors() {
    assert_eq!(encode_json("null"), Err(JsonError::NullAtTopLevel));
    assert!(matches!(encode_json("[0.5]"), Err(JsonError::NotInteger(_))));
    assert!(matches!(encode_json("{"), Err(JsonError::Json(_))));
    assert_eq!(encode_json_base64("[1]").unwrap(), "bGkxZWU=");
}

// ==============================================================
// テスト: ビルダーと署名
// ==============================================================

#[test]
fn test_builder_sign_and_verify() {
    let mut builder = BtListBuilder::new(None);
    builder.push(7u64).unwrap();
    builder.push_json(r#"{"op":"put","key":"k"}"#).unwrap();
    builder.push(b"payload".as_slice()).unwrap();

    let signed_prefix = builder.bytes()[..builder.bytes().len() - 1].to_vec();
    builder
        .push_signature_with(|data| Ok(fake_sign(data).to_vec()))
        .unwrap();
    let bytes = builder.take().unwrap();

    // 検証側: 最後の要素を取り除いた範囲に同じ署名関数を適用する
    let decoded = decode(&bytes).unwrap();
    let items = decoded.as_list().unwrap();
    assert_eq!(items.len(), 4);
    let signature = items[3].as_bytes().unwrap();
    assert_eq!(signature, fake_sign(&signed_prefix), "署名対象の範囲が一致しない");
    assert!(bytes.starts_with(&signed_prefix));
}

#[test]
fn test_builder_signer_failure_appends_nothing() {
    let mut builder = BtListBuilder::default();
    builder.push("x").unwrap();
    let result = builder.push_signature_with(|_| Err("hsm offline".to_string()));
    assert_eq!(result, Err(ProducerError::Signer("hsm offline".to_string())));
    assert_eq!(builder.bytes(), b"l1:xe");
    assert_eq!(
        builder.stats_json().unwrap(),
        r#"{"len":5,"appends":1,"signed":false}"#
    );
}

#[test]
fn test_dict_signature_last_key() {
    let mut dict = DictProducer::new();
    dict.append_value("body", &BtValue::from(vec![BtValue::from(1u8)]))
        .unwrap();
    dict.append("from", "alice").unwrap();
    // "~" は他のキーより後ろに並ぶ
    dict.append_signature(SIGNATURE_KEY, fake_sign).unwrap();
    let bytes = dict.take_bytes().unwrap();
    assert!(is_valid(&bytes));

    let decoded = decode(&bytes).unwrap();
    let map = decoded.as_dict().unwrap();
    let sig_pos = bytes.len() - 1 - (2 + 8) - 3;
    assert_eq!(&bytes[sig_pos..sig_pos + 3], b"1:~");
    assert_eq!(
        map.get(&b"~"[..]).unwrap().as_bytes().unwrap(),
        fake_sign(&bytes[..sig_pos])
    );
}

// ==============================================================
// テスト: 外部バッファ
// ==============================================================

#[test]
fn test_external_buffer_exact_capacity() {
    let value = parse_json(r#"[1, "ab", {"k": [true]}]"#).unwrap();
    let len = value.encoded_len();

    let mut buf = vec![0u8; len];
    let mut list = ListProducer::with_buffer(&mut buf).unwrap();
    for item in value.as_list().unwrap() {
        list.append_value(item).unwrap();
    }
    assert_eq!(list.end(), len);
    assert!(matches!(
        list.take_bytes(),
        Err(ProducerError::IllegalState(StateError::ExternalBuffer))
    ));
    drop(list);
    assert_eq!(decode(&buf), Some(value.clone()));

    let mut short = vec![0u8; len - 1];
    let mut list = ListProducer::with_buffer(&mut short).unwrap();
    let mut failed = false;
    for item in value.as_list().unwrap() {
        if let Err(e) = list.append_value(item) {
            assert!(matches!(e, ProducerError::CapacityExceeded { .. }));
            failed = true;
            break;
        }
        assert!(is_valid(list.output()), "途中の出力が閉じていない");
    }
    assert!(failed, "1 バイト小さいバッファでは失敗するはず");
    assert!(is_valid(list.output()), "失敗後も出力は閉じている");
}

#[test]
fn test_external_dict_streaming() {
    let mut buf = [0u8; 64];
    let end = {
        let mut dict = DictProducer::with_buffer(&mut buf).unwrap();
        dict.append("a", 1).unwrap();
        {
            let mut list = dict.append_list("b").unwrap();
            list.extend([1u8, 2, 3]).unwrap();
        }
        dict.append_list_from("c", ["x", "y"]).unwrap();
        dict.end()
    };
    assert_eq!(&buf[..end], b"d1:ai1e1:bli1ei2ei3ee1:cl1:x1:yee");
}

// ==============================================================
// テスト: 検査モード
// ==============================================================

#[test]
fn test_unchecked_mode_allows_any_order() {
    let mut dict = DictProducer::with_config(Config::default().unchecked());
    dict.append("b", 1).unwrap();
    dict.append("a", 2).unwrap();
    let bytes = dict.take_bytes().unwrap();
    assert_eq!(bytes, b"d1:bi1e1:ai2ee");
    // 検査器は順序違反を検出する
    assert!(!is_valid(&bytes));

    let mut strict = DictProducer::new();
    strict.append("b", 1).unwrap();
    assert_eq!(
        strict.append("a", 2),
        Err(ProducerError::IllegalState(StateError::UnorderedKey))
    );
}

#[test]
fn test_embed_pre_encoded_signed_data() {
    // 署名済みのデータを再エンコードせずに埋め込む
    let inner = encode_json(r#"{"x":1}"#).unwrap();
    let mut outer = DictProducer::new();
    outer.append_encoded("data", &inner).unwrap();
    outer.append("seq", 9u32).unwrap();
    let bytes = outer.take_bytes().unwrap();
    assert_eq!(bytes, b"d4:datad1:xi1ee3:seqi9ee");

    let mut outer = ListProducer::new();
    assert!(outer.append_encoded(&inner[..inner.len() - 1]).is_err());
    assert_eq!(outer.view(), b"le");
}
