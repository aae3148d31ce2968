//! エンコード済みデータの構造チェック
//!
//! `append_encoded()` に渡された外部のバイト列が、ちょうど 1 つの完全な bt 値であるかを確認する。
//! 値を取り出すデコーダではなく、構文（と正準形）の検査のみを行う。
//!
//! 検査内容:
//! - 文字列長・整数が 10 進で、余分な先頭ゼロや `-0` を含まない
//! - list/dict がすべて閉じている
//! - dict のキーが文字列で、バイト順で狭義昇順に並んでいる
//! - 値の後ろに余分なバイトがない
//!
//! ネストはヒープ上のスタックで辿るので、深いネストでもコールスタックを消費しない。

use alloc::vec::Vec;

/// 開いているコンテナ
struct Frame {
    /// dict なら `true`
    dict: bool,
    /// dict で次に来るべきものがキーか
    expect_key: bool,
    /// dict の直前のキー（入力内の範囲）
    last_key: Option<(usize, usize)>,
}

/// `input` がちょうど 1 つの完全な bt 値か
pub fn is_valid(input: &[u8]) -> bool {
    scan_value(input, 0) == Some(input.len())
}

/// `pos` から始まる 1 つの値を読み飛ばし、その直後の位置を返す
///
/// 不正な構文であれば `None`。
pub fn scan_value(input: &[u8], mut pos: usize) -> Option<usize> {
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let byte = *input.get(pos)?;

        // dict のキー位置
        if let Some(top) = stack.last_mut() {
            if top.dict && top.expect_key && byte != b'e' {
                let (start, end) = scan_string(input, pos)?;
                if let Some((ls, le)) = top.last_key {
                    if input[start..end] <= input[ls..le] {
                        return None;
                    }
                }
                top.last_key = Some((start, end));
                top.expect_key = false;
                pos = end;
                continue;
            }
        }

        match byte {
            b'e' => {
                let frame = stack.pop()?;
                if frame.dict && !frame.expect_key {
                    // キーに対応する値がない
                    return None;
                }
                pos += 1;
            }
            b'i' => pos = scan_integer(input, pos)?,
            b'0'..=b'9' => pos = scan_string(input, pos)?.1,
            b'l' | b'd' => {
                stack.push(Frame {
                    dict: byte == b'd',
                    expect_key: true,
                    last_key: None,
                });
                pos += 1;
                continue;
            }
            _ => return None,
        }

        // 値が 1 つ完了した
        match stack.last_mut() {
            Some(top) if top.dict => top.expect_key = true,
            Some(_) => {}
            None => return Some(pos),
        }
    }
}

/// 10 進数字列を読み、数字が終わった位置を返す
///
/// 先頭ゼロ（"0" 単独を除く）は不正。
fn scan_digits(input: &[u8], start: usize) -> Option<usize> {
    let len = input[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if len == 0 || (len > 1 && input[start] == b'0') {
        return None;
    }
    Some(start + len)
}

/// `<len>:<bytes>` を読み、中身の範囲を返す
fn scan_string(input: &[u8], pos: usize) -> Option<(usize, usize)> {
    let digits_end = scan_digits(input, pos)?;
    if input.get(digits_end) != Some(&b':') {
        return None;
    }
    let mut len: usize = 0;
    for &d in &input[pos..digits_end] {
        len = len.checked_mul(10)?.checked_add(usize::from(d - b'0'))?;
    }
    let start = digits_end + 1;
    let end = start.checked_add(len)?;
    if end > input.len() {
        return None;
    }
    Some((start, end))
}

/// `i<digits>e` を読み、直後の位置を返す
fn scan_integer(input: &[u8], pos: usize) -> Option<usize> {
    let mut digits = pos + 1;
    let negative = input.get(digits) == Some(&b'-');
    if negative {
        digits += 1;
    }
    let end = scan_digits(input, digits)?;
    if negative && input[digits] == b'0' {
        // "-0" は正準形ではない
        return None;
    }
    if input.get(end) != Some(&b'e') {
        return None;
    }
    Some(end + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_values() {
        for case in [
            &b"i0e"[..],
            b"i-12e",
            b"0:",
            b"3:abc",
            b"le",
            b"de",
            b"li1e2:abe",
            b"d1:ai1e1:b1:xe",
            b"llei1ee",
            b"d1:ald1:xi1eeee",
        ] {
            assert!(is_valid(case), "{:?} は有効なはず", case);
        }
    }

    #[test]
    fn test_invalid_values() {
        for case in [
            &b""[..],
            b"i01e",
            b"i-0e",
            b"ie",
            b"i1",
            b"01:a",
            b"3:ab",
            b"l",
            b"lee",
            b"i1ei2e",
            b"d1:ae",
            b"di1ei2ee",
            b"d1:bi1e1:ai2ee",
            b"d1:ai1e1:ai2ee",
            b"x",
        ] {
            assert!(!is_valid(case), "{:?} は無効なはず", case);
        }
    }

    #[test]
    fn test_scan_value_prefix() {
        let input = b"li1eei2e";
        assert_eq!(scan_value(input, 0), Some(5));
        assert_eq!(scan_value(input, 5), Some(8));
    }

    #[test]
    fn test_deep_nesting() {
        let mut deep = alloc::vec![b'l'; 10_000];
        deep.resize(20_000, b'e');
        assert!(is_valid(&deep));
    }
}
