//! スカラー値（文字列・整数）のトークン化
//!
//! ## Wire Format
//! ```text
//! string  := <10 進の長さ> ":" <生バイト列>
//! integer := "i" <10 進数, 負数は先頭に '-'> "e"
//! ```
//!
//! 数値の 10 進表記はスタック上の `itoa::Buffer` に書き出すため、ヒープ確保は発生しない。

use alloc::string::String;
use alloc::vec::Vec;

/// list の要素・dict の値としてそのまま追記できる値
///
/// 整数（符号の有無・幅を問わない）、`bool`、バイト列、文字列、`Option` を実装済み。
/// `Option` は `None` のとき何も追記しない。
pub trait BtScalar {
    /// トークンを構成するバイト列の断片を `f` に渡す
    ///
    /// 断片はスタック上の一時バッファを指すので、`f` の外には持ち出せない。
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R;

    /// エンコード後のバイト数
    fn encoded_len(&self) -> usize {
        self.with_parts(|parts| parts.iter().map(|p| p.len()).sum())
    }

    /// 値が存在しない（何も追記すべきでない）か
    fn is_absent(&self) -> bool {
        false
    }
}

/// バイト列を `<len>:<bytes>` の断片として `f` に渡す
pub(crate) fn string_parts<R, F: FnOnce(&[&[u8]]) -> R>(bytes: &[u8], f: F) -> R {
    let mut digits = itoa::Buffer::new();
    let len = digits.format(bytes.len());
    f(&[len.as_bytes(), b":", bytes])
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl BtScalar for $ty {
                fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
                    let mut digits = itoa::Buffer::new();
                    let text = digits.format(*self);
                    f(&[b"i", text.as_bytes(), b"e"])
                }
            }
        )*
    };
}

impl_integer!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl BtScalar for bool {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        let token: &[u8] = if *self { b"i1e" } else { b"i0e" };
        f(&[token])
    }
}

impl BtScalar for [u8] {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        string_parts(self, f)
    }
}

impl<const N: usize> BtScalar for [u8; N] {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        string_parts(self, f)
    }
}

impl BtScalar for Vec<u8> {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        string_parts(self, f)
    }
}

impl BtScalar for str {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        string_parts(self.as_bytes(), f)
    }
}

impl BtScalar for String {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        string_parts(self.as_bytes(), f)
    }
}

impl<T: BtScalar> BtScalar for Option<T> {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        match self {
            Some(v) => v.with_parts(f),
            None => f(&[]),
        }
    }

    fn is_absent(&self) -> bool {
        match self {
            Some(v) => v.is_absent(),
            None => true,
        }
    }
}

impl<T: BtScalar + ?Sized> BtScalar for &T {
    fn with_parts<R, F: FnOnce(&[&[u8]]) -> R>(&self, f: F) -> R {
        (**self).with_parts(f)
    }

    fn is_absent(&self) -> bool {
        (**self).is_absent()
    }
}
