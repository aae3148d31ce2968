//! bt-producer エラー型

use alloc::string::String;

/// 誤用（プログラミングエラー）の種類
///
/// いずれも呼び出し側のバグを表すため、リトライで回復することはない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// 子リスト/子辞書が開いたままの状態で親に書き込もうとした
    ChildActive,
    /// ルート以外のスコープで `take_bytes()` を呼んだ
    NotRoot,
    /// 外部バッファモードのルートで `take_bytes()` を呼んだ
    ExternalBuffer,
    /// 辞書キーが直前のキーより大きくない（バイト順で昇順でない）
    UnorderedKey,
    /// `append_encoded()` に渡されたバイト列が完全な bt 値ではない
    InvalidEncoded,
}

/// Producer 操作のエラー
///
/// どのエラーで失敗した場合も、バッファ内の既存データは終端まで閉じた有効な状態のまま残る。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducerError {
    /// 外部バッファに書き込む余地がない
    ///
    /// `needed` は書き込みに必要だったバッファ長、`capacity` は実際のバッファ長。
    CapacityExceeded { needed: usize, capacity: usize },
    /// API の誤用
    IllegalState(StateError),
    /// 署名関数がエラーを返した（何も書き込まれていない）
    Signer(String),
}

impl ProducerError {
    /// 誤用によるエラーか
    pub fn is_illegal_state(&self) -> bool {
        matches!(self, ProducerError::IllegalState(_))
    }
}

impl From<StateError> for ProducerError {
    fn from(err: StateError) -> Self {
        ProducerError::IllegalState(err)
    }
}

impl core::fmt::Display for StateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StateError::ChildActive => {
                write!(f, "Cannot append while a nested list/dict is active")
            }
            StateError::NotRoot => write!(f, "Cannot take bytes from a nested list/dict"),
            StateError::ExternalBuffer => {
                write!(f, "Cannot take bytes when using an external buffer")
            }
            StateError::UnorderedKey => {
                write!(f, "Dict keys must be appended in strictly ascending order")
            }
            StateError::InvalidEncoded => write!(f, "Pre-encoded value is not valid bt data"),
        }
    }
}

impl core::fmt::Display for ProducerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProducerError::CapacityExceeded { needed, capacity } => write!(
                f,
                "Buffer size exceeded: {} bytes needed, capacity is {}",
                needed, capacity
            ),
            ProducerError::IllegalState(e) => write!(f, "Illegal state: {}", e),
            ProducerError::Signer(msg) => write!(f, "Signing failed: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StateError {}

#[cfg(feature = "std")]
impl std::error::Error for ProducerError {}
