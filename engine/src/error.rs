//! SEFT 错误类型
//!
//! 所有公开操作统一返回 `Result<T, SeftError>`。
//! 变体携带结构化上下文（路径、声明长度、实际长度），不预先拼接文本。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SeftError {
    #[error("input not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid container format: {reason}")]
    Format { reason: &'static str },

    #[error("unsupported container version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("truncated {field}: declared {declared} bytes, only {available} available")]
    Truncated {
        field: &'static str,
        declared: u64,
        available: u64,
    },

    /// 密码错误、数据被篡改、填充无效或明文哈希不一致。
    ///
    /// 刻意不区分具体原因，避免泄露是哪一层校验失败。
    #[error("integrity check failed: wrong password or corrupted data")]
    Integrity,

    #[error("unsupported algorithm (nonce length {nonce_len})")]
    UnsupportedAlgorithm { nonce_len: usize },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: &'static str },

    #[error("unsafe archive path: {path}")]
    UnsafePath { path: String },

    #[error("cancelled before processing")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// 不带上下文的错误类别，便于批处理调用方直接匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Format,
    UnsupportedVersion,
    Truncated,
    Integrity,
    UnsupportedAlgorithm,
    InvalidInput,
    UnsafePath,
    Cancelled,
    Io,
}

impl SeftError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Format { .. } => ErrorKind::Format,
            Self::UnsupportedVersion { .. } => ErrorKind::UnsupportedVersion,
            Self::Truncated { .. } => ErrorKind::Truncated,
            Self::Integrity => ErrorKind::Integrity,
            Self::UnsupportedAlgorithm { .. } => ErrorKind::UnsupportedAlgorithm,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::UnsafePath { .. } => ErrorKind::UnsafePath,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn format(reason: &'static str) -> Self {
        Self::Format { reason }
    }

    pub(crate) fn invalid_input(reason: &'static str) -> Self {
        Self::InvalidInput { reason }
    }
}

pub type Result<T> = std::result::Result<T, SeftError>;
