//! PCD error types.

/// Errors raised while validating or merging PCD entries.
///
/// Every variant carries a message naming the offending token (and module,
/// when one is involved) together with the rule that was violated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PcdError {
    /// A required piece of input is absent (token space, value, HII field, ...).
    #[error("[FPD file error] {detail}")]
    MissingInput { detail: String },

    /// A value or size does not match the declared datum type.
    #[error("[FPD file error] {detail}")]
    TypeMismatch { detail: String },

    /// Two modules disagree about the same token.
    #[error("[FPD file error] {detail}")]
    Inconsistent { detail: String },

    /// The centralized dynamic declaration is absent or malformed.
    #[error("[FPD file error] {detail}")]
    DynamicDeclaration { detail: String },

    /// A GUID string could not be parsed.
    #[error("[FPD file error] Wrong format for GUID string: {text}")]
    InvalidGuid { text: String },
}

impl PcdError {
    pub fn missing(detail: impl Into<String>) -> Self {
        PcdError::MissingInput {
            detail: detail.into(),
        }
    }

    pub fn mismatch(detail: impl Into<String>) -> Self {
        PcdError::TypeMismatch {
            detail: detail.into(),
        }
    }

    pub fn inconsistent(detail: impl Into<String>) -> Self {
        PcdError::Inconsistent {
            detail: detail.into(),
        }
    }

    pub fn dynamic(detail: impl Into<String>) -> Self {
        PcdError::DynamicDeclaration {
            detail: detail.into(),
        }
    }
}

/// Result type alias for PCD operations.
pub type Result<T> = std::result::Result<T, PcdError>;
