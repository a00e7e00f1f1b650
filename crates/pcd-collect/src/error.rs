//! Collection errors.

use pcd_core::PcdError;

/// Errors that can occur while loading descriptors and merging tokens.
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// Validation or consistency failure for a PCD entry.
    #[error(transparent)]
    Pcd(#[from] PcdError),

    /// The platform description lists no modules.
    #[error("[FPD file error] No modules in platform description, please check that it declares at least one module")]
    NoModules,

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectError>;
