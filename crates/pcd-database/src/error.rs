//! Database generation errors.

use pcd_collect::CollectError;
use pcd_core::PcdError;
use thiserror::Error;

/// Errors that can occur while generating the phase databases.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Descriptor loading or token merging failed.
    #[error(transparent)]
    Collect(#[from] CollectError),

    /// Phase token numbers ran past the 32-bit token space.
    #[error("token numbering for phase {phase} overflows at {cname}")]
    TokenNumberOverflow { phase: String, cname: String },

    /// A byte-array SKU table larger than the 32-bit size space.
    #[error("SKU data of {cname} ({skus} SKUs of {datum_size} bytes) overflows the table size")]
    SkuDataOverflow {
        cname: String,
        datum_size: u32,
        skus: usize,
    },
}

impl From<PcdError> for DatabaseError {
    fn from(e: PcdError) -> Self {
        DatabaseError::Collect(CollectError::Pcd(e))
    }
}

/// Result type alias for database generation.
pub type Result<T> = std::result::Result<T, DatabaseError>;
