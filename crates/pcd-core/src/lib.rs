//! Core model for the Platform Configuration Database generator.
//!
//! ## Modules
//!
//! - [`datum`] — datum types, value sources, SKU variants, alignment classes
//! - [`token`] — the merged token record and its usage classifications
//! - [`validate`] — literal validation against datum type and size
//! - [`guid`] — descriptor GUID parsing and `EFI_GUID` rendering
//! - [`error`] — the shared error type

pub mod datum;
pub mod error;
pub mod guid;
pub mod token;
pub mod validate;

pub use datum::{pointer_bytes, DatumType, HiiReference, SkuVariant, SourceKind, ValueSource};
pub use error::{PcdError, Result};
pub use guid::{guid_identifier, guid_initializer, parse_guid};
pub use token::{ModuleType, PcdItemType, Token, TokenKey, Usage};
pub use validate::{parse_integer, validate_datum, ValidationContext};
