//! PCD database layout and C text generation.
//!
//! ## Modules
//!
//! - [`table`] — the six append-only layout tables of a phase
//! - [`assemble`] — field ordering, per-token encoding, header/source text
//! - [`pipeline`] — merge once, assemble PEI then DXE, splice boilerplate
//! - [`error`] — the crate error type

pub mod assemble;
pub mod error;
pub mod pipeline;
pub mod table;

pub use assemble::{DatabaseAssembler, FieldEncoding, PhaseDatabase, SERVICE_DRIVER_VERSION};
pub use error::{DatabaseError, Result};
pub use pipeline::{generate, generate_from_tokens, GenerateOptions, GeneratedDatabase, Templates};
pub use table::{LayoutTables, Pool, PoolEntry};
