//! Platform descriptor records and the PCD token merge engine.
//!
//! The merge engine folds every module's PCD declarations into one
//! [`TokenDatabase`], checking that modules agree with each other and with
//! the platform's centralized dynamic definitions. The merged tokens are then
//! split between the PEI and DXE phases.

pub mod descriptor;
pub mod error;
pub mod merge;
pub mod phase;

pub use descriptor::{
    DynamicPcdDefinition, ModuleDescriptor, Numeric, PcdDeclaration, PlatformDescription, SkuInfo,
};
pub use error::{CollectError, Result};
pub use merge::{merge_platform, TokenDatabase, TokenMerger};
pub use phase::{partition, phase_of, Phase, PhaseTokens};
