//! Platform description records.
//!
//! These mirror the parsed module and platform descriptors: an ordered list
//! of modules with their PCD build definitions, plus the platform's
//! centralized dynamic PCD definitions. They can be written by hand as TOML:
//!
//! ```toml
//! [[modules]]
//! name = "PcdPeim"
//! arch = "IA32"
//! module-type = "PEIM"
//!
//! [[modules.pcds]]
//! cname = "PcdMaxPeiPerformanceLogEntries"
//! token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
//! item-type = "DYNAMIC"
//! datum-type = "UINT8"
//! token = "0x0001"
//! max-datum-size = 1
//!
//! [[dynamic-pcds]]
//! cname = "PcdMaxPeiPerformanceLogEntries"
//! token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
//! max-datum-size = 1
//!
//! [[dynamic-pcds.sku-info]]
//! sku-id = 0
//! value = "28"
//! ```

use std::path::Path;

use pcd_core::validate::{parse_integer, IntegerLiteralError};
use pcd_core::{DatumType, ModuleType, PcdItemType};
use serde::{Deserialize, Serialize};

use crate::error::{CollectError, Result};

/// A number written either as a TOML integer or as decimal/hex text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(u64),
    Text(String),
}

impl Numeric {
    /// Numeric value, or the literal parse failure.
    pub fn value(&self) -> std::result::Result<u128, IntegerLiteralError> {
        match self {
            Numeric::Number(n) => Ok(*n as u128),
            Numeric::Text(text) => parse_integer(text),
        }
    }
}

impl std::fmt::Display for Numeric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Numeric::Number(n) => write!(f, "{n}"),
            Numeric::Text(text) => f.write_str(text),
        }
    }
}

impl From<u64> for Numeric {
    fn from(n: u64) -> Self {
        Numeric::Number(n)
    }
}

/// Everything the merge engine needs from one platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlatformDescription {
    /// Platform name, used only for log output.
    #[serde(default)]
    pub name: Option<String>,
    /// Modules in build order.
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
    /// Centralized dynamic PCD definitions; `None` when the section is absent.
    #[serde(default)]
    pub dynamic_pcds: Option<Vec<DynamicPcdDefinition>>,
}

/// One module instance of the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleDescriptor {
    pub name: String,
    pub arch: String,
    pub module_type: ModuleType,
    /// PCD build definitions; a module may declare none.
    #[serde(default)]
    pub pcds: Vec<PcdDeclaration>,
}

/// A module's declaration of one PCD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PcdDeclaration {
    pub cname: String,
    #[serde(default)]
    pub token_space_guid: Option<String>,
    pub item_type: PcdItemType,
    pub datum_type: DatumType,
    pub token: Numeric,
    /// Declared size in bytes; 0 means "not given".
    #[serde(default)]
    pub max_datum_size: u32,
    #[serde(default)]
    pub value: Option<String>,
}

/// The platform-level definition of a dynamic PCD.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DynamicPcdDefinition {
    pub cname: String,
    #[serde(default)]
    pub token_space_guid: Option<String>,
    #[serde(default)]
    pub max_datum_size: u32,
    #[serde(default)]
    pub sku_info: Vec<SkuInfo>,
}

/// One SKU's value: a constant, an HII variable, or a VPD offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SkuInfo {
    pub sku_id: Numeric,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub variable_name: Option<String>,
    #[serde(default)]
    pub variable_guid: Option<String>,
    #[serde(default)]
    pub variable_offset: Option<Numeric>,
    #[serde(default)]
    pub hii_default_value: Option<String>,
    #[serde(default)]
    pub vpd_offset: Option<Numeric>,
}

impl PlatformDescription {
    /// Parse a platform description from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let platform: PlatformDescription = toml::from_str(input)?;
        if platform.modules.is_empty() {
            return Err(CollectError::NoModules);
        }
        Ok(platform)
    }

    /// Parse a platform description from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_platform() {
        let toml = r#"
name = "Nt32"

[[modules]]
name = "PcdPeim"
arch = "IA32"
module-type = "PEIM"

[[modules.pcds]]
cname = "PcdFoo"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
item-type = "DYNAMIC"
datum-type = "UINT32"
token = "0x10"
max-datum-size = 4

[[modules]]
name = "Empty"
arch = "X64"
module-type = "DXE_DRIVER"

[[dynamic-pcds]]
cname = "PcdFoo"
token-space-guid = "8be4df61-93ca-11d2-aa0d-00e098032b8c"
max-datum-size = 4

[[dynamic-pcds.sku-info]]
sku-id = 0
value = "0x10"

[[dynamic-pcds.sku-info]]
sku-id = "0x1"
variable-name = "Setup"
variable-guid = "0x8be4df61, 0x93ca, 0x11d2, {0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c}"
variable-offset = 8
hii-default-value = "0"
"#;
        let platform = PlatformDescription::parse(toml).unwrap();
        assert_eq!(platform.name.as_deref(), Some("Nt32"));
        assert_eq!(platform.modules.len(), 2);
        assert_eq!(platform.modules[0].module_type, ModuleType::Peim);
        assert!(platform.modules[1].pcds.is_empty());

        let pcd = &platform.modules[0].pcds[0];
        assert_eq!(pcd.item_type, PcdItemType::Dynamic);
        assert_eq!(pcd.datum_type, DatumType::Uint32);
        assert_eq!(pcd.token.value(), Ok(16));
        assert!(pcd.value.is_none());

        let dynamic = platform.dynamic_pcds.as_ref().unwrap();
        assert_eq!(dynamic[0].sku_info.len(), 2);
        assert_eq!(dynamic[0].sku_info[1].sku_id.value(), Ok(1));
        assert_eq!(
            dynamic[0].sku_info[1].variable_offset,
            Some(Numeric::Number(8))
        );
    }

    #[test]
    fn absent_dynamic_section_is_none() {
        let toml = r#"
[[modules]]
name = "A"
arch = "IA32"
module-type = "SEC"
"#;
        let platform = PlatformDescription::parse(toml).unwrap();
        assert!(platform.dynamic_pcds.is_none());
    }

    #[test]
    fn no_modules_rejected() {
        let err = PlatformDescription::parse("name = \"Empty\"").unwrap_err();
        assert!(matches!(err, CollectError::NoModules));
    }

    #[test]
    fn unknown_datum_type_rejected() {
        let toml = r#"
[[modules]]
name = "A"
arch = "IA32"
module-type = "PEIM"

[[modules.pcds]]
cname = "PcdBad"
item-type = "FIXED_AT_BUILD"
datum-type = "UINT128"
token = 1
"#;
        assert!(matches!(
            PlatformDescription::parse(toml),
            Err(CollectError::Toml(_))
        ));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("platform.toml");
        std::fs::write(
            &path,
            "[[modules]]\nname = \"A\"\narch = \"X64\"\nmodule-type = \"DXE_CORE\"\n",
        )
        .unwrap();
        let platform = PlatformDescription::load(&path).unwrap();
        assert_eq!(platform.modules[0].module_type, ModuleType::DxeCore);
    }
}
