//! Merged token representation.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datum::{self, DatumType, SkuVariant, SourceKind, ValueSource};
use crate::error::{PcdError, Result};
use crate::guid::guid_identifier;

/// How a module consumes a PCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PcdItemType {
    FixedAtBuild,
    FeatureFlag,
    PatchableInModule,
    Dynamic,
    DynamicEx,
}

impl PcdItemType {
    pub fn is_dynamic(self) -> bool {
        matches!(self, PcdItemType::Dynamic | PcdItemType::DynamicEx)
    }
}

impl fmt::Display for PcdItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PcdItemType::FixedAtBuild => "FIXED_AT_BUILD",
            PcdItemType::FeatureFlag => "FEATURE_FLAG",
            PcdItemType::PatchableInModule => "PATCHABLE_IN_MODULE",
            PcdItemType::Dynamic => "DYNAMIC",
            PcdItemType::DynamicEx => "DYNAMIC_EX",
        };
        f.write_str(name)
    }
}

/// Firmware module category, which decides the phase a token lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModuleType {
    #[serde(rename = "SEC")]
    Sec,
    #[serde(rename = "PEI_CORE")]
    PeiCore,
    #[serde(rename = "PEIM")]
    Peim,
    #[serde(rename = "DXE_CORE")]
    DxeCore,
    #[serde(rename = "DXE_DRIVER", alias = "DXE_DRIVERS")]
    DxeDriver,
    #[serde(rename = "OTHER", alias = "OTHER_COMPONENTS")]
    Other,
}

impl ModuleType {
    /// Whether modules of this type execute before DXE.
    pub fn runs_in_pei(self) -> bool {
        matches!(self, ModuleType::Sec | ModuleType::PeiCore | ModuleType::Peim)
    }
}

/// Identity of a token: C name plus token-space GUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenKey {
    pub cname: String,
    pub token_space: Uuid,
}

impl TokenKey {
    pub fn new(cname: impl Into<String>, token_space: Uuid) -> Self {
        Self {
            cname: cname.into(),
            token_space,
        }
    }
}

/// Renders the primary key string, e.g. `PcdFoo_8be4df61_93ca_...`.
impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.cname, guid_identifier(&self.token_space))
    }
}

/// A module that declared the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub module: String,
    pub arch: String,
    pub module_type: ModuleType,
    pub item_type: PcdItemType,
}

/// The merged record for one PCD across every module that uses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub key: TokenKey,
    pub datum_type: DatumType,
    /// Size in bytes; for `VOID*` the maximum size.
    pub datum_size: u32,
    /// Token number as written in the module descriptors.
    pub declared_token_number: u32,
    pub dynamic: bool,
    /// Per-SKU values in declaration order. Sku 0 is the default.
    pub sku_data: Vec<SkuVariant>,
    pub item_types: BTreeSet<PcdItemType>,
    pub usages: Vec<Usage>,
    /// Number assigned while laying out the database.
    pub token_number: Option<u32>,
}

impl Token {
    pub fn new(
        key: TokenKey,
        datum_type: DatumType,
        datum_size: u32,
        declared_token_number: u32,
        dynamic: bool,
    ) -> Self {
        Self {
            key,
            datum_type,
            datum_size,
            declared_token_number,
            dynamic,
            sku_data: Vec::new(),
            item_types: BTreeSet::new(),
            usages: Vec::new(),
            token_number: None,
        }
    }

    pub fn primary_key(&self) -> String {
        self.key.to_string()
    }

    /// Append a SKU variant; each sku id may appear once.
    pub fn add_sku(&mut self, variant: SkuVariant) -> Result<()> {
        if self.sku_data.iter().any(|s| s.sku_id == variant.sku_id) {
            return Err(PcdError::dynamic(format!(
                "For dynamic PCD {}, sku id {} is defined more than once",
                self.key.cname, variant.sku_id
            )));
        }
        self.sku_data.push(variant);
        Ok(())
    }

    pub fn default_sku(&self) -> Option<&SkuVariant> {
        self.sku_data.iter().find(|s| s.sku_id == 0)
    }

    pub fn default_source(&self) -> Option<&ValueSource> {
        self.default_sku().map(|s| &s.source)
    }

    pub fn default_kind(&self) -> Option<SourceKind> {
        self.default_source().map(ValueSource::kind)
    }

    pub fn is_sku_enabled(&self) -> bool {
        self.sku_data.len() > 1
    }

    pub fn is_dynamic_ex(&self) -> bool {
        self.item_types.contains(&PcdItemType::DynamicEx)
    }

    /// Body of the default value when it is a `L"..."` string of a `VOID*` token.
    pub fn unicode_string(&self) -> Option<&str> {
        if self.datum_type != DatumType::Pointer {
            return None;
        }
        self.default_source()
            .and_then(ValueSource::constant_value)
            .and_then(datum::unicode_string_body)
    }

    pub fn is_unicode_string(&self) -> bool {
        self.unicode_string().is_some()
    }

    /// Whether the token is placed in the initialized database structure.
    pub fn has_default_value(&self) -> bool {
        if self.is_sku_enabled() {
            return true;
        }
        match self.default_source() {
            Some(ValueSource::Hii(_)) | Some(ValueSource::Vpd { .. }) => true,
            Some(ValueSource::Constant { value }) => {
                !datum::is_null_value(self.datum_type, value)
            }
            None => false,
        }
    }

    pub fn alignment(&self) -> u32 {
        match self.default_source() {
            Some(source) => datum::alignment(self.datum_type, source),
            None => datum::alignment(self.datum_type, &ValueSource::constant("")),
        }
    }

    pub fn record_usage(&mut self, usage: Usage) {
        self.item_types.insert(usage.item_type);
        self.usages.push(usage);
    }

    /// Whether any consuming module runs before DXE.
    pub fn used_in_pei(&self) -> bool {
        self.usages.iter().any(|u| u.module_type.runs_in_pei())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::HiiReference;

    fn key(name: &str) -> TokenKey {
        TokenKey::new(name, Uuid::from_u128(0x8be4df61_93ca_11d2_aa0d_00e098032b8c))
    }

    fn constant_token(datum_type: DatumType, size: u32, value: &str) -> Token {
        let mut token = Token::new(key("PcdTest"), datum_type, size, 1, true);
        token
            .add_sku(SkuVariant::new(0, ValueSource::constant(value)))
            .unwrap();
        token
    }

    #[test]
    fn primary_key_string() {
        assert_eq!(
            key("PcdFoo").to_string(),
            "PcdFoo_8be4df61_93ca_11d2_aa0d_00e098032b8c"
        );
    }

    #[test]
    fn duplicate_sku_rejected() {
        let mut token = constant_token(DatumType::Uint8, 1, "1");
        assert!(token
            .add_sku(SkuVariant::new(0, ValueSource::constant("2")))
            .is_err());
        token
            .add_sku(SkuVariant::new(1, ValueSource::constant("2")))
            .unwrap();
        assert!(token.is_sku_enabled());
    }

    #[test]
    fn default_value_detection() {
        assert!(constant_token(DatumType::Uint32, 4, "0x10").has_default_value());
        assert!(!constant_token(DatumType::Uint32, 4, "0").has_default_value());
        assert!(!constant_token(DatumType::Boolean, 1, "FALSE").has_default_value());

        let mut vpd = Token::new(key("PcdVpd"), DatumType::Uint32, 4, 2, true);
        vpd.add_sku(SkuVariant::new(0, ValueSource::Vpd { offset: 0 }))
            .unwrap();
        assert!(vpd.has_default_value());
    }

    #[test]
    fn unicode_string_detection() {
        let token = constant_token(DatumType::Pointer, 16, "L\"Boot\"");
        assert_eq!(token.unicode_string(), Some("Boot"));
        assert_eq!(token.alignment(), 2);

        let narrow = constant_token(DatumType::Pointer, 16, "\"Boot\"");
        assert!(!narrow.is_unicode_string());
        assert_eq!(narrow.alignment(), 1);
    }

    #[test]
    fn hii_default_alignment() {
        let mut token = Token::new(key("PcdHii"), DatumType::Uint64, 8, 3, true);
        token
            .add_sku(SkuVariant::new(
                0,
                ValueSource::Hii(HiiReference {
                    variable_name: "Setup".into(),
                    variable_guid: Uuid::nil(),
                    variable_offset: 4,
                    default_value: "0".into(),
                }),
            ))
            .unwrap();
        assert_eq!(token.alignment(), 2);
        assert_eq!(token.default_kind(), Some(SourceKind::Hii));
    }

    #[test]
    fn usages_drive_phase_and_classification() {
        let mut token = constant_token(DatumType::Uint8, 1, "1");
        token.record_usage(Usage {
            module: "DxeMain".into(),
            arch: "X64".into(),
            module_type: ModuleType::DxeCore,
            item_type: PcdItemType::Dynamic,
        });
        assert!(!token.used_in_pei());
        assert!(!token.is_dynamic_ex());

        token.record_usage(Usage {
            module: "PcdPeim".into(),
            arch: "IA32".into(),
            module_type: ModuleType::Peim,
            item_type: PcdItemType::DynamicEx,
        });
        assert!(token.used_in_pei());
        assert!(token.is_dynamic_ex());
        assert_eq!(token.item_types.len(), 2);
    }
}
