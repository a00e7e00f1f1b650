//! Splitting merged tokens between the two firmware phases.

use std::fmt;

use pcd_core::Token;
use serde::{Deserialize, Serialize};

use crate::merge::TokenDatabase;

/// Firmware execution stage a database is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Pei,
    Dxe,
}

impl Phase {
    /// Prefix used in generated C identifiers and macros.
    pub fn name(self) -> &'static str {
        match self {
            Phase::Pei => "PEI",
            Phase::Dxe => "DXE",
        }
    }

    /// Whether the phase carries the platform SKU selector field.
    pub fn has_system_sku(self) -> bool {
        self == Phase::Pei
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tokens assigned to each phase, in merge order.
#[derive(Debug, Clone, Default)]
pub struct PhaseTokens {
    pub pei: Vec<Token>,
    pub dxe: Vec<Token>,
}

impl PhaseTokens {
    pub fn get(&self, phase: Phase) -> &[Token] {
        match phase {
            Phase::Pei => &self.pei,
            Phase::Dxe => &self.dxe,
        }
    }
}

/// The phase whose database holds `token`.
pub fn phase_of(token: &Token) -> Phase {
    if token.used_in_pei() {
        Phase::Pei
    } else {
        Phase::Dxe
    }
}

/// Partition the merged tokens by phase.
///
/// Only dynamic tokens are kept unless `include_static` is set.
pub fn partition(database: &TokenDatabase, include_static: bool) -> PhaseTokens {
    let mut tokens = PhaseTokens::default();
    for token in database.tokens() {
        if !token.dynamic && !include_static {
            continue;
        }
        match phase_of(token) {
            Phase::Pei => tokens.pei.push(token.clone()),
            Phase::Dxe => tokens.dxe.push(token.clone()),
        }
    }
    log::debug!(
        "partitioned tokens: {} PEI, {} DXE",
        tokens.pei.len(),
        tokens.dxe.len()
    );
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{
        DynamicPcdDefinition, ModuleDescriptor, Numeric, PcdDeclaration, PlatformDescription,
        SkuInfo,
    };
    use crate::merge::merge_platform;
    use pcd_core::{DatumType, ModuleType, PcdItemType};

    const SPACE: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";

    fn decl(cname: &str, item_type: PcdItemType, token: u64) -> PcdDeclaration {
        PcdDeclaration {
            cname: cname.into(),
            token_space_guid: Some(SPACE.into()),
            item_type,
            datum_type: DatumType::Uint8,
            token: Numeric::Number(token),
            max_datum_size: 1,
            value: (!item_type.is_dynamic()).then(|| "1".to_string()),
        }
    }

    fn dynamic(cname: &str) -> DynamicPcdDefinition {
        DynamicPcdDefinition {
            cname: cname.into(),
            token_space_guid: Some(SPACE.into()),
            max_datum_size: 1,
            sku_info: vec![SkuInfo {
                sku_id: Numeric::Number(0),
                value: Some("1".into()),
                variable_name: None,
                variable_guid: None,
                variable_offset: None,
                hii_default_value: None,
                vpd_offset: None,
            }],
        }
    }

    fn platform() -> PlatformDescription {
        PlatformDescription {
            name: Some("Test".into()),
            modules: vec![
                ModuleDescriptor {
                    name: "PcdPeim".into(),
                    arch: "IA32".into(),
                    module_type: ModuleType::Peim,
                    pcds: vec![
                        decl("PcdShared", PcdItemType::Dynamic, 1),
                        decl("PcdPeiOnly", PcdItemType::DynamicEx, 2),
                        decl("PcdFixed", PcdItemType::FixedAtBuild, 3),
                    ],
                },
                ModuleDescriptor {
                    name: "PcdDxe".into(),
                    arch: "X64".into(),
                    module_type: ModuleType::DxeDriver,
                    pcds: vec![
                        decl("PcdShared", PcdItemType::Dynamic, 1),
                        decl("PcdDxeOnly", PcdItemType::Dynamic, 4),
                    ],
                },
            ],
            dynamic_pcds: Some(vec![
                dynamic("PcdShared"),
                dynamic("PcdPeiOnly"),
                dynamic("PcdDxeOnly"),
            ]),
        }
    }

    fn names(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.key.cname.as_str()).collect()
    }

    #[test]
    fn pei_usage_wins() {
        let db = merge_platform(&platform()).unwrap();
        let tokens = partition(&db, false);
        assert_eq!(names(&tokens.pei), ["PcdShared", "PcdPeiOnly"]);
        assert_eq!(names(&tokens.dxe), ["PcdDxeOnly"]);
    }

    #[test]
    fn static_tokens_opt_in() {
        let db = merge_platform(&platform()).unwrap();
        let tokens = partition(&db, true);
        assert_eq!(names(tokens.get(Phase::Pei)), ["PcdShared", "PcdPeiOnly", "PcdFixed"]);
        assert_eq!(tokens.get(Phase::Dxe).len(), 1);
    }

    #[test]
    fn phase_names() {
        assert_eq!(Phase::Pei.to_string(), "PEI");
        assert_eq!(Phase::Dxe.name(), "DXE");
        assert!(Phase::Pei.has_system_sku());
        assert!(!Phase::Dxe.has_system_sku());
    }
}
