//! Cross-module token merging.
//!
//! Every PCD declaration of every module is folded into a single
//! [`TokenDatabase`]. Each declaration is checked against a copy of the
//! token it refers to and committed only when all checks pass, so a failed
//! declaration never leaves a half-updated token behind.

use std::collections::HashMap;

use pcd_core::validate::IntegerLiteralError;
use pcd_core::{
    parse_guid, validate_datum, HiiReference, PcdError, SkuVariant, Token, TokenKey, Usage,
    ValidationContext, ValueSource,
};
use uuid::Uuid;

use crate::descriptor::{
    DynamicPcdDefinition, ModuleDescriptor, Numeric, PcdDeclaration, PlatformDescription, SkuInfo,
};
use crate::error::{CollectError, Result};

/// All merged tokens, in first-seen order, addressed by identity.
#[derive(Debug, Clone, Default)]
pub struct TokenDatabase {
    tokens: Vec<Token>,
    index: HashMap<TokenKey, usize>,
}

impl TokenDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &TokenKey) -> Option<&Token> {
        self.index.get(key).map(|&i| &self.tokens[i])
    }

    pub fn contains(&self, key: &TokenKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Insert a new token or replace the existing one with the same key.
    fn commit(&mut self, token: Token) {
        match self.index.get(&token.key) {
            Some(&i) => self.tokens[i] = token,
            None => {
                self.index.insert(token.key.clone(), self.tokens.len());
                self.tokens.push(token);
            }
        }
    }
}

/// Merge every module of `platform` into a fresh token database.
pub fn merge_platform(platform: &PlatformDescription) -> Result<TokenDatabase> {
    if platform.modules.is_empty() {
        return Err(CollectError::NoModules);
    }

    let mut merger = TokenMerger::new(platform.dynamic_pcds.as_deref());
    for module in &platform.modules {
        merger.merge_module(module)?;
    }

    let database = merger.finish();
    log::info!(
        "merged {} PCD tokens from {} modules{}",
        database.len(),
        platform.modules.len(),
        platform
            .name
            .as_deref()
            .map(|n| format!(" of platform {n}"))
            .unwrap_or_default()
    );
    Ok(database)
}

/// Single-writer merge state for one platform pass.
pub struct TokenMerger<'a> {
    database: TokenDatabase,
    dynamic: Option<&'a [DynamicPcdDefinition]>,
    seen_modules: Vec<(String, String)>,
}

impl<'a> TokenMerger<'a> {
    pub fn new(dynamic: Option<&'a [DynamicPcdDefinition]>) -> Self {
        Self {
            database: TokenDatabase::new(),
            dynamic,
            seen_modules: Vec::new(),
        }
    }

    /// Fold one module's declarations into the database.
    ///
    /// A module already seen with the same name and architecture is skipped.
    pub fn merge_module(&mut self, module: &ModuleDescriptor) -> Result<()> {
        let duplicate = self.seen_modules.iter().any(|(name, arch)| {
            name.eq_ignore_ascii_case(&module.name) && arch.eq_ignore_ascii_case(&module.arch)
        });
        if duplicate {
            log::debug!(
                "skipping duplicate module {} ({})",
                module.name,
                module.arch
            );
            return Ok(());
        }
        self.seen_modules
            .push((module.name.clone(), module.arch.clone()));

        for declaration in &module.pcds {
            self.merge_declaration(module, declaration)?;
        }
        Ok(())
    }

    pub fn finish(self) -> TokenDatabase {
        self.database
    }

    fn merge_declaration(
        &mut self,
        module: &ModuleDescriptor,
        decl: &PcdDeclaration,
    ) -> Result<()> {
        let cname = decl.cname.as_str();
        let module_name = module.name.as_str();

        let token_space = decl
            .token_space_guid
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .map(parse_guid)
            .transpose()?
            .filter(is_valid_token_space)
            .ok_or_else(|| {
                PcdError::missing(format!(
                    "There is no <TokenSpaceGuid> for PCD {cname} in module {module_name}! This is required!"
                ))
            })?;

        let key = TokenKey::new(cname, token_space);
        let dynamic = decl.item_type.is_dynamic();
        let token_number = decl_token_number(cname, module_name, &decl.token)?;

        let mut token = match self.database.get(&key) {
            Some(existing) => {
                let token = existing.clone();
                check_consistency(&token, module_name, decl, token_number)?;
                token
            }
            None => {
                let mut token = Token::new(
                    key,
                    decl.datum_type,
                    decl.max_datum_size,
                    token_number,
                    dynamic,
                );
                if dynamic {
                    self.resolve_dynamic(&mut token, module_name, decl)?;
                }
                log::debug!(
                    "created token {} ({}, {} bytes, {})",
                    token.primary_key(),
                    token.datum_type,
                    token.datum_size,
                    decl.item_type
                );
                token
            }
        };

        if !dynamic {
            let Some(value) = decl.value.as_deref() else {
                return Err(PcdError::missing(format!(
                    "There is no value for PCD entry {cname} in module {module_name}!"
                ))
                .into());
            };
            validate_datum(
                cname,
                ValidationContext::Module(module_name),
                Some(value),
                decl.datum_type,
                decl.max_datum_size,
            )?;
            if token.sku_data.is_empty() {
                token.add_sku(SkuVariant::new(0, ValueSource::constant(value)))?;
            }
        }

        token.record_usage(Usage {
            module: module.name.clone(),
            arch: module.arch.clone(),
            module_type: module.module_type,
            item_type: decl.item_type,
        });
        self.database.commit(token);
        Ok(())
    }

    /// Fill in size and SKU data from the centralized dynamic definition.
    fn resolve_dynamic(
        &self,
        token: &mut Token,
        module_name: &str,
        decl: &PcdDeclaration,
    ) -> Result<()> {
        let cname = token.key.cname.clone();
        let definition = self.find_dynamic_definition(&token.key, module_name)?;

        token.datum_size = definition.max_datum_size;
        validate_datum(
            &cname,
            ValidationContext::Module(module_name),
            None,
            token.datum_type,
            token.datum_size,
        )?;

        if decl.max_datum_size != 0 && decl.max_datum_size != token.datum_size {
            return Err(PcdError::inconsistent(format!(
                "For dynamic PCD {cname}, the datum size in module {module_name} is {}, but the datum size in <DynamicPcdBuildDefinitions> is {}, they are not match!",
                decl.max_datum_size, definition.max_datum_size
            ))
            .into());
        }

        for (index, sku) in definition.sku_info.iter().enumerate() {
            let variant = sku_variant(token, index, sku, decl.value.as_deref(), module_name)?;
            token.add_sku(variant)?;
        }

        if token.default_sku().is_none() {
            return Err(PcdError::dynamic(format!(
                "For dynamic PCD {cname} in <DynamicPcdBuildDefinitions>, there are no sku id = 0 data, which is required for every dynamic PCD"
            ))
            .into());
        }

        log::trace!(
            "resolved dynamic token {} with {} SKU(s)",
            token.primary_key(),
            token.sku_data.len()
        );
        Ok(())
    }

    fn find_dynamic_definition(
        &self,
        key: &TokenKey,
        module_name: &str,
    ) -> Result<&'a DynamicPcdDefinition> {
        let cname = &key.cname;
        let Some(definitions) = self.dynamic else {
            return Err(PcdError::dynamic(format!(
                "There are no <DynamicPcdBuildDefinitions> in FPD file but contains Dynamic type PCD entry {cname} in module {module_name}!"
            ))
            .into());
        };

        for definition in definitions {
            let space = definition
                .token_space_guid
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| {
                    PcdError::missing(format!(
                        "There is no <TokenSpaceGuid> for PCD {} in <DynamicPcdBuildDefinitions>! This is required!",
                        definition.cname
                    ))
                })?;
            let space = parse_guid(space)?;
            if space == key.token_space && definition.cname.eq_ignore_ascii_case(cname) {
                return Ok(definition);
            }
        }

        Err(PcdError::dynamic(format!(
            "For Dynamic PCD {cname} used by module {module_name}, there is no dynamic information in <DynamicPcdBuildDefinitions> in FPD file, but it is required!"
        ))
        .into())
    }
}

/// Checks a repeated declaration against the already-merged token.
fn check_consistency(
    token: &Token,
    module_name: &str,
    decl: &PcdDeclaration,
    token_number: u32,
) -> Result<()> {
    let cname = &decl.cname;

    if token.datum_type != decl.datum_type {
        return Err(PcdError::inconsistent(format!(
            "The datum type of PCD entry {cname} is {}, which is different with {} defined in before!",
            decl.datum_type, token.datum_type
        ))
        .into());
    }

    if token.declared_token_number != token_number {
        return Err(PcdError::inconsistent(format!(
            "The token number of PCD entry {cname} in module {module_name} is different with same PCD entry in other modules!"
        ))
        .into());
    }

    if token.dynamic != decl.item_type.is_dynamic() {
        return Err(PcdError::inconsistent(format!(
            "For PCD entry {cname} in module {module_name}, you define dynamic or non-dynamic PCD type which is different with others module's"
        ))
        .into());
    }

    if token.dynamic {
        // Only constant defaults can be compared; HII/VPD defaults are resolved at boot.
        if let (false, Some(ValueSource::Constant { value: default }), Some(datum)) = (
            token.is_sku_enabled(),
            token.default_source(),
            decl.value.as_deref(),
        ) {
            if !datum.eq_ignore_ascii_case(default) {
                return Err(PcdError::inconsistent(format!(
                    "For dynamic PCD {cname} in module {module_name}, the datum in <ModuleSA> is not equal to the datum in <DynamicPcdBuildDefinitions>, it is illegal! You could not set <Value> in <ModuleSA> for a dynamic PCD!"
                ))
                .into());
            }
        }

        if decl.max_datum_size != 0 && decl.max_datum_size != token.datum_size {
            return Err(PcdError::inconsistent(format!(
                "For dynamic PCD {cname} in module {module_name}, the max datum size is {} which is different with <MaxDatumSize> {} defined in <DynamicPcdBuildDefinitions>!",
                decl.max_datum_size, token.datum_size
            ))
            .into());
        }
    }

    Ok(())
}

/// Convert one centralized SKU entry into a variant.
fn sku_variant(
    token: &Token,
    index: usize,
    sku: &SkuInfo,
    module_value: Option<&str>,
    module_name: &str,
) -> Result<SkuVariant> {
    let cname = &token.key.cname;
    let sku_id = sku_number(&sku.sku_id)
        .and_then(|id| u32::try_from(id).ok())
        .ok_or_else(|| {
            PcdError::dynamic(format!(
                "For dynamic PCD {cname}, the sku id {} of sku {index} data is not a valid number",
                sku.sku_id
            ))
        })?;

    if let Some(value) = sku.value.as_deref() {
        validate_datum(
            cname,
            ValidationContext::DynamicSection,
            Some(value),
            token.datum_type,
            token.datum_size,
        )?;
        if let Some(datum) = module_value {
            if sku_id == 0 && !datum.eq_ignore_ascii_case(value) {
                return Err(PcdError::inconsistent(format!(
                    "For dynamic PCD {cname}, the value in module {module_name} is {datum} but the value of sku 0 data in <DynamicPcdBuildDefinitions> is {value}. They are must be same! or you could not define value for a dynamic PCD in every <ModuleSA>!"
                ))
                .into());
            }
        }
        return Ok(SkuVariant::new(sku_id, ValueSource::constant(value)));
    }

    if let Some(variable_name) = sku.variable_name.as_deref() {
        let missing: Vec<&str> = [
            ("<VariableGuid>", sku.variable_guid.is_none()),
            ("<VariableOffset>", sku.variable_offset.is_none()),
            ("<HiiDefaultValue>", sku.hii_default_value.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();
        let (Some(guid), Some(offset), Some(default_value)) = (
            sku.variable_guid.as_deref(),
            sku.variable_offset.as_ref(),
            sku.hii_default_value.as_deref(),
        ) else {
            return Err(PcdError::missing(format!(
                "For dynamic PCD {cname} in <DynamicPcdBuildDefinitions> section in FPD file, who use HII, but there is no {} defined for Sku {index} data!",
                missing.join(", ")
            ))
            .into());
        };

        validate_datum(
            cname,
            ValidationContext::DynamicSection,
            Some(default_value),
            token.datum_type,
            token.datum_size,
        )?;

        let variable_offset = match offset.value() {
            Ok(value) if value <= u16::MAX as u128 => value as u16,
            Ok(_) | Err(IntegerLiteralError::Overflow) => {
                return Err(PcdError::dynamic(format!(
                    "For dynamic PCD {cname}, the variable offset defined in sku {index} data exceed 64K, it is not allowed!"
                ))
                .into());
            }
            Err(IntegerLiteralError::Invalid) => {
                return Err(PcdError::dynamic(format!(
                    "For dynamic PCD {cname}, the variable offset {offset} defined in sku {index} data is not a valid number"
                ))
                .into());
            }
        };

        return Ok(SkuVariant::new(
            sku_id,
            ValueSource::Hii(HiiReference {
                variable_name: variable_name.to_string(),
                variable_guid: parse_guid(guid)?,
                variable_offset,
                default_value: default_value.to_string(),
            }),
        ));
    }

    if let Some(offset) = sku.vpd_offset.as_ref() {
        let offset = sku_number(offset)
            .and_then(|value| u32::try_from(value).ok())
            .ok_or_else(|| {
                PcdError::dynamic(format!(
                    "For dynamic PCD {cname}, the VPD offset {offset} defined in sku {index} data is not a valid 32-bit offset"
                ))
            })?;
        return Ok(SkuVariant::new(sku_id, ValueSource::Vpd { offset }));
    }

    Err(PcdError::dynamic(format!(
        "For dynamic PCD {cname}, the dynamic info must be one of 'DefaultGroup', 'HIIGroup', 'VpdGroup'."
    ))
    .into())
}

fn sku_number(number: &Numeric) -> Option<u128> {
    number.value().ok()
}

fn decl_token_number(cname: &str, module_name: &str, token: &Numeric) -> Result<u32> {
    token
        .value()
        .ok()
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| {
            PcdError::mismatch(format!(
                "The token number {token} of PCD entry {cname} in module {module_name} is not a valid 32-bit number"
            ))
            .into()
        })
}

/// Nil GUIDs never identify a token space.
pub fn is_valid_token_space(guid: &Uuid) -> bool {
    !guid.is_nil()
}
