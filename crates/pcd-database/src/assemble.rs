//! Per-phase database assembly.
//!
//! Tokens are split into those with a build-time default (laid out in the
//! `Init` structure) and those without (`Uninit`), each group sorted by
//! descending alignment so the emitted fields pack tightly. Every token is
//! then encoded into structure fields and the phase's layout tables.

use std::cmp::Reverse;

use pcd_collect::Phase;
use pcd_core::{pointer_bytes, DatumType, HiiReference, Token, ValueSource};

use crate::error::{DatabaseError, Result};
use crate::table::{
    ExMapEntry, GuidEntry, LayoutTables, LocalTokenEntry, SizeEntry, SkuIdEntry, Storage,
    StringEntry, TokenTypeFlags,
};

/// Version of the generated layout understood by the PCD service drivers.
pub const SERVICE_DRIVER_VERSION: u32 = 1;

const NEW_LINE: &str = "\r\n";
const DECL_NEW_LINE: &str = ";\r\n";
const TAB: &str = "\t";
const COMMA_NEW_LINE: &str = ", \r\n";

/// How a token's value is stored in the database structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding<'t> {
    /// Native field initialized with the literal.
    Plain,
    /// SKU head plus a per-SKU value array.
    SkuEnabled,
    /// Variable GUID, name and offset resolved at boot.
    IndirectVariable(&'t HiiReference),
    /// Offset into the VPD blob.
    OffsetReference(u32),
    /// Index of a UTF-16 string in the string table.
    StringPooled(&'t str),
}

impl<'t> FieldEncoding<'t> {
    pub fn of(token: &'t Token) -> Self {
        if token.is_sku_enabled() {
            return FieldEncoding::SkuEnabled;
        }
        match token.default_source() {
            Some(ValueSource::Hii(hii)) => FieldEncoding::IndirectVariable(hii),
            Some(ValueSource::Vpd { offset }) => FieldEncoding::OffsetReference(*offset),
            _ => match token.unicode_string() {
                Some(body) => FieldEncoding::StringPooled(body),
                None => FieldEncoding::Plain,
            },
        }
    }
}

/// One phase's generated text and its numbered tokens.
#[derive(Debug, Clone)]
pub struct PhaseDatabase {
    pub phase: Phase,
    /// Macros, structure declarations and the version macro.
    pub header: String,
    /// The Init structure initializer.
    pub source: String,
    /// Tokens in layout order with their assigned numbers.
    pub tokens: Vec<Token>,
}

impl PhaseDatabase {
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }
}

/// Declarations and initializers produced for one token group.
#[derive(Debug, Default)]
struct StructBody {
    declarations: Vec<String>,
    sku_declarations: Vec<String>,
    instantiations: Vec<String>,
    sku_instantiations: Vec<String>,
}

/// Builds one phase's database.
pub struct DatabaseAssembler {
    phase: Phase,
    next_token_number: u32,
    tables: LayoutTables,
}

impl DatabaseAssembler {
    /// Token numbers start at `first_token_number`.
    pub fn new(phase: Phase, first_token_number: u32) -> Self {
        Self {
            phase,
            next_token_number: first_token_number,
            tables: LayoutTables::new(phase),
        }
    }

    pub fn tables(&self) -> &LayoutTables {
        &self.tables
    }

    /// Lay out `tokens` and render the phase's header and source text.
    pub fn assemble(mut self, tokens: &[Token]) -> Result<PhaseDatabase> {
        let (mut init, mut uninit): (Vec<Token>, Vec<Token>) =
            tokens.iter().cloned().partition(Token::has_default_value);

        init.sort_by_key(|t| Reverse(t.alignment()));
        uninit.sort_by_key(|t| Reverse(t.alignment()));

        let init_body = self.process_tokens(&mut init)?;
        let uninit_body = self.process_tokens(&mut uninit)?;

        let header = self.render_header(&init_body, &uninit_body);
        let source = self.render_source(&init_body);

        log::info!(
            "{} database: {} tokens ({} init, {} uninit), {} strings, {} GUIDs, {} SKU rows, {} ex-mapped",
            self.phase,
            init.len() + uninit.len(),
            init.len(),
            uninit.len(),
            self.tables.strings.len(),
            self.tables.guids.len(),
            self.tables.sku_ids.len(),
            self.tables.ex_map.len()
        );

        init.extend(uninit);
        Ok(PhaseDatabase {
            phase: self.phase,
            header,
            source,
            tokens: init,
        })
    }

    fn process_tokens(&mut self, tokens: &mut [Token]) -> Result<StructBody> {
        let mut body = StructBody::default();

        for token in tokens.iter_mut() {
            let key = token.primary_key();
            let encoding = FieldEncoding::of(token);
            log::debug!("{} {key}: {encoding:?}", self.phase);

            match encoding {
                FieldEncoding::SkuEnabled => {
                    let index = self.tables.sku_ids.add(
                        SkuIdEntry {
                            sku_ids: token.sku_data.iter().map(|s| s.sku_id).collect(),
                        },
                        key.as_str(),
                    );
                    body.declarations.push(format!("SKU_HEAD {key}"));
                    body.sku_declarations.push(sku_data_declaration(token)?);
                    if token.has_default_value() {
                        body.instantiations.push(format!(
                            "{{ offsetof({}_PCD_DATABASE, {}.{key}_SkuDataTable), {index} }}",
                            self.phase,
                            storage_of(token).name()
                        ));
                        let values = self.sku_data_instantiation(token);
                        body.sku_instantiations.push(values);
                    }
                }
                FieldEncoding::IndirectVariable(hii) => {
                    body.declarations.push(format!("VARIABLE_HEAD  {key}"));
                    let (guid_index, string_index) = self.pool_variable(hii, &key);
                    body.instantiations.push(format!(
                        "{{ {guid_index}, {string_index}, {} }} /* {key} */",
                        hii.variable_offset
                    ));
                }
                FieldEncoding::OffsetReference(offset) => {
                    body.declarations.push(format!("VPD_HEAD {key}"));
                    body.instantiations.push(format!("{{ {offset} }} /* {key} */"));
                }
                FieldEncoding::StringPooled(text) => {
                    body.declarations.push(format!("UINT16  {key}"));
                    let index = self.tables.strings.add(StringEntry::new(text), key.as_str());
                    body.instantiations.push(format!("{index} /* {key} */"));
                }
                FieldEncoding::Plain => {
                    body.declarations.push(plain_declaration(token));
                    if token.has_default_value() {
                        if let Some(value) =
                            token.default_source().and_then(ValueSource::constant_value)
                        {
                            body.instantiations
                                .push(format!("{} /* {key} */", value.trim()));
                        }
                    }
                }
            }

            self.tables.sizes.add(SizeEntry(token.datum_size), key.as_str());
            let local_index = self.tables.local_tokens.add(
                LocalTokenEntry {
                    phase: self.phase,
                    storage: storage_of(token),
                    field: key.clone(),
                    flags: type_flags(token),
                },
                key.as_str(),
            );

            if token.is_dynamic_ex() {
                let guid_index = self
                    .tables
                    .guids
                    .add(GuidEntry(token.key.token_space), key.as_str());
                self.tables.ex_map.add(
                    ExMapEntry {
                        ex_token_number: token.declared_token_number,
                        local_token_index: local_index,
                        guid_index,
                    },
                    key.as_str(),
                );
            }

            token.token_number = Some(self.next_token_number);
            self.next_token_number =
                self.next_token_number
                    .checked_add(1)
                    .ok_or_else(|| DatabaseError::TokenNumberOverflow {
                        phase: self.phase.to_string(),
                        cname: token.key.cname.clone(),
                    })?;
        }

        Ok(body)
    }

    /// Add a variable's GUID and name to the tables, returning their indices.
    fn pool_variable(&mut self, hii: &HiiReference, key: &str) -> (usize, usize) {
        let guid_index = self.tables.guids.add(GuidEntry(hii.variable_guid), key);
        let string_index = self
            .tables
            .strings
            .add(StringEntry::new(&hii.variable_name), key);
        (guid_index, string_index)
    }

    fn sku_data_instantiation(&mut self, token: &Token) -> String {
        if token.datum_type == DatumType::Pointer {
            return pointer_sku_data(token);
        }
        let key = token.primary_key();
        let values: Vec<String> = token
            .sku_data
            .iter()
            .map(|sku| {
                sku.source
                    .render_initializer(|hii| self.pool_variable(hii, &key))
            })
            .collect();
        format!("{{ {} }}", values.join(", "))
    }

    fn render_header(&self, init: &StructBody, uninit: &StructBody) -> String {
        let phase = self.phase;

        let mut init_decl = format!("typedef struct {{{NEW_LINE}");
        for declaration in self.tables.declarations() {
            init_decl.push_str(TAB);
            init_decl.push_str(&declaration);
        }
        if phase.has_system_sku() {
            init_decl.push_str(&format!("{TAB}SKU_ID            SystemSkuId;{NEW_LINE}"));
        }
        for declaration in init.declarations.iter().chain(&init.sku_declarations) {
            init_decl.push_str(&format!("{TAB}{declaration}{DECL_NEW_LINE}"));
        }
        init_decl.push_str(&format!("}} {phase}_PCD_DATABASE_INIT;{NEW_LINE}{NEW_LINE}"));

        let mut uninit_decl = format!("typedef struct {{{NEW_LINE}");
        if uninit.declarations.is_empty() {
            uninit_decl.push_str(&format!(
                "UINT8 dummy /* The UINT struct is empty */{DECL_NEW_LINE}"
            ));
        } else {
            for declaration in uninit.declarations.iter().chain(&uninit.sku_declarations) {
                uninit_decl.push_str(&format!("{TAB}{declaration}{DECL_NEW_LINE}"));
            }
        }
        uninit_decl.push_str(&format!("}} {phase}_PCD_DATABASE_UNINIT;{NEW_LINE}{NEW_LINE}"));

        format!(
            "{}{NEW_LINE}{init_decl}{NEW_LINE}{uninit_decl}{NEW_LINE}{NEW_LINE}#define PCD_{phase}_SERVICE_DRIVER_VERSION\t\t\t{SERVICE_DRIVER_VERSION}",
            self.tables.macros()
        )
    }

    fn render_source(&self, init: &StructBody) -> String {
        let phase = self.phase;
        let mut out = format!("{phase}_PCD_DATABASE_INIT g{phase}PcdDbInit = {{ {NEW_LINE}");

        for table in self.tables.instantiations() {
            out.push_str(TAB);
            out.push_str(&instantiation_block(&table));
            out.push_str(COMMA_NEW_LINE);
        }
        if phase.has_system_sku() {
            out.push_str(&format!("{TAB}0{TAB}/* SystemSkuId */{COMMA_NEW_LINE}"));
        }
        for instantiation in &init.instantiations {
            out.push_str(&format!("{TAB}{instantiation}{COMMA_NEW_LINE}"));
        }
        let sku = init
            .sku_instantiations
            .iter()
            .map(|s| format!("{TAB}{s}"))
            .collect::<Vec<_>>()
            .join(COMMA_NEW_LINE);
        out.push_str(&sku);
        out.push_str("};");
        out.push_str(NEW_LINE);
        out
    }
}

/// Tab-indent each initializer line of one table.
fn instantiation_block(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("{TAB}{line}"))
        .collect::<Vec<_>>()
        .join(NEW_LINE)
}

fn storage_of(token: &Token) -> Storage {
    if token.has_default_value() {
        Storage::Init
    } else {
        Storage::Uninit
    }
}

fn type_flags(token: &Token) -> TokenTypeFlags {
    let kind = token.default_source();
    TokenTypeFlags {
        string: token.is_unicode_string(),
        sku_enabled: token.is_sku_enabled(),
        hii: matches!(kind, Some(ValueSource::Hii(_))),
        vpd: matches!(kind, Some(ValueSource::Vpd { .. })),
    }
}

fn plain_declaration(token: &Token) -> String {
    let key = token.primary_key();
    match token.datum_type {
        DatumType::Pointer => format!("UINT8 {key}[{}]", token.datum_size),
        other => format!("{}    {key}", other.c_type()),
    }
}

fn sku_data_declaration(token: &Token) -> Result<String> {
    let key = token.primary_key();
    let count = token.sku_data.len();
    Ok(match token.datum_type {
        DatumType::Pointer => {
            let bytes = u32::try_from(count)
                .ok()
                .and_then(|count| token.datum_size.checked_mul(count))
                .ok_or_else(|| DatabaseError::SkuDataOverflow {
                    cname: token.key.cname.clone(),
                    datum_size: token.datum_size,
                    skus: count,
                })?;
            format!("UINT8 {key}_SkuDataTable[{bytes}]")
        }
        other => format!("{} {key}_SkuDataTable[{count}]", other.c_type()),
    })
}

/// One `datum_size` slot of bytes per SKU, each zero-padded.
///
/// HII variants store their default value; VPD variants are read at boot
/// and stay zero.
fn pointer_sku_data(token: &Token) -> String {
    let size = token.datum_size as usize;
    let mut bytes = Vec::with_capacity(size * token.sku_data.len());
    for sku in &token.sku_data {
        let mut slot = match &sku.source {
            ValueSource::Constant { value } => pointer_bytes(value),
            ValueSource::Hii(hii) => pointer_bytes(&hii.default_value),
            ValueSource::Vpd { .. } => Vec::new(),
        };
        slot.truncate(size);
        slot.resize(size, "0x00".to_string());
        bytes.extend(slot);
    }
    format!("{{ {} }}", bytes.join(", "))
}
