//! Layout tables of a phase database.
//!
//! Every table is an append-only [`Pool`] of one entry encoding. An entry's
//! index is its insertion position and never changes, since other tables and
//! structure fields refer to entries by index.

use pcd_collect::Phase;
use pcd_core::guid_initializer;
use uuid::Uuid;

/// Encoding of one table's entries.
pub trait PoolEntry: Sized {
    /// Table name as it appears in the generated structure.
    const TABLE: &'static str;

    /// Whether the initializer rows are wrapped in one brace pair.
    const BRACED: bool = true;

    /// One initializer row, annotated with `comment`.
    fn render(&self, comment: &str, last: bool) -> String;

    /// Row emitted when the table is empty.
    fn placeholder() -> String;

    /// Units this entry adds to the table's running length.
    fn width(&self) -> usize {
        1
    }

    /// Field declaration(s) inside the Init structure.
    fn declaration(phase: Phase, rows: &[PoolRow<Self>]) -> String;

    /// Size macro lines, if the table has its own.
    fn size_macro(_phase: Phase, _rows: usize, _length: usize) -> String {
        String::new()
    }

    /// Emptiness macro line, if the table has one.
    fn existence_macro(_phase: Phase, _empty: bool) -> String {
        String::new()
    }
}

/// An entry together with the primary key of the token that added it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRow<E> {
    pub entry: E,
    pub comment: String,
}

/// Append-only indexed table.
#[derive(Debug, Clone)]
pub struct Pool<E> {
    phase: Phase,
    rows: Vec<PoolRow<E>>,
    length: usize,
}

impl<E: PoolEntry> Pool<E> {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            rows: Vec::new(),
            length: 0,
        }
    }

    /// Append an entry and return its index.
    pub fn add(&mut self, entry: E, comment: impl Into<String>) -> usize {
        let index = self.rows.len();
        self.length += entry.width();
        let comment = comment.into();
        log::trace!("{} {}[{index}] <- {comment}", self.phase, E::TABLE);
        self.rows.push(PoolRow { entry, comment });
        index
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[PoolRow<E>] {
        &self.rows
    }

    /// Running length in table units; at least 1 so the C array is never zero-sized.
    pub fn length(&self) -> usize {
        self.length.max(1)
    }

    /// Initializer lines, starting with a comment naming the table.
    pub fn instantiate(&self) -> Vec<String> {
        let mut lines = vec![format!("/* {} */", E::TABLE)];
        if E::BRACED {
            lines.push("{".to_string());
        }
        if self.rows.is_empty() {
            lines.push(E::placeholder());
        }
        let last = self.rows.len().saturating_sub(1);
        lines.extend(
            self.rows
                .iter()
                .enumerate()
                .map(|(i, row)| row.entry.render(&row.comment, i == last)),
        );
        if E::BRACED {
            lines.push("}".to_string());
        }
        lines
    }

    pub fn declaration(&self) -> String {
        E::declaration(self.phase, &self.rows)
    }

    pub fn size_macro(&self) -> String {
        E::size_macro(self.phase, self.rows.len(), self.length())
    }

    pub fn existence_macro(&self) -> String {
        E::existence_macro(self.phase, self.rows.is_empty())
    }
}

fn flag(empty: bool) -> &'static str {
    if empty {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn separator(last: bool) -> &'static str {
    if last {
        ""
    } else {
        ","
    }
}

/// A string stored as UTF-16 code units, terminated implicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    units: Vec<u16>,
}

impl StringEntry {
    pub fn new(text: &str) -> Self {
        Self {
            units: text.encode_utf16().collect(),
        }
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }
}

impl PoolEntry for StringEntry {
    const TABLE: &'static str = "StringTable";
    // Each string is its own field, so rows initialize consecutive arrays.
    const BRACED: bool = false;

    fn render(&self, comment: &str, last: bool) -> String {
        format!(
            "L\"{}\" /* {comment} */{}",
            String::from_utf16_lossy(&self.units),
            separator(last)
        )
    }

    fn placeholder() -> String {
        "{ 0 }".to_string()
    }

    fn width(&self) -> usize {
        self.units.len() + 1
    }

    fn declaration(_phase: Phase, rows: &[PoolRow<Self>]) -> String {
        let mut out = String::from("/* StringTable */\r\n");
        if rows.is_empty() {
            out.push_str("\tUINT16 StringTable[1] /* StringTable is Empty */;\r\n");
        }
        for (i, row) in rows.iter().enumerate() {
            let len = row.entry.units.len() + 1;
            if i == 0 {
                out.push_str(&format!(
                    "\tUINT16       StringTable[{len}] /* {} */;\r\n",
                    row.comment
                ));
            } else {
                out.push_str(&format!(
                    "\tUINT16       StringTable_{i}[{len}] /* {} */;\r\n",
                    row.comment
                ));
            }
        }
        out
    }

    fn size_macro(phase: Phase, _rows: usize, length: usize) -> String {
        format!("#define {phase}_STRING_TABLE_SIZE       {length}\r\n")
    }

    fn existence_macro(phase: Phase, empty: bool) -> String {
        format!("#define {phase}_STRING_TABLE_EMPTY   {}\r\n", flag(empty))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuidEntry(pub Uuid);

impl PoolEntry for GuidEntry {
    const TABLE: &'static str = "GuidTable";

    fn render(&self, comment: &str, last: bool) -> String {
        format!(
            "{}{} /* {comment} */",
            guid_initializer(&self.0),
            separator(last)
        )
    }

    fn placeholder() -> String {
        guid_initializer(&Uuid::nil())
    }

    fn declaration(phase: Phase, _rows: &[PoolRow<Self>]) -> String {
        format!("EFI_GUID          GuidTable[{phase}_GUID_TABLE_SIZE];\r\n")
    }

    fn size_macro(phase: Phase, rows: usize, _length: usize) -> String {
        format!("#define {phase}_GUID_TABLE_SIZE         {}\r\n", rows.max(1))
    }

    fn existence_macro(phase: Phase, empty: bool) -> String {
        format!("#define {phase}_GUID_TABLE_EMPTY     {}\r\n", flag(empty))
    }
}

/// The SKU ids of one SKU-enabled token, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuIdEntry {
    pub sku_ids: Vec<u32>,
}

impl PoolEntry for SkuIdEntry {
    const TABLE: &'static str = "SkuIdTable";

    fn render(&self, comment: &str, last: bool) -> String {
        let ids: Vec<String> = self.sku_ids.iter().map(u32::to_string).collect();
        format!(
            "/* {comment} */ /* MaxSku */ {}, {}{}",
            self.sku_ids.len(),
            ids.join(", "),
            separator(last)
        )
    }

    fn placeholder() -> String {
        "0".to_string()
    }

    /// One count byte followed by the ids.
    fn width(&self) -> usize {
        self.sku_ids.len() + 1
    }

    fn declaration(phase: Phase, _rows: &[PoolRow<Self>]) -> String {
        format!("UINT8             SkuIdTable[{phase}_SKUID_TABLE_SIZE];\r\n")
    }

    fn size_macro(phase: Phase, _rows: usize, length: usize) -> String {
        format!("#define {phase}_SKUID_TABLE_SIZE        {length}\r\n")
    }

    fn existence_macro(phase: Phase, empty: bool) -> String {
        format!("#define {phase}_SKUID_TABLE_EMPTY    {}\r\n", flag(empty))
    }
}

/// Declared datum size of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeEntry(pub u32);

impl PoolEntry for SizeEntry {
    const TABLE: &'static str = "SizeTable";

    fn render(&self, comment: &str, last: bool) -> String {
        format!("{}{} /* {comment} */", self.0, separator(last))
    }

    fn placeholder() -> String {
        "0".to_string()
    }

    // Sized by the local token table.
    fn declaration(phase: Phase, _rows: &[PoolRow<Self>]) -> String {
        format!("UINT16            SizeTable[{phase}_LOCAL_TOKEN_NUMBER_TABLE_SIZE];\r\n")
    }
}

/// Which database structure holds a token's field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Init,
    Uninit,
}

impl Storage {
    pub fn name(self) -> &'static str {
        match self {
            Storage::Init => "Init",
            Storage::Uninit => "Uninit",
        }
    }
}

/// Storage-kind flags OR-ed into a local token entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenTypeFlags {
    pub string: bool,
    pub sku_enabled: bool,
    pub hii: bool,
    pub vpd: bool,
}

impl TokenTypeFlags {
    fn suffix(self) -> String {
        [
            (self.string, " | PCD_TYPE_STRING"),
            (self.sku_enabled, " | PCD_TYPE_SKU_ENABLED"),
            (self.hii, " | PCD_TYPE_HII"),
            (self.vpd, " | PCD_TYPE_VPD"),
        ]
        .into_iter()
        .filter_map(|(set, text)| set.then_some(text))
        .collect()
    }
}

/// Byte offset of a token's field plus its storage flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTokenEntry {
    pub phase: Phase,
    pub storage: Storage,
    pub field: String,
    pub flags: TokenTypeFlags,
}

impl LocalTokenEntry {
    /// The `offsetof` expression locating the field.
    pub fn offset_expr(&self) -> String {
        format!(
            "offsetof({}_PCD_DATABASE, {}.{})",
            self.phase,
            self.storage.name(),
            self.field
        )
    }
}

impl PoolEntry for LocalTokenEntry {
    const TABLE: &'static str = "LocalTokenNumberTable";

    fn render(&self, comment: &str, last: bool) -> String {
        format!(
            "{}{} /* {comment} */ {}",
            self.offset_expr(),
            self.flags.suffix(),
            separator(last)
        )
    }

    fn placeholder() -> String {
        "0".to_string()
    }

    fn declaration(phase: Phase, _rows: &[PoolRow<Self>]) -> String {
        format!("UINT32            LocalTokenNumberTable[{phase}_LOCAL_TOKEN_NUMBER_TABLE_SIZE];\r\n")
    }

    fn size_macro(phase: Phase, rows: usize, _length: usize) -> String {
        format!(
            "#define {phase}_LOCAL_TOKEN_NUMBER_TABLE_SIZE            {}\r\n#define {phase}_LOCAL_TOKEN_NUMBER            {rows}\r\n",
            rows.max(1)
        )
    }

    fn existence_macro(phase: Phase, empty: bool) -> String {
        format!("#define {phase}_DATABASE_EMPTY       {}\r\n", flag(empty))
    }
}

/// Maps an externally visible token number to its local index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExMapEntry {
    pub ex_token_number: u32,
    pub local_token_index: usize,
    pub guid_index: usize,
}

impl PoolEntry for ExMapEntry {
    const TABLE: &'static str = "ExMapTable";

    fn render(&self, comment: &str, last: bool) -> String {
        format!(
            "{{ {}, {}, {} }}{} /* {comment} */",
            self.ex_token_number,
            self.local_token_index,
            self.guid_index,
            separator(last)
        )
    }

    fn placeholder() -> String {
        "{0, 0, 0}".to_string()
    }

    fn declaration(phase: Phase, _rows: &[PoolRow<Self>]) -> String {
        format!("DYNAMICEX_MAPPING ExMapTable[{phase}_EXMAPPING_TABLE_SIZE];\r\n")
    }

    fn size_macro(phase: Phase, rows: usize, _length: usize) -> String {
        format!(
            "#define {phase}_EXMAPPING_TABLE_SIZE  {}\r\n#define {phase}_EX_TOKEN_NUMBER       {rows}\r\n",
            rows.max(1)
        )
    }

    fn existence_macro(phase: Phase, empty: bool) -> String {
        format!("#define {phase}_EXMAP_TABLE_EMPTY    {}\r\n", flag(empty))
    }
}

/// The six tables of one phase.
#[derive(Debug, Clone)]
pub struct LayoutTables {
    pub strings: Pool<StringEntry>,
    pub guids: Pool<GuidEntry>,
    pub sku_ids: Pool<SkuIdEntry>,
    pub sizes: Pool<SizeEntry>,
    pub local_tokens: Pool<LocalTokenEntry>,
    pub ex_map: Pool<ExMapEntry>,
}

impl LayoutTables {
    pub fn new(phase: Phase) -> Self {
        Self {
            strings: Pool::new(phase),
            guids: Pool::new(phase),
            sku_ids: Pool::new(phase),
            sizes: Pool::new(phase),
            local_tokens: Pool::new(phase),
            ex_map: Pool::new(phase),
        }
    }

    /// Size macros followed by emptiness macros.
    pub fn macros(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.guids.size_macro());
        out.push_str(&self.strings.size_macro());
        out.push_str(&self.sku_ids.size_macro());
        out.push_str(&self.local_tokens.size_macro());
        out.push_str(&self.ex_map.size_macro());

        out.push_str(&self.guids.existence_macro());
        out.push_str(&self.strings.existence_macro());
        out.push_str(&self.sku_ids.existence_macro());
        out.push_str(&self.local_tokens.existence_macro());
        out.push_str(&self.ex_map.existence_macro());
        out
    }

    /// Table field declarations in structure order.
    pub fn declarations(&self) -> Vec<String> {
        vec![
            self.ex_map.declaration(),
            self.guids.declaration(),
            self.local_tokens.declaration(),
            self.strings.declaration(),
            self.sizes.declaration(),
            self.sku_ids.declaration(),
        ]
    }

    /// Table initializers in structure order.
    pub fn instantiations(&self) -> Vec<Vec<String>> {
        vec![
            self.ex_map.instantiate(),
            self.guids.instantiate(),
            self.local_tokens.instantiate(),
            self.strings.instantiate(),
            self.sizes.instantiate(),
            self.sku_ids.instantiate(),
        ]
    }
}
