//! Datum types and value sources.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PcdError;

/// Declared datum type of a PCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatumType {
    #[serde(rename = "UINT8")]
    Uint8,
    #[serde(rename = "UINT16")]
    Uint16,
    #[serde(rename = "UINT32")]
    Uint32,
    #[serde(rename = "UINT64")]
    Uint64,
    #[serde(rename = "BOOLEAN")]
    Boolean,
    /// Byte array, spelled `VOID*` in descriptors.
    #[serde(rename = "VOID*", alias = "POINTER")]
    Pointer,
}

impl DatumType {
    /// Byte width of the fixed-width integer types.
    pub fn integer_width(self) -> Option<u32> {
        match self {
            DatumType::Uint8 => Some(1),
            DatumType::Uint16 => Some(2),
            DatumType::Uint32 => Some(4),
            DatumType::Uint64 => Some(8),
            DatumType::Boolean | DatumType::Pointer => None,
        }
    }

    /// Largest value representable by an integer datum type.
    pub fn max_value(self) -> Option<u128> {
        self.integer_width()
            .map(|width| (1u128 << (width * 8)) - 1)
    }

    /// C element type used when declaring a field of this type.
    pub fn c_type(self) -> &'static str {
        match self {
            DatumType::Uint8 | DatumType::Pointer => "UINT8",
            DatumType::Uint16 => "UINT16",
            DatumType::Uint32 => "UINT32",
            DatumType::Uint64 => "UINT64",
            DatumType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for DatumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatumType::Uint8 => write!(f, "UINT8"),
            DatumType::Uint16 => write!(f, "UINT16"),
            DatumType::Uint32 => write!(f, "UINT32"),
            DatumType::Uint64 => write!(f, "UINT64"),
            DatumType::Boolean => write!(f, "BOOLEAN"),
            DatumType::Pointer => write!(f, "VOID*"),
        }
    }
}

impl FromStr for DatumType {
    type Err = PcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "UINT8" => Ok(DatumType::Uint8),
            "UINT16" => Ok(DatumType::Uint16),
            "UINT32" => Ok(DatumType::Uint32),
            "UINT64" => Ok(DatumType::Uint64),
            "BOOLEAN" => Ok(DatumType::Boolean),
            "VOID*" | "POINTER" => Ok(DatumType::Pointer),
            other => Err(PcdError::mismatch(format!(
                "datum type {other} is unknown, it should be one of UINT8, UINT16, UINT32, UINT64, VOID*, BOOLEAN"
            ))),
        }
    }
}

/// Variable-backed ("HII") value reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiiReference {
    /// Name of the runtime variable.
    pub variable_name: String,
    /// Namespace GUID of the variable.
    pub variable_guid: Uuid,
    /// Byte offset of the value within the variable.
    pub variable_offset: u16,
    /// Value used until the variable exists.
    pub default_value: String,
}

/// Where a SKU's value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueSource {
    /// Literal value fixed at build time.
    Constant { value: String },
    /// Value read from a runtime variable.
    Hii(HiiReference),
    /// Value read from the VPD blob at `offset`.
    Vpd { offset: u32 },
}

/// Discriminant of a [`ValueSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Constant,
    Hii,
    Vpd,
}

impl ValueSource {
    pub fn constant(value: impl Into<String>) -> Self {
        ValueSource::Constant {
            value: value.into(),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ValueSource::Constant { .. } => SourceKind::Constant,
            ValueSource::Hii(_) => SourceKind::Hii,
            ValueSource::Vpd { .. } => SourceKind::Vpd,
        }
    }

    /// The literal text when this is a constant source.
    pub fn constant_value(&self) -> Option<&str> {
        match self {
            ValueSource::Constant { value } => Some(value),
            _ => None,
        }
    }

    /// Render the C initializer for this source.
    ///
    /// HII references need GUID- and string-table indices; `pool_hii` is
    /// called to obtain them (and may record the reference as a side effect).
    pub fn render_initializer<F>(&self, mut pool_hii: F) -> String
    where
        F: FnMut(&HiiReference) -> (usize, usize),
    {
        match self {
            ValueSource::Constant { value } => value.trim().to_string(),
            ValueSource::Hii(hii) => {
                let (guid_index, string_index) = pool_hii(hii);
                format!(
                    "{{ {guid_index}, {string_index}, {} }}",
                    hii.variable_offset
                )
            }
            ValueSource::Vpd { offset } => format!("{{ {offset} }}"),
        }
    }
}

/// One per-SKU value of a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuVariant {
    pub sku_id: u32,
    pub source: ValueSource,
}

impl SkuVariant {
    pub fn new(sku_id: u32, source: ValueSource) -> Self {
        Self { sku_id, source }
    }
}

/// Body of a `L"..."` literal, if `literal` is one.
///
/// Surrounding whitespace is ignored, matching the validator.
pub fn unicode_string_body(literal: &str) -> Option<&str> {
    literal
        .trim()
        .strip_prefix("L\"")?
        .strip_suffix('"')
}

/// Byte elements of a `VOID*` literal, in the order they are stored.
///
/// Byte arrays keep their elements as written, ANSI strings yield one byte
/// per character and unicode strings two little-endian bytes per UTF-16
/// unit. No terminator is added; callers zero-pad to the datum size.
pub fn pointer_bytes(literal: &str) -> Vec<String> {
    let literal = literal.trim();
    if let Some(body) = unicode_string_body(literal) {
        return body
            .encode_utf16()
            .flat_map(|unit| [unit & 0xFF, unit >> 8])
            .map(|byte| format!("{byte:#04x}"))
            .collect();
    }
    if let Some(body) = literal.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        return body.bytes().map(|byte| format!("{byte:#04x}")).collect();
    }
    match literal.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(body) => body
            .split(',')
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

/// Alignment class used to order database fields.
///
/// `VOID*` and `BOOLEAN` are always 1 regardless of the declared size.
pub fn alignment(datum_type: DatumType, source: &ValueSource) -> u32 {
    match source {
        ValueSource::Hii(_) => return 2,
        ValueSource::Vpd { .. } => return 4,
        ValueSource::Constant { value } => {
            if datum_type == DatumType::Pointer && unicode_string_body(value).is_some() {
                return 2;
            }
        }
    }

    match datum_type {
        DatumType::Uint8 => 1,
        DatumType::Uint16 => 2,
        DatumType::Uint32 => 4,
        DatumType::Uint64 => 8,
        DatumType::Pointer | DatumType::Boolean => 1,
    }
}

/// Whether `literal` is the "empty" value of its type.
///
/// Tokens whose default constant is empty are laid out in the
/// uninitialized structure.
pub fn is_null_value(datum_type: DatumType, literal: &str) -> bool {
    let literal = literal.trim();
    match datum_type {
        DatumType::Uint8 | DatumType::Uint16 | DatumType::Uint32 | DatumType::Uint64 => {
            matches!(crate::validate::parse_integer(literal), Ok(0))
        }
        DatumType::Boolean => literal.eq_ignore_ascii_case("false"),
        DatumType::Pointer => {
            if literal.is_empty() || literal == "\"\"" || literal.eq_ignore_ascii_case("L\"\"") {
                return true;
            }
            match literal.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(body) => body
                    .split(',')
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .all(|b| matches!(crate::validate::parse_integer(b), Ok(0))),
                None => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hii() -> HiiReference {
        HiiReference {
            variable_name: "Setup".to_string(),
            variable_guid: Uuid::nil(),
            variable_offset: 0x10,
            default_value: "0".to_string(),
        }
    }

    #[test]
    fn datum_type_parsing() {
        assert_eq!("uint32".parse::<DatumType>().unwrap(), DatumType::Uint32);
        assert_eq!("VOID*".parse::<DatumType>().unwrap(), DatumType::Pointer);
        assert!("UINT128".parse::<DatumType>().is_err());
        assert_eq!(DatumType::Pointer.to_string(), "VOID*");
    }

    #[test]
    fn max_values() {
        assert_eq!(DatumType::Uint8.max_value(), Some(0xFF));
        assert_eq!(DatumType::Uint64.max_value(), Some(u64::MAX as u128));
        assert_eq!(DatumType::Boolean.max_value(), None);
    }

    #[test]
    fn alignment_classes() {
        assert_eq!(alignment(DatumType::Uint8, &ValueSource::Hii(hii())), 2);
        assert_eq!(alignment(DatumType::Uint8, &ValueSource::Vpd { offset: 0 }), 4);
        assert_eq!(
            alignment(DatumType::Pointer, &ValueSource::constant("L\"abc\"")),
            2
        );
        assert_eq!(
            alignment(DatumType::Pointer, &ValueSource::constant("{0x1, 0x2}")),
            1
        );
        assert_eq!(alignment(DatumType::Uint64, &ValueSource::constant("0")), 8);
        assert_eq!(alignment(DatumType::Boolean, &ValueSource::constant("TRUE")), 1);
    }

    #[test]
    fn render_initializers() {
        assert_eq!(
            ValueSource::constant("0x10").render_initializer(|_| unreachable!()),
            "0x10"
        );
        assert_eq!(
            ValueSource::Vpd { offset: 32 }.render_initializer(|_| unreachable!()),
            "{ 32 }"
        );
        assert_eq!(
            ValueSource::Hii(hii()).render_initializer(|_| (3, 7)),
            "{ 3, 7, 16 }"
        );
    }

    #[test]
    fn null_values() {
        assert!(is_null_value(DatumType::Uint32, "0x0"));
        assert!(is_null_value(DatumType::Uint8, "0"));
        assert!(!is_null_value(DatumType::Uint16, "0x10"));
        assert!(is_null_value(DatumType::Boolean, "FALSE"));
        assert!(!is_null_value(DatumType::Boolean, "TRUE"));
        assert!(is_null_value(DatumType::Pointer, "L\"\""));
        assert!(is_null_value(DatumType::Pointer, "{0x0, 0x00}"));
        assert!(!is_null_value(DatumType::Pointer, "\"abc\""));
    }

    #[test]
    fn unicode_bodies() {
        assert_eq!(unicode_string_body("L\"Boot\""), Some("Boot"));
        assert_eq!(unicode_string_body("L\"\""), Some(""));
        assert_eq!(unicode_string_body("\"Boot\""), None);
        assert_eq!(unicode_string_body("L\""), None);
        assert_eq!(unicode_string_body(" L\"ab\" "), Some("ab"));
        assert_eq!(
            alignment(DatumType::Pointer, &ValueSource::constant(" L\"ab\"")),
            2
        );
    }

    #[test]
    fn pointer_byte_elements() {
        assert_eq!(pointer_bytes("{0x1, 0x2 ,3}"), ["0x1", "0x2", "3"]);
        assert_eq!(pointer_bytes("{}"), Vec::<String>::new());
        assert_eq!(pointer_bytes("\"AB\""), ["0x41", "0x42"]);
        assert_eq!(pointer_bytes(" L\"A\u{263A}\""), ["0x41", "0x00", "0x3a", "0x26"]);
        assert!(pointer_bytes("garbage").is_empty());
    }
}
