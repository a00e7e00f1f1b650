//! GUID parsing and C rendering.
//!
//! Descriptors spell GUIDs in two ways: the registry form
//! `8-4-4-4-12` and the C array form
//! `0xAAAAAAAA, 0xBBBB, 0xCCCC, {0xDD, 0xDD, 0xDD, 0xDD, 0xDD, 0xDD, 0xDD, 0xDD}`.
//! Both are normalized to a [`Uuid`] whose hyphenated text reads in the same
//! group order as `EFI_GUID`.

use uuid::Uuid;

use crate::error::{PcdError, Result};

/// Parse a GUID from either descriptor spelling.
///
/// `"0"` and `"0x0"` are accepted as the nil GUID.
pub fn parse_guid(text: &str) -> Result<Uuid> {
    let trimmed = text.trim();
    let invalid = || PcdError::InvalidGuid {
        text: text.to_string(),
    };

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if trimmed == "0" || trimmed.eq_ignore_ascii_case("0x0") {
        return Ok(Uuid::nil());
    }

    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return parse_array_form(trimmed).ok_or_else(invalid);
    }

    // Only the hyphenated registry form is legal here.
    if trimmed.len() != 36 {
        return Err(invalid());
    }
    Uuid::try_parse(trimmed).map_err(|_| invalid())
}

fn parse_array_form(text: &str) -> Option<Uuid> {
    let flat: String = text.chars().filter(|c| *c != '{' && *c != '}').collect();
    let parts: Vec<&str> = flat.split(',').map(str::trim).collect();
    if parts.len() != 11 {
        return None;
    }

    let hex = |part: &str, max_digits: usize| -> Option<u32> {
        let digits = part
            .strip_prefix("0x")
            .or_else(|| part.strip_prefix("0X"))?;
        if digits.is_empty() || digits.len() > max_digits {
            return None;
        }
        u32::from_str_radix(digits, 16).ok()
    };

    let d1 = hex(parts[0], 8)?;
    let d2 = hex(parts[1], 4)? as u16;
    let d3 = hex(parts[2], 4)? as u16;
    let mut d4 = [0u8; 8];
    for (slot, part) in d4.iter_mut().zip(&parts[3..]) {
        *slot = hex(part, 2)? as u8;
    }

    Some(Uuid::from_fields(d1, d2, d3, &d4))
}

/// Render a GUID as an `EFI_GUID` initializer.
///
/// `{ 0x8be4df61, 0x93ca, 0x11d2, { 0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c } }`
pub fn guid_initializer(guid: &Uuid) -> String {
    let text = guid.hyphenated().to_string();
    let groups: Vec<&str> = text.split('-').collect();
    let (g4, g5) = (groups[3], groups[4]);

    let tail: Vec<String> = (0..2)
        .map(|i| &g4[i * 2..i * 2 + 2])
        .chain((0..6).map(|i| &g5[i * 2..i * 2 + 2]))
        .map(|byte| format!("0x{byte}"))
        .collect();

    format!(
        "{{ 0x{}, 0x{}, 0x{}, {{ {} }} }}",
        groups[0],
        groups[1],
        groups[2],
        tail.join(", ")
    )
}

/// GUID text usable inside a C identifier (dashes become underscores).
pub fn guid_identifier(guid: &Uuid) -> String {
    guid.hyphenated().to_string().replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLOBAL_VARIABLE: &str = "8be4df61-93ca-11d2-aa0d-00e098032b8c";

    #[test]
    fn parse_registry_form() {
        let guid = parse_guid(GLOBAL_VARIABLE).unwrap();
        assert_eq!(guid.hyphenated().to_string(), GLOBAL_VARIABLE);
    }

    #[test]
    fn parse_array_form_with_braces() {
        let guid = parse_guid(
            "0x8be4df61, 0x93ca, 0x11d2, {0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c}",
        )
        .unwrap();
        assert_eq!(guid.hyphenated().to_string(), GLOBAL_VARIABLE);
    }

    #[test]
    fn parse_array_form_pads_short_bytes() {
        let guid =
            parse_guid("0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xa, 0xb").unwrap();
        assert_eq!(
            guid.hyphenated().to_string(),
            "00000001-0002-0003-0405-060708090a0b"
        );
    }

    #[test]
    fn zero_is_nil() {
        assert!(parse_guid("0").unwrap().is_nil());
        assert!(parse_guid("0x0").unwrap().is_nil());
    }

    #[test]
    fn malformed_guids_rejected() {
        assert!(parse_guid("").is_err());
        assert!(parse_guid("not-a-guid").is_err());
        assert!(parse_guid("0x1, 0x2, 0x3").is_err());
        assert!(parse_guid("0x1, 0x2, 0x3, 0x4, 0x5, 0x6, 0x7, 0x8, 0x9, 0xa, 0x100").is_err());
        assert!(matches!(
            parse_guid("8be4df6193ca11d2aa0d00e098032b8c"),
            Err(PcdError::InvalidGuid { .. })
        ));
    }

    #[test]
    fn initializer_layout() {
        let guid = parse_guid(GLOBAL_VARIABLE).unwrap();
        assert_eq!(
            guid_initializer(&guid),
            "{ 0x8be4df61, 0x93ca, 0x11d2, { 0xaa, 0x0d, 0x00, 0xe0, 0x98, 0x03, 0x2b, 0x8c } }"
        );
        assert_eq!(
            guid_initializer(&Uuid::nil()),
            "{ 0x00000000, 0x0000, 0x0000, { 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00 } }"
        );
    }

    #[test]
    fn identifier_form() {
        let guid = parse_guid(GLOBAL_VARIABLE).unwrap();
        assert_eq!(guid_identifier(&guid), "8be4df61_93ca_11d2_aa0d_00e098032b8c");
    }
}
