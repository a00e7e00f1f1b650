//! Datum validation: checks a literal against its declared type and size.

use std::fmt;
use std::num::IntErrorKind;

use crate::datum::DatumType;
use crate::error::{PcdError, Result};

/// Where the value being validated was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationContext<'a> {
    /// A module's PCD build definition.
    Module(&'a str),
    /// The platform's centralized dynamic PCD section.
    DynamicSection,
}

impl fmt::Display for ValidationContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationContext::Module(name) => write!(f, "module {name}"),
            ValidationContext::DynamicSection => {
                write!(f, "section <DynamicPcdBuildDefinitions>")
            }
        }
    }
}

/// Why an integer literal could not be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegerLiteralError {
    /// Not a decimal or `0x` hexadecimal number.
    Invalid,
    /// Well-formed but larger than any supported width.
    Overflow,
}

/// Parse a decimal or `0x`-prefixed hexadecimal literal.
pub fn parse_integer(text: &str) -> std::result::Result<u128, IntegerLiteralError> {
    let text = text.trim();
    let (digits, radix) = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return Err(IntegerLiteralError::Invalid);
    }

    u128::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::PosOverflow => IntegerLiteralError::Overflow,
        _ => IntegerLiteralError::Invalid,
    })
}

/// Validate `literal` (if any) against `datum_type` and `declared_size`.
///
/// With no literal only the size rules are checked.
pub fn validate_datum(
    cname: &str,
    context: ValidationContext<'_>,
    literal: Option<&str>,
    datum_type: DatumType,
    declared_size: u32,
) -> Result<()> {
    if declared_size == 0 {
        return Err(PcdError::missing(format!(
            "You maybe miss <MaxDatumSize> for PCD {cname} in {context}"
        )));
    }

    match datum_type {
        DatumType::Uint8 | DatumType::Uint16 | DatumType::Uint32 | DatumType::Uint64 => {
            validate_integer(cname, context, literal, datum_type, declared_size)
        }
        DatumType::Boolean => validate_boolean(cname, context, literal, declared_size),
        DatumType::Pointer => match literal {
            Some(literal) => validate_pointer(cname, context, literal, declared_size),
            None => Ok(()),
        },
    }
}

fn validate_integer(
    cname: &str,
    context: ValidationContext<'_>,
    literal: Option<&str>,
    datum_type: DatumType,
    declared_size: u32,
) -> Result<()> {
    let (Some(width), Some(max)) = (datum_type.integer_width(), datum_type.max_value()) else {
        return Ok(());
    };

    if declared_size != width {
        return Err(PcdError::mismatch(format!(
            "The datum type of PCD data {cname} in {context} is {datum_type}, but datum size is {declared_size}, they are not matched!"
        )));
    }

    let Some(literal) = literal else {
        return Ok(());
    };

    let exceeds = || {
        PcdError::mismatch(format!(
            "The datum for PCD {cname} in {context} is {literal} which exceed the range of {datum_type} - {max:#X}"
        ))
    };

    match parse_integer(literal) {
        Ok(value) if value > max => Err(exceeds()),
        Ok(_) => Ok(()),
        Err(IntegerLiteralError::Overflow) => Err(exceeds()),
        Err(IntegerLiteralError::Invalid) => Err(PcdError::mismatch(format!(
            "The datum for PCD {cname} in {context} is not valid digital format of {datum_type}"
        ))),
    }
}

fn validate_boolean(
    cname: &str,
    context: ValidationContext<'_>,
    literal: Option<&str>,
    declared_size: u32,
) -> Result<()> {
    if declared_size != 1 {
        return Err(PcdError::mismatch(format!(
            "The datum type of PCD data {cname} in {context} is BOOLEAN, but datum size is {declared_size}, they are not matched!"
        )));
    }

    match literal {
        Some(value)
            if !(value.trim().eq_ignore_ascii_case("true")
                || value.trim().eq_ignore_ascii_case("false")) =>
        {
            Err(PcdError::mismatch(format!(
                "The datum type of PCD data {cname} in {context} is BOOLEAN, but value is not 'true'/'TRUE' or 'FALSE'/'false'"
            )))
        }
        _ => Ok(()),
    }
}

fn validate_pointer(
    cname: &str,
    context: ValidationContext<'_>,
    literal: &str,
    declared_size: u32,
) -> Result<()> {
    let literal = literal.trim();
    let declared = declared_size as usize;

    if let Some(rest) = literal.strip_prefix('L') {
        let Some(body) = quoted_body(rest) else {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID* and datum is a UNICODE string because start with L\", but format maybe is not right, correct UNICODE string is L\"...\"!"
            )));
        };
        let required = body.encode_utf16().count() * 2;
        if required > declared {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID*, and datum is a UNICODE string, but the datum size is {required} exceed to <MaxDatumSize> : {declared_size}"
            )));
        }
        return Ok(());
    }

    if literal.starts_with('"') {
        let Some(body) = quoted_body(literal) else {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID* and datum is a ANSI string because start with \", but format maybe is not right, correct ANSI string is \"...\"!"
            )));
        };
        let required = body.chars().count();
        if required > declared {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID*, and datum is a ANSI string, but the datum size is {required} which exceed to <MaxDatumSize> : {declared_size}"
            )));
        }
        return Ok(());
    }

    if let Some(rest) = literal.strip_prefix('{') {
        let Some(body) = rest.strip_suffix('}') else {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID*, and it is byte array in fact, but the closing '}}' is missing"
            )));
        };
        let body = body.trim();
        if body.is_empty() {
            return Ok(());
        }

        let elements: Vec<&str> = body.split(',').map(str::trim).collect();
        for element in &elements {
            match parse_integer(element) {
                Ok(value) if value <= 0xFF => {}
                Ok(_) | Err(IntegerLiteralError::Overflow) => {
                    return Err(PcdError::mismatch(format!(
                        "The datum type of PCD {cname} in {context} is VOID*, it is byte array in fact. But the element of {element} exceed the byte range"
                    )));
                }
                Err(IntegerLiteralError::Invalid) => {
                    return Err(PcdError::mismatch(format!(
                        "The datum type of PCD {cname} in {context} is VOID*, and it is byte array in fact. For every byte in array should be a valid byte digital, but element {element} is not a valid byte digital!"
                    )));
                }
            }
        }

        if elements.len() > declared {
            return Err(PcdError::mismatch(format!(
                "The datum type of PCD {cname} in {context} is VOID*, and datum is byte array, but the number of bytes is {} which exceed to <MaxDatumSize> : {declared_size}!",
                elements.len()
            )));
        }
        return Ok(());
    }

    Err(PcdError::mismatch(format!(
        "The datum type of PCD {cname} in {context} is VOID*. For VOID* type, you have three format choice: \
         1) UNICODE string: like L\"xxxx\"; 2) ANSI string: like \"xxx\"; 3) Byte array: like {{0x2, 0x45, 0x23}}. \
         But the datum does not follow any of these formats!"
    )))
}

/// Text between an opening and a matching closing double quote.
fn quoted_body(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('"')?;
    inner.strip_suffix('"')
}
