//! Validation and normalization of user-supplied lookup input.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{DataField, Error, Result};

fn postcode_regex() -> &'static Regex {
    static RE_POSTCODE: OnceLock<Regex> = OnceLock::new();
    RE_POSTCODE.get_or_init(|| {
        Regex::new(r"^\s*([1-9][0-9]{3})\s*([A-Za-z]{2})\s*$").expect("valid postcode regex")
    })
}

fn number_regex() -> &'static Regex {
    static RE_NUMBER: OnceLock<Regex> = OnceLock::new();
    RE_NUMBER.get_or_init(|| Regex::new(r"^\s*([1-9][0-9]{0,4})").expect("valid number regex"))
}

/// Turns `" 6545 ca "` into `"6545CA"`.
pub fn normalize_postcode(raw: &str) -> Result<String> {
    let captures = postcode_regex()
        .captures(raw)
        .ok_or(Error::MalformedData {
            field: DataField::Postcode,
        })?;
    Ok(format!(
        "{}{}",
        &captures[1],
        captures[2].to_ascii_uppercase()
    ))
}

/// Extracts the leading house number, dropping additions such as `"29a"` or
/// `"29 bis"`.
pub fn normalize_number(raw: &str) -> Result<String> {
    let captures = number_regex().captures(raw).ok_or(Error::MalformedData {
        field: DataField::Number,
    })?;
    Ok(captures[1].to_string())
}
