//! Lenient numeric parsing for hand-maintained CSV cells.

use std::str::FromStr;

/// Outcome of parsing a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Parsed<T> {
    Value(T),
    /// The cell was blank.
    Empty,
    /// The cell had text that is not a number, even without thousands separators.
    Unparsable,
}

impl<T> Parsed<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Parsed::Value(v) => Some(v),
            Parsed::Empty | Parsed::Unparsable => None,
        }
    }
}

/// Parse a trimmed cell, retrying once with `,` separators removed.
pub fn parse_cell<T: FromStr>(raw: &str) -> Parsed<T> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Parsed::Empty;
    }
    if let Ok(v) = raw.parse() {
        return Parsed::Value(v);
    }
    match raw.replace(',', "").parse() {
        Ok(v) => Parsed::Value(v),
        Err(_) => Parsed::Unparsable,
    }
}
