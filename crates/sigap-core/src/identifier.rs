//! Storage-table identifier rules.
//!
//! Table names cannot be bound as query parameters, so every name that
//! reaches a query or an import target goes through [`LayerName`], which can
//! only be built by passing the validator. Two steps are kept apart:
//!
//! - [`sanitize_identifier`] turns arbitrary user text into a candidate by
//!   lower-casing and replacing everything outside `[a-z0-9_]` with `_`.
//! - [`is_valid_identifier`] accepts only non-empty `[a-z0-9_]+` strings of at
//!   most [`MAX_IDENTIFIER_LEN`] bytes.

use std::fmt;

use serde::Serialize;

use crate::defaults::MAX_IDENTIFIER_LEN;
use crate::error::{Error, Result};

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

/// Lower-case `raw` and replace every character outside `[a-z0-9_]` with `_`.
///
/// The output may be empty or too long; it still has to pass
/// [`is_valid_identifier`].
pub fn sanitize_identifier(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| if is_identifier_char(c) { c } else { '_' })
        .collect()
}

/// Full-match `^[a-z0-9_]+$`, bounded by the store's identifier length.
pub fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_IDENTIFIER_LEN && s.chars().all(is_identifier_char)
}

/// A validated spatial-layer (table) name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LayerName(String);

impl LayerName {
    /// Accept `s` as-is if it passes the validator.
    pub fn parse(s: &str) -> Result<Self> {
        if is_valid_identifier(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(Error::InvalidIdentifier(s.to_string()))
        }
    }

    /// Sanitize arbitrary user text, then validate the candidate.
    pub fn sanitize(raw: &str) -> Result<Self> {
        Self::parse(&sanitize_identifier(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for SQL identifier positions.
    pub fn quoted(&self) -> String {
        // Validated names never contain '"', so no escaping is needed.
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LayerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
