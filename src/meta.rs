/// Helpers for validating identifiers before they are placed into request paths.
use crate::error::{Result, ShilpError};

pub struct CollectionNames;

impl CollectionNames {
    /// Validate a collection name.
    ///
    /// The server owns the naming rules; locally we only reject names that
    /// cannot address a collection at all (empty or whitespace-only).
    pub fn validate(name: &str) -> Result<()> {
        require_non_empty("collection name", name)
    }
}

/// Identifier kinds that appear as path segments.
pub struct Identifiers;

impl Identifiers {
    pub fn record_id(id: &str) -> Result<()> {
        require_non_empty("record id", id)
    }

    pub fn replica_id(id: &str) -> Result<()> {
        require_non_empty("replica id", id)
    }

    pub fn field(field: &str) -> Result<()> {
        require_non_empty("field name", field)
    }

    pub fn path(path: &str) -> Result<()> {
        require_non_empty("path", path)
    }
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ShilpError::Validation(format!("{what} must not be empty")));
    }
    Ok(())
}
