use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Store-assigned surrogate identifier shared by every resource.
pub type RecordId = i32;

/// Id carried by a record that has not been persisted yet.
pub const UNASSIGNED_ID: RecordId = 0;

/// Upper bound on free-text columns (names, tag labels).
pub const MAX_TEXT_LEN: usize = 250;

/// A declared field constraint that a payload failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldViolation {
    #[error("field '{0}' is required")]
    Missing(&'static str),
    #[error("field '{field}' exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("field '{0}' must be a positive identifier")]
    NonPositiveId(&'static str),
    #[error("field '{field}' must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },
}

/// Any entity addressed by a surrogate integer id.
///
/// The batch resolver, association writer and the generic HTTP handlers only
/// rely on this capability set; nothing else about a resource's schema leaks
/// into them.
pub trait Record: Clone + Debug + Send + Sync + Serialize + DeserializeOwned + Unpin + 'static {
    /// Singular, human readable resource name used in logs and error bodies.
    const RESOURCE: &'static str;

    fn id(&self) -> RecordId;

    fn set_id(&mut self, id: RecordId);

    /// Check declared field constraints. Identity is checked separately.
    fn validate_fields(&self) -> Result<(), FieldViolation> {
        Ok(())
    }
}

/// A join/tag row linking one owning record to one target.
pub trait Association: Record {
    /// Target identifier (link tables) or free-text label (tags).
    type Target: Clone + Debug + PartialEq + Eq + Hash + Send + Sync;

    /// Build an unsaved association row. The surrogate id is left unassigned.
    fn link(owner_id: RecordId, target: Self::Target) -> Self;

    fn owner_id(&self) -> RecordId;

    fn target(&self) -> &Self::Target;
}

pub fn require_text(field: &'static str, value: &str) -> Result<(), FieldViolation> {
    if value.trim().is_empty() {
        return Err(FieldViolation::Missing(field));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(FieldViolation::TooLong {
            field,
            max: MAX_TEXT_LEN,
        });
    }
    Ok(())
}

pub fn optional_text(field: &'static str, value: Option<&str>) -> Result<(), FieldViolation> {
    match value {
        Some(value) if value.chars().count() > MAX_TEXT_LEN => Err(FieldViolation::TooLong {
            field,
            max: MAX_TEXT_LEN,
        }),
        _ => Ok(()),
    }
}

pub fn require_positive(field: &'static str, id: RecordId) -> Result<(), FieldViolation> {
    if id <= 0 {
        return Err(FieldViolation::NonPositiveId(field));
    }
    Ok(())
}
