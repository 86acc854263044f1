use serde::{Deserialize, Serialize};
use std::num::ParseIntError;
use std::str::FromStr;

use crate::model::RecordId;

/// Caller-supplied list of identifiers, kept in request order.
///
/// Duplicates and non-positive values are preserved; it is up to the resolver
/// to decide what can possibly exist.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentifierBatch(Vec<RecordId>);

impl IdentifierBatch {
    pub fn new(ids: Vec<RecordId>) -> Self {
        Self(ids)
    }

    /// Parse a comma separated list such as `2,3,4,0,-7`.
    ///
    /// A blank string is an empty batch, not an error; rejecting it is the
    /// validator's job.
    pub fn parse(raw: &str) -> Result<Self, ParseIntError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        raw.split(',')
            .map(|part| part.trim().parse::<RecordId>())
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    pub fn ids(&self) -> &[RecordId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.0.contains(&id)
    }
}

impl FromStr for IdentifierBatch {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Vec<RecordId>> for IdentifierBatch {
    fn from(ids: Vec<RecordId>) -> Self {
        Self(ids)
    }
}
