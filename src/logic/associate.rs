use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::logic::outcome::{RejectReason, Rejection, ServiceError};
use crate::logic::resolve::BatchResolver;
use crate::model::{Association, AssociationRequest, Record};
use crate::store::traits::RecordStore;

/// What to do when one bulk request names the same target twice.
///
/// Only repeats inside a single request are considered. Rows that already
/// exist in the store are never consulted, so replaying a request always
/// writes a fresh set of rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Write one row per entry, repeats included
    #[default]
    Allow,
    /// Keep the first occurrence of each target and drop the rest
    Collapse,
    /// Refuse the whole request (checked by the validator)
    Reject,
}

/// Turns one validated bulk request into association rows, all or nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssociationWriter {
    policy: DedupPolicy,
}

impl AssociationWriter {
    pub fn new(policy: DedupPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    /// Unsaved rows in request order, one per surviving target.
    pub fn plan<Q: AssociationRequest>(&self, request: &Q) -> Vec<Q::Record> {
        let owner = request.owner_id();
        let targets = request.targets().iter().cloned();

        let targets: Vec<_> = match self.policy {
            DedupPolicy::Collapse => targets.unique().collect(),
            DedupPolicy::Allow | DedupPolicy::Reject => targets.collect(),
        };

        targets
            .into_iter()
            .map(|target| <Q::Record as Association>::link(owner, target))
            .collect()
    }

    /// Persist every planned row in one atomic write.
    ///
    /// The request must already have passed
    /// [`RequestValidator::association`](crate::logic::RequestValidator::association).
    /// The owner has to exist (`NotFound` otherwise) and every planned row
    /// must satisfy its own field constraints before anything is written.
    pub async fn create_many<Q, S>(
        &self,
        store: &S,
        request: Q,
    ) -> Result<Vec<Q::Record>, ServiceError>
    where
        Q: AssociationRequest,
        S: RecordStore<Q::Record> + RecordStore<Q::Owner> + ?Sized,
    {
        let owner = request.owner_id();
        BatchResolver::resolve_one::<Q::Owner, S>(store, owner).await?;

        let rows = self.plan(&request);
        for (index, row) in rows.iter().enumerate() {
            row.validate_fields().map_err(|violation| {
                Rejection::with_detail(
                    RejectReason::InvalidTarget,
                    format!("row {}: {}", index, violation),
                )
            })?;
        }
        let targets: Vec<_> = rows.iter().map(|row| row.target().clone()).collect();

        let created = RecordStore::<Q::Record>::insert_many(store, rows)
            .await
            .map_err(ServiceError::Storage)?;

        if created.len() != targets.len() {
            return Err(ServiceError::Storage(anyhow::anyhow!(
                "{} bulk insert returned {} rows, expected {}",
                <Q::Record as Record>::RESOURCE,
                created.len(),
                targets.len()
            )));
        }
        if let Some(index) = created
            .iter()
            .zip(&targets)
            .position(|(row, target)| row.owner_id() != owner || row.target() != target)
        {
            return Err(ServiceError::Storage(anyhow::anyhow!(
                "{} bulk insert returned a different row at position {}",
                <Q::Record as Record>::RESOURCE,
                index
            )));
        }

        log::debug!(
            "Created {} {} rows for owner {}",
            created.len(),
            <Q::Record as Record>::RESOURCE,
            owner
        );
        Ok(created)
    }
}
