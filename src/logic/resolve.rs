use itertools::Itertools;
use std::collections::HashSet;

use crate::logic::outcome::ServiceError;
use crate::model::{Association, IdentifierBatch, Record, RecordId};
use crate::store::traits::{AssociationStore, RecordStore};

/// The existing subset of a requested batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSet<R> {
    records: Vec<R>,
    requested: usize,
}

impl<R: Record> ResolvedSet<R> {
    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn into_records(self) -> Vec<R> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Size of the batch as the caller sent it, duplicates included
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Number of requested entries that produced no record
    pub fn missing(&self) -> usize {
        self.requested.saturating_sub(self.records.len())
    }
}

/// Looks up batches of identifiers with partial-validity semantics.
pub struct BatchResolver;

impl BatchResolver {
    /// Resolve a validated, non-empty batch.
    ///
    /// Unknown and non-positive ids are dropped silently; the result is
    /// `NotFound` only when nothing at all matched.
    pub async fn resolve<R, S>(
        store: &S,
        batch: &IdentifierBatch,
    ) -> Result<ResolvedSet<R>, ServiceError>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        // Ids <= 0 can never exist, so they never reach the store
        let candidates: Vec<RecordId> = batch
            .ids()
            .iter()
            .copied()
            .filter(|id| *id > 0)
            .unique()
            .collect();

        if candidates.is_empty() {
            log::debug!(
                "{} batch of {} has no resolvable ids",
                R::RESOURCE,
                batch.len()
            );
            return Err(ServiceError::NotFound);
        }

        let found = store
            .find_many(&candidates)
            .await
            .map_err(ServiceError::Storage)?;

        // Never hand back anything the caller did not ask for
        let wanted: HashSet<RecordId> = candidates.into_iter().collect();
        let records: Vec<R> = found
            .into_iter()
            .filter(|record| wanted.contains(&record.id()))
            .collect();

        if records.is_empty() {
            return Err(ServiceError::NotFound);
        }

        Ok(ResolvedSet {
            records,
            requested: batch.len(),
        })
    }

    /// Single lookup: a batch of one. Non-positive ids are simply absent.
    pub async fn resolve_one<R, S>(store: &S, id: RecordId) -> Result<R, ServiceError>
    where
        R: Record,
        S: RecordStore<R> + ?Sized,
    {
        if id <= 0 {
            return Err(ServiceError::NotFound);
        }

        store
            .find_by_id(id)
            .await
            .map_err(ServiceError::Storage)?
            .ok_or(ServiceError::NotFound)
    }

    /// Association rows owned by `owner_id`. An empty result is not an error.
    pub async fn resolve_by_owner<A, S>(
        store: &S,
        owner_id: RecordId,
    ) -> Result<Vec<A>, ServiceError>
    where
        A: Association,
        S: AssociationStore<A> + ?Sized,
    {
        store
            .find_by_owner(owner_id)
            .await
            .map_err(ServiceError::Storage)
    }

    /// Records an owner links to through the `A` join table, such as the
    /// pictures of one album. Links to vanished records are skipped.
    pub async fn resolve_targets<A, T, S>(
        store: &S,
        owner_id: RecordId,
    ) -> Result<Vec<T>, ServiceError>
    where
        A: Association<Target = RecordId>,
        T: Record,
        S: AssociationStore<A> + RecordStore<T> + ?Sized,
    {
        let links = Self::resolve_by_owner::<A, S>(store, owner_id).await?;
        if links.is_empty() {
            return Ok(Vec::new());
        }

        let batch = IdentifierBatch::new(links.iter().map(|link| *link.target()).collect());
        match Self::resolve::<T, S>(store, &batch).await {
            Ok(resolved) => Ok(resolved.into_records()),
            Err(ServiceError::NotFound) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}
