use std::collections::HashSet;
use uuid::Uuid;

use crate::logic::associate::DedupPolicy;
use crate::logic::outcome::{RejectReason, Rejection, ServiceError};
use crate::model::{
    require_positive, AssociationRequest, IdentifierBatch, Record, RecordId,
    UpdatePictureLowResolution, UNASSIGNED_ID,
};

/// Classifies raw requests before any store access. Every check is pure.
pub struct RequestValidator;

impl RequestValidator {
    /// A `null` or absent body is never acceptable.
    pub fn require_body<T>(body: Option<T>) -> Result<T, ServiceError> {
        body.ok_or_else(|| ServiceError::rejected(RejectReason::MissingBody))
    }

    /// Single-identifier paths (`GET`/`DELETE /{resource}/{id}`).
    ///
    /// Only zero is rejected here; negative ids are well-formed and simply
    /// resolve to nothing.
    pub fn identifier(id: RecordId) -> Result<RecordId, ServiceError> {
        if id == UNASSIGNED_ID {
            return Err(ServiceError::rejected(RejectReason::ZeroIdentifier));
        }
        Ok(id)
    }

    /// Owner path of a by-owner listing (`/pictures/:id/tags`). Unlike plain
    /// lookups, the owner must be positive.
    pub fn owner(field: &'static str, id: RecordId) -> Result<RecordId, ServiceError> {
        require_positive(field, id).map_err(|violation| {
            Rejection::with_detail(RejectReason::InvalidOwner, violation.to_string())
        })?;
        Ok(id)
    }

    pub fn blob_id(blob_id: Uuid) -> Result<Uuid, ServiceError> {
        if blob_id.is_nil() {
            return Err(Rejection::with_detail(
                RejectReason::ZeroIdentifier,
                "blob id must not be the empty guid",
            )
            .into());
        }
        Ok(blob_id)
    }

    /// `PUT /pictures/low-resolution`
    pub fn low_resolution(
        body: Option<UpdatePictureLowResolution>,
    ) -> Result<UpdatePictureLowResolution, ServiceError> {
        let request = Self::require_body(body)?;
        require_positive("pictureId", request.picture_id).map_err(Rejection::field)?;
        Ok(request)
    }

    /// Batch get and bulk delete. The batch must be present and non-empty.
    pub fn batch(batch: Option<IdentifierBatch>) -> Result<IdentifierBatch, ServiceError> {
        match batch {
            Some(batch) if !batch.is_empty() => Ok(batch),
            _ => Err(ServiceError::rejected(RejectReason::EmptyIdentifiers)),
        }
    }

    /// Single create: body present, no caller-assigned id, fields valid.
    pub fn for_create<R: Record>(body: Option<R>) -> Result<R, ServiceError> {
        let record = Self::require_body(body)?;

        if record.id() != UNASSIGNED_ID {
            return Err(Rejection::with_detail(
                RejectReason::PreassignedId,
                format!("{} id {} was supplied", R::RESOURCE, record.id()),
            )
            .into());
        }

        record.validate_fields().map_err(Rejection::field)?;
        Ok(record)
    }

    /// Update: body present and fields valid. Existence is the store's call.
    pub fn for_update<R: Record>(body: Option<R>) -> Result<R, ServiceError> {
        let record = Self::require_body(body)?;
        record.validate_fields().map_err(Rejection::field)?;
        Ok(record)
    }

    /// Bulk association create.
    pub fn association<Q: AssociationRequest>(
        body: Option<Q>,
        policy: DedupPolicy,
    ) -> Result<Q, ServiceError> {
        let request = Self::require_body(body)?;
        Self::owner(Q::OWNER_FIELD, request.owner_id())?;

        let targets = request.targets();
        if targets.is_empty() {
            return Err(ServiceError::rejected(RejectReason::EmptyTargets));
        }

        for (index, target) in targets.iter().enumerate() {
            Q::validate_target(target).map_err(|violation| {
                Rejection::with_detail(
                    RejectReason::InvalidTarget,
                    format!("entry {}: {}", index, violation),
                )
            })?;
        }

        if policy == DedupPolicy::Reject {
            let mut seen = HashSet::with_capacity(targets.len());
            if let Some(repeat) = targets.iter().find(|target| !seen.insert(*target)) {
                return Err(Rejection::with_detail(
                    RejectReason::DuplicateTarget,
                    format!("{:?} appears more than once", repeat),
                )
                .into());
            }
        }

        Ok(request)
    }
}
