use thiserror::Error;

use crate::model::FieldViolation;

/// Why a request was classified as malformed before any store access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    MissingBody,
    MalformedBody,
    MalformedIdentifiers,
    EmptyIdentifiers,
    ZeroIdentifier,
    PreassignedId,
    InvalidField,
    InvalidOwner,
    EmptyTargets,
    InvalidTarget,
    DuplicateTarget,
}

/// User-facing message for every rejection sub-reason.
const REJECTION_MESSAGES: &[(RejectReason, &str)] = &[
    (RejectReason::MissingBody, "Request body is required"),
    (RejectReason::MalformedBody, "Request body is not valid JSON for this resource"),
    (RejectReason::MalformedIdentifiers, "Identifier list must be comma separated integers"),
    (RejectReason::EmptyIdentifiers, "At least one identifier is required"),
    (RejectReason::ZeroIdentifier, "Identifier must be non-zero"),
    (RejectReason::PreassignedId, "New records must not carry an identifier"),
    (RejectReason::InvalidField, "One or more fields are invalid"),
    (RejectReason::InvalidOwner, "Owning identifier must be positive"),
    (RejectReason::EmptyTargets, "At least one target is required"),
    (RejectReason::InvalidTarget, "One or more targets are invalid"),
    (RejectReason::DuplicateTarget, "Targets must not repeat"),
];

const FALLBACK_REJECTION_MESSAGE: &str = "Bad request";

impl RejectReason {
    pub fn message(self) -> &'static str {
        REJECTION_MESSAGES
            .iter()
            .find(|(reason, _)| *reason == self)
            .map(|(_, message)| *message)
            .unwrap_or(FALLBACK_REJECTION_MESSAGE)
    }
}

/// A malformed-request classification, optionally with a client-safe detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub reason: RejectReason,
    pub detail: Option<String>,
}

impl Rejection {
    pub fn new(reason: RejectReason) -> Self {
        Self {
            reason,
            detail: None,
        }
    }

    pub fn with_detail(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: Some(detail.into()),
        }
    }

    pub fn field(violation: FieldViolation) -> Self {
        Self::with_detail(RejectReason::InvalidField, violation.to_string())
    }

    pub fn message(&self) -> &'static str {
        self.reason.message()
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.message(), detail),
            None => write!(f, "{}", self.message()),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("malformed request: {0}")]
    Rejected(Rejection),
    #[error("no matching records")]
    NotFound,
    #[error("storage fault: {0:#}")]
    Storage(anyhow::Error),
}

impl ServiceError {
    pub fn rejected(reason: RejectReason) -> Self {
        Self::Rejected(Rejection::new(reason))
    }

    pub fn class(&self) -> ResponseClass {
        match self {
            Self::Rejected(_) => ResponseClass::BadRequest,
            Self::NotFound => ResponseClass::NotFound,
            Self::Storage(_) => ResponseClass::InternalError,
        }
    }
}

impl From<Rejection> for ServiceError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

/// Canonical response classes shared by every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    Ok,
    Created,
    NoContent,
    BadRequest,
    NotFound,
    InternalError,
}

impl ResponseClass {
    pub fn status_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NoContent => 204,
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::InternalError => 500,
        }
    }
}

/// Successful terminal state of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Created(T),
    /// Read succeeded but there is nothing to return.
    NoContent,
    /// Write succeeded and there is no payload.
    Done,
}

impl<T> Outcome<T> {
    pub fn class(&self) -> ResponseClass {
        match self {
            Self::Ok(_) | Self::Done => ResponseClass::Ok,
            Self::Created(_) => ResponseClass::Created,
            Self::NoContent => ResponseClass::NoContent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REASONS: &[RejectReason] = &[
        RejectReason::MissingBody,
        RejectReason::MalformedBody,
        RejectReason::MalformedIdentifiers,
        RejectReason::EmptyIdentifiers,
        RejectReason::ZeroIdentifier,
        RejectReason::PreassignedId,
        RejectReason::InvalidField,
        RejectReason::InvalidOwner,
        RejectReason::EmptyTargets,
        RejectReason::InvalidTarget,
        RejectReason::DuplicateTarget,
    ];

    #[test]
    fn test_every_reason_has_a_message() {
        for reason in ALL_REASONS {
            assert_ne!(
                reason.message(),
                FALLBACK_REJECTION_MESSAGE,
                "{:?} is missing from the message table",
                reason
            );
        }
        assert_eq!(REJECTION_MESSAGES.len(), ALL_REASONS.len());
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(
            ServiceError::rejected(RejectReason::EmptyIdentifiers).class(),
            ResponseClass::BadRequest
        );
        assert_eq!(ServiceError::NotFound.class(), ResponseClass::NotFound);
        assert_eq!(
            ServiceError::Storage(anyhow::anyhow!("connection reset")).class(),
            ResponseClass::InternalError
        );
    }

    #[test]
    fn test_outcome_classes() {
        assert_eq!(Outcome::Ok(1).class().status_code(), 200);
        assert_eq!(Outcome::Created(1).class().status_code(), 201);
        assert_eq!(Outcome::<()>::NoContent.class().status_code(), 204);
        assert_eq!(Outcome::<()>::Done.class().status_code(), 200);
    }

    #[test]
    fn test_field_rejection_keeps_detail() {
        let rejection = Rejection::field(FieldViolation::Missing("name"));
        assert_eq!(rejection.reason, RejectReason::InvalidField);
        assert_eq!(
            rejection.to_string(),
            "One or more fields are invalid: field 'name' is required"
        );
    }
}
