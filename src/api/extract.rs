use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::api::error::ApiError;
use crate::logic::{RejectReason, Rejection, ServiceError};
use crate::model::IdentifierBatch;

/// JSON request body where an absent body and a literal `null` both count
/// as "no body". The validator decides what that means for the endpoint.
#[derive(Debug)]
pub struct Payload<T>(pub Option<T>);

#[async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|e| {
            ApiError::from(ServiceError::from(Rejection::with_detail(
                RejectReason::MalformedBody,
                e.body_text(),
            )))
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Payload(None));
        }

        serde_json::from_slice::<Option<T>>(&bytes)
            .map(Payload)
            .map_err(|e| {
                log::warn!("Rejected request body: {}", e);
                ServiceError::from(Rejection::with_detail(
                    RejectReason::MalformedBody,
                    e.to_string(),
                ))
                .into()
            })
    }
}

#[derive(Debug, Deserialize)]
struct IdsQuery {
    ids: Option<String>,
}

/// The `?ids=` query parameter. `None` when the parameter is absent,
/// `Some(empty)` when it is present with nothing in it.
#[derive(Debug)]
pub struct IdList(pub Option<IdentifierBatch>);

#[async_trait]
impl<S> FromRequestParts<S> for IdList
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<IdsQuery>::try_from_uri(&parts.uri).map_err(|e| {
            ApiError::from(ServiceError::from(Rejection::with_detail(
                RejectReason::MalformedIdentifiers,
                e.body_text(),
            )))
        })?;

        match query.ids {
            None => Ok(IdList(None)),
            Some(raw) => IdentifierBatch::parse(&raw)
                .map(|batch| IdList(Some(batch)))
                .map_err(|e| {
                    ServiceError::from(Rejection::with_detail(
                        RejectReason::MalformedIdentifiers,
                        format!("'{}': {}", raw, e),
                    ))
                    .into()
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};

    use crate::model::Picture;

    async fn payload(body: &'static str) -> Result<Payload<Picture>, ApiError> {
        let req = HttpRequest::builder()
            .method("POST")
            .uri("/pictures")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        Payload::<Picture>::from_request(req, &()).await
    }

    async fn id_list(uri: &str) -> Result<IdList, ApiError> {
        let req = HttpRequest::builder().uri(uri).body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        IdList::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_empty_and_null_bodies_are_absent() {
        assert!(payload("").await.unwrap().0.is_none());
        assert!(payload("  \n").await.unwrap().0.is_none());
        assert!(payload("null").await.unwrap().0.is_none());
    }

    #[tokio::test]
    async fn test_valid_body() {
        let Payload(picture) = payload(r#"{"name": "Sunset"}"#).await.unwrap();
        assert_eq!(picture.map(|p| p.name), Some("Sunset".to_string()));
    }

    #[tokio::test]
    async fn test_broken_json_is_bad_request() {
        let err = payload(r#"{"name": "#).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_ids_query() {
        assert!(id_list("/pictures").await.unwrap().0.is_none());

        let IdList(batch) = id_list("/pictures?ids=").await.unwrap();
        assert_eq!(batch.map(|b| b.len()), Some(0));

        let IdList(batch) = id_list("/pictures?ids=2,3,4,0,-7").await.unwrap();
        assert_eq!(batch.unwrap().ids(), &[2, 3, 4, 0, -7]);

        let err = id_list("/pictures?ids=1,two").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
