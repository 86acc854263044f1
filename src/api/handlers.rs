use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::extract::{IdList, Payload};
use crate::logic::{
    AssociationWriter, BatchResolver, Outcome, RejectReason, Rejection, RequestValidator,
    ServiceError,
};
use crate::model::{
    Association, AssociationRequest, IdentifierBatch, Picture, Record, RecordId,
    UpdatePictureLowResolution,
};
use crate::store::traits::{AssociationStore, PictureStore, RecordStore};

/// Shared per-router state: the store plus the request-independent writer.
pub struct AppContext<S> {
    pub store: Arc<S>,
    pub writer: AssociationWriter,
}

impl<S> AppContext<S> {
    pub fn new(store: Arc<S>, writer: AssociationWriter) -> Self {
        Self { store, writer }
    }
}

impl<S> Clone for AppContext<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            writer: self.writer,
        }
    }
}

pub type ApiResult<T> = Result<Outcome<T>, ApiError>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Log the terminal state of a request and convert it for the wire.
///
/// Rejections and misses are expected traffic; only storage faults are errors.
fn finish<T>(
    operation: &str,
    resource: &str,
    result: Result<Outcome<T>, ServiceError>,
) -> ApiResult<T> {
    match &result {
        Ok(outcome) => log::info!(
            "{} {} -> {}",
            operation,
            resource,
            outcome.class().status_code()
        ),
        Err(ServiceError::Rejected(rejection)) => {
            log::warn!("{} {} rejected: {}", operation, resource, rejection)
        }
        Err(ServiceError::NotFound) => {
            log::info!("{} {}: no matching records", operation, resource)
        }
        Err(ServiceError::Storage(e)) => {
            log::error!("{} {} failed: {:#}", operation, resource, e)
        }
    }
    result.map_err(ApiError::from)
}

fn path_value<T>(path: Result<Path<T>, PathRejection>) -> Result<T, ServiceError> {
    let Path(value) = path.map_err(|e| {
        ServiceError::from(Rejection::with_detail(
            RejectReason::MalformedIdentifiers,
            e.body_text(),
        ))
    })?;
    Ok(value)
}

fn path_id(path: Result<Path<RecordId>, PathRejection>) -> Result<RecordId, ServiceError> {
    RequestValidator::identifier(path_value(path)?)
}

fn listing<T>(records: Vec<T>) -> Outcome<Vec<T>> {
    if records.is_empty() {
        Outcome::NoContent
    } else {
        Outcome::Ok(records)
    }
}

/// `GET /{resource}` and `GET /{resource}?ids=...`
pub async fn list_records<S, R>(
    State(ctx): State<AppContext<S>>,
    IdList(ids): IdList,
) -> ApiResult<Vec<R>>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    let result = match ids {
        None => list_all::<S, R>(&ctx.store).await,
        Some(batch) => get_many::<S, R>(&ctx.store, Some(batch)).await,
    };
    finish("list", R::RESOURCE, result)
}

async fn list_all<S, R>(store: &S) -> Result<Outcome<Vec<R>>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let records = store.find_all().await.map_err(ServiceError::Storage)?;
    Ok(listing(records))
}

async fn get_many<S, R>(
    store: &S,
    ids: Option<IdentifierBatch>,
) -> Result<Outcome<Vec<R>>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let batch = RequestValidator::batch(ids)?;
    let resolved = BatchResolver::resolve::<R, S>(store, &batch).await?;
    if resolved.missing() > 0 {
        log::debug!(
            "{} batch resolved {} of {} requested ids",
            R::RESOURCE,
            resolved.len(),
            resolved.requested()
        );
    }
    Ok(Outcome::Ok(resolved.into_records()))
}

/// `GET /{resource}/:id`
pub async fn get_record<S, R>(
    State(ctx): State<AppContext<S>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<R>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    let result = match path_id(path) {
        Ok(id) => BatchResolver::resolve_one::<R, S>(&ctx.store, id)
            .await
            .map(Outcome::Ok),
        Err(e) => Err(e),
    };
    finish("get", R::RESOURCE, result)
}

/// `POST /{resource}`
pub async fn create_record<S, R>(
    State(ctx): State<AppContext<S>>,
    Payload(body): Payload<R>,
) -> ApiResult<R>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    finish("create", R::RESOURCE, create_one::<S, R>(&ctx.store, body).await)
}

async fn create_one<S, R>(store: &S, body: Option<R>) -> Result<Outcome<R>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let record = RequestValidator::for_create(body)?;
    let created = store.insert(record).await.map_err(ServiceError::Storage)?;
    Ok(Outcome::Created(created))
}

/// `PUT /{resource}`
pub async fn update_record<S, R>(
    State(ctx): State<AppContext<S>>,
    Payload(body): Payload<R>,
) -> ApiResult<R>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    finish("update", R::RESOURCE, update_one::<S, R>(&ctx.store, body).await)
}

async fn update_one<S, R>(store: &S, body: Option<R>) -> Result<Outcome<R>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let record = RequestValidator::for_update(body)?;
    match store.update(record).await.map_err(ServiceError::Storage)? {
        Some(updated) => Ok(Outcome::Ok(updated)),
        None => Err(ServiceError::NotFound),
    }
}

/// `DELETE /{resource}/:id`; deleting an absent record still succeeds.
pub async fn delete_record<S, R>(
    State(ctx): State<AppContext<S>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<()>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    let result = match path_id(path) {
        Ok(id) => delete_one::<S, R>(&ctx.store, id).await,
        Err(e) => Err(e),
    };
    finish("delete", R::RESOURCE, result)
}

async fn delete_one<S, R>(store: &S, id: RecordId) -> Result<Outcome<()>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let removed = store.delete(id).await.map_err(ServiceError::Storage)?;
    if !removed {
        log::debug!("{} {} was already absent", R::RESOURCE, id);
    }
    Ok(Outcome::Done)
}

/// `DELETE /{resource}?ids=...`
pub async fn delete_records<S, R>(
    State(ctx): State<AppContext<S>>,
    IdList(ids): IdList,
) -> ApiResult<()>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    finish("bulk delete", R::RESOURCE, delete_many::<S, R>(&ctx.store, ids).await)
}

async fn delete_many<S, R>(
    store: &S,
    ids: Option<IdentifierBatch>,
) -> Result<Outcome<()>, ServiceError>
where
    R: Record,
    S: RecordStore<R>,
{
    let batch = RequestValidator::batch(ids)?;
    let removed = store
        .delete_many(batch.ids())
        .await
        .map_err(ServiceError::Storage)?;
    log::debug!("Removed {} of {} {} rows", removed, batch.len(), R::RESOURCE);
    Ok(Outcome::Done)
}

/// `POST /{resource}/bulk`
pub async fn create_associations<S, Q>(
    State(ctx): State<AppContext<S>>,
    Payload(body): Payload<Q>,
) -> ApiResult<Vec<Q::Record>>
where
    Q: AssociationRequest,
    S: RecordStore<Q::Record> + RecordStore<Q::Owner> + 'static,
{
    let result = create_many(&ctx.writer, &*ctx.store, body).await;
    finish("bulk create", <Q::Record as Record>::RESOURCE, result)
}

async fn create_many<S, Q>(
    writer: &AssociationWriter,
    store: &S,
    body: Option<Q>,
) -> Result<Outcome<Vec<Q::Record>>, ServiceError>
where
    Q: AssociationRequest,
    S: RecordStore<Q::Record> + RecordStore<Q::Owner>,
{
    let request = RequestValidator::association(body, writer.policy())?;
    let created = writer.create_many(store, request).await?;
    Ok(Outcome::Created(created))
}

/// `GET /{owner}/:id/{association}`, e.g. the tags of one picture.
pub async fn list_by_owner<S, A>(
    State(ctx): State<AppContext<S>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Vec<A>>
where
    A: Association,
    S: AssociationStore<A> + 'static,
{
    let result = match path_value(path) {
        Ok(owner_id) => owned_rows::<S, A>(&ctx.store, owner_id).await,
        Err(e) => Err(e),
    };
    finish("list by owner", A::RESOURCE, result)
}

async fn owned_rows<S, A>(store: &S, owner_id: RecordId) -> Result<Outcome<Vec<A>>, ServiceError>
where
    A: Association,
    S: AssociationStore<A>,
{
    let owner_id = RequestValidator::owner("id", owner_id)?;
    let rows = BatchResolver::resolve_by_owner::<A, S>(store, owner_id).await?;
    Ok(listing(rows))
}

/// `GET /{owner}/:id/{targets}`: records reached through the `A` join rows,
/// e.g. the pictures of one album.
pub async fn list_targets<S, A, T>(
    State(ctx): State<AppContext<S>>,
    path: Result<Path<RecordId>, PathRejection>,
) -> ApiResult<Vec<T>>
where
    A: Association<Target = RecordId>,
    T: Record,
    S: AssociationStore<A> + RecordStore<T> + 'static,
{
    let result = match path_value(path) {
        Ok(owner_id) => linked_records::<S, A, T>(&ctx.store, owner_id).await,
        Err(e) => Err(e),
    };
    finish("list linked", T::RESOURCE, result)
}

async fn linked_records<S, A, T>(
    store: &S,
    owner_id: RecordId,
) -> Result<Outcome<Vec<T>>, ServiceError>
where
    A: Association<Target = RecordId>,
    T: Record,
    S: AssociationStore<A> + RecordStore<T>,
{
    let owner_id = RequestValidator::owner("id", owner_id)?;
    let records = BatchResolver::resolve_targets::<A, T, S>(store, owner_id).await?;
    Ok(listing(records))
}

/// `GET /pictures/blob/:blob_id`
pub async fn get_picture_by_blob<S>(
    State(ctx): State<AppContext<S>>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Picture>
where
    S: PictureStore + 'static,
{
    let result = match path_value(path) {
        Ok(blob_id) => picture_by_blob(&*ctx.store, blob_id).await,
        Err(e) => Err(e),
    };
    finish("get by blob", Picture::RESOURCE, result)
}

async fn picture_by_blob<S>(store: &S, blob_id: Uuid) -> Result<Outcome<Picture>, ServiceError>
where
    S: PictureStore + ?Sized,
{
    let blob_id = RequestValidator::blob_id(blob_id)?;
    let picture = store
        .find_by_blob_id(blob_id)
        .await
        .map_err(ServiceError::Storage)?;
    Ok(match picture {
        Some(picture) => Outcome::Ok(picture),
        None => Outcome::NoContent,
    })
}

/// `PUT /pictures/low-resolution`
pub async fn update_low_resolution<S>(
    State(ctx): State<AppContext<S>>,
    Payload(body): Payload<UpdatePictureLowResolution>,
) -> ApiResult<UpdatePictureLowResolution>
where
    S: PictureStore + 'static,
{
    finish(
        "flag low resolution",
        Picture::RESOURCE,
        flag_low_resolution(&*ctx.store, body).await,
    )
}

async fn flag_low_resolution<S>(
    store: &S,
    body: Option<UpdatePictureLowResolution>,
) -> Result<Outcome<UpdatePictureLowResolution>, ServiceError>
where
    S: PictureStore + ?Sized,
{
    let request = RequestValidator::low_resolution(body)?;
    let updated = store
        .set_low_resolution(request.picture_id, request.has_low_resolution)
        .await
        .map_err(ServiceError::Storage)?
        .ok_or(ServiceError::NotFound)?;
    Ok(Outcome::Ok(UpdatePictureLowResolution::from(&updated)))
}
