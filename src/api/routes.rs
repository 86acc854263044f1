use axum::{
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;

use crate::api::error::ApiError;
use crate::api::handlers::{self, AppContext};
use crate::logic::{AssociationWriter, DedupPolicy};
use crate::model::{
    CreateManyAlbumPictures, CreateManyPictureTags, Picture, PictureAlbum, PictureAlbumPicture,
    PictureTag, PokemonTrainer, Record,
};
use crate::store::traits::{RecordStore, Store};

pub fn create_router<S: Store + 'static>() -> Router<AppContext<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .merge(resource_routes::<S, Picture>("/pictures"))
        .merge(resource_routes::<S, PictureAlbum>("/picture-albums"))
        .merge(resource_routes::<S, PictureTag>("/picture-tags"))
        .merge(resource_routes::<S, PictureAlbumPicture>("/picture-album-pictures"))
        .merge(resource_routes::<S, PokemonTrainer>("/trainers"))
        // Bulk association endpoints
        .route(
            "/picture-tags/bulk",
            post(handlers::create_associations::<S, CreateManyPictureTags>),
        )
        .route(
            "/picture-album-pictures/bulk",
            post(handlers::create_associations::<S, CreateManyAlbumPictures>),
        )
        // Lookups through owners and picture attributes
        .route(
            "/pictures/:id/tags",
            get(handlers::list_by_owner::<S, PictureTag>),
        )
        .route(
            "/picture-albums/:id/pictures",
            get(handlers::list_targets::<S, PictureAlbumPicture, Picture>),
        )
        .route(
            "/pictures/blob/:blob_id",
            get(handlers::get_picture_by_blob::<S>),
        )
        .route(
            "/pictures/low-resolution",
            put(handlers::update_low_resolution::<S>),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
}

/// The full application with its state attached.
pub fn build_app<S: Store + 'static>(store: Arc<S>, dedup: DedupPolicy) -> Router {
    create_router::<S>().with_state(AppContext::new(store, AssociationWriter::new(dedup)))
}

fn resource_routes<S, R>(path: &str) -> Router<AppContext<S>>
where
    R: Record,
    S: RecordStore<R> + 'static,
{
    Router::new()
        .route(
            path,
            get(handlers::list_records::<S, R>)
                .post(handlers::create_record::<S, R>)
                .put(handlers::update_record::<S, R>)
                .delete(handlers::delete_records::<S, R>),
        )
        .route(
            &format!("{}/:id", path),
            get(handlers::get_record::<S, R>).delete(handlers::delete_record::<S, R>),
        )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    log::error!("Request handler panicked: {}", detail);
    ApiError::internal().into_response()
}
