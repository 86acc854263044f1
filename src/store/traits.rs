use crate::model::{
    Association, Picture, PictureAlbum, PictureAlbumPicture, PictureTag, PokemonTrainer, Record,
    RecordId,
};
use anyhow::Result;
use uuid::Uuid;

/// Capability set every resource store exposes.
///
/// Errors are storage faults; "not there" is always expressed through
/// `Option`, an empty `Vec` or a `false`/zero count.
#[async_trait::async_trait]
pub trait RecordStore<R: Record>: Send + Sync {
    /// All records in the store's natural order (ascending id)
    async fn find_all(&self) -> Result<Vec<R>>;

    async fn find_by_id(&self, id: RecordId) -> Result<Option<R>>;

    /// Records whose id is in `ids`, in the store's natural order.
    /// Unknown ids are skipped and each record appears at most once.
    async fn find_many(&self, ids: &[RecordId]) -> Result<Vec<R>>;

    /// Insert a record and return it with its freshly assigned id
    async fn insert(&self, record: R) -> Result<R>;

    /// Insert all records atomically, returning them in input order with
    /// fresh ids. On error nothing has been written.
    async fn insert_many(&self, records: Vec<R>) -> Result<Vec<R>>;

    /// Replace the stored record with the same id; `None` if it does not exist
    async fn update(&self, record: R) -> Result<Option<R>>;

    async fn delete(&self, id: RecordId) -> Result<bool>;

    /// Returns the number of records removed
    async fn delete_many(&self, ids: &[RecordId]) -> Result<u64>;
}

/// Lookups of association rows by their owning record.
#[async_trait::async_trait]
pub trait AssociationStore<A: Association>: RecordStore<A> {
    /// Rows pointing at `owner_id`, ascending by row id
    async fn find_by_owner(&self, owner_id: RecordId) -> Result<Vec<A>>;
}

/// Picture operations beyond plain CRUD.
#[async_trait::async_trait]
pub trait PictureStore: RecordStore<Picture> {
    async fn find_by_blob_id(&self, blob_id: Uuid) -> Result<Option<Picture>>;

    /// Set only the low-resolution flag; `None` if the picture does not exist
    async fn set_low_resolution(
        &self,
        picture_id: RecordId,
        has_low_resolution: bool,
    ) -> Result<Option<Picture>>;
}

pub trait Store:
    RecordStore<Picture>
    + RecordStore<PictureAlbum>
    + RecordStore<PictureTag>
    + RecordStore<PictureAlbumPicture>
    + RecordStore<PokemonTrainer>
    + AssociationStore<PictureTag>
    + AssociationStore<PictureAlbumPicture>
    + PictureStore
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: RecordStore<Picture>
        + RecordStore<PictureAlbum>
        + RecordStore<PictureTag>
        + RecordStore<PictureAlbumPicture>
        + RecordStore<PokemonTrainer>
        + AssociationStore<PictureTag>
        + AssociationStore<PictureAlbumPicture>
        + PictureStore
        + Send
        + Sync
{
}
