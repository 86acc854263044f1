use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::model::{
    require_positive, require_text, Association, FieldViolation, Picture, PictureAlbum,
    PictureAlbumPicture, PictureTag, Record, RecordId,
};

/// One owner plus the targets (or labels) to associate with it.
pub trait AssociationRequest: Send + Sync + DeserializeOwned + 'static {
    type Record: Association;

    /// The record every created row points at; it must exist.
    type Owner: Record;

    /// Name of the owning id field, as seen by clients.
    const OWNER_FIELD: &'static str;

    fn owner_id(&self) -> RecordId;

    fn targets(&self) -> &[<Self::Record as Association>::Target];

    /// Per-target field constraints.
    fn validate_target(
        target: &<Self::Record as Association>::Target,
    ) -> Result<(), FieldViolation>;
}

/// `POST /picture-tags/bulk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManyPictureTags {
    #[serde(default)]
    pub picture_id: RecordId,
    #[serde(default, alias = "pictureTags")]
    pub tags: Vec<String>,
}

impl AssociationRequest for CreateManyPictureTags {
    type Record = PictureTag;
    type Owner = Picture;

    const OWNER_FIELD: &'static str = "pictureId";

    fn owner_id(&self) -> RecordId {
        self.picture_id
    }

    fn targets(&self) -> &[String] {
        &self.tags
    }

    fn validate_target(target: &String) -> Result<(), FieldViolation> {
        require_text("tags", target)
    }
}

/// `POST /picture-album-pictures/bulk`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManyAlbumPictures {
    #[serde(default)]
    pub picture_album_id: RecordId,
    #[serde(default)]
    pub picture_ids: Vec<RecordId>,
}

impl AssociationRequest for CreateManyAlbumPictures {
    type Record = PictureAlbumPicture;
    type Owner = PictureAlbum;

    const OWNER_FIELD: &'static str = "pictureAlbumId";

    fn owner_id(&self) -> RecordId {
        self.picture_album_id
    }

    fn targets(&self) -> &[RecordId] {
        &self.picture_ids
    }

    fn validate_target(target: &RecordId) -> Result<(), FieldViolation> {
        require_positive("pictureIds", *target)
    }
}
