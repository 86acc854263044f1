use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    optional_text, require_positive, require_text, Association, FieldViolation, Record, RecordId,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Picture {
    #[serde(default)]
    pub picture_id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Key of the stored image in blob storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_id: Option<Uuid>,
    #[serde(default)]
    pub has_low_resolution: bool,
}

impl Picture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            picture_id: 0,
            name: name.into(),
            description: None,
            blob_id: None,
            has_low_resolution: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_blob_id(mut self, blob_id: Uuid) -> Self {
        self.blob_id = Some(blob_id);
        self
    }
}

/// `PUT /pictures/low-resolution`: flips one picture's low-resolution flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePictureLowResolution {
    #[serde(default)]
    pub picture_id: RecordId,
    #[serde(default)]
    pub has_low_resolution: bool,
}

impl From<&Picture> for UpdatePictureLowResolution {
    fn from(picture: &Picture) -> Self {
        Self {
            picture_id: picture.picture_id,
            has_low_resolution: picture.has_low_resolution,
        }
    }
}

impl Record for Picture {
    const RESOURCE: &'static str = "picture";

    fn id(&self) -> RecordId {
        self.picture_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.picture_id = id;
    }

    fn validate_fields(&self) -> Result<(), FieldViolation> {
        require_text("name", &self.name)?;
        optional_text("description", self.description.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureAlbum {
    #[serde(default)]
    pub picture_album_id: RecordId,
    #[serde(default)]
    pub name: String,
}

impl PictureAlbum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            picture_album_id: 0,
            name: name.into(),
        }
    }
}

impl Record for PictureAlbum {
    const RESOURCE: &'static str = "picture album";

    fn id(&self) -> RecordId {
        self.picture_album_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.picture_album_id = id;
    }

    fn validate_fields(&self) -> Result<(), FieldViolation> {
        require_text("name", &self.name)
    }
}

/// Join row placing a picture inside an album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureAlbumPicture {
    #[serde(default)]
    pub picture_album_picture_id: RecordId,
    #[serde(default)]
    pub picture_album_id: RecordId,
    #[serde(default)]
    pub picture_id: RecordId,
}

impl Record for PictureAlbumPicture {
    const RESOURCE: &'static str = "picture album picture";

    fn id(&self) -> RecordId {
        self.picture_album_picture_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.picture_album_picture_id = id;
    }

    fn validate_fields(&self) -> Result<(), FieldViolation> {
        require_positive("pictureAlbumId", self.picture_album_id)?;
        require_positive("pictureId", self.picture_id)
    }
}

impl Association for PictureAlbumPicture {
    type Target = RecordId;

    fn link(owner_id: RecordId, target: RecordId) -> Self {
        Self {
            picture_album_picture_id: 0,
            picture_album_id: owner_id,
            picture_id: target,
        }
    }

    fn owner_id(&self) -> RecordId {
        self.picture_album_id
    }

    fn target(&self) -> &RecordId {
        &self.picture_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_json_uses_camel_case() {
        let picture = Picture {
            picture_id: 3,
            name: "Elephants".to_string(),
            description: None,
            blob_id: None,
            has_low_resolution: true,
        };
        let json = serde_json::to_value(&picture).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"pictureId": 3, "name": "Elephants", "hasLowResolution": true})
        );
    }

    #[test]
    fn test_picture_blob_id_is_a_guid() {
        let picture: Picture = serde_json::from_str(
            r#"{"name": "Sunset", "blobId": "67e55044-10b1-426f-9247-bb680e5fe0c8"}"#,
        )
        .unwrap();
        assert_eq!(
            picture.blob_id.map(|id| id.to_string()).as_deref(),
            Some("67e55044-10b1-426f-9247-bb680e5fe0c8")
        );
        assert!(!picture.has_low_resolution);
    }

    #[test]
    fn test_low_resolution_update_shape() {
        let request: UpdatePictureLowResolution =
            serde_json::from_str(r#"{"pictureId": 4, "hasLowResolution": true}"#).unwrap();
        assert_eq!(request.picture_id, 4);
        assert!(request.has_low_resolution);

        let mut picture = Picture::new("Prairie");
        picture.picture_id = 4;
        picture.has_low_resolution = true;
        assert_eq!(UpdatePictureLowResolution::from(&picture), request);
    }

    #[test]
    fn test_picture_create_body_defaults_id() {
        let picture: Picture = serde_json::from_str(r#"{"name": "Sunset"}"#).unwrap();
        assert_eq!(picture.id(), 0);
        assert!(picture.validate_fields().is_ok());
    }

    #[test]
    fn test_picture_missing_name_is_field_violation() {
        let picture: Picture = serde_json::from_str(r#"{"pictureId": 1}"#).unwrap();
        assert_eq!(
            picture.validate_fields(),
            Err(FieldViolation::Missing("name"))
        );
    }

    #[test]
    fn test_album_picture_link() {
        let link = PictureAlbumPicture::link(1, 3);
        assert_eq!(link.id(), 0);
        assert_eq!(link.owner_id(), 1);
        assert_eq!(*link.target(), 3);
        assert!(link.validate_fields().is_ok());
        assert!(PictureAlbumPicture::link(1, -2).validate_fields().is_err());
    }
}
