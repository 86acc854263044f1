use serde::{Deserialize, Serialize};

use crate::model::{require_positive, require_text, Association, FieldViolation, Record, RecordId};

/// A free-text label attached to a picture.
///
/// Labels are not unique per picture; the same text may be attached any
/// number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PictureTag {
    #[serde(default)]
    pub picture_tag_id: RecordId,
    #[serde(default)]
    pub picture_id: RecordId,
    #[serde(default)]
    pub name: String,
}

impl PictureTag {
    pub fn new(picture_id: RecordId, name: impl Into<String>) -> Self {
        Self {
            picture_tag_id: 0,
            picture_id,
            name: name.into(),
        }
    }
}

impl Record for PictureTag {
    const RESOURCE: &'static str = "picture tag";

    fn id(&self) -> RecordId {
        self.picture_tag_id
    }

    fn set_id(&mut self, id: RecordId) {
        self.picture_tag_id = id;
    }

    fn validate_fields(&self) -> Result<(), FieldViolation> {
        require_positive("pictureId", self.picture_id)?;
        require_text("name", &self.name)
    }
}

impl Association for PictureTag {
    type Target = String;

    fn link(owner_id: RecordId, target: String) -> Self {
        Self::new(owner_id, target)
    }

    fn owner_id(&self) -> RecordId {
        self.picture_id
    }

    fn target(&self) -> &String {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_link_keeps_label_verbatim() {
        let tag = PictureTag::link(1, "Casper, Wyoming".to_string());
        assert_eq!(tag.picture_tag_id, 0);
        assert_eq!(tag.picture_id, 1);
        assert_eq!(tag.name, "Casper, Wyoming");
    }

    #[test]
    fn test_tag_requires_picture_and_name() {
        assert_eq!(
            PictureTag::new(0, "Laramie").validate_fields(),
            Err(FieldViolation::NonPositiveId("pictureId"))
        );
        assert_eq!(
            PictureTag::new(1, " ").validate_fields(),
            Err(FieldViolation::Missing("name"))
        );
    }
}
