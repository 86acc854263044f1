use serde::{Deserialize, Serialize};

use crate::model::{require_text, FieldViolation, Record, RecordId};

pub const MAX_BADGES: i32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PokemonTrainer {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub number_of_badges: i32,
}

impl PokemonTrainer {
    pub fn new(name: impl Into<String>, number_of_badges: i32) -> Self {
        Self {
            id: 0,
            name: name.into(),
            number_of_badges,
        }
    }
}

impl Record for PokemonTrainer {
    const RESOURCE: &'static str = "trainer";

    fn id(&self) -> RecordId {
        self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn validate_fields(&self) -> Result<(), FieldViolation> {
        require_text("name", &self.name)?;
        if !(0..=MAX_BADGES).contains(&self.number_of_badges) {
            return Err(FieldViolation::OutOfRange {
                field: "numberOfBadges",
                min: 0,
                max: MAX_BADGES as i64,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_range() {
        assert!(PokemonTrainer::new("Misty", 0).validate_fields().is_ok());
        assert!(PokemonTrainer::new("Ash", 8).validate_fields().is_ok());
        assert!(PokemonTrainer::new("Gary", 9).validate_fields().is_err());
        assert!(PokemonTrainer::new("Brock", -1).validate_fields().is_err());
    }

    #[test]
    fn test_trainer_json_shape() {
        let trainer: PokemonTrainer =
            serde_json::from_str(r#"{"name": "Brock", "numberOfBadges": 2}"#).unwrap();
        assert_eq!(trainer.id, 0);
        assert_eq!(trainer.number_of_badges, 2);
    }
}
