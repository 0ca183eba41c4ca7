// Admin create/update payload and its mapping onto a transactional CardUpdate.

use crate::catalog::mapper::{decimal_from_f64, distinct_colors};
use crate::catalog::model::{Card, CardFace, CardSet, Edition};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FacePayload {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
}

/// Body of `POST /api/cards` and `PUT /api/cards/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardPayload {
    pub card_id: Option<String>,
    pub oracle_id: Option<String>,
    pub name: Option<String>,
    pub layout: Option<String>,
    pub reserved_list: Option<bool>,

    pub set_code: Option<String>,
    pub set_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
    pub set_type: Option<String>,

    pub edition_id: Option<String>,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub collector_number: Option<String>,
    pub image_url_normal: Option<String>,
    pub image_url_small: Option<String>,

    pub faces: Option<Vec<FacePayload>>,
    pub color_identity: Option<Vec<String>>,
}

/// The admin form sends `""` for an unset date.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("card_id or oracle_id is required")]
    MissingId,
    #[error("name is required")]
    MissingName,
    #[error("set_code is required when edition_id is given")]
    MissingSetCode,
}

/// The edition columns an admin form owns. Import-only metadata (frame, finishes,
/// promo flag) is not part of it and survives an edit untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EditionEdit {
    pub edition_id: String,
    pub card_id: String,
    pub set_code: String,
    pub rarity: String,
    pub artist: String,
    pub collector_number: String,
    pub image_url_normal: String,
    pub image_url_small: String,
}

impl EditionEdit {
    /// Row for an edition the import has never seen.
    pub fn to_new_edition(&self) -> Edition {
        Edition {
            edition_id: self.edition_id.clone(),
            card_id: self.card_id.clone(),
            set_code: self.set_code.clone(),
            rarity: Some(self.rarity.clone()),
            artist: Some(self.artist.clone()),
            collector_number: Some(self.collector_number.clone()),
            image_url_normal: Some(self.image_url_normal.clone()),
            image_url_small: Some(self.image_url_small.clone()),
            frame_version: None,
            frame_effect: None,
            finishes: None,
            is_promo: false,
        }
    }

    /// Overwrites only the admin-owned columns of `existing`.
    pub fn merge_into(&self, existing: &mut Edition) {
        existing.card_id = self.card_id.clone();
        existing.set_code = self.set_code.clone();
        existing.rarity = Some(self.rarity.clone());
        existing.artist = Some(self.artist.clone());
        existing.collector_number = Some(self.collector_number.clone());
        existing.image_url_normal = Some(self.image_url_normal.clone());
        existing.image_url_small = Some(self.image_url_small.clone());
    }
}

/// Everything one admin upsert writes. `None` collections leave existing rows alone;
/// `Some` collections fully replace them.
#[derive(Debug, Clone, PartialEq)]
pub struct CardUpdate {
    pub set: Option<CardSet>,
    pub card: Card,
    pub edition: Option<EditionEdit>,
    pub faces: Option<Vec<CardFace>>,
    pub colors: Option<Vec<String>>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CardPayload {
    /// `path_id` is the `{id}` of a PUT, used only when the body carries no id.
    pub fn into_update(self, path_id: Option<&str>) -> Result<CardUpdate, PayloadError> {
        let card_id = non_empty(self.card_id)
            .or_else(|| non_empty(self.oracle_id.clone()))
            .or_else(|| non_empty(path_id.map(str::to_string)))
            .ok_or(PayloadError::MissingId)?;
        let name = non_empty(self.name).ok_or(PayloadError::MissingName)?;
        let set_code = non_empty(self.set_code);

        let set = set_code.as_ref().map(|code| CardSet {
            set_code: code.clone(),
            set_name: non_empty(self.set_name).unwrap_or_else(|| "Unknown Set".to_string()),
            release_date: self.release_date,
            set_type: Some(non_empty(self.set_type).unwrap_or_else(|| "core".to_string())),
        });

        let card = Card {
            card_id: card_id.clone(),
            oracle_id: non_empty(self.oracle_id).unwrap_or_else(|| card_id.clone()),
            name: name.clone(),
            layout: Some(non_empty(self.layout).unwrap_or_else(|| "normal".to_string())),
            reserved_list: self.reserved_list.unwrap_or(false),
        };

        let edition = match (non_empty(self.edition_id), set_code) {
            (Some(edition_id), Some(set_code)) => Some(EditionEdit {
                edition_id,
                card_id: card_id.clone(),
                set_code,
                rarity: non_empty(self.rarity).unwrap_or_else(|| "common".to_string()),
                artist: non_empty(self.artist).unwrap_or_else(|| "Unknown".to_string()),
                collector_number: non_empty(self.collector_number)
                    .unwrap_or_else(|| "0".to_string()),
                image_url_normal: self.image_url_normal.unwrap_or_default(),
                image_url_small: self.image_url_small.unwrap_or_default(),
            }),
            (Some(_), None) => return Err(PayloadError::MissingSetCode),
            (None, _) => None,
        };

        let faces = self.faces.map(|faces| {
            faces
                .into_iter()
                .enumerate()
                .map(|(i, face)| CardFace {
                    face_id: None,
                    card_id: card_id.clone(),
                    face_index: i as i32,
                    name: non_empty(face.name).unwrap_or_else(|| name.clone()),
                    mana_cost: Some(face.mana_cost.unwrap_or_default()),
                    cmc: decimal_from_f64(face.cmc.unwrap_or(0.0)),
                    oracle_text: Some(face.oracle_text.unwrap_or_default()),
                    flavor_text: Some(face.flavor_text.unwrap_or_default()),
                    power: non_empty(face.power),
                    toughness: non_empty(face.toughness),
                })
                .collect()
        });

        let colors = self.color_identity.map(distinct_colors);

        Ok(CardUpdate {
            set,
            card,
            edition,
            faces,
            colors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> CardPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn applies_defaults_for_missing_fields() {
        let update = payload(json!({
            "oracle_id": "O1",
            "name": "Bolt",
            "set_code": "LEA",
            "edition_id": "E1",
            "release_date": "",
            "faces": [{"cmc": null}],
            "color_identity": ["R", "R"]
        }))
        .into_update(None)
        .unwrap();

        assert_eq!(update.card.card_id, "O1");
        assert_eq!(update.card.layout.as_deref(), Some("normal"));
        let set = update.set.unwrap();
        assert_eq!(set.set_name, "Unknown Set");
        assert_eq!(set.set_type.as_deref(), Some("core"));
        assert!(set.release_date.is_none());
        let edition = update.edition.unwrap();
        assert_eq!(edition.rarity, "common");
        assert_eq!(edition.artist, "Unknown");
        assert_eq!(edition.collector_number, "0");
        let faces = update.faces.unwrap();
        assert_eq!(faces[0].name, "Bolt");
        assert_eq!(faces[0].cmc, decimal_from_f64(0.0));
        assert!(faces[0].power.is_none());
        assert_eq!(update.colors, Some(vec!["R".to_string()]));
    }

    #[test]
    fn card_id_prefers_body_then_oracle_then_path() {
        let update = payload(json!({"name": "X"}))
            .into_update(Some("P1"))
            .unwrap();
        assert_eq!(update.card.card_id, "P1");
        assert_eq!(update.card.oracle_id, "P1");

        let update = payload(json!({"name": "X", "oracle_id": "O1"}))
            .into_update(Some("P1"))
            .unwrap();
        assert_eq!(update.card.card_id, "O1");

        let update = payload(json!({"name": "X", "card_id": "C1", "oracle_id": "O1"}))
            .into_update(None)
            .unwrap();
        assert_eq!(update.card.card_id, "C1");
        assert_eq!(update.card.oracle_id, "O1");
    }

    #[test]
    fn rejects_missing_identity_or_name() {
        assert_eq!(
            payload(json!({"name": "X"})).into_update(None).unwrap_err(),
            PayloadError::MissingId
        );
        assert_eq!(
            payload(json!({"card_id": "C1", "name": "  "}))
                .into_update(None)
                .unwrap_err(),
            PayloadError::MissingName
        );
    }

    #[test]
    fn edition_without_set_code_is_rejected() {
        assert_eq!(
            payload(json!({"card_id": "C1", "name": "X", "edition_id": "E77"}))
                .into_update(None)
                .unwrap_err(),
            PayloadError::MissingSetCode
        );
        assert_eq!(
            payload(json!({"card_id": "C1", "name": "X", "edition_id": "E77", "set_code": " "}))
                .into_update(None)
                .unwrap_err(),
            PayloadError::MissingSetCode
        );
    }

    #[test]
    fn merge_keeps_import_metadata() {
        let edit = payload(json!({
            "card_id": "C1", "name": "X", "edition_id": "E1",
            "set_code": "LEA", "rarity": "rare"
        }))
        .into_update(None)
        .unwrap()
        .edition
        .unwrap();
        let mut existing = edit.to_new_edition();
        existing.frame_version = Some("2015".into());
        existing.finishes = Some("foil".into());
        existing.is_promo = true;
        existing.rarity = Some("common".into());

        edit.merge_into(&mut existing);
        assert_eq!(existing.rarity.as_deref(), Some("rare"));
        assert_eq!(existing.frame_version.as_deref(), Some("2015"));
        assert_eq!(existing.finishes.as_deref(), Some("foil"));
        assert!(existing.is_promo);
    }

    #[test]
    fn absent_collections_leave_rows_alone() {
        let update = payload(json!({"card_id": "C1", "name": "X"}))
            .into_update(None)
            .unwrap();
        assert!(update.faces.is_none());
        assert!(update.colors.is_none());
        assert!(update.set.is_none());
        assert!(update.edition.is_none());
    }
}
