// Catalogue entities (one struct per table) and the nested read views served by the API.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A card concept, keyed by its oracle id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub card_id: String,
    pub oracle_id: String,
    pub name: String,
    pub layout: Option<String>,
    pub reserved_list: bool,
}

/// A release grouping (table `set`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardSet {
    pub set_code: String,
    pub set_name: String,
    pub release_date: Option<NaiveDate>,
    pub set_type: Option<String>,
}

/// One printing of a card within a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Edition {
    pub edition_id: String,
    pub card_id: String,
    pub set_code: String,
    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub collector_number: Option<String>,
    pub image_url_normal: Option<String>,
    pub image_url_small: Option<String>,
    pub frame_version: Option<String>,
    pub frame_effect: Option<String>,
    pub finishes: Option<String>,
    pub is_promo: bool,
}

/// One face of a card; natural key is `(card_id, face_index)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardFace {
    /// Surrogate id, only known once the row has been read back.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub face_id: Option<i32>,
    pub card_id: String,
    pub face_index: i32,
    pub name: String,
    pub mana_cost: Option<String>,
    pub cmc: Option<BigDecimal>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, sqlx::FromRow)]
pub struct CardColorIdentity {
    pub card_id: String,
    pub color_id: String,
}

/// A dated price observation for an edition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PricePoint {
    pub edition_id: String,
    pub date_recorded: NaiveDate,
    pub market_price_usd: Option<BigDecimal>,
    pub foil_price_usd: Option<BigDecimal>,
}

/// What to do when an incoming card shares an oracle id with a stored card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardConflictPolicy {
    /// Overwrite name, layout and reserved flag with the incoming record.
    #[default]
    LatestWins,
    /// Leave the stored card untouched.
    KeepExisting,
}

impl CardConflictPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            CardConflictPolicy::LatestWins => "latest-wins",
            CardConflictPolicy::KeepExisting => "keep-existing",
        }
    }
}

impl std::str::FromStr for CardConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "latest-wins" | "overwrite" => Ok(CardConflictPolicy::LatestWins),
            "keep-existing" | "keep" => Ok(CardConflictPolicy::KeepExisting),
            other => Err(anyhow::anyhow!("unknown card conflict policy: {other}")),
        }
    }
}

impl std::fmt::Display for CardConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------- Read views ----------

/// A card as nested under an edition. Faces are only loaded for detailed queries.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    #[serde(rename = "CardFaces", skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<CardFace>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditionView {
    #[serde(flatten)]
    pub edition: Edition,
    #[serde(rename = "Card", skip_serializing_if = "Option::is_none")]
    pub card: Option<CardView>,
    #[serde(rename = "Set")]
    pub set: Option<CardSet>,
}

/// Full card lookup: faces by index, color identities, and every edition with its set.
#[derive(Debug, Clone, Serialize)]
pub struct CardDetail {
    #[serde(flatten)]
    pub card: Card,
    #[serde(rename = "CardFaces")]
    pub faces: Vec<CardFace>,
    #[serde(rename = "CardColorIdentities")]
    pub color_identities: Vec<CardColorIdentity>,
    #[serde(rename = "Editions")]
    pub editions: Vec<EditionView>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn conflict_policy_parses_aliases() {
        assert_eq!(
            CardConflictPolicy::from_str("latest_wins").unwrap(),
            CardConflictPolicy::LatestWins
        );
        assert_eq!(
            CardConflictPolicy::from_str("Keep-Existing").unwrap(),
            CardConflictPolicy::KeepExisting
        );
        assert!(CardConflictPolicy::from_str("merge").is_err());
    }

    #[test]
    fn edition_view_nests_card_and_set_under_frontend_keys() {
        let view = EditionView {
            edition: Edition {
                edition_id: "E1".into(),
                card_id: "O1".into(),
                set_code: "LEA".into(),
                rarity: Some("common".into()),
                artist: None,
                collector_number: None,
                image_url_normal: None,
                image_url_small: None,
                frame_version: None,
                frame_effect: None,
                finishes: None,
                is_promo: false,
            },
            card: Some(CardView {
                card: Card {
                    card_id: "O1".into(),
                    oracle_id: "O1".into(),
                    name: "Bolt".into(),
                    layout: None,
                    reserved_list: false,
                },
                faces: None,
            }),
            set: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["edition_id"], "E1");
        assert_eq!(json["Card"]["name"], "Bolt");
        assert!(json["Card"].get("CardFaces").is_none());
        assert!(json["Set"].is_null());
    }
}
