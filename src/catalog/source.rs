// Shapes of one element of the bulk card dump. Unknown fields are ignored.

use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageUris {
    pub normal: Option<String>,
    pub small: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPrices {
    pub usd: Option<String>,
    pub usd_foil: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCardFace {
    pub name: Option<String>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCard {
    /// Per-printing id.
    pub id: Option<String>,
    pub oracle_id: Option<String>,
    pub name: Option<String>,
    pub layout: Option<String>,
    pub reserved: Option<bool>,

    pub set: Option<String>,
    pub set_name: Option<String>,
    pub released_at: Option<NaiveDate>,
    pub set_type: Option<String>,

    pub rarity: Option<String>,
    pub artist: Option<String>,
    pub collector_number: Option<String>,
    pub image_uris: Option<RawImageUris>,
    pub frame: Option<String>,
    pub frame_effects: Option<Vec<String>>,
    pub finishes: Option<Vec<String>>,
    pub promo: Option<bool>,

    pub card_faces: Option<Vec<RawCardFace>>,
    pub mana_cost: Option<String>,
    pub cmc: Option<f64>,
    pub oracle_text: Option<String>,
    pub flavor_text: Option<String>,
    pub power: Option<String>,
    pub toughness: Option<String>,

    pub color_identity: Option<Vec<String>>,
    pub prices: Option<RawPrices>,
}
