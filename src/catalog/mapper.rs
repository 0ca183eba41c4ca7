//! Maps one raw dump record onto the normalized catalogue entities.
//!
//! The oracle id becomes both `card_id` and `oracle_id`, so every printing of a
//! card collapses onto one [`Card`] while the per-printing `id` keys the
//! [`Edition`]. Records without `card_faces` get a single synthesized face.

use crate::catalog::model::{Card, CardFace, CardSet, Edition, PricePoint};
use crate::catalog::source::{RawCard, RawCardFace, RawPrices};
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("record is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record does not match the card shape: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Every entity derived from one source record, in write order.
#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord {
    pub set: CardSet,
    pub card: Card,
    pub edition: Edition,
    pub faces: Vec<CardFace>,
    /// Distinct color codes, source order preserved.
    pub colors: Vec<String>,
    pub price: Option<PricePoint>,
}

/// Best-effort display name for log lines, available even when decoding fails.
pub fn record_name(value: &Value) -> &str {
    value
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("<unnamed>")
}

pub fn decode_record(value: Value) -> Result<RawCard, MapError> {
    Ok(serde_json::from_value(value)?)
}

/// Decode and map in one step; `today` dates the price observation.
pub fn map_value(value: Value, today: NaiveDate) -> Result<CardRecord, MapError> {
    map_record(decode_record(value)?, today)
}

pub fn map_record(raw: RawCard, today: NaiveDate) -> Result<CardRecord, MapError> {
    let oracle_id = required(raw.oracle_id, "oracle_id")?;
    let edition_id = required(raw.id, "id")?;
    let name = required(raw.name, "name")?;
    let set_code = required(raw.set, "set")?;

    let set = CardSet {
        set_code: set_code.clone(),
        // `set_name` is NOT NULL; fall back to the code rather than rejecting the record.
        set_name: raw.set_name.unwrap_or_else(|| set_code.clone()),
        release_date: raw.released_at,
        set_type: raw.set_type,
    };

    let card = Card {
        card_id: oracle_id.clone(),
        oracle_id: oracle_id.clone(),
        name: name.clone(),
        layout: raw.layout,
        reserved_list: raw.reserved.unwrap_or(false),
    };

    let images = raw.image_uris.unwrap_or_default();
    let edition = Edition {
        edition_id: edition_id.clone(),
        card_id: oracle_id.clone(),
        set_code,
        rarity: raw.rarity,
        artist: raw.artist,
        collector_number: raw.collector_number,
        image_url_normal: images.normal,
        image_url_small: images.small,
        frame_version: raw.frame,
        frame_effect: raw.frame_effects.map(|v| v.join(",")),
        finishes: raw.finishes.map(|v| v.join(",")),
        is_promo: raw.promo.unwrap_or(false),
    };

    let faces = match raw.card_faces {
        Some(faces) => faces
            .into_iter()
            .enumerate()
            .map(|(i, face)| map_face(&oracle_id, i as i32, face, &name))
            .collect(),
        None => vec![map_face(
            &oracle_id,
            0,
            RawCardFace {
                name: Some(name.clone()),
                mana_cost: raw.mana_cost,
                cmc: raw.cmc,
                oracle_text: raw.oracle_text,
                flavor_text: raw.flavor_text,
                power: raw.power,
                toughness: raw.toughness,
            },
            &name,
        )],
    };

    let colors = distinct_colors(raw.color_identity.unwrap_or_default());
    let price = raw
        .prices
        .and_then(|prices| map_price(&edition_id, prices, today));

    Ok(CardRecord {
        set,
        card,
        edition,
        faces,
        colors,
        price,
    })
}

fn required(value: Option<String>, field: &'static str) -> Result<String, MapError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MapError::MissingField(field)),
    }
}

fn map_face(card_id: &str, face_index: i32, face: RawCardFace, card_name: &str) -> CardFace {
    CardFace {
        face_id: None,
        card_id: card_id.to_string(),
        face_index,
        name: face.name.unwrap_or_else(|| card_name.to_string()),
        mana_cost: face.mana_cost,
        cmc: face.cmc.and_then(decimal_from_f64),
        oracle_text: face.oracle_text,
        flavor_text: face.flavor_text,
        power: face.power,
        toughness: face.toughness,
    }
}

fn map_price(edition_id: &str, prices: RawPrices, today: NaiveDate) -> Option<PricePoint> {
    let market = prices.usd.as_deref().and_then(parse_decimal);
    let foil = prices.usd_foil.as_deref().and_then(parse_decimal);
    if market.is_none() && foil.is_none() {
        return None;
    }
    Some(PricePoint {
        edition_id: edition_id.to_string(),
        date_recorded: today,
        market_price_usd: market,
        foil_price_usd: foil,
    })
}

/// Collapse repeated color codes, keeping first-seen order.
pub fn distinct_colors(colors: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(colors.len());
    for c in colors {
        let c = c.trim().to_string();
        if !c.is_empty() && !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

pub fn parse_decimal(raw: &str) -> Option<BigDecimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigDecimal::from_str(trimmed).ok()
}

pub fn decimal_from_f64(value: f64) -> Option<BigDecimal> {
    if !value.is_finite() {
        return None;
    }
    BigDecimal::from_str(&value.to_string()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 27).unwrap()
    }

    #[test]
    fn maps_single_faced_record() {
        let value = json!({
            "oracle_id": "O1",
            "id": "E1",
            "name": "Bolt",
            "set": "LEA",
            "set_name": "Limited Edition Alpha",
            "released_at": "1993-08-05",
            "rarity": "common",
            "mana_cost": "{R}",
            "cmc": 1.0,
            "oracle_text": "Deal 3 damage.",
            "color_identity": ["R"],
            "card_faces": null
        });
        let rec = map_value(value, today()).unwrap();

        assert_eq!(rec.set.set_code, "LEA");
        assert_eq!(rec.set.set_name, "Limited Edition Alpha");
        assert_eq!(rec.set.release_date, NaiveDate::from_ymd_opt(1993, 8, 5));
        assert_eq!(rec.card.card_id, "O1");
        assert_eq!(rec.card.oracle_id, "O1");
        assert_eq!(rec.edition.edition_id, "E1");
        assert_eq!(rec.edition.card_id, "O1");
        assert_eq!(rec.edition.set_code, "LEA");
        assert_eq!(rec.faces.len(), 1);
        assert_eq!(rec.faces[0].face_index, 0);
        assert_eq!(rec.faces[0].name, "Bolt");
        assert_eq!(rec.faces[0].mana_cost.as_deref(), Some("{R}"));
        assert_eq!(rec.faces[0].cmc, parse_decimal("1"));
        assert_eq!(rec.colors, vec!["R".to_string()]);
        assert!(rec.price.is_none());
    }

    #[test]
    fn maps_every_face_in_source_order() {
        let value = json!({
            "oracle_id": "O2",
            "id": "E2",
            "name": "Fire // Ice",
            "set": "APC",
            "layout": "split",
            "card_faces": [
                {"name": "Fire", "mana_cost": "{1}{R}", "cmc": 2},
                {"name": "Ice", "mana_cost": "{1}{U}", "power": null}
            ]
        });
        let rec = map_value(value, today()).unwrap();
        let names: Vec<(i32, &str)> = rec
            .faces
            .iter()
            .map(|f| (f.face_index, f.name.as_str()))
            .collect();
        assert_eq!(names, vec![(0, "Fire"), (1, "Ice")]);
        assert!(rec.faces.iter().all(|f| f.card_id == "O2"));
        assert_eq!(rec.card.layout.as_deref(), Some("split"));
    }

    #[test]
    fn joins_frame_effects_and_finishes() {
        let value = json!({
            "oracle_id": "O3", "id": "E3", "name": "Shiny", "set": "SLD",
            "frame": "2015",
            "frame_effects": ["legendary", "showcase"],
            "finishes": ["nonfoil", "foil"],
            "promo": true,
            "image_uris": {"normal": "https://img/n.jpg", "small": "https://img/s.jpg"}
        });
        let rec = map_value(value, today()).unwrap();
        assert_eq!(rec.edition.frame_effect.as_deref(), Some("legendary,showcase"));
        assert_eq!(rec.edition.finishes.as_deref(), Some("nonfoil,foil"));
        assert_eq!(rec.edition.frame_version.as_deref(), Some("2015"));
        assert!(rec.edition.is_promo);
        assert_eq!(rec.edition.image_url_small.as_deref(), Some("https://img/s.jpg"));
    }

    #[test]
    fn price_point_parses_strings_and_skips_empty_prices() {
        let value = json!({
            "oracle_id": "O4", "id": "E4", "name": "Priced", "set": "M21",
            "prices": {"usd": "0.25", "usd_foil": "not-a-number"}
        });
        let rec = map_value(value, today()).unwrap();
        let price = rec.price.unwrap();
        assert_eq!(price.edition_id, "E4");
        assert_eq!(price.date_recorded, today());
        assert_eq!(price.market_price_usd, parse_decimal("0.25"));
        assert!(price.foil_price_usd.is_none());

        let value = json!({
            "oracle_id": "O4", "id": "E4", "name": "Priced", "set": "M21",
            "prices": {"usd": null, "usd_foil": null}
        });
        assert!(map_value(value, today()).unwrap().price.is_none());
    }

    #[test]
    fn repeated_colors_collapse() {
        assert_eq!(
            distinct_colors(vec!["W".into(), "U".into(), "W".into(), " ".into()]),
            vec!["W".to_string(), "U".to_string()]
        );
    }

    #[test]
    fn missing_oracle_id_is_a_mapping_error() {
        let value = json!({"id": "E5", "name": "Reversible", "set": "SLD"});
        assert!(matches!(
            map_value(value, today()),
            Err(MapError::MissingField("oracle_id"))
        ));
    }

    #[test]
    fn wrong_field_type_is_a_decode_error() {
        let value = json!({"oracle_id": "O6", "id": "E6", "name": "Odd", "set": "X", "cmc": "three"});
        assert!(matches!(map_value(value, today()), Err(MapError::Decode(_))));
    }

    #[test]
    fn record_name_falls_back_for_unnamed_values() {
        assert_eq!(record_name(&json!({"name": "Bolt"})), "Bolt");
        assert_eq!(record_name(&json!({"name": 7})), "<unnamed>");
        assert_eq!(record_name(&json!(3)), "<unnamed>");
    }
}
