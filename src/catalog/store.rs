//! Idempotent write contract for the catalogue, independent of the storage engine.
//!
//! Each write is keyed by the entity's natural identifier:
//!
//! | entity              | key                        | repeated write            |
//! |---------------------|----------------------------|---------------------------|
//! | `CardSet`           | `set_code`                 | latest fields win         |
//! | `Card`              | `card_id`                  | per [`CardConflictPolicy`]|
//! | `Edition`           | `edition_id`               | latest fields win         |
//! | `CardFace`          | `(card_id, face_index)`    | first write kept          |
//! | `CardColorIdentity` | `(card_id, color_id)`      | no-op                     |
//! | `PricePoint`        | `(edition_id, date)`       | latest fields win         |

use crate::catalog::mapper::CardRecord;
use crate::catalog::model::{
    Card, CardConflictPolicy, CardDetail, CardFace, CardSet, CardView, Edition, EditionView,
    PricePoint,
};
use crate::catalog::payload::CardUpdate;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Upper bound for `random_editions`.
pub const MAX_RANDOM_LIMIT: i64 = 100;
/// Fixed result cap for name search.
pub const SEARCH_LIMIT: i64 = 20;

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn upsert_set(&self, set: &CardSet) -> Result<()>;

    async fn upsert_card(&self, card: &Card, policy: CardConflictPolicy) -> Result<()>;

    /// The edition's card and set must already exist.
    async fn upsert_edition(&self, edition: &Edition) -> Result<()>;

    /// Find-or-create; returns true when a new face row was inserted.
    async fn ensure_face(&self, face: &CardFace) -> Result<bool>;

    /// Find-or-create; returns true when a new membership row was inserted.
    async fn ensure_color_identity(&self, card_id: &str, color_id: &str) -> Result<bool>;

    async fn record_price(&self, price: &PricePoint) -> Result<()>;

    async fn card_exists(&self, card_id: &str) -> Result<bool>;

    /// Apply an admin update all-or-nothing: on error nothing is left behind.
    async fn apply_card_update(&self, update: &CardUpdate) -> Result<()>;

    /// Editions whose card name contains `query` (case-insensitive), with card faces and set.
    async fn search_editions(&self, query: &str, limit: i64) -> Result<Vec<EditionView>>;

    /// Random editions with their card (no faces) and set.
    async fn random_editions(&self, limit: i64) -> Result<Vec<EditionView>>;

    async fn card_detail(&self, card_id: &str) -> Result<Option<CardDetail>>;

    /// Connectivity probe for health checks.
    async fn ping(&self) -> bool {
        true
    }
}

/// Counts of rows a single record actually inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordWrites {
    pub faces_created: u64,
    pub colors_created: u64,
    pub price_recorded: bool,
}

/// Write one mapped record in dependency order: set, card, edition, faces, colors, price.
pub async fn write_record<S>(
    store: &S,
    record: &CardRecord,
    policy: CardConflictPolicy,
) -> Result<RecordWrites>
where
    S: CatalogStore + ?Sized,
{
    store.upsert_set(&record.set).await?;
    store.upsert_card(&record.card, policy).await?;
    store.upsert_edition(&record.edition).await?;

    let mut writes = RecordWrites::default();
    for face in &record.faces {
        if store.ensure_face(face).await? {
            writes.faces_created += 1;
        }
    }
    for color in &record.colors {
        if store
            .ensure_color_identity(&record.card.card_id, color)
            .await?
        {
            writes.colors_created += 1;
        }
    }
    if let Some(price) = &record.price {
        store.record_price(price).await?;
        writes.price_recorded = true;
    }
    Ok(writes)
}

/// `%query%` with LIKE wildcards in the query escaped (backslash is Postgres' default escape).
pub fn like_pattern(query: &str) -> String {
    let mut out = String::with_capacity(query.len() + 2);
    out.push('%');
    for ch in query.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

/// Nest cards (optionally with faces) and sets under their editions, keeping edition order.
pub fn join_editions(
    editions: Vec<Edition>,
    cards: Vec<Card>,
    faces: Option<Vec<CardFace>>,
    sets: Vec<CardSet>,
) -> Vec<EditionView> {
    let mut faces_by_card: HashMap<String, Vec<CardFace>> = HashMap::new();
    let with_faces = faces.is_some();
    for face in faces.unwrap_or_default() {
        faces_by_card
            .entry(face.card_id.clone())
            .or_default()
            .push(face);
    }
    for list in faces_by_card.values_mut() {
        list.sort_by_key(|f| f.face_index);
    }
    let cards: HashMap<String, Card> = cards
        .into_iter()
        .map(|c| (c.card_id.clone(), c))
        .collect();
    let sets: HashMap<String, CardSet> = sets
        .into_iter()
        .map(|s| (s.set_code.clone(), s))
        .collect();

    editions
        .into_iter()
        .map(|edition| {
            let card = cards.get(&edition.card_id).cloned().map(|card| CardView {
                faces: with_faces
                    .then(|| faces_by_card.get(&card.card_id).cloned().unwrap_or_default()),
                card,
            });
            let set = sets.get(&edition.set_code).cloned();
            EditionView { edition, card, set }
        })
        .collect()
}

/// Clamp a caller-supplied random limit; non-positive values fall back to 5.
pub fn clamp_random_limit(limit: Option<i64>) -> i64 {
    match limit {
        Some(n) if n > 0 => n.min(MAX_RANDOM_LIMIT),
        _ => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("bolt"), "%bolt%");
        assert_eq!(like_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }

    #[test]
    fn random_limit_defaults_and_caps() {
        assert_eq!(clamp_random_limit(None), 5);
        assert_eq!(clamp_random_limit(Some(0)), 5);
        assert_eq!(clamp_random_limit(Some(-3)), 5);
        assert_eq!(clamp_random_limit(Some(12)), 12);
        assert_eq!(clamp_random_limit(Some(5000)), MAX_RANDOM_LIMIT);
    }
}
