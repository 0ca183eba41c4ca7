// In-process catalogue used by `--dry-run` imports and the test suite. It enforces
// the same keys and foreign-key order as the relational schema.

use crate::catalog::model::{
    Card, CardColorIdentity, CardConflictPolicy, CardDetail, CardFace, CardSet, Edition,
    EditionView, PricePoint,
};
use crate::catalog::payload::CardUpdate;
use crate::catalog::store::{join_editions, CatalogStore};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    pub sets: BTreeMap<String, CardSet>,
    pub cards: BTreeMap<String, Card>,
    pub editions: BTreeMap<String, Edition>,
    pub faces: BTreeMap<(String, i32), CardFace>,
    pub colors: BTreeSet<(String, String)>,
    pub prices: BTreeMap<(String, NaiveDate), PricePoint>,
    next_face_id: i32,
}

/// Row counts per table, for quick assertions and dry-run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub sets: usize,
    pub cards: usize,
    pub editions: usize,
    pub faces: usize,
    pub colors: usize,
    pub prices: usize,
}

impl CatalogState {
    fn check_edition_refs(&self, edition: &Edition) -> Result<()> {
        if !self.cards.contains_key(&edition.card_id) {
            bail!(
                "edition {} references missing card {}",
                edition.edition_id,
                edition.card_id
            );
        }
        if !self.sets.contains_key(&edition.set_code) {
            bail!(
                "edition {} references missing set {}",
                edition.edition_id,
                edition.set_code
            );
        }
        Ok(())
    }

    fn insert_face(&mut self, face: &CardFace) -> Result<bool> {
        if !self.cards.contains_key(&face.card_id) {
            bail!("face references missing card {}", face.card_id);
        }
        let key = (face.card_id.clone(), face.face_index);
        if self.faces.contains_key(&key) {
            return Ok(false);
        }
        self.next_face_id += 1;
        let mut stored = face.clone();
        stored.face_id = Some(self.next_face_id);
        self.faces.insert(key, stored);
        Ok(true)
    }

    fn insert_color(&mut self, card_id: &str, color_id: &str) -> Result<bool> {
        if !self.cards.contains_key(card_id) {
            bail!("color identity references missing card {card_id}");
        }
        if color_id.chars().count() != 1 {
            bail!("color id {color_id:?} must be a single character");
        }
        Ok(self
            .colors
            .insert((card_id.to_string(), color_id.to_string())))
    }

    fn faces_of(&self, card_id: &str) -> Vec<CardFace> {
        // BTreeMap order is (card_id, face_index), so this is already index-ordered.
        self.faces
            .iter()
            .filter(|((cid, _), _)| cid == card_id)
            .map(|(_, f)| f.clone())
            .collect()
    }

    fn views(&self, editions: Vec<Edition>, with_faces: bool) -> Vec<EditionView> {
        let card_ids: BTreeSet<&str> = editions.iter().map(|e| e.card_id.as_str()).collect();
        let cards = card_ids
            .iter()
            .filter_map(|id| self.cards.get(*id).cloned())
            .collect();
        let faces = with_faces.then(|| {
            card_ids
                .iter()
                .flat_map(|id| self.faces_of(id))
                .collect::<Vec<_>>()
        });
        let sets = editions
            .iter()
            .filter_map(|e| self.sets.get(&e.set_code).cloned())
            .collect();
        join_editions(editions, cards, faces, sets)
    }

    fn apply_update(&mut self, update: &CardUpdate) -> Result<()> {
        let card_id = update.card.card_id.clone();
        if let Some(set) = &update.set {
            self.sets.insert(set.set_code.clone(), set.clone());
        }
        self.cards.insert(card_id.clone(), update.card.clone());
        if let Some(edit) = &update.edition {
            let edition = match self.editions.get(&edit.edition_id) {
                Some(existing) => {
                    let mut merged = existing.clone();
                    edit.merge_into(&mut merged);
                    merged
                }
                None => edit.to_new_edition(),
            };
            self.check_edition_refs(&edition)?;
            self.editions.insert(edition.edition_id.clone(), edition);
        }
        if let Some(faces) = &update.faces {
            self.faces.retain(|(cid, _), _| *cid != card_id);
            for face in faces {
                if !self.insert_face(face)? {
                    bail!("duplicate face index {} for card {card_id}", face.face_index);
                }
            }
        }
        if let Some(colors) = &update.colors {
            self.colors.retain(|(cid, _)| *cid != card_id);
            for color in colors {
                self.insert_color(&card_id, color)?;
            }
        }
        Ok(())
    }

    pub fn counts(&self) -> TableCounts {
        TableCounts {
            sets: self.sets.len(),
            cards: self.cards.len(),
            editions: self.editions.len(),
            faces: self.faces.len(),
            colors: self.colors.len(),
            prices: self.prices.len(),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("memory catalog lock poisoned"))
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> Result<CatalogState> {
        Ok(self.lock()?.clone())
    }

    pub fn counts(&self) -> Result<TableCounts> {
        Ok(self.lock()?.counts())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn upsert_set(&self, set: &CardSet) -> Result<()> {
        self.lock()?.sets.insert(set.set_code.clone(), set.clone());
        Ok(())
    }

    async fn upsert_card(&self, card: &Card, policy: CardConflictPolicy) -> Result<()> {
        let mut state = self.lock()?;
        match policy {
            CardConflictPolicy::LatestWins => {
                state.cards.insert(card.card_id.clone(), card.clone());
            }
            CardConflictPolicy::KeepExisting => {
                state
                    .cards
                    .entry(card.card_id.clone())
                    .or_insert_with(|| card.clone());
            }
        }
        Ok(())
    }

    async fn upsert_edition(&self, edition: &Edition) -> Result<()> {
        let mut state = self.lock()?;
        state.check_edition_refs(edition)?;
        state
            .editions
            .insert(edition.edition_id.clone(), edition.clone());
        Ok(())
    }

    async fn ensure_face(&self, face: &CardFace) -> Result<bool> {
        self.lock()?.insert_face(face)
    }

    async fn ensure_color_identity(&self, card_id: &str, color_id: &str) -> Result<bool> {
        self.lock()?.insert_color(card_id, color_id)
    }

    async fn record_price(&self, price: &PricePoint) -> Result<()> {
        let mut state = self.lock()?;
        if !state.editions.contains_key(&price.edition_id) {
            bail!("price references missing edition {}", price.edition_id);
        }
        state.prices.insert(
            (price.edition_id.clone(), price.date_recorded),
            price.clone(),
        );
        Ok(())
    }

    async fn card_exists(&self, card_id: &str) -> Result<bool> {
        Ok(self.lock()?.cards.contains_key(card_id))
    }

    async fn apply_card_update(&self, update: &CardUpdate) -> Result<()> {
        let mut state = self.lock()?;
        // Work on a copy and swap it in only when every step succeeded.
        let mut staged = state.clone();
        staged.apply_update(update)?;
        *state = staged;
        Ok(())
    }

    async fn search_editions(&self, query: &str, limit: i64) -> Result<Vec<EditionView>> {
        let state = self.lock()?;
        let needle = query.to_lowercase();
        let mut hits: Vec<(&str, Edition)> = state
            .editions
            .values()
            .filter_map(|e| {
                let card = state.cards.get(&e.card_id)?;
                card.name
                    .to_lowercase()
                    .contains(&needle)
                    .then(|| (card.name.as_str(), e.clone()))
            })
            .collect();
        hits.sort_by(|a, b| a.0.cmp(b.0).then(a.1.edition_id.cmp(&b.1.edition_id)));
        let editions = hits
            .into_iter()
            .take(limit.max(0) as usize)
            .map(|(_, e)| e)
            .collect();
        Ok(state.views(editions, true))
    }

    async fn random_editions(&self, limit: i64) -> Result<Vec<EditionView>> {
        let state = self.lock()?;
        // Deterministic stand-in for ORDER BY random(): key order.
        let editions = state
            .editions
            .values()
            .take(limit.max(0) as usize)
            .cloned()
            .collect();
        Ok(state.views(editions, false))
    }

    async fn card_detail(&self, card_id: &str) -> Result<Option<CardDetail>> {
        let state = self.lock()?;
        let Some(card) = state.cards.get(card_id).cloned() else {
            return Ok(None);
        };
        let faces = state.faces_of(card_id);
        let color_identities = state
            .colors
            .iter()
            .filter(|(cid, _)| cid == card_id)
            .map(|(cid, color)| CardColorIdentity {
                card_id: cid.clone(),
                color_id: color.clone(),
            })
            .collect();
        let editions: Vec<Edition> = state
            .editions
            .values()
            .filter(|e| e.card_id == card_id)
            .cloned()
            .collect();
        let sets = editions
            .iter()
            .filter_map(|e| state.sets.get(&e.set_code).cloned())
            .collect();
        Ok(Some(CardDetail {
            card,
            faces,
            color_identities,
            editions: join_editions(editions, Vec::new(), None, sets),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::payload::CardPayload;
    use serde_json::json;

    fn card(id: &str, name: &str) -> Card {
        Card {
            card_id: id.into(),
            oracle_id: id.into(),
            name: name.into(),
            layout: Some("normal".into()),
            reserved_list: false,
        }
    }

    fn update(value: serde_json::Value) -> CardUpdate {
        serde_json::from_value::<CardPayload>(value)
            .unwrap()
            .into_update(None)
            .unwrap()
    }

    #[tokio::test]
    async fn keep_existing_policy_preserves_first_card() {
        let store = MemoryCatalog::new();
        store
            .upsert_card(&card("O1", "Bolt"), CardConflictPolicy::KeepExisting)
            .await
            .unwrap();
        store
            .upsert_card(&card("O1", "Renamed"), CardConflictPolicy::KeepExisting)
            .await
            .unwrap();
        assert_eq!(store.snapshot().unwrap().cards["O1"].name, "Bolt");

        store
            .upsert_card(&card("O1", "Renamed"), CardConflictPolicy::LatestWins)
            .await
            .unwrap();
        assert_eq!(store.snapshot().unwrap().cards["O1"].name, "Renamed");
    }

    #[tokio::test]
    async fn edition_requires_card_and_set() {
        let store = MemoryCatalog::new();
        let edition = Edition {
            edition_id: "E1".into(),
            card_id: "O1".into(),
            set_code: "LEA".into(),
            rarity: None,
            artist: None,
            collector_number: None,
            image_url_normal: None,
            image_url_small: None,
            frame_version: None,
            frame_effect: None,
            finishes: None,
            is_promo: false,
        };
        assert!(store.upsert_edition(&edition).await.is_err());
        store
            .upsert_card(&card("O1", "Bolt"), CardConflictPolicy::LatestWins)
            .await
            .unwrap();
        assert!(store.upsert_edition(&edition).await.is_err());
    }

    #[tokio::test]
    async fn admin_update_replaces_faces_and_colors() {
        let store = MemoryCatalog::new();
        store
            .apply_card_update(&update(json!({
                "card_id": "C1", "name": "Twin",
                "faces": [{"name": "Only"}],
                "color_identity": ["G"]
            })))
            .await
            .unwrap();
        assert_eq!(store.counts().unwrap().faces, 1);

        store
            .apply_card_update(&update(json!({
                "card_id": "C1", "name": "Twin",
                "faces": [{"name": "Front"}, {"name": "Back"}],
                "color_identity": ["U", "B"]
            })))
            .await
            .unwrap();

        let detail = store.card_detail("C1").await.unwrap().unwrap();
        let names: Vec<&str> = detail.faces.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Front", "Back"]);
        let colors: Vec<&str> = detail
            .color_identities
            .iter()
            .map(|c| c.color_id.as_str())
            .collect();
        assert_eq!(colors, vec!["B", "U"]);
    }

    #[tokio::test]
    async fn admin_edition_edit_keeps_import_metadata() {
        let store = MemoryCatalog::new();
        store
            .upsert_set(&CardSet {
                set_code: "LEA".into(),
                set_name: "Alpha".into(),
                release_date: None,
                set_type: None,
            })
            .await
            .unwrap();
        store
            .upsert_card(&card("O1", "Bolt"), CardConflictPolicy::LatestWins)
            .await
            .unwrap();
        store
            .upsert_edition(&Edition {
                edition_id: "E1".into(),
                card_id: "O1".into(),
                set_code: "LEA".into(),
                rarity: Some("common".into()),
                artist: Some("Christopher Rush".into()),
                collector_number: Some("161".into()),
                image_url_normal: None,
                image_url_small: None,
                frame_version: Some("2015".into()),
                frame_effect: Some("showcase".into()),
                finishes: Some("foil".into()),
                is_promo: true,
            })
            .await
            .unwrap();

        store
            .apply_card_update(&update(json!({
                "card_id": "O1", "name": "Bolt", "edition_id": "E1",
                "set_code": "LEA", "set_name": "Alpha", "rarity": "uncommon"
            })))
            .await
            .unwrap();

        let edition = &store.snapshot().unwrap().editions["E1"];
        assert_eq!(edition.rarity.as_deref(), Some("uncommon"));
        assert_eq!(edition.collector_number.as_deref(), Some("0"));
        assert_eq!(edition.frame_version.as_deref(), Some("2015"));
        assert_eq!(edition.frame_effect.as_deref(), Some("showcase"));
        assert_eq!(edition.finishes.as_deref(), Some("foil"));
        assert!(edition.is_promo);
    }

    #[tokio::test]
    async fn failed_admin_update_leaves_nothing_behind() {
        let store = MemoryCatalog::new();
        store
            .apply_card_update(&update(json!({
                "card_id": "C1", "name": "Before", "faces": [{"name": "Old"}]
            })))
            .await
            .unwrap();

        // A two-letter color id violates CHAR(1) and must roll back the rename and faces.
        let err = store
            .apply_card_update(&update(json!({
                "card_id": "C1", "name": "After",
                "set_code": "NEW", "edition_id": "E9",
                "faces": [{"name": "New"}],
                "color_identity": ["RG"]
            })))
            .await;
        assert!(err.is_err());

        let state = store.snapshot().unwrap();
        assert_eq!(state.cards["C1"].name, "Before");
        assert!(state.sets.is_empty());
        assert!(state.editions.is_empty());
        assert_eq!(state.faces.len(), 1);
        assert_eq!(state.faces[&("C1".to_string(), 0)].name, "Old");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_capped() {
        let store = MemoryCatalog::new();
        store
            .upsert_set(&CardSet {
                set_code: "LEA".into(),
                set_name: "Alpha".into(),
                release_date: None,
                set_type: None,
            })
            .await
            .unwrap();
        for i in 0..25 {
            let id = format!("O{i:02}");
            store
                .apply_card_update(&update(json!({
                    "card_id": id, "name": format!("Lightning Bolt {i:02}"),
                    "set_code": "LEA", "set_name": "Alpha",
                    "edition_id": format!("E{i:02}"),
                    "faces": [{"name": "Bolt"}]
                })))
                .await
                .unwrap();
        }

        let hits = store.search_editions("lightning", 20).await.unwrap();
        assert_eq!(hits.len(), 20);
        let first = &hits[0];
        assert_eq!(first.edition.edition_id, "E00");
        assert_eq!(first.set.as_ref().unwrap().set_name, "Alpha");
        assert_eq!(first.card.as_ref().unwrap().faces.as_ref().unwrap().len(), 1);

        assert!(store.search_editions("goblin", 20).await.unwrap().is_empty());

        let random = store.random_editions(3).await.unwrap();
        assert_eq!(random.len(), 3);
        assert!(random[0].card.as_ref().unwrap().faces.is_none());
    }
}
