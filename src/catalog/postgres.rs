// Postgres implementation of the catalogue store. All writes use ON CONFLICT on the
// entity's natural key, so the import can be replayed without duplicating rows.

use crate::catalog::model::{
    Card, CardColorIdentity, CardConflictPolicy, CardDetail, CardFace, CardSet, Edition,
    EditionView, PricePoint,
};
use crate::catalog::payload::{CardUpdate, EditionEdit};
use crate::catalog::store::{join_editions, like_pattern, CatalogStore};
use crate::util::db::Db;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgExecutor;
use std::collections::BTreeSet;
use tracing::instrument;

const CARD_COLUMNS: &str = "card_id, oracle_id, name, layout, reserved_list";
const SET_COLUMNS: &str = "set_code, set_name, release_date, set_type";
const EDITION_COLUMNS: &str = "e.edition_id, e.card_id, e.set_code, e.rarity, e.artist, \
     e.collector_number, e.image_url_normal, e.image_url_small, e.frame_version, \
     e.frame_effect, e.finishes, e.is_promo";
const FACE_COLUMNS: &str = "face_id, card_id, face_index, name, mana_cost, cmc, oracle_text, \
     flavor_text, power, toughness";

#[derive(Clone)]
pub struct PgCatalog {
    db: Db,
}

impl PgCatalog {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }
}

// ---------- statements shared by pool and transaction callers ----------

async fn exec_upsert_set<'e, E: PgExecutor<'e>>(ex: E, set: &CardSet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO "set" (set_code, set_name, release_date, set_type)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (set_code) DO UPDATE
           SET set_name = EXCLUDED.set_name,
               release_date = EXCLUDED.release_date,
               set_type = EXCLUDED.set_type
        "#,
    )
    .bind(&set.set_code)
    .bind(&set.set_name)
    .bind(set.release_date)
    .bind(&set.set_type)
    .execute(ex)
    .await
    .with_context(|| format!("upsert set {}", set.set_code))?;
    Ok(())
}

async fn exec_upsert_card<'e, E: PgExecutor<'e>>(
    ex: E,
    card: &Card,
    policy: CardConflictPolicy,
) -> Result<()> {
    let sql = match policy {
        CardConflictPolicy::LatestWins => {
            r#"
            INSERT INTO card (card_id, oracle_id, name, layout, reserved_list)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (card_id) DO UPDATE
               SET oracle_id = EXCLUDED.oracle_id,
                   name = EXCLUDED.name,
                   layout = EXCLUDED.layout,
                   reserved_list = EXCLUDED.reserved_list
            "#
        }
        CardConflictPolicy::KeepExisting => {
            r#"
            INSERT INTO card (card_id, oracle_id, name, layout, reserved_list)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (card_id) DO NOTHING
            "#
        }
    };
    sqlx::query(sql)
        .bind(&card.card_id)
        .bind(&card.oracle_id)
        .bind(&card.name)
        .bind(&card.layout)
        .bind(card.reserved_list)
        .execute(ex)
        .await
        .with_context(|| format!("upsert card {}", card.card_id))?;
    Ok(())
}

async fn exec_upsert_edition<'e, E: PgExecutor<'e>>(ex: E, edition: &Edition) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO edition (edition_id, card_id, set_code, rarity, artist, collector_number,
                             image_url_normal, image_url_small, frame_version, frame_effect,
                             finishes, is_promo)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (edition_id) DO UPDATE
           SET card_id = EXCLUDED.card_id,
               set_code = EXCLUDED.set_code,
               rarity = EXCLUDED.rarity,
               artist = EXCLUDED.artist,
               collector_number = EXCLUDED.collector_number,
               image_url_normal = EXCLUDED.image_url_normal,
               image_url_small = EXCLUDED.image_url_small,
               frame_version = EXCLUDED.frame_version,
               frame_effect = EXCLUDED.frame_effect,
               finishes = EXCLUDED.finishes,
               is_promo = EXCLUDED.is_promo
        "#,
    )
    .bind(&edition.edition_id)
    .bind(&edition.card_id)
    .bind(&edition.set_code)
    .bind(&edition.rarity)
    .bind(&edition.artist)
    .bind(&edition.collector_number)
    .bind(&edition.image_url_normal)
    .bind(&edition.image_url_small)
    .bind(&edition.frame_version)
    .bind(&edition.frame_effect)
    .bind(&edition.finishes)
    .bind(edition.is_promo)
    .execute(ex)
    .await
    .with_context(|| format!("upsert edition {}", edition.edition_id))?;
    Ok(())
}

/// Admin edit: the import-only columns keep their stored values on conflict.
async fn exec_upsert_edition_edit<'e, E: PgExecutor<'e>>(ex: E, edit: &EditionEdit) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO edition (edition_id, card_id, set_code, rarity, artist, collector_number,
                             image_url_normal, image_url_small)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (edition_id) DO UPDATE
           SET card_id = EXCLUDED.card_id,
               set_code = EXCLUDED.set_code,
               rarity = EXCLUDED.rarity,
               artist = EXCLUDED.artist,
               collector_number = EXCLUDED.collector_number,
               image_url_normal = EXCLUDED.image_url_normal,
               image_url_small = EXCLUDED.image_url_small
        "#,
    )
    .bind(&edit.edition_id)
    .bind(&edit.card_id)
    .bind(&edit.set_code)
    .bind(&edit.rarity)
    .bind(&edit.artist)
    .bind(&edit.collector_number)
    .bind(&edit.image_url_normal)
    .bind(&edit.image_url_small)
    .execute(ex)
    .await
    .with_context(|| format!("upsert edition {}", edit.edition_id))?;
    Ok(())
}

/// `on_conflict_skip` selects find-or-create (import) versus plain insert (after a delete).
async fn exec_insert_face<'e, E: PgExecutor<'e>>(
    ex: E,
    face: &CardFace,
    on_conflict_skip: bool,
) -> Result<bool> {
    let sql = if on_conflict_skip {
        r#"
        INSERT INTO card_face (card_id, face_index, name, mana_cost, cmc, oracle_text,
                               flavor_text, power, toughness)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (card_id, face_index) DO NOTHING
        "#
    } else {
        r#"
        INSERT INTO card_face (card_id, face_index, name, mana_cost, cmc, oracle_text,
                               flavor_text, power, toughness)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#
    };
    let res = sqlx::query(sql)
        .bind(&face.card_id)
        .bind(face.face_index)
        .bind(&face.name)
        .bind(&face.mana_cost)
        .bind(&face.cmc)
        .bind(&face.oracle_text)
        .bind(&face.flavor_text)
        .bind(&face.power)
        .bind(&face.toughness)
        .execute(ex)
        .await
        .with_context(|| format!("insert face {}#{}", face.card_id, face.face_index))?;
    Ok(res.rows_affected() == 1)
}

async fn exec_insert_color<'e, E: PgExecutor<'e>>(
    ex: E,
    card_id: &str,
    color_id: &str,
) -> Result<bool> {
    let res = sqlx::query(
        "INSERT INTO card_coloridentity (card_id, color_id) VALUES ($1, $2) \
         ON CONFLICT (card_id, color_id) DO NOTHING",
    )
    .bind(card_id)
    .bind(color_id)
    .execute(ex)
    .await
    .with_context(|| format!("insert color {color_id} for card {card_id}"))?;
    Ok(res.rows_affected() == 1)
}

#[async_trait]
impl CatalogStore for PgCatalog {
    async fn upsert_set(&self, set: &CardSet) -> Result<()> {
        exec_upsert_set(&self.db.pool, set).await
    }

    async fn upsert_card(&self, card: &Card, policy: CardConflictPolicy) -> Result<()> {
        exec_upsert_card(&self.db.pool, card, policy).await
    }

    async fn upsert_edition(&self, edition: &Edition) -> Result<()> {
        exec_upsert_edition(&self.db.pool, edition).await
    }

    async fn ensure_face(&self, face: &CardFace) -> Result<bool> {
        exec_insert_face(&self.db.pool, face, true).await
    }

    async fn ensure_color_identity(&self, card_id: &str, color_id: &str) -> Result<bool> {
        exec_insert_color(&self.db.pool, card_id, color_id).await
    }

    async fn record_price(&self, price: &PricePoint) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO price_point (edition_id, date_recorded, market_price_usd, foil_price_usd)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (edition_id, date_recorded) DO UPDATE
               SET market_price_usd = EXCLUDED.market_price_usd,
                   foil_price_usd = EXCLUDED.foil_price_usd
            "#,
        )
        .bind(&price.edition_id)
        .bind(price.date_recorded)
        .bind(&price.market_price_usd)
        .bind(&price.foil_price_usd)
        .execute(&self.db.pool)
        .await
        .with_context(|| format!("record price for edition {}", price.edition_id))?;
        Ok(())
    }

    async fn card_exists(&self, card_id: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM card WHERE card_id = $1)")
                .bind(card_id)
                .fetch_one(&self.db.pool)
                .await?;
        Ok(exists)
    }

    #[instrument(skip(self, update), fields(card_id = %update.card.card_id))]
    async fn apply_card_update(&self, update: &CardUpdate) -> Result<()> {
        // Dropping `tx` on any early return rolls the whole update back.
        let mut tx = self.db.pool.begin().await?;
        let card_id = update.card.card_id.as_str();

        if let Some(set) = &update.set {
            exec_upsert_set(&mut *tx, set).await?;
        }
        exec_upsert_card(&mut *tx, &update.card, CardConflictPolicy::LatestWins).await?;
        if let Some(edit) = &update.edition {
            exec_upsert_edition_edit(&mut *tx, edit).await?;
        }
        if let Some(faces) = &update.faces {
            sqlx::query("DELETE FROM card_face WHERE card_id = $1")
                .bind(card_id)
                .execute(&mut *tx)
                .await?;
            for face in faces {
                exec_insert_face(&mut *tx, face, false).await?;
            }
        }
        if let Some(colors) = &update.colors {
            sqlx::query("DELETE FROM card_coloridentity WHERE card_id = $1")
                .bind(card_id)
                .execute(&mut *tx)
                .await?;
            for color in colors {
                exec_insert_color(&mut *tx, card_id, color).await?;
            }
        }

        tx.commit().await.context("commit card update")?;
        Ok(())
    }

    async fn search_editions(&self, query: &str, limit: i64) -> Result<Vec<EditionView>> {
        let editions: Vec<Edition> = sqlx::query_as(&format!(
            "SELECT {EDITION_COLUMNS} FROM edition e \
               JOIN card c ON c.card_id = e.card_id \
              WHERE c.name ILIKE $1 \
              ORDER BY c.name, e.edition_id \
              LIMIT $2"
        ))
        .bind(like_pattern(query))
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        self.load_views(editions, true).await
    }

    async fn random_editions(&self, limit: i64) -> Result<Vec<EditionView>> {
        let editions: Vec<Edition> = sqlx::query_as(&format!(
            "SELECT {EDITION_COLUMNS} FROM edition e ORDER BY random() LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.db.pool)
        .await?;
        self.load_views(editions, false).await
    }

    async fn card_detail(&self, card_id: &str) -> Result<Option<CardDetail>> {
        let card: Option<Card> =
            sqlx::query_as(&format!("SELECT {CARD_COLUMNS} FROM card WHERE card_id = $1"))
                .bind(card_id)
                .fetch_optional(&self.db.pool)
                .await?;
        let Some(card) = card else {
            return Ok(None);
        };

        let faces: Vec<CardFace> = sqlx::query_as(&format!(
            "SELECT {FACE_COLUMNS} FROM card_face WHERE card_id = $1 ORDER BY face_index"
        ))
        .bind(card_id)
        .fetch_all(&self.db.pool)
        .await?;
        let color_identities: Vec<CardColorIdentity> = sqlx::query_as(
            "SELECT card_id, color_id FROM card_coloridentity WHERE card_id = $1 ORDER BY color_id",
        )
        .bind(card_id)
        .fetch_all(&self.db.pool)
        .await?;
        let editions: Vec<Edition> = sqlx::query_as(&format!(
            "SELECT {EDITION_COLUMNS} FROM edition e WHERE e.card_id = $1 ORDER BY e.edition_id"
        ))
        .bind(card_id)
        .fetch_all(&self.db.pool)
        .await?;
        let sets = self.sets_for(&editions).await?;
        let editions = join_editions(editions, Vec::new(), None, sets);

        Ok(Some(CardDetail {
            card,
            faces,
            color_identities,
            editions,
        }))
    }

    async fn ping(&self) -> bool {
        self.db.ping().await
    }
}

impl PgCatalog {
    async fn sets_for(&self, editions: &[Edition]) -> Result<Vec<CardSet>> {
        let codes: Vec<String> = editions
            .iter()
            .map(|e| e.set_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let sets = sqlx::query_as(&format!(
            r#"SELECT {SET_COLUMNS} FROM "set" WHERE set_code = ANY($1)"#
        ))
        .bind(&codes)
        .fetch_all(&self.db.pool)
        .await?;
        Ok(sets)
    }

    async fn load_views(
        &self,
        editions: Vec<Edition>,
        with_faces: bool,
    ) -> Result<Vec<EditionView>> {
        let card_ids: Vec<String> = editions
            .iter()
            .map(|e| e.card_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cards: Vec<Card> = sqlx::query_as(&format!(
            "SELECT {CARD_COLUMNS} FROM card WHERE card_id = ANY($1)"
        ))
        .bind(&card_ids)
        .fetch_all(&self.db.pool)
        .await?;
        let faces = if with_faces {
            let faces: Vec<CardFace> = sqlx::query_as(&format!(
                "SELECT {FACE_COLUMNS} FROM card_face WHERE card_id = ANY($1) \
                 ORDER BY card_id, face_index"
            ))
            .bind(&card_ids)
            .fetch_all(&self.db.pool)
            .await?;
            Some(faces)
        } else {
            None
        };
        let sets = self.sets_for(&editions).await?;
        Ok(join_editions(editions, cards, faces, sets))
    }
}
