// Color identity backfill: re-streams a dump and fills in (card, color) rows for
// cards that are already in the catalogue. Unknown cards are skipped.

use crate::catalog::mapper::distinct_colors;
use crate::catalog::store::CatalogStore;
use crate::import::inflight::InFlight;
use crate::import::pipeline::ImportOptions;
use crate::import::progress::{BackfillProgress, BackfillSummary, ColorOutcome};
use crate::import::reader::{open_source, spawn_array_reader};
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info, warn};

/// Only the fields the backfill reads; everything else is ignored.
#[derive(Debug, serde::Deserialize)]
struct ColorRecord {
    oracle_id: Option<String>,
    name: Option<String>,
    color_identity: Option<Value>,
}

async fn backfill_one<S>(store: Arc<S>, value: Value) -> ColorOutcome
where
    S: CatalogStore + ?Sized,
{
    let record: ColorRecord = match serde_json::from_value(value) {
        Ok(r) => r,
        Err(err) => {
            warn!(target: "backfill", error = %err, "skipping record that is not a card object");
            return ColorOutcome {
                failed: 1,
                ..ColorOutcome::default()
            };
        }
    };
    let (Some(oracle_id), Some(colors)) = (
        record.oracle_id,
        record.color_identity.as_ref().and_then(Value::as_array),
    ) else {
        return ColorOutcome::default();
    };
    let name = record.name.as_deref().unwrap_or("<unnamed>");

    match store.card_exists(&oracle_id).await {
        Ok(true) => {}
        Ok(false) => return ColorOutcome::default(),
        Err(err) => {
            error!(target: "backfill", card = %name, error = %format!("{err:#}"), "card lookup failed");
            return ColorOutcome {
                failed: 1,
                ..ColorOutcome::default()
            };
        }
    }

    let codes = distinct_colors(
        colors
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    );
    let mut outcome = ColorOutcome {
        matched: true,
        ..ColorOutcome::default()
    };
    for color in &codes {
        match store.ensure_color_identity(&oracle_id, color).await {
            Ok(_) => outcome.written += 1,
            Err(err) => {
                outcome.failed += 1;
                error!(
                    target: "backfill",
                    card = %name,
                    color = %color,
                    error = %format!("{err:#}"),
                    "error upserting color identity"
                );
            }
        }
    }
    outcome
}

fn settle(progress: &mut BackfillProgress, joined: Result<ColorOutcome, JoinError>) {
    match joined {
        Ok(outcome) => progress.record(outcome),
        Err(join_err) => {
            error!(target: "backfill", error = %join_err, "backfill task aborted");
            progress.record(ColorOutcome {
                failed: 1,
                ..ColorOutcome::default()
            });
        }
    }
}

pub async fn run_backfill<S, R>(
    store: Arc<S>,
    reader: R,
    opts: &ImportOptions,
) -> Result<BackfillSummary>
where
    S: CatalogStore + ?Sized + 'static,
    R: Read + Send + 'static,
{
    info!(target: "backfill", max_in_flight = opts.max_in_flight, "starting color identity backfill");

    let mut stream = spawn_array_reader(reader, opts.limit, opts.channel_capacity);
    let mut tasks: InFlight<ColorOutcome> = InFlight::new(opts.max_in_flight);
    let mut progress = BackfillProgress::new(opts.progress_every);
    while let Some(value) = stream.next().await {
        if let Some(done) = tasks.spawn(backfill_one(store.clone(), value)).await {
            settle(&mut progress, done);
        }
    }
    while let Some(done) = tasks.join_next().await {
        settle(&mut progress, done);
    }

    stream.finish().await.context("color identity backfill aborted")?;
    Ok(progress.finish())
}

pub async fn backfill_from_path<S>(
    store: Arc<S>,
    path: &Path,
    opts: &ImportOptions,
) -> Result<BackfillSummary>
where
    S: CatalogStore + ?Sized + 'static,
{
    let reader = open_source(path)?;
    run_backfill(store, reader, opts)
        .await
        .with_context(|| format!("backfill from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalog;
    use crate::catalog::model::{Card, CardConflictPolicy};
    use serde_json::json;
    use std::io::Cursor;

    async fn store_with(ids: &[&str]) -> Arc<MemoryCatalog> {
        let store = Arc::new(MemoryCatalog::new());
        for id in ids {
            store
                .upsert_card(
                    &Card {
                        card_id: id.to_string(),
                        oracle_id: id.to_string(),
                        name: format!("Card {id}"),
                        layout: None,
                        reserved_list: false,
                    },
                    CardConflictPolicy::LatestWins,
                )
                .await
                .unwrap();
        }
        store
    }

    fn source(records: Value) -> Cursor<Vec<u8>> {
        Cursor::new(serde_json::to_vec(&records).unwrap())
    }

    fn opts() -> ImportOptions {
        ImportOptions {
            progress_every: 1000,
            ..ImportOptions::default()
        }
    }

    #[tokio::test]
    async fn counts_matched_and_unmatched_cards() {
        let store = store_with(&["O1", "O2"]).await;
        let records = json!([
            {"oracle_id": "O1", "name": "Bolt", "color_identity": ["R"]},
            {"oracle_id": "O2", "name": "Guild", "color_identity": ["W", "U", "W"]},
            {"oracle_id": "O3", "name": "Absent", "color_identity": ["G"]},
            {"oracle_id": "O1", "name": "Bolt"},
            {"oracle_id": "O2", "name": "Odd", "color_identity": "WU"}
        ]);
        let summary = run_backfill(store.clone(), source(records), &opts())
            .await
            .unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.matched, 2);
        assert_eq!(summary.identities, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(store.counts().unwrap().colors, 3);
    }

    #[tokio::test]
    async fn rerun_does_not_duplicate_rows() {
        let store = store_with(&["O1"]).await;
        let records = json!([{"oracle_id": "O1", "name": "Bolt", "color_identity": ["R", "G"]}]);
        run_backfill(store.clone(), source(records.clone()), &opts())
            .await
            .unwrap();
        run_backfill(store.clone(), source(records), &opts())
            .await
            .unwrap();
        assert_eq!(store.counts().unwrap().colors, 2);
    }

    #[tokio::test]
    async fn bad_color_is_logged_and_the_rest_continue() {
        let store = store_with(&["O1"]).await;
        let records = json!([{"oracle_id": "O1", "name": "Bolt", "color_identity": ["RG", "R"]}]);
        let summary = run_backfill(store.clone(), source(records), &opts())
            .await
            .unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.identities, 1);
        assert_eq!(store.counts().unwrap().colors, 1);
    }

    #[tokio::test]
    async fn stream_errors_abort() {
        let store = store_with(&[]).await;
        let err = run_backfill(store, Cursor::new(b"{\"not\": \"array\"}".to_vec()), &opts())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("backfill aborted"));
    }
}
