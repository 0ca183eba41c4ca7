//! Seeder: streams a card dump into a [`CatalogStore`].
//!
//! One task per record runs that record's writes in FK order; at most
//! `max_in_flight` tasks run at once. The run returns only after every task
//! has resolved, so the summary counts are final.

use crate::catalog::mapper::{map_value, record_name};
use crate::catalog::model::CardConflictPolicy;
use crate::catalog::store::{write_record, CatalogStore, RecordWrites};
use crate::import::inflight::InFlight;
use crate::import::progress::{ImportSummary, SeedProgress, SEED_PROGRESS_EVERY};
use crate::import::reader::{open_source, spawn_array_reader};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{error, info};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// `None` reads the whole array.
    pub limit: Option<u64>,
    pub max_in_flight: usize,
    pub channel_capacity: usize,
    pub progress_every: u64,
    pub conflict_policy: CardConflictPolicy,
    /// Date stamped on price observations.
    pub today: NaiveDate,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            limit: None,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            progress_every: SEED_PROGRESS_EVERY,
            conflict_policy: CardConflictPolicy::default(),
            today: chrono::Utc::now().date_naive(),
        }
    }
}

type RecordResult = (String, Result<RecordWrites>);

async fn import_one<S>(
    store: Arc<S>,
    value: Value,
    today: NaiveDate,
    policy: CardConflictPolicy,
) -> RecordResult
where
    S: CatalogStore + ?Sized,
{
    let name = record_name(&value).to_string();
    let result = match map_value(value, today) {
        Ok(record) => write_record(store.as_ref(), &record, policy).await,
        Err(err) => Err(err.into()),
    };
    (name, result)
}

fn settle(progress: &mut SeedProgress, joined: Result<RecordResult, JoinError>) {
    match joined {
        Ok((_, Ok(writes))) => progress.imported(writes),
        Ok((name, Err(err))) => progress.failed(&name, &err),
        Err(join_err) => {
            let err = anyhow::anyhow!("record task aborted: {join_err}");
            progress.failed("<unknown>", &err);
        }
    }
}

pub async fn run_seed<S, R>(store: Arc<S>, reader: R, opts: &ImportOptions) -> Result<ImportSummary>
where
    S: CatalogStore + ?Sized + 'static,
    R: Read + Send + 'static,
{
    info!(
        target: "import",
        limit = ?opts.limit,
        max_in_flight = opts.max_in_flight,
        conflict_policy = %opts.conflict_policy,
        "seeding card catalogue"
    );

    let mut stream = spawn_array_reader(reader, opts.limit, opts.channel_capacity);
    let mut tasks: InFlight<RecordResult> = InFlight::new(opts.max_in_flight);
    let mut progress = SeedProgress::new(opts.progress_every);

    while let Some(value) = stream.next().await {
        let task = import_one(store.clone(), value, opts.today, opts.conflict_policy);
        if let Some(done) = tasks.spawn(task).await {
            settle(&mut progress, done);
        }
    }
    while let Some(done) = tasks.join_next().await {
        settle(&mut progress, done);
    }

    match stream.finish().await {
        Ok(outcome) => {
            let stopped_at_limit =
                outcome.stopped_early && opts.limit.is_some_and(|l| outcome.delivered >= l);
            Ok(progress.finish(outcome.delivered, stopped_at_limit))
        }
        Err(err) => {
            let partial = progress.summary();
            error!(
                target: "import",
                imported = partial.imported,
                failed = partial.failed,
                error = %format!("{err:#}"),
                "card stream failed; rows written so far are kept"
            );
            Err(err.context("seeding aborted"))
        }
    }
}

/// Open `path` and seed from it.
pub async fn seed_from_path<S>(store: Arc<S>, path: &Path, opts: &ImportOptions) -> Result<ImportSummary>
where
    S: CatalogStore + ?Sized + 'static,
{
    let reader = open_source(path)?;
    run_seed(store, reader, opts)
        .await
        .with_context(|| format!("seed from {}", path.display()))
}
