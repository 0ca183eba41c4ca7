use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::catalog::PgCatalog;
use crate::import::backfill::backfill_from_path;
use crate::import::config::ImportConfig;
use crate::import::BackfillSummary;
use crate::util::db::Db;
use crate::util::env as env_util;

#[derive(Args, Debug, Clone, Default)]
pub struct BackfillArgs {
    /// Card dump to read (default: CARD_IMPORT_PATH or imports/all-cards.json)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Concurrent record lookups (default: IMPORT_MAX_IN_FLIGHT or 8)
    #[arg(long)]
    pub max_in_flight: Option<usize>,
}

pub async fn run(args: BackfillArgs) -> Result<BackfillSummary> {
    env_util::init_env();
    let mut cfg = ImportConfig::from_env()?;
    if let Some(path) = args.path {
        cfg.path = path;
    }
    if let Some(n) = args.max_in_flight {
        cfg.max_in_flight = n.max(1);
    }
    info!(path = %cfg.path.display(), "color identity backfill starting");

    let db = Db::connect_from_env().await?;
    let store = Arc::new(PgCatalog::new(db));
    backfill_from_path(store, &cfg.path, &cfg.backfill_options()).await
}
