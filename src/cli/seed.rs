use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::catalog::model::CardConflictPolicy;
use crate::catalog::{MemoryCatalog, PgCatalog};
use crate::import::config::{normalize_limit, ImportConfig};
use crate::import::pipeline::seed_from_path;
use crate::import::ImportSummary;
use crate::util::db::Db;
use crate::util::env as env_util;

/// Flags shared by the `seed` binary and `mana-base seed`. Each one overrides its env value.
#[derive(Args, Debug, Clone, Default)]
pub struct SeedArgs {
    /// Card dump to read (default: CARD_IMPORT_PATH or imports/all-cards.json)
    #[arg(long)]
    pub path: Option<PathBuf>,
    /// Stop after this many records; 0 means no cap (default: SEED_LIMIT or 3000)
    #[arg(long)]
    pub limit: Option<u64>,
    /// Import the whole file regardless of SEED_LIMIT
    #[arg(long, default_value_t = false, conflicts_with = "limit")]
    pub all: bool,
    /// Concurrent record writes (default: IMPORT_MAX_IN_FLIGHT or 8)
    #[arg(long)]
    pub max_in_flight: Option<usize>,
    /// What to do when an oracle id already exists: latest-wins | keep-existing
    #[arg(long)]
    pub conflict_policy: Option<CardConflictPolicy>,
    /// Import into an in-memory catalogue and report row counts; no database needed
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
    /// Apply the card schema before importing
    #[arg(long, default_value_t = false)]
    pub migrate: bool,
}

impl SeedArgs {
    pub fn apply(&self, mut cfg: ImportConfig) -> ImportConfig {
        if let Some(path) = &self.path {
            cfg.path = path.clone();
        }
        if self.all {
            cfg.limit = None;
        } else if let Some(limit) = self.limit {
            cfg.limit = normalize_limit(limit);
        }
        if let Some(n) = self.max_in_flight {
            cfg.max_in_flight = n.max(1);
        }
        if let Some(policy) = self.conflict_policy {
            cfg.conflict_policy = policy;
        }
        cfg
    }
}

pub async fn run(args: SeedArgs) -> Result<ImportSummary> {
    env_util::init_env();
    let cfg = args.apply(ImportConfig::from_env()?);
    let opts = cfg.seed_options();
    info!(
        path = %cfg.path.display(),
        limit = ?cfg.limit,
        dry_run = args.dry_run,
        "card seed starting"
    );

    if args.dry_run {
        let store = Arc::new(MemoryCatalog::new());
        let summary = seed_from_path(store.clone(), &cfg.path, &opts).await?;
        info!(counts = ?store.counts()?, "dry run finished; nothing was written to the database");
        return Ok(summary);
    }

    env_util::preflight_check(
        "seed",
        &[],
        &["DATABASE_URL", "DB_HOST", "DB_NAME", "SEED_LIMIT", "CARD_CONFLICT_POLICY"],
    )?;
    let db = Db::connect_from_env().await?;
    db.maybe_migrate(args.migrate).await?;
    let store = Arc::new(PgCatalog::new(db));
    seed_from_path(store, &cfg.path, &opts).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_env_config() {
        let args = SeedArgs {
            path: Some("other.json".into()),
            limit: Some(0),
            max_in_flight: Some(0),
            conflict_policy: Some(CardConflictPolicy::KeepExisting),
            ..SeedArgs::default()
        };
        let cfg = args.apply(ImportConfig::default());
        assert_eq!(cfg.path, PathBuf::from("other.json"));
        assert_eq!(cfg.limit, None);
        assert_eq!(cfg.max_in_flight, 1);
        assert_eq!(cfg.conflict_policy, CardConflictPolicy::KeepExisting);
    }

    #[test]
    fn all_flag_lifts_the_cap() {
        let args = SeedArgs {
            all: true,
            ..SeedArgs::default()
        };
        assert_eq!(args.apply(ImportConfig::default()).limit, None);
        assert_eq!(SeedArgs::default().apply(ImportConfig::default()).limit, Some(3000));
    }

    #[tokio::test]
    async fn dry_run_seeds_into_memory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"[{"id":"E1","oracle_id":"O1","name":"Bolt","set":"LEA"}]"#,
        )
        .unwrap();
        let summary = run(SeedArgs {
            path: Some(file.path().to_path_buf()),
            dry_run: true,
            ..SeedArgs::default()
        })
        .await
        .unwrap();
        assert_eq!(summary.imported, 1);
    }
}
