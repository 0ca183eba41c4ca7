use crate::catalog::model::CardConflictPolicy;
use crate::import::pipeline::{ImportOptions, DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_IN_FLIGHT};
use crate::import::progress::{BACKFILL_PROGRESS_EVERY, SEED_PROGRESS_EVERY};
use crate::util::env as env_util;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const DEFAULT_IMPORT_PATH: &str = "imports/all-cards.json";
/// Seeder cap when nothing overrides it; `0` means no cap.
pub const DEFAULT_SEED_LIMIT: u64 = 3000;

/// Import settings resolved from the environment. CLI flags override these.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub path: PathBuf,
    pub limit: Option<u64>,
    pub max_in_flight: usize,
    pub channel_capacity: usize,
    pub conflict_policy: CardConflictPolicy,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_IMPORT_PATH),
            limit: normalize_limit(DEFAULT_SEED_LIMIT),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            conflict_policy: CardConflictPolicy::default(),
        }
    }
}

impl ImportConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let conflict_policy = match env_util::env_opt("CARD_CONFLICT_POLICY") {
            Some(raw) => raw.parse().context("CARD_CONFLICT_POLICY")?,
            None => defaults.conflict_policy,
        };
        Ok(Self {
            path: env_util::env_opt("CARD_IMPORT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            limit: normalize_limit(env_util::env_parse("SEED_LIMIT", DEFAULT_SEED_LIMIT)),
            max_in_flight: env_util::env_parse("IMPORT_MAX_IN_FLIGHT", DEFAULT_MAX_IN_FLIGHT).max(1),
            channel_capacity: env_util::env_parse("IMPORT_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY)
                .max(1),
            conflict_policy,
        })
    }

    pub fn seed_options(&self) -> ImportOptions {
        ImportOptions {
            limit: self.limit,
            max_in_flight: self.max_in_flight,
            channel_capacity: self.channel_capacity,
            progress_every: SEED_PROGRESS_EVERY,
            conflict_policy: self.conflict_policy,
            ..ImportOptions::default()
        }
    }

    /// The backfill always reads the whole file.
    pub fn backfill_options(&self) -> ImportOptions {
        ImportOptions {
            limit: None,
            progress_every: BACKFILL_PROGRESS_EVERY,
            ..self.seed_options()
        }
    }
}

/// `0` disables the cap.
pub fn normalize_limit(limit: u64) -> Option<u64> {
    (limit > 0).then_some(limit)
}
