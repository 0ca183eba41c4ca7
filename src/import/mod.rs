//! Streaming import of card dumps: the seeder and the color identity backfill.

pub mod backfill;
pub mod config;
pub mod inflight;
pub mod pipeline;
pub mod progress;
pub mod reader;

pub use backfill::{backfill_from_path, run_backfill};
pub use config::ImportConfig;
pub use pipeline::{run_seed, seed_from_path, ImportOptions};
pub use progress::{BackfillSummary, ImportSummary};
