// Progress/completion accounting for the import binaries. Counters are owned by the
// run and handed back in the summary once every write has resolved.

use crate::catalog::store::RecordWrites;
use std::time::{Duration, Instant};
use tracing::{error, info};

/// Seeder logs a progress line every this many completed records.
pub const SEED_PROGRESS_EVERY: u64 = 100;
/// Backfill logs a progress line every this many completed records.
pub const BACKFILL_PROGRESS_EVERY: u64 = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Records handed over by the parser.
    pub read: u64,
    /// Records whose writes all succeeded.
    pub imported: u64,
    /// Records skipped due to a mapping or write error.
    pub failed: u64,
    pub faces_created: u64,
    pub colors_created: u64,
    pub prices_recorded: u64,
    /// True when the record limit cut the stream short.
    pub stopped_at_limit: bool,
    pub elapsed: Duration,
}

impl ImportSummary {
    pub fn completed(&self) -> u64 {
        self.imported + self.failed
    }
}

pub struct SeedProgress {
    every: u64,
    started: Instant,
    summary: ImportSummary,
}

impl SeedProgress {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            started: Instant::now(),
            summary: ImportSummary::default(),
        }
    }

    pub fn imported(&mut self, writes: RecordWrites) {
        self.summary.imported += 1;
        self.summary.faces_created += writes.faces_created;
        self.summary.colors_created += writes.colors_created;
        if writes.price_recorded {
            self.summary.prices_recorded += 1;
        }
        self.tick();
    }

    pub fn failed(&mut self, name: &str, err: &anyhow::Error) {
        self.summary.failed += 1;
        error!(target: "import", card = %name, error = %format!("{err:#}"), "error importing card");
        self.tick();
    }

    pub fn summary(&self) -> &ImportSummary {
        &self.summary
    }

    fn tick(&mut self) {
        let done = self.summary.completed();
        if done % self.every == 0 {
            info!(
                target: "import",
                processed = done,
                imported = self.summary.imported,
                failed = self.summary.failed,
                "imported {done} cards..."
            );
        }
    }

    pub fn finish(mut self, read: u64, stopped_at_limit: bool) -> ImportSummary {
        self.summary.read = read;
        self.summary.stopped_at_limit = stopped_at_limit;
        self.summary.elapsed = self.started.elapsed();
        info!(
            target: "import",
            read = self.summary.read,
            imported = self.summary.imported,
            failed = self.summary.failed,
            faces_created = self.summary.faces_created,
            colors_created = self.summary.colors_created,
            prices_recorded = self.summary.prices_recorded,
            stopped_at_limit,
            elapsed_ms = self.summary.elapsed.as_millis() as u64,
            "seeding complete"
        );
        self.summary
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillSummary {
    pub processed: u64,
    /// Records whose card already exists in the catalogue.
    pub matched: u64,
    /// Color identity rows written (inserted or already present).
    pub identities: u64,
    pub failed: u64,
    pub elapsed: Duration,
}

/// Result of backfilling one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColorOutcome {
    pub matched: bool,
    pub written: u64,
    pub failed: u64,
}

pub struct BackfillProgress {
    every: u64,
    started: Instant,
    summary: BackfillSummary,
}

impl BackfillProgress {
    pub fn new(every: u64) -> Self {
        Self {
            every: every.max(1),
            started: Instant::now(),
            summary: BackfillSummary::default(),
        }
    }

    pub fn record(&mut self, outcome: ColorOutcome) {
        self.summary.processed += 1;
        if outcome.matched {
            self.summary.matched += 1;
        }
        self.summary.identities += outcome.written;
        self.summary.failed += outcome.failed;
        if self.summary.processed % self.every == 0 {
            info!(
                target: "backfill",
                processed = self.summary.processed,
                matched = self.summary.matched,
                identities = self.summary.identities,
                "processed {} cards from JSON... matched {} cards, added {} identity records...",
                self.summary.processed,
                self.summary.matched,
                self.summary.identities
            );
        }
    }

    pub fn finish(mut self) -> BackfillSummary {
        self.summary.elapsed = self.started.elapsed();
        info!(
            target: "backfill",
            processed = self.summary.processed,
            matched = self.summary.matched,
            identities = self.summary.identities,
            failed = self.summary.failed,
            elapsed_ms = self.summary.elapsed.as_millis() as u64,
            "color identity backfill complete"
        );
        self.summary
    }
}
