//! Command implementations shared by `mana-base` and the standalone binaries.

pub mod backfill;
pub mod seed;
pub mod serve;
