use anyhow::Result;
use clap::Parser;
use mana_base::cli::backfill::{self, BackfillArgs};
use mana_base::logging::{init_tracing, DEFAULT_FILTER};
use mana_base::util::env as env_util;

#[derive(Parser, Debug)]
#[command(
    name = "backfill_color_identity",
    version,
    about = "Add missing color identities for cards already imported"
)]
struct Cli {
    #[command(flatten)]
    args: BackfillArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    let cli = Cli::parse();
    env_util::bootstrap_cli("backfill_color_identity");
    backfill::run(cli.args).await?;
    Ok(())
}
