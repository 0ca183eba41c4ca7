use anyhow::Result;
use clap::Parser;
use mana_base::cli::seed::{self, SeedArgs};
use mana_base::logging::{init_tracing, DEFAULT_FILTER};
use mana_base::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "seed", version, about = "Seed the card catalogue from a JSON dump")]
struct Cli {
    #[command(flatten)]
    args: SeedArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    let cli = Cli::parse();
    env_util::bootstrap_cli("seed");
    seed::run(cli.args).await?;
    Ok(())
}
