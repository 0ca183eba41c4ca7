use anyhow::Result;
use clap::{Parser, Subcommand};
use mana_base::cli::{backfill, seed, serve};
use mana_base::logging::{init_tracing, DEFAULT_FILTER};
use mana_base::util::env as env_util;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "mana-base", version, about = "Card catalogue importer and API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
#[command(rename_all = "kebab-case")]
enum Commands {
    /// Stream a card dump into the catalogue
    Seed(seed::SeedArgs),
    /// Fill in color identities for cards already in the catalogue
    Backfill(backfill::BackfillArgs),
    /// Run the HTTP API
    Serve(serve::ServeArgs),
}

#[actix_web::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    let cli = Cli::parse();
    env_util::bootstrap_cli("mana-base");

    match cli.command {
        Commands::Seed(args) => {
            let summary = seed::run(args).await?;
            info!(imported = summary.imported, failed = summary.failed, "done");
        }
        Commands::Backfill(args) => {
            let summary = backfill::run(args).await?;
            info!(matched = summary.matched, identities = summary.identities, "done");
        }
        Commands::Serve(args) => serve::run(args).await?,
    }
    Ok(())
}
