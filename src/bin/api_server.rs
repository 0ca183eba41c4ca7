// HTTP API server binary: card lookup, search and admin upserts

use anyhow::Result;
use clap::Parser;
use mana_base::cli::serve::{self, ServeArgs};
use mana_base::logging::{init_tracing, DEFAULT_FILTER};
use mana_base::util::env as env_util;

#[derive(Parser, Debug)]
#[command(name = "api_server", version, about = "Card catalogue HTTP API")]
struct Cli {
    #[command(flatten)]
    args: ServeArgs,
}

#[actix_web::main]
async fn main() -> Result<()> {
    init_tracing(DEFAULT_FILTER)?;
    let cli = Cli::parse();
    env_util::bootstrap_cli("api_server");
    tracing::info!("initializing card API server");
    serve::run(cli.args).await
}
