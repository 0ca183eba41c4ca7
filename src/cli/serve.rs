use anyhow::Result;
use clap::Args;
use std::sync::Arc;

use crate::api::ApiServer;
use crate::catalog::PgCatalog;
use crate::util::db::Db;
use crate::util::env as env_util;

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Override PORT
    #[arg(long)]
    pub port: Option<u16>,
    /// Apply the card schema before serving
    #[arg(long, default_value_t = false)]
    pub migrate: bool,
}

pub async fn run(args: ServeArgs) -> Result<()> {
    env_util::init_env();
    let mut server = ApiServer::from_env()?;
    if let Some(port) = args.port {
        server.port = port;
    }
    env_util::preflight_check(
        "api_server",
        &["JWT_SECRET"],
        &["DATABASE_URL", "DB_HOST", "PORT", "ALLOWED_ORIGINS", "JWT_SECRET"],
    )?;

    let db = Db::connect_from_env().await?;
    db.maybe_migrate(args.migrate).await?;
    tracing::info!("database connected");

    server.run(Arc::new(PgCatalog::new(db))).await
}
