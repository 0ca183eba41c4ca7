use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

const CARD_SCHEMA: &str = include_str!("../../migrations/0001_card_schema.sql");

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options =
            PgConnectOptions::from_str(database_url).context("invalid database URL")?;

        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .context("unable to connect to the database")?;
        info!(max_connections, "connected to db");
        Ok(Self { pool })
    }

    /// Connect using the environment-derived URL and `DB_MAX_CONNS`.
    pub async fn connect_from_env() -> Result<Self> {
        let database_url = crate::util::env::db_url()?;
        let max_connections: u32 = crate::util::env::env_parse("DB_MAX_CONNS", 10u32);
        Self::connect(&database_url, max_connections).await
    }

    /// Apply the card schema. Every statement is `IF NOT EXISTS`, so repeated runs are no-ops.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::raw_sql(CARD_SCHEMA)
            .execute(&self.pool)
            .await
            .context("applying card schema")?;
        info!("card schema ensured");
        Ok(())
    }

    /// Ensure the schema when `AUTO_MIGRATE` is on or the caller forces it.
    pub async fn maybe_migrate(&self, force: bool) -> Result<()> {
        if force || crate::util::env::env_flag("AUTO_MIGRATE", false) {
            self.ensure_schema().await
        } else {
            info!("AUTO_MIGRATE disabled; skipping schema setup");
            Ok(())
        }
    }

    pub async fn ping(&self) -> bool {
        sqlx::query_scalar::<_, bool>("SELECT true")
            .fetch_one(&self.pool)
            .await
            .is_ok()
    }
}
