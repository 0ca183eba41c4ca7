// API server implementation using actix-web

use crate::api::{auth, middleware, routes};
use crate::catalog::store::CatalogStore;
use crate::util::env as env_util;
use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use std::sync::Arc;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173";

pub struct ApiServer {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub allowed_origins: String,
}

impl ApiServer {
    /// Create server from environment variables
    pub fn from_env() -> Result<Self> {
        env_util::init_env();

        let host = env_util::env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match env_util::env_opt("PORT") {
            Some(raw) => raw.trim().parse().context("Invalid PORT")?,
            None => DEFAULT_PORT,
        };
        let jwt_secret = env_util::env_req("JWT_SECRET")
            .context("JWT_SECRET environment variable is required")?;
        let allowed_origins = env_util::env_opt("ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string());

        Ok(Self {
            host,
            port,
            jwt_secret,
            allowed_origins,
        })
    }

    /// Start the HTTP server
    pub async fn run(self, store: Arc<dyn CatalogStore>) -> Result<()> {
        let bind_addr = format!("{}:{}", self.host, self.port);

        tracing::info!(
            host = %self.host,
            port = %self.port,
            allowed_origins = %self.allowed_origins,
            "starting card API server"
        );

        let store = web::Data::from(store);
        let jwt_secret = self.jwt_secret.clone();
        let allowed_origins = self.allowed_origins.clone();

        HttpServer::new(move || {
            let (logger, compress) = middleware::setup_middleware();
            let cors = middleware::setup_cors(&allowed_origins);

            // Last wrap runs first: CORS and logging see auth rejections too.
            App::new()
                .app_data(store.clone())
                .wrap(auth::AdminAuth::new(&jwt_secret))
                .wrap(cors)
                .wrap(compress)
                .wrap(logger)
                .configure(routes::configure_routes)
        })
        .bind(&bind_addr)
        .with_context(|| format!("Failed to bind to {}", bind_addr))?
        .run()
        .await
        .context("HTTP server error")?;

        Ok(())
    }
}
