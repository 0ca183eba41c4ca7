use crate::api::handlers;
use crate::api::models::ApiError;
use actix_web::web;

/// Extractor failures answer with the same `{"message"}` body as handler errors.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid request body: {err}")).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid query: {err}")).into()
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(handlers::health_check))
        .service(
            web::scope("/api/cards")
                // Literal segments are registered before `{id}` so they win.
                .route("/random", web::get().to(handlers::random_cards))
                .route("/search", web::get().to(handlers::search_cards))
                .route("", web::post().to(handlers::upsert_card))
                .route("/{id}", web::get().to(handlers::card_by_id))
                .route("/{id}", web::put().to(handlers::upsert_card_by_id)),
        );
}
