// HTTP request handlers for the card endpoints

use crate::api::auth::Claims;
use crate::api::models::{ApiError, HealthResponse, MessageResponse, RandomQuery, SearchQuery};
use crate::catalog::payload::CardPayload;
use crate::catalog::store::{clamp_random_limit, CatalogStore, SEARCH_LIMIT};
use actix_web::{web, HttpResponse};

type Store = web::Data<dyn CatalogStore>;

pub async fn health_check(store: Store) -> HttpResponse {
    let database = if store.ping().await {
        "connected"
    } else {
        "disconnected"
    };
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        database: database.to_string(),
    })
}

/// GET /api/cards/random?limit=N
pub async fn random_cards(
    store: Store,
    query: web::Query<RandomQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = clamp_random_limit(query.limit());
    let editions = store.random_editions(limit).await?;
    Ok(HttpResponse::Ok().json(editions))
}

/// GET /api/cards/search?q=
pub async fn search_cards(
    store: Store,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, ApiError> {
    let q = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search query is required".into()))?;
    let editions = store.search_editions(q, SEARCH_LIMIT).await?;
    Ok(HttpResponse::Ok().json(editions))
}

/// GET /api/cards/{id}
pub async fn card_by_id(store: Store, path: web::Path<String>) -> Result<HttpResponse, ApiError> {
    let card = store
        .card_detail(&path.into_inner())
        .await?
        .ok_or(ApiError::NotFound("Card not found"))?;
    Ok(HttpResponse::Ok().json(card))
}

/// POST /api/cards
pub async fn upsert_card(
    store: Store,
    admin: Option<web::ReqData<Claims>>,
    payload: web::Json<CardPayload>,
) -> Result<HttpResponse, ApiError> {
    apply(store, admin, payload.into_inner(), None).await
}

/// PUT /api/cards/{id}
pub async fn upsert_card_by_id(
    store: Store,
    admin: Option<web::ReqData<Claims>>,
    path: web::Path<String>,
    payload: web::Json<CardPayload>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    apply(store, admin, payload.into_inner(), Some(&id)).await
}

async fn apply(
    store: Store,
    admin: Option<web::ReqData<Claims>>,
    payload: CardPayload,
    path_id: Option<&str>,
) -> Result<HttpResponse, ApiError> {
    let update = payload.into_update(path_id)?;
    store.apply_card_update(&update).await?;
    tracing::info!(
        card_id = %update.card.card_id,
        by = admin.as_ref().map(|c| c.id.as_str()).unwrap_or("-"),
        "card upserted"
    );
    Ok(HttpResponse::Created().json(MessageResponse::new("Card processed successfully")))
}
