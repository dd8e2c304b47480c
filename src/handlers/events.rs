//! Event discovery and review endpoints.

use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{self, Actor, ActorRoles, MaybeActor};
use crate::error::{parse_object_id, AppError, Result};
use crate::services::pagination::Page;
use crate::services::reviews::{RatingStats, ReviewCreateRequest, ReviewUpdateRequest};
use crate::services::search::SearchParams;

use super::response::DataResponse;
use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_events)
        .service(recommend_events)
        .service(nearby_events)
        .service(search_events)
        .service(get_event)
        .service(delete_event)
        .service(toggle_participation)
        .service(list_reviews)
        .service(create_review)
        .service(update_review)
        .service(delete_review);
}

#[get("/events")]
async fn list_events(
    state: web::Data<AppState>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    let (events, meta) = state.discovery.list_events(page.into_inner()).await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(events, meta)))
}

#[derive(Debug, Deserialize)]
struct RecommendQuery {
    #[serde(default = "default_recommend_limit")]
    limit: usize,
}

fn default_recommend_limit() -> usize {
    10
}

#[get("/events/recommendations")]
async fn recommend_events(
    state: web::Data<AppState>,
    actor: Actor,
    query: web::Query<RecommendQuery>,
) -> Result<HttpResponse> {
    let limit = query.limit.clamp(1, 50);
    let (events, meta) = state.discovery.recommend_events(actor.id, limit).await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(events, meta)))
}

#[derive(Debug, Deserialize, Validate)]
struct NearbyQuery {
    lat: f64,
    lng: f64,
    #[serde(default = "default_radius_km")]
    #[validate(range(min = 0.1, max = 500.0))]
    radius_km: f64,
    #[serde(default = "default_nearby_limit")]
    #[validate(range(min = 1, max = 100))]
    limit: usize,
}

fn default_radius_km() -> f64 {
    10.0
}

fn default_nearby_limit() -> usize {
    20
}

#[get("/events/nearby")]
async fn nearby_events(
    state: web::Data<AppState>,
    query: web::Query<NearbyQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    let (events, meta) = state
        .discovery
        .nearby_events(query.lat, query.lng, query.radius_km, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(events, meta)))
}

#[get("/events/search")]
async fn search_events(
    state: web::Data<AppState>,
    params: web::Query<SearchParams>,
    page: web::Query<Page>,
) -> Result<HttpResponse> {
    let (events, meta) = state
        .discovery
        .search_events(&params, page.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(events, meta)))
}

#[get("/events/{id}")]
async fn get_event(
    state: web::Data<AppState>,
    path: web::Path<String>,
    viewer: MaybeActor,
) -> Result<HttpResponse> {
    let event_id = parse_object_id(&path)?;
    let event = state.discovery.get_event(event_id, viewer.0).await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(event)))
}

#[delete("/events/{id}")]
async fn delete_event(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
    roles: ActorRoles,
) -> Result<HttpResponse> {
    let event_id = parse_object_id(&path)?;
    let owner = state.discovery.event_owner(event_id).await?;
    if !auth::can_modify(actor.id, owner, &auth::roles_of(&roles.0)) {
        return Err(AppError::Forbidden(
            "only the creator or an admin can delete this event".into(),
        ));
    }
    state.discovery.delete_event(event_id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::with_message((), "event deleted")))
}

#[post("/events/{id}/participation")]
async fn toggle_participation(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let event_id = parse_object_id(&path)?;
    let outcome = state
        .engagement
        .toggle_participation(actor.id, event_id)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(outcome)))
}

#[derive(Debug, Deserialize)]
struct ReviewListQuery {
    #[serde(default = "default_review_limit")]
    limit: i64,
}

fn default_review_limit() -> i64 {
    50
}

#[derive(Debug, Serialize)]
struct ReviewListing {
    reviews: Vec<crate::domain::ReviewView>,
    stats: RatingStats,
}

#[get("/events/{id}/reviews")]
async fn list_reviews(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ReviewListQuery>,
) -> Result<HttpResponse> {
    let event_id = parse_object_id(&path)?;
    let limit = query.limit.clamp(1, 200);
    let (reviews, stats) = state.reviews.event_reviews(event_id, limit).await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(ReviewListing { reviews, stats })))
}

#[post("/events/{id}/reviews")]
async fn create_review(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
    body: web::Json<ReviewCreateRequest>,
) -> Result<HttpResponse> {
    let event_id = parse_object_id(&path)?;
    let review = state
        .reviews
        .create_review(event_id, actor.id, body.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(DataResponse::ok(review)))
}

#[put("/reviews/{id}")]
async fn update_review(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
    roles: ActorRoles,
    body: web::Json<ReviewUpdateRequest>,
) -> Result<HttpResponse> {
    let review_id = parse_object_id(&path)?;
    let review = state
        .reviews
        .update_review(review_id, actor.id, &roles.0, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(review)))
}

#[delete("/reviews/{id}")]
async fn delete_review(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
    roles: ActorRoles,
) -> Result<HttpResponse> {
    let review_id = parse_object_id(&path)?;
    state
        .reviews
        .delete_review(review_id, actor.id, &roles.0)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::with_message((), "review deleted")))
}
