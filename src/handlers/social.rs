//! Social engagement endpoints: post feed, likes and follows.

use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::auth::{Actor, MaybeActor};
use crate::error::{parse_object_id, Result};
use crate::services::pagination::Page;

use super::response::DataResponse;
use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(post_feed)
        .service(toggle_post_like)
        .service(like_post)
        .service(unlike_post)
        .service(toggle_comment_like)
        .service(follow_user)
        .service(unfollow_user)
        .service(list_followers)
        .service(list_following);
}

#[get("/posts")]
async fn post_feed(
    state: web::Data<AppState>,
    page: web::Query<Page>,
    viewer: MaybeActor,
) -> Result<HttpResponse> {
    let (posts, meta) = state
        .engagement
        .post_feed(page.into_inner(), viewer.0)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(posts, meta)))
}

#[post("/posts/{id}/like")]
async fn toggle_post_like(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let post_id = parse_object_id(&path)?;
    let outcome = state.engagement.toggle_post_like(actor.id, post_id).await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(outcome)))
}

#[put("/posts/{id}/like")]
async fn like_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let post_id = parse_object_id(&path)?;
    let outcome = state.engagement.like_post(actor.id, post_id).await?;
    let message = if outcome.changed { "liked" } else { "no change" };
    Ok(HttpResponse::Ok().json(DataResponse::with_message(outcome, message)))
}

#[delete("/posts/{id}/like")]
async fn unlike_post(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let post_id = parse_object_id(&path)?;
    let outcome = state.engagement.unlike_post(actor.id, post_id).await?;
    let message = if outcome.changed { "unliked" } else { "no change" };
    Ok(HttpResponse::Ok().json(DataResponse::with_message(outcome, message)))
}

#[post("/comments/{id}/like")]
async fn toggle_comment_like(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let comment_id = parse_object_id(&path)?;
    let outcome = state
        .engagement
        .toggle_comment_like(actor.id, comment_id)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::ok(outcome)))
}

#[post("/users/{id}/follow")]
async fn follow_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let target_id = parse_object_id(&path)?;
    let outcome = state.engagement.follow(actor.id, target_id).await?;
    let message = if outcome.changed {
        "followed"
    } else {
        "no change"
    };
    Ok(HttpResponse::Ok().json(DataResponse::with_message(outcome, message)))
}

#[delete("/users/{id}/follow")]
async fn unfollow_user(
    state: web::Data<AppState>,
    path: web::Path<String>,
    actor: Actor,
) -> Result<HttpResponse> {
    let target_id = parse_object_id(&path)?;
    let outcome = state.engagement.unfollow(actor.id, target_id).await?;
    let message = if outcome.changed {
        "unfollowed"
    } else {
        "no change"
    };
    Ok(HttpResponse::Ok().json(DataResponse::with_message(outcome, message)))
}

#[get("/users/{id}/followers")]
async fn list_followers(
    state: web::Data<AppState>,
    path: web::Path<String>,
    page: web::Query<Page>,
    viewer: MaybeActor,
) -> Result<HttpResponse> {
    let user_id = parse_object_id(&path)?;
    let (users, meta) = state
        .engagement
        .followers(user_id, page.into_inner(), viewer.0)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(users, meta)))
}

#[get("/users/{id}/following")]
async fn list_following(
    state: web::Data<AppState>,
    path: web::Path<String>,
    page: web::Query<Page>,
    viewer: MaybeActor,
) -> Result<HttpResponse> {
    let user_id = parse_object_id(&path)?;
    let (users, meta) = state
        .engagement
        .following(user_id, page.into_inner(), viewer.0)
        .await?;
    Ok(HttpResponse::Ok().json(DataResponse::paginated(users, meta)))
}
