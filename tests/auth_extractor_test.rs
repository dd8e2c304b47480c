//! Header-based identity extraction against real request objects.

use actix_web::test::TestRequest;
use actix_web::FromRequest;
use bson::oid::ObjectId;

use discovery_service::auth::{Actor, ActorRoles, MaybeActor, ACTOR_HEADER, ROLES_HEADER};

#[actix_web::test]
async fn test_actor_extracted_from_header() {
    let id = ObjectId::new();
    let req = TestRequest::default()
        .insert_header((ACTOR_HEADER, id.to_hex()))
        .to_http_request();

    let actor = Actor::extract(&req).await.unwrap();
    assert_eq!(actor.id, id);
}

#[actix_web::test]
async fn test_missing_actor_is_unauthorized() {
    let req = TestRequest::default().to_http_request();
    assert!(Actor::extract(&req).await.is_err());
}

#[actix_web::test]
async fn test_malformed_actor_id_is_rejected() {
    let req = TestRequest::default()
        .insert_header((ACTOR_HEADER, "not-a-valid-id"))
        .to_http_request();
    assert!(Actor::extract(&req).await.is_err());
}

#[actix_web::test]
async fn test_maybe_actor_tolerates_anonymous() {
    let req = TestRequest::default().to_http_request();
    let viewer = MaybeActor::extract(&req).await.unwrap();
    assert!(viewer.0.is_none());

    let id = ObjectId::new();
    let req = TestRequest::default()
        .insert_header((ACTOR_HEADER, id.to_hex()))
        .to_http_request();
    let viewer = MaybeActor::extract(&req).await.unwrap();
    assert_eq!(viewer.0, Some(id));
}

#[actix_web::test]
async fn test_roles_parsed_from_comma_list() {
    let req = TestRequest::default()
        .insert_header((ROLES_HEADER, "admin, user,,provider "))
        .to_http_request();
    let roles = ActorRoles::extract(&req).await.unwrap();
    assert_eq!(roles.0, vec!["admin", "user", "provider"]);
}

#[actix_web::test]
async fn test_absent_roles_default_to_empty() {
    let req = TestRequest::default().to_http_request();
    let roles = ActorRoles::extract(&req).await.unwrap();
    assert!(roles.0.is_empty());
}
