//! Identity and capability checks.
//!
//! Credential validation happens upstream; the gateway forwards a validated
//! actor id (and optional role set) in headers. This module only extracts
//! those and answers pure allow/deny questions, so authorization is
//! unit-testable without a transport or a store.

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use bson::oid::ObjectId;
use std::future::{ready, Ready};

use crate::error::AppError;

pub const ACTOR_HEADER: &str = "x-actor-id";
pub const ROLES_HEADER: &str = "x-actor-roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Provider,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Role::User),
            "provider" | "event_provider" => Some(Role::Provider),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Parse a raw role-name list, dropping unknown names.
pub fn roles_of(raw: &[String]) -> Vec<Role> {
    raw.iter().filter_map(|r| Role::parse(r)).collect()
}

/// Pure ownership/capability decision: admins may modify anything, otherwise
/// only the resource owner may.
pub fn can_modify(actor: ObjectId, resource_owner: Option<ObjectId>, roles: &[Role]) -> bool {
    if roles.contains(&Role::Admin) {
        return true;
    }
    resource_owner == Some(actor)
}

/// A validated, required actor identity.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: ObjectId,
}

/// An optional actor identity; anonymous discovery requests carry none.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaybeActor(pub Option<ObjectId>);

/// Roles forwarded alongside the actor id.
#[derive(Debug, Clone, Default)]
pub struct ActorRoles(pub Vec<String>);

fn actor_from_headers(req: &HttpRequest) -> Result<Option<ObjectId>, AppError> {
    match req.headers().get(ACTOR_HEADER) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::BadRequest("malformed actor header".into()))?;
            let id = raw
                .parse()
                .map_err(|_| AppError::BadRequest(format!("malformed identifier: {raw}")))?;
            Ok(Some(id))
        }
    }
}

impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(match actor_from_headers(req) {
            Ok(Some(id)) => Ok(Actor { id }),
            Ok(None) => Err(AppError::Unauthorized("actor identity required".into())),
            Err(err) => Err(err),
        })
    }
}

impl FromRequest for MaybeActor {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(actor_from_headers(req).map(MaybeActor))
    }
}

impl FromRequest for ActorRoles {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let roles = req
            .headers()
            .get(ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        ready(Ok(ActorRoles(roles)))
    }
}
