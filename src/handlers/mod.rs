//! HTTP surface: thin actix handlers over the service layer.

pub mod events;
pub mod response;
pub mod social;

use crate::services::{DiscoveryService, EngagementService, ReviewService};

/// Shared handler state; the services are cheap clones over one client.
#[derive(Clone)]
pub struct AppState {
    pub discovery: DiscoveryService,
    pub engagement: EngagementService,
    pub reviews: ReviewService,
}

/// Register every route on the server.
pub fn configure(cfg: &mut actix_web::web::ServiceConfig) {
    events::configure(cfg);
    social::configure(cfg);
}
