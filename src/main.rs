use actix_web::{get, web, App, HttpResponse, HttpServer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use discovery_service::config::Config;
use discovery_service::handlers::{self, AppState};
use discovery_service::services::{DiscoveryService, EngagementService, ReviewService};
use discovery_service::{db, workers};

#[get("/health")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "discovery-service",
    }))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(
        env = %config.app.env,
        port = config.app.http_port,
        "Starting discovery service"
    );

    let collections = db::connect(&config.mongo.uri, &config.mongo.db_name).await?;
    db::ensure_indexes(&collections).await?;

    let state = AppState {
        discovery: DiscoveryService::new(collections.clone()),
        engagement: EngagementService::new(collections.clone()),
        reviews: ReviewService::new(collections.clone()),
    };

    tokio::spawn(workers::reconcile::run(
        collections,
        config.reconcile.clone(),
    ));

    let bind = (config.app.host.clone(), config.app.http_port);
    info!("HTTP server listening on {}:{}", bind.0, bind.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .service(health)
            .configure(handlers::configure)
    })
    .bind(bind)?
    .run()
    .await?;

    Ok(())
}
