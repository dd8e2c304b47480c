//! MongoDB client wiring and collection handles.

use bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

use crate::domain::{Comment, Event, Post, Review, User};
use crate::error::{AppError, Result};

/// Typed handles for every collection this service touches.
#[derive(Clone)]
pub struct Collections {
    pub events: Collection<Event>,
    pub users: Collection<User>,
    pub posts: Collection<Post>,
    pub comments: Collection<Comment>,
    pub reviews: Collection<Review>,
}

/// Connect to MongoDB, verify the connection and hand out collection handles.
pub async fn connect(uri: &str, db_name: &str) -> Result<Collections> {
    info!("Connecting to MongoDB database '{}'", db_name);

    // Bounded server selection so startup fails fast on an unreachable host
    let timeout_uri = if uri.contains('?') {
        format!("{uri}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
    } else {
        format!("{uri}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000")
    };

    let client = Client::with_uri_str(&timeout_uri)
        .await
        .map_err(|e| AppError::Database(format!("failed to connect to MongoDB: {e}")))?;

    let db = client.database(db_name);
    db.run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| AppError::Database(format!("MongoDB ping failed: {e}")))?;

    info!("Connected to MongoDB database '{}'", db_name);

    Ok(Collections {
        events: db.collection("events"),
        users: db.collection("users"),
        posts: db.collection("posts"),
        comments: db.collection("comments"),
        reviews: db.collection("reviews"),
    })
}

/// Create the indexes the query paths rely on. Idempotent.
pub async fn ensure_indexes(collections: &Collections) -> Result<()> {
    // Geospatial + filter indexes for event discovery
    collections
        .events
        .create_indexes(vec![
            IndexModel::builder()
                .keys(doc! { "location.coordinates": "2dsphere" })
                .build(),
            IndexModel::builder().keys(doc! { "categories": 1 }).build(),
            IndexModel::builder()
                .keys(doc! { "location.city": 1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "location.province": 1 })
                .build(),
            IndexModel::builder().keys(doc! { "created_at": -1 }).build(),
        ])
        .await?;

    // One review per (user, event); backs the write-time conflict check
    collections
        .reviews
        .create_index(
            IndexModel::builder()
                .keys(doc! { "event_id": 1, "user_id": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
        )
        .await?;

    collections
        .posts
        .create_index(
            IndexModel::builder()
                .keys(doc! { "visibility": 1, "created_at": -1 })
                .build(),
        )
        .await?;

    collections
        .comments
        .create_index(
            IndexModel::builder()
                .keys(doc! { "post_id": 1, "parent_id": 1, "created_at": -1 })
                .build(),
        )
        .await?;

    info!("Collection indexes ensured");
    Ok(())
}
