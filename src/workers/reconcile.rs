//! Periodic counter reconciliation.
//!
//! Denormalized counters (`participant_count`, `following_count`/
//! `followers_count`, `like_count`) are caches over authoritative sets. The
//! toggles keep them in step incrementally; this sweep recomputes them from
//! the sets and corrects any drift left by interrupted dual writes or
//! cascading deletes.

use bson::{doc, oid::ObjectId, Bson, Document};
use futures::TryStreamExt;
use mongodb::Collection;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ReconcileConfig;
use crate::db::Collections;
use crate::error::Result;

/// Counts participants per event from users' participation lists.
pub(crate) fn participant_counts_pipeline() -> Vec<Document> {
    vec![
        doc! { "$unwind": "$participated_events" },
        doc! { "$group": { "_id": "$participated_events", "count": { "$sum": 1 } } },
    ]
}

/// Projects each user's stored follow counters next to the authoritative
/// set sizes.
pub(crate) fn follow_counts_pipeline() -> Vec<Document> {
    vec![doc! { "$project": {
        "following_count": { "$ifNull": ["$following_count", 0] },
        "followers_count": { "$ifNull": ["$followers_count", 0] },
        "following_actual": { "$size": { "$ifNull": ["$following", []] } },
        "followers_actual": { "$size": { "$ifNull": ["$followers", []] } },
    }}]
}

/// Projects each document's stored `like_count` next to the size of its
/// `liked_by` set.
pub(crate) fn like_counts_pipeline() -> Vec<Document> {
    vec![doc! { "$project": {
        "like_count": { "$ifNull": ["$like_count", 0] },
        "like_actual": { "$size": { "$ifNull": ["$liked_by", []] } },
    }}]
}

fn bson_to_i64(value: Option<&Bson>) -> i64 {
    match value {
        Some(Bson::Int32(n)) => i64::from(*n),
        Some(Bson::Int64(n)) => *n,
        Some(Bson::Double(n)) => *n as i64,
        _ => 0,
    }
}

/// Recompute `participant_count` for every event from users'
/// `participated_events` lists. Returns the number of corrected events.
pub async fn reconcile_participant_counts(collections: &Collections) -> Result<u64> {
    let mut cursor = collections
        .users
        .aggregate(participant_counts_pipeline())
        .await?;

    let mut counts: HashMap<ObjectId, i64> = HashMap::new();
    while let Some(group) = cursor.try_next().await? {
        if let Ok(event_id) = group.get_object_id("_id") {
            counts.insert(event_id, bson_to_i64(group.get("count")));
        }
    }

    let mut corrected = 0;
    for (&event_id, &count) in &counts {
        let result = collections
            .events
            .update_one(
                doc! { "_id": event_id, "participant_count": { "$ne": count } },
                doc! { "$set": { "participant_count": count } },
            )
            .await?;
        corrected += result.modified_count;
    }

    // events nobody participates in anymore fall back to zero
    let event_ids: Vec<ObjectId> = counts.keys().copied().collect();
    let zeroed = collections
        .events
        .update_many(
            doc! { "_id": { "$nin": event_ids }, "participant_count": { "$ne": 0 } },
            doc! { "$set": { "participant_count": 0 } },
        )
        .await?;
    corrected += zeroed.modified_count;

    Ok(corrected)
}

/// Recompute `following_count`/`followers_count` from the authoritative sets
/// for every user, correcting drift from interrupted follow dual writes.
pub async fn reconcile_follow_counts(collections: &Collections) -> Result<u64> {
    let mut cursor = collections.users.aggregate(follow_counts_pipeline()).await?;

    let mut corrected = 0;
    while let Some(row) = cursor.try_next().await? {
        let Ok(user_id) = row.get_object_id("_id") else {
            continue;
        };
        let following_actual = bson_to_i64(row.get("following_actual"));
        let followers_actual = bson_to_i64(row.get("followers_actual"));
        let following_stored = bson_to_i64(row.get("following_count"));
        let followers_stored = bson_to_i64(row.get("followers_count"));

        if following_actual == following_stored && followers_actual == followers_stored {
            continue;
        }

        collections
            .users
            .update_one(
                doc! { "_id": user_id },
                doc! { "$set": {
                    "following_count": following_actual,
                    "followers_count": followers_actual,
                }},
            )
            .await?;
        corrected += 1;
    }

    Ok(corrected)
}

/// Recompute `like_count` from `liked_by` for every document in `coll`.
pub async fn reconcile_like_counts<T>(coll: &Collection<T>) -> Result<u64>
where
    T: Send + Sync,
{
    let mut cursor = coll.aggregate(like_counts_pipeline()).await?;

    let mut corrected = 0;
    while let Some(row) = cursor.try_next().await? {
        let Ok(id) = row.get_object_id("_id") else {
            continue;
        };
        let actual = bson_to_i64(row.get("like_actual"));
        if actual == bson_to_i64(row.get("like_count")) {
            continue;
        }

        coll.clone_with_type::<Document>()
            .update_one(
                doc! { "_id": id },
                doc! { "$set": { "like_count": actual } },
            )
            .await?;
        corrected += 1;
    }

    Ok(corrected)
}

/// One full sweep across all counter families.
pub async fn reconcile_once(collections: &Collections) -> Result<u64> {
    let mut corrected = 0;
    corrected += reconcile_participant_counts(collections).await?;
    corrected += reconcile_follow_counts(collections).await?;
    corrected += reconcile_like_counts(&collections.posts).await?;
    corrected += reconcile_like_counts(&collections.comments).await?;
    Ok(corrected)
}

/// Background loop: sweep on an interval, log and retry on failure.
pub async fn run(collections: Collections, config: ReconcileConfig) {
    if !config.enabled {
        info!("Counter reconciliation sweep disabled");
        return;
    }

    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    info!(
        interval_secs = config.interval_secs,
        "Counter reconciliation sweep started"
    );

    loop {
        interval.tick().await;
        match reconcile_once(&collections).await {
            Ok(corrected) if corrected > 0 => {
                info!(corrected, "Reconciliation sweep corrected drifted counters");
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "Reconciliation sweep failed; retrying next tick");
            }
        }
    }
}
