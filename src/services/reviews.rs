//! Event reviews and the push-based rating sync.
//!
//! Every review mutation fully recomputes the owning event's
//! `average_rating`/`review_count` from the reviews collection; the stored
//! values are never incremented in place.

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::auth;
use crate::db::Collections;
use crate::domain::{Review, ReviewView};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewCreateRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewUpdateRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

/// Aggregate statistics over an event's reviews.
#[derive(Debug, Clone, Serialize)]
pub struct RatingStats {
    pub average_rating: f64,
    pub review_count: i64,
    /// Count of reviews per star value, keys "1".."5"
    pub distribution: std::collections::BTreeMap<String, i64>,
}

/// `$match`/`$group` pipeline computing average rating and review count for
/// one event.
pub(crate) fn rating_stats_pipeline(event_id: ObjectId) -> Vec<Document> {
    vec![
        doc! { "$match": { "event_id": event_id } },
        doc! { "$group": {
            "_id": null,
            "average_rating": { "$avg": "$rating" },
            "review_count": { "$sum": 1 },
        }},
    ]
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Clone)]
pub struct ReviewService {
    collections: Collections,
}

impl ReviewService {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Recompute the event's denormalized rating fields from its reviews and
    /// write both through. With zero reviews both fields reset to zero.
    #[instrument(skip(self))]
    pub async fn sync_event_stats(&self, event_id: ObjectId) -> Result<(f64, i64)> {
        let mut cursor = self
            .collections
            .reviews
            .aggregate(rating_stats_pipeline(event_id))
            .await?;

        let (average_rating, review_count) = match cursor.try_next().await? {
            Some(group) => {
                let avg = group.get_f64("average_rating").unwrap_or(0.0);
                let count = group
                    .get_i32("review_count")
                    .map(i64::from)
                    .or_else(|_| group.get_i64("review_count"))
                    .unwrap_or(0);
                (round_one_decimal(avg), count)
            }
            None => (0.0, 0),
        };

        self.collections
            .events
            .update_one(
                doc! { "_id": event_id },
                doc! { "$set": {
                    "average_rating": average_rating,
                    "review_count": review_count,
                    "updated_at": DateTime::now(),
                }},
            )
            .await?;

        Ok((average_rating, review_count))
    }

    /// Create a review. At most one review per (actor, event): a duplicate
    /// attempt is rejected with Conflict before anything is written, and the
    /// unique index backstops the check under races.
    #[instrument(skip(self, request))]
    pub async fn create_review(
        &self,
        event_id: ObjectId,
        actor_id: ObjectId,
        request: ReviewCreateRequest,
    ) -> Result<ReviewView> {
        request.validate()?;

        let event = self
            .collections
            .events
            .find_one(doc! { "_id": event_id })
            .await?;
        if event.is_none() {
            return Err(AppError::NotFound(format!("event {event_id} not found")));
        }

        // denormalized display fields come from the author's profile
        let author = self
            .collections
            .users
            .find_one(doc! { "_id": actor_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {actor_id} not found")))?;

        let existing = self
            .collections
            .reviews
            .find_one(doc! { "event_id": event_id, "user_id": actor_id })
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "you have already reviewed this event".into(),
            ));
        }

        let now = DateTime::now();
        let mut review = Review {
            id: None,
            event_id,
            user_id: actor_id,
            rating: request.rating,
            comment: request.comment,
            user_name: author.username,
            user_avatar: author.avatar,
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .collections
            .reviews
            .insert_one(&review)
            .await
            .map_err(|e| {
                // the unique (event_id, user_id) index catches the race
                if is_duplicate_key(&e) {
                    AppError::Conflict("you have already reviewed this event".into())
                } else {
                    AppError::from(e)
                }
            })?;
        review.id = inserted.inserted_id.as_object_id();

        self.sync_event_stats(event_id).await?;

        Ok(review.into())
    }

    /// Update a review. Only the owner may edit; stats are recomputed when
    /// the rating changed.
    #[instrument(skip(self, request))]
    pub async fn update_review(
        &self,
        review_id: ObjectId,
        actor_id: ObjectId,
        actor_roles: &[String],
        request: ReviewUpdateRequest,
    ) -> Result<ReviewView> {
        request.validate()?;

        let review = self
            .collections
            .reviews
            .find_one(doc! { "_id": review_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("review {review_id} not found")))?;

        if !auth::can_modify(actor_id, Some(review.user_id), &auth::roles_of(actor_roles)) {
            return Err(AppError::Forbidden(
                "only the author can edit this review".into(),
            ));
        }

        let mut set = doc! { "updated_at": DateTime::now() };
        if let Some(rating) = request.rating {
            set.insert("rating", rating);
        }
        if let Some(comment) = request.comment.clone() {
            set.insert("comment", comment);
        }

        let updated = self
            .collections
            .reviews
            .find_one_and_update(doc! { "_id": review_id }, doc! { "$set": set })
            .return_document(mongodb::options::ReturnDocument::After)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("review {review_id} not found")))?;

        if request.rating.is_some() {
            self.sync_event_stats(review.event_id).await?;
        }

        Ok(updated.into())
    }

    /// Delete a review (owner or admin) and resync the event's stats.
    #[instrument(skip(self))]
    pub async fn delete_review(
        &self,
        review_id: ObjectId,
        actor_id: ObjectId,
        actor_roles: &[String],
    ) -> Result<()> {
        let review = self
            .collections
            .reviews
            .find_one(doc! { "_id": review_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("review {review_id} not found")))?;

        if !auth::can_modify(actor_id, Some(review.user_id), &auth::roles_of(actor_roles)) {
            return Err(AppError::Forbidden(
                "only the author or an admin can delete this review".into(),
            ));
        }

        self.collections
            .reviews
            .delete_one(doc! { "_id": review_id })
            .await?;

        self.sync_event_stats(review.event_id).await?;
        Ok(())
    }

    /// List an event's reviews newest first, with aggregate statistics.
    pub async fn event_reviews(
        &self,
        event_id: ObjectId,
        limit: i64,
    ) -> Result<(Vec<ReviewView>, RatingStats)> {
        let mut cursor = self
            .collections
            .reviews
            .find(doc! { "event_id": event_id })
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?;

        let mut reviews: Vec<ReviewView> = Vec::new();
        let mut distribution: std::collections::BTreeMap<String, i64> =
            (1..=5).map(|star| (star.to_string(), 0)).collect();
        let mut rating_sum: i64 = 0;

        while let Some(review) = cursor.try_next().await? {
            rating_sum += i64::from(review.rating);
            *distribution.entry(review.rating.to_string()).or_insert(0) += 1;
            reviews.push(review.into());
        }

        let review_count = reviews.len() as i64;
        let average_rating = if review_count > 0 {
            round_one_decimal(rating_sum as f64 / review_count as f64)
        } else {
            0.0
        };

        Ok((
            reviews,
            RatingStats {
                average_rating,
                review_count,
                distribution,
            },
        ))
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_stats_pipeline_shape() {
        let event_id = ObjectId::new();
        let pipeline = rating_stats_pipeline(event_id);
        assert_eq!(pipeline.len(), 2);

        let matched = pipeline[0].get_document("$match").unwrap();
        assert_eq!(matched.get_object_id("event_id").unwrap(), event_id);

        let group = pipeline[1].get_document("$group").unwrap();
        let avg = group.get_document("average_rating").unwrap();
        assert_eq!(avg.get_str("$avg").unwrap(), "$rating");
        let count = group.get_document("review_count").unwrap();
        assert_eq!(count.get_i32("$sum").unwrap(), 1);
    }

    #[test]
    fn test_rating_bounds_validate() {
        assert!(ReviewCreateRequest {
            rating: 0,
            comment: None
        }
        .validate()
        .is_err());
        assert!(ReviewCreateRequest {
            rating: 6,
            comment: None
        }
        .validate()
        .is_err());
        assert!(ReviewCreateRequest {
            rating: 5,
            comment: None
        }
        .validate()
        .is_ok());
    }

    #[test]
    fn test_rounding_to_one_decimal() {
        assert_eq!(round_one_decimal(4.666_666), 4.7);
        assert_eq!(round_one_decimal(0.0), 0.0);
        assert_eq!(round_one_decimal(3.25), 3.3);
    }
}
