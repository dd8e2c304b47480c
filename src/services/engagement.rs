//! Denormalized engagement counters: like, follow and participation toggles.
//!
//! Every membership flip is a single conditional storage command (the
//! membership test and the counter delta travel together), never a
//! read-then-write pair, so concurrent toggles on the same target by
//! different actors cannot lose updates. The follow dual-write spans two
//! records; its counters are additionally recomputed from the authoritative
//! sets by the reconciliation sweep (`workers::reconcile`).

use bson::{doc, oid::ObjectId, Document};
use mongodb::Collection;
use serde::Serialize;
use tracing::instrument;

use crate::db::Collections;
use crate::domain::{PostView, UserSummary};
use crate::error::{AppError, Result};
use crate::services::pagination::{Page, PageMeta};

/// Result of a membership toggle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToggleOutcome {
    pub is_member: bool,
    /// False when an explicit like/follow found the state already set.
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct LikeOutcome {
    pub is_liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FollowOutcome {
    pub is_following: bool,
    pub changed: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParticipationOutcome {
    pub is_participating: bool,
    pub participant_count: i64,
}

/// Conditional add: matches only while the actor is absent from the set, so
/// the membership test and the increment land in one storage command.
pub(crate) fn add_member_command(
    target_id: ObjectId,
    set_field: &str,
    count_field: &str,
    actor_id: ObjectId,
) -> (Document, Document) {
    (
        doc! { "_id": target_id, set_field: { "$ne": actor_id } },
        doc! { "$addToSet": { set_field: actor_id }, "$inc": { count_field: 1 } },
    )
}

/// Conditional remove: matches only while the actor is present in the set.
pub(crate) fn remove_member_command(
    target_id: ObjectId,
    set_field: &str,
    count_field: &str,
    actor_id: ObjectId,
) -> (Document, Document) {
    (
        doc! { "_id": target_id, set_field: actor_id },
        doc! { "$pull": { set_field: actor_id }, "$inc": { count_field: -1 } },
    )
}

#[derive(Clone)]
pub struct EngagementService {
    collections: Collections,
}

impl EngagementService {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    async fn exists<T>(coll: &Collection<T>, id: ObjectId) -> Result<bool>
    where
        T: Send + Sync,
    {
        let found = coll
            .clone_with_type::<Document>()
            .find_one(doc! { "_id": id })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.is_some())
    }

    /// Flip the actor's membership in `target[set_field]`, keeping
    /// `target[count_field]` in step. Each direction is one conditional
    /// command; a concurrent flip can invalidate both branches between the
    /// two attempts, so the pair is retried a few times before giving up.
    async fn toggle_membership<T>(
        coll: &Collection<T>,
        target_id: ObjectId,
        set_field: &str,
        count_field: &str,
        actor_id: ObjectId,
    ) -> Result<ToggleOutcome>
    where
        T: Send + Sync,
    {
        for _ in 0..3 {
            let (filter, update) = add_member_command(target_id, set_field, count_field, actor_id);
            if coll.update_one(filter, update).await?.matched_count == 1 {
                return Ok(ToggleOutcome {
                    is_member: true,
                    changed: true,
                });
            }

            let (filter, update) =
                remove_member_command(target_id, set_field, count_field, actor_id);
            if coll.update_one(filter, update).await?.matched_count == 1 {
                return Ok(ToggleOutcome {
                    is_member: false,
                    changed: true,
                });
            }

            if !Self::exists(coll, target_id).await? {
                return Err(AppError::NotFound(format!("target {target_id} not found")));
            }
            // target exists but neither branch matched: lost both races, retry
        }
        Err(AppError::Internal(format!(
            "toggle contention on {target_id}"
        )))
    }

    /// One-way variant: add the actor if absent. Already-present is the
    /// documented no-op ("no change"), not a second increment.
    async fn ensure_member<T>(
        coll: &Collection<T>,
        target_id: ObjectId,
        set_field: &str,
        count_field: &str,
        actor_id: ObjectId,
    ) -> Result<ToggleOutcome>
    where
        T: Send + Sync,
    {
        let (filter, update) = add_member_command(target_id, set_field, count_field, actor_id);
        if coll.update_one(filter, update).await?.matched_count == 1 {
            return Ok(ToggleOutcome {
                is_member: true,
                changed: true,
            });
        }
        if Self::exists(coll, target_id).await? {
            Ok(ToggleOutcome {
                is_member: true,
                changed: false,
            })
        } else {
            Err(AppError::NotFound(format!("target {target_id} not found")))
        }
    }

    /// One-way variant: remove the actor if present.
    async fn ensure_not_member<T>(
        coll: &Collection<T>,
        target_id: ObjectId,
        set_field: &str,
        count_field: &str,
        actor_id: ObjectId,
    ) -> Result<ToggleOutcome>
    where
        T: Send + Sync,
    {
        let (filter, update) = remove_member_command(target_id, set_field, count_field, actor_id);
        if coll.update_one(filter, update).await?.matched_count == 1 {
            return Ok(ToggleOutcome {
                is_member: false,
                changed: true,
            });
        }
        if Self::exists(coll, target_id).await? {
            Ok(ToggleOutcome {
                is_member: false,
                changed: false,
            })
        } else {
            Err(AppError::NotFound(format!("target {target_id} not found")))
        }
    }

    async fn read_counter<T>(coll: &Collection<T>, id: ObjectId, field: &str) -> Result<i64>
    where
        T: Send + Sync,
    {
        let found = coll
            .clone_with_type::<Document>()
            .find_one(doc! { "_id": id })
            .projection(doc! { field: 1 })
            .await?;
        Ok(found
            .and_then(|d| d.get(field).and_then(bson::Bson::as_i64).or_else(|| {
                d.get(field).and_then(bson::Bson::as_i32).map(i64::from)
            }))
            .unwrap_or(0))
    }

    // ========== Likes ==========

    #[instrument(skip(self))]
    pub async fn toggle_post_like(
        &self,
        actor_id: ObjectId,
        post_id: ObjectId,
    ) -> Result<LikeOutcome> {
        let outcome = Self::toggle_membership(
            &self.collections.posts,
            post_id,
            "liked_by",
            "like_count",
            actor_id,
        )
        .await?;
        let like_count = Self::read_counter(&self.collections.posts, post_id, "like_count").await?;
        Ok(LikeOutcome {
            is_liked: outcome.is_member,
            like_count,
        })
    }

    #[instrument(skip(self))]
    pub async fn toggle_comment_like(
        &self,
        actor_id: ObjectId,
        comment_id: ObjectId,
    ) -> Result<LikeOutcome> {
        let outcome = Self::toggle_membership(
            &self.collections.comments,
            comment_id,
            "liked_by",
            "like_count",
            actor_id,
        )
        .await?;
        let like_count =
            Self::read_counter(&self.collections.comments, comment_id, "like_count").await?;
        Ok(LikeOutcome {
            is_liked: outcome.is_member,
            like_count,
        })
    }

    /// Explicit like: no-op when the post is already liked by this actor.
    pub async fn like_post(&self, actor_id: ObjectId, post_id: ObjectId) -> Result<ToggleOutcome> {
        Self::ensure_member(
            &self.collections.posts,
            post_id,
            "liked_by",
            "like_count",
            actor_id,
        )
        .await
    }

    pub async fn unlike_post(
        &self,
        actor_id: ObjectId,
        post_id: ObjectId,
    ) -> Result<ToggleOutcome> {
        Self::ensure_not_member(
            &self.collections.posts,
            post_id,
            "liked_by",
            "like_count",
            actor_id,
        )
        .await
    }

    // ========== Follow ==========

    /// Follow: dual update across the actor's `following` set and the
    /// target's `followers` set. Both writes are individually guarded; a
    /// crash between them leaves counts to the reconciliation sweep.
    /// Repeated follow with no intervening unfollow is a no-op.
    #[instrument(skip(self))]
    pub async fn follow(&self, actor_id: ObjectId, target_id: ObjectId) -> Result<FollowOutcome> {
        if actor_id == target_id {
            return Err(AppError::BadRequest("cannot follow yourself".into()));
        }
        if !Self::exists(&self.collections.users, target_id).await? {
            return Err(AppError::NotFound(format!("user {target_id} not found")));
        }

        // the member stored in the actor's `following` set is the target
        let actor_side = Self::ensure_member(
            &self.collections.users,
            actor_id,
            "following",
            "following_count",
            target_id,
        )
        .await?;
        if !actor_side.changed {
            return Ok(FollowOutcome {
                is_following: true,
                changed: false,
            });
        }

        // Second leg of the dual write; guarded so replays cannot
        // double-increment even after a partial failure.
        let (filter, update) =
            add_member_command(target_id, "followers", "followers_count", actor_id);
        self.collections.users.update_one(filter, update).await?;

        Ok(FollowOutcome {
            is_following: true,
            changed: true,
        })
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, actor_id: ObjectId, target_id: ObjectId) -> Result<FollowOutcome> {
        if actor_id == target_id {
            return Err(AppError::BadRequest("cannot unfollow yourself".into()));
        }

        let actor_side = Self::ensure_not_member(
            &self.collections.users,
            actor_id,
            "following",
            "following_count",
            target_id,
        )
        .await?;
        if !actor_side.changed {
            return Ok(FollowOutcome {
                is_following: false,
                changed: false,
            });
        }

        let (filter, update) =
            remove_member_command(target_id, "followers", "followers_count", actor_id);
        self.collections.users.update_one(filter, update).await?;

        Ok(FollowOutcome {
            is_following: false,
            changed: true,
        })
    }

    pub async fn is_following(&self, actor_id: ObjectId, target_id: ObjectId) -> Result<bool> {
        let found = self
            .collections
            .users
            .clone_with_type::<Document>()
            .find_one(doc! { "_id": actor_id, "following": target_id })
            .projection(doc! { "_id": 1 })
            .await?;
        Ok(found.is_some())
    }

    // ========== Participation ==========

    /// Toggle the actor's participation in an event. The membership lives on
    /// the user record; the event's `participant_count` is the incremental
    /// cache the reconciliation sweep keeps honest.
    #[instrument(skip(self))]
    pub async fn toggle_participation(
        &self,
        actor_id: ObjectId,
        event_id: ObjectId,
    ) -> Result<ParticipationOutcome> {
        if !Self::exists(&self.collections.events, event_id).await? {
            return Err(AppError::NotFound(format!("event {event_id} not found")));
        }

        let joined: bool;
        let join_filter = doc! { "_id": actor_id, "participated_events": { "$ne": event_id } };
        let join_update = doc! { "$addToSet": { "participated_events": event_id } };
        if self
            .collections
            .users
            .update_one(join_filter, join_update)
            .await?
            .matched_count
            == 1
        {
            joined = true;
        } else {
            let leave_filter = doc! { "_id": actor_id, "participated_events": event_id };
            let leave_update = doc! { "$pull": { "participated_events": event_id } };
            if self
                .collections
                .users
                .update_one(leave_filter, leave_update)
                .await?
                .matched_count
                == 1
            {
                joined = false;
            } else {
                return Err(AppError::NotFound(format!("user {actor_id} not found")));
            }
        }

        // Counter cache on the event record; floor at zero on the way down
        if joined {
            self.collections
                .events
                .update_one(
                    doc! { "_id": event_id },
                    doc! { "$inc": { "participant_count": 1 } },
                )
                .await?;
        } else {
            self.collections
                .events
                .update_one(
                    doc! { "_id": event_id, "participant_count": { "$gt": 0 } },
                    doc! { "$inc": { "participant_count": -1 } },
                )
                .await?;
        }

        let participant_count =
            Self::read_counter(&self.collections.events, event_id, "participant_count").await?;
        Ok(ParticipationOutcome {
            is_participating: joined,
            participant_count,
        })
    }

    // ========== Listings ==========

    /// Public post feed, newest first, annotated with the viewer's like
    /// state. `total` is a true count over the predicate.
    pub async fn post_feed(
        &self,
        page: Page,
        viewer: Option<ObjectId>,
    ) -> Result<(Vec<PostView>, PageMeta)> {
        use futures::TryStreamExt;

        let page = page.clamped();
        let predicate = doc! { "visibility": "public" };

        let mut cursor = self
            .collections
            .posts
            .clone_with_type::<Document>()
            .find(predicate.clone())
            .sort(doc! { "created_at": -1 })
            .skip(page.skip())
            .limit(page.fetch_limit())
            .await?;

        let mut rows = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            if let Some(post) = super::decode_lenient::<crate::domain::Post>(raw, "post") {
                rows.push(post);
            }
        }
        let (posts, has_more) = page.window(rows);

        let total = self
            .collections
            .posts
            .count_documents(predicate)
            .await? as i64;

        let views = posts
            .into_iter()
            .map(|post| PostView::from_post(post, viewer))
            .collect();
        Ok((views, page.meta(total, has_more)))
    }

    /// Page through a user's followers. The id set is already materialized
    /// on the record, so `total` is the set length for this listing.
    pub async fn followers(
        &self,
        user_id: ObjectId,
        page: Page,
        viewer: Option<ObjectId>,
    ) -> Result<(Vec<UserSummary>, PageMeta)> {
        self.related_users(user_id, "followers", page, viewer).await
    }

    pub async fn following(
        &self,
        user_id: ObjectId,
        page: Page,
        viewer: Option<ObjectId>,
    ) -> Result<(Vec<UserSummary>, PageMeta)> {
        self.related_users(user_id, "following", page, viewer).await
    }

    async fn related_users(
        &self,
        user_id: ObjectId,
        set_field: &str,
        page: Page,
        viewer: Option<ObjectId>,
    ) -> Result<(Vec<UserSummary>, PageMeta)> {
        use futures::TryStreamExt;

        let page = page.clamped();
        let user = self
            .collections
            .users
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

        let ids = match set_field {
            "followers" => user.followers,
            _ => user.following,
        };
        let total = ids.len() as i64;

        let start = (page.skip() as usize).min(ids.len());
        let end = (start + page.page_size as usize).min(ids.len());
        let slice = &ids[start..end];
        let has_more = end < ids.len();

        let mut users = Vec::with_capacity(slice.len());
        if !slice.is_empty() {
            let mut cursor = self
                .collections
                .users
                .find(doc! { "_id": { "$in": slice } })
                .await?;
            while let Some(user) = cursor.try_next().await? {
                users.push(UserSummary::from_user(user, viewer));
            }
        }

        Ok((users, page.meta(total, has_more)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_command_guards_on_absence() {
        let target = ObjectId::new();
        let actor = ObjectId::new();
        let (filter, update) = add_member_command(target, "liked_by", "like_count", actor);

        assert_eq!(filter.get_object_id("_id").unwrap(), target);
        let guard = filter.get_document("liked_by").unwrap();
        assert_eq!(guard.get_object_id("$ne").unwrap(), actor);

        let add = update.get_document("$addToSet").unwrap();
        assert_eq!(add.get_object_id("liked_by").unwrap(), actor);
        let inc = update.get_document("$inc").unwrap();
        assert_eq!(inc.get_i32("like_count").unwrap(), 1);
    }

    #[test]
    fn test_remove_command_guards_on_presence() {
        let target = ObjectId::new();
        let actor = ObjectId::new();
        let (filter, update) = remove_member_command(target, "liked_by", "like_count", actor);

        assert_eq!(filter.get_object_id("liked_by").unwrap(), actor);

        let pull = update.get_document("$pull").unwrap();
        assert_eq!(pull.get_object_id("liked_by").unwrap(), actor);
        let inc = update.get_document("$inc").unwrap();
        assert_eq!(inc.get_i32("like_count").unwrap(), -1);
    }

    #[test]
    fn test_commands_are_involutive_on_the_counter() {
        // applying add then remove nets the counter delta to zero
        let target = ObjectId::new();
        let actor = ObjectId::new();
        let (_, add) = add_member_command(target, "followers", "followers_count", actor);
        let (_, remove) = remove_member_command(target, "followers", "followers_count", actor);

        let up = add
            .get_document("$inc")
            .unwrap()
            .get_i32("followers_count")
            .unwrap();
        let down = remove
            .get_document("$inc")
            .unwrap()
            .get_i32("followers_count")
            .unwrap();
        assert_eq!(up + down, 0);
    }

    #[test]
    fn test_guards_make_replays_no_ops() {
        // After an add lands, its own filter no longer matches the document
        // state, so re-sending the same command cannot double-increment.
        let target = ObjectId::new();
        let actor = ObjectId::new();
        let (filter, _) = add_member_command(target, "liked_by", "like_count", actor);
        let guard = filter.get_document("liked_by").unwrap();
        // guard asserts absence; once the actor is in the set it fails
        assert!(guard.contains_key("$ne"));

        let (filter, _) = remove_member_command(target, "liked_by", "like_count", actor);
        // removal asserts presence; once pulled it fails
        assert_eq!(filter.get_object_id("liked_by").unwrap(), actor);
    }
}
