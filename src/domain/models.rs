use bson::oid::ObjectId;
use bson::DateTime;
use serde::{Deserialize, Serialize};

/// GeoJSON point, stored as `{ "type": "Point", "coordinates": [lng, lat] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]` per GeoJSON
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [lng, lat],
        }
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }
}

/// Structured event location. Older records may carry only a subset of
/// fields, so everything is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<GeoPoint>,
}

/// Long-text content blocks of an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
}

/// A media attachment on an event or post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaItem {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Event document.
///
/// Counters are denormalized: `participant_count` is maintained by the
/// participation toggle and reconciled from users' participation lists by
/// the background sweep; `average_rating`/`review_count` are recomputed from
/// the reviews collection on every review mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub content: EventContent,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<ObjectId>,
    /// Absent on records created before the visibility rollout; treated as
    /// visible by every public-listing predicate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
    #[serde(default)]
    pub participant_count: i64,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// User document. `following_count`/`followers_count` mirror the set
/// cardinalities; drift from interrupted dual writes is corrected by the
/// reconciliation sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub hobbies: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub following: Vec<ObjectId>,
    #[serde(default)]
    pub followers: Vec<ObjectId>,
    #[serde(default)]
    pub following_count: i64,
    #[serde(default)]
    pub followers_count: i64,
    #[serde(default)]
    pub participated_events: Vec<ObjectId>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Post document. `like_count` always equals `liked_by.len()` once
/// in-flight toggles settle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub author_id: ObjectId,
    pub content: String,
    #[serde(default)]
    pub media: Vec<MediaItem>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub liked_by: Vec<ObjectId>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub comment_count: i64,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

fn default_visibility() -> String {
    "public".to_string()
}

/// Comment document. `reply_count` counts child comments referencing this
/// one as parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub post_id: ObjectId,
    pub author_id: ObjectId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ObjectId>,
    #[serde(default)]
    pub liked_by: Vec<ObjectId>,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub reply_count: i64,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Review document. At most one per (user_id, event_id) pair, enforced both
/// by the write-time check and a unique compound index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub event_id: ObjectId,
    pub user_id: ObjectId,
    pub rating: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

// ============================================================================
// Read-side views
// ============================================================================

/// Event as returned by listing/discovery endpoints: string ids, annotated
/// counters, and per-mode extras (relevance score, distance).
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: String,
    pub name: String,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub content: EventContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub media: Vec<MediaItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    pub is_visible: bool,
    pub participant_count: i64,
    pub average_rating: f64,
    pub review_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_participating: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Event> for EventView {
    fn from(event: Event) -> Self {
        EventView {
            id: event.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: event.name,
            categories: event.categories,
            tags: event.tags,
            content: event.content,
            location: event.location,
            media: event.media,
            creator_id: event.creator_id.map(|id| id.to_hex()),
            is_visible: event.is_visible.unwrap_or(true),
            participant_count: event.participant_count,
            average_rating: event.average_rating,
            review_count: event.review_count,
            is_participating: None,
            relevance_score: None,
            distance_km: None,
            created_at: event.created_at.to_chrono(),
        }
    }
}

/// Post as returned by the feed, annotated with the viewer's like state.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub media: Vec<MediaItem>,
    pub tags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_liked: bool,
    pub visibility: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl PostView {
    pub fn from_post(post: Post, viewer: Option<ObjectId>) -> Self {
        let is_liked = viewer
            .map(|v| post.liked_by.contains(&v))
            .unwrap_or(false);
        PostView {
            id: post.id.map(|id| id.to_hex()).unwrap_or_default(),
            author_id: post.author_id.to_hex(),
            content: post.content,
            media: post.media,
            tags: post.tags,
            like_count: post.like_count,
            comment_count: post.comment_count,
            is_liked,
            visibility: post.visibility,
            created_at: post.created_at.to_chrono(),
        }
    }
}

/// Abbreviated user for follower/following listings.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub followers_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_following: Option<bool>,
}

impl UserSummary {
    pub fn from_user(user: User, viewer: Option<ObjectId>) -> Self {
        let is_following = match (viewer, user.id) {
            (Some(v), Some(_)) => Some(user.followers.contains(&v)),
            _ => None,
        };
        UserSummary {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            username: user.username,
            full_name: user.full_name,
            avatar: user.avatar,
            followers_count: user.followers_count,
            is_following,
        }
    }
}

/// Review as returned over the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub rating: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub user_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_avatar: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        ReviewView {
            id: review.id.map(|id| id.to_hex()).unwrap_or_default(),
            event_id: review.event_id.to_hex(),
            user_id: review.user_id.to_hex(),
            rating: review.rating,
            comment: review.comment,
            user_name: review.user_name,
            user_avatar: review.user_avatar,
            created_at: review.created_at.to_chrono(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_round_trip() {
        let point = GeoPoint::new(10.762, 106.66);
        assert_eq!(point.lat(), 10.762);
        assert_eq!(point.lng(), 106.66);
        // GeoJSON ordering is [lng, lat]
        assert_eq!(point.coordinates, [106.66, 10.762]);
    }

    #[test]
    fn test_event_decodes_legacy_document() {
        // Older records miss visibility, counters and nested blocks
        let doc = bson::doc! {
            "_id": ObjectId::new(),
            "name": "Lantern festival",
            "created_at": DateTime::now(),
            "updated_at": DateTime::now(),
        };
        let event: Event = bson::from_document(doc).unwrap();
        assert!(event.is_visible.is_none());
        assert_eq!(event.participant_count, 0);
        assert_eq!(event.review_count, 0);
        assert!(event.categories.is_empty());

        let view = EventView::from(event);
        assert!(view.is_visible, "absent visibility reads as visible");
    }

    #[test]
    fn test_post_view_like_flag() {
        let viewer = ObjectId::new();
        let post = Post {
            id: Some(ObjectId::new()),
            author_id: ObjectId::new(),
            content: "hello".into(),
            media: vec![],
            tags: vec![],
            liked_by: vec![viewer],
            like_count: 1,
            comment_count: 0,
            visibility: "public".into(),
            created_at: DateTime::now(),
            updated_at: DateTime::now(),
        };
        assert!(PostView::from_post(post.clone(), Some(viewer)).is_liked);
        assert!(!PostView::from_post(post, None).is_liked);
    }
}
