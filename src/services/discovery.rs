//! Event discovery: listing, text/category search, hobby-ranked
//! recommendations and proximity search.
//!
//! All discovery paths are pure reads over the events collection. The two
//! ranking modes (relevance and proximity) are mutually exclusive; both
//! materialize the visible candidate set first and rank in memory, so their
//! listings report the materialized length as `total`. The plain search
//! listing pages in the store and reports a true count instead.

use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use tracing::instrument;

use crate::db::Collections;
use crate::domain::{Event, EventView};
use crate::error::{AppError, Result};
use crate::services::pagination::{Page, PageMeta};
use crate::services::search::{
    build_search_predicate, visibility_predicate, with_coordinates_predicate, SearchParams,
};
use crate::services::{geo, relevance};

#[derive(Clone)]
pub struct DiscoveryService {
    collections: Collections,
}

impl DiscoveryService {
    pub fn new(collections: Collections) -> Self {
        Self { collections }
    }

    /// Materialize events matching `predicate`, newest first. Rows that fail
    /// to decode are skipped with a warning; one malformed record must not
    /// take down a listing.
    async fn collect_events(&self, predicate: Document, limit: Option<i64>) -> Result<Vec<Event>> {
        // the builder borrows the collection, so it needs its own binding
        let raw_events = self.collections.events.clone_with_type::<Document>();
        let mut find = raw_events
            .find(predicate)
            .sort(doc! { "created_at": -1 });
        if let Some(limit) = limit {
            find = find.limit(limit);
        }

        let mut cursor = find.await?;
        let mut events = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            if let Some(event) = super::decode_lenient::<Event>(raw, "event") {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Paginated public listing, newest first. `total` is a true count over
    /// the visibility predicate.
    #[instrument(skip(self))]
    pub async fn list_events(&self, page: Page) -> Result<(Vec<EventView>, PageMeta)> {
        let page = page.clamped();
        let predicate = visibility_predicate();

        let mut cursor = self
            .collections
            .events
            .clone_with_type::<Document>()
            .find(predicate.clone())
            .sort(doc! { "created_at": -1 })
            .skip(page.skip())
            .limit(page.fetch_limit())
            .await?;

        let mut rows = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            if let Some(event) = super::decode_lenient::<Event>(raw, "event") {
                rows.push(event);
            }
        }
        let (events, has_more) = page.window(rows);

        let total = self
            .collections
            .events
            .count_documents(predicate)
            .await? as i64;

        let views = events.into_iter().map(EventView::from).collect();
        Ok((views, page.meta(total, has_more)))
    }

    /// Single event, annotated with the viewer's participation state.
    pub async fn get_event(
        &self,
        event_id: ObjectId,
        viewer: Option<ObjectId>,
    ) -> Result<EventView> {
        let event = self
            .collections
            .events
            .find_one(doc! { "_id": event_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {event_id} not found")))?;

        let mut view = EventView::from(event);
        if let Some(viewer) = viewer {
            let participating = self
                .collections
                .users
                .clone_with_type::<Document>()
                .find_one(doc! { "_id": viewer, "participated_events": event_id })
                .projection(doc! { "_id": 1 })
                .await?
                .is_some();
            view.is_participating = Some(participating);
        }
        Ok(view)
    }

    /// Hobby-ranked recommendations for a user. A user without hobbies gets
    /// the plain newest-first listing; that is the documented fallback, not
    /// an error.
    #[instrument(skip(self))]
    pub async fn recommend_events(
        &self,
        user_id: ObjectId,
        limit: usize,
    ) -> Result<(Vec<EventView>, PageMeta)> {
        let user = self
            .collections
            .users
            .find_one(doc! { "_id": user_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {user_id} not found")))?;

        let candidates = self.collect_events(visibility_predicate(), None).await?;

        let picked = relevance::recommend(candidates, &user.hobbies, limit, |event| {
            event.categories.as_slice()
        });

        let scored = !user.hobbies.is_empty();
        let views: Vec<EventView> = picked
            .into_iter()
            .map(|(event, score)| {
                let mut view = EventView::from(event);
                if scored {
                    view.relevance_score = Some(score);
                }
                view
            })
            .collect();

        let meta = PageMeta::materialized(views.len());
        Ok((views, meta))
    }

    /// Events within `radius_km` of a center point, closest first.
    /// Coordinates are validated before any query; entities without
    /// coordinates never make it into the candidate set.
    #[instrument(skip(self))]
    pub async fn nearby_events(
        &self,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Result<(Vec<EventView>, PageMeta)> {
        geo::validate_coordinates(lat, lng)?;
        if radius_km <= 0.0 {
            return Err(AppError::BadRequest(format!(
                "radius_km must be positive, got {radius_km}"
            )));
        }

        let candidates = self
            .collect_events(with_coordinates_predicate(), None)
            .await?;

        let hits = geo::nearby(candidates, (lat, lng), radius_km, limit, |event| {
            event
                .location
                .as_ref()
                .and_then(|loc| loc.coordinates.as_ref())
                .map(|point| (point.lat(), point.lng()))
        });

        let views: Vec<EventView> = hits
            .into_iter()
            .map(|hit| {
                let mut view = EventView::from(hit.item);
                view.distance_km = Some((hit.distance_km * 100.0).round() / 100.0);
                view
            })
            .collect();

        let meta = PageMeta::materialized(views.len());
        Ok((views, meta))
    }

    /// Text/category search with store-side pagination; `total` is a true
    /// count over the composed predicate.
    #[instrument(skip(self))]
    pub async fn search_events(
        &self,
        params: &SearchParams,
        page: Page,
    ) -> Result<(Vec<EventView>, PageMeta)> {
        let page = page.clamped();
        let predicate = build_search_predicate(params);

        let mut cursor = self
            .collections
            .events
            .clone_with_type::<Document>()
            .find(predicate.clone())
            .sort(doc! { "created_at": -1 })
            .skip(page.skip())
            .limit(page.fetch_limit())
            .await?;

        let mut rows = Vec::new();
        while let Some(raw) = cursor.try_next().await? {
            if let Some(event) = super::decode_lenient::<Event>(raw, "event") {
                rows.push(event);
            }
        }
        let (events, has_more) = page.window(rows);

        let total = self
            .collections
            .events
            .count_documents(predicate)
            .await? as i64;

        let views = events.into_iter().map(EventView::from).collect();
        Ok((views, page.meta(total, has_more)))
    }

    /// Owner lookup for authorization decisions.
    pub async fn event_owner(&self, event_id: ObjectId) -> Result<Option<ObjectId>> {
        let event = self
            .collections
            .events
            .find_one(doc! { "_id": event_id })
            .await?
            .ok_or_else(|| AppError::NotFound(format!("event {event_id} not found")))?;
        Ok(event.creator_id)
    }

    /// Delete an event and cascade to its reviews. Participation references
    /// on user records are left to the next reconciliation sweep; aggregates
    /// may read stale until it runs.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, event_id: ObjectId) -> Result<()> {
        let deleted = self
            .collections
            .events
            .delete_one(doc! { "_id": event_id })
            .await?;
        if deleted.deleted_count == 0 {
            return Err(AppError::NotFound(format!("event {event_id} not found")));
        }

        self.collections
            .reviews
            .delete_many(doc! { "event_id": event_id })
            .await?;
        Ok(())
    }
}
