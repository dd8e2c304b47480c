//! End-to-end behavior of the discovery pipeline over in-memory data:
//! relevance ranking, proximity filtering and pagination composed the way
//! the service composes them.

use discovery_service::services::geo;
use discovery_service::services::pagination::Page;
use discovery_service::services::relevance;

#[derive(Debug, Clone)]
struct Venue {
    name: &'static str,
    categories: Vec<String>,
    coords: Option<(f64, f64)>,
}

fn fixture() -> Vec<Venue> {
    // newest-first, as the store returns them
    vec![
        Venue {
            name: "lantern-festival",
            categories: vec!["lễ hội".into(), "văn hóa".into()],
            coords: Some((10.7769, 106.7009)), // Saigon
        },
        Venue {
            name: "street-food-tour",
            categories: vec!["ẩm thực".into()],
            coords: Some((10.8231, 106.6297)), // Saigon suburb
        },
        Venue {
            name: "mountain-trek",
            categories: vec!["du lịch".into(), "phượt".into()],
            coords: Some((21.0285, 105.8542)), // Hanoi
        },
        Venue {
            name: "archived-fair",
            categories: vec!["hội chợ".into()],
            coords: None,
        },
    ]
}

#[test]
fn test_recommendations_rank_by_interest_overlap() {
    let venues = fixture();
    let interests = vec!["văn hóa".to_string(), "ẩm thực".to_string()];

    let picked = relevance::recommend(venues, &interests, 10, |v| v.categories.as_slice());

    // exact "văn hóa" (10) + related "lễ hội" (2) beats exact "ẩm thực" (10)
    assert_eq!(picked[0].0.name, "lantern-festival");
    assert_eq!(picked[0].1, 12.0);
    assert_eq!(picked[1].0.name, "street-food-tour");
    assert_eq!(picked[1].1, 10.0);
    // zero-score venues never surface in recommendations
    assert!(picked.iter().all(|(v, _)| v.name != "mountain-trek"));
    assert!(picked.iter().all(|(v, _)| v.name != "archived-fair"));
}

#[test]
fn test_recommendations_without_interests_fall_back_to_recency() {
    let venues = fixture();
    let picked = relevance::recommend(venues, &[], 2, |v| v.categories.as_slice());

    assert_eq!(picked.len(), 2);
    assert_eq!(picked[0].0.name, "lantern-festival");
    assert_eq!(picked[1].0.name, "street-food-tour");
    assert!(picked.iter().all(|(_, score)| *score == 0.0));
}

#[test]
fn test_nearby_filters_and_sorts_by_distance() {
    let venues = fixture();
    // center on Saigon, 50km radius: two hits, Hanoi and the record
    // without coordinates are excluded
    let hits = geo::nearby(venues, (10.7769, 106.7009), 50.0, 10, |v| v.coords);

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].item.name, "lantern-festival");
    assert!(hits[0].distance_km < 0.001);
    assert_eq!(hits[1].item.name, "street-food-tour");
    assert!(hits[1].distance_km > 0.0 && hits[1].distance_km < 50.0);
}

#[test]
fn test_nearby_limit_keeps_closest() {
    let venues = fixture();
    let hits = geo::nearby(venues, (10.7769, 106.7009), 2000.0, 1, |v| v.coords);

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].item.name, "lantern-festival");
}

#[test]
fn test_pagination_windows_a_ranked_listing() {
    // 15 scored rows paged 10 at a time, over-fetching one row per page
    let rows: Vec<i32> = (0..15).collect();

    let first = Page::new(1, 10);
    let fetched: Vec<i32> = rows
        .iter()
        .copied()
        .skip(first.skip() as usize)
        .take(first.fetch_limit() as usize)
        .collect();
    let (window, has_more) = first.window(fetched);
    assert_eq!(window.len(), 10);
    assert!(has_more);

    let second = Page::new(2, 10);
    let fetched: Vec<i32> = rows
        .iter()
        .copied()
        .skip(second.skip() as usize)
        .take(second.fetch_limit() as usize)
        .collect();
    let (window, has_more) = second.window(fetched);
    assert_eq!(window, vec![10, 11, 12, 13, 14]);
    assert!(!has_more);

    let meta = second.meta(rows.len() as i64, has_more);
    assert_eq!(meta.total, 15);
    assert!(!meta.has_more);
}
