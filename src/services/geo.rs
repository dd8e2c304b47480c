//! Great-circle distance and proximity filtering.

use crate::error::{AppError, Result};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two latitude/longitude points, in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Reject out-of-range coordinates before any query is issued.
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::BadRequest(format!(
            "latitude must be between -90 and 90, got {lat}"
        )));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(AppError::BadRequest(format!(
            "longitude must be between -180 and 180, got {lng}"
        )));
    }
    Ok(())
}

/// An item annotated with its distance from the search center.
#[derive(Debug, Clone)]
pub struct Nearby<T> {
    pub item: T,
    pub distance_km: f64,
}

/// Keep items within `radius_km` of `center`, sorted ascending by distance.
///
/// Items without coordinates are skipped silently; a missing location is
/// normal for older records, not an error. Distance ties keep input order.
pub fn nearby<T, F>(
    items: Vec<T>,
    center: (f64, f64),
    radius_km: f64,
    limit: usize,
    coords: F,
) -> Vec<Nearby<T>>
where
    F: Fn(&T) -> Option<(f64, f64)>,
{
    let (center_lat, center_lng) = center;
    let mut hits: Vec<Nearby<T>> = items
        .into_iter()
        .filter_map(|item| {
            let (lat, lng) = coords(&item)?;
            let distance_km = haversine_km(center_lat, center_lng, lat, lng);
            (distance_km <= radius_km).then_some(Nearby { item, distance_km })
        })
        .collect();

    // stable sort: equal distances keep input order
    hits.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(limit);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_distance_to_self_is_zero() {
        assert!(haversine_km(10.762, 106.66, 10.762, 106.66).abs() < EPS);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let forward = haversine_km(21.0285, 105.8542, 10.7769, 106.7009);
        let backward = haversine_km(10.7769, 106.7009, 21.0285, 105.8542);
        assert!((forward - backward).abs() < EPS);
    }

    #[test]
    fn test_known_distance_hanoi_saigon() {
        // Hanoi to Ho Chi Minh City is roughly 1,140 km great-circle
        let d = haversine_km(21.0285, 105.8542, 10.7769, 106.7009);
        assert!((1100.0..1200.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(10.0, 106.0).is_ok());
        assert!(validate_coordinates(90.0, -180.0).is_ok());
        assert!(validate_coordinates(91.0, 0.0).is_err());
        assert!(validate_coordinates(0.0, 180.5).is_err());
    }

    #[test]
    fn test_nearby_filters_sorts_and_truncates() {
        let center = (10.0, 106.0);
        let items = vec![
            ("far", Some((10.5, 106.0))),   // ~55 km
            ("near", Some((10.01, 106.0))), // ~1.1 km
            ("none", None),
            ("out", Some((20.0, 106.0))), // ~1100 km
        ];
        let hits = nearby(items, center, 100.0, 10, |i| i.1);
        let names: Vec<&str> = hits.iter().map(|h| h.item.0).collect();
        assert_eq!(names, vec!["near", "far"]);
        assert!(hits[0].distance_km <= hits[1].distance_km);

        let capped = nearby(
            vec![("a", Some((10.01, 106.0))), ("b", Some((10.02, 106.0)))],
            center,
            100.0,
            1,
            |i| i.1,
        );
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].item.0, "a");
    }

    #[test]
    fn test_nearby_all_within_radius() {
        let center = (10.0, 106.0);
        let items: Vec<(u32, Option<(f64, f64)>)> = (0..5)
            .map(|i| (i, Some((10.0 + i as f64 * 0.01, 106.0))))
            .collect();
        let hits = nearby(items, center, 10.0, 10, |i| i.1);
        for hit in &hits {
            assert!(hit.distance_km <= 10.0);
        }
        // strictly ascending for distinct distances
        for pair in hits.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
    }

    #[test]
    fn test_nearby_ties_keep_input_order() {
        let center = (10.0, 106.0);
        let items = vec![("first", Some((10.0, 106.0))), ("second", Some((10.0, 106.0)))];
        let hits = nearby(items, center, 1.0, 10, |i| i.1);
        assert_eq!(hits[0].item.0, "first");
        assert_eq!(hits[1].item.0, "second");
    }
}
