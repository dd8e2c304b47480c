//! Predicate composition for event search.
//!
//! Builds a single filter document from optional parameters. Absent
//! parameters contribute nothing; present groups are ANDed together, and a
//! visibility predicate is always included for public listings.

use bson::{doc, Document};
use serde::Deserialize;

/// Optional search parameters, usually bound from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Free-text query matched across name and long-text content fields
    pub q: Option<String>,
    pub city: Option<String>,
    pub province: Option<String>,
    /// Comma-separated category list
    pub categories: Option<String>,
}

impl SearchParams {
    pub fn category_list(&self) -> Vec<String> {
        self.categories
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Visible, or created before the visibility field existed.
pub fn visibility_predicate() -> Document {
    doc! {
        "$or": [
            { "is_visible": true },
            { "is_visible": { "$exists": false } },
        ]
    }
}

/// Escape regex metacharacters so user input matches as a literal substring.
fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if "\\.+*?()|[]{}^$".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring predicate on one field.
fn substring_match(field: &str, value: &str) -> Document {
    doc! { field: { "$regex": escape_regex(value), "$options": "i" } }
}

/// Case-insensitive exact predicate (anchored) on one field.
fn exact_match(field: &str, value: &str) -> Document {
    doc! { field: { "$regex": format!("^{}$", escape_regex(value)), "$options": "i" } }
}

/// Compose the full search predicate for a public event listing.
pub fn build_search_predicate(params: &SearchParams) -> Document {
    let mut conditions = vec![visibility_predicate()];

    if let Some(q) = params.q.as_deref().filter(|s| !s.trim().is_empty()) {
        let q = q.trim();
        conditions.push(doc! {
            "$or": [
                substring_match("name", q),
                substring_match("content.intro", q),
                substring_match("content.history", q),
            ]
        });
    }

    if let Some(city) = params.city.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push(substring_match("location.city", city.trim()));
    }

    if let Some(province) = params.province.as_deref().filter(|s| !s.trim().is_empty()) {
        conditions.push(substring_match("location.province", province.trim()));
    }

    let categories = params.category_list();
    if !categories.is_empty() {
        let alternatives: Vec<Document> = categories
            .iter()
            .map(|cat| exact_match("categories", cat))
            .collect();
        conditions.push(doc! { "$or": alternatives });
    }

    if conditions.len() == 1 {
        conditions.into_iter().next().unwrap_or_default()
    } else {
        doc! { "$and": conditions }
    }
}

/// Predicate for the nearby listing: visible events that carry coordinates.
pub fn with_coordinates_predicate() -> Document {
    doc! {
        "$and": [
            { "location.coordinates": { "$ne": null } },
            visibility_predicate(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_params_reduce_to_visibility() {
        let predicate = build_search_predicate(&SearchParams::default());
        assert_eq!(predicate, visibility_predicate());
    }

    #[test]
    fn test_text_query_spans_name_and_content_fields() {
        let params = SearchParams {
            q: Some("lantern".into()),
            ..Default::default()
        };
        let predicate = build_search_predicate(&params);
        let groups = predicate.get_array("$and").unwrap();
        assert_eq!(groups.len(), 2);

        let text = groups[1].as_document().unwrap();
        let alternatives = text.get_array("$or").unwrap();
        assert_eq!(alternatives.len(), 3);
        let first = alternatives[0].as_document().unwrap();
        let name = first.get_document("name").unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), "lantern");
        assert_eq!(name.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_all_groups_are_and_combined() {
        let params = SearchParams {
            q: Some("temple".into()),
            city: Some("Huế".into()),
            province: Some("Thừa Thiên".into()),
            categories: Some("văn hóa,lễ hội".into()),
        };
        let predicate = build_search_predicate(&params);
        let groups = predicate.get_array("$and").unwrap();
        // visibility + text + city + province + categories
        assert_eq!(groups.len(), 5);
    }

    #[test]
    fn test_categories_are_anchored_case_insensitive_or() {
        let params = SearchParams {
            categories: Some("Food, Music".into()),
            ..Default::default()
        };
        let predicate = build_search_predicate(&params);
        let groups = predicate.get_array("$and").unwrap();
        let cats = groups[1].as_document().unwrap().get_array("$or").unwrap();
        assert_eq!(cats.len(), 2);
        let first = cats[0]
            .as_document()
            .unwrap()
            .get_document("categories")
            .unwrap();
        assert_eq!(first.get_str("$regex").unwrap(), "^Food$");
        assert_eq!(first.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn test_blank_parameters_are_omitted() {
        let params = SearchParams {
            q: Some("   ".into()),
            city: Some(String::new()),
            categories: Some(" , ".into()),
            ..Default::default()
        };
        let predicate = build_search_predicate(&params);
        assert_eq!(predicate, visibility_predicate());
    }

    #[test]
    fn test_regex_metacharacters_match_literally() {
        let params = SearchParams {
            q: Some("what? (really)".into()),
            ..Default::default()
        };
        let predicate = build_search_predicate(&params);
        let groups = predicate.get_array("$and").unwrap();
        let text = groups[1].as_document().unwrap().get_array("$or").unwrap();
        let name = text[0]
            .as_document()
            .unwrap()
            .get_document("name")
            .unwrap();
        assert_eq!(name.get_str("$regex").unwrap(), r"what\? \(really\)");
    }

    #[test]
    fn test_with_coordinates_predicate_requires_location() {
        let predicate = with_coordinates_predicate();
        let groups = predicate.get_array("$and").unwrap();
        assert_eq!(groups.len(), 2);
        let coords = groups[0].as_document().unwrap();
        assert!(coords.contains_key("location.coordinates"));
    }
}
