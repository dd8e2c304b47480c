//! Hobby-based relevance scoring for event discovery.
//!
//! Scores an event's category tags against a user's interest tags. Every
//! (interest, tag) pair contributes independently; repeated tags are not
//! deduplicated, so the score scales with list length. That is intentional,
//! observed product behavior.

use std::collections::HashSet;
use std::sync::LazyLock;

const EXACT_MATCH_SCORE: f64 = 10.0;
const PARTIAL_MATCH_SCORE: f64 = 5.0;
const RELATED_MATCH_SCORE: f64 = 2.0;

/// Curated undirected synonym pairs, normalized lowercase.
static RELATED_PAIRS: LazyLock<HashSet<(&'static str, &'static str)>> = LazyLock::new(|| {
    [
        ("văn hóa", "lễ hội"),
        ("văn hóa", "truyền thống"),
        ("âm nhạc", "ca nhạc"),
        ("âm nhạc", "nhạc sống"),
        ("thể thao", "bóng đá"),
        ("thể thao", "chạy bộ"),
        ("nghệ thuật", "hội họa"),
        ("nghệ thuật", "triển lãm"),
        ("ẩm thực", "món ăn"),
        ("ẩm thực", "nấu ăn"),
        ("du lịch", "khám phá"),
        ("du lịch", "phượt"),
        ("tâm linh", "thiền"),
        ("tâm linh", "chùa"),
        ("công nghệ", "khoa học"),
        ("công nghệ", "ai"),
    ]
    .into_iter()
    .collect()
});

/// Undirected lookup in the curated synonym table.
fn are_related(a: &str, b: &str) -> bool {
    RELATED_PAIRS.contains(&(a, b)) || RELATED_PAIRS.contains(&(b, a))
}

/// Relevance score between a user's interests and an entity's category tags.
///
/// Per normalized (interest, tag) pair: 10 for an exact match, 5 if one
/// string contains the other, 2 for a curated synonym pair, else 0. Empty
/// input on either side scores 0.
pub fn relevance_score(interests: &[String], tags: &[String]) -> f64 {
    if interests.is_empty() || tags.is_empty() {
        return 0.0;
    }

    let interests: Vec<String> = interests
        .iter()
        .map(|s| s.trim().to_lowercase())
        .collect();
    let tags: Vec<String> = tags.iter().map(|s| s.trim().to_lowercase()).collect();

    let mut score = 0.0;
    for interest in &interests {
        for tag in &tags {
            if interest == tag {
                score += EXACT_MATCH_SCORE;
            } else if interest.contains(tag.as_str()) || tag.contains(interest.as_str()) {
                score += PARTIAL_MATCH_SCORE;
            } else if are_related(interest, tag) {
                score += RELATED_MATCH_SCORE;
            }
        }
    }
    score
}

/// Sort items descending by relevance score. The sort is stable, so equal
/// scores keep the input's relative order; callers pass newest-first input
/// and ties fall back to recency.
pub fn rank_by_relevance<T, F>(items: Vec<T>, interests: &[String], categories: F) -> Vec<(T, f64)>
where
    F: Fn(&T) -> &[String],
{
    let mut scored: Vec<(T, f64)> = items
        .into_iter()
        .map(|item| {
            let score = relevance_score(interests, categories(&item));
            (item, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

/// Rank, drop zero-score items, truncate to `limit`.
///
/// An empty interest list bypasses scoring entirely and returns the input
/// (newest-first) order truncated to `limit` with zero scores attached; a
/// user without hobbies gets the plain listing, not an error.
pub fn recommend<T, F>(
    items: Vec<T>,
    interests: &[String],
    limit: usize,
    categories: F,
) -> Vec<(T, f64)>
where
    F: Fn(&T) -> &[String],
{
    if interests.is_empty() {
        return items.into_iter().take(limit).map(|i| (i, 0.0)).collect();
    }

    let mut ranked = rank_by_relevance(items, interests, categories);
    ranked.retain(|(_, score)| *score > 0.0);
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_scores_ten() {
        assert_eq!(
            relevance_score(&strings(&["festival"]), &strings(&["festival"])),
            10.0
        );
    }

    #[test]
    fn test_exact_match_is_case_insensitive() {
        assert_eq!(
            relevance_score(&strings(&["Festival"]), &strings(&[" FESTIVAL "])),
            10.0
        );
    }

    #[test]
    fn test_substring_scores_five() {
        assert_eq!(
            relevance_score(&strings(&["music"]), &strings(&["live music"])),
            5.0
        );
        // containment in either direction
        assert_eq!(
            relevance_score(&strings(&["live music"]), &strings(&["music"])),
            5.0
        );
    }

    #[test]
    fn test_related_pair_scores_two_both_directions() {
        assert_eq!(
            relevance_score(&strings(&["văn hóa"]), &strings(&["lễ hội"])),
            2.0
        );
        assert_eq!(
            relevance_score(&strings(&["lễ hội"]), &strings(&["văn hóa"])),
            2.0
        );
    }

    #[test]
    fn test_unrelated_scores_zero() {
        assert_eq!(
            relevance_score(&strings(&["culture"]), &strings(&["festival"])),
            0.0
        );
    }

    #[test]
    fn test_empty_sides_score_zero() {
        assert_eq!(relevance_score(&[], &strings(&["festival"])), 0.0);
        assert_eq!(relevance_score(&strings(&["festival"]), &[]), 0.0);
    }

    #[test]
    fn test_duplicates_multiply_the_score() {
        // Repeated interests each contribute independently
        assert_eq!(
            relevance_score(&strings(&["festival", "festival"]), &strings(&["festival"])),
            20.0
        );
        assert_eq!(
            relevance_score(&strings(&["festival"]), &strings(&["festival", "festival"])),
            20.0
        );
    }

    #[test]
    fn test_pairs_accumulate() {
        // exact (10) + substring (5)
        let score = relevance_score(
            &strings(&["music"]),
            &strings(&["music", "music festival"]),
        );
        assert_eq!(score, 15.0);
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let items = vec![("a", vec!["food".to_string()]), ("b", vec!["food".to_string()])];
        let ranked = rank_by_relevance(items, &strings(&["food"]), |i| &i.1);
        assert_eq!(ranked[0].0 .0, "a");
        assert_eq!(ranked[1].0 .0, "b");
    }

    #[test]
    fn test_rank_orders_descending() {
        let items = vec![
            ("weak", vec!["live music".to_string()]),
            ("strong", vec!["music".to_string()]),
        ];
        let ranked = rank_by_relevance(items, &strings(&["music"]), |i| &i.1);
        assert_eq!(ranked[0].0 .0, "strong");
        assert_eq!(ranked[0].1, 10.0);
        assert_eq!(ranked[1].1, 5.0);
    }

    #[test]
    fn test_recommend_drops_zero_scores_and_truncates() {
        let items = vec![
            ("hit1", vec!["food".to_string()]),
            ("miss", vec!["tech".to_string()]),
            ("hit2", vec!["street food".to_string()]),
        ];
        let picked = recommend(items, &strings(&["food"]), 1, |i| &i.1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].0 .0, "hit1");
    }

    #[test]
    fn test_recommend_without_interests_returns_input_order() {
        let items = vec![("newest", Vec::<String>::new()), ("older", Vec::new())];
        let picked = recommend(items, &[], 10, |i| &i.1);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].0 .0, "newest");
        assert_eq!(picked[0].1, 0.0);
    }

    #[test]
    fn test_score_is_non_negative() {
        let score = relevance_score(
            &strings(&["a", "b", "c"]),
            &strings(&["x", "y", "z"]),
        );
        assert!(score >= 0.0);
    }
}
