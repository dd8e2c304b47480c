pub mod discovery;
pub mod engagement;
pub mod geo;
pub mod pagination;
pub mod relevance;
pub mod reviews;
pub mod search;

pub use discovery::DiscoveryService;
pub use engagement::EngagementService;
pub use reviews::ReviewService;

/// Decode a raw document, skipping malformed rows with a warning instead of
/// aborting the whole listing. Write paths never use this.
pub(crate) fn decode_lenient<T: serde::de::DeserializeOwned>(
    raw: bson::Document,
    what: &str,
) -> Option<T> {
    match bson::from_document(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(error = %err, "skipping malformed {} document", what);
            None
        }
    }
}
