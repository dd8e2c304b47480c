//! Response envelope shared by every endpoint.

use serde::Serialize;

use crate::services::pagination::PageMeta;

#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> DataResponse<T> {
    pub fn ok(data: T) -> Self {
        DataResponse {
            success: true,
            data,
            pagination: None,
            message: None,
        }
    }

    pub fn paginated(data: T, pagination: PageMeta) -> Self {
        DataResponse {
            success: true,
            data,
            pagination: Some(pagination),
            message: None,
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        DataResponse {
            success: true,
            data,
            pagination: None,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::pagination::Page;

    #[test]
    fn test_envelope_shape() {
        let body = DataResponse::paginated(vec![1, 2, 3], Page::new(1, 10).meta(15, true));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
        assert_eq!(json["pagination"]["total"], 15);
        assert_eq!(json["pagination"]["has_more"], true);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_plain_envelope_omits_pagination() {
        let json = serde_json::to_value(DataResponse::ok("fine")).unwrap();
        assert!(json.get("pagination").is_none());
    }
}
