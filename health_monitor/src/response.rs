//! JSON envelope shared by the HTTP API and its clients

use serde::{Deserialize, Serialize};

/// `{success, message?, data?, error?}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn message_with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_shape() {
        let body = serde_json::to_value(ApiResponse::failure("Service x non trouvé", None)).unwrap();
        assert_eq!(body, json!({"success": false, "message": "Service x non trouvé"}));
    }

    #[test]
    fn test_data_shape() {
        let body = serde_json::to_value(ApiResponse::data(vec![1, 2])).unwrap();
        assert_eq!(body, json!({"success": true, "data": [1, 2]}));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Payload {
        id: u32,
    }

    #[test]
    fn test_envelope_with_non_default_data_deserializes() {
        let with_data: ApiResponse<Payload> =
            serde_json::from_value(json!({"success": true, "data": {"id": 7}})).unwrap();
        assert_eq!(with_data.data, Some(Payload { id: 7 }));

        let without_data: ApiResponse<Payload> =
            serde_json::from_value(json!({"success": false, "message": "boom"})).unwrap();
        assert_eq!(without_data.data, None);
        assert_eq!(without_data.message.as_deref(), Some("boom"));
    }
}
