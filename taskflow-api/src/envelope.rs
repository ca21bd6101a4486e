/// Success response envelope
///
/// Every successful response is `{"success": true, "message"?: ..., ...}`
/// with the payload fields flattened alongside:
///
/// ```json
/// { "success": true, "message": "Group created successfully", "group": { ... } }
/// ```

use serde::Serialize;

/// Successful response with a flattened payload
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    /// Payload without a message
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data,
        }
    }

    /// Payload with a human-readable message
    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
        }
    }
}

/// Payload for message-only responses
#[derive(Debug, Default, Serialize)]
pub struct Empty {}

impl Envelope<Empty> {
    /// Message-only success
    pub fn message(message: impl Into<String>) -> Self {
        Self::with_message(message, Empty {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Count {
        count: usize,
    }

    #[test]
    fn test_payload_is_flattened() {
        let value = serde_json::to_value(Envelope::ok(Count { count: 2 })).unwrap();
        assert_eq!(value, json!({"success": true, "count": 2}));
    }

    #[test]
    fn test_message_only() {
        let value = serde_json::to_value(Envelope::message("Group deleted successfully")).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "message": "Group deleted successfully"})
        );
    }
}
