use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Request,
    Response,
    Notification,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct McpError {
    pub code: i64,
    pub message: String,
}

impl McpError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// One message between agents and servers. Consumed once, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct McpMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
    pub timestamp: DateTime<Utc>,
}

impl McpMessage {
    fn new(kind: MessageKind, from: &str, to: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.to_string(),
            to: to.to_string(),
            kind,
            method: None,
            params: None,
            result: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn request(from: &str, to: &str, method: &str, params: Value) -> Self {
        Self {
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::new(MessageKind::Request, from, to)
        }
    }

    pub fn notification(from: &str, to: &str, method: &str, params: Value) -> Self {
        Self {
            method: Some(method.to_string()),
            params: Some(params),
            ..Self::new(MessageKind::Notification, from, to)
        }
    }

    /// Reply to this message: sender and recipient swapped, same id.
    pub fn response(&self, outcome: Result<Value, McpError>) -> Self {
        let (result, error) = match outcome {
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            id: self.id.clone(),
            method: self.method.clone(),
            result,
            error,
            ..Self::new(MessageKind::Response, &self.to, &self.from)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_swaps_parties_and_keeps_id() {
        let request = McpMessage::request("ui", "file-operations", "tools/list", json!({}));
        let response = request.response(Ok(json!({"tools": []})));

        assert_eq!(response.id, request.id);
        assert_eq!(response.from, "file-operations");
        assert_eq!(response.to, "ui");
        assert_eq!(response.kind, MessageKind::Response);
        assert!(response.error.is_none());
    }

    #[test]
    fn test_wire_format() {
        let message = McpMessage::notification("a", "b", "files/changed", json!({"path": "/a.ts"}));
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "notification");
        assert_eq!(value["method"], "files/changed");
        assert!(value.get("result").is_none());
        assert!(value["timestamp"].is_string());

        let decoded: McpMessage = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, message);
    }
}
