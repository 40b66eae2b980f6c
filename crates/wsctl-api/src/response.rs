//! Response envelopes from the session platform.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wsctl_core::Session;

/// Envelope of the session list call.
///
/// Sessions are keyed by name with no implied ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionList {
    #[serde(default)]
    pub sessions: HashMap<String, Session>,
}

/// Structured error body returned with non-2xx responses.
///
/// Shape: `{"error": {"code": 1403, "message": "..."}}`. Servers under
/// proxies sometimes emit plain text instead; the HTTP client falls back
/// to the raw body when this fails to parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

/// Inner error payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Platform error code
    #[serde(default)]
    pub code: Option<i64>,

    /// Human-readable message, forwarded verbatim to notifications
    #[serde(default)]
    pub message: String,
}

impl ErrorEnvelope {
    /// Extracts the server message from a raw response body.
    ///
    /// Falls back to the trimmed raw body when the envelope does not
    /// parse, and to a placeholder when the body is empty.
    pub fn message_from_body(body: &str) -> String {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) if !envelope.error.message.is_empty() => envelope.error.message,
            _ => {
                let raw = body.trim();
                if raw.is_empty() {
                    "no error detail provided".to_string()
                } else {
                    raw.to_string()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_list_parses_keyed_map() {
        let json = r#"{
            "sessions": {
                "anna-flights-8a9f2c1d": {
                    "name": "anna-flights-8a9f2c1d",
                    "status": {"state": "running"},
                    "started": "2026-03-01T09:30:00Z",
                    "image": "registry.example.org/py:3.12",
                    "url": "https://sessions.example.org/anna-flights-8a9f2c1d"
                }
            }
        }"#;
        let list: SessionList = serde_json::from_str(json).unwrap();
        assert_eq!(list.sessions.len(), 1);
        let session = list.sessions.get("anna-flights-8a9f2c1d").unwrap();
        assert!(session.state().is_running());
    }

    #[test]
    fn test_empty_session_list() {
        let list: SessionList = serde_json::from_str("{}").unwrap();
        assert!(list.sessions.is_empty());
    }

    #[test]
    fn test_error_envelope_message() {
        let body = r#"{"error": {"code": 1403, "message": "resource quota has been exceeded"}}"#;
        assert_eq!(
            ErrorEnvelope::message_from_body(body),
            "resource quota has been exceeded"
        );
    }

    #[test]
    fn test_error_envelope_falls_back_to_raw_body() {
        assert_eq!(
            ErrorEnvelope::message_from_body("502 Bad Gateway\n"),
            "502 Bad Gateway"
        );
    }

    #[test]
    fn test_error_envelope_empty_body() {
        assert_eq!(
            ErrorEnvelope::message_from_body(""),
            "no error detail provided"
        );
    }
}
