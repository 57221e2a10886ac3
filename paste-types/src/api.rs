//! Wire format of the remote pastebin API.
//!
//! Every response is wrapped in the same envelope:
//!
//! ```json
//! { "request": { "status_code": 200, "success": true },
//!   "response": { "message": "...", ... } }
//! ```
//!
//! Error responses carry the same envelope with an [`ApiError`] body.

use serde::{Deserialize, Serialize};

use crate::Paste;

/// Common accessor for response bodies.
pub trait ApiResponse {
    /// Human-readable message sent by the server.
    fn message(&self) -> &str;
}

/// Response envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResult<T> {
    /// Request metadata.
    pub request: ApiRequest,
    /// Response body.
    pub response: T,
}

/// Request metadata in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiRequest {
    /// Status code reported by the server.
    pub status_code: u16,
    /// Whether the server considers the request successful.
    pub success: bool,
}

/// Body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// Documentation links.
    #[serde(rename = "see-also", default, skip_serializing_if = "Option::is_none")]
    pub see_also: Option<Vec<String>>,
    /// Error message.
    pub message: String,
}

impl ApiResponse for ApiError {
    fn message(&self) -> &str {
        &self.message
    }
}

/// A paste as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiPaste {
    /// Paste title.
    pub title: String,
    /// Paste body.
    pub content: String,
    /// Listing flag (unused by this client).
    #[serde(default)]
    pub listed: Option<i64>,
    /// Server modification time, seconds since epoch.
    pub modified_on: i64,
}

impl ApiPaste {
    /// Convert into a cached paste.
    ///
    /// The server copy is authoritative, so the result is marked synced.
    pub fn into_paste(self) -> Paste {
        Paste {
            title: self.title,
            content: self.content,
            modified_on: self.modified_on,
            is_synced: true,
        }
    }
}

/// Body of `GET /{address}/pastebin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetPastebinResponse {
    /// All pastes of the account.
    pub pastebin: Vec<ApiPaste>,
    /// Server message.
    pub message: String,
}

impl ApiResponse for GetPastebinResponse {
    fn message(&self) -> &str {
        &self.message
    }
}

/// Body of `POST /{address}/pastebin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPasteData {
    /// Paste title.
    pub title: String,
    /// Paste body.
    pub content: String,
}

/// Response to `POST /{address}/pastebin`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPasteResponse {
    /// Title of the created or updated paste.
    pub title: String,
    /// Server message.
    pub message: String,
}

impl ApiResponse for PostPasteResponse {
    fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_pastebin_listing() {
        let body = r#"{
            "request": { "status_code": 200, "success": true },
            "response": {
                "message": "ok",
                "pastebin": [
                    { "title": "hello", "content": "world", "modified_on": 1700000000 },
                    { "title": "listed", "content": "x", "listed": 1, "modified_on": 1700000100 }
                ]
            }
        }"#;

        let result: ApiResult<GetPastebinResponse> = serde_json::from_str(body).unwrap();
        assert!(result.request.success);
        assert_eq!(result.response.pastebin.len(), 2);
        assert_eq!(result.response.pastebin[0].listed, None);
        assert_eq!(result.response.pastebin[1].listed, Some(1));
        assert_eq!(result.response.message(), "ok");
    }

    #[test]
    fn decode_error_body() {
        let body = r#"{
            "request": { "status_code": 401, "success": false },
            "response": { "message": "Bad API key.", "see-also": ["https://example.com"] }
        }"#;

        let result: ApiResult<ApiError> = serde_json::from_str(body).unwrap();
        assert!(!result.request.success);
        assert_eq!(result.request.status_code, 401);
        assert_eq!(result.response.message, "Bad API key.");
        assert_eq!(result.response.see_also.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn api_paste_converts_to_synced_paste() {
        let paste = ApiPaste {
            title: "t".into(),
            content: "c".into(),
            listed: None,
            modified_on: 99,
        }
        .into_paste();

        assert_eq!(paste, Paste::new("t", "c").with_modified_on(99).with_synced(true));
    }

    #[test]
    fn post_body_shape() {
        let body = serde_json::to_value(PostPasteData {
            title: "t".into(),
            content: "c".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({ "title": "t", "content": "c" }));
    }
}
