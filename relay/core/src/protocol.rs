//! Backend Wire Types
//!
//! Both endpoints take `POST` with a JSON body `{"text": ...}`. The
//! non-streaming endpoint answers `{"response": ...}`; the streaming endpoint
//! answers with raw text and no framing.

use serde::{Deserialize, Serialize};

/// Request body for both endpoints
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRequest {
    /// The user's message text
    pub text: String,
}

impl MessageRequest {
    /// Create a request for `text`
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Response body of the non-streaming endpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// The complete reply
    pub response: String,
}
