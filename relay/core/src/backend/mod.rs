//! LLM Backend Integration
//!
//! The inference side of relay: the daemon answers `/api/message` and
//! `/api/message_stream` by forwarding the user's text to an LLM through the
//! [`LlmBackend`] trait.
//!
//! # Available Backends
//!
//! - **Ollama**: Local LLM server (default)
//!
//! # Usage
//!
//! ```ignore
//! use relay_core::backend::{OllamaBackend, LlmBackend, LlmRequest};
//!
//! let backend = OllamaBackend::from_env()?;
//! let request = LlmRequest::new("Hello!", "llama3.2");
//! let rx = backend.send_streaming(&request).await?;
//! ```

mod ollama;
mod traits;

pub use ollama::OllamaBackend;
pub use traits::{LlmBackend, LlmRequest, LlmResponse, StreamingToken};
