//! Gemini backend adapter
//!
//! Talks to the Generative Language REST API:
//!
//! - `models/{model}:generateContent` for single calls
//! - `models/{model}:streamGenerateContent?alt=sse` for the judge stream
//! - `models/{model}:predictLongRunning` plus operation polling for video

pub mod client;
pub mod error;
pub mod gateway;
pub mod protocol;

pub use client::{GeminiClient, GeminiSettings};
pub use error::GeminiError;
pub use gateway::GeminiLlmGateway;
