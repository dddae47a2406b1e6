//! Backend generation vocabulary
//!
//! Provider-neutral request/response types exchanged with the language-model
//! backend through the application layer's `LlmGateway` port.

pub mod media;
pub mod request;
pub mod response;
pub mod stream;

pub use media::{MediaJob, MediaJobRequest, MediaJobStatus};
pub use request::{ContentPart, GenerateRequest};
pub use response::{GenerateResponse, InlineMedia};
pub use stream::StreamEvent;
