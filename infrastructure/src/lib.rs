//! Infrastructure layer for the consensus engine
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer, plus configuration file loading.

pub mod attachments;
pub mod config;
pub mod gemini;
pub mod logging;
pub mod persistence;

// Re-export commonly used types
pub use attachments::{AttachmentError, load_attachment, load_attachments};
pub use config::{
    ConfigLoader, ConfigValidationError, FileBackendConfig, FileConfig, FileLoggingConfig,
    FileModelsConfig, FileOutputConfig, FilePipelineConfig, FileReplConfig,
    FileStorageConfig, expand_home,
};
pub use gemini::{GeminiClient, GeminiError, GeminiLlmGateway, GeminiSettings};
pub use logging::JsonlConversationLogger;
pub use persistence::JsonFileSessionStore;
