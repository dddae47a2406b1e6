//! Interactive chat module
//!
//! Provides a line-editor chat interface over persistent sessions.

mod repl;

pub use repl::ChatRepl;
