//! Prompt domain
//!
//! Templates for the framing, routing, worker, judge and critic calls.

mod template;

pub use template::PromptTemplate;
