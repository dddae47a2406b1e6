//! Consensus output helpers
//!
//! Pure parsing over model text: the judge's confidence marker and action
//! drafts embedded by workers in fenced JSON blocks.

pub mod action;
pub mod confidence;

pub use action::{ActionDraft, ActionKind, extract_action_draft};
pub use confidence::{Confidence, extract_confidence};
