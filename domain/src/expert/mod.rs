//! Expert catalog
//!
//! An expert is one backend persona/model combination with a fixed role and
//! instruction. The catalog is built once at process start and never
//! mutated; the router picks from it and the worker pool dispatches on each
//! expert's [`ExpertKind`].

pub mod entities;
pub mod registry;

pub use entities::{ExpertKind, ExpertProfile, ExpertTool};
pub use registry::ExpertRegistry;
