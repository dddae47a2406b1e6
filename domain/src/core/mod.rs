//! Core domain concepts shared across all subdomains.
//!
//! - [`model::Model`] — backend model identifiers
//! - [`error::DomainError`] — turn invariant violations
//! - [`string`] / [`json`] — text helpers for model output

pub mod error;
pub mod json;
pub mod model;
pub mod string;
