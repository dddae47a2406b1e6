//! Output formatting for completed turns

pub mod console;
