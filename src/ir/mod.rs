//! Canonical IR data model and its JSON wire adapter.

pub mod json;
pub mod types;

pub use json::parse_document;
pub use types::*;
