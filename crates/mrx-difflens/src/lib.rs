//! Diff line classification and path filtering.
//!
//! [`classifier`] turns raw diff text into ordered add/delete line changes;
//! [`filter`] removes files matching skip patterns from extracted results.

pub mod classifier;
pub mod filter;

pub use classifier::{classify, classify_value};
