//! Core types, configuration, and error handling for mrx.
//!
//! This crate provides the shared foundation used by all other mrx crates:
//! - [`MrxError`]: unified error type using `thiserror` and `miette`
//! - [`MrxConfig`]: configuration loaded from `.mrx.toml` and the environment
//! - Shared types: [`MergeRequest`], [`FileChange`], [`LineChange`],
//!   [`ExtractedResult`], [`ApiResponse`], [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{ExtractConfig, GitLabConfig, MrxConfig};
pub use error::MrxError;
pub use types::{
    ApiResponse, Author, CurrentUser, ExtractedResult, FileChange, LineChange, LineChangeType,
    MergeRequest, OutputFormat,
};

/// A convenience `Result` type for mrx operations.
pub type Result<T> = std::result::Result<T, MrxError>;
