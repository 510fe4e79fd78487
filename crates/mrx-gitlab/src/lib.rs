//! GitLab transport and the merged merge request extraction pipeline.
//!
//! - [`client::GitLabClient`]: authenticated REST client (reqwest)
//! - [`api::MergeRequestApi`]: the seam the fetcher depends on
//! - [`fetcher::MergeRequestFetcher`]: pagination, diff retrieval, classification

pub mod api;
pub mod client;
pub mod fetcher;

pub use api::MergeRequestApi;
pub use client::GitLabClient;
pub use fetcher::{FetchOptions, MergeRequestFetcher};
