use async_trait::async_trait;
use mrx_core::{ApiResponse, MrxError};
use serde_json::Value;

/// The two GitLab calls the fetcher needs.
///
/// [`GitLabClient`](crate::client::GitLabClient) implements this over HTTP;
/// tests substitute in-memory fakes. Implementations return bodies as raw
/// JSON so the fetcher can validate record shape itself.
#[async_trait]
pub trait MergeRequestApi: Send + Sync {
    /// Fetch one page of merged merge requests, optionally restricted to an author.
    async fn merged_merge_requests(
        &self,
        page: u32,
        per_page: u32,
        author_id: Option<u64>,
    ) -> Result<ApiResponse<Value>, MrxError>;

    /// Fetch the per-file diffs of the merge request with project-scoped id `iid`.
    async fn merge_request_diffs(&self, iid: u64) -> Result<ApiResponse<Value>, MrxError>;
}

#[async_trait]
impl<T: MergeRequestApi + ?Sized> MergeRequestApi for &T {
    async fn merged_merge_requests(
        &self,
        page: u32,
        per_page: u32,
        author_id: Option<u64>,
    ) -> Result<ApiResponse<Value>, MrxError> {
        (**self).merged_merge_requests(page, per_page, author_id).await
    }

    async fn merge_request_diffs(&self, iid: u64) -> Result<ApiResponse<Value>, MrxError> {
        (**self).merge_request_diffs(iid).await
    }
}
