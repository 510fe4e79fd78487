use std::time::Duration;

use async_trait::async_trait;
use mrx_core::{ApiResponse, CurrentUser, GitLabConfig, MrxError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;

use crate::api::MergeRequestApi;

/// Status reported for failures that never produced an HTTP response.
pub const NETWORK_ERROR_STATUS: u16 = 500;

/// Authenticated GitLab REST client.
///
/// Configuration is validated once, in [`GitLabClient::new`]; every request
/// carries the `PRIVATE-TOKEN` header.
///
/// # Examples
///
/// ```
/// use mrx_core::GitLabConfig;
/// use mrx_gitlab::client::GitLabClient;
///
/// let config = GitLabConfig {
///     private_token: "token123".into(),
///     project_id: "12345".into(),
///     ..GitLabConfig::default()
/// };
/// let client = GitLabClient::new(&config).unwrap();
/// assert_eq!(
///     client.merged_merge_requests_path(2, 50, Some(7)),
///     "/api/v4/projects/12345/merge_requests?state=merged&page=2&per_page=50&author_id=7"
/// );
/// ```
pub struct GitLabClient {
    http: reqwest::Client,
    base_url: String,
    project: String,
}

impl GitLabClient {
    /// Create a client from connection settings.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] if the base URL, token, or project id is
    /// blank or the token is not a valid header value, and
    /// [`MrxError::Api`] if the HTTP client cannot be built.
    pub fn new(config: &GitLabConfig) -> Result<Self, MrxError> {
        config.validate()?;

        let mut token = HeaderValue::from_str(config.private_token.trim())
            .map_err(|_| MrxError::Config("private_token contains invalid characters".into()))?;
        token.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("private-token"), token);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("mrx/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                MrxError::api(
                    format!("failed to create HTTP client: {e}"),
                    NETWORK_ERROR_STATUS,
                )
            })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            project: urlencoding::encode(config.project_id.trim()).into_owned(),
        })
    }

    /// Issue a GET against `path` (relative to the instance root) and decode
    /// the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Api`] with status 500 on network failure, the
    /// response status on a non-success reply (with the body attached), or the
    /// response status if the body is not valid JSON.
    pub async fn get(&self, path: &str) -> Result<ApiResponse<Value>, MrxError> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, "GET");

        let response = self.http.get(&url).send().await.map_err(|e| {
            let status = e
                .status()
                .map_or(NETWORK_ERROR_STATUS, |s| s.as_u16());
            MrxError::api(format!("GitLab API request failed: {e}"), status)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok().filter(|b| !b.is_empty());
            return Err(MrxError::Api {
                message: format!("GitLab API request failed with status {status}"),
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await.map_err(|e| {
            MrxError::api(
                format!("failed to decode GitLab response: {e}"),
                status.as_u16(),
            )
        })?;

        Ok(ApiResponse::new(data, status.as_u16()))
    }

    /// Fetch the user that owns the configured token.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Api`] on transport failures or an unexpected body.
    pub async fn current_user(&self) -> Result<CurrentUser, MrxError> {
        let response = self.get("/api/v4/user").await?;
        let data = response.data.ok_or_else(|| {
            MrxError::api("Invalid API response: missing data", response.status)
        })?;
        serde_json::from_value(data).map_err(|e| {
            MrxError::api(format!("unexpected user payload: {e}"), response.status)
        })
    }

    /// Path of the merged merge request list endpoint for one page.
    pub fn merged_merge_requests_path(
        &self,
        page: u32,
        per_page: u32,
        author_id: Option<u64>,
    ) -> String {
        let mut path = format!(
            "/api/v4/projects/{}/merge_requests?state=merged&page={page}&per_page={per_page}",
            self.project
        );
        if let Some(author) = author_id {
            path.push_str(&format!("&author_id={author}"));
        }
        path
    }

    /// Path of the diff endpoint for merge request `iid`.
    pub fn merge_request_diffs_path(&self, iid: u64) -> String {
        format!(
            "/api/v4/projects/{}/merge_requests/{iid}/diffs",
            self.project
        )
    }
}

#[async_trait]
impl MergeRequestApi for GitLabClient {
    async fn merged_merge_requests(
        &self,
        page: u32,
        per_page: u32,
        author_id: Option<u64>,
    ) -> Result<ApiResponse<Value>, MrxError> {
        self.get(&self.merged_merge_requests_path(page, per_page, author_id))
            .await
    }

    async fn merge_request_diffs(&self, iid: u64) -> Result<ApiResponse<Value>, MrxError> {
        self.get(&self.merge_request_diffs_path(iid)).await
    }
}
