use mrx_core::{ApiResponse, ExtractedResult, FileChange, MergeRequest, MrxError};
use mrx_difflens::classify_value;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::MergeRequestApi;

/// Page size used for the merge request list unless overridden.
pub const DEFAULT_PER_PAGE: u32 = 100;

/// Restrictions applied to a fetch.
///
/// # Examples
///
/// ```
/// use mrx_gitlab::fetcher::FetchOptions;
///
/// let options = FetchOptions {
///     max_results: Some(5),
///     ..FetchOptions::default()
/// };
/// assert!(options.author_id.is_none());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Only merge requests authored by this user, filtered by the host.
    pub author_id: Option<u64>,
    /// Upper bound on the number of results returned.
    pub max_results: Option<usize>,
}

/// Retrieves every merged merge request and the classified diff of each.
///
/// Pages and diffs are fetched strictly one after another. Any error aborts
/// the whole fetch and is returned unchanged; nothing fetched so far is kept.
pub struct MergeRequestFetcher<A> {
    api: A,
    per_page: u32,
}

impl<A: MergeRequestApi> MergeRequestFetcher<A> {
    /// Create a fetcher over `api` using [`DEFAULT_PER_PAGE`].
    pub fn new(api: A) -> Self {
        Self {
            api,
            per_page: DEFAULT_PER_PAGE,
        }
    }

    /// Use a different page size for the list endpoint. Zero is treated as one.
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Fetch all merged merge requests matching `options`, each with its
    /// classified file changes, in the order the host lists them.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`MrxError::Api`] unchanged, an
    /// [`MrxError::Api`] for a response without usable data,
    /// [`MrxError::MalformedData`] for a record missing `id` or `iid`, and
    /// [`MrxError::Parse`] for a file whose diff is not text.
    pub async fn fetch_all_merged(
        &self,
        options: &FetchOptions,
    ) -> Result<Vec<ExtractedResult>, MrxError> {
        let requests = self.fetch_merged_requests(options).await?;
        if requests.is_empty() {
            info!("no merged merge requests found");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(requests.len());
        for merge_request in requests {
            let changes = self.fetch_changes(merge_request.iid).await?;
            results.push(ExtractedResult {
                merge_request,
                changes,
            });
        }

        info!(count = results.len(), "extracted merged merge requests");
        Ok(results)
    }

    async fn fetch_merged_requests(
        &self,
        options: &FetchOptions,
    ) -> Result<Vec<MergeRequest>, MrxError> {
        let mut requests = Vec::new();
        let mut page = 1;

        loop {
            let response = self
                .api
                .merged_merge_requests(page, self.per_page, options.author_id)
                .await?;
            let records = expect_array(response)?;
            debug!(page, count = records.len(), "fetched merge request page");
            if records.is_empty() {
                break;
            }

            for record in records {
                requests.push(parse_merge_request(record)?);
            }

            if options.max_results.is_some_and(|max| requests.len() >= max) {
                break;
            }
            page += 1;
        }

        if let Some(max) = options.max_results {
            requests.truncate(max);
        }
        Ok(requests)
    }

    async fn fetch_changes(&self, iid: u64) -> Result<Vec<FileChange>, MrxError> {
        let response = self.api.merge_request_diffs(iid).await?;
        let files = expect_array(response)?;
        debug!(iid, files = files.len(), "fetched merge request diffs");
        files
            .into_iter()
            .map(|file| parse_file_change(iid, file))
            .collect()
    }
}

fn expect_array(response: ApiResponse<Value>) -> Result<Vec<Value>, MrxError> {
    match response.data {
        Some(Value::Array(items)) => Ok(items),
        None | Some(Value::Null) => Err(MrxError::api(
            "Invalid API response: missing data",
            response.status,
        )),
        Some(_) => Err(MrxError::api(
            "Invalid API response: expected an array",
            response.status,
        )),
    }
}

fn parse_merge_request(record: Value) -> Result<MergeRequest, MrxError> {
    let id = required_id(&record, "id")?;
    let iid = required_id(&record, "iid")?;
    serde_json::from_value(record).map_err(|e| {
        MrxError::MalformedData(format!("merge request {id} (!{iid}): {e}"))
    })
}

fn required_id(record: &Value, field: &str) -> Result<u64, MrxError> {
    record
        .get(field)
        .and_then(Value::as_u64)
        .filter(|id| *id > 0)
        .ok_or_else(|| {
            MrxError::MalformedData(format!(
                "record is missing required positive integer field '{field}': {record}"
            ))
        })
}

fn parse_file_change(iid: u64, file: Value) -> Result<FileChange, MrxError> {
    if !file.is_object() {
        return Err(MrxError::MalformedData(format!(
            "diff entry of !{iid} is not an object: {file}"
        )));
    }

    let diff = file.get("diff").unwrap_or(&Value::Null);
    let changes = classify_value(diff)?;
    let text = |key: &str| {
        file.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    let flag = |key: &str| file.get(key).and_then(Value::as_bool).unwrap_or(false);

    Ok(FileChange {
        old_path: text("old_path"),
        new_path: text("new_path"),
        diff: text("diff"),
        changes,
        new_file: flag("new_file"),
        renamed_file: flag("renamed_file"),
        deleted_file: flag("deleted_file"),
    })
}
