/// Errors that can occur anywhere in the extraction pipeline.
///
/// Library crates return this type directly; the binary converts it to a
/// `miette::Report` at the boundary, which renders the diagnostic code and
/// help text for each kind.
///
/// # Examples
///
/// ```
/// use mrx_core::MrxError;
///
/// let err = MrxError::api("API rate limit exceeded", 429);
/// assert_eq!(err.status(), Some(429));
/// assert!(err.to_string().contains("API rate limit exceeded"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum MrxError {
    /// Missing or blank connection parameters, or an invalid config value.
    #[error("configuration error: {0}")]
    #[diagnostic(
        code(mrx::config),
        help("set GITLAB_TOKEN and GITLAB_PROJECT_ID, or fill in the [gitlab] section of .mrx.toml")
    )]
    Config(String),

    /// Any failure reported by the host API or the transport underneath it.
    #[error("GitLab API error ({status}): {message}")]
    #[diagnostic(code(mrx::api))]
    Api {
        /// Human-readable failure description.
        message: String,
        /// HTTP status code; 500 when the request never got a response.
        status: u16,
        /// Raw response body, when one was received.
        #[help]
        body: Option<String>,
    },

    /// The diff classifier was given something that is not text.
    #[error("diff parsing error: {0}")]
    #[diagnostic(code(mrx::parse))]
    Parse(String),

    /// A fetched record lacks its required identity fields.
    #[error("malformed merge request data: {0}")]
    #[diagnostic(code(mrx::malformed_data))]
    MalformedData(String),

    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    #[diagnostic(code(mrx::io))]
    Io(#[from] std::io::Error),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    #[diagnostic(code(mrx::serialization))]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    #[diagnostic(code(mrx::toml))]
    Toml(#[from] toml::de::Error),
}

impl MrxError {
    /// Build an [`MrxError::Api`] without a response body.
    pub fn api(message: impl Into<String>, status: u16) -> Self {
        MrxError::Api {
            message: message.into(),
            status,
            body: None,
        }
    }

    /// HTTP status carried by an API error, `None` for every other kind.
    pub fn status(&self) -> Option<u16> {
        match self {
            MrxError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
