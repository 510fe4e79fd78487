use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MrxError;
use crate::types::OutputFormat;

/// Top-level configuration loaded from `.mrx.toml`.
///
/// Supports layered resolution: CLI flags > env vars > local config > defaults.
///
/// # Examples
///
/// ```
/// use mrx_core::MrxConfig;
///
/// let config = MrxConfig::default();
/// assert_eq!(config.gitlab.base_url, "https://gitlab.com");
/// assert_eq!(config.extract.per_page, 100);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MrxConfig {
    /// Connection settings for the GitLab instance.
    #[serde(default)]
    pub gitlab: GitLabConfig,
    /// Extraction and report settings.
    #[serde(default)]
    pub extract: ExtractConfig,
}

impl MrxConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Io`] if the file cannot be read, or
    /// [`MrxError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, MrxError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use mrx_core::MrxConfig;
    ///
    /// let toml = r#"
    /// [extract]
    /// max_results = 25
    /// "#;
    /// let config = MrxConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.extract.max_results, Some(25));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, MrxError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Override values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] if a numeric variable cannot be parsed.
    pub fn apply_env(&mut self) -> Result<(), MrxError> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Override values using `lookup` as the variable source.
    ///
    /// Recognized variables: `GITLAB_URL`, `GITLAB_TOKEN`, `GITLAB_PROJECT_ID`,
    /// `MAX_RESULTS`, `AUTHOR_ID`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] if `MAX_RESULTS` or `AUTHOR_ID` is not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use mrx_core::MrxConfig;
    ///
    /// let mut config = MrxConfig::default();
    /// config
    ///     .apply_env_with(|key| (key == "GITLAB_PROJECT_ID").then(|| "12345".to_string()))
    ///     .unwrap();
    /// assert_eq!(config.gitlab.project_id, "12345");
    /// ```
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), MrxError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("GITLAB_URL") {
            self.gitlab.base_url = url;
        }
        if let Some(token) = get("GITLAB_TOKEN") {
            self.gitlab.private_token = token;
        }
        if let Some(project) = get("GITLAB_PROJECT_ID") {
            self.gitlab.project_id = project;
        }
        if let Some(max) = get("MAX_RESULTS") {
            self.extract.max_results = Some(parse_env_number("MAX_RESULTS", &max)?);
        }
        if let Some(author) = get("AUTHOR_ID") {
            self.extract.author_id = Some(parse_env_number("AUTHOR_ID", &author)?);
        }
        Ok(())
    }
}

fn parse_env_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, MrxError> {
    value
        .trim()
        .parse()
        .map_err(|_| MrxError::Config(format!("{key} must be a number, got '{value}'")))
}

/// Connection parameters for a GitLab instance.
///
/// # Examples
///
/// ```
/// use mrx_core::GitLabConfig;
///
/// let config = GitLabConfig {
///     private_token: "token123".into(),
///     project_id: "12345".into(),
///     ..GitLabConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert!(GitLabConfig::default().validate().is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabConfig {
    /// Instance root, e.g. `https://gitlab.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Personal access token sent as `PRIVATE-TOKEN`.
    #[serde(default)]
    pub private_token: String,
    /// Numeric project id or `group/project` path.
    #[serde(default)]
    pub project_id: String,
    /// Per-request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GitLabConfig {
    /// Check that every required connection parameter is present.
    ///
    /// # Errors
    ///
    /// Returns [`MrxError::Config`] naming the blank fields.
    pub fn validate(&self) -> Result<(), MrxError> {
        let missing: Vec<&str> = [
            ("base_url", &self.base_url),
            ("private_token", &self.private_token),
            ("project_id", &self.project_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MrxError::Config(format!(
                "missing required configuration parameters: {}",
                missing.join(", ")
            )))
        }
    }
}

fn default_base_url() -> String {
    "https://gitlab.com".into()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            private_token: String::new(),
            project_id: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What to extract and where to write it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Cap on returned merge requests; unlimited when absent.
    pub max_results: Option<usize>,
    /// Only merge requests authored by this user id.
    pub author_id: Option<u64>,
    /// Page size for the list endpoint (default: 100).
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    /// Directory reports are written to (default: `results`).
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Report formats to write (default: all).
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Glob patterns of file paths to leave out of the reports.
    #[serde(default)]
    pub skip_patterns: Vec<String>,
    /// File extensions to leave out of the reports.
    #[serde(default)]
    pub skip_extensions: Vec<String>,
}

fn default_per_page() -> u32 {
    100
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_formats() -> Vec<OutputFormat> {
    OutputFormat::ALL.to_vec()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            max_results: None,
            author_id: None,
            per_page: default_per_page(),
            output_dir: default_output_dir(),
            formats: default_formats(),
            skip_patterns: Vec::new(),
            skip_extensions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = MrxConfig::default();
        assert_eq!(config.gitlab.base_url, "https://gitlab.com");
        assert!(config.gitlab.private_token.is_empty());
        assert_eq!(config.gitlab.timeout_secs, 30);
        assert_eq!(config.extract.per_page, 100);
        assert_eq!(config.extract.max_results, None);
        assert_eq!(config.extract.output_dir, PathBuf::from("results"));
        assert_eq!(config.extract.formats, OutputFormat::ALL.to_vec());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[gitlab]
base_url = "http://localhost:3000"
private_token = "secret"
project_id = "group/project"
timeout_secs = 5

[extract]
max_results = 5
author_id = 42
per_page = 20
output_dir = "out"
formats = ["json", "markdown"]
skip_patterns = ["*.lock"]
"#;
        let config = MrxConfig::from_toml(toml).unwrap();
        assert_eq!(config.gitlab.base_url, "http://localhost:3000");
        assert_eq!(config.gitlab.project_id, "group/project");
        assert_eq!(config.gitlab.timeout_secs, 5);
        assert_eq!(config.extract.max_results, Some(5));
        assert_eq!(config.extract.author_id, Some(42));
        assert_eq!(config.extract.per_page, 20);
        assert_eq!(
            config.extract.formats,
            vec![OutputFormat::Json, OutputFormat::Markdown]
        );
        assert_eq!(config.extract.skip_patterns, vec!["*.lock"]);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = MrxConfig::from_toml("").unwrap();
        assert_eq!(config.extract.per_page, 100);
        assert_eq!(config.gitlab.base_url, "https://gitlab.com");
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = MrxConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(MrxError::Toml(_))));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = MrxConfig::from_toml(
            r#"
[gitlab]
private_token = "from-file"
project_id = "1"
"#,
        )
        .unwrap();
        config
            .apply_env_with(env(&[
                ("GITLAB_TOKEN", "from-env"),
                ("MAX_RESULTS", "10"),
                ("AUTHOR_ID", "7"),
            ]))
            .unwrap();
        assert_eq!(config.gitlab.private_token, "from-env");
        assert_eq!(config.gitlab.project_id, "1");
        assert_eq!(config.extract.max_results, Some(10));
        assert_eq!(config.extract.author_id, Some(7));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let mut config = MrxConfig::default();
        config.gitlab.private_token = "keep".into();
        config
            .apply_env_with(env(&[("GITLAB_TOKEN", "  ")]))
            .unwrap();
        assert_eq!(config.gitlab.private_token, "keep");
    }

    #[test]
    fn non_numeric_env_is_config_error() {
        let mut config = MrxConfig::default();
        let err = config
            .apply_env_with(env(&[("MAX_RESULTS", "ten")]))
            .unwrap_err();
        assert!(matches!(err, MrxError::Config(_)));
        assert!(err.to_string().contains("MAX_RESULTS"));
    }

    #[test]
    fn validate_names_missing_fields() {
        let config = GitLabConfig {
            private_token: "   ".into(),
            ..GitLabConfig::default()
        };
        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("private_token"));
        assert!(msg.contains("project_id"));
        assert!(!msg.contains("base_url"));
    }
}
