use std::path::Path;
use std::process::{Command, Output};

fn mrx(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mrx"))
        .args(args)
        .current_dir(dir)
        .env_remove("GITLAB_URL")
        .env_remove("GITLAB_TOKEN")
        .env_remove("GITLAB_PROJECT_ID")
        .env_remove("MAX_RESULTS")
        .env_remove("AUTHOR_ID")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn init_creates_valid_toml() {
    let dir = tempfile::tempdir().unwrap();

    let output = mrx(dir.path(), &["init"]);

    assert!(
        output.status.success(),
        "mrx init failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config_path = dir.path().join(".mrx.toml");
    let content = std::fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("[gitlab]"));
    assert!(content.contains("[extract]"));

    let config: mrx_core::MrxConfig = toml::from_str(&content).unwrap();
    assert_eq!(config.gitlab.base_url, "https://gitlab.com");
    assert_eq!(config.extract.per_page, 100);
}

#[test]
fn init_refuses_if_exists() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(".mrx.toml"), "# existing").unwrap();

    let output = mrx(dir.path(), &["init"]);

    assert!(!output.status.success());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(".mrx.toml")).unwrap(),
        "# existing"
    );
}

#[test]
fn extract_without_credentials_is_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();

    let output = mrx(dir.path(), &["extract"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("private_token"), "stderr: {stderr}");
    assert!(stderr.contains("project_id"), "stderr: {stderr}");
    assert!(!dir.path().join("results").exists());
}

#[test]
fn config_file_values_are_used() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("custom.toml"),
        "[gitlab]\nprivate_token = \"token\"\n",
    )
    .unwrap();

    let output = mrx(dir.path(), &["extract", "--config", "custom.toml"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("project_id"), "stderr: {stderr}");
    assert!(!stderr.contains("private_token"), "stderr: {stderr}");
}

#[test]
fn mine_conflicts_with_author_id() {
    let dir = tempfile::tempdir().unwrap();

    let output = mrx(dir.path(), &["extract", "--mine", "--author-id", "3"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));
}

#[test]
fn unknown_format_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let output = mrx(dir.path(), &["extract", "--format", "json,xml"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown output format: xml"));
}

#[test]
fn unreachable_host_reports_status_500() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_mrx"))
        .arg("whoami")
        .current_dir(dir.path())
        .env("GITLAB_URL", "http://127.0.0.1:1")
        .env("GITLAB_TOKEN", "token")
        .env("GITLAB_PROJECT_ID", "1")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("500"));
}
