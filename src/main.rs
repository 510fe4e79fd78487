use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mrx_core::{ExtractedResult, MrxConfig, OutputFormat};
use mrx_difflens::filter::ChangeFilter;
use mrx_gitlab::{FetchOptions, GitLabClient, MergeRequestFetcher};

const CONFIG_FILE: &str = ".mrx.toml";

#[derive(Parser)]
#[command(
    name = "mrx",
    version,
    about = "Extract merged GitLab merge requests with line-level changes",
    long_about = "mrx pulls every merged merge request of a GitLab project, fetches the\n\
                  diff of each changed file, and classifies diff lines as additions or\n\
                  deletions. Results are written as JSON, CSV, and Markdown reports.\n\n\
                  Examples:\n  \
                    mrx init                          Write a default .mrx.toml\n  \
                    mrx whoami                        Check the configured token\n  \
                    mrx extract --max-results 10      Extract the ten latest merges\n  \
                    mrx extract --mine --format json  Only your merge requests, as JSON"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .mrx.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract merged merge requests and write reports
    #[command(long_about = "Extract merged merge requests and write reports.\n\n\
        Lists merged merge requests page by page, fetches every file diff, and\n\
        classifies each `+ ` / `- ` line. Any API error aborts the whole run.\n\n\
        Examples:\n  mrx extract --max-results 25\n  \
        mrx extract --author-id 42 --format csv,markdown --save-diffs")]
    Extract(ExtractArgs),
    /// Show the user the configured token belongs to
    Whoami,
    /// Create a default .mrx.toml configuration file
    #[command(long_about = "Create a default .mrx.toml configuration file.\n\n\
        Generates a commented template with all available options.\n\
        Fails if .mrx.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct ExtractArgs {
    /// Stop after this many merge requests
    #[arg(long)]
    max_results: Option<usize>,

    /// Only merge requests authored by this user ID
    #[arg(long, conflicts_with = "mine")]
    author_id: Option<u64>,

    /// Only merge requests authored by the token's user
    #[arg(long)]
    mine: bool,

    /// Page size for the merge request list
    #[arg(long)]
    per_page: Option<u32>,

    /// Directory reports are written to
    #[arg(long, short)]
    output_dir: Option<PathBuf>,

    /// Report formats, comma separated (json, csv, markdown)
    #[arg(long, value_delimiter = ',')]
    format: Vec<OutputFormat>,

    /// Drop files matching this glob from the results (repeatable)
    #[arg(long)]
    skip_pattern: Vec<String>,

    /// Drop files with this extension from the results (repeatable)
    #[arg(long)]
    skip_extension: Vec<String>,

    /// Also write each file's raw diff under <output-dir>/diffs
    #[arg(long)]
    save_diffs: bool,
}

impl ExtractArgs {
    fn apply(&self, config: &mut MrxConfig) {
        let extract = &mut config.extract;
        if let Some(max) = self.max_results {
            extract.max_results = Some(max);
        }
        if let Some(author) = self.author_id {
            extract.author_id = Some(author);
        }
        if let Some(per_page) = self.per_page {
            extract.per_page = per_page;
        }
        if let Some(dir) = &self.output_dir {
            extract.output_dir = dir.clone();
        }
        if !self.format.is_empty() {
            extract.formats = self.format.clone();
        }
        extract.skip_patterns.extend(self.skip_pattern.iter().cloned());
        extract
            .skip_extensions
            .extend(self.skip_extension.iter().cloned());
    }
}

const DEFAULT_CONFIG: &str = r#"# mrx Configuration
# Environment variables (GITLAB_URL, GITLAB_TOKEN, GITLAB_PROJECT_ID,
# MAX_RESULTS, AUTHOR_ID) override values set here.

[gitlab]
# base_url = "https://gitlab.com"
# private_token = ""
# project_id = "group/project"
# timeout_secs = 30

[extract]
# max_results = 50
# author_id = 42
# per_page = 100
# output_dir = "results"
# formats = ["json", "csv", "markdown"]
# skip_patterns = ["*.lock", "vendor/**"]
# skip_extensions = ["snap"]
"#;

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);
    dotenvy::dotenv().ok();

    match cli.command {
        Command::Extract(args) => {
            let mut config = load_config(cli.config.as_deref())?;
            args.apply(&mut config);
            run_extract(&config, args.mine, args.save_diffs).await?;
        }
        Command::Whoami => {
            let config = load_config(cli.config.as_deref())?;
            let client = GitLabClient::new(&config.gitlab)?;
            let user = client.current_user().await?;
            println!("{} (@{}), id {}", user.name, user.username, user.id);
        }
        Command::Init => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "mrx", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .ok();
}

fn load_config(explicit: Option<&Path>) -> Result<MrxConfig> {
    let mut config = match explicit {
        Some(path) => MrxConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                MrxConfig::from_file(default_path)?
            } else {
                MrxConfig::default()
            }
        }
    };
    config.apply_env()?;
    Ok(config)
}

async fn run_extract(config: &MrxConfig, mine: bool, save_diffs: bool) -> Result<()> {
    let filter = ChangeFilter::from_config(&config.extract)?;
    let client = GitLabClient::new(&config.gitlab)?;

    let author_id = if mine {
        let user = client.current_user().await?;
        tracing::info!(user = %user.username, id = user.id, "restricting to own merge requests");
        Some(user.id)
    } else {
        config.extract.author_id
    };
    let options = FetchOptions {
        author_id,
        max_results: config.extract.max_results,
    };

    let spinner = start_spinner("Fetching merged merge requests...");
    let fetched = MergeRequestFetcher::new(&client)
        .with_per_page(config.extract.per_page)
        .fetch_all_merged(&options)
        .await
        .inspect_err(|_| {
            if let Some(pb) = &spinner {
                pb.finish_with_message("Failed");
            }
        })?;
    if let Some(pb) = spinner {
        pb.finish_with_message("Done");
    }

    let (results, skipped) = if filter.is_empty() {
        (fetched, 0)
    } else {
        let filtered = filter.apply(fetched);
        for file in &filtered.skipped {
            tracing::debug!(iid = file.iid, path = %file.path, reason = %file.reason, "skipped file");
        }
        (filtered.kept, filtered.skipped.len())
    };

    let dir = &config.extract.output_dir;
    let timestamp = mrx_report::report_timestamp(Utc::now());
    let written = mrx_report::write_reports(&results, dir, &config.extract.formats, &timestamp)?;

    print_summary(&results, skipped);
    for path in &written {
        println!("  wrote {}", path.display());
    }

    if save_diffs {
        let diff_dir = dir.join("diffs");
        let dumped = mrx_report::write_diff_files(&results, &diff_dir)?;
        println!("  wrote {} diff files to {}", dumped.len(), diff_dir.display());
    }

    Ok(())
}

fn start_spinner(message: &'static str) -> Option<ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn print_summary(results: &[ExtractedResult], skipped: usize) {
    let files: usize = results.iter().map(|r| r.changes.len()).sum();
    let additions: usize = results.iter().map(ExtractedResult::additions).sum();
    let deletions: usize = results.iter().map(ExtractedResult::deletions).sum();

    println!(
        "Extracted {} merged merge request{} ({files} files, +{additions} -{deletions})",
        results.len(),
        if results.len() == 1 { "" } else { "s" },
    );
    if skipped > 0 {
        println!("  skipped {skipped} filtered files");
    }
}
