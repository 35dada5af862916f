use std::path::{Path, PathBuf};

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "job-hunter", about = "Career page crawler and job matcher")]
pub struct Config {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// CSV file with `company` and `career_url` columns
    #[arg(long, env = "JOB_HUNTER_INPUT")]
    pub input: Option<PathBuf>,

    /// Output CSV, appended to across runs
    #[arg(long, env = "JOB_HUNTER_OUTPUT", default_value = "jobs.csv")]
    pub output: PathBuf,

    /// Company-level crawl errors, rewritten each run
    #[arg(long, env = "JOB_HUNTER_ERRORS", default_value = "errors.csv")]
    pub errors: PathBuf,

    /// Companies that ended the run without any stored job
    #[arg(long, env = "JOB_HUNTER_ZERO_LINKS", default_value = "zero_links.csv")]
    pub zero_links: PathBuf,

    /// TOML file overriding the built-in match rules
    #[arg(long, env = "JOB_HUNTER_RULES")]
    pub rules: Option<PathBuf>,

    /// Maximum number of job pages processed at once per company
    #[arg(long, env = "JOB_HUNTER_CONCURRENCY", default_value = "20")]
    pub concurrency: usize,

    /// Page fetch backend
    #[arg(long, value_enum, env = "JOB_HUNTER_FETCHER", default_value_t = FetcherKind::Chrome)]
    pub fetcher: FetcherKind,

    /// Show the Chrome window instead of running headless
    #[arg(long)]
    pub headful: bool,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetcherKind {
    /// Headless Chrome with listing expansion
    Chrome,
    /// Plain HTTP GET, no JavaScript
    Http,
}

#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Crawl every company in the input file (default when no subcommand given)
    Run,
    /// Sort and renumber an existing output file
    Sort {
        /// Output CSV to rewrite
        #[arg(long, default_value = "jobs.csv")]
        output: PathBuf,
    },
}

impl Config {
    /// Resolve the command, defaulting to Run if none specified.
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Default log filter when RUST_LOG is unset. Input files named like
    /// `*test*` switch the crate to debug output.
    pub fn default_log_filter(&self) -> &'static str {
        match self.run.input.as_deref() {
            Some(input) if is_test_input(input) => "job_hunter=debug",
            _ => "job_hunter=info",
        }
    }
}

fn is_test_input(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains("test"))
        .unwrap_or(false)
}
