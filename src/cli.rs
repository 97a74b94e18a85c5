//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use dorkrunner_core::{
    DEFAULT_CONCURRENCY, DEFAULT_DELAY_MS, DEFAULT_MAX_RETRIES, DEFAULT_MONTHLY_QUOTA,
    DEFAULT_PAGES, RunConfig,
};

/// Quota-aware concurrent dork runner.
///
/// Expands categorized dork templates against target domains, runs them
/// through SerpAPI with a bounded worker pool, and writes deduplicated
/// per-category and combined URL lists while tracking monthly credit
/// consumption.
#[derive(Parser, Debug)]
#[command(name = "dorkrunner")]
#[command(author, version, about)]
pub struct Args {
    /// Target domain (repeat the flag for multiple domains)
    #[arg(short, long = "domain", required = true)]
    pub domains: Vec<String>,

    /// Path to the categorized dork file
    #[arg(long)]
    pub dorks: PathBuf,

    /// SerpAPI key
    #[arg(long, env = "SERPAPI_KEY", hide_env_values = true)]
    pub apikey: String,

    /// Provider base URL (tests point this at a local mock server)
    #[arg(long, hide = true, default_value = dorkrunner_core::search::SERPAPI_BASE_URL)]
    pub base_url: String,

    /// Result pages per dork, 100 results each (1-10)
    #[arg(short, long, default_value_t = DEFAULT_PAGES as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub pages: u8,

    /// Maximum concurrent dorks (1-100)
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Delay between pages of one dork in milliseconds (max 60000)
    #[arg(short = 'l', long, default_value_t = DEFAULT_DELAY_MS, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub delay: u64,

    /// Maximum retries per page after the initial attempt (0-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_RETRIES as u8, value_parser = clap::value_parser!(u8).range(0..=10))]
    pub max_retries: u8,

    /// Monthly credit quota
    #[arg(long, default_value_t = DEFAULT_MONTHLY_QUOTA)]
    pub quota: u64,

    /// Credits already used this month (overrides the usage file)
    #[arg(long)]
    pub used: Option<u64>,

    /// Abort before dispatch if the run would cost more than this many credits
    #[arg(long)]
    pub hard_cap: Option<u64>,

    /// Detect quota and usage from the account endpoint before the run;
    /// aborts if the endpoint cannot be read
    #[arg(long)]
    pub auto_quota: bool,

    /// Poll the account endpoint for live usage during the run
    #[arg(long)]
    pub live_quota: bool,

    /// Live-poll interval in seconds (5-3600)
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(5..=3600))]
    pub poll_interval: u64,

    /// Also write per-category CSV rows (category, dork, url)
    #[arg(long)]
    pub csv: bool,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    pub output: PathBuf,

    /// Path of the persisted usage record
    #[arg(long, default_value = "quota_usage.json")]
    pub usage_file: PathBuf,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the library run configuration from the parsed flags.
    pub fn to_run_config(&self) -> RunConfig {
        RunConfig {
            domains: self.domains.clone(),
            pages: usize::from(self.pages),
            concurrency: usize::from(self.concurrency),
            delay: Duration::from_millis(self.delay),
            max_retries: u32::from(self.max_retries),
            quota: self.quota,
            used_override: self.used,
            hard_cap: self.hard_cap,
            auto_quota: self.auto_quota,
            live_poll: self
                .live_quota
                .then(|| Duration::from_secs(self.poll_interval)),
            csv: self.csv,
            output_dir: self.output.clone(),
            usage_file: self.usage_file.clone(),
        }
    }
}
