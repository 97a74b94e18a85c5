//! CLI entry point for the dorkrunner tool.

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use dorkrunner_core::{DorkSet, SerpApiClient, run};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("dorkrunner starting");

    let dorks = DorkSet::load(&args.dorks)
        .with_context(|| format!("failed to load dork file {}", args.dorks.display()))?;
    info!(
        categories = dorks.categories().len(),
        templates = dorks.len(),
        "dork file loaded"
    );

    let provider = Arc::new(SerpApiClient::with_base_url(&args.apikey, &args.base_url));
    let config = args.to_run_config();

    // Plan and gate before a single search request is spent
    let prep = run::prepare(provider.as_ref(), &dorks, &config).await?;

    println!("  Monthly Quota : {}", prep.plan.quota);
    println!("  Used Before   : {}", prep.plan.used_before);
    println!("  This Run Uses : {}", prep.plan.credits_needed);
    println!(
        "  After Run     : {} ({:.1}%)",
        prep.plan.projected_used(),
        prep.plan.percent()
    );
    if prep.plan.exceeds_quota() {
        println!("  WARNING: this run exceeds the monthly quota");
    }

    if !args.yes && !confirm()? {
        println!("Aborted.");
        return Ok(());
    }

    let spinner = (!args.quiet && io::stderr().is_terminal()).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("searching");
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    });

    let report = run::dispatch(provider, prep, &config).await?;

    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    println!("Done.");
    println!(
        "  Tasks         : {} completed, {} failed",
        report.stats.completed(),
        report.stats.failed_tasks()
    );
    println!(
        "  Pages         : {} retried, {} abandoned",
        report.stats.retried(),
        report.stats.failed_pages()
    );
    for (category, count) in &report.per_category {
        println!("  {category:<14}: {count} URLs");
    }
    println!("  Combined      : {} unique URLs", report.total_urls);
    println!(
        "  Usage saved   : {}/{} ({:.1}%)",
        report.used_after,
        report.plan.quota,
        report.plan.percent()
    );

    Ok(())
}

/// Asks the operator to confirm the planned run.
fn confirm() -> Result<bool> {
    print!("Proceed? (Y/n): ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(matches!(answer.as_str(), "" | "y" | "yes"))
}
