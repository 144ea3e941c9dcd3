mod cli;
mod config;
mod dimensions;
mod error;
mod fetcher;
mod orchestrator;
mod parser;
mod renderer;
mod source;
mod storage;
mod summary;

use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::config::RunConfig;
use crate::error::{RunError, WriteError};
use crate::fetcher::HttpFetcher;
use crate::renderer::ChromeRenderer;
use crate::summary::{DownloadOutcome, RunSummary};

const EXIT_USAGE: u8 = 1;
const EXIT_FAILURE: u8 = 2;

fn main() -> ExitCode {
    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_USAGE),
            };
        }
    };

    init_tracing(cli.verbose);
    let config = cli.into_config();

    match run(&config) {
        Ok(summary) => {
            print_summary(&summary, &config);
            ExitCode::SUCCESS
        }
        Err(e) if matches!(e.downcast_ref::<RunError>(), Some(RunError::Interrupted)) => {
            info!("Operation interrupted by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            report_fatal(&e);
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "imgpull=debug,reqwest=warn,hyper=warn,headless_chrome=warn"
    } else {
        "imgpull=info,reqwest=warn,hyper=warn,headless_chrome=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(config: &RunConfig) -> Result<RunSummary> {
    info!("Output directory: {}", config.output_dir.display());
    storage::ensure_directory(&config.output_dir).context("File operation error")?;

    let fetcher = HttpFetcher::new(config.timeout).context("Failed to build HTTP client")?;
    let renderer = ChromeRenderer::new(config.timeout);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    info!("Starting download from: {}", config.url);

    // stdout carries only the saved paths so the output can be piped
    let summary = orchestrator::run_download(config, &fetcher, &renderer, &running, &mut |report| {
        if let DownloadOutcome::Success { saved_path, .. } = &report.outcome {
            println!("{}", saved_path.display());
        }
        debug!("Finished {}/{}: {}", report.index, report.total, report.source_url);
    })
    .context("Failed to fetch URL")?;

    Ok(summary)
}

fn report_fatal(err: &anyhow::Error) {
    if let Some(RunError::Fetch(fetch)) = err.downcast_ref::<RunError>() {
        match fetch.status() {
            Some(status) => error!(url = %fetch.url, status, "{:#}", err),
            None => error!(url = %fetch.url, "{:#}", err),
        }
    } else if let Some(write) = err.downcast_ref::<WriteError>() {
        error!(path = %write.path().display(), "{:#}", err);
    } else {
        error!("{:#}", err);
    }
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    eprintln!();
    eprintln!(
        "Saved {} of {} image(s) to {}",
        summary.success_count(),
        summary.total_count(),
        config.output_dir.display()
    );
    if summary.failed_count() > 0 {
        eprintln!("Failed:   {}", summary.failed_count());
    }
    if summary.filtered_count() > 0 {
        eprintln!("Filtered: {}", summary.filtered_count());
    }
}
