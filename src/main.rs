//! CLI entry point for the book downloader.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use bookdl_core::{Catalog, Config, ProgressCallback};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cli;
mod output;
mod terminal;

use cli::{Args, Command, DownloadArgs, InfoArgs, SearchArgs};

const PROGRESS_TICKS: u64 = 1000;
const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {percent:>3}% {msg}";

/// Process outcome mapped to the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    Success,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        match exit {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::FAILURE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    terminal::init_tracing(terminal::default_level(args.verbose, args.quiet));
    debug!(?args, "CLI arguments parsed");

    let mut config = Config::from_env().context("invalid environment configuration")?;
    args.apply_overrides(&mut config);
    config.validate().context("invalid configuration")?;

    let catalog = Catalog::with_http(config).context("failed to build HTTP client")?;
    let exit = match &args.command {
        Command::Search(search) => run_search(&catalog, search).await?,
        Command::Info(info) => run_info(&catalog, info).await?,
        Command::Download(download) => run_download(&catalog, download, args.quiet).await?,
    };
    Ok(exit.into())
}

async fn run_search(catalog: &Catalog, args: &SearchArgs) -> Result<ProcessExit> {
    let books = match catalog.search(&args.query, &args.filters()).await {
        Ok(books) => books,
        Err(error) if error.is_not_found() => {
            eprintln!("No books found for '{}'", args.query);
            return Ok(ProcessExit::Failure);
        }
        Err(error) => return Err(error).context("search failed"),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(ProcessExit::Success);
    }
    let width = output::terminal_width();
    for book in &books {
        println!("{}", output::search_result_line(book, width));
    }
    info!(count = books.len(), "search complete");
    Ok(ProcessExit::Success)
}

async fn run_info(catalog: &Catalog, args: &InfoArgs) -> Result<ProcessExit> {
    let book = catalog
        .book(&args.md5)
        .await
        .with_context(|| format!("failed to load book {}", args.md5))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&book)?);
    } else {
        for line in output::book_detail_lines(&book) {
            println!("{line}");
        }
    }
    Ok(ProcessExit::Success)
}

async fn run_download(catalog: &Catalog, args: &DownloadArgs, quiet: bool) -> Result<ProcessExit> {
    let mut book = match catalog.book(&args.md5).await {
        Ok(book) => book,
        Err(error) => {
            warn!(%error, "detail page unavailable");
            eprintln!("Could not load book {}: {error}", args.md5);
            return Ok(ProcessExit::Failure);
        }
    };
    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output::default_file_name(&book)));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let bar = progress_bar(terminal::progress_enabled(quiet));
    bar.set_message(output::truncate_to_width(&book.title, 40));
    let progress_bar = bar.clone();
    let progress: ProgressCallback = Arc::new(move |fraction: f64| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let position = (fraction.clamp(0.0, 1.0) * PROGRESS_TICKS as f64).round() as u64;
        progress_bar.set_position(position);
    });

    let downloaded = catalog
        .download(&mut book, &destination, Some(progress), Some(cancel.clone()))
        .await;
    bar.finish_and_clear();

    if downloaded {
        if !quiet {
            println!("{}", destination.display());
        }
        Ok(ProcessExit::Success)
    } else if cancel.is_cancelled() {
        eprintln!("Interrupted.");
        Ok(ProcessExit::Failure)
    } else {
        eprintln!("Download failed: no mirror produced the file for {}", args.md5);
        Ok(ProcessExit::Failure)
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    ProgressBar::new(PROGRESS_TICKS).with_style(style)
}
