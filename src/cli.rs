//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use bookdl_core::{Config, SearchFilters};
use clap::{Args as ClapArgs, Parser, Subcommand};

/// Search a shadow-library index and download books through its mirrors.
#[derive(Parser, Debug)]
#[command(name = "bookdl")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Index base URL (overrides AA_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Donor key for the fast download API (overrides AA_DONATOR_KEY)
    #[arg(long, global = true, value_name = "KEY")]
    pub donor_key: Option<String>,

    /// Disable bypass-capable fetching (partner servers and auxiliary mirror are skipped)
    #[arg(long, global = true)]
    pub no_bypass: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the index
    Search(SearchArgs),
    /// Show full details and mirror candidates for one book
    Info(InfoArgs),
    /// Download one book by its MD5 identifier
    Download(DownloadArgs),
}

#[derive(ClapArgs, Debug)]
pub struct SearchArgs {
    /// Free-text query
    pub query: String,

    /// Restrict to these ISBNs (repeatable)
    #[arg(long)]
    pub isbn: Vec<String>,

    /// Author term (repeatable)
    #[arg(long)]
    pub author: Vec<String>,

    /// Title term (repeatable)
    #[arg(long)]
    pub title: Vec<String>,

    /// Language code (repeatable, "all" disables the filter)
    #[arg(long)]
    pub lang: Vec<String>,

    /// File format (repeatable, defaults to the supported formats)
    #[arg(long)]
    pub format: Vec<String>,

    /// Content type, e.g. book_fiction (repeatable)
    #[arg(long)]
    pub content: Vec<String>,

    /// Sort key, e.g. newest
    #[arg(long)]
    pub sort: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct InfoArgs {
    /// Book MD5 identifier
    pub md5: String,

    /// Print the record as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// Book MD5 identifier
    pub md5: String,

    /// Destination file (defaults to "<title>.<format>" in the current directory)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

impl Args {
    /// Layers the global flags over environment configuration.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = self.base_url.as_deref() {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(key) = self.donor_key.as_deref().map(str::trim) {
            config.donor_key = (!key.is_empty()).then(|| key.to_string());
        }
        if self.no_bypass {
            config.use_bypass = false;
        }
    }
}

impl SearchArgs {
    pub fn filters(&self) -> SearchFilters {
        SearchFilters {
            isbn: self.isbn.clone(),
            lang: lowercase_all(&self.lang),
            sort: self.sort.clone(),
            content: self.content.clone(),
            format: lowercase_all(&self.format),
            author: self.author.clone(),
            title: self.title.clone(),
        }
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|value| value.to_lowercase()).collect()
}
