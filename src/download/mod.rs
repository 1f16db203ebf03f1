//! Mirror fallback chain that turns a [`BookRecord`](crate::book::BookRecord) into a local file.
//!
//! # Overview
//!
//! The [`DownloadOrchestrator`] walks a record's candidate mirrors in priority
//! order, resolves each one through the [`MirrorResolver`](crate::mirror::MirrorResolver),
//! and hands the first concrete URL to the [`Transport`](crate::transport::Transport).
//! The first transfer that yields data wins; every other failure is logged and
//! the chain moves on.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use bookdl_core::{Config, DownloadOrchestrator, HttpTransport, fetch_book};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Arc::new(Config::from_env()?);
//! let transport = Arc::new(HttpTransport::new(&config)?);
//! let mut book = fetch_book(transport.as_ref(), &config, "d41d8cd98f00b204e9800998ecf8427e").await?;
//! let orchestrator = DownloadOrchestrator::new(transport, config);
//! let ok = orchestrator.download(&mut book, Path::new("book.epub"), None, None).await;
//! println!("downloaded: {ok}");
//! # Ok(())
//! # }
//! ```

mod orchestrator;
mod size_hint;

pub use orchestrator::DownloadOrchestrator;
pub use size_hint::parse_size_hint;
