use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::book::{BookRecord, fetch_book};
use crate::config::Config;
use crate::mirror::MirrorResolver;
use crate::transport::{ProgressCallback, Transport, TransportError};

/// Why a single candidate did not produce the file.
#[derive(Debug, Error)]
enum AttemptError {
    #[error("mirror could not be resolved")]
    Unresolved,

    #[error(transparent)]
    Transfer(#[from] TransportError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Walks a book's mirrors in priority order until one delivers the file.
///
/// Stateless between calls; one orchestrator can serve concurrent downloads
/// of different books.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
    resolver: MirrorResolver,
}

impl DownloadOrchestrator {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: Arc<Config>) -> Self {
        let resolver = MirrorResolver::new(Arc::clone(&transport), Arc::clone(&config));
        Self {
            transport,
            config,
            resolver,
        }
    }

    /// Downloads `book` to `destination`.
    ///
    /// A record without candidates first gets them from its detail page;
    /// the candidate list is the only field of `book` ever written. With a donor key
    /// configured, the fast download API is tried before every other mirror.
    ///
    /// Returns `false` when the detail fetch fails, every mirror fails, or
    /// `cancel` fires. Nothing is propagated as an error.
    #[instrument(skip_all, fields(book_id = %book.id, destination = %destination.display()))]
    pub async fn download(
        &self,
        book: &mut BookRecord,
        destination: &Path,
        progress: Option<ProgressCallback>,
        cancel: Option<CancellationToken>,
    ) -> bool {
        let cancel = cancel.unwrap_or_default();

        if book.download_candidates.is_empty() {
            if cancel.is_cancelled() {
                info!("download cancelled before fetching book info");
                return false;
            }
            info!("no mirror candidates yet, fetching book info");
            let fetched = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("download cancelled while fetching book info");
                    return false;
                }
                fetched = fetch_book(self.transport.as_ref(), &self.config, &book.id) => fetched,
            };
            match fetched {
                Ok(full) => book.download_candidates = full.download_candidates,
                Err(error) => {
                    error!(%error, "could not fetch book info");
                    return false;
                }
            }
        }

        let attempts = self.attempt_list(book);
        debug!(candidates = attempts.len(), "starting mirror chain");

        for link in &attempts {
            if cancel.is_cancelled() {
                info!("download cancelled");
                return false;
            }
            match self
                .try_candidate(book, link, destination, progress.clone(), &cancel)
                .await
            {
                Ok(()) => return true,
                Err(AttemptError::Unresolved) => debug!(%link, "mirror unresolved, trying next"),
                Err(AttemptError::Transfer(error)) if error.is_cancelled() => {
                    info!(%link, "transfer cancelled");
                    return false;
                }
                Err(error) => warn!(%link, %error, "mirror failed, trying next"),
            }
        }

        error!(title = %book.title, attempts = attempts.len(), "all mirrors exhausted");
        false
    }

    /// Donor fast-download URL (when configured) followed by the record's candidates.
    fn attempt_list(&self, book: &BookRecord) -> Vec<String> {
        let mut attempts = Vec::with_capacity(book.download_candidates.len() + 1);
        if let Some(key) = self.config.donor_key.as_deref() {
            attempts.push(format!(
                "{}/dyn/api/fast_download.json?md5={}&key={}",
                self.config.base_url.trim_end_matches('/'),
                book.id,
                urlencoding::encode(key)
            ));
        }
        attempts.extend(
            book.download_candidates
                .iter()
                .filter(|link| !link.is_empty())
                .cloned(),
        );
        attempts
    }

    async fn try_candidate(
        &self,
        book: &BookRecord,
        link: &str,
        destination: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<(), AttemptError> {
        let url = self
            .resolver
            .resolve(link, &book.title, cancel)
            .await
            .ok_or(AttemptError::Unresolved)?;

        info!(title = %book.title, %url, "downloading");
        let data = self
            .transport
            .fetch_bytes(&url, book.size.as_deref(), progress, cancel)
            .await?;
        if data.is_empty() {
            return Err(TransportError::empty_body(url).into());
        }

        info!(bytes = data.len(), "download finished, writing file");
        write_file(destination, &data).await?;
        info!(title = %book.title, "book written");
        Ok(())
    }
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn write_file(destination: &Path, data: &[u8]) -> Result<(), AttemptError> {
    let to_write_error = |source| AttemptError::Write {
        path: destination.to_path_buf(),
        source,
    };
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(to_write_error)?;
    }
    tokio::fs::write(destination, data).await.map_err(to_write_error)
}
