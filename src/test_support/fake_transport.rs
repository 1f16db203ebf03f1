//! In-memory [`Transport`] for exercising parsers and mirror protocols offline.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::transport::{ProgressCallback, Transport, TransportError};

/// Scripted transport: pages are queued per URL, the last one repeats.
#[derive(Debug, Default)]
pub(crate) struct FakeTransport {
    pages: Mutex<HashMap<String, VecDeque<String>>>,
    files: Mutex<HashMap<String, Vec<u8>>>,
    page_requests: Mutex<Vec<(String, bool)>>,
    byte_requests: Mutex<Vec<String>>,
}

#[allow(clippy::unwrap_used)]
impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queues `body` as the next response for `url`.
    pub(crate) fn with_page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(body.to_string());
        self
    }

    pub(crate) fn with_file(self, url: &str, bytes: &[u8]) -> Self {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Number of page fetches made for `url`.
    pub(crate) fn page_hits(&self, url: &str) -> usize {
        self.page_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(requested, _)| requested == url)
            .count()
    }

    /// Every page fetch as `(url, use_bypass)`, in call order.
    pub(crate) fn page_requests(&self) -> Vec<(String, bool)> {
        self.page_requests.lock().unwrap().clone()
    }

    /// Every file transfer URL, in call order.
    pub(crate) fn byte_requests(&self) -> Vec<String> {
        self.byte_requests.lock().unwrap().clone()
    }
}

#[async_trait]
#[allow(clippy::unwrap_used)]
impl Transport for FakeTransport {
    async fn fetch_page(&self, url: &str, use_bypass: bool) -> Result<String, TransportError> {
        self.page_requests
            .lock()
            .unwrap()
            .push((url.to_string(), use_bypass));
        let mut pages = self.pages.lock().unwrap();
        let queue = pages
            .get_mut(url)
            .ok_or_else(|| TransportError::http_status(url, 404))?;
        let body = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        body.ok_or_else(|| TransportError::empty_body(url))
    }

    async fn fetch_bytes(
        &self,
        url: &str,
        _size_hint: Option<&str>,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, TransportError> {
        self.byte_requests.lock().unwrap().push(url.to_string());
        if cancel.is_cancelled() {
            return Err(TransportError::cancelled(url));
        }
        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError::http_status(url, 404))?;
        if let Some(progress) = progress {
            progress(1.0);
        }
        Ok(bytes)
    }
}
