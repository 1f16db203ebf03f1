//! Integration tests for the mirror fallback chain.
//!
//! These tests drive detail lookup, mirror resolution and the file transfer
//! against a mock server and check what lands on disk.

mod support;

use std::sync::{Arc, Mutex};

use bookdl_core::{BookRecord, Catalog, Config, ProgressCallback};
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{config_for, start_mock_server_or_skip};

const CONTENT: &[u8] = b"PK\x03\x04 epub container bytes";

fn detail_html(libgen_link: &str) -> String {
    format!(
        "<html><body><main><div><div><img src=\"/covers/abc.jpg\"></div></div>\
         <div class=\"main-inner\"></div><div>\
         <div>Dune</div><div>Frank Herbert</div><div>Ace</div><div>English [en] · EPUB · 1.2MB</div>\
         <div><div></div></div>\
         <div></div><div></div><div></div><div></div><div></div>\
         </div>\
         <a href=\"/slow_download/abc/0/0\">Slow Partner Server #1</a>(no waitlist)\
         <a href=\"{libgen_link}\">Libgen</a>(click \u{201c}GET\u{201d} at the top)\
         </main></body></html>"
    )
}

async fn mount_detail(server: &MockServer) {
    let libgen_link = format!("{}/ads.php?md5=abc", server.uri());
    Mock::given(method("GET"))
        .and(path("/md5/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(detail_html(&libgen_link)))
        .mount(server)
        .await;
}

async fn mount_file(server: &MockServer, file_path: &str) {
    Mock::given(method("GET"))
        .and(path(file_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(CONTENT.to_vec()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_download_falls_back_from_failing_partner_to_libgen() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_detail(&server).await;
    Mock::given(method("GET"))
        .and(path("/slow_download/abc/0/0"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ads.php"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><a href=\"get.php?md5=abc&key=K\">GET</a></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_file(&server, "/get.php").await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let destination = temp_dir.path().join("books").join("dune.epub");
    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let mut book = catalog.book("abc").await.unwrap();
    assert_eq!(book.download_candidates.len(), 2);

    let seen: Arc<Mutex<Vec<f64>>> = Arc::default();
    let sink = Arc::clone(&seen);
    let progress: ProgressCallback = Arc::new(move |fraction| sink.lock().unwrap().push(fraction));

    let downloaded = catalog
        .download(&mut book, &destination, Some(progress), None)
        .await;

    assert!(downloaded, "expected the libgen mirror to succeed");
    assert_eq!(std::fs::read(&destination).unwrap(), CONTENT);
    assert_eq!(seen.lock().unwrap().last().copied(), Some(1.0));
}

#[tokio::test]
async fn test_download_without_candidates_fetches_detail_page() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_detail(&server).await;
    Mock::given(method("GET"))
        .and(path("/slow_download/abc/0/0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><a href=\"/files/dune.epub\">📚 Download now</a></body></html>",
        ))
        .mount(&server)
        .await;
    mount_file(&server, "/files/dune.epub").await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let destination = temp_dir.path().join("dune.epub");
    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let mut book = BookRecord::new("abc", "Dune");

    assert!(catalog.download(&mut book, &destination, None, None).await);
    assert_eq!(book.download_candidates.len(), 2);
    assert_eq!(std::fs::read(&destination).unwrap(), CONTENT);
}

#[tokio::test]
async fn test_download_prefers_donor_fast_api() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/dyn/api/fast_download.json"))
        .and(query_param("md5", "abc"))
        .and(query_param("key", "donor-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "download_url": format!("{}/fast/dune.epub", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_file(&server, "/fast/dune.epub").await;

    let config = Config {
        donor_key: Some("donor-key".to_string()),
        ..config_for(&server)
    };
    let mut book = BookRecord::new("abc", "Dune");
    book.download_candidates = vec![format!("{}/never-requested", server.uri())];
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let destination = temp_dir.path().join("dune.epub");
    let catalog = Catalog::with_http(config).unwrap();

    assert!(catalog.download(&mut book, &destination, None, None).await);
    assert_eq!(std::fs::read(&destination).unwrap(), CONTENT);
}

#[tokio::test]
async fn test_download_all_mirrors_failing_leaves_no_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    mount_detail(&server).await;
    Mock::given(method("GET"))
        .and(path("/slow_download/abc/0/0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>busy</body></html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ads.php"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let destination = temp_dir.path().join("dune.epub");
    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let mut book = catalog.book("abc").await.unwrap();

    assert!(!catalog.download(&mut book, &destination, None, None).await);
    assert!(!destination.exists());
}
