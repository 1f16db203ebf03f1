//! Integration tests for search and detail lookups over real HTTP.

mod support;

use bookdl_core::{Catalog, SearchFilters};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use support::{config_for, start_mock_server_or_skip};

fn listing_row(id: &str, title: &str, format: &str) -> String {
    format!(
        "<tr><td><a href=\"/md5/{id}\"><img src=\"/covers/{id}.jpg\"></a></td>\
         <td><span>{title}</span></td><td><span>Frank Herbert</span></td>\
         <td><span>Ace</span></td><td><span>1965</span></td>\
         <td></td><td></td><td><span>en</span></td><td></td>\
         <td><span>{format}</span></td><td><span>1.2MB</span></td></tr>"
    )
}

const DETAIL_HTML: &str = concat!(
    "<html><body><main><div><div><img src=\"/covers/abc.jpg\"></div></div>",
    "<div class=\"main-inner\"></div><div>",
    "<div>Dune 🔍</div><div>Frank Herbert</div><div>Ace</div><div>English [en] · EPUB · 1.2MB</div>",
    "<div><div><div><div>Year</div><div>1965</div></div><div><div>ISBN-13</div><div>9780441013593</div></div></div></div>",
    "<div></div><div></div><div></div><div></div><div></div>",
    "</div>",
    "<a href=\"/slow_download/abc/0/0\">Slow Partner Server #1</a>(no waitlist)",
    "<a href=\"/slow_download/abc/0/1\">Slow Partner Server #2</a>(short waitlist)",
    "<a href=\"https://libgen.li/ads.php?md5=abc\">Libgen.li</a>(click \u{201c}GET\u{201d} at the top)",
    "</main></body></html>"
);

#[tokio::test]
async fn test_search_returns_records_sorted_by_format_preference() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let body = format!(
        "<html><body><table><tbody>{}{}{}</tbody></table></body></html>",
        listing_row("p1", "Dune (scan)", "PDF"),
        listing_row("m1", "Dune", "MOBI"),
        listing_row("e1", "Dune", "EPUB"),
    );
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "dune"))
        .and(query_param("display", "table"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let books = catalog.search("dune", &SearchFilters::default()).await.unwrap();

    let ids: Vec<_> = books.iter().map(|book| book.id.as_str()).collect();
    assert_eq!(ids, vec!["e1", "m1", "p1"]);
    assert_eq!(books[0].format.as_deref(), Some("epub"));
    assert!(books.iter().all(|book| book.download_candidates.is_empty()));
}

#[tokio::test]
async fn test_search_no_matches_is_not_found() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><div>No files found.</div></body></html>"),
        )
        .mount(&server)
        .await;

    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let error = catalog
        .search("zzzz", &SearchFilters::default())
        .await
        .unwrap_err();
    assert!(error.is_not_found());
}

#[tokio::test]
async fn test_search_server_error_is_fetch_failure() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let error = catalog
        .search("dune", &SearchFilters::default())
        .await
        .unwrap_err();
    assert!(!error.is_not_found());
}

#[tokio::test]
async fn test_book_details_include_metadata_and_ordered_candidates() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/md5/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DETAIL_HTML))
        .expect(1)
        .mount(&server)
        .await;

    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    let book = catalog.book("abc").await.unwrap();

    assert_eq!(book.title, "Dune");
    assert_eq!(book.author.as_deref(), Some("Frank Herbert"));
    assert_eq!(book.format.as_deref(), Some("epub"));
    assert_eq!(book.year.as_deref(), Some("1965"));
    assert_eq!(
        book.metadata.get("ISBN-13"),
        Some(&vec!["9780441013593".to_string()])
    );
    let base = server.uri();
    assert_eq!(
        book.download_candidates,
        vec![
            format!("{base}/slow_download/abc/0/0"),
            "https://libgen.li/ads.php?md5=abc".to_string(),
            format!("{base}/slow_download/abc/0/1"),
        ]
    );
}

#[tokio::test]
async fn test_book_details_missing_page_is_error() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/md5/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let catalog = Catalog::with_http(config_for(&server)).unwrap();
    assert!(catalog.book("missing").await.is_err());
}
