use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::{Router, http::StatusCode, http::header, response::IntoResponse, routing::get};
use futures::stream;
use tokio_util::sync::CancellationToken;

use sieve::data_models::{SearchResult, WebPage};
use sieve::error::ScrapeError;
use sieve::scrapper::{
    HttpScrapper, MAX_BODY_BYTES, MAX_URL_CHARS, Scrapper, scrape_all, scrape_search_result,
};

const ARTICLE_HTML: &str = r#"<html><head>
<title>Lightning explained</title>
<meta name="description" content="A short primer">
<meta property="article:published_time" content="2024-03-01">
</head><body>
<nav><a href="/">Home</a> <a href="/about">About</a></nav>
<article>
<p>The Lightning Network is a payment protocol that is layered on top of Bitcoin.</p>
<p>It lets two parties open a channel and move funds between them without waiting for blocks.</p>
</article>
<footer>Copyright and all of the other legal notices</footer>
</body></html>"#;

fn html(body: &'static str) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body)
}

/// Chunked response with no Content-Length, so only the read loop sees the size.
fn streamed(chunks: Vec<Vec<u8>>) -> impl IntoResponse {
    let chunks = stream::iter(
        chunks
            .into_iter()
            .map(|c| Ok::<_, std::convert::Infallible>(Bytes::from(c))),
    );
    (
        [(header::CONTENT_TYPE, "text/html")],
        Body::from_stream(chunks),
    )
}

struct Server {
    base: String,
    in_flight_max: Arc<AtomicUsize>,
}

async fn spawn_server() -> Server {
    let in_flight = Arc::new(AtomicUsize::new(0));
    let in_flight_max = Arc::new(AtomicUsize::new(0));

    let counted = {
        let in_flight = in_flight.clone();
        let in_flight_max = in_flight_max.clone();
        move || async move {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            in_flight_max.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            html("<p>counted page with some of the words in it</p>")
        }
    };

    let app = Router::new()
        .route("/article", get(|| async { html(ARTICLE_HTML) }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                html("<p>This is the slow page and it has some text.</p>")
            }),
        )
        .route(
            "/very-slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                html("<p>too late</p>")
            }),
        )
        .route(
            "/fast",
            get(|| async { html("<p>This is the fast page and it has some text.</p>") }),
        )
        .route(
            "/plain",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/plain")],
                    "plain text is fine too",
                )
            }),
        )
        .route(
            "/pdf",
            get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], "%PDF-1.4") }),
        )
        .route(
            "/binary",
            get(|| async { ([(header::CONTENT_TYPE, "text/html")], "<p>a\0b</p>") }),
        )
        .route(
            "/huge",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html")],
                    "a".repeat(MAX_BODY_BYTES + 1),
                )
            }),
        )
        .route(
            "/streamed-huge",
            get(|| async { streamed(vec![vec![b'a'; 1_000_000]; 6]) }),
        )
        .route(
            "/streamed-binary",
            get(|| async {
                streamed(vec![
                    b"<p>the first chunk is clean text</p>".to_vec(),
                    b"<p>the second one is not a\0b</p>".to_vec(),
                ])
            }),
        )
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, html("<p>not here</p>")) }),
        )
        .route("/counted", get(counted));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("axum serve");
    });

    Server {
        base: format!("http://{addr}"),
        in_flight_max,
    }
}

fn scrapper() -> Arc<dyn Scrapper> {
    Arc::new(HttpScrapper::new(Duration::from_secs(1), Duration::from_secs(2)).unwrap())
}

#[tokio::test]
async fn test_fetch_and_extract_article() {
    let server = spawn_server().await;
    let pages = vec![WebPage::new(format!("{}/article", server.base))];
    let out = scrape_all(&scrapper(), pages, 4, &CancellationToken::new()).await;

    let page = &out[0];
    let content = page.content.as_deref().unwrap();
    assert!(content.contains("payment protocol"));
    assert!(content.contains("open a channel"));
    assert!(!content.contains("Home"));
    assert!(!content.contains("legal notices"));
    assert_eq!(page.title.as_deref(), Some("Lightning explained"));
    assert_eq!(page.summary.as_deref(), Some("A short primer"));
    assert_eq!(page.publication_date.as_deref(), Some("2024-03-01"));
}

#[tokio::test]
async fn test_search_metadata_is_not_overwritten() {
    let server = spawn_server().await;
    let page = WebPage {
        summary: Some("snippet from search".into()),
        ..WebPage::new(format!("{}/article", server.base)).with_title("Search title")
    };
    let out = scrape_all(&scrapper(), vec![page], 4, &CancellationToken::new()).await;
    assert_eq!(out[0].title.as_deref(), Some("Search title"));
    assert_eq!(out[0].summary.as_deref(), Some("snippet from search"));
    assert_eq!(out[0].publication_date.as_deref(), Some("2024-03-01"));
}

#[tokio::test]
async fn test_order_preserved_when_first_page_is_slow() {
    let server = spawn_server().await;
    let pages = vec![
        WebPage::new(format!("{}/slow", server.base)),
        WebPage::new(format!("{}/fast", server.base)),
    ];
    let out = scrape_all(&scrapper(), pages, 4, &CancellationToken::new()).await;
    assert!(out[0].content.as_deref().unwrap().contains("slow page"));
    assert!(out[1].content.as_deref().unwrap().contains("fast page"));
}

#[tokio::test]
async fn test_failure_is_isolated() {
    let server = spawn_server().await;
    let pages = vec![
        WebPage::new(format!("{}/fast", server.base)),
        WebPage::new("http://127.0.0.1:1/unreachable"),
        WebPage::new(format!("{}/plain", server.base)),
    ];
    let out = scrape_all(&scrapper(), pages, 4, &CancellationToken::new()).await;
    assert_eq!(out.len(), 3);
    assert!(out[0].content.is_some());
    assert_eq!(out[1].content, None);
    assert_eq!(out[1].url, "http://127.0.0.1:1/unreachable");
    assert_eq!(out[2].content.as_deref(), Some("plain text is fine too"));
}

#[tokio::test]
async fn test_guard_rejections() {
    let server = spawn_server().await;
    let scrapper = scrapper();

    let err = scrapper.fetch(&format!("{}/pdf", server.base)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::UnsupportedContentType(ref ct) if ct == "application/pdf"));

    let err = scrapper.fetch(&format!("{}/binary", server.base)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::BinaryContent));

    let err = scrapper.fetch(&format!("{}/huge", server.base)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::BodyTooLarge { .. }));

    let err = scrapper.fetch(&format!("{}/missing", server.base)).await.unwrap_err();
    assert!(matches!(err, ScrapeError::Status(404)));
    assert!(!err.is_rejection());
}

fn url_of_len(base: &str, len: usize) -> String {
    let prefix = format!("{base}/fast?pad=");
    format!("{prefix}{}", "a".repeat(len - prefix.len()))
}

#[tokio::test]
async fn test_url_length_limit_boundary() {
    let server = spawn_server().await;
    let scrapper = scrapper();

    let longest_allowed = url_of_len(&server.base, MAX_URL_CHARS - 1);
    assert_eq!(longest_allowed.chars().count(), 199);
    let text = scrapper.fetch(&longest_allowed).await.unwrap();
    assert!(text.contains("fast page"));

    let too_long = url_of_len(&server.base, MAX_URL_CHARS);
    let err = scrapper.fetch(&too_long).await.unwrap_err();
    assert!(matches!(err, ScrapeError::UrlTooLong(200)));
}

#[tokio::test]
async fn test_streamed_bodies_are_checked_while_reading() {
    let server = spawn_server().await;
    let scrapper = scrapper();

    let url = format!("{}/streamed-huge", server.base);
    let response = reqwest::get(&url).await.unwrap();
    assert_eq!(response.content_length(), None);
    drop(response);

    let err = scrapper.fetch(&url).await.unwrap_err();
    assert!(matches!(err, ScrapeError::BodyTooLarge { limit } if limit == MAX_BODY_BYTES));

    let err = scrapper
        .fetch(&format!("{}/streamed-binary", server.base))
        .await
        .unwrap_err();
    assert!(matches!(err, ScrapeError::BinaryContent));
}

#[tokio::test]
async fn test_concurrency_is_bounded() {
    let server = spawn_server().await;
    let pages = (0..8)
        .map(|i| WebPage::new(format!("{}/counted?i={i}", server.base)))
        .collect();
    let out = scrape_all(&scrapper(), pages, 2, &CancellationToken::new()).await;
    assert!(out.iter().all(|p| p.content.is_some()));
    let max = server.in_flight_max.load(Ordering::SeqCst);
    assert!(max <= 2, "saw {max} concurrent requests");
}

#[tokio::test]
async fn test_cancellation_keeps_completed_pages() {
    let server = spawn_server().await;
    let pages = vec![
        WebPage::new(format!("{}/very-slow", server.base)),
        WebPage::new(format!("{}/fast", server.base)),
    ];
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let scrapper: Arc<dyn Scrapper> =
        Arc::new(HttpScrapper::new(Duration::from_secs(1), Duration::from_secs(10)).unwrap());
    let started = std::time::Instant::now();
    let out = scrape_all(&scrapper, pages, 4, &cancel).await;

    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(out[0].content, None);
    assert!(out[1].content.is_some());
}

#[tokio::test]
async fn test_already_cancelled_scrapes_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = SearchResult::new("q", vec![WebPage::new("http://127.0.0.1:1/x")]);
    let out = scrape_search_result(&scrapper(), result, 4, &cancel).await;
    assert_eq!(out.webpages.len(), 1);
    assert_eq!(out.webpages[0].content, None);
}
