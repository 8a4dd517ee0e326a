use sieve::extractor::{
    ArticleStrategy, BoilerplateStrategy, ExtractionStrategy, Extractor, Html2TextStrategy,
};

const NEWS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Fees drop on the network | Example News</title>
  <meta property="og:title" content="Fees drop on the network">
  <meta name="description" content="Transaction fees fell to a two year low.">
  <meta name="date" content="2024-06-02">
  <script>var tracking = "do not index me";</script>
  <style>body { color: red; }</style>
</head>
<body>
  <div id="cookie-banner">We use cookies to improve your experience on this site.</div>
  <header class="site-header"><a href="/">Example News</a></header>
  <ul class="menu"><li><a href="/markets">Markets</a></li><li><a href="/tech">Tech</a></li></ul>
  <div class="layout">
    <div class="story-body">
      <h1>Fees drop on the network</h1>
      <p>Transaction fees on the network fell to their lowest level in two years this week.</p>
      <p>Analysts said that the decline was driven by a drop in demand for block space.</p>
      <p>Some of them expect fees to rise again when activity returns to the market.</p>
    </div>
    <div class="sidebar">
      <p>Read <a href="/a">this</a> and <a href="/b">that other story about the markets</a></p>
    </div>
  </div>
  <footer><p>Copyright 2024 Example News. All of the rights are reserved.</p></footer>
</body>
</html>"#;

#[test]
fn test_default_chain_order() {
    assert_eq!(
        Extractor::new().strategy_names(),
        vec!["article", "boilerplate", "html2text"]
    );
}

#[test]
fn test_news_page_main_content_and_metadata() {
    let extraction = Extractor::new().extract(NEWS_PAGE, "https://news.example/fees");

    assert_eq!(extraction.strategy, Some("article"));
    assert_eq!(extraction.title.as_deref(), Some("Fees drop on the network"));
    assert_eq!(
        extraction.summary.as_deref(),
        Some("Transaction fees fell to a two year low.")
    );
    assert_eq!(extraction.publication_date.as_deref(), Some("2024-06-02"));

    let paragraphs: Vec<_> = extraction.content.split("\n\n").collect();
    assert_eq!(paragraphs.len(), 3);
    assert!(paragraphs[0].starts_with("Transaction fees on the network"));
    assert!(paragraphs[2].ends_with("returns to the market."));
    for noise in ["cookies", "Markets", "Copyright", "tracking", "color: red", "other story"] {
        assert!(!extraction.content.contains(noise), "{noise} leaked");
    }
}

#[test]
fn test_boilerplate_walk_drops_chrome() {
    let text = BoilerplateStrategy.extract(NEWS_PAGE).unwrap().unwrap();
    assert!(text.contains("Fees drop on the network"));
    assert!(text.contains("demand for block space"));
    assert!(!text.contains("cookies"));
    assert!(!text.contains("Markets"));
    assert!(!text.contains("Copyright"));
    assert!(!text.contains("do not index me"));
    assert!(!text.contains("other story"));
}

#[test]
fn test_link_lists_fall_through_to_boilerplate() {
    let html = r#"<html><body>
        <div class="content"><h2>Downloads</h2>
        <div><a href="/1">Release notes</a></div>
        <div><a href="/2">Source tarball</a></div></div>
        </body></html>"#;
    assert_eq!(ArticleStrategy.extract(html).unwrap(), None);

    let extraction = Extractor::new().extract(html, "https://example.org/downloads");
    assert_eq!(extraction.strategy, Some("boilerplate"));
    assert!(extraction.content.contains("Downloads"));
    assert!(extraction.content.contains("Source tarball"));
}

#[test]
fn test_html2text_keeps_text_of_plain_markup() {
    let text = Html2TextStrategy
        .extract("<p>one <b>bold</b> word</p>")
        .unwrap()
        .unwrap();
    assert!(text.contains("bold"));
    assert!(!text.contains("<b>"));
}

#[test]
fn test_empty_document_keeps_raw_input() {
    let html = "<html><head><script>x()</script></head><body></body></html>";
    let extraction = Extractor::with_strategies(vec![
        Box::new(ArticleStrategy),
        Box::new(BoilerplateStrategy),
    ])
    .extract(html, "https://example.org/blank");
    assert_eq!(extraction.strategy, None);
    assert_eq!(extraction.content, html);
}
