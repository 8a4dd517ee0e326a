use once_cell::sync::Lazy;
use scraper::{Html, Selector};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static OG_DESCRIPTION: Lazy<Selector> =
    Lazy::new(|| selector(r#"meta[property="og:description"]"#));
static PUBLISHED_META: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[property="article:published_time"]"#,
        r#"meta[name="date"]"#,
        r#"meta[name="pubdate"]"#,
        r#"meta[name="publish-date"]"#,
        r#"meta[name="dc.date"]"#,
        r#"meta[name="DC.date"]"#,
        r#"meta[itemprop="datePublished"]"#,
    ]
    .into_iter()
    .map(selector)
    .collect()
});
static TIME_DATETIME: Lazy<Selector> = Lazy::new(|| selector("time[datetime]"));

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub publication_date: Option<String>,
}

fn clean(text: &str) -> Option<String> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn meta_content(document: &Html, sel: &Selector) -> Option<String> {
    document
        .select(sel)
        .filter_map(|el| el.value().attr("content"))
        .find_map(clean)
}

fn element_text(document: &Html, sel: &Selector) -> Option<String> {
    document
        .select(sel)
        .find_map(|el| clean(&el.text().collect::<String>()))
}

pub fn extract_metadata(document: &Html) -> PageMetadata {
    let title = meta_content(document, &OG_TITLE)
        .or_else(|| element_text(document, &TITLE))
        .or_else(|| element_text(document, &H1));

    let summary = meta_content(document, &DESCRIPTION)
        .or_else(|| meta_content(document, &OG_DESCRIPTION));

    let publication_date = PUBLISHED_META
        .iter()
        .find_map(|sel| meta_content(document, sel))
        .or_else(|| {
            document
                .select(&TIME_DATETIME)
                .filter_map(|el| el.value().attr("datetime"))
                .find_map(clean)
        });

    PageMetadata {
        title,
        summary,
        publication_date,
    }
}
