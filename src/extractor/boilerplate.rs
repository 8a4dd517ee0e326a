use std::cell::RefCell;
use std::io::Cursor;

use anyhow::Result;
use html5ever::tendril::TendrilSink;
use html5ever::{Attribute, LocalName, parse_document};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

use super::ExtractionStrategy;

const BOILERPLATE_TOKENS: &[&str] = &[
    "nav",
    "navbar",
    "navigation",
    "menu",
    "sidebar",
    "footer",
    "header",
    "cookie",
    "cookies",
    "consent",
    "banner",
    "promo",
    "ad",
    "ads",
    "advert",
    "advertisement",
    "sponsored",
    "breadcrumb",
    "breadcrumbs",
    "share",
    "social",
    "newsletter",
    "subscribe",
    "popup",
    "modal",
    "badge",
];

/// True when a class or id value names a navigation, menu, footer, cookie or ad container.
/// Matches whole tokens so `downloads` or `loaded` don't trip `ads`/`ad`.
pub fn is_boilerplate_name(value: &str) -> bool {
    value
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .any(|t| BOILERPLATE_TOKENS.contains(&t.to_ascii_lowercase().as_str()))
}

pub fn is_skipped_tag(tag: &str) -> bool {
    matches!(
        tag,
        "script"
            | "style"
            | "noscript"
            | "head"
            | "nav"
            | "footer"
            | "aside"
            | "form"
            | "iframe"
            | "svg"
            | "template"
            | "button"
    )
}

/// Walks the DOM keeping visible text, dropping scripts, styles and chrome containers.
#[derive(Debug, Default)]
pub struct BoilerplateStrategy;

impl BoilerplateStrategy {
    pub fn get_dom(html: &str) -> Result<RcDom> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut Cursor::new(html))?;
        Ok(dom)
    }

    fn has_boilerplate_class_or_id(attrs: &RefCell<Vec<Attribute>>) -> bool {
        attrs.borrow().iter().any(|attr| {
            matches!(&*attr.name.local, "class" | "id") && is_boilerplate_name(&attr.value)
        })
    }

    fn is_block_like(local: &LocalName) -> bool {
        matches!(
            &**local,
            "p" | "div"
                | "section"
                | "article"
                | "main"
                | "li"
                | "ul"
                | "ol"
                | "h1"
                | "h2"
                | "h3"
                | "h4"
                | "h5"
                | "h6"
                | "blockquote"
                | "pre"
                | "table"
                | "tr"
                | "br"
        )
    }

    pub fn walk_html(handle: &Handle, out: &mut String) {
        match &handle.data {
            NodeData::Text { contents } => {
                let contents = contents.borrow();
                let s = contents.trim();
                if s.is_empty() {
                    return;
                }
                if !out.is_empty() && !out.ends_with(' ') && !out.ends_with('\n') {
                    out.push(' ');
                }
                out.push_str(s);
            }
            NodeData::Element { name, attrs, .. } => {
                let local = &name.local;
                if is_skipped_tag(local) || Self::has_boilerplate_class_or_id(attrs) {
                    return;
                }

                let block = Self::is_block_like(local);
                if block && !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
                if block && !out.ends_with('\n') {
                    out.push('\n');
                }
            }
            _ => {
                for child in handle.children.borrow().iter() {
                    Self::walk_html(child, out);
                }
            }
        }
    }

    /// Trims every line and drops the blank ones.
    pub fn compress_whitespaces(text: &str) -> String {
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl ExtractionStrategy for BoilerplateStrategy {
    fn name(&self) -> &'static str {
        "boilerplate"
    }

    fn extract(&self, html: &str) -> Result<Option<String>> {
        let dom = Self::get_dom(html)?;
        let mut out = String::new();
        Self::walk_html(&dom.document, &mut out);
        let text = Self::compress_whitespaces(&out);
        Ok((!text.is_empty()).then_some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_whitespaces() {
        assert_eq!(BoilerplateStrategy::compress_whitespaces("\n\n\n\n"), "");
        assert_eq!(
            BoilerplateStrategy::compress_whitespaces(
                "something\n\n\n\n else is going one\n\n\n\nsomething     "
            ),
            "something\nelse is going one\nsomething"
        );
    }

    #[test]
    fn test_drops_scripts_and_chrome() {
        let html = r#"<html><head><title>Ignored</title></head><body>
            <nav><a href="/">Home</a></nav>
            <div class="cookie-banner">We use cookies</div>
            <h1>Hello World</h1><p>This is a test</p>
            <script>alert('Hello World')</script>
            <footer>Copyright</footer>
            </body></html>"#;
        let text = BoilerplateStrategy.extract(html).unwrap().unwrap();
        assert_eq!(text, "Hello World\nThis is a test");
    }

    #[test]
    fn test_boilerplate_name_matches_whole_tokens() {
        assert!(is_boilerplate_name("site-footer"));
        assert!(is_boilerplate_name("main_nav"));
        assert!(!is_boilerplate_name("downloads"));
        assert!(!is_boilerplate_name("article-body"));
    }

    #[test]
    fn test_empty_document_yields_none() {
        let html = "<html><body><script>var x = 1;</script></body></html>";
        assert_eq!(BoilerplateStrategy.extract(html).unwrap(), None);
    }
}
