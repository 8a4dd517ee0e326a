use std::collections::{HashMap, HashSet};

use anyhow::Result;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::ExtractionStrategy;
use super::boilerplate::{is_boilerplate_name, is_skipped_tag};
use crate::analyzer::count_stop_words;

static CANDIDATES: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p, pre, td").expect("static selector"));
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").expect("static selector"));

/// Paragraphs with fewer stop words than this are captions, buttons or link lists.
const MIN_STOP_WORDS: usize = 2;
const MAX_LINK_DENSITY: f64 = 0.5;
const GRANDPARENT_WEIGHT: f64 = 0.5;

fn normalized_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Share of an element's text that sits inside links.
fn link_density(el: ElementRef<'_>, text_len: usize) -> f64 {
    if text_len == 0 {
        return 0.0;
    }
    let link_len: usize = el
        .select(&LINKS)
        .map(|a| normalized_text(a).chars().count())
        .sum();
    (link_len as f64 / text_len as f64).min(1.0)
}

fn inside_chrome(el: ElementRef<'_>) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|a| {
        let v = a.value();
        is_skipped_tag(v.name())
            || v.attr("class").is_some_and(is_boilerplate_name)
            || v.attr("id").is_some_and(is_boilerplate_name)
    })
}

/// Main-content detection in the spirit of goose: every paragraph votes for
/// its parent with its stop-word count (damped by link density) and for its
/// grandparent with half of that. The best-scoring container wins and its
/// qualifying paragraphs become the article.
#[derive(Debug, Default)]
pub struct ArticleStrategy;

impl ExtractionStrategy for ArticleStrategy {
    fn name(&self) -> &'static str {
        "article"
    }

    fn extract(&self, html: &str) -> Result<Option<String>> {
        let document = Html::parse_document(html);

        let mut accepted = HashSet::new();
        let mut scores = HashMap::new();
        // containers in first-seen order, so ties go to the earlier one
        let mut containers = Vec::new();

        for el in document.select(&CANDIDATES) {
            if inside_chrome(el) {
                continue;
            }
            let text = normalized_text(el);
            let stops = count_stop_words(&text);
            if stops < MIN_STOP_WORDS {
                continue;
            }
            let density = link_density(el, text.chars().count());
            if density > MAX_LINK_DENSITY {
                continue;
            }
            accepted.insert(el.id());

            let score = stops as f64 * (1.0 - density);
            let Some(parent) = el.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            *scores.entry(parent.id()).or_insert_with(|| {
                containers.push(parent.id());
                0.0
            }) += score;

            if let Some(grandparent) = parent.parent().and_then(ElementRef::wrap) {
                *scores.entry(grandparent.id()).or_insert_with(|| {
                    containers.push(grandparent.id());
                    0.0
                }) += score * GRANDPARENT_WEIGHT;
            }
        }

        let mut best = None;
        let mut best_score = 0.0_f64;
        for id in containers {
            let score = scores.get(&id).copied().unwrap_or(0.0);
            if score > best_score {
                best_score = score;
                best = Some(id);
            }
        }
        let Some(top) = best
            .and_then(|id| document.tree.get(id))
            .and_then(ElementRef::wrap)
        else {
            return Ok(None);
        };

        let paragraphs: Vec<String> = top
            .select(&CANDIDATES)
            .filter(|el| accepted.contains(&el.id()))
            // a <p> inside an accepted <td> would be emitted twice
            .filter(|el| {
                !el.ancestors()
                    .take_while(|a| a.id() != top.id())
                    .any(|a| accepted.contains(&a.id()))
            })
            .map(normalized_text)
            .collect();

        if paragraphs.is_empty() {
            return Ok(None);
        }
        Ok(Some(paragraphs.join("\n\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="menu"><p>Home and the rest of the links are in the menu</p></div>
        <div id="content">
          <h1>The Lightning Network</h1>
          <p>The Lightning Network is a layer two protocol that is built on top of Bitcoin.</p>
          <p>It allows users to send payments off chain and it settles them later on the base layer.</p>
          <p><a href="/a">Related</a> <a href="/b">Links</a></p>
        </div>
        <div class="sidebar"><p>This is a sidebar that has some of the words in it.</p></div>
        </body></html>"#;

    #[test]
    fn test_picks_main_container() {
        let text = ArticleStrategy.extract(PAGE).unwrap().unwrap();
        assert_eq!(
            text,
            "The Lightning Network is a layer two protocol that is built on top of Bitcoin.\n\n\
             It allows users to send payments off chain and it settles them later on the base layer."
        );
    }

    #[test]
    fn test_no_prose_yields_none() {
        let html = "<html><body><ul><li>One</li><li>Two</li></ul></body></html>";
        assert_eq!(ArticleStrategy.extract(html).unwrap(), None);
    }

    #[test]
    fn test_link_heavy_paragraph_is_ignored() {
        let html = r#"<div><p><a href="/x">this is all of it a link to the other page</a></p></div>"#;
        assert_eq!(ArticleStrategy.extract(html).unwrap(), None);
    }
}
