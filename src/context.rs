//! Renders a ranked [`SearchResult`] into a system message and splices it into
//! a chat-completion request body.

use std::collections::BTreeMap;
use std::fmt::Write;

use serde_json::{Value, json};

use crate::data_models::{SearchResult, WebPage};

const CHUNK_SEPARATOR: &str = " [...] ";

const INSTRUCTIONS: &[&str] = &[
    "Cite the sources you use inline by their id, for example [1] or [2][3].",
    "Do not speculate beyond what the sources say; if they do not answer the question, say so.",
    "When sources disagree, prefer the one with the more recent publication date.",
];

/// Text of the most recent user message. Content may be a plain string or a
/// list of `{type: "text", text}` parts.
pub fn extract_query(messages: &[Value]) -> Option<String> {
    let message = messages
        .iter()
        .rev()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))?;

    let text = match message.get("content")? {
        Value::String(s) => s.trim().to_string(),
        Value::Array(parts) => parts
            .iter()
            .filter(|p| p.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

/// What a page contributes to the context, if anything.
fn page_text(page: &WebPage) -> Option<String> {
    match &page.chunks {
        Some(chunks) if !chunks.is_empty() => Some(chunks.join(CHUNK_SEPARATOR)),
        Some(_) => None,
        None => page
            .content
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
    }
}

/// Builds the `<search_results>` block and the `id -> url` map of the sources in it.
pub fn build_context(result: &SearchResult, query: &str) -> (String, BTreeMap<String, String>) {
    let mut sources = BTreeMap::new();
    let mut out = String::new();

    out.push_str("<search_results>\n");
    let _ = writeln!(out, "<query>{query}</query>");
    if let Some(summary) = result.summary.as_deref().filter(|s| !s.trim().is_empty()) {
        let _ = writeln!(out, "<search_summary>{summary}</search_summary>");
    }

    let mut id = 0;
    for page in &result.webpages {
        let Some(text) = page_text(page) else {
            continue;
        };
        id += 1;
        sources.insert(id.to_string(), page.url.clone());

        let _ = writeln!(out, "<source id=\"{id}\">");
        if let Some(title) = &page.title {
            let _ = writeln!(out, "<title>{title}</title>");
        }
        let _ = writeln!(out, "<url>{}</url>", page.url);
        if let Some(date) = &page.publication_date {
            let _ = writeln!(out, "<published>{date}</published>");
        }
        if let Some(summary) = &page.summary {
            let _ = writeln!(out, "<summary>{summary}</summary>");
        }
        let _ = writeln!(out, "<content>{text}</content>");
        out.push_str("</source>\n");
    }

    out.push_str("<instructions>\n");
    for line in INSTRUCTIONS {
        let _ = writeln!(out, "- {line}");
    }
    out.push_str("</instructions>\n</search_results>");

    (out, sources)
}

/// Inserts the context as a system message right before the last user message
/// (or at the end when there is none).
///
/// Bodies that are not JSON objects with a `messages` array, or results with no
/// usable source, come back byte-for-byte unchanged with an empty map.
pub fn inject_context(
    body: &[u8],
    result: &SearchResult,
    query: &str,
) -> (Vec<u8>, BTreeMap<String, String>) {
    let unchanged = || (body.to_vec(), BTreeMap::new());

    let Ok(mut data) = serde_json::from_slice::<Value>(body) else {
        log::warn!("request body is not valid json, leaving it untouched");
        return unchanged();
    };
    let Some(messages) = data.get_mut("messages").and_then(Value::as_array_mut) else {
        log::warn!("request body has no messages array, leaving it untouched");
        return unchanged();
    };

    let (block, sources) = build_context(result, query);
    if sources.is_empty() {
        log::info!("no sources survived for {query:?}, nothing to inject");
        return unchanged();
    }

    let message = json!({ "role": "system", "content": block });
    match messages
        .iter()
        .rposition(|m| m.get("role").and_then(Value::as_str) == Some("user"))
    {
        Some(idx) => messages.insert(idx, message),
        None => messages.push(message),
    }

    match serde_json::to_vec(&data) {
        Ok(bytes) => {
            log::info!(
                "injected {} sources ({} -> {} bytes)",
                sources.len(),
                body.len(),
                bytes.len()
            );
            (bytes, sources)
        }
        Err(e) => {
            log::error!("failed to serialize enhanced body: {e}");
            unchanged()
        }
    }
}
