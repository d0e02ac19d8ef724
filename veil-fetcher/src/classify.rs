//! Content-kind detection, embedded-document unwrapping, and the
//! block-page heuristic.

use crate::outcome::{ContentKind, FetchError, Payload};
use serde_json::Value;
use url::Url;

/// Rules driving classification and extraction. Immutable per fetcher.
#[derive(Debug, Clone)]
pub struct ExtractionRules {
    /// Root element names an embedded XML document may use.
    pub root_tags: Vec<String>,
    /// Lower-case phrases that mark a denial page.
    pub block_phrases: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            root_tags: vec!["ownershipDocument".to_string()],
            block_phrases: vec!["access denied".to_string(), "blocked".to_string()],
        }
    }
}

/// Classified payload plus any note about extraction performed.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub kind: ContentKind,
    pub payload: Payload,
    pub note: Option<String>,
}

/// Classify a raw body into a content kind, unwrapping embedded XML when an
/// HTML shell surrounds it and rejecting denial pages.
pub fn classify(
    url: &str,
    content_type: Option<&str>,
    raw: &str,
    rules: &ExtractionRules,
) -> Result<Classified, FetchError> {
    let declared = content_type.unwrap_or_default().to_ascii_lowercase();
    let trimmed = raw.trim();

    if declared.contains("application/json") {
        let value: Value = serde_json::from_str(trimmed).map_err(|e| {
            FetchError::malformed(format!("body declared application/json does not parse: {e}"))
        })?;
        return Ok(Classified {
            kind: ContentKind::Json,
            payload: Payload::Json(value),
            note: None,
        });
    }

    // Undeclared JSON: endpoint routes that answer JSON without saying so.
    if let Some(value) = sniff_json(trimmed) {
        return Ok(Classified {
            kind: ContentKind::Json,
            payload: Payload::Json(value),
            note: None,
        });
    }

    let looks_xml = path_ends_with(url, ".xml")
        || declared.contains("xml")
        || trimmed.starts_with("<?xml");

    if looks_xml {
        if starts_with_html(trimmed) {
            // Anti-bot and CDN layers wrap raw documents in an HTML shell.
            return match unwrap_embedded_xml(trimmed, rules) {
                Some((document, note)) => Ok(Classified {
                    kind: ContentKind::Xml,
                    payload: Payload::Text(document),
                    note: Some(note),
                }),
                None => Err(FetchError::malformed(
                    "expected xml but found an html wrapper with no xml structure inside",
                )),
            };
        }
        return Ok(Classified {
            kind: ContentKind::Xml,
            payload: Payload::Text(trimmed.to_string()),
            note: None,
        });
    }

    let kind = if starts_with_html(trimmed) || declared.contains("text/html") {
        ContentKind::Html
    } else {
        ContentKind::Unknown
    };

    // Denial pages often arrive as readable 200 OK bodies.
    if let Some(phrase) = find_block_phrase(trimmed, rules) {
        return Err(FetchError::blocked(format!(
            "block indicator {phrase:?} present in {kind} body"
        )));
    }

    Ok(Classified {
        kind,
        payload: Payload::Text(raw.to_string()),
        note: None,
    })
}

fn path_ends_with(url: &str, suffix: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with(suffix),
        Err(_) => url.ends_with(suffix),
    }
}

/// Parse the body as JSON, accepting only documents (objects or arrays) so
/// bare words and numbers do not masquerade as JSON responses.
fn sniff_json(trimmed: &str) -> Option<Value> {
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return None;
    }
    serde_json::from_str::<Value>(trimmed).ok()
}

fn starts_with_html(trimmed: &str) -> bool {
    let head: String = trimmed.chars().take(64).collect::<String>().to_ascii_lowercase();
    head.starts_with("<html") || head.starts_with("<!doctype html")
}

/// Slice an embedded XML document out of an HTML wrapper.
///
/// Tries each expected root element first; falls back to everything from
/// the first `<?xml` declaration onward.
fn unwrap_embedded_xml(wrapper: &str, rules: &ExtractionRules) -> Option<(String, String)> {
    for tag in &rules.root_tags {
        if let Some(span) = find_root_span(wrapper, tag) {
            return Some((
                span.to_string(),
                format!("extracted <{tag}> document from html wrapper"),
            ));
        }
    }
    if let Some(start) = wrapper.find("<?xml") {
        return Some((
            wrapper[start..].trim_end().to_string(),
            "extracted content from first <?xml declaration onward".to_string(),
        ));
    }
    None
}

/// Locate `<tag ...>` through `</tag>` inclusive.
fn find_root_span<'a>(wrapper: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let mut search_from = 0;
    while let Some(rel) = wrapper[search_from..].find(&open) {
        let start = search_from + rel;
        // Reject prefix matches such as `<ownershipDocuments>`.
        let following = wrapper[start + open.len()..].chars().next();
        if matches!(following, Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r')) {
            let end = wrapper[start..].find(&close)?;
            return Some(&wrapper[start..start + end + close.len()]);
        }
        search_from = start + open.len();
    }
    None
}

fn find_block_phrase<'a>(body: &str, rules: &'a ExtractionRules) -> Option<&'a str> {
    let lowered = body.to_lowercase();
    rules
        .block_phrases
        .iter()
        .map(String::as_str)
        .find(|phrase| lowered.contains(&phrase.to_lowercase()))
}
