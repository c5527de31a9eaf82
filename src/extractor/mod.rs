#[cfg(test)]
mod tests;

use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A heading-delimited (or fallback-derived) block of text extracted from
/// one source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text, or a fixed label for fallback sections.
    pub heading: String,
    /// Concatenated body text, single-space separated and trimmed.
    pub content: String,
    /// Heading tag name (`h1`..`h6`), or `body` for fallback sections.
    pub section_type: String,
    /// Identifier of the document this section came from.
    pub source_id: String,
}

/// Elements whose subtrees carry no content and are removed up front.
const STRIP_SELECTOR: &str = "script, style, nav, footer, header";

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// Block and inline elements whose text counts toward a heading's section
/// when they appear as following siblings of that heading.
const SECTION_BODY_TAGS: [&str; 7] = ["p", "div", "span", "li", "td", "pre", "code"];

const HEADING_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Extract labeled sections from a raw HTML document.
///
/// Parsing is tolerant: malformed markup never fails, it just yields
/// whatever the parser could recover. Three strategies are tried in order
/// and the first one that produces any section wins:
///
/// 1. heading-based splitting (one section per `h1`..`h6` with body text)
/// 2. joined paragraph/div/article text as a single "Main Content" section
/// 3. all text under the content root as a single "Page Content" section
///
/// A document where all three come up empty contributes zero sections.
#[inline]
pub fn extract_sections(html: &str, source_id: &str) -> Vec<Section> {
    let mut document = Html::parse_document(html);
    strip_non_content(&mut document);

    let root = content_root(&document);

    let mut sections = heading_sections(root, source_id);

    if sections.is_empty() {
        sections = paragraph_fallback(root, source_id);
    }

    if sections.is_empty() {
        sections = whole_text_fallback(root, source_id);
    }

    debug!(
        "Extracted {} sections from source {}",
        sections.len(),
        source_id
    );

    sections
}

/// Detach script/style/navigation subtrees so no strategy sees their text.
fn strip_non_content(document: &mut Html) {
    let unwanted = Selector::parse(STRIP_SELECTOR).expect("valid selector");

    let unwanted_ids: Vec<_> = document.select(&unwanted).map(|element| element.id()).collect();
    for node_id in unwanted_ids {
        if let Some(mut node) = document.tree.get_mut(node_id) {
            node.detach();
        }
    }
}

/// Locate the primary content root: `main`, else `article`, else `body`,
/// else the whole document.
fn content_root(document: &Html) -> ElementRef<'_> {
    let main = Selector::parse("main").expect("valid selector");
    let article = Selector::parse("article").expect("valid selector");
    let body = Selector::parse("body").expect("valid selector");

    document
        .select(&main)
        .next()
        .or_else(|| document.select(&article).next())
        .or_else(|| document.select(&body).next())
        .unwrap_or_else(|| document.root_element())
}

/// One section per heading, covering the sibling content between it and
/// the next heading of any level. Headings with no collected content are
/// skipped.
fn heading_sections(root: ElementRef<'_>, source_id: &str) -> Vec<Section> {
    let headings = Selector::parse(HEADING_SELECTOR).expect("valid selector");

    let mut sections = Vec::new();

    for heading in root.select(&headings) {
        let mut fragments: Vec<String> = Vec::new();

        for sibling in heading.next_siblings() {
            match sibling.value() {
                Node::Element(element) if HEADING_TAGS.contains(&element.name()) => break,
                Node::Element(element) if SECTION_BODY_TAGS.contains(&element.name()) => {
                    if let Some(element_ref) = ElementRef::wrap(sibling) {
                        let text = collapse_whitespace(element_ref.text());
                        if !text.is_empty() {
                            fragments.push(text);
                        }
                    }
                }
                Node::Text(text) => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        fragments.push(trimmed.to_string());
                    }
                }
                _ => {}
            }
        }

        if fragments.is_empty() {
            continue;
        }

        sections.push(Section {
            heading: collapse_whitespace(heading.text()),
            content: fragments.join(" "),
            section_type: heading.value().name().to_string(),
            source_id: source_id.to_string(),
        });
    }

    sections
}

/// Join the text of every paragraph-like block under the root into one
/// "Main Content" section.
fn paragraph_fallback(root: ElementRef<'_>, source_id: &str) -> Vec<Section> {
    let blocks = Selector::parse("p, div, article").expect("valid selector");

    let fragments: Vec<String> = root
        .select(&blocks)
        .map(|element| collapse_whitespace(element.text()))
        .filter(|text| !text.is_empty())
        .collect();

    if fragments.is_empty() {
        return Vec::new();
    }

    vec![Section {
        heading: "Main Content".to_string(),
        content: fragments.join(" "),
        section_type: "body".to_string(),
        source_id: source_id.to_string(),
    }]
}

/// Last resort: all text under the root as one "Page Content" section.
fn whole_text_fallback(root: ElementRef<'_>, source_id: &str) -> Vec<Section> {
    let content = collapse_whitespace(root.text());

    if content.is_empty() {
        return Vec::new();
    }

    vec![Section {
        heading: "Page Content".to_string(),
        content,
        section_type: "body".to_string(),
        source_id: source_id.to_string(),
    }]
}

/// Collapse all whitespace runs in the concatenated text fragments to
/// single spaces and trim the ends.
fn collapse_whitespace<'a, I: Iterator<Item = &'a str>>(fragments: I) -> String {
    let mut out = String::new();
    for fragment in fragments {
        for word in fragment.split_whitespace() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}
