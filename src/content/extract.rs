//! Text extraction from fetched bodies
//!
//! Extraction runs in three tiers and never fails:
//! 1. Main-content extraction: find the article container and render it to
//!    lines, keeping headings as markdown `#` lines
//! 2. Markup stripping: all document text with whitespace collapsed
//! 3. The raw body as (lossy) UTF-8 text
//!
//! Non-HTML bodies go straight to tier 3.

use scraper::{ElementRef, Html, Node, Selector};

/// Subtrees never rendered as content
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form",
];

/// Elements that start and end a line
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "details", "div", "dl", "dt", "figcaption",
    "figure", "hr", "li", "main", "ol", "p", "pre", "section", "summary", "table", "td", "th",
    "tr", "ul",
];

/// Containers tried, in order, before falling back to paragraph scoring
const CONTAINER_SELECTORS: &[&str] = &["article", "main", "[role=main]"];

/// Which tier produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionTier {
    Readable,
    Stripped,
    Raw,
}

impl ExtractionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Readable => "readable",
            Self::Stripped => "stripped",
            Self::Raw => "raw",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub text: String,
    pub tier: ExtractionTier,
}

/// Whether a `Content-Type` value names an HTML document
///
/// A missing header is treated as HTML.
pub fn is_html(content_type: Option<&str>) -> bool {
    let Some(content_type) = content_type else {
        return true;
    };

    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime.is_empty() || mime == "text/html" || mime == "application/xhtml+xml"
}

/// Extracts text from a response body
///
/// # Arguments
///
/// * `body` - The raw response bytes
/// * `content_type` - The response `Content-Type` header, if any
pub fn extract_text(body: &[u8], content_type: Option<&str>) -> Extracted {
    let raw = String::from_utf8_lossy(body);

    if is_html(content_type) {
        let document = Html::parse_document(&raw);

        if let Some(text) = readable_text(&document) {
            return Extracted {
                text,
                tier: ExtractionTier::Readable,
            };
        }

        if let Some(text) = stripped_text(&document) {
            return Extracted {
                text,
                tier: ExtractionTier::Stripped,
            };
        }
    }

    Extracted {
        text: raw.into_owned(),
        tier: ExtractionTier::Raw,
    }
}

/// Tier 1: render the main content container
fn readable_text(document: &Html) -> Option<String> {
    let container = find_container(document)?;

    let mut writer = LineWriter::default();
    render_children(container, &mut writer);
    let text = writer.finish();

    (!text.is_empty()).then_some(text)
}

/// Tier 2: every text node outside scripts and styles, whitespace collapsed
fn stripped_text(document: &Html) -> Option<String> {
    let mut parts = Vec::new();
    collect_text(document.root_element(), &mut parts);

    let text = parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ");

    (!text.is_empty()).then_some(text)
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn find_container(document: &Html) -> Option<ElementRef<'_>> {
    for css in CONTAINER_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };
        if let Some(found) = document.select(&selector).next() {
            return Some(found);
        }
    }

    // Otherwise the block holding the most paragraph text directly
    let candidates = selector("div, section, body")?;
    let mut best: Option<(ElementRef<'_>, usize)> = None;

    for element in document.select(&candidates) {
        let score = paragraph_score(element);
        if score > 0 && best.map_or(true, |(_, top)| score > top) {
            best = Some((element, score));
        }
    }

    best.map(|(element, _)| element)
}

fn paragraph_score(element: ElementRef<'_>) -> usize {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == "p")
        .map(|p| p.text().map(|t| t.trim().chars().count()).sum::<usize>())
        .sum()
}

fn render_children(element: ElementRef<'_>, writer: &mut LineWriter) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => writer.push_text(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    render_element(child, writer);
                }
            }
            _ => {}
        }
    }
}

fn render_element(element: ElementRef<'_>, writer: &mut LineWriter) {
    let name = element.value().name();

    if SKIPPED_TAGS.contains(&name) {
        return;
    }

    if let Some(level) = heading_level(name) {
        let text = element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            writer.push_line(format!("{} {}", "#".repeat(level), text));
        }
        return;
    }

    if name == "br" {
        writer.break_line();
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if block {
        writer.break_line();
    }
    render_children(element, writer);
    if block {
        writer.break_line();
    }
}

fn heading_level(name: &str) -> Option<usize> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !matches!(
                        child.value().name(),
                        "script" | "style" | "noscript" | "template"
                    ) {
                        collect_text(child, parts);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Accumulates rendered text, collapsing inline whitespace
#[derive(Default)]
struct LineWriter {
    lines: Vec<String>,
    current: String,
    pending_space: bool,
}

impl LineWriter {
    fn push_text(&mut self, text: &str) {
        for c in text.chars() {
            if c.is_whitespace() {
                self.pending_space = !self.current.is_empty();
            } else {
                if self.pending_space {
                    self.current.push(' ');
                    self.pending_space = false;
                }
                self.current.push(c);
            }
        }
    }

    fn break_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.pending_space = false;
    }

    fn push_line(&mut self, line: String) {
        self.break_line();
        self.lines.push(line);
    }

    fn finish(mut self) -> String {
        self.break_line();
        self.lines.join("\n")
    }
}
