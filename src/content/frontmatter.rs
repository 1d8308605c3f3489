//! Front-matter preamble written ahead of every forwarded chunk
//!
//! The encoder and decoder are a pair: `decode(&encode(fm, body))` yields the
//! same fields and body. Values are escaped so that a line break inside one
//! (`\n`, `\r`) stays within its own field. Documents that came from elsewhere and carry no
//! preamble decode to empty fields and their full text.

use std::collections::BTreeMap;

const DELIMITER: &str = "---";

/// Metadata describing one forwarded chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontMatter {
    pub scope: String,
    pub url: String,
    pub chunk_id: u32,
    pub docid: String,
    pub version_ts: i64,
}

impl FrontMatter {
    /// Rebuilds typed metadata from decoded fields, if all of them are present
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Option<Self> {
        Some(Self {
            scope: fields.get("scope")?.clone(),
            url: fields.get("url")?.clone(),
            chunk_id: fields.get("chunk_id")?.parse().ok()?,
            docid: fields.get("docid")?.clone(),
            version_ts: fields.get("version_ts")?.parse().ok()?,
        })
    }
}

/// A document split into its preamble fields and body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedDocument {
    pub fields: BTreeMap<String, String>,
    pub body: String,
}

impl DecodedDocument {
    pub fn front_matter(&self) -> Option<FrontMatter> {
        FrontMatter::from_fields(&self.fields)
    }
}

/// Prepends the preamble to `body`
pub fn encode(front_matter: &FrontMatter, body: &str) -> String {
    format!(
        "{delim}\nscope: {}\nurl: {}\nchunk_id: {}\ndocid: {}\nversion_ts: {}\n{delim}\n\n{}",
        escape(&front_matter.scope),
        escape(&front_matter.url),
        front_matter.chunk_id,
        escape(&front_matter.docid),
        front_matter.version_ts,
        body,
        delim = DELIMITER,
    )
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Reverses [`escape`]; an unknown or trailing escape is kept literally
fn unescape(value: &str) -> String {
    let mut unescaped = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('r') => unescaped.push('\r'),
            Some('\\') => unescaped.push('\\'),
            Some(other) => {
                unescaped.push('\\');
                unescaped.push(other);
            }
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

/// Splits a document into preamble fields and body
///
/// Each preamble line is split on its first `:` and the value unescaped;
/// lines without a `:` are ignored. The preamble ends at the first line that
/// is exactly `---`. A near miss such as `--- ` or `----` does not close it,
/// and a preamble that is never closed is treated as plain body text, with
/// any fields read so far discarded.
pub fn decode(text: &str) -> DecodedDocument {
    let Some(rest) = text.strip_prefix("---\n") else {
        return plain(text);
    };

    let mut fields = BTreeMap::new();
    let mut offset = 0;

    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        if line == DELIMITER {
            let body = &rest[offset..];
            let body = body.strip_prefix('\n').unwrap_or(body);
            return DecodedDocument {
                fields,
                body: body.to_string(),
            };
        }

        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim().to_string(), unescape(value.trim()));
        }
    }

    plain(text)
}

fn plain(text: &str) -> DecodedDocument {
    DecodedDocument {
        fields: BTreeMap::new(),
        body: text.to_string(),
    }
}
