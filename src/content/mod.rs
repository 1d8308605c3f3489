//! Content segmentation and change detection
//!
//! This module turns a fetched body into the units the crawler versions:
//! - `extract`: body bytes to text (three tiers, never fails)
//! - `segment`: text to heading-aware, length-bounded chunks
//! - `simhash`: per-chunk fingerprints and the change threshold
//! - `docid`: identifiers for versioned chunk submissions
//! - `frontmatter`: the preamble attached to forwarded chunks

pub mod docid;
pub mod extract;
pub mod frontmatter;
pub mod segment;
pub mod simhash;

pub use docid::{make_docid, url_hash};
pub use extract::{extract_text, is_html, ExtractionTier, Extracted};
pub use frontmatter::{DecodedDocument, FrontMatter};
pub use segment::{segment, DEFAULT_MAX_CHUNK_LEN};
pub use simhash::{hamming_distance, is_changed, simhash, HAMMING_THRESHOLD};
