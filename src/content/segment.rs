//! Heading-aware greedy chunker

/// Default maximum chunk length, in characters
pub const DEFAULT_MAX_CHUNK_LEN: usize = 1600;

/// Splits extracted text into heading-bounded, length-bounded chunks
///
/// Lines are trimmed and blank lines dropped. A line that starts with `#`,
/// or whose length would push the accumulated length past `max_len`, closes
/// the current chunk and opens the next one. Only line lengths are counted,
/// not the `\n` separators they are joined with, so a chunk can exceed
/// `max_len` by its line count minus one. A single line longer than
/// `max_len` becomes a chunk of its own and is never split.
///
/// # Arguments
///
/// * `text` - The extracted page text
/// * `max_len` - Length bound in Unicode scalar values
///
/// # Returns
///
/// The chunks in document order. Never empty: when no line survives, the
/// original text is returned as the only chunk.
pub fn segment(text: &str, max_len: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let line_len = line.chars().count();
        if (line.starts_with('#') || current_len + line_len > max_len) && !current.is_empty() {
            chunks.push(current.join("\n"));
            current.clear();
            current_len = 0;
        }

        current.push(line);
        current_len += line_len;
    }

    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    if chunks.is_empty() {
        chunks.push(text.to_string());
    }

    chunks
}
