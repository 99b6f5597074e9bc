//! File scanning: context assessment, fixed-size chunking with boundary
//! snapping, and natural-boundary detection.
//!
//! All offsets and sizes are in characters, not bytes, so multibyte text
//! never gets split mid-character.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;
pub const DEFAULT_OVERLAP: usize = 500;

/// How far back from a chunk's hard limit to look for a natural break.
const BOUNDARY_LOOKBACK: usize = 2_000;

#[derive(Debug, Serialize)]
pub struct Assessment {
    pub file: String,
    pub file_size_bytes: u64,
    pub line_count: usize,
    pub char_count: usize,
    pub estimated_tokens: usize,
    pub suggested_chunks: usize,
    pub has_structure: bool,
    pub structure_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Chunk {
    pub index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub char_count: usize,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct Boundary {
    pub line: usize,
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

fn markdown_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#{1,6}\s").expect("valid regex"))
}

fn definition_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(def |class )").expect("valid regex"))
}

/// Read a file as text, replacing invalid UTF-8 rather than failing.
pub fn read_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Context assessment for a file.
pub fn assess(path: &Path) -> Result<Assessment> {
    let metadata =
        std::fs::metadata(path).with_context(|| format!("stat {}", path.display()))?;
    let content = read_text(path)?;

    let char_count = content.chars().count();
    let line_count = content.matches('\n').count()
        + usize::from(!content.is_empty() && !content.ends_with('\n'));
    let suggested_chunks = char_count.div_ceil(DEFAULT_CHUNK_SIZE).max(1);

    let has_markdown_headers = content.lines().any(|l| markdown_header_re().is_match(l));
    let has_defs = content.lines().any(|l| definition_re().is_match(l));

    let mut structure_types = Vec::new();
    if has_markdown_headers {
        structure_types.push("markdown_headers".to_string());
    }
    if has_defs {
        structure_types.push("python_defs".to_string());
    }

    Ok(Assessment {
        file: path.display().to_string(),
        file_size_bytes: metadata.len(),
        line_count,
        char_count,
        estimated_tokens: char_count / 4,
        suggested_chunks,
        has_structure: has_markdown_headers || has_defs,
        structure_types,
    })
}

/// Split content into chunks of roughly `size` characters, snapping each
/// break point backward to a blank line (preferred) or a newline, and
/// carrying `overlap` characters between consecutive chunks.
pub fn chunk(content: &str, size: usize, overlap: usize) -> Vec<Chunk> {
    let chars: Vec<char> = content.chars().collect();

    if chars.len() <= size {
        return vec![Chunk {
            index: 0,
            start_char: 0,
            end_char: chars.len(),
            char_count: chars.len(),
            content: content.to_string(),
        }];
    }

    let mut chunks = Vec::new();
    let mut pos = 0usize;
    let mut index = 0usize;

    while pos < chars.len() {
        let mut end = (pos + size).min(chars.len());

        // Not at end of file: look backward for a good break point.
        if end < chars.len() {
            let search_start = (pos + size).saturating_sub(BOUNDARY_LOOKBACK).max(pos);
            let segment = &chars[search_start..end];
            if let Some(i) = rfind_blank_line(segment) {
                end = search_start + i + 2;
            } else if let Some(i) = segment.iter().rposition(|c| *c == '\n') {
                end = search_start + i + 1;
            }
        }

        let content: String = chars[pos..end].iter().collect();
        chunks.push(Chunk {
            index,
            start_char: pos,
            end_char: end,
            char_count: end - pos,
            content,
        });

        if end == chars.len() {
            break;
        }
        // Advance, accounting for overlap but always making progress.
        pos = end.saturating_sub(overlap).max(pos + 1);
        index += 1;
    }

    chunks
}

/// Index of the last `\n\n` pair in the segment.
fn rfind_blank_line(segment: &[char]) -> Option<usize> {
    (0..segment.len().saturating_sub(1))
        .rev()
        .find(|&i| segment[i] == '\n' && segment[i + 1] == '\n')
}

/// Detect natural boundaries: markdown headers, `def `/`class ` lines, and
/// blank lines separating non-blank neighbors (paragraph breaks).
pub fn boundaries(content: &str) -> Vec<Boundary> {
    let lines: Vec<&str> = content.lines().collect();
    let mut found = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if markdown_header_re().is_match(line) {
            found.push(Boundary {
                line: i + 1,
                kind: "markdown_header".to_string(),
                text: line.trim_end().to_string(),
            });
        } else if definition_re().is_match(line) {
            found.push(Boundary {
                line: i + 1,
                kind: "python_def".to_string(),
                text: line.trim_end().to_string(),
            });
        } else if line.trim().is_empty()
            && i > 0
            && i + 1 < lines.len()
            && !lines[i - 1].trim().is_empty()
            && !lines[i + 1].trim().is_empty()
        {
            found.push(Boundary {
                line: i + 1,
                kind: "paragraph_break".to_string(),
                text: String::new(),
            });
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    #[test]
    fn test_assess_counts_and_structure() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "# Title\n\ndef foo():\n    return 1\n").unwrap();
        let assessment = assess(file.path()).unwrap();

        assert_eq!(assessment.line_count, 4);
        assert_eq!(assessment.char_count, 33);
        assert_eq!(assessment.estimated_tokens, 8);
        assert_eq!(assessment.suggested_chunks, 1);
        assert!(assessment.has_structure);
        assert_eq!(
            assessment.structure_types,
            vec!["markdown_headers", "python_defs"]
        );
    }

    #[test]
    fn test_assess_line_count_without_trailing_newline() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "one\ntwo").unwrap();
        let assessment = assess(file.path()).unwrap();
        assert_eq!(assessment.line_count, 2);
        assert!(!assessment.has_structure);
    }

    #[test]
    fn test_small_content_is_one_chunk() {
        let chunks = chunk("short text", 100, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start_char, 0);
        assert_eq!(chunks[0].end_char, 10);
        assert_eq!(chunks[0].content, "short text");
    }

    #[test]
    fn test_chunk_snaps_to_blank_line() {
        // Two paragraphs; the limit falls inside the second one.
        let content = format!("{}\n\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = chunk(&content, 60, 0);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].end_char, 42); // right after the blank line
        assert!(chunks[0].content.ends_with("\n\n"));
    }

    #[test]
    fn test_chunk_falls_back_to_newline() {
        let content = format!("{}\n{}", "a".repeat(40), "b".repeat(40));
        let chunks = chunk(&content, 60, 0);
        assert_eq!(chunks[0].end_char, 41);
        assert!(chunks[0].content.ends_with('\n'));
    }

    #[test]
    fn test_chunks_overlap() {
        let content = "x".repeat(250);
        let chunks = chunk(&content, 100, 20);
        assert!(chunks.len() > 2);
        assert_eq!(chunks[0].end_char, 100);
        assert_eq!(chunks[1].start_char, 80);
        // Every character is covered.
        assert_eq!(chunks.last().unwrap().end_char, 250);
    }

    #[test]
    fn test_chunk_counts_chars_not_bytes() {
        let content = "é".repeat(30);
        let chunks = chunk(&content, 10, 0);
        assert_eq!(chunks[0].char_count, 10);
        assert_eq!(chunks[0].content.chars().count(), 10);
    }

    #[test]
    fn test_boundaries_detection() {
        let content = "# Head\nbody\n\nmore\nclass Foo:\ndef bar():\n";
        let found = boundaries(content);

        assert_eq!(found.len(), 4);
        assert_eq!(found[0].kind, "markdown_header");
        assert_eq!(found[0].line, 1);
        assert_eq!(found[0].text, "# Head");
        assert_eq!(found[1].kind, "paragraph_break");
        assert_eq!(found[1].line, 3);
        assert_eq!(found[2].kind, "python_def");
        assert_eq!(found[2].line, 5);
        assert_eq!(found[3].kind, "python_def");
        assert_eq!(found[3].line, 6);
    }

    #[test]
    fn test_blank_line_at_edges_is_not_a_paragraph_break() {
        let found = boundaries("\nfirst\nlast\n");
        assert!(found.is_empty());
    }
}
