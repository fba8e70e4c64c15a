use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{
    ChunkingConfig, CPP_SEPARATORS, DEFAULT_CONTEXT_WINDOW_CAP, DEFAULT_SEPARATORS,
    PYTHON_SEPARATORS, SCRIPT_SEPARATORS,
};

/// `separator_used` value for chunks produced by the line-based fallback.
pub const LINE_BASED: &str = "line-based";

const TITLE_MAX_CHARS: usize = 50;

/// A bounded slice of source text prepared for embedding.
///
/// `content` is always `source[start_offset..end_offset]` (byte offsets).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    pub content: String,
    pub chunk_index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
    /// Separator that produced this chunk, [`LINE_BASED`] for the line
    /// fallback, `None` when the input fit in a single chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub separator_used: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preceding_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following_text: Option<String>,
    pub source_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_page: Option<u32>,
    /// SHA-256 of `content`, hex encoded.
    pub hash: String,
    pub chunk_created_at: DateTime<Utc>,
}

/// Where the chunked text came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    pub source_file: String,
    pub source_page: Option<u32>,
}

impl SourceMetadata {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            source_file: path.into(),
            source_page: None,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.source_page = Some(page);
        self
    }
}

/// Byte range of a chunk before it is materialized.
struct Span {
    start: usize,
    end: usize,
    separator: Option<String>,
}

/// Hierarchical, size-bounded text splitter.
#[derive(Debug, Clone)]
pub struct Chunker {
    max_chunk_size: usize,
    overlap: usize,
    context_window_cap: usize,
}

impl Chunker {
    pub fn new(max_chunk_size: usize, overlap: usize) -> Self {
        Self {
            max_chunk_size: max_chunk_size.max(1),
            overlap,
            context_window_cap: DEFAULT_CONTEXT_WINDOW_CAP,
        }
    }

    pub fn with_config(config: &ChunkingConfig) -> Self {
        Self {
            context_window_cap: config.context_window_cap,
            ..Self::new(config.max_chunk_size, config.overlap)
        }
    }

    /// Split `text` into chunks, trying `separators` in priority order and
    /// falling back to whole lines.
    pub fn chunk(&self, separators: &[&str], text: &str, source: &SourceMetadata) -> Vec<TextChunk> {
        let mut spans = Vec::new();
        if text.len() <= self.max_chunk_size {
            spans.push(Span {
                start: 0,
                end: text.len(),
                separator: None,
            });
        } else {
            self.split(text, 0, text.len(), separators, &mut spans);
        }

        let created_at = Utc::now();
        let mut chunks: Vec<TextChunk> = spans
            .into_iter()
            .enumerate()
            .map(|(index, span)| {
                let content = &text[span.start..span.end];
                TextChunk {
                    content: content.to_string(),
                    chunk_index: index,
                    start_offset: span.start,
                    end_offset: span.end,
                    separator_used: span.separator,
                    title: title_of(content),
                    preceding_text: None,
                    following_text: None,
                    source_file: source.source_file.clone(),
                    source_page: source.source_page,
                    hash: hex::encode(Sha256::digest(content.as_bytes())),
                    chunk_created_at: created_at,
                }
            })
            .collect();

        self.link_context(&mut chunks);
        chunks
    }

    /// Split `text[start..end]`, which is larger than the maximum size.
    fn split(&self, text: &str, start: usize, end: usize, separators: &[&str], out: &mut Vec<Span>) {
        let Some((&separator, rest)) = separators.split_first() else {
            self.split_lines(text, start, end, out);
            return;
        };

        let segment = &text[start..end];
        let mut bounds: Vec<usize> = segment
            .match_indices(separator)
            .map(|(i, _)| start + i)
            .filter(|&i| i > start)
            .collect();
        bounds.insert(0, start);
        bounds.push(end);

        let mut buffer: Option<(usize, usize)> = None;
        for piece in bounds.windows(2) {
            let (piece_start, piece_end) = (piece[0], piece[1]);

            if let Some((buf_start, buf_end)) = buffer {
                if piece_end - buf_start > self.max_chunk_size {
                    out.push(Span {
                        start: buf_start,
                        end: buf_end,
                        separator: Some(separator.to_string()),
                    });
                    buffer = None;
                }
            }

            if piece_end - piece_start > self.max_chunk_size {
                self.split(text, piece_start, piece_end, rest, out);
                continue;
            }

            let buf_start = buffer.map_or(piece_start, |(s, _)| s);
            buffer = Some((buf_start, piece_end));
        }

        if let Some((buf_start, buf_end)) = buffer {
            out.push(Span {
                start: buf_start,
                end: buf_end,
                separator: Some(separator.to_string()),
            });
        }
    }

    /// Line-based fallback with a sliding-window overlap between chunks.
    fn split_lines(&self, text: &str, start: usize, end: usize, out: &mut Vec<Span>) {
        let line_span = |start, end| Span {
            start,
            end,
            separator: Some(LINE_BASED.to_string()),
        };

        let mut buffer: Option<(usize, usize)> = None;
        let mut line_start = start;
        for line in text[start..end].split_inclusive('\n') {
            let line_end = line_start + line.len();

            if line.len() > self.max_chunk_size {
                if let Some((s, e)) = buffer.take() {
                    out.push(line_span(s, e));
                }
                // A single line longer than the limit is cut at char boundaries.
                let mut piece_start = line_start;
                while piece_start < line_end {
                    let piece_end = floor_char_boundary(text, (piece_start + self.max_chunk_size).min(line_end))
                        .max(ceil_char_boundary(text, piece_start + 1));
                    out.push(line_span(piece_start, piece_end));
                    piece_start = piece_end;
                }
            } else if let Some((buf_start, buf_end)) = buffer {
                if line_end - buf_start > self.max_chunk_size {
                    out.push(line_span(buf_start, buf_end));
                    let tail_start = ceil_char_boundary(text, buf_end.saturating_sub(self.overlap).max(buf_start));
                    // Drop the overlap when it would push the new chunk over the limit.
                    let seed = if line_end - tail_start <= self.max_chunk_size {
                        tail_start
                    } else {
                        line_start
                    };
                    buffer = Some((seed, line_end));
                } else {
                    buffer = Some((buf_start, line_end));
                }
            } else {
                buffer = Some((line_start, line_end));
            }

            line_start = line_end;
        }

        if let Some((s, e)) = buffer {
            out.push(line_span(s, e));
        }
    }

    /// Attach short lookback/lookahead windows from neighbouring chunks.
    fn link_context(&self, chunks: &mut [TextChunk]) {
        let window = self.context_window_cap.min(self.overlap / 2);
        if window == 0 {
            return;
        }

        for i in 0..chunks.len() {
            if i > 0 {
                chunks[i].preceding_text = Some(tail(&chunks[i - 1].content, window).to_string());
            }
            if i + 1 < chunks.len() {
                chunks[i].following_text = Some(head(&chunks[i + 1].content, window).to_string());
            }
        }
    }
}

/// Separator priority list for a file, chosen by extension.
pub fn separators_for(path: &Path) -> &'static [&'static str] {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "py" => PYTHON_SEPARATORS,
        "cpp" | "cc" | "cxx" | "h" | "hpp" => CPP_SEPARATORS,
        "ts" | "js" | "tsx" | "jsx" => SCRIPT_SEPARATORS,
        _ => DEFAULT_SEPARATORS,
    }
}

fn title_of(content: &str) -> String {
    let first = content.trim().lines().next().unwrap_or("").trim();
    if first.chars().count() > TITLE_MAX_CHARS {
        let truncated: String = first.chars().take(TITLE_MAX_CHARS).collect();
        format!("{}...", truncated)
    } else {
        first.to_string()
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Last `n` bytes of `s`, widened to a char boundary.
fn tail(s: &str, n: usize) -> &str {
    &s[ceil_char_boundary(s, s.len().saturating_sub(n))..]
}

/// First `n` bytes of `s`, narrowed to a char boundary.
fn head(s: &str, n: usize) -> &str {
    &s[..floor_char_boundary(s, n.min(s.len()))]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SourceMetadata {
        SourceMetadata::file("/ws/a.py")
    }

    fn assert_offsets_match(text: &str, chunks: &[TextChunk]) {
        for chunk in chunks {
            assert_eq!(chunk.content, &text[chunk.start_offset..chunk.end_offset]);
        }
    }

    #[test]
    fn short_input_is_one_chunk() {
        let text = "x".repeat(50);
        let chunks = Chunker::new(1000, 100).chunk(&["\n\n"], &text, &source());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks[0].end_offset, 50);
        assert!(chunks[0].separator_used.is_none());
        assert!(chunks[0].preceding_text.is_none());
        assert!(chunks[0].following_text.is_none());
    }

    #[test]
    fn separator_chunks_tile_the_input() {
        let block = |name: &str| format!("def {}():\n    {}\n", name, "y = 1; ".repeat(8));
        let text = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|&n| block(n))
            .collect::<Vec<_>>()
            .join("\n");

        let chunks = Chunker::new(160, 20).chunk(&["\ndef"], &text, &source());

        assert!(chunks.len() > 1);
        assert_offsets_match(&text, &chunks);
        assert_eq!(chunks[0].start_offset, 0);
        assert_eq!(chunks.last().unwrap().end_offset, text.len());
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert!(chunk.content.len() <= 160);
            assert_eq!(chunk.separator_used.as_deref(), Some("\ndef"));
        }

        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn oversized_segment_recurses_to_next_separator() {
        let small = "class A:\n    pass\n";
        let big_body: String = (0..30).map(|i| format!("    x{} = {}\n\n", i, i)).collect();
        let text = format!("{}\nclass B:\n{}", small, big_body);

        let chunks = Chunker::new(100, 10).chunk(&["\nclass", "\n\n"], &text, &source());

        assert_offsets_match(&text, &chunks);
        assert_eq!(chunks[0].separator_used.as_deref(), Some("\nclass"));
        assert!(chunks[1..]
            .iter()
            .all(|c| c.separator_used.as_deref() == Some("\n\n")));
        assert!(chunks.iter().all(|c| c.content.len() <= 100));
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn line_fallback_overlaps_previous_chunk() {
        let text: String = (0..40).map(|i| format!("line number {:02}\n", i)).collect();

        let chunks = Chunker::new(80, 20).chunk(&[], &text, &source());

        assert!(chunks.len() > 1);
        assert_offsets_match(&text, &chunks);
        assert!(chunks.iter().all(|c| c.separator_used.as_deref() == Some(LINE_BASED)));
        assert!(chunks.iter().all(|c| c.content.len() <= 80));
        for pair in chunks.windows(2) {
            // The next chunk starts inside the previous one.
            assert!(pair[1].start_offset < pair[0].end_offset);
            assert!(pair[1].start_offset >= pair[0].end_offset - 20);
        }
        assert_eq!(chunks.last().unwrap().end_offset, text.len());
    }

    #[test]
    fn long_line_is_cut_on_char_boundaries() {
        let text = "é".repeat(100);
        let chunks = Chunker::new(15, 4).chunk(&["\n\n"], &text, &source());

        assert_offsets_match(&text, &chunks);
        assert!(chunks.iter().all(|c| c.content.len() <= 15));
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn context_windows_link_neighbours() {
        let text: String = (0..20).map(|i| format!("row {:02}\n", i)).collect();
        let chunks = Chunker::new(30, 8).chunk(&[], &text, &source());

        assert!(chunks.len() > 2);
        assert!(chunks[0].preceding_text.is_none());
        assert!(chunks.last().unwrap().following_text.is_none());
        let first = &chunks[0].content;
        assert_eq!(
            chunks[1].preceding_text.as_deref(),
            Some(&first[first.len() - 4..])
        );
        assert_eq!(
            chunks[0].following_text.as_deref(),
            Some(&chunks[1].content[..4])
        );
    }

    #[test]
    fn chunk_enrichment() {
        let text = format!("   {}\nsecond line", "t".repeat(60));
        let chunks = Chunker::new(1000, 100).chunk(&["\n\n"], &text, &source().with_page(2));

        let chunk = &chunks[0];
        assert_eq!(chunk.title, format!("{}...", "t".repeat(50)));
        assert_eq!(chunk.hash.len(), 64);
        assert_eq!(chunk.source_file, "/ws/a.py");
        assert_eq!(chunk.source_page, Some(2));

        let json = serde_json::to_value(chunk).unwrap();
        assert!(json.get("chunkIndex").is_some());
        assert!(json.get("chunkCreatedAt").is_some());
    }

    #[test]
    fn separators_by_extension() {
        assert_eq!(separators_for(Path::new("a.py")), PYTHON_SEPARATORS);
        assert_eq!(separators_for(Path::new("a.HPP")), CPP_SEPARATORS);
        assert_eq!(separators_for(Path::new("a.tsx")), SCRIPT_SEPARATORS);
        assert_eq!(separators_for(Path::new("README.md")), DEFAULT_SEPARATORS);
    }
}
