//! Splitting large documents into overlapping chunks

use crate::config::ChunkingConfig;
use graphbuilder_domain::Document;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Splits documents into word windows
///
/// Each chunk keeps the original spacing of its words and inherits the
/// source metadata, plus `chunk_id` (SHA-256 of the chunk text),
/// `position` (1-based), `content_offset` (byte offset into the source
/// text) and `length` (bytes).
pub struct TextChunker {
    config: ChunkingConfig,
}

impl TextChunker {
    /// Create a new text chunker
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    /// Chunk the given document
    pub fn split(&self, document: &Document) -> Vec<Document> {
        let text = document.text.as_str();
        // Byte span of every word, taken from the slice pointers
        let words: Vec<(usize, usize)> = text
            .split_whitespace()
            .map(|word| {
                let start = word.as_ptr() as usize - text.as_ptr() as usize;
                (start, start + word.len())
            })
            .collect();

        if words.is_empty() {
            return Vec::new();
        }

        let size = self.config.chunk_size.max(1);
        let step = size.saturating_sub(self.config.chunk_overlap).max(1);

        let mut chunks = Vec::new();
        let mut first = 0;
        loop {
            if chunks.len() == self.config.max_chunks_allowed {
                warn!(
                    max_chunks = self.config.max_chunks_allowed,
                    words = words.len(),
                    "Chunk limit reached; remaining text is not processed"
                );
                break;
            }

            let last = (first + size).min(words.len()) - 1;
            let (start, _) = words[first];
            let (_, end) = words[last];
            chunks.push(self.chunk(document, &text[start..end], chunks.len() + 1, start));

            if last + 1 >= words.len() {
                break;
            }
            first += step;
        }

        debug!(chunks = chunks.len(), words = words.len(), "Split document");
        chunks
    }

    fn chunk(&self, source: &Document, content: &str, position: usize, offset: usize) -> Document {
        let mut metadata = source.metadata.clone();
        metadata.insert("chunk_id".to_string(), Value::String(chunk_id(content)));
        metadata.insert("position".to_string(), Value::from(position));
        metadata.insert("content_offset".to_string(), Value::from(offset));
        metadata.insert("length".to_string(), Value::from(content.len()));
        Document {
            text: content.to_string(),
            metadata,
        }
    }
}

/// Hex SHA-256 of the chunk text
pub fn chunk_id(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Merge every `n` consecutive chunks into one document
///
/// Texts are joined with a newline. The merged document carries
/// `combined_chunk_ids` listing the ids of its chunks; chunks without a
/// `chunk_id` get one from their text.
pub fn combine_chunks(chunks: &[Document], n: usize) -> Vec<Document> {
    let n = n.max(1);
    chunks
        .chunks(n)
        .map(|group| {
            let text = group
                .iter()
                .map(|chunk| chunk.text.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            let ids: Vec<Value> = group
                .iter()
                .map(|chunk| match chunk.metadata.get("chunk_id") {
                    Some(id @ Value::String(_)) => id.clone(),
                    _ => Value::String(chunk_id(&chunk.text)),
                })
                .collect();
            Document::new(text).with_metadata("combined_chunk_ids", Value::Array(ids))
        })
        .collect()
}
