//! Sentence-aligned text chunking.

use regex::Regex;
use std::sync::LazyLock;

static SENTENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?]+(?:[.!?]+|$)").unwrap());

/// Split text into sentences, keeping terminal punctuation.
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    SENTENCE
        .find_iter(&normalized)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Splits text into chunks of whole sentences.
///
/// Chunks stay within `chunk_size` characters unless a single sentence is
/// longer than that. Consecutive chunks share trailing sentences totalling
/// at most `chunk_overlap` characters.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size),
        }
    }

    pub fn chunk(&self, text: &str) -> Vec<String> {
        let sentences = split_sentences(text);
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < sentences.len() {
            let mut size = 0;
            let mut end = start;
            for sentence in &sentences[start..] {
                let added = sentence.len() + usize::from(end > start);
                if end > start && size + added > self.chunk_size {
                    break;
                }
                size += added;
                end += 1;
            }

            chunks.push(sentences[start..end].join(" "));
            if end >= sentences.len() {
                break;
            }

            let overlap = self.overlap_sentences(&sentences[start..end]);
            // Always make progress, even when the whole chunk fits in the overlap.
            start = (end - overlap).max(start + 1);
        }

        chunks
    }

    /// How many trailing sentences of a chunk fit in the overlap budget.
    fn overlap_sentences(&self, chunk: &[String]) -> usize {
        let mut size = 0;
        let mut count = 0;
        for sentence in chunk.iter().rev() {
            let added = sentence.len() + usize::from(count > 0);
            if size + added > self.chunk_overlap {
                break;
            }
            size += added;
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sentences() {
        let sentences = split_sentences("First one.  Second one!\nThird one? Trailing words");
        assert_eq!(
            sentences,
            vec!["First one.", "Second one!", "Third one?", "Trailing words"]
        );
        assert!(split_sentences("   ").is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(800, 100);
        assert_eq!(
            chunker.chunk("Python is great. It is readable."),
            vec!["Python is great. It is readable."]
        );
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_overlap() {
        // Each sentence is 10 characters.
        let text = "Aaaaaaaaa. Bbbbbbbbb. Ccccccccc. Ddddddddd. Eeeeeeeee.";
        let chunker = TextChunker::new(32, 10);
        let chunks = chunker.chunk(text);

        assert_eq!(
            chunks,
            vec![
                "Aaaaaaaaa. Bbbbbbbbb. Ccccccccc.",
                "Ccccccccc. Ddddddddd. Eeeeeeeee.",
            ]
        );
        assert!(chunks.iter().all(|c| c.len() <= 32));
    }

    #[test]
    fn test_long_sentence_still_progresses() {
        let chunker = TextChunker::new(5, 5);
        let chunks = chunker.chunk("A very long sentence here. Another long sentence.");
        assert_eq!(
            chunks,
            vec!["A very long sentence here.", "Another long sentence."]
        );
    }
}
