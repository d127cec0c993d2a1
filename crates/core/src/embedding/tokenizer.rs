//! Word tokenizer for the hashing embedder.
//!
//! Lowercases the input, splits on non-alphanumeric characters, and drops
//! single-character tokens and common English stop words. The token list
//! borrows from one lowercased buffer via byte spans.

use std::collections::HashSet;
use std::sync::LazyLock;

static STOP_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "from", "has", "have",
        "if", "in", "into", "is", "it", "its", "no", "not", "of", "on", "or", "such", "that",
        "the", "their", "then", "there", "these", "they", "this", "to", "was", "were", "will",
        "with",
    ]
    .into_iter()
    .collect()
});

/// Tokenized text: the lowercased buffer plus `(start, end)` byte spans into it.
pub struct Tokens {
    buffer: String,
    spans: Vec<(usize, usize)>,
}

impl Tokens {
    /// Returns an iterator over the token slices, in text order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.spans.iter().map(|&(s, e)| &self.buffer[s..e])
    }

    /// Returns an iterator over adjacent token pairs.
    pub fn bigrams(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.spans
            .windows(2)
            .map(|w| (&self.buffer[w[0].0..w[0].1], &self.buffer[w[1].0..w[1].1]))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

fn keep(token: &str) -> bool {
    token.chars().nth(1).is_some() && !STOP_WORDS.contains(token)
}

/// Tokenize text: lowercase, split on non-alphanumeric, remove stop words.
pub fn tokenize(text: &str) -> Tokens {
    let buffer = text.to_lowercase();
    let mut spans = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in buffer.char_indices() {
        if c.is_alphanumeric() {
            start.get_or_insert(i);
        } else if let Some(s) = start.take() {
            if keep(&buffer[s..i]) {
                spans.push((s, i));
            }
        }
    }
    if let Some(s) = start {
        if keep(&buffer[s..]) {
            spans.push((s, buffer.len()));
        }
    }

    Tokens { buffer, spans }
}
