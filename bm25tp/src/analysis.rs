//! Word segmentation shared by the in-process analyzer and the Tantivy
//! `unigram` tokenizer.
//!
//! Alphanumeric runs become one token each; every CJK character is a token
//! of its own; whitespace and punctuation separate tokens and are dropped.
//! Terms are lowercased. Offsets are character offsets into the input.

use crate::interface::{Analyzer, RescoreError, RescoreResult, Token};

/// Analyzer names `SimpleAnalyzer` answers to. They all segment the same way.
pub const ANALYZERS: [&str; 3] = ["default", "simple", "unigram"];

/// One segment of the input, in both character and byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment {
    pub start: usize,
    pub end: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// Han, kana and hangul: scripts written without spaces between words.
pub(crate) fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{30FF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2A6DF}')
}

pub(crate) fn segment_words(content: &str) -> Vec<Segment> {
    let chars: Vec<(usize, char)> = content.char_indices().collect();
    let byte_at = |i: usize| chars.get(i).map_or(content.len(), |&(b, _)| b);
    let is_word = |c: char| c.is_alphanumeric() && !is_cjk(c);

    let mut segments = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i].1;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if is_cjk(c) {
            i += 1;
        } else if is_word(c) {
            while i < chars.len() && is_word(chars[i].1) {
                i += 1;
            }
        } else {
            while i < chars.len() && !chars[i].1.is_alphanumeric() && !chars[i].1.is_whitespace() {
                i += 1;
            }
            continue;
        }
        segments.push(Segment { start, end: i, byte_start: byte_at(start), byte_end: byte_at(i) });
    }
    segments
}

/// Maps byte offsets at char boundaries back to character offsets.
pub(crate) struct CharOffsets {
    byte_starts: Vec<usize>,
}

impl CharOffsets {
    pub fn new(text: &str) -> Self {
        Self { byte_starts: text.char_indices().map(|(b, _)| b).collect() }
    }

    pub fn char_offset(&self, byte: usize) -> usize {
        self.byte_starts.partition_point(|&b| b < byte)
    }
}

/// In-process analyzer over `segment_words`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleAnalyzer;

impl SimpleAnalyzer {
    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        segment_words(text)
            .into_iter()
            .map(|s| Token::new(text[s.byte_start..s.byte_end].to_lowercase(), s.start))
            .collect()
    }
}

impl Analyzer for SimpleAnalyzer {
    fn analyze(&self, analyzer: &str, _field: &str, text: &str) -> RescoreResult<Vec<Token>> {
        if !ANALYZERS.contains(&analyzer) {
            return Err(RescoreError::Analysis {
                text: text.to_string(),
                reason: format!("unknown analyzer [{analyzer}]"),
            });
        }
        Ok(self.tokenize(text))
    }
}
