//! Default diff provider: line blocks and line pairing computed with `similar`

use crate::change::{DiffBlock, Line, Operation, Token, TokenDiff};
use crate::pairing::{LineModification, LinePairer, LinePairing};
use similar::{ChangeTag, TextDiff};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiffError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),
}

/// The main diff engine
#[derive(Debug, Clone)]
pub struct DiffEngine {
    /// Minimum token similarity for a deleted line to pair with an inserted one
    match_threshold: f32,
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self {
            match_threshold: 0.5,
        }
    }
}

impl DiffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_threshold(mut self, threshold: f32) -> Self {
        self.match_threshold = threshold;
        self
    }

    /// Compute diff blocks between two strings
    pub fn diff_strings(&self, old: &str, new: &str) -> Vec<DiffBlock> {
        let text_diff = TextDiff::from_lines(old, new);
        let mut builder = BlockBuilder::new();

        for change in text_diff.iter_all_changes() {
            let text = change.value().trim_end_matches(|c: char| c == '\n' || c == '\r');
            let line = tokenize_code(text);
            match change.tag() {
                ChangeTag::Equal => {
                    builder.flush_changes();
                    builder.equal.push(line);
                }
                ChangeTag::Delete => {
                    builder.flush_equal();
                    builder.deletes.push(line);
                }
                ChangeTag::Insert => {
                    builder.flush_equal();
                    builder.inserts.push(line);
                }
            }
        }

        builder.finish()
    }

    /// Compute diff blocks between two files
    pub fn diff_files(
        &self,
        old_path: &Path,
        new_path: &Path,
    ) -> Result<Vec<DiffBlock>, DiffError> {
        let old_content = std::fs::read_to_string(old_path)?;
        let new_content = std::fs::read_to_string(new_path)?;

        Ok(self.diff_strings(&old_content, &new_content))
    }
}

impl LinePairer for DiffEngine {
    /// Greedy in-order matching: each deleted line takes the most similar
    /// inserted line after the previous match, if it is similar enough.
    fn pair_lines(&self, delete: &DiffBlock, insert: &DiffBlock) -> LinePairing {
        let mut pairing = LinePairing::new();
        let mut next_insert = 0;

        for (delete_index, old) in delete.lines.iter().enumerate() {
            let mut best: Option<(usize, f32)> = None;
            for insert_index in next_insert..insert.len() {
                let ratio = similarity(old, insert.line(insert_index));
                if ratio >= self.match_threshold && best.map_or(true, |(_, r)| ratio > r) {
                    best = Some((insert_index, ratio));
                }
            }

            if let Some((insert_index, _)) = best {
                let token_diffs = compute_word_diff(old, insert.line(insert_index));
                pairing.insert(delete_index, LineModification::new(insert_index, token_diffs));
                next_insert = insert_index + 1;
            }
        }

        pairing
    }
}

/// Accumulates lines into maximal blocks while tracking line numbers
struct BlockBuilder {
    blocks: Vec<DiffBlock>,
    old_line: usize,
    new_line: usize,
    equal: Vec<Line>,
    deletes: Vec<Line>,
    inserts: Vec<Line>,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            old_line: 1,
            new_line: 1,
            equal: Vec::new(),
            deletes: Vec::new(),
            inserts: Vec::new(),
        }
    }

    fn flush_equal(&mut self) {
        if self.equal.is_empty() {
            return;
        }
        let lines = std::mem::take(&mut self.equal);
        let len = lines.len();
        self.blocks
            .push(DiffBlock::equal(lines, self.old_line, self.new_line));
        self.old_line += len;
        self.new_line += len;
    }

    /// Deletions always go before the insertions of the same change run
    fn flush_changes(&mut self) {
        if !self.deletes.is_empty() {
            let lines = std::mem::take(&mut self.deletes);
            let len = lines.len();
            self.blocks
                .push(DiffBlock::delete(lines, self.old_line, self.new_line));
            self.old_line += len;
        }
        if !self.inserts.is_empty() {
            let lines = std::mem::take(&mut self.inserts);
            let len = lines.len();
            self.blocks
                .push(DiffBlock::insert(lines, self.old_line, self.new_line));
            self.new_line += len;
        }
    }

    fn finish(mut self) -> Vec<DiffBlock> {
        self.flush_equal();
        self.flush_changes();
        self.blocks
    }
}

/// Tokenize code for word-level diffing
/// Separates identifiers from punctuation for accurate diffs
fn tokenize_code(line: &str) -> Line {
    let mut tokens = Vec::new();
    let mut buf = String::new();
    let mut in_word = false;

    for ch in line.chars() {
        let is_word = ch.is_alphanumeric() || ch == '_';
        if is_word {
            if !in_word {
                if !buf.is_empty() {
                    tokens.push(classify(std::mem::take(&mut buf)));
                }
                in_word = true;
            }
            buf.push(ch);
        } else {
            if in_word {
                if !buf.is_empty() {
                    tokens.push(classify(std::mem::take(&mut buf)));
                }
                in_word = false;
            }
            if ch.is_whitespace() {
                // Group consecutive whitespace
                if !buf.is_empty() && !buf.chars().all(char::is_whitespace) {
                    tokens.push(classify(std::mem::take(&mut buf)));
                }
                buf.push(ch);
            } else {
                // Each punctuation char is its own token
                if !buf.is_empty() {
                    tokens.push(classify(std::mem::take(&mut buf)));
                }
                tokens.push(classify(ch.to_string()));
            }
        }
    }
    if !buf.is_empty() {
        tokens.push(classify(buf));
    }
    tokens
}

fn classify(text: String) -> Token {
    let class = match text.chars().next() {
        Some(c) if c.is_ascii_digit() => Some("number"),
        Some('(' | ')' | '[' | ']' | '{' | '}') => Some("bracket"),
        Some(c) if !c.is_alphanumeric() && c != '_' && !c.is_whitespace() => Some("operator"),
        _ => None,
    };
    match class {
        Some(class) => Token::new(text).with_class(class),
        None => Token::new(text),
    }
}

fn texts(line: &[Token]) -> Vec<&str> {
    line.iter().map(|token| token.text.as_str()).collect()
}

fn similarity(old: &[Token], new: &[Token]) -> f32 {
    let old_texts = texts(old);
    let new_texts = texts(new);
    TextDiff::from_slices(&old_texts, &new_texts).ratio()
}

/// Compute word-level diff between two lines, merging runs of one operation
fn compute_word_diff(old: &[Token], new: &[Token]) -> Vec<TokenDiff> {
    let old_texts = texts(old);
    let new_texts = texts(new);
    let word_diff = TextDiff::from_slices(&old_texts, &new_texts);
    let mut segments: Vec<TokenDiff> = Vec::new();

    for change in word_diff.iter_all_changes() {
        let (operation, token) = match change.tag() {
            ChangeTag::Equal => (Operation::Equal, change.old_index().map(|i| &old[i])),
            ChangeTag::Delete => (Operation::Delete, change.old_index().map(|i| &old[i])),
            ChangeTag::Insert => (Operation::Insert, change.new_index().map(|i| &new[i])),
        };
        let Some(token) = token else {
            continue;
        };
        match segments.last_mut() {
            Some(last) if last.operation == operation => last.tokens.push(token.clone()),
            _ => segments.push(TokenDiff::new(operation, vec![token.clone()])),
        }
    }

    segments
}
