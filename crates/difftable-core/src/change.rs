//! Block and token representation for diff input

use serde::{Deserialize, Serialize};

/// The diff operation attached to a block or a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Content is unchanged (context)
    Equal,
    /// Content was removed
    Delete,
    /// Content was added
    Insert,
}

/// A piece of source text with its syntax class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// The text content
    pub text: String,
    /// Semantic class used for highlighting (e.g. "number", "keyword")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

impl Token {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }
}

/// A line is an ordered run of tokens
pub type Line = Vec<Token>;

/// One segment of a token-level diff between a deleted and an inserted line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDiff {
    pub operation: Operation,
    pub tokens: Vec<Token>,
}

impl TokenDiff {
    pub fn new(operation: Operation, tokens: Vec<Token>) -> Self {
        Self { operation, tokens }
    }

    pub fn equal(tokens: Vec<Token>) -> Self {
        Self::new(Operation::Equal, tokens)
    }

    pub fn delete(tokens: Vec<Token>) -> Self {
        Self::new(Operation::Delete, tokens)
    }

    pub fn insert(tokens: Vec<Token>) -> Self {
        Self::new(Operation::Insert, tokens)
    }

    /// Whether this segment belongs on the old side of a split row
    pub fn on_old_side(&self) -> bool {
        self.operation != Operation::Insert
    }

    /// Whether this segment belongs on the new side of a split row
    pub fn on_new_side(&self) -> bool {
        self.operation != Operation::Delete
    }
}

/// A maximal run of lines sharing one operation
///
/// Both start numbers are 1-based. For a delete block `new_start` is the
/// position in the new file where the removed lines would have been, and
/// symmetrically for insert blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffBlock {
    pub operation: Operation,
    pub lines: Vec<Line>,
    pub old_start: usize,
    pub new_start: usize,
}

impl DiffBlock {
    pub fn new(operation: Operation, lines: Vec<Line>, old_start: usize, new_start: usize) -> Self {
        Self {
            operation,
            lines,
            old_start,
            new_start,
        }
    }

    pub fn equal(lines: Vec<Line>, old_start: usize, new_start: usize) -> Self {
        Self::new(Operation::Equal, lines, old_start, new_start)
    }

    pub fn delete(lines: Vec<Line>, old_start: usize, new_start: usize) -> Self {
        Self::new(Operation::Delete, lines, old_start, new_start)
    }

    pub fn insert(lines: Vec<Line>, old_start: usize, new_start: usize) -> Self {
        Self::new(Operation::Insert, lines, old_start, new_start)
    }

    /// Number of lines in this block
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, index: usize) -> &[Token] {
        &self.lines[index]
    }

    /// Old-file line number of the line at `index`
    pub fn old_line(&self, index: usize) -> usize {
        self.old_start + index
    }

    /// New-file line number of the line at `index`
    pub fn new_line(&self, index: usize) -> usize {
        self.new_start + index
    }

    /// Lines this block consumes on the (old, new) side
    pub fn span(&self) -> (usize, usize) {
        match self.operation {
            Operation::Equal => (self.len(), self.len()),
            Operation::Delete => (self.len(), 0),
            Operation::Insert => (0, self.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> Line {
        vec![Token::new(text)]
    }

    #[test]
    fn test_line_numbers_follow_start() {
        let block = DiffBlock::equal(vec![plain("a"), plain("b")], 4, 7);
        assert_eq!(block.old_line(1), 5);
        assert_eq!(block.new_line(1), 8);
        assert_eq!(block.span(), (2, 2));
    }

    #[test]
    fn test_span_per_operation() {
        let delete = DiffBlock::delete(vec![plain("x")], 3, 3);
        let insert = DiffBlock::insert(vec![plain("y"), plain("z")], 4, 3);
        assert_eq!(delete.span(), (1, 0));
        assert_eq!(insert.span(), (0, 2));
    }

    #[test]
    fn test_token_diff_sides() {
        assert!(TokenDiff::equal(vec![]).on_old_side());
        assert!(TokenDiff::equal(vec![]).on_new_side());
        assert!(!TokenDiff::insert(vec![]).on_old_side());
        assert!(!TokenDiff::delete(vec![]).on_new_side());
    }

    #[test]
    fn test_block_deserializes_from_json() {
        let json = r#"{
            "operation": "delete",
            "lines": [[{"text": "let", "class": "keyword"}, {"text": " x"}]],
            "old_start": 2,
            "new_start": 2
        }"#;
        let block: DiffBlock = serde_json::from_str(json).unwrap();
        assert_eq!(block.operation, Operation::Delete);
        assert_eq!(block.line(0)[0].class.as_deref(), Some("keyword"));
        assert_eq!(block.line(0)[1].class, None);
    }
}
