//! Rows of a rendered diff grid

use crate::change::{Token, TokenDiff};

/// One visual line of the grid
///
/// Rows borrow their tokens from the diff blocks they were produced from and
/// only live for a single render pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row<'a> {
    /// Unchanged line, numbered on both sides
    Equal {
        old: usize,
        new: usize,
        tokens: &'a [Token],
        /// Revealed by an expansion request rather than the initial render
        expanded: bool,
    },
    /// Line only present in the old file
    Delete { old: usize, tokens: &'a [Token] },
    /// Line only present in the new file
    Insert { new: usize, tokens: &'a [Token] },
    /// Deleted line paired with the inserted line it became
    Modification {
        old: usize,
        new: usize,
        diffs: &'a [TokenDiff],
    },
    /// Unpaired deleted and inserted lines shown next to each other
    SideBySide {
        old: usize,
        new: usize,
        old_tokens: &'a [Token],
        new_tokens: &'a [Token],
    },
    /// Placeholder for hidden unchanged lines
    Expander { block_index: usize, skipped: usize },
}

impl Row<'_> {
    /// Old-file line number carried by this row, if any
    pub fn old_line(&self) -> Option<usize> {
        match self {
            Row::Equal { old, .. }
            | Row::Delete { old, .. }
            | Row::Modification { old, .. }
            | Row::SideBySide { old, .. } => Some(*old),
            Row::Insert { .. } | Row::Expander { .. } => None,
        }
    }

    /// New-file line number carried by this row, if any
    pub fn new_line(&self) -> Option<usize> {
        match self {
            Row::Equal { new, .. }
            | Row::Insert { new, .. }
            | Row::Modification { new, .. }
            | Row::SideBySide { new, .. } => Some(*new),
            Row::Delete { .. } | Row::Expander { .. } => None,
        }
    }

    pub fn is_expander(&self) -> bool {
        matches!(self, Row::Expander { .. })
    }

    /// Whether this row shows a change rather than context
    pub fn is_change(&self) -> bool {
        !matches!(self, Row::Equal { .. } | Row::Expander { .. })
    }
}
