//! Line pairing between a delete block and the insert block after it

use crate::change::{DiffBlock, TokenDiff};
use crate::grid::GridError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The inserted line a deleted line became, with the token diff between them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineModification {
    /// Index of the matched line inside the insert block
    pub insert_index: usize,
    /// Token-level diff from the deleted line to the inserted line
    pub token_diffs: Vec<TokenDiff>,
}

impl LineModification {
    pub fn new(insert_index: usize, token_diffs: Vec<TokenDiff>) -> Self {
        Self {
            insert_index,
            token_diffs,
        }
    }
}

/// Deleted line index -> matched inserted line, ordered by deleted index
///
/// Lines of either block missing from the mapping are pure deletions or
/// insertions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePairing {
    matches: BTreeMap<usize, LineModification>,
}

impl LinePairing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, delete_index: usize, modification: LineModification) {
        self.matches.insert(delete_index, modification);
    }

    pub fn with_match(mut self, delete_index: usize, modification: LineModification) -> Self {
        self.insert(delete_index, modification);
        self
    }

    pub fn get(&self, delete_index: usize) -> Option<&LineModification> {
        self.matches.get(&delete_index)
    }

    /// Matches in ascending deleted-line order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &LineModification)> {
        self.matches.iter().map(|(&index, modification)| (index, modification))
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Check the pairing against the lengths of the two blocks it pairs.
    ///
    /// Every index must be in range and inserted indexes must strictly
    /// increase along with the deleted ones, otherwise the gaps between
    /// matches would run backwards.
    pub fn validate(&self, delete_len: usize, insert_len: usize) -> Result<(), GridError> {
        let mut next_insert = 0;
        for (delete_index, modification) in self.iter() {
            if delete_index >= delete_len || modification.insert_index >= insert_len {
                return Err(GridError::PairingOutOfRange {
                    delete_index,
                    insert_index: modification.insert_index,
                    delete_len,
                    insert_len,
                });
            }
            if modification.insert_index < next_insert {
                return Err(GridError::PairingOutOfOrder {
                    delete_index,
                    insert_index: modification.insert_index,
                });
            }
            next_insert = modification.insert_index + 1;
        }
        Ok(())
    }
}

impl FromIterator<(usize, LineModification)> for LinePairing {
    fn from_iter<I: IntoIterator<Item = (usize, LineModification)>>(iter: I) -> Self {
        Self {
            matches: iter.into_iter().collect(),
        }
    }
}

/// Source of line pairings for adjacent delete/insert blocks
pub trait LinePairer {
    /// Pair lines of `delete` with lines of the `insert` block right after it
    fn pair_lines(&self, delete: &DiffBlock, insert: &DiffBlock) -> LinePairing;
}

impl<F> LinePairer for F
where
    F: Fn(&DiffBlock, &DiffBlock) -> LinePairing,
{
    fn pair_lines(&self, delete: &DiffBlock, insert: &DiffBlock) -> LinePairing {
        self(delete, insert)
    }
}

/// Pairer that never matches anything; every changed line renders unpaired
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPairing;

impl LinePairer for NoPairing {
    fn pair_lines(&self, _delete: &DiffBlock, _insert: &DiffBlock) -> LinePairing {
        LinePairing::new()
    }
}
