//! Grid rows from ordered diff blocks

use crate::change::{DiffBlock, Operation};
use crate::context::{collapse, ContextWindow};
use crate::markup::Layout;
use crate::pairing::{LinePairer, LinePairing};
use crate::row::Row;
use std::collections::HashMap;
use std::ops::Range;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Block {index} has no lines")]
    EmptyBlock { index: usize },
    #[error(
        "Block {index} starts at old line {old_start}, new line {new_start}; \
         expected old line {expected_old}, new line {expected_new}"
    )]
    LineNumberMismatch {
        index: usize,
        old_start: usize,
        new_start: usize,
        expected_old: usize,
        expected_new: usize,
    },
    #[error(
        "Line pairing {delete_index} -> {insert_index} is out of range \
         ({delete_len} deleted, {insert_len} inserted lines)"
    )]
    PairingOutOfRange {
        delete_index: usize,
        insert_index: usize,
        delete_len: usize,
        insert_len: usize,
    },
    #[error("Line pairing {delete_index} -> {insert_index} crosses an earlier match")]
    PairingOutOfOrder {
        delete_index: usize,
        insert_index: usize,
    },
    #[error("No block at index {index} (diff has {count} blocks)")]
    InvalidBlockIndex { index: usize, count: usize },
    #[error("Block {index} is not an equal block")]
    NotAnEqualBlock { index: usize },
    #[error("Diff has {lines} lines, more than the display limit of {limit}")]
    TooLarge { lines: usize, limit: usize },
}

/// Check that blocks are non-empty and numbered contiguously on both sides.
pub fn validate_blocks(blocks: &[DiffBlock]) -> Result<(), GridError> {
    let Some(first) = blocks.first() else {
        return Ok(());
    };
    let (mut expected_old, mut expected_new) = (first.old_start, first.new_start);

    for (index, block) in blocks.iter().enumerate() {
        if block.is_empty() {
            return Err(GridError::EmptyBlock { index });
        }
        if block.old_start != expected_old || block.new_start != expected_new {
            return Err(GridError::LineNumberMismatch {
                index,
                old_start: block.old_start,
                new_start: block.new_start,
                expected_old,
                expected_new,
            });
        }
        let (old, new) = block.span();
        expected_old += old;
        expected_new += new;
    }

    Ok(())
}

/// Line pairings keyed by the index of their delete block
#[derive(Debug, Clone, Default)]
pub struct Pairings {
    by_block: HashMap<usize, LinePairing>,
}

impl Pairings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask `pairer` for every delete block directly followed by an insert block
    pub fn compute(blocks: &[DiffBlock], pairer: &dyn LinePairer) -> Self {
        let mut pairings = Self::new();
        for (index, pair) in blocks.windows(2).enumerate() {
            if pair[0].operation == Operation::Delete && pair[1].operation == Operation::Insert {
                pairings.insert(index, pairer.pair_lines(&pair[0], &pair[1]));
            }
        }
        pairings
    }

    pub fn insert(&mut self, delete_block: usize, pairing: LinePairing) {
        self.by_block.insert(delete_block, pairing);
    }

    pub fn get(&self, delete_block: usize) -> Option<&LinePairing> {
        self.by_block.get(&delete_block)
    }
}

/// Walk the blocks and produce the rows of the initial render.
///
/// Equal blocks are collapsed to `window.initial` lines of context. A delete
/// block followed by an insert block is rendered as one change group using
/// its pairing from `pairings`; a missing pairing leaves every line unpaired.
pub fn build_rows<'a>(
    blocks: &'a [DiffBlock],
    pairings: &'a Pairings,
    layout: Layout,
    window: ContextWindow,
) -> Result<Vec<Row<'a>>, GridError> {
    validate_blocks(blocks)?;

    let mut rows = Vec::new();
    let mut i = 0;
    while i < blocks.len() {
        let block = &blocks[i];
        match block.operation {
            Operation::Equal => {
                rows.extend(collapse(block, i, blocks.len(), 0, window.initial));
            }
            Operation::Delete => match blocks.get(i + 1) {
                Some(next) if next.operation == Operation::Insert => {
                    change_group(&mut rows, layout, block, next, pairings.get(i))?;
                    i += 1;
                }
                _ => rows.extend(deletes(block, 0..block.len())),
            },
            Operation::Insert => rows.extend(inserts(block, 0..block.len())),
        }
        i += 1;
    }

    Ok(rows)
}

fn change_group<'a>(
    rows: &mut Vec<Row<'a>>,
    layout: Layout,
    delete: &'a DiffBlock,
    insert: &'a DiffBlock,
    pairing: Option<&'a LinePairing>,
) -> Result<(), GridError> {
    let (mut prev_delete, mut prev_insert) = (0, 0);

    if let Some(pairing) = pairing {
        pairing.validate(delete.len(), insert.len())?;
        for (delete_index, modification) in pairing.iter() {
            let insert_index = modification.insert_index;
            unmatched_gap(
                rows,
                layout,
                delete,
                prev_delete..delete_index,
                insert,
                prev_insert..insert_index,
            );
            rows.push(Row::Modification {
                old: delete.old_line(delete_index),
                new: insert.new_line(insert_index),
                diffs: &modification.token_diffs,
            });
            prev_delete = delete_index + 1;
            prev_insert = insert_index + 1;
        }
    }

    unmatched_gap(
        rows,
        layout,
        delete,
        prev_delete..delete.len(),
        insert,
        prev_insert..insert.len(),
    );
    Ok(())
}

/// Unpaired lines between two matches. Split layouts line them up by
/// position, without trying to match them by content.
fn unmatched_gap<'a>(
    rows: &mut Vec<Row<'a>>,
    layout: Layout,
    delete: &'a DiffBlock,
    deleted: Range<usize>,
    insert: &'a DiffBlock,
    inserted: Range<usize>,
) {
    if !layout.aligns_gaps() {
        rows.extend(deletes(delete, deleted));
        rows.extend(inserts(insert, inserted));
        return;
    }

    let aligned = deleted.len().min(inserted.len());
    rows.extend(deleted.clone().zip(inserted.clone()).map(|(d, n)| Row::SideBySide {
        old: delete.old_line(d),
        new: insert.new_line(n),
        old_tokens: delete.line(d),
        new_tokens: insert.line(n),
    }));
    rows.extend(deletes(delete, deleted.start + aligned..deleted.end));
    rows.extend(inserts(insert, inserted.start + aligned..inserted.end));
}

fn deletes(block: &DiffBlock, range: Range<usize>) -> impl Iterator<Item = Row<'_>> {
    range.map(move |j| Row::Delete {
        old: block.old_line(j),
        tokens: block.line(j),
    })
}

fn inserts(block: &DiffBlock, range: Range<usize>) -> impl Iterator<Item = Row<'_>> {
    range.map(move |j| Row::Insert {
        new: block.new_line(j),
        tokens: block.line(j),
    })
}
