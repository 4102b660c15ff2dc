//! Context windows around changes and their expansion state

use crate::change::DiffBlock;
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Unchanged lines shown next to a change before collapsing the rest
pub const DEFAULT_CONTEXT_SIZE: usize = 3;

/// Extra lines revealed by each expansion of a collapsed region
pub const EXPAND_CONTEXT_SIZE: usize = 15;

/// Context window sizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextWindow {
    /// Context shown on the initial render
    pub initial: usize,
    /// Growth per expansion request
    pub step: usize,
}

impl Default for ContextWindow {
    fn default() -> Self {
        Self {
            initial: DEFAULT_CONTEXT_SIZE,
            step: EXPAND_CONTEXT_SIZE,
        }
    }
}

/// Where an equal block sits relative to the changes around it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPosition {
    /// No change before it
    First,
    /// No change after it
    Last,
    /// Between two changes
    Interior,
}

impl BlockPosition {
    /// A lone block counts as first.
    pub fn of(index: usize, block_count: usize) -> Self {
        if index == 0 {
            BlockPosition::First
        } else if index + 1 == block_count {
            BlockPosition::Last
        } else {
            BlockPosition::Interior
        }
    }
}

/// Context revealed so far for each equal block of one view
///
/// Blocks without an entry are at the initial window size.
#[derive(Debug, Clone, Default)]
pub struct ContextSizes {
    window: ContextWindow,
    sizes: HashMap<usize, usize>,
}

impl ContextSizes {
    pub fn new(window: ContextWindow) -> Self {
        Self {
            window,
            sizes: HashMap::new(),
        }
    }

    pub fn window(&self) -> ContextWindow {
        self.window
    }

    /// Context currently revealed around `block_index`
    pub fn current(&self, block_index: usize) -> usize {
        self.sizes
            .get(&block_index)
            .copied()
            .unwrap_or(self.window.initial)
    }

    /// Grow the window of `block_index` by one step.
    ///
    /// Returns the (previous, new) sizes.
    pub fn grow(&mut self, block_index: usize) -> (usize, usize) {
        let last = self.current(block_index);
        let size = last.saturating_add(self.window.step);
        self.sizes.insert(block_index, size);
        (last, size)
    }

    /// Forget every expansion, as when the view is rebuilt
    pub fn reset(&mut self) {
        self.sizes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

/// Rows of an equal block with `size` lines of context around its changes.
///
/// `last` is the context already on screen; those rows are left out so the
/// result can replace the block's previous expander. Rows revealed while
/// `last > 0` are flagged as expanded.
pub fn collapse<'a>(
    block: &'a DiffBlock,
    block_index: usize,
    block_count: usize,
    last: usize,
    size: usize,
) -> Vec<Row<'a>> {
    let len = block.len();
    let mut rows = Vec::new();
    let equal = move |j: usize| Row::Equal {
        old: block.old_line(j),
        new: block.new_line(j),
        tokens: block.line(j),
        expanded: last != 0,
    };
    let expander = move |skipped: usize| Row::Expander {
        block_index,
        skipped,
    };

    match BlockPosition::of(block_index, block_count) {
        BlockPosition::First => {
            let start = len.saturating_sub(size);
            if start > 0 {
                rows.push(expander(start));
            }
            rows.extend((start..len.saturating_sub(last)).map(equal));
        }
        BlockPosition::Last => {
            let end = len.min(size);
            rows.extend((last..end).map(equal));
            if end < len {
                rows.push(expander(len - end));
            }
        }
        BlockPosition::Interior if size.saturating_mul(2) < len => {
            rows.extend((last..size).map(equal));
            rows.push(expander(len - 2 * size));
            rows.extend((len - size..len - last).map(equal));
        }
        BlockPosition::Interior => {
            rows.extend((last..len.saturating_sub(last)).map(equal));
        }
    }

    rows
}
