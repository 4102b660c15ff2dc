//! Difftable Core - Collapsible diff grids
//!
//! This library turns ordered diff blocks and line pairings into a unified
//! or split grid of rows, collapsing long unchanged runs behind expanders
//! that can be opened step by step.

pub mod change;
pub mod context;
pub mod diff;
pub mod grid;
pub mod markup;
pub mod pairing;
pub mod row;
pub mod view;

pub use change::{DiffBlock, Line, Operation, Token, TokenDiff};
pub use context::{ContextSizes, ContextWindow, DEFAULT_CONTEXT_SIZE, EXPAND_CONTEXT_SIZE};
pub use diff::{DiffEngine, DiffError};
pub use grid::{build_rows, validate_blocks, GridError, Pairings};
pub use markup::{escape_html, HtmlTokens, Layout, MarkupWriter, TokenRenderer};
pub use pairing::{LineModification, LinePairer, LinePairing, NoPairing};
pub use row::Row;
pub use view::{DiffView, Fragment, Grid, MAX_DISPLAY_LINES};
