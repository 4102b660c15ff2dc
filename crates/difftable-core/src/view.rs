//! A rendered diff and its expansion state

use crate::change::{DiffBlock, Operation};
use crate::context::{collapse, ContextSizes, ContextWindow};
use crate::grid::{build_rows, validate_blocks, GridError, Pairings};
use crate::markup::{HtmlTokens, Layout, MarkupWriter, TokenRenderer};
use crate::pairing::LinePairer;
use serde::Serialize;
use tracing::{debug, warn};

/// Diffs with more lines than this are not rendered
pub const MAX_DISPLAY_LINES: usize = 5000;

/// Full grid markup from an initial render
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    pub view_id: String,
    pub layout: Layout,
    pub colgroup: &'static str,
    pub body: String,
}

impl Grid {
    /// The grid as a complete table element
    pub fn to_html(&self) -> String {
        format!(
            "<table id='{}' class='text-diff {}'>{}{}</table>",
            crate::markup::escape_html(&self.view_id),
            self.layout.class(),
            self.colgroup,
            self.body
        )
    }
}

/// Rows revealed by one expansion request
///
/// The markup replaces the row carrying [`Fragment::placeholder_class`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub block_index: usize,
    pub markup: String,
}

impl Fragment {
    /// Class of the expander row this fragment replaces
    pub fn placeholder_class(&self) -> String {
        format!("expander{}", self.block_index)
    }
}

/// One open diff view
///
/// Owns the blocks and the per-block context sizes that expansion requests
/// grow. `expand` takes `&mut self`, so requests against one view are
/// serialized; share a view between threads behind a mutex.
pub struct DiffView {
    id: String,
    blocks: Vec<DiffBlock>,
    layout: Layout,
    max_lines: usize,
    contexts: ContextSizes,
    tokens: Box<dyn TokenRenderer + Send + Sync>,
}

impl DiffView {
    pub fn new(blocks: Vec<DiffBlock>, layout: Layout) -> Self {
        Self {
            id: "diff".to_string(),
            blocks,
            layout,
            max_lines: MAX_DISPLAY_LINES,
            contexts: ContextSizes::new(ContextWindow::default()),
            tokens: Box::new(HtmlTokens),
        }
    }

    pub fn with_view_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_window(mut self, window: ContextWindow) -> Self {
        self.contexts = ContextSizes::new(window);
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_token_renderer(
        mut self,
        tokens: impl TokenRenderer + Send + Sync + 'static,
    ) -> Self {
        self.tokens = Box::new(tokens);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn blocks(&self) -> &[DiffBlock] {
        &self.blocks
    }

    /// Context currently revealed around the equal block at `block_index`
    pub fn context_size(&self, block_index: usize) -> usize {
        self.contexts.current(block_index)
    }

    /// Total number of lines across all blocks
    pub fn line_count(&self) -> usize {
        self.blocks.iter().map(DiffBlock::len).sum()
    }

    /// Render the whole grid.
    ///
    /// This rebuilds the view from scratch, so earlier expansions are
    /// forgotten.
    pub fn render(&mut self, pairer: &dyn LinePairer) -> Result<Grid, GridError> {
        self.check()?;

        self.contexts.reset();
        let pairings = Pairings::compute(&self.blocks, pairer);
        let rows = build_rows(&self.blocks, &pairings, self.layout, self.contexts.window())?;
        let body = self.writer().write_rows(&rows);

        debug!(
            view = %self.id,
            blocks = self.blocks.len(),
            rows = rows.len(),
            changes = rows.iter().filter(|row| row.is_change()).count(),
            "Rendered diff grid"
        );

        Ok(Grid {
            view_id: self.id.clone(),
            layout: self.layout,
            colgroup: self.layout.colgroup(),
            body,
        })
    }

    /// Reveal more context around the equal block at `block_index`.
    ///
    /// Rejected requests leave the context sizes untouched. A view that
    /// cannot be rendered cannot be expanded either.
    pub fn expand(&mut self, block_index: usize) -> Result<Fragment, GridError> {
        self.check()?;
        let count = self.blocks.len();
        let Some(block) = self.blocks.get(block_index) else {
            warn!(view = %self.id, block_index, count, "Expansion of unknown block");
            return Err(GridError::InvalidBlockIndex {
                index: block_index,
                count,
            });
        };
        if block.operation != Operation::Equal {
            warn!(
                view = %self.id,
                block_index,
                operation = ?block.operation,
                "Expansion of a changed block"
            );
            return Err(GridError::NotAnEqualBlock { index: block_index });
        }

        let (last, size) = self.contexts.grow(block_index);
        let rows = collapse(block, block_index, count, last, size);
        let markup = self.writer().write_rows(&rows);

        debug!(
            view = %self.id,
            block_index,
            from = last,
            to = size,
            rows = rows.len(),
            "Expanded context"
        );

        Ok(Fragment {
            block_index,
            markup,
        })
    }

    /// Forget all expansions
    pub fn reset(&mut self) {
        self.contexts.reset();
    }

    fn check(&self) -> Result<(), GridError> {
        let lines = self.line_count();
        if lines > self.max_lines {
            warn!(view = %self.id, lines, limit = self.max_lines, "Diff too large to display");
            return Err(GridError::TooLarge {
                lines,
                limit: self.max_lines,
            });
        }
        validate_blocks(&self.blocks).map_err(|err| {
            warn!(view = %self.id, %err, "Malformed diff blocks");
            err
        })
    }

    fn writer(&self) -> MarkupWriter<'_> {
        MarkupWriter::new(self.layout, &self.id, self.tokens.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::{Line, Token};
    use crate::context::{DEFAULT_CONTEXT_SIZE, EXPAND_CONTEXT_SIZE};
    use crate::pairing::NoPairing;

    fn lines(prefix: &str, len: usize) -> Vec<Line> {
        (0..len)
            .map(|i| vec![Token::new(format!("{} {}", prefix, i))])
            .collect()
    }

    /// equal(first) / delete / equal(interior, 50) / insert / equal(last)
    fn view(layout: Layout) -> DiffView {
        let blocks = vec![
            DiffBlock::equal(lines("head", 40), 1, 1),
            DiffBlock::delete(lines("old", 1), 41, 41),
            DiffBlock::equal(lines("mid", 50), 42, 41),
            DiffBlock::insert(lines("new", 1), 92, 91),
            DiffBlock::equal(lines("tail", 20), 92, 92),
        ];
        DiffView::new(blocks, layout).with_view_id("d1")
    }

    fn count_rows(markup: &str) -> (usize, usize) {
        (
            markup.matches("<tr class='line").count(),
            markup.matches("<tr class='expander").count(),
        )
    }

    fn skipped_counts(markup: &str) -> Vec<usize> {
        markup
            .split("skipped ")
            .skip(1)
            .filter_map(|rest| rest.split(' ').next()?.parse().ok())
            .collect()
    }

    #[test]
    fn test_initial_render() {
        let mut view = view(Layout::Unified);
        let grid = view.render(&NoPairing).unwrap();

        // 3 + 1 + (3 + 3) + 1 + 3 lines, one expander per equal block
        assert_eq!(count_rows(&grid.body), (14, 3));
        assert_eq!(skipped_counts(&grid.body), vec![37, 44, 17]);
        assert!(grid
            .to_html()
            .starts_with("<table id='d1' class='text-diff unified'><colgroup>"));
    }

    #[test]
    fn test_expand_interior_block_until_exhausted() {
        let mut view = view(Layout::Split);
        view.render(&NoPairing).unwrap();

        let first = view.expand(2).unwrap();
        assert_eq!(first.placeholder_class(), "expander2");
        assert_eq!(count_rows(&first.markup), (30, 1));
        assert_eq!(skipped_counts(&first.markup), vec![14]);
        assert_eq!(first.markup.matches("<tr class='line expanded'>").count(), 30);
        assert_eq!(view.context_size(2), DEFAULT_CONTEXT_SIZE + EXPAND_CONTEXT_SIZE);

        let second = view.expand(2).unwrap();
        assert_eq!(count_rows(&second.markup), (14, 0));

        let third = view.expand(2).unwrap();
        assert_eq!(third.markup, "");
    }

    #[test]
    fn test_expand_first_block_reveals_every_line_once() {
        let mut view = view(Layout::Unified);
        view.render(&NoPairing).unwrap();

        let mut revealed = DEFAULT_CONTEXT_SIZE;
        let mut expansions = 0;
        loop {
            let fragment = view.expand(0).unwrap();
            let (lines, expanders) = count_rows(&fragment.markup);
            revealed += lines;
            expansions += 1;
            assert!(revealed >= (DEFAULT_CONTEXT_SIZE + expansions * EXPAND_CONTEXT_SIZE).min(40));
            if expanders == 0 {
                break;
            }
        }
        assert_eq!(revealed, 40);
        assert_eq!(expansions, 3);
    }

    #[test]
    fn test_expand_last_block() {
        let mut view = view(Layout::Unified);
        view.render(&NoPairing).unwrap();

        let fragment = view.expand(4).unwrap();
        assert_eq!(count_rows(&fragment.markup), (15, 1));
        assert_eq!(skipped_counts(&fragment.markup), vec![2]);
        assert!(fragment.markup.contains("old95 new95"));
    }

    #[test]
    fn test_rejected_expansions_do_not_mutate() {
        let mut view = view(Layout::Unified);
        view.render(&NoPairing).unwrap();

        assert_eq!(
            view.expand(9),
            Err(GridError::InvalidBlockIndex { index: 9, count: 5 })
        );
        assert_eq!(
            view.expand(1),
            Err(GridError::NotAnEqualBlock { index: 1 })
        );
        assert_eq!(view.context_size(1), DEFAULT_CONTEXT_SIZE);
        assert_eq!(view.context_size(9), DEFAULT_CONTEXT_SIZE);
    }

    #[test]
    fn test_render_resets_expansions() {
        let mut view = view(Layout::Unified);
        view.render(&NoPairing).unwrap();
        view.expand(2).unwrap();

        view.render(&NoPairing).unwrap();
        assert_eq!(view.context_size(2), DEFAULT_CONTEXT_SIZE);
        let again = view.expand(2).unwrap();
        assert_eq!(count_rows(&again.markup), (30, 1));
    }

    #[test]
    fn test_too_large() {
        let mut view = view(Layout::Unified).with_max_lines(100);
        assert_eq!(
            view.render(&NoPairing),
            Err(GridError::TooLarge {
                lines: 112,
                limit: 100
            })
        );
    }

    #[test]
    fn test_malformed_view_cannot_expand() {
        let blocks = vec![
            DiffBlock::equal(lines("head", 40), 1, 1),
            DiffBlock::delete(lines("old", 1), 41, 41),
            DiffBlock::equal(lines("mid", 50), 500, 900),
            DiffBlock::insert(lines("new", 1), 550, 950),
        ];
        let mut view = DiffView::new(blocks, Layout::Unified);

        let rendered = view.render(&NoPairing);
        assert!(matches!(
            rendered,
            Err(GridError::LineNumberMismatch {
                index: 2,
                expected_old: 42,
                ..
            })
        ));
        assert_eq!(view.expand(2), Err(rendered.unwrap_err()));
        assert_eq!(view.context_size(2), DEFAULT_CONTEXT_SIZE);
    }

    #[test]
    fn test_oversized_view_cannot_expand() {
        let mut view = view(Layout::Unified).with_max_lines(10);
        let too_large = GridError::TooLarge {
            lines: 112,
            limit: 10,
        };

        assert_eq!(view.render(&NoPairing), Err(too_large.clone()));
        assert_eq!(view.expand(0), Err(too_large));
        assert_eq!(view.context_size(0), DEFAULT_CONTEXT_SIZE);
    }

    #[test]
    fn test_custom_window() {
        let mut view = view(Layout::Unified).with_window(ContextWindow {
            initial: 1,
            step: 5,
        });
        let grid = view.render(&NoPairing).unwrap();
        assert_eq!(skipped_counts(&grid.body), vec![39, 48, 19]);

        let fragment = view.expand(2).unwrap();
        assert_eq!(count_rows(&fragment.markup), (10, 1));
    }

    #[test]
    fn test_fragment_serializes() {
        let fragment = Fragment {
            block_index: 3,
            markup: "<tr></tr>".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&fragment).unwrap(),
            r#"{"block_index":3,"markup":"<tr></tr>"}"#
        );
    }
}
