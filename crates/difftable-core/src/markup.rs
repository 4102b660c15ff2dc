//! HTML markup for grid rows
//!
//! Every row goes through [`MarkupWriter::write_row`]. The row kind decides
//! what each side shows and the [`Layout`] decides where the sides go.

use crate::change::{Operation, Token, TokenDiff};
use crate::row::Row;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

const BLANK: &str = "&nbsp;";

/// Grid layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Old and new line numbers next to one interleaved content column
    #[default]
    Unified,
    /// Old and new content in two columns, each with its own line number
    Split,
}

impl Layout {
    /// Cells per grid row
    pub fn columns(self) -> usize {
        match self {
            Layout::Unified => 3,
            Layout::Split => 4,
        }
    }

    /// CSS class placed on the grid table
    pub fn class(self) -> &'static str {
        match self {
            Layout::Unified => "unified",
            Layout::Split => "split",
        }
    }

    /// Column group sized for the grid cells
    pub fn colgroup(self) -> &'static str {
        match self {
            Layout::Unified => "<colgroup><col width='40'><col width='40'><col></colgroup>",
            Layout::Split => "<colgroup><col width='40'><col><col width='40'><col></colgroup>",
        }
    }

    /// Whether unpaired deleted and inserted lines share rows
    pub fn aligns_gaps(self) -> bool {
        matches!(self, Layout::Split)
    }

    /// Column spans of the (handle, label) cells of an expander row
    fn expander_spans(self) -> (usize, usize) {
        match self {
            Layout::Unified => (2, 1),
            Layout::Split => (1, 3),
        }
    }

    fn place(self, out: &mut String, cells: Cells) {
        match self {
            Layout::Unified => {
                let (class, content) = match (cells.merged, &cells.old, &cells.new) {
                    (Some(merged), _, _) => (merged.class, merged.content),
                    (None, Some(half), _) | (None, None, Some(half)) => {
                        (half.class, half.content.clone())
                    }
                    (None, None, None) => ("", String::new()),
                };
                number_cell(out, class, cells.old.as_ref().map(|h| h.number));
                number_cell(out, class, cells.new.as_ref().map(|h| h.number));
                out.push_str(&content);
            }
            Layout::Split => {
                for half in [cells.old, cells.new] {
                    match half {
                        Some(half) => {
                            number_cell(out, half.class, Some(half.number));
                            out.push_str(&half.content);
                        }
                        None => {
                            number_cell(out, "", None);
                            out.push_str("<td class='content'>&nbsp;</td>");
                        }
                    }
                }
            }
        }
    }
}

/// Renders one token with a diff operation as inline markup
pub trait TokenRenderer {
    fn render(&self, token: &Token, operation: Operation, out: &mut String);
}

/// Default token renderer
///
/// Classed tokens become `<span class='cm-{class}'>`; deleted and inserted
/// tokens additionally get the `delete` or `insert` class.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTokens;

impl TokenRenderer for HtmlTokens {
    fn render(&self, token: &Token, operation: Operation, out: &mut String) {
        let mut classes = Vec::new();
        if let Some(class) = &token.class {
            classes.push(format!("cm-{}", escape_html(class)));
        }
        match operation {
            Operation::Equal => {}
            Operation::Delete => classes.push("delete".to_string()),
            Operation::Insert => classes.push("insert".to_string()),
        }

        if classes.is_empty() {
            out.push_str(&escape_html(&token.text));
        } else {
            let _ = write!(
                out,
                "<span class='{}'>{}</span>",
                classes.join(" "),
                escape_html(&token.text)
            );
        }
    }
}

/// Escape text for HTML content and single- or double-quoted attributes
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// One numbered side of a row
struct Half {
    number: usize,
    /// Extra class on the number cell
    class: &'static str,
    /// The complete content `<td>`
    content: String,
}

/// Content cell shared by both sides in the unified layout
struct Merged {
    class: &'static str,
    content: String,
}

struct Cells {
    old: Option<Half>,
    new: Option<Half>,
    merged: Option<Merged>,
}

fn number_cell(out: &mut String, class: &str, number: Option<usize>) {
    match number {
        Some(number) => {
            let _ = write!(out, "<td class='number{}'>{}</td>", class, number);
        }
        None => {
            let _ = write!(out, "<td class='number{}'>{}</td>", class, BLANK);
        }
    }
}

/// Writes grid rows for one view
pub struct MarkupWriter<'a> {
    layout: Layout,
    view_id: &'a str,
    tokens: &'a dyn TokenRenderer,
}

impl<'a> MarkupWriter<'a> {
    pub fn new(layout: Layout, view_id: &'a str, tokens: &'a dyn TokenRenderer) -> Self {
        Self {
            layout,
            view_id,
            tokens,
        }
    }

    pub fn write_rows(&self, rows: &[Row]) -> String {
        let mut out = String::new();
        for row in rows {
            self.write_row(&mut out, row);
        }
        out
    }

    pub fn write_row(&self, out: &mut String, row: &Row) {
        let cells = match *row {
            Row::Expander {
                block_index,
                skipped,
            } => {
                self.write_expander(out, block_index, skipped);
                return;
            }
            Row::SideBySide {
                old,
                new,
                old_tokens,
                new_tokens,
            } if self.layout == Layout::Unified => {
                // No second content column: show the halves one after the other
                self.write_row(out, &Row::Delete { old, tokens: old_tokens });
                self.write_row(out, &Row::Insert { new, tokens: new_tokens });
                return;
            }
            Row::Equal {
                old, new, tokens, ..
            } => {
                let class = format!("content old{} new{}", old, new);
                let content = self.content_cell(&class, BLANK, plain(tokens));
                Cells {
                    old: Some(Half {
                        number: old,
                        class: "",
                        content: content.clone(),
                    }),
                    new: Some(Half {
                        number: new,
                        class: "",
                        content: content.clone(),
                    }),
                    merged: Some(Merged { class: "", content }),
                }
            }
            Row::Delete { old, tokens } => Cells {
                old: Some(self.old_half(old, plain(tokens))),
                new: None,
                merged: None,
            },
            Row::Insert { new, tokens } => Cells {
                old: None,
                new: Some(self.new_half(new, plain(tokens))),
                merged: None,
            },
            Row::SideBySide {
                old,
                new,
                old_tokens,
                new_tokens,
            } => Cells {
                old: Some(self.old_half(old, plain(old_tokens))),
                new: Some(self.new_half(new, plain(new_tokens))),
                merged: None,
            },
            Row::Modification { old, new, diffs } => {
                let merged = match self.layout {
                    Layout::Unified => {
                        let class = format!("content old new old{} new{}", old, new);
                        Some(Merged {
                            class: " old new",
                            content: self.content_cell(&class, "*", segments(diffs, |_| true)),
                        })
                    }
                    Layout::Split => None,
                };
                Cells {
                    old: Some(self.old_half(old, segments(diffs, TokenDiff::on_old_side))),
                    new: Some(self.new_half(new, segments(diffs, TokenDiff::on_new_side))),
                    merged,
                }
            }
        };

        match row {
            Row::Equal { expanded: true, .. } => out.push_str("<tr class='line expanded'>"),
            _ => out.push_str("<tr class='line'>"),
        }
        self.layout.place(out, cells);
        out.push_str("</tr>");
    }

    fn old_half<'t>(&self, old: usize, tokens: impl Iterator<Item = (&'t Token, Operation)>) -> Half {
        let class = format!("content old old{}", old);
        Half {
            number: old,
            class: " old",
            content: self.content_cell(&class, "-", tokens),
        }
    }

    fn new_half<'t>(&self, new: usize, tokens: impl Iterator<Item = (&'t Token, Operation)>) -> Half {
        let class = format!("content new new{}", new);
        Half {
            number: new,
            class: " new",
            content: self.content_cell(&class, "+", tokens),
        }
    }

    fn content_cell<'t>(
        &self,
        class: &str,
        marker: &str,
        tokens: impl Iterator<Item = (&'t Token, Operation)>,
    ) -> String {
        let mut cell = String::new();
        let _ = write!(
            cell,
            "<td class='{}'><span class='operation'>{}</span>",
            class, marker
        );
        for (token, operation) in tokens {
            self.tokens.render(token, operation, &mut cell);
        }
        cell.push_str("</td>");
        cell
    }

    fn write_expander(&self, out: &mut String, block_index: usize, skipped: usize) {
        let (handle_span, label_span) = self.layout.expander_spans();
        let _ = write!(
            out,
            "<tr class='expander expander{index}'>\
             <td class='expander'{handle_span}><a class='expander' href='#' role='button' \
             title='Show more lines' data-view='{view}' data-block='{index}'><i class='fa fa-sort'></i></a></td>\
             <td class='skipped'{label_span}><i class='fa fa-ellipsis-h'></i> skipped {skipped} lines \
             <i class='fa fa-ellipsis-h'></i></td></tr>",
            index = block_index,
            view = escape_html(self.view_id),
            handle_span = colspan(handle_span),
            label_span = colspan(label_span),
            skipped = skipped,
        );
    }
}

fn colspan(span: usize) -> String {
    if span > 1 {
        format!(" colspan='{}'", span)
    } else {
        String::new()
    }
}

fn plain(tokens: &[Token]) -> impl Iterator<Item = (&Token, Operation)> {
    tokens.iter().map(|token| (token, Operation::Equal))
}

fn segments<'t>(
    diffs: &'t [TokenDiff],
    keep: impl Fn(&TokenDiff) -> bool + 't,
) -> impl Iterator<Item = (&'t Token, Operation)> {
    diffs
        .iter()
        .filter(move |diff| keep(*diff))
        .flat_map(|diff| diff.tokens.iter().map(move |token| (token, diff.operation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tokens(text: &str) -> Vec<Token> {
        vec![Token::new(text)]
    }

    fn write(layout: Layout, row: &Row) -> String {
        let writer = MarkupWriter::new(layout, "diff1", &HtmlTokens);
        let mut out = String::new();
        writer.write_row(&mut out, row);
        out
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html("a < b && c > 'd' \"e\""),
            "a &lt; b &amp;&amp; c &gt; &#39;d&#39; &quot;e&quot;"
        );
    }

    #[test]
    fn test_token_classes() {
        let mut out = String::new();
        HtmlTokens.render(&Token::new("x"), Operation::Equal, &mut out);
        HtmlTokens.render(&Token::new("1").with_class("number"), Operation::Equal, &mut out);
        HtmlTokens.render(&Token::new("y"), Operation::Insert, &mut out);
        HtmlTokens.render(&Token::new("<").with_class("operator"), Operation::Delete, &mut out);
        assert_eq!(
            out,
            "x<span class='cm-number'>1</span><span class='insert'>y</span>\
             <span class='cm-operator delete'>&lt;</span>"
        );
    }

    #[test]
    fn test_equal_row_unified() {
        let line = tokens("same");
        let row = Row::Equal {
            old: 4,
            new: 6,
            tokens: &line,
            expanded: false,
        };
        assert_eq!(
            write(Layout::Unified, &row),
            "<tr class='line'><td class='number'>4</td><td class='number'>6</td>\
             <td class='content old4 new6'><span class='operation'>&nbsp;</span>same</td></tr>"
        );
    }

    #[test]
    fn test_expanded_equal_row_split() {
        let line = tokens("same");
        let row = Row::Equal {
            old: 4,
            new: 6,
            tokens: &line,
            expanded: true,
        };
        let cell = "<td class='content old4 new6'><span class='operation'>&nbsp;</span>same</td>";
        assert_eq!(
            write(Layout::Split, &row),
            format!(
                "<tr class='line expanded'><td class='number'>4</td>{cell}\
                 <td class='number'>6</td>{cell}</tr>"
            )
        );
    }

    #[test]
    fn test_delete_row_blanks_other_side() {
        let line = tokens("gone");
        let row = Row::Delete {
            old: 3,
            tokens: &line,
        };
        let cell = "<td class='content old old3'><span class='operation'>-</span>gone</td>";
        assert_eq!(
            write(Layout::Unified, &row),
            format!(
                "<tr class='line'><td class='number old'>3</td>\
                 <td class='number old'>&nbsp;</td>{cell}</tr>"
            )
        );
        assert_eq!(
            write(Layout::Split, &row),
            format!(
                "<tr class='line'><td class='number old'>3</td>{cell}\
                 <td class='number'>&nbsp;</td><td class='content'>&nbsp;</td></tr>"
            )
        );
    }

    #[test]
    fn test_insert_row_blanks_other_side() {
        let line = tokens("new");
        let row = Row::Insert {
            new: 8,
            tokens: &line,
        };
        let cell = "<td class='content new new8'><span class='operation'>+</span>new</td>";
        assert_eq!(
            write(Layout::Unified, &row),
            format!(
                "<tr class='line'><td class='number new'>&nbsp;</td>\
                 <td class='number new'>8</td>{cell}</tr>"
            )
        );
        assert_eq!(
            write(Layout::Split, &row),
            format!(
                "<tr class='line'><td class='number'>&nbsp;</td><td class='content'>&nbsp;</td>\
                 <td class='number new'>8</td>{cell}</tr>"
            )
        );
    }

    #[test]
    fn test_modification_row() {
        let diffs = vec![
            TokenDiff::equal(tokens("let ")),
            TokenDiff::delete(tokens("a")),
            TokenDiff::insert(tokens("b")),
        ];
        let row = Row::Modification {
            old: 2,
            new: 5,
            diffs: &diffs,
        };
        assert_eq!(
            write(Layout::Unified, &row),
            "<tr class='line'><td class='number old new'>2</td><td class='number old new'>5</td>\
             <td class='content old new old2 new5'><span class='operation'>*</span>let \
             <span class='delete'>a</span><span class='insert'>b</span></td></tr>"
        );
        assert_eq!(
            write(Layout::Split, &row),
            "<tr class='line'><td class='number old'>2</td>\
             <td class='content old old2'><span class='operation'>-</span>let \
             <span class='delete'>a</span></td>\
             <td class='number new'>5</td>\
             <td class='content new new5'><span class='operation'>+</span>let \
             <span class='insert'>b</span></td></tr>"
        );
    }

    #[test]
    fn test_side_by_side_row() {
        let old_line = tokens("x");
        let new_line = tokens("y");
        let row = Row::SideBySide {
            old: 1,
            new: 2,
            old_tokens: &old_line,
            new_tokens: &new_line,
        };
        assert_eq!(
            write(Layout::Split, &row),
            "<tr class='line'><td class='number old'>1</td>\
             <td class='content old old1'><span class='operation'>-</span>x</td>\
             <td class='number new'>2</td>\
             <td class='content new new2'><span class='operation'>+</span>y</td></tr>"
        );

        let unified = write(Layout::Unified, &row);
        assert_eq!(unified.matches("<tr").count(), 2);
        assert!(unified.find("old1").unwrap() < unified.find("new2").unwrap());
    }

    #[test]
    fn test_expander_row() {
        let row = Row::Expander {
            block_index: 4,
            skipped: 12,
        };
        let unified = write(Layout::Unified, &row);
        assert!(unified
            .starts_with("<tr class='expander expander4'><td class='expander' colspan='2'>"));
        assert!(unified.contains(
            "<a class='expander' href='#' role='button' title='Show more lines' \
             data-view='diff1' data-block='4'>"
        ));
        assert!(unified
            .contains("<td class='skipped'><i class='fa fa-ellipsis-h'></i> skipped 12 lines"));

        let split = write(Layout::Split, &row);
        assert!(split.contains("<td class='expander'><a"));
        assert!(split.contains("<td class='skipped' colspan='3'>"));
    }

    #[test]
    fn test_columns_match_colgroup() {
        for layout in [Layout::Unified, Layout::Split] {
            let colgroup = layout.colgroup();
            let cols = colgroup.matches("<col ").count() + colgroup.matches("<col>").count();
            assert_eq!(cols, layout.columns());
        }
    }
}
