//! Per-row line reconstruction from engine cell-run queries.
//!
//! Rebuilds the visible grid row by row, querying the engine for maximal
//! style-uniform runs and expanding them into cells with stable column
//! positions: surrogate pairs fold into one scalar, grapheme-extend
//! characters fold onto their base cell, and East-Asian wide characters
//! consume two columns.

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthChar;

use termscreen_core::{Cell, Color, Dimensions, Line};
use termscreen_engine::TerminalEngine;

/// Rebuild one row of the grid.
///
/// Out-of-range rows yield an empty line. A zero-length run blank-fills the
/// remainder of the row in the current default colors and stops the scan.
pub fn reconstruct_line(
    engine: &dyn TerminalEngine,
    row: u16,
    dims: Dimensions,
    default_fg: Color,
    default_bg: Color,
    stamp: u64,
) -> Line {
    if row >= dims.rows {
        return Line::new(Vec::new(), stamp);
    }

    let mut cells: Vec<Cell> = Vec::with_capacity(dims.cols as usize);
    let mut col: u16 = 0;

    'walk: while col < dims.cols {
        let run = match engine.cell_run(row, col) {
            Some(run) if !run.is_empty() => run,
            // Nothing useful at this column: the tail is blank
            _ => break,
        };

        // The engine streams UTF-16 units; surrogate pairs become one scalar
        let decoded: String = char::decode_utf16(run.chars.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();

        let mut advanced = false;
        for grapheme in decoded.graphemes(true) {
            let mut chars = grapheme.chars();
            let Some(base) = chars.next() else {
                continue;
            };
            let combining: Vec<char> = chars.collect();
            let width: u16 = match UnicodeWidthChar::width(base) {
                Some(2) => 2,
                _ => 1,
            };
            if col + width > dims.cols {
                // A wide cell cannot straddle the right edge
                break 'walk;
            }
            cells.push(Cell {
                ch: base,
                combining,
                fg: run.fg,
                bg: run.bg,
                attrs: run.attrs,
                width: width as u8,
            });
            col += width;
            advanced = true;
            if col >= dims.cols {
                break 'walk;
            }
        }
        if !advanced {
            break;
        }
    }

    // Fill whatever the walk did not reach with blanks in default colors
    while col < dims.cols {
        cells.push(Cell::blank(default_fg, default_bg));
        col += 1;
    }

    Line::new(cells, stamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use termscreen_core::CellAttributes;
    use termscreen_engine::{CellRun, EngineCallbacks, FakeEngine, KeyCode, Modifiers};

    /// Engine returning scripted runs, for edge cases the fake grid cannot
    /// produce (zero-length runs mid-row, oversized runs).
    struct ScriptedEngine {
        runs: Vec<Option<CellRun>>,
    }

    impl ScriptedEngine {
        fn new(runs: Vec<Option<CellRun>>) -> Self {
            Self { runs }
        }

        fn run_of(text: &str) -> CellRun {
            CellRun {
                chars: text.encode_utf16().collect(),
                fg: Color::WHITE,
                bg: Color::BLACK,
                attrs: CellAttributes::default(),
            }
        }
    }

    impl TerminalEngine for ScriptedEngine {
        fn set_callbacks(&mut self, _callbacks: Arc<dyn EngineCallbacks>) {}
        fn feed_bytes(&mut self, data: &[u8]) -> usize {
            data.len()
        }
        fn resize(&mut self, _rows: u16, _cols: u16, _scrollback_capacity: usize) {}
        fn dispatch_key(&mut self, _modifiers: Modifiers, _key: KeyCode) -> bool {
            false
        }
        fn dispatch_character(&mut self, _modifiers: Modifiers, _ch: char) -> bool {
            false
        }
        fn cell_run(&self, _row: u16, col: u16) -> Option<CellRun> {
            let mut consumed = 0u16;
            for run in &self.runs {
                if consumed == col {
                    return run.clone();
                }
                let width: u16 = match run {
                    Some(r) => {
                        let decoded: String = char::decode_utf16(r.chars.iter().copied())
                            .map(|c| c.unwrap())
                            .collect();
                        decoded
                            .chars()
                            .map(|c| match UnicodeWidthChar::width(c) {
                                Some(2) => 2u16,
                                Some(0) => 0u16,
                                _ => 1u16,
                            })
                            .sum()
                    }
                    None => return None,
                };
                consumed += width;
            }
            None
        }
        fn set_palette_color(&mut self, _index: u8, _color: Color) {}
        fn set_default_colors(&mut self, _fg: Color, _bg: Color) {}
    }

    fn dims(rows: u16, cols: u16) -> Dimensions {
        Dimensions::new(rows, cols)
    }

    #[test]
    fn test_ascii_row_all_width_one() {
        let engine = FakeEngine::new(5, 20);
        engine.paint_text(0, 0, "hello world");

        let line = reconstruct_line(&engine, 0, dims(5, 20), Color::WHITE, Color::BLACK, 1);
        assert_eq!(line.text().trim_end(), "hello world");
        assert_eq!(line.column_count(), 20);
        for cell in &line.cells {
            assert_eq!(cell.width, 1);
            assert!(cell.combining.is_empty());
        }
    }

    #[test]
    fn test_fullwidth_cells_consume_two_columns() {
        let engine = FakeEngine::new(5, 10);
        engine.paint_text(0, 0, "猫犬鳥");

        let line = reconstruct_line(&engine, 0, dims(5, 10), Color::WHITE, Color::BLACK, 1);
        // Three wide cells plus four blanks consume exactly the grid width
        assert_eq!(line.column_count(), 10);
        assert_eq!(line.cells[0].ch, '猫');
        assert_eq!(line.cells[0].width, 2);
        assert_eq!(line.cells[1].ch, '犬');
        assert_eq!(line.cells[2].ch, '鳥');
        assert_eq!(line.cells.len(), 3 + 4);
    }

    #[test]
    fn test_combining_chars_fold_onto_base() {
        let engine = ScriptedEngine::new(vec![Some(ScriptedEngine::run_of("e\u{0301}x"))]);

        let line = reconstruct_line(&engine, 0, dims(1, 10), Color::WHITE, Color::BLACK, 1);
        assert_eq!(line.cells[0].ch, 'e');
        assert_eq!(line.cells[0].combining, vec!['\u{0301}']);
        assert_eq!(line.cells[1].ch, 'x');
        assert_eq!(line.column_count(), 10);
    }

    #[test]
    fn test_surrogate_pair_folds_to_one_cell() {
        // U+1F600 encodes as a surrogate pair in UTF-16
        let engine = ScriptedEngine::new(vec![Some(ScriptedEngine::run_of("\u{1F600}a"))]);

        let line = reconstruct_line(&engine, 0, dims(1, 10), Color::WHITE, Color::BLACK, 1);
        assert_eq!(line.cells[0].ch, '\u{1F600}');
        assert_eq!(line.cells[0].width, 2);
        assert_eq!(line.cells[1].ch, 'a');
    }

    #[test]
    fn test_zero_length_run_blank_fills_remainder() {
        let red = Color::new(200, 0, 0);
        let engine = ScriptedEngine::new(vec![Some(ScriptedEngine::run_of("ab")), None]);

        let line = reconstruct_line(&engine, 0, dims(1, 8), Color::WHITE, red, 1);
        assert_eq!(line.cells.len(), 8);
        assert_eq!(line.cells[0].ch, 'a');
        assert_eq!(line.cells[1].ch, 'b');
        for cell in &line.cells[2..] {
            assert_eq!(cell.ch, ' ');
            assert_eq!(cell.bg, red);
        }
    }

    #[test]
    fn test_out_of_range_row_yields_empty_line() {
        let engine = FakeEngine::new(5, 20);
        let line = reconstruct_line(&engine, 9, dims(5, 20), Color::WHITE, Color::BLACK, 1);
        assert!(line.cells.is_empty());
    }

    #[test]
    fn test_styled_runs_keep_attributes() {
        let engine = FakeEngine::new(5, 20);
        let red = Color::new(255, 0, 0);
        let attrs = CellAttributes {
            bold: true,
            ..Default::default()
        };
        engine.paint_text(0, 0, "ok ");
        engine.paint_styled(0, 3, "FAIL", red, Color::BLACK, attrs);

        let line = reconstruct_line(&engine, 0, dims(5, 20), Color::WHITE, Color::BLACK, 1);
        assert_eq!(line.text().trim_end(), "ok FAIL");
        assert!(!line.cells[0].attrs.bold);
        assert!(line.cells[3].attrs.bold);
        assert_eq!(line.cells[3].fg, red);
    }

    #[test]
    fn test_reconstruction_is_idempotent() {
        let engine = FakeEngine::new(5, 20);
        engine.paint_text(2, 0, "stable content");

        let first = reconstruct_line(&engine, 2, dims(5, 20), Color::WHITE, Color::BLACK, 1);
        let second = reconstruct_line(&engine, 2, dims(5, 20), Color::WHITE, Color::BLACK, 2);

        assert!(first.content_eq(&second));
        assert_ne!(first.last_modified, second.last_modified);
    }

    #[test]
    fn test_wide_char_at_right_edge_stops_walk() {
        // Wide char would straddle the last column
        let engine = ScriptedEngine::new(vec![Some(ScriptedEngine::run_of("abc猫"))]);

        let line = reconstruct_line(&engine, 0, dims(1, 4), Color::WHITE, Color::BLACK, 1);
        assert_eq!(line.cells.len(), 4);
        assert_eq!(line.text(), "abc ");
    }
}
