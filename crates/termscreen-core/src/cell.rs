//! Cell and color types for the terminal grid.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 24-bit RGB color.
///
/// The emulation engine resolves palette indices and default colors to RGB
/// before cells cross the boundary, so this is the only color representation
/// the grid model needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Color {
    /// Red component
    pub r: u8,
    /// Green component
    pub g: u8,
    /// Blue component
    pub b: u8,
}

impl Color {
    /// Default foreground.
    pub const WHITE: Color = Color::new(255, 255, 255);
    /// Default background.
    pub const BLACK: Color = Color::new(0, 0, 0);

    /// Create a color from components.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Text attributes for a terminal cell.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
pub struct CellAttributes {
    /// Bold text
    pub bold: bool,
    /// Italic text
    pub italic: bool,
    /// Underline style: 0 = none, 1 = single, 2 = double
    pub underline: u8,
    /// Blinking text
    pub blink: bool,
    /// Reverse video (swap fg/bg)
    pub reverse: bool,
    /// Strikethrough text
    pub strike: bool,
}

impl CellAttributes {
    /// Check if attributes are all default (no formatting).
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Single grid position: a base character plus any combining characters,
/// colors, attributes and display width.
///
/// Immutable once constructed for a given line version; lines are replaced
/// wholesale rather than edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Cell {
    /// Primary character (space if the cell is empty)
    pub ch: char,
    /// Combining characters attached to the primary character
    pub combining: Vec<char>,
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text attributes
    pub attrs: CellAttributes,
    /// Display width in columns (1, or 2 for East-Asian wide/fullwidth)
    pub width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self::blank(Color::WHITE, Color::BLACK)
    }
}

impl Cell {
    /// Create a width-1 cell with a character and default styling.
    pub fn new(ch: char) -> Self {
        Self {
            ch,
            ..Default::default()
        }
    }

    /// Create an empty cell with the given default colors.
    pub fn blank(fg: Color, bg: Color) -> Self {
        Self {
            ch: ' ',
            combining: Vec::new(),
            fg,
            bg,
            attrs: CellAttributes::default(),
            width: 1,
        }
    }

    /// Check if the cell occupies two grid columns.
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Append the cell's characters (base plus combining) to a string.
    pub fn push_text(&self, out: &mut String) {
        out.push(self.ch);
        out.extend(self.combining.iter());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_serialization() {
        let color = Color::new(255, 128, 0);
        let json = serde_json::to_string(&color).unwrap();
        let deserialized: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(color, deserialized);
    }

    #[test]
    fn test_cell_attributes_default() {
        let attrs = CellAttributes::default();
        assert!(attrs.is_default());
        assert!(!attrs.bold);
        assert_eq!(attrs.underline, 0);
    }

    #[test]
    fn test_cell_default_is_blank() {
        let cell = Cell::default();
        assert_eq!(cell.ch, ' ');
        assert!(cell.combining.is_empty());
        assert_eq!(cell.fg, Color::WHITE);
        assert_eq!(cell.bg, Color::BLACK);
        assert_eq!(cell.width, 1);
        assert!(!cell.is_wide());
    }

    #[test]
    fn test_cell_push_text_includes_combining() {
        let cell = Cell {
            ch: 'e',
            combining: vec!['\u{0301}'],
            ..Default::default()
        };
        let mut text = String::new();
        cell.push_text(&mut text);
        assert_eq!(text, "e\u{0301}");
    }
}
