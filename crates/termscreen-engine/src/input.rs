//! Keyboard input types for engine key dispatch.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Modifier bitmask for key dispatch.
///
/// Matches the wire encoding used across the engine boundary:
/// SHIFT = 1, ALT = 2, CTRL = 4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Modifiers(u8);

impl Modifiers {
    /// No modifiers held.
    pub const NONE: Modifiers = Modifiers(0);
    /// Shift key.
    pub const SHIFT: Modifiers = Modifiers(1);
    /// Alt/Meta key.
    pub const ALT: Modifiers = Modifiers(2);
    /// Control key.
    pub const CTRL: Modifiers = Modifiers(4);

    /// Build from a raw bitmask; unknown bits are dropped.
    pub fn from_bits(bits: u8) -> Self {
        Modifiers(bits & 0b111)
    }

    /// The raw bitmask.
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check whether every modifier in `other` is held.
    pub fn contains(&self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no modifiers are held.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Modifiers {
    type Output = Modifiers;

    fn bitor(self, rhs: Modifiers) -> Modifiers {
        Modifiers(self.0 | rhs.0)
    }
}

/// Named keys dispatched to the engine.
///
/// Character keys go through `dispatch_character` instead; this enum covers
/// the keys that produce escape sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum KeyCode {
    /// Enter/Return
    Enter,
    /// Tab
    Tab,
    /// Backspace
    Backspace,
    /// Escape
    Escape,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Insert
    Insert,
    /// Delete
    Delete,
    /// Home
    Home,
    /// End
    End,
    /// Page Up
    PageUp,
    /// Page Down
    PageDown,
    /// Function key (1..=12)
    Function(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        let mods = Modifiers::SHIFT | Modifiers::CTRL;
        assert_eq!(mods.bits(), 5);
        assert!(mods.contains(Modifiers::SHIFT));
        assert!(mods.contains(Modifiers::CTRL));
        assert!(!mods.contains(Modifiers::ALT));
        assert!(!mods.is_empty());
    }

    #[test]
    fn test_from_bits_drops_unknown() {
        assert_eq!(Modifiers::from_bits(0xff).bits(), 0b111);
        assert_eq!(Modifiers::from_bits(0), Modifiers::NONE);
    }
}
