//! The packed integer cell state and its rendering style.
//!
//! # Encoding
//!
//! | value        | state                                         |
//! |--------------|-----------------------------------------------|
//! | `0`          | empty                                         |
//! | `1..=10`     | component `value - 1`                         |
//! | `11..=199`   | directional, direction = `value % 4`          |
//! | `201..`      | reaction intermediate                         |
//! | anything else| unknown                                       |
//!
//! Direction residues: `1` up, `2` left, `3` down, `0` right. The arrow angle
//! is counter-clockwise from up, a quarter turn per step in that order.

use crate::config::Ingredient;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest value that still names a plain component.
pub const MAX_COMPONENT_VALUE: i64 = 10;

/// Highest directional value.
pub const MAX_DIRECTIONAL_VALUE: i64 = 199;

/// Values strictly above this are reaction intermediates.
pub const INTERMEDIATE_THRESHOLD: i64 = 200;

/// First directional value with residue 0, used when encoding.
const DIRECTIONAL_BASE: i64 = 12;

/// Arrow direction of a directional cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Left,
    Down,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];

    /// Direction for a `value % 4` residue.
    pub fn from_residue(residue: i64) -> Self {
        match residue.rem_euclid(4) {
            1 => Direction::Up,
            2 => Direction::Left,
            3 => Direction::Down,
            _ => Direction::Right,
        }
    }

    pub fn residue(&self) -> i64 {
        match self {
            Direction::Up => 1,
            Direction::Left => 2,
            Direction::Down => 3,
            Direction::Right => 0,
        }
    }

    /// Counter-clockwise quarter turns from `Up`.
    pub fn quarter_turns(&self) -> u32 {
        match self {
            Direction::Up => 0,
            Direction::Left => 1,
            Direction::Down => 2,
            Direction::Right => 3,
        }
    }

    /// Arrow rotation in degrees.
    pub fn degrees(&self) -> u32 {
        self.quarter_turns() * 90
    }

    /// Single-character arrow used by text renderers.
    pub fn glyph(&self) -> char {
        match self {
            Direction::Up => '↑',
            Direction::Left => '←',
            Direction::Down => '↓',
            Direction::Right => '→',
        }
    }
}

/// Decoded state of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum CellState {
    Empty,
    Component { component_index: usize },
    Directional { direction: Direction },
    Intermediate,
    Unknown,
}

impl CellState {
    /// Short kind name, matching the serialized tag.
    pub fn kind(&self) -> &'static str {
        match self {
            CellState::Empty => "Empty",
            CellState::Component { .. } => "Component",
            CellState::Directional { .. } => "Directional",
            CellState::Intermediate => "Intermediate",
            CellState::Unknown => "Unknown",
        }
    }
}

/// Decodes a packed cell value.
///
/// Total: every integer maps to a state. The range alone decides the kind; a
/// component value whose index is past the end of the inventory still decodes
/// as [`CellState::Component`] and is painted with the default colour by
/// [`CellStyle`].
pub fn decode_cell(value: i64, _components: &[Ingredient]) -> CellState {
    match value {
        0 => CellState::Empty,
        1..=MAX_COMPONENT_VALUE => CellState::Component {
            component_index: (value - 1) as usize,
        },
        11..=MAX_DIRECTIONAL_VALUE => CellState::Directional {
            direction: Direction::from_residue(value),
        },
        v if v > INTERMEDIATE_THRESHOLD => CellState::Intermediate,
        _ => CellState::Unknown,
    }
}

/// Canonical value for a state, or `None` for states without one.
pub fn encode_cell(state: &CellState) -> Option<i64> {
    match state {
        CellState::Empty => Some(0),
        CellState::Component { component_index } => {
            let value = *component_index as i64 + 1;
            (value <= MAX_COMPONENT_VALUE).then_some(value)
        }
        CellState::Directional { direction } => Some(DIRECTIONAL_BASE + direction.residue()),
        CellState::Intermediate => Some(INTERMEDIATE_THRESHOLD + 1),
        CellState::Unknown => None,
    }
}

// ============================================================================
// PALETTE
// ============================================================================

/// An sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const EMPTY: Rgb = Rgb(0xe5, 0xe7, 0xeb);
    pub const DEFAULT: Rgb = Rgb(0x6b, 0x72, 0x80);
    pub const DIRECTIONAL: Rgb = Rgb(0xba, 0xe6, 0xfd);
    pub const ARROW: Rgb = Rgb(0x92, 0x40, 0x0e);
    pub const INTERMEDIATE: Rgb = Rgb(0xf5, 0x9e, 0x42);
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Symbolic colour names accepted for components.
pub const PALETTE: [(&str, Rgb); 8] = [
    ("red", Rgb(0xef, 0x44, 0x44)),
    ("blue", Rgb(0x3b, 0x82, 0xf6)),
    ("green", Rgb(0x22, 0xc5, 0x5e)),
    ("yellow", Rgb(0xea, 0xb3, 0x08)),
    ("purple", Rgb(0xa2, 0x1c, 0xaf)),
    ("pink", Rgb(0xec, 0x48, 0x99)),
    ("gray", Rgb(0x6b, 0x72, 0x80)),
    ("orange", Rgb(0xf9, 0x73, 0x16)),
];

/// Looks up a palette colour by name (case-insensitive).
pub fn palette_color(name: &str) -> Option<Rgb> {
    let name = name.trim();
    PALETTE
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, rgb)| *rgb)
}

/// Arrow overlay for directional cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrow {
    pub color: Rgb,
    pub degrees: u32,
}

/// How the renderer should paint one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellStyle {
    pub fill: Rgb,
    pub arrow: Option<Arrow>,
}

impl CellStyle {
    pub fn for_state(state: &CellState, components: &[Ingredient]) -> Self {
        let fill = match state {
            CellState::Empty => Rgb::EMPTY,
            CellState::Component { component_index } => components
                .get(*component_index)
                .and_then(|c| palette_color(&c.color))
                .unwrap_or(Rgb::DEFAULT),
            CellState::Directional { .. } => Rgb::DIRECTIONAL,
            CellState::Intermediate => Rgb::INTERMEDIATE,
            CellState::Unknown => Rgb::DEFAULT,
        };
        let arrow = match state {
            CellState::Directional { direction } => Some(Arrow {
                color: Rgb::ARROW,
                degrees: direction.degrees(),
            }),
            _ => None,
        };
        Self { fill, arrow }
    }

    /// Decodes `value` and styles the result.
    pub fn for_value(value: i64, components: &[Ingredient]) -> Self {
        Self::for_state(&decode_cell(value, components), components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn components(n: usize) -> Vec<Ingredient> {
        let colors = ["red", "blue", "green", "teal", "orange"];
        (0..n)
            .map(|i| Ingredient::new(format!("C{}", i), colors[i % colors.len()], 0.0))
            .collect()
    }

    #[test]
    fn test_boundaries() {
        let comps = components(5);
        assert_eq!(decode_cell(0, &comps), CellState::Empty);
        assert_eq!(decode_cell(1, &comps), CellState::Component { component_index: 0 });
        assert_eq!(decode_cell(5, &comps), CellState::Component { component_index: 4 });
        assert_eq!(decode_cell(250, &comps), CellState::Intermediate);
        assert_eq!(decode_cell(201, &comps), CellState::Intermediate);
        assert_eq!(decode_cell(200, &comps), CellState::Unknown);
        assert_eq!(decode_cell(-1, &comps), CellState::Unknown);
    }

    #[test]
    fn test_component_past_inventory_keeps_its_kind() {
        let comps = components(2);
        let state = decode_cell(3, &comps);
        assert_eq!(state, CellState::Component { component_index: 2 });
        assert_eq!(state.kind(), "Component");
        assert_eq!(CellStyle::for_state(&state, &comps).fill, Rgb::DEFAULT);
        assert_eq!(decode_cell(10, &components(10)), CellState::Component { component_index: 9 });
    }

    #[test]
    fn test_directional_residues() {
        let comps = components(1);
        let dir = |v| match decode_cell(v, &comps) {
            CellState::Directional { direction } => direction,
            other => panic!("expected directional, got {:?}", other),
        };
        assert_eq!(dir(13), Direction::Up);
        assert_eq!(dir(14), Direction::Left);
        assert_eq!(dir(15), Direction::Down);
        assert_eq!(dir(16), Direction::Right);
        assert_eq!(dir(11), Direction::Down);
        assert_eq!(dir(199), Direction::Down);
        assert_eq!(Direction::Down.degrees(), 180);
        assert_eq!(Direction::Right.degrees(), 270);
    }

    #[test]
    fn test_encode_is_inverse_of_decode() {
        let comps = components(10);
        let mut states = vec![CellState::Empty, CellState::Intermediate];
        states.extend((0..10).map(|i| CellState::Component { component_index: i }));
        states.extend(Direction::ALL.iter().map(|&d| CellState::Directional { direction: d }));

        for state in states {
            let value = encode_cell(&state).unwrap();
            assert_eq!(decode_cell(value, &comps), state);
        }
        assert_eq!(encode_cell(&CellState::Unknown), None);
        assert_eq!(encode_cell(&CellState::Component { component_index: 10 }), None);
    }

    #[test]
    fn test_styles() {
        let comps = components(4);
        assert_eq!(CellStyle::for_value(0, &comps).fill, Rgb::EMPTY);
        assert_eq!(CellStyle::for_value(1, &comps).fill, Rgb(0xef, 0x44, 0x44));
        // "teal" is not in the palette
        assert_eq!(CellStyle::for_value(4, &comps).fill, Rgb::DEFAULT);
        assert_eq!(CellStyle::for_value(300, &comps).fill, Rgb::INTERMEDIATE);

        let style = CellStyle::for_value(14, &comps);
        assert_eq!(style.fill, Rgb::DIRECTIONAL);
        assert_eq!(style.arrow, Some(Arrow { color: Rgb::ARROW, degrees: 90 }));
        assert_eq!(Rgb::DIRECTIONAL.to_string(), "#bae6fd");
    }

    #[test]
    fn test_palette_lookup() {
        assert_eq!(palette_color("Blue"), Some(Rgb(0x3b, 0x82, 0xf6)));
        assert_eq!(palette_color(" orange "), Some(Rgb(0xf9, 0x73, 0x16)));
        assert_eq!(palette_color("octarine"), None);
    }

    #[test]
    fn test_decode_is_total_over_small_range() {
        let comps = components(5);
        for v in -5..=500 {
            let state = decode_cell(v, &comps);
            let _ = CellStyle::for_state(&state, &comps);
        }
    }

    proptest! {
        #[test]
        fn prop_decode_never_panics(v in any::<i64>(), n in 0usize..12) {
            let comps = components(n);
            let state = decode_cell(v, &comps);
            if (11..=199).contains(&v) {
                let is_directional = matches!(state, CellState::Directional { .. });
                prop_assert!(is_directional);
            }
        }
    }
}
