//! Component letters and interaction participant labels.
//!
//! Components are addressed by their position in the ingredient list and shown
//! to users as a letter (`0 -> 'A'`, `1 -> 'B'`, ...). Every conversion between
//! the two goes through [`ComponentLabel`] so that inserting or removing a
//! component re-letters everything consistently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest number of components that still have a single-letter label.
pub const MAX_COMPONENTS: usize = 26;

/// Sentinel used on the wire when no component rotates.
pub const NO_ROTATION: &str = "None";

/// Projection of a 0-based component index onto its display letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentLabel(usize);

impl ComponentLabel {
    /// Creates a label for the component at `index`.
    ///
    /// Returns `None` past the last letter of the alphabet.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < MAX_COMPONENTS).then_some(Self(index))
    }

    /// Parses a single uppercase letter (`"A"` .. `"Z"`).
    pub fn from_letter(letter: &str) -> Option<Self> {
        let mut chars = letter.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => Some(Self((c as u8 - b'A') as usize)),
            _ => None,
        }
    }

    /// Returns the 0-based component index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Returns the display letter.
    pub fn letter(&self) -> char {
        (b'A' + self.0 as u8) as char
    }
}

impl fmt::Display for ComponentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Orientation sub-state of the rotating component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Orientation {
    First,
    Second,
}

impl Orientation {
    pub const BOTH: [Orientation; 2] = [Orientation::First, Orientation::Second];

    fn suffix(&self) -> char {
        match self {
            Orientation::First => '1',
            Orientation::Second => '2',
        }
    }
}

/// One side of an interaction pair: a component, optionally narrowed to one
/// orientation when that component is the rotating one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Participant {
    pub component: ComponentLabel,
    pub orientation: Option<Orientation>,
}

impl Participant {
    /// A participant for a non-rotating component.
    pub fn plain(component: ComponentLabel) -> Self {
        Self { component, orientation: None }
    }

    /// A participant for one orientation of the rotating component.
    pub fn oriented(component: ComponentLabel, orientation: Orientation) -> Self {
        Self { component, orientation: Some(orientation) }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.orientation {
            Some(o) => write!(f, "{}{}", self.component, o.suffix()),
            None => write!(f, "{}", self.component),
        }
    }
}

impl FromStr for Participant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (letter, suffix) = match s.char_indices().nth(1) {
            Some((split, _)) => s.split_at(split),
            None => (s, ""),
        };
        let component = ComponentLabel::from_letter(letter)
            .ok_or_else(|| format!("Invalid participant: {}", s))?;
        let orientation = match suffix {
            "" => None,
            "1" => Some(Orientation::First),
            "2" => Some(Orientation::Second),
            _ => return Err(format!("Invalid orientation in participant: {}", s)),
        };
        Ok(Self { component, orientation })
    }
}

/// Resolves the configuration-wide rotation selector against the current
/// component count. Out-of-range or malformed letters degrade to no rotation.
pub fn resolve_rotating(letter: &str, component_count: usize) -> Option<ComponentLabel> {
    if letter.trim().is_empty() || letter.trim() == NO_ROTATION {
        return None;
    }
    ComponentLabel::from_letter(letter).filter(|label| label.index() < component_count)
}
