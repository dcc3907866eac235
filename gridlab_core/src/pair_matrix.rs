//! The pairwise interaction matrix.
//!
//! Every unordered pair of interaction participants gets one interaction
//! parameter (`J`). Ordinary components contribute one participant each; the
//! rotating component (at most one) contributes two, one per orientation.
//!
//! The enumeration order is part of the contract: saved parameter sets are
//! displayed and persisted in generator order, so regenerating after a count
//! or rotation change must reproduce it exactly.

use crate::labels::{ComponentLabel, Orientation, Participant, MAX_COMPONENTS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// An unordered pair of interaction participants, stored in generator order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub first: Participant,
    pub second: Participant,
}

impl PairKey {
    pub fn new(first: Participant, second: Participant) -> Self {
        Self { first, second }
    }

    /// Returns true if either side refers to the given component.
    pub fn touches(&self, component: ComponentLabel) -> bool {
        self.first.component == component || self.second.component == component
    }

    /// Order-insensitive identity, used to match entries across regenerations.
    fn canonical(&self) -> (Participant, Participant) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.first, self.second)
    }
}

impl FromStr for PairKey {
    type Err = String;

    /// Accepts `|` and, for older saved sets, `-` as the separator.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(['|', '-'])
            .ok_or_else(|| format!("Invalid relation: {}", s))?;
        Ok(Self::new(a.parse()?, b.parse()?))
    }
}

/// Pair enumeration strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PairStrategy {
    /// Rotation-aware lower-triangular enumeration.
    #[default]
    Triangular,

    /// Every ordered pair, with pairs touching the last component moved to the
    /// end. Kept for parameter sets saved before rotation support; ignores
    /// the rotating component.
    LegacyOrdered,
}

impl PairStrategy {
    pub fn generate(&self, component_count: usize, rotating: Option<ComponentLabel>) -> Vec<PairKey> {
        match self {
            PairStrategy::Triangular => generate_pair_matrix(component_count, rotating),
            PairStrategy::LegacyOrdered => generate_legacy_pair_matrix(component_count),
        }
    }
}

fn labels(count: usize) -> Vec<ComponentLabel> {
    (0..count.min(MAX_COMPONENTS))
        .filter_map(ComponentLabel::from_index)
        .collect()
}

fn participants(label: ComponentLabel, rotating: Option<ComponentLabel>) -> Vec<Participant> {
    if rotating == Some(label) {
        Orientation::BOTH
            .iter()
            .map(|&o| Participant::oriented(label, o))
            .collect()
    } else {
        vec![Participant::plain(label)]
    }
}

/// Enumerates every unordered pair of interaction participants.
///
/// For `i` in `0..count` and `j` in `0..=i` the pair `(j, i)` is emitted; a
/// side that is the rotating component expands into both orientations. The
/// self pair of the rotating component yields `X1|X1`, `X1|X2`, `X2|X2`.
///
/// A rotating label outside `0..count` is ignored. Counts past the last
/// letter are clamped to [`MAX_COMPONENTS`].
pub fn generate_pair_matrix(component_count: usize, rotating: Option<ComponentLabel>) -> Vec<PairKey> {
    let labels = labels(component_count);
    let rotating = rotating.filter(|r| r.index() < labels.len());
    let mut pairs = Vec::new();

    for (i, &outer) in labels.iter().enumerate() {
        let right = participants(outer, rotating);
        for &inner in &labels[..=i] {
            let left = participants(inner, rotating);
            if inner == outer {
                // Unordered self pair: only a <= b among the variants
                for (a, pa) in left.iter().enumerate() {
                    for pb in &right[a..] {
                        pairs.push(PairKey::new(*pa, *pb));
                    }
                }
            } else {
                for pa in &left {
                    for pb in &right {
                        pairs.push(PairKey::new(*pa, *pb));
                    }
                }
            }
        }
    }

    pairs
}

/// Convenience wrapper taking the rotation selector as it appears on the wire.
pub fn generate_pair_matrix_for(component_count: usize, rotating_letter: &str) -> Vec<PairKey> {
    generate_pair_matrix(
        component_count,
        crate::labels::resolve_rotating(rotating_letter, component_count),
    )
}

/// Ordered-pair enumeration used before rotation support.
pub fn generate_legacy_pair_matrix(component_count: usize) -> Vec<PairKey> {
    let labels = labels(component_count);
    let Some(&last) = labels.last() else {
        return Vec::new();
    };

    let mut with_last = Vec::new();
    let mut without_last = Vec::new();
    for &i in &labels {
        for &j in &labels {
            let key = PairKey::new(Participant::plain(i), Participant::plain(j));
            if key.touches(last) {
                with_last.push(key);
            } else {
                without_last.push(key);
            }
        }
    }

    without_last.extend(with_last);
    without_last
}

/// One interaction parameter entry as exchanged on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEntry {
    /// Pair key rendered as `"A|B"`, `"A1|B"`, ...
    pub relation: String,
    pub value: f64,
}

/// The full set of interaction parameters for one configuration, kept in
/// generator order with exactly one entry per generated pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMatrix {
    entries: Vec<(PairKey, f64)>,
}

impl InteractionMatrix {
    /// Builds a matrix with every pair set to `default`.
    pub fn new(component_count: usize, rotating: Option<ComponentLabel>, default: f64) -> Self {
        Self {
            entries: generate_pair_matrix(component_count, rotating)
                .into_iter()
                .map(|key| (key, default))
                .collect(),
        }
    }

    /// Reads wire entries. Entries with unparseable relations are dropped.
    pub fn from_entries(entries: &[InteractionEntry]) -> Self {
        Self {
            entries: entries
                .iter()
                .filter_map(|e| e.relation.parse().ok().map(|key| (key, e.value)))
                .collect(),
        }
    }

    pub fn to_entries(&self) -> Vec<InteractionEntry> {
        self.entries
            .iter()
            .map(|(key, value)| InteractionEntry { relation: key.to_string(), value: *value })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PairKey> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Looks up a value regardless of which side the pair was written from.
    pub fn get(&self, key: &PairKey) -> Option<f64> {
        let wanted = key.canonical();
        self.entries
            .iter()
            .find(|(k, _)| k.canonical() == wanted)
            .map(|(_, v)| *v)
    }

    pub fn set(&mut self, key: &PairKey, value: f64) -> bool {
        let wanted = key.canonical();
        match self.entries.iter_mut().find(|(k, _)| k.canonical() == wanted) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// Regenerates the entry set for a new component count or rotation.
    ///
    /// Surviving pairs keep their value, stale pairs are dropped and new
    /// pairs get `default`. The result is in generator order.
    pub fn regenerate(&mut self, component_count: usize, rotating: Option<ComponentLabel>, default: f64) {
        let previous: HashMap<_, _> = self
            .entries
            .iter()
            .map(|(key, value)| (key.canonical(), *value))
            .collect();

        self.entries = generate_pair_matrix(component_count, rotating)
            .into_iter()
            .map(|key| {
                let value = previous.get(&key.canonical()).copied().unwrap_or(default);
                (key, value)
            })
            .collect();
    }

    /// Removes every entry referencing `removed` and shifts the letters of the
    /// components after it down by one.
    pub fn remove_component(&mut self, removed: ComponentLabel) {
        let shift = |p: Participant| -> Participant {
            if p.component > removed {
                let component = ComponentLabel::from_index(p.component.index() - 1).unwrap_or(p.component);
                Participant { component, orientation: p.orientation }
            } else {
                p
            }
        };

        self.entries.retain(|(key, _)| !key.touches(removed));
        for (key, _) in &mut self.entries {
            *key = PairKey::new(shift(key.first), shift(key.second));
        }
    }
}
