//! Per-iteration cell counts, the basis of the tabular results export.

use crate::cell_codec::{decode_cell, CellState};
use crate::config::Ingredient;
use crate::iteration::IterationPage;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Cell counts of one snapshot, grouped by decoded state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Census {
    pub empty: u64,

    /// One count per component, in inventory order
    pub components: Vec<u64>,

    pub directional: u64,
    pub intermediate: u64,
    pub unknown: u64,
}

impl Census {
    /// Counts the cells of one snapshot.
    pub fn of(snapshot: &[Vec<i64>], components: &[Ingredient]) -> Self {
        let mut census = Census {
            components: vec![0; components.len()],
            ..Default::default()
        };

        for &value in snapshot.iter().flatten() {
            match decode_cell(value, components) {
                CellState::Empty => census.empty += 1,
                CellState::Component { component_index } => match census.components.get_mut(component_index) {
                    Some(count) => *count += 1,
                    // Component value with no inventory entry
                    None => census.unknown += 1,
                },
                CellState::Directional { .. } => census.directional += 1,
                CellState::Intermediate => census.intermediate += 1,
                CellState::Unknown => census.unknown += 1,
            }
        }

        census
    }

    /// Total number of cells counted.
    pub fn total(&self) -> u64 {
        self.empty + self.components.iter().sum::<u64>() + self.directional + self.intermediate + self.unknown
    }

    /// Share of occupied cells held by each component, in percent.
    ///
    /// Directional cells count towards `rotating` when given, since they are
    /// the rotating component in one of its orientation states.
    pub fn molar_fractions(&self, rotating: Option<usize>) -> Vec<f64> {
        let mut counts = self.components.clone();
        if let Some(slot) = rotating.and_then(|r| counts.get_mut(r)) {
            *slot += self.directional;
        }
        let occupied: u64 = counts.iter().sum();
        counts
            .iter()
            .map(|&c| if occupied == 0 { 0.0 } else { c as f64 * 100.0 / occupied as f64 })
            .collect()
    }
}

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CensusRow {
    pub iteration: u64,
    pub census: Census,
}

/// Census of every snapshot on a page, tagged with global iteration numbers.
pub fn census_rows(page: &IterationPage, components: &[Ingredient]) -> Vec<CensusRow> {
    page.iter()
        .map(|(iteration, snapshot)| CensusRow {
            iteration,
            census: Census::of(snapshot, components),
        })
        .collect()
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Renders census rows as CSV, one column per component named after it.
pub fn to_csv(rows: &[CensusRow], components: &[Ingredient]) -> String {
    let mut header = vec!["iteration".to_string(), "empty".to_string()];
    header.extend(components.iter().map(|c| csv_field(&c.name)));
    header.extend(["directional", "intermediate", "unknown"].map(String::from));

    let mut out = String::new();
    let _ = writeln!(out, "{}", header.join(","));
    for row in rows {
        let census = &row.census;
        let mut fields = vec![row.iteration, census.empty];
        fields.extend(&census.components);
        fields.extend([census.directional, census.intermediate, census.unknown]);
        let fields: Vec<String> = fields.iter().map(u64::to_string).collect();
        let _ = writeln!(out, "{}", fields.join(","));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration::PageIndex;
    use approx::assert_relative_eq;

    fn inventory() -> Vec<Ingredient> {
        vec![
            Ingredient::new("A", "red", 50.0),
            Ingredient::new("B", "blue", 50.0),
        ]
    }

    #[test]
    fn test_counts_every_state() {
        let snapshot = vec![vec![0, 1, 2, 2], vec![13, 250, 7, 0]];
        let census = Census::of(&snapshot, &inventory());
        assert_eq!(census.empty, 2);
        assert_eq!(census.components, vec![1, 2]);
        assert_eq!(census.directional, 1);
        assert_eq!(census.intermediate, 1);
        // 7 names a component the inventory has no column for
        assert_eq!(census.unknown, 1);
        assert_eq!(census.total(), 8);
    }

    #[test]
    fn test_molar_fractions() {
        let snapshot = vec![vec![1, 2, 2, 14]];
        let census = Census::of(&snapshot, &inventory());
        let without = census.molar_fractions(None);
        assert_relative_eq!(without[0], 100.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(without[1], 200.0 / 3.0, epsilon = 1e-9);

        let with = census.molar_fractions(Some(0));
        assert_relative_eq!(with[0], 50.0);
        assert_relative_eq!(with[1], 50.0);

        assert_eq!(Census::of(&[vec![0]], &inventory()).molar_fractions(None), vec![0.0, 0.0]);
    }

    #[test]
    fn test_rows_carry_global_iterations() {
        let page = IterationPage::from_snapshots(PageIndex(3), vec![vec![vec![1]], vec![vec![2]]]).unwrap();
        let rows = census_rows(&page, &inventory());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].iteration, 3000);
        assert_eq!(rows[1].iteration, 3001);
        assert_eq!(rows[1].census.components, vec![0, 1]);
    }

    #[test]
    fn test_csv_export() {
        let page = IterationPage::from_snapshots(PageIndex(0), vec![vec![vec![1, 0, 13]]]).unwrap();
        let mut components = inventory();
        components[1].name = "salt, coarse".to_string();

        let csv = to_csv(&census_rows(&page, &components), &components);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "iteration,empty,A,\"salt, coarse\",directional,intermediate,unknown");
        assert_eq!(lines[1], "0,1,1,0,1,0,0");
    }
}
