//! JSON and CSV exporters for decoded pages.
//!
//! Exports one page of iteration history as JSON for external viewers, and
//! census tables as CSV.

use gridlab_core::cell_codec::CellStyle;
use gridlab_core::census::{census_rows, to_csv, Census};
use gridlab_core::{CellState, ComponentLabel, IterationPage, SimulationConfig, Snapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// One component of the legend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub letter: String,
    pub name: String,
    /// Resolved fill colour, `#rrggbb`
    pub color: String,
    pub molar_fraction: f64,
}

/// A single exported iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameExport {
    /// Global iteration number
    pub iteration: u64,

    /// Packed cell values, as received from the engine
    pub grid: Snapshot,

    pub census: Census,
}

/// Complete page export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageExport {
    /// Simulation name
    pub simulation: String,

    /// 1-based page number as shown to the user
    pub page: u64,

    pub grid_height: u32,
    pub grid_length: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotating: Option<String>,

    pub components: Vec<ComponentEntry>,

    /// All frames
    pub frames: Vec<FrameExport>,
}

impl PageExport {
    /// Builds the export of one decoded page.
    pub fn new(config: &SimulationConfig, page: &IterationPage) -> Self {
        let components = config
            .ingredients
            .iter()
            .enumerate()
            .map(|(index, ingredient)| ComponentEntry {
                letter: ComponentLabel::from_index(index)
                    .map(|l| l.to_string())
                    .unwrap_or_default(),
                name: ingredient.name.clone(),
                color: CellStyle::for_state(&CellState::Component { component_index: index }, &config.ingredients)
                    .fill
                    .to_string(),
                molar_fraction: ingredient.molar_fraction,
            })
            .collect();

        let frames = page
            .iter()
            .map(|(iteration, grid)| FrameExport {
                iteration,
                grid: grid.clone(),
                census: Census::of(grid, &config.ingredients),
            })
            .collect();

        Self {
            simulation: config.name.clone(),
            page: page.index.to_display().get(),
            grid_height: config.grid_height,
            grid_length: config.grid_length,
            rotating: config.rotating_component().map(|l| l.to_string()),
            components,
            frames,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

/// Writes the census of every snapshot on `page` as CSV.
pub fn write_census_csv(path: impl AsRef<Path>, config: &SimulationConfig, page: &IterationPage) -> std::io::Result<usize> {
    let rows = census_rows(page, &config.ingredients);
    let mut file = File::create(path)?;
    file.write_all(to_csv(&rows, &config.ingredients).as_bytes())?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlab_core::{Ingredient, PageIndex};

    fn fixture() -> (SimulationConfig, IterationPage) {
        let mut config = SimulationConfig {
            name: "export".to_string(),
            ingredients: vec![
                Ingredient::new("A", "red", 50.0),
                Ingredient::new("B", "nope", 50.0),
            ],
            grid_height: 1,
            grid_length: 3,
            ..Default::default()
        };
        config.set_rotating_component(ComponentLabel::from_index(1), 0.0);
        let page = IterationPage::from_snapshots(PageIndex(1), vec![vec![vec![1, 14, 0]], vec![vec![0, 0, 1]]]).unwrap();
        (config, page)
    }

    #[test]
    fn test_page_export() {
        let (config, page) = fixture();
        let export = PageExport::new(&config, &page);

        assert_eq!(export.page, 2);
        assert_eq!(export.rotating.as_deref(), Some("B"));
        assert_eq!(export.components[0].color, "#ef4444");
        assert_eq!(export.components[1].color, "#6b7280");
        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.frames[0].iteration, 1000);
        assert_eq!(export.frames[0].census.directional, 1);
        assert_eq!(export.frames[1].census.empty, 2);
    }

    #[test]
    fn test_write_files() {
        let (config, page) = fixture();
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("page.json");
        PageExport::new(&config, &page).write_to_file(&json_path).unwrap();
        let parsed: PageExport = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(parsed.frames[1].grid, vec![vec![0, 0, 1]]);

        let csv_path = dir.path().join("census.csv");
        assert_eq!(write_census_csv(&csv_path, &config, &page).unwrap(), 2);
        let csv = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(csv.lines().nth(1), Some("1000,1,1,0,1,0,0"));
    }
}
