//! Engine backed by a directory of exported simulations.
//!
//! Layout, one sub-directory per simulation id:
//!
//! ```text
//! <root>/<id>/config.json
//! <root>/<id>/pages/<index>.b64
//! <root>/<id>/results.csv
//! ```

use async_trait::async_trait;
use gridlab_core::{PageIndex, SimulationConfig};
use gridlab_env::{EngineClient, EnvError, RunEvent, SimulationId};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::debug;

const CONFIG_FILE: &str = "config.json";
const PAGES_DIR: &str = "pages";
const RESULTS_FILE: &str = "results.csv";

/// Read-mostly engine over a simulation directory tree.
#[derive(Debug, Clone)]
pub struct DirectoryEngine {
    root: PathBuf,
}

impl DirectoryEngine {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn simulation_dir(&self, id: SimulationId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn page_path(&self, id: SimulationId, page: PageIndex) -> PathBuf {
        self.simulation_dir(id).join(PAGES_DIR).join(format!("{}.b64", page))
    }

    /// Ids of every simulation directory under the root, sorted.
    pub async fn list(&self) -> Result<Vec<SimulationId>, EnvError> {
        let mut ids = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(|name| name.parse().ok()) {
                ids.push(id);
            }
        }
        ids.sort_by_key(|id: &SimulationId| id.as_uuid());
        Ok(ids)
    }

    /// Writes a whole simulation: configuration, pages and optional results.
    pub async fn write_simulation(
        &self,
        id: SimulationId,
        config: &SimulationConfig,
        pages: &[String],
        results: Option<&str>,
    ) -> Result<PathBuf, EnvError> {
        let dir = self.simulation_dir(id);
        fs::create_dir_all(dir.join(PAGES_DIR)).await?;
        fs::write(dir.join(CONFIG_FILE), config.to_json_pretty()?).await?;
        for (index, blob) in pages.iter().enumerate() {
            fs::write(self.page_path(id, PageIndex(index as u64)), blob).await?;
        }
        if let Some(results) = results {
            fs::write(dir.join(RESULTS_FILE), results).await?;
        }
        debug!("Wrote simulation {} with {} pages to {}", id, pages.len(), dir.display());
        Ok(dir)
    }
}

/// Reads a file, mapping a missing file to `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, EnvError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl EngineClient for DirectoryEngine {
    async fn fetch_config(&self, id: SimulationId) -> Result<SimulationConfig, EnvError> {
        let text = read_optional(&self.simulation_dir(id).join(CONFIG_FILE))
            .await?
            .ok_or_else(|| EnvError::not_found(id))?;
        Ok(SimulationConfig::from_json(&text)?)
    }

    async fn fetch_page(&self, id: SimulationId, page: PageIndex) -> Result<Option<String>, EnvError> {
        if !fs::try_exists(self.simulation_dir(id)).await? {
            return Err(EnvError::not_found(id));
        }
        let blob = read_optional(&self.page_path(id, page)).await?;
        Ok(blob.map(|b| b.trim().to_string()))
    }

    async fn run(&self, id: SimulationId) -> Result<mpsc::Receiver<RunEvent>, EnvError> {
        Err(EnvError::engine(format!(
            "simulation {} is stored on disk and cannot be run from here",
            id
        )))
    }

    async fn fetch_results(&self, id: SimulationId) -> Result<String, EnvError> {
        if let Some(csv) = read_optional(&self.simulation_dir(id).join(RESULTS_FILE)).await? {
            return Ok(csv);
        }
        let config = self.fetch_config(id).await?;
        Err(EnvError::not_found(format!(
            "Run the simulation {} to generate results",
            config.name
        )))
    }
}
