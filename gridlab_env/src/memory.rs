//! In-memory engine used by tests and demos.

use crate::engine::EngineClient;
use crate::error::EnvError;
use crate::types::{RunEvent, SimulationId};
use async_trait::async_trait;
use gridlab_core::census::{to_csv, Census, CensusRow};
use gridlab_core::{encode_iteration_page, preview_initial_grid, Framing, PageIndex, SimulationConfig, Snapshot, PAGE_SIZE};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Buffered run events per stream.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone)]
struct StoredSimulation {
    config: SimulationConfig,
    pages: Vec<String>,
    results: Option<String>,
}

/// Engine that keeps every simulation in process memory.
///
/// A run does not model any physics: iteration `n` is the initial-grid
/// preview seeded with `seed + n`, so pages differ but stay reproducible.
#[derive(Debug, Clone, Default)]
pub struct MemoryEngine {
    simulations: Arc<RwLock<HashMap<SimulationId, StoredSimulation>>>,
    seed: u64,
}

impl MemoryEngine {
    /// Creates an empty engine with seed 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty engine whose runs derive from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Stores a configuration under a fresh id.
    pub async fn insert(&self, config: SimulationConfig) -> SimulationId {
        let id = SimulationId::new();
        self.simulations.write().await.insert(
            id,
            StoredSimulation {
                config,
                pages: Vec::new(),
                results: None,
            },
        );
        id
    }

    /// Replaces the stored iteration history, paging and compressing it the
    /// way the engine does.
    pub async fn store_snapshots(&self, id: SimulationId, snapshots: &[Snapshot]) -> Result<usize, EnvError> {
        let pages = encode_pages(snapshots)?;
        let count = pages.len();
        let mut simulations = self.simulations.write().await;
        let stored = simulations.get_mut(&id).ok_or_else(|| EnvError::not_found(id))?;
        stored.pages = pages;
        Ok(count)
    }

    /// Number of pages currently stored for `id`.
    pub async fn page_count(&self, id: SimulationId) -> Option<usize> {
        self.simulations.read().await.get(&id).map(|s| s.pages.len())
    }
}

fn encode_pages(snapshots: &[Snapshot]) -> Result<Vec<String>, EnvError> {
    snapshots
        .chunks(PAGE_SIZE as usize)
        .map(|chunk| encode_iteration_page(chunk, Framing::Gzip).map_err(EnvError::from))
        .collect()
}

fn results_csv(config: &SimulationConfig, snapshots: &[Snapshot]) -> String {
    let rows: Vec<CensusRow> = snapshots
        .iter()
        .enumerate()
        .map(|(iteration, snapshot)| CensusRow {
            iteration: iteration as u64,
            census: Census::of(snapshot, &config.ingredients),
        })
        .collect();
    to_csv(&rows, &config.ingredients)
}

#[async_trait]
impl EngineClient for MemoryEngine {
    async fn fetch_config(&self, id: SimulationId) -> Result<SimulationConfig, EnvError> {
        self.simulations
            .read()
            .await
            .get(&id)
            .map(|s| s.config.clone())
            .ok_or_else(|| EnvError::not_found(id))
    }

    async fn fetch_page(&self, id: SimulationId, page: PageIndex) -> Result<Option<String>, EnvError> {
        let simulations = self.simulations.read().await;
        let stored = simulations.get(&id).ok_or_else(|| EnvError::not_found(id))?;
        Ok(usize::try_from(page.0).ok().and_then(|i| stored.pages.get(i)).cloned())
    }

    async fn run(&self, id: SimulationId) -> Result<mpsc::Receiver<RunEvent>, EnvError> {
        let config = self.fetch_config(id).await?;
        let iterations = config.iterations_number.max(1);

        // Build the whole history up front so config errors surface here
        let snapshots = (0..iterations)
            .map(|n| preview_initial_grid(&config, self.seed.wrapping_add(n)))
            .collect::<Result<Vec<_>, _>>()?;
        let pages = encode_pages(&snapshots)?;
        let results = results_csv(&config, &snapshots);
        let page_total = pages.len();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let simulations = Arc::clone(&self.simulations);
        tokio::spawn(async move {
            for page in 0..page_total {
                let done = ((page as u64 + 1) * PAGE_SIZE).min(iterations);
                let fraction = done as f64 / iterations as f64;
                if tx.send(RunEvent::Progress(fraction)).await.is_err() {
                    // Listener dropped; abandon the run
                    return;
                }
            }

            let status = RunEvent::Status("Calculations completed, processing results...".to_string());
            if tx.send(status).await.is_err() {
                return;
            }
            if let Some(stored) = simulations.write().await.get_mut(&id) {
                stored.pages = pages;
                stored.results = Some(results);
            }
            let _ = tx.send(RunEvent::Completed).await;
        });

        Ok(rx)
    }

    async fn fetch_results(&self, id: SimulationId) -> Result<String, EnvError> {
        let simulations = self.simulations.read().await;
        let stored = simulations.get(&id).ok_or_else(|| EnvError::not_found(id))?;
        stored.results.clone().ok_or_else(|| {
            EnvError::not_found(format!("Run the simulation {} to generate results", stored.config.name))
        })
    }
}
