//! Engine client abstraction for the GridLab console.

use crate::error::EnvError;
use crate::types::{RunEvent, SimulationId};
use async_trait::async_trait;
use gridlab_core::{PageIndex, SimulationConfig};
use tokio::sync::mpsc;

/// Abstraction over the external simulation engine.
///
/// # Implementations
///
/// - **MemoryEngine**: in-process store, used by tests and demos
/// - **DirectoryEngine** (console): reads a simulation directory on disk
///
/// # Request Flow
///
/// ```text
/// Console                    Engine
///   |-- fetch_config(id) ------>|
///   |-- run(id) --------------->|
///   |<------- Progress(..) -----|
///   |<------- Completed --------|
///   |-- fetch_page(id, 0) ----->|-- base64 page or None
///   |-- fetch_results(id) ----->|-- CSV
/// ```
#[async_trait]
pub trait EngineClient: Send + Sync + 'static {
    /// Fetches the stored configuration of a simulation.
    ///
    /// # Returns
    /// * `Ok(config)` - The configuration as last saved
    /// * `Err(EnvError::NotFound)` - No simulation with this id
    async fn fetch_config(&self, id: SimulationId) -> Result<SimulationConfig, EnvError>;

    /// Fetches one compressed page of iteration history.
    ///
    /// `page` is zero-based. A page past the end of the history is not an
    /// error: it comes back as `Ok(None)`, which decodes to no snapshots.
    async fn fetch_page(&self, id: SimulationId, page: PageIndex) -> Result<Option<String>, EnvError>;

    /// Starts a run and streams its progress.
    ///
    /// The receiver yields [`RunEvent::Progress`] fractions and
    /// [`RunEvent::Status`] lines followed by a single [`RunEvent::Completed`],
    /// then closes. A receiver that closes without
    /// `Completed` means the run was aborted.
    async fn run(&self, id: SimulationId) -> Result<mpsc::Receiver<RunEvent>, EnvError>;

    /// Fetches the tabular results of the last completed run, as CSV.
    async fn fetch_results(&self, id: SimulationId) -> Result<String, EnvError>;
}

/// Drains a run stream, returning every event before completion.
///
/// Fails with [`EnvError::Engine`] when the stream closes before reporting
/// completion.
pub async fn run_to_completion<E: EngineClient + ?Sized>(
    engine: &E,
    id: SimulationId,
) -> Result<Vec<RunEvent>, EnvError> {
    let mut events = engine.run(id).await?;
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        if event.is_terminal() {
            return Ok(seen);
        }
        seen.push(event);
    }
    Err(EnvError::engine(format!("run of {} ended without completing", id)))
}
