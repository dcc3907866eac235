//! GridLab Environment Abstraction Layer
//!
//! This crate models the external simulation engine behind one async seam,
//! so the console can be driven by a real engine, a directory of exported
//! pages, or an in-process store.
//!
//! # Core Concept
//!
//! The engine owns simulations keyed by [`SimulationId`]. The console only
//! ever asks four things of it:
//! - the stored configuration
//! - one compressed page of iteration history (zero-based [`PageIndex`])
//! - a run, streamed as [`RunEvent`]s
//! - the tabular results of the last run
//!
//! # Example
//!
//! ```ignore
//! use gridlab_env::{EngineClient, MemoryEngine};
//!
//! let engine = MemoryEngine::new();
//! let id = engine.insert(config).await;
//! let mut events = engine.run(id).await?;
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! ```
//!
//! [`PageIndex`]: gridlab_core::PageIndex

mod engine;
mod error;
mod memory;
mod types;

pub use engine::{run_to_completion, EngineClient};
pub use error::EnvError;
pub use memory::MemoryEngine;
pub use types::{PageKey, RunEvent, SimulationId};
