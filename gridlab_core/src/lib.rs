//! GridLab Core - Configuration and Visualization Transforms
//!
//! Pure, synchronous functions sitting between the simulation configuration
//! form and the engine's wire format:
//! 1. **Pair matrix**: every unordered pair of interaction participants,
//!    with orientation variants for the rotating component
//! 2. **Apportionment**: molar fractions to exact per-component cell counts
//! 3. **Cell codec**: the packed integer cell state and its rendering style
//! 4. **Iteration pages**: base64 + deflate + JSON pages of grid snapshots
//!
//! Nothing here holds shared mutable state; every function is safe to call
//! from any number of threads.

pub mod apportion;
pub mod cell_codec;
pub mod census;
pub mod config;
pub mod error;
pub mod iteration;
pub mod labels;
pub mod pair_matrix;
pub mod preview;

// Re-export key types for convenience
pub use apportion::calculate_fractions;
pub use cell_codec::{decode_cell, encode_cell, CellState, CellStyle, Direction, Rgb};
pub use census::{census_rows, to_csv, Census, CensusRow};
pub use config::{ConfigIssue, Ingredient, Parameters, Reaction, Rotation, SimulationConfig};
pub use error::{ConfigError, DecodeError};
pub use iteration::{
    decode_iteration_page, encode_iteration_page, Framing, IterationPage, PageIndex, PageNumber,
    Snapshot, PAGE_SIZE,
};
pub use labels::{ComponentLabel, Participant};
pub use pair_matrix::{generate_pair_matrix, InteractionMatrix, PairKey, PairStrategy};
pub use preview::preview_initial_grid;
