//! Deterministic preview of the initial grid.
//!
//! Lays the configured components out the way the engine seeds iteration 0:
//! a fixed share of cells stays empty, the rest is apportioned by molar
//! fraction and scattered at random. The rotating component starts in a
//! random orientation. All randomness comes from one seeded ChaCha8 stream,
//! so the same seed always gives the same grid.

use crate::apportion::calculate_fractions;
use crate::cell_codec::{encode_cell, CellState, Direction};
use crate::config::SimulationConfig;
use crate::error::ConfigError;
use crate::iteration::Snapshot;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

/// Fraction of cells left empty in the initial grid.
pub const EMPTY_FRACTION: f64 = 0.31;

/// Number of cells the engine leaves empty for a grid of `total` cells.
pub fn empty_cells(total: u64) -> u64 {
    (EMPTY_FRACTION * total as f64).floor() as u64
}

/// Builds the iteration-0 grid for `config`.
///
/// Fails when a component with non-zero share cannot be packed into a cell
/// value.
pub fn preview_initial_grid(config: &SimulationConfig, seed: u64) -> Result<Snapshot, ConfigError> {
    let rows = config.grid_height as usize;
    let cols = config.grid_length as usize;
    let total = config.total_cells();
    let occupied = total - empty_cells(total);
    let counts = calculate_fractions(occupied, &config.molar_fractions());
    let rotating = config.rotating_component().map(|r| r.index());

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut positions: Vec<usize> = (0..rows * cols).collect();
    positions.shuffle(&mut rng);

    let mut grid = vec![vec![0i64; cols]; rows];
    let mut free = positions.into_iter();

    for (component_index, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let plain = encode_cell(&CellState::Component { component_index })
            .ok_or(ConfigError::NotEncodable(component_index))?;

        for position in free.by_ref().take(count as usize) {
            let value = if rotating == Some(component_index) {
                let direction = Direction::ALL[rng.gen_range(0..Direction::ALL.len())];
                encode_cell(&CellState::Directional { direction }).unwrap_or(plain)
            } else {
                plain
            };
            grid[position / cols][position % cols] = value;
        }
    }

    debug!(
        "Preview grid {}x{}: {} occupied of {} cells, counts {:?}",
        rows, cols, occupied, total, counts
    );
    Ok(grid)
}
