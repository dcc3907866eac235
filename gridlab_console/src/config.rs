//! Console settings.

use std::path::PathBuf;

/// Settings shared by every console command.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// Root directory holding one sub-directory per simulation
    pub data_dir: PathBuf,

    /// Seed for previews and in-process runs
    pub seed: u64,

    /// Paint cells with 24-bit ANSI colours instead of plain glyphs
    pub color: bool,

    /// Value given to newly created interaction entries
    pub default_interaction: f64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("simulations"),
            seed: 42,
            color: false,
            default_interaction: 0.0,
        }
    }
}
