//! GridLab Console Harness
//!
//! This crate is the console side of GridLab: it pulls configurations and
//! iteration pages from an engine, decodes them off the async executor, and
//! presents them in a terminal or as export files.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     gridlab-console                      │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  │
//! │  │  PageLoader  │──►│   renderer   │   │   exporter   │  │
//! │  │ (memo + LWW) │   │ (glyph/ANSI) │   │  (JSON/CSV)  │  │
//! │  └──────┬───────┘   └──────────────┘   └──────────────┘  │
//! │         │ EngineClient                                   │
//! │  ┌──────▼──────────┐          ┌─────────────────┐        │
//! │  │ DirectoryEngine │          │  MemoryEngine   │        │
//! │  │ (files on disk) │          │ (in-process run)│        │
//! │  └─────────────────┘          └─────────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gridlab_console::{DirectoryEngine, PageLoader};
//! use gridlab_core::PageNumber;
//!
//! let loader = PageLoader::new(Arc::new(DirectoryEngine::new("simulations")));
//! let outcome = loader.load(id, PageNumber::new(1).unwrap()).await?;
//! ```

pub mod config;
pub mod directory;
pub mod error;
pub mod exporter;
pub mod loader;
pub mod render;

pub use config::ConsoleConfig;
pub use directory::DirectoryEngine;
pub use error::ConsoleError;
pub use exporter::{write_census_csv, FrameExport, PageExport};
pub use loader::{LoadOutcome, PageLoader};
pub use render::{render_legend, render_snapshot, RenderMode};
