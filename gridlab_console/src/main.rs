//! GridLab Console CLI
//!
//! Inspect simulation configurations and iteration history from a terminal.

use clap::{Parser, Subcommand};
use gridlab_console::{
    render_legend, render_snapshot, write_census_csv, ConsoleConfig, ConsoleError, DirectoryEngine, LoadOutcome,
    PageExport, PageLoader, RenderMode,
};
use gridlab_core::cell_codec::CellStyle;
use gridlab_core::labels::resolve_rotating;
use gridlab_core::{
    calculate_fractions, decode_cell, preview_initial_grid, IterationPage, PageIndex, PageNumber, PairStrategy,
    SimulationConfig,
};
use gridlab_env::{run_to_completion, EngineClient, MemoryEngine, RunEvent, SimulationId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// GridLab simulation console
#[derive(Parser, Debug)]
#[command(name = "gridlab-console")]
#[command(about = "Inspect GridLab simulation configurations and iteration history", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding one sub-directory per simulation
    #[arg(long, default_value = "simulations", global = true)]
    data_dir: PathBuf,

    /// Seed for previews and in-process runs
    #[arg(short, long, default_value = "42", global = true)]
    seed: u64,

    /// Paint cells with ANSI colours
    #[arg(long, global = true)]
    color: bool,

    /// Value for newly created interaction entries
    #[arg(long, default_value = "0", global = true)]
    default_interaction: f64,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the interaction pair keys for a component count
    Pairs {
        /// Number of components
        components: usize,

        /// Letter of the rotating component
        #[arg(short, long)]
        rotating: Option<String>,

        /// Use the legacy ordered enumeration
        #[arg(long)]
        legacy: bool,
    },

    /// Apportion a cell total by molar fractions
    Fractions {
        /// Number of cells to distribute
        total: u64,

        /// Percentages, one per component
        #[arg(required = true)]
        percentages: Vec<f64>,
    },

    /// Decode packed cell values
    DecodeCell {
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<i64>,

        /// Configuration supplying the component inventory
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check a configuration file
    Validate { config: PathBuf },

    /// Regenerate the interaction parameters of a configuration
    Sync {
        config: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Render the initial grid a configuration would start from
    Preview { config: PathBuf },

    /// Run a configuration in-process and store its history in the data dir
    Simulate { config: PathBuf },

    /// List stored simulations
    List,

    /// Render one iteration of a stored simulation
    Show {
        id: SimulationId,

        /// 1-based page number
        #[arg(short, long, default_value = "1")]
        page: u64,

        /// Global iteration number; overrides --page
        #[arg(short, long)]
        iteration: Option<u64>,
    },

    /// Export one page as JSON, optionally with a census CSV
    Export {
        id: SimulationId,

        #[arg(short, long, default_value = "1")]
        page: u64,

        #[arg(short, long)]
        out: PathBuf,

        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Print the results table of a stored simulation
    Results { id: SimulationId },

    /// Summarise a captured engine run stream (server-sent event lines)
    Events { file: PathBuf },
}

impl Args {
    fn console_config(&self) -> ConsoleConfig {
        ConsoleConfig {
            data_dir: self.data_dir.clone(),
            seed: self.seed,
            color: self.color,
            default_interaction: self.default_interaction,
        }
    }
}

fn render_mode(config: &ConsoleConfig) -> RenderMode {
    if config.color {
        RenderMode::Ansi
    } else {
        RenderMode::Plain
    }
}

fn page_number(page: u64) -> Result<PageNumber, ConsoleError> {
    PageNumber::new(page).ok_or_else(|| ConsoleError::invalid("pages are numbered from 1"))
}

async fn read_config(path: &Path) -> Result<SimulationConfig, ConsoleError> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(SimulationConfig::from_json(&text)?)
}

/// Loads one page, treating a superseded load as an error since the CLI
/// never issues overlapping requests.
async fn load_page(
    loader: &PageLoader<DirectoryEngine>,
    id: SimulationId,
    number: PageNumber,
) -> Result<Arc<IterationPage>, ConsoleError> {
    match loader.load(id, number).await? {
        LoadOutcome::Loaded(page) => Ok(page),
        LoadOutcome::Superseded => Err(ConsoleError::invalid(format!("load of page {} was superseded", number))),
    }
}

async fn execute(command: Command, console: &ConsoleConfig) -> Result<(), ConsoleError> {
    match command {
        Command::Pairs {
            components,
            rotating,
            legacy,
        } => {
            let rotating = match rotating.as_deref() {
                Some(letter) => Some(resolve_rotating(letter, components).ok_or_else(|| {
                    ConsoleError::invalid(format!("{} is not one of the {} components", letter, components))
                })?),
                None => None,
            };
            let strategy = if legacy {
                PairStrategy::LegacyOrdered
            } else {
                PairStrategy::Triangular
            };
            let keys = strategy.generate(components, rotating);
            for key in &keys {
                println!("{}", key);
            }
            info!("{} pairs", keys.len());
        }

        Command::Fractions { total, percentages } => {
            let counts = calculate_fractions(total, &percentages);
            for (pct, count) in percentages.iter().zip(&counts) {
                println!("{:>8.3}% -> {}", pct, count);
            }
            info!("{} cells apportioned", counts.iter().sum::<u64>());
        }

        Command::DecodeCell { values, config } => {
            let ingredients = match config {
                Some(path) => read_config(&path).await?.ingredients,
                None => Vec::new(),
            };
            for value in values {
                let state = decode_cell(value, &ingredients);
                let style = CellStyle::for_state(&state, &ingredients);
                println!("{}", serde_json::json!({
                    "value": value,
                    "state": state,
                    "fill": style.fill.to_string(),
                    "arrowDegrees": style.arrow.map(|a| a.degrees),
                }));
            }
        }

        Command::Validate { config } => {
            let config = read_config(&config).await?;
            let issues = config.validate();
            if issues.is_empty() {
                info!("✓ {} is valid", config.name);
            } else {
                for issue in &issues {
                    warn!("  - {}", issue);
                }
                return Err(ConsoleError::invalid(format!("{} issue(s) in {}", issues.len(), config.name)));
            }
        }

        Command::Sync { config: path, out } => {
            let mut config = read_config(&path).await?;
            config.sync_interactions(console.default_interaction);
            let json = config.to_json_pretty()?;
            match out {
                Some(out) => {
                    tokio::fs::write(&out, json).await?;
                    info!("Wrote {} interaction entries to {}", config.parameters.j.len(), out.display());
                }
                None => println!("{}", json),
            }
        }

        Command::Preview { config } => {
            let config = read_config(&config).await?;
            let grid = preview_initial_grid(&config, console.seed)?;
            print!("{}", render_snapshot(&grid, &config.ingredients, render_mode(console)));
            print!("{}", render_legend(&config));
        }

        Command::Simulate { config } => {
            let config = read_config(&config).await?;
            let engine = MemoryEngine::with_seed(console.seed);
            let id = engine.insert(config.clone()).await;

            info!("Running {} ({})", config.name, id);
            for event in run_to_completion(&engine, id).await? {
                debug!("  {}", event);
            }

            let mut pages = Vec::new();
            while let Some(blob) = engine.fetch_page(id, PageIndex(pages.len() as u64)).await? {
                pages.push(blob);
            }
            let results = engine.fetch_results(id).await?;

            let store = DirectoryEngine::new(&console.data_dir);
            let dir = store.write_simulation(id, &config, &pages, Some(results.as_str())).await?;
            info!("✓ Stored {} pages in {}", pages.len(), dir.display());
            println!("{}", id);
        }

        Command::List => {
            let store = DirectoryEngine::new(&console.data_dir);
            for id in store.list().await? {
                match store.fetch_config(id).await {
                    Ok(config) => println!("{}  {}", id, config.name),
                    Err(e) => warn!("{}: {}", id, e),
                }
            }
        }

        Command::Show { id, page, iteration } => {
            let loader = PageLoader::new(Arc::new(DirectoryEngine::new(&console.data_dir)));
            let config = loader.engine().fetch_config(id).await?;

            let (number, offset) = match iteration {
                Some(it) => {
                    let index = PageIndex::containing(it);
                    (index.to_display(), (it - index.first_iteration()) as usize)
                }
                None => (page_number(page)?, 0),
            };

            let page = load_page(&loader, id, number).await?;
            let Some(snapshot) = page.snapshots().get(offset) else {
                return Err(ConsoleError::invalid(format!(
                    "page {} holds {} iterations, nothing at offset {}",
                    number,
                    page.len(),
                    offset
                )));
            };

            info!("{} | page {} | iteration {}", config.name, number, page.iteration_number(offset));
            print!("{}", render_snapshot(snapshot, &config.ingredients, render_mode(console)));
            print!("{}", render_legend(&config));
        }

        Command::Export { id, page, out, csv } => {
            let loader = PageLoader::new(Arc::new(DirectoryEngine::new(&console.data_dir)));
            let config = loader.engine().fetch_config(id).await?;
            let number = page_number(page)?;
            let page = load_page(&loader, id, number).await?;

            PageExport::new(&config, &page).write_to_file(&out)?;
            info!("Exported {} frames to {}", page.len(), out.display());

            if let Some(csv) = csv {
                let rows = write_census_csv(&csv, &config, &page)?;
                info!("Wrote {} census rows to {}", rows, csv.display());
            }
        }

        Command::Results { id } => {
            let store = DirectoryEngine::new(&console.data_dir);
            print!("{}", store.fetch_results(id).await?);
        }

        Command::Events { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let mut completed = false;
            for event in text.lines().filter_map(RunEvent::from_sse_line) {
                println!("{}", event);
                completed |= event.is_terminal();
            }
            if !completed {
                return Err(ConsoleError::invalid(format!("{} ends before the run completed", file.display())));
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let console = args.console_config();
    if let Err(e) = execute(args.command, &console).await {
        error!("✗ {}", e);
        std::process::exit(1);
    }
}
