//! Drawbook CLI
//!
//! Reads a JSON draw snapshot (`{draw, bets, clients}`) and prints one
//! report as pretty JSON.

use clap::{Parser, Subcommand};
use drawbook::{
    errors::{BookResult, SnapshotError},
    lottery::settlement,
    ClientColumn, ConditionFilter, ConfigLoader, DrawSnapshot, EngineConfig, GameType,
    OutcomeColumn, ReportEngine, SortDirection,
};
use serde::Serialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drawbook")]
#[command(about = "Exposure books and settlement reports for lottery draws")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Draw snapshot JSON file
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-outcome exposure book
    Book {
        /// ALL, FIRST or SECOND
        #[arg(short, long, default_value = "ALL")]
        filter: ConditionFilter,

        /// Substring of the outcome number
        #[arg(long)]
        search: Option<String>,

        /// Column to sort by (outcome, totalStake, netTotal, 4D, ...)
        #[arg(long)]
        sort: Option<OutcomeColumn>,

        #[arg(long, default_value = "asc")]
        direction: SortDirection,

        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Overrides the configured page size
        #[arg(long)]
        page_size: Option<usize>,

        /// Show the bets behind one outcome instead
        #[arg(long)]
        outcome: Option<String>,
    },

    /// Direct breakdown and coverage for one game type
    Breakdown {
        #[arg(short, long)]
        game_type: GameType,

        #[arg(short, long, default_value = "ALL")]
        filter: ConditionFilter,
    },

    /// Numbers nobody booked
    Unbooked {
        #[arg(short, long)]
        game_type: GameType,

        #[arg(short, long, default_value = "ALL")]
        filter: ConditionFilter,

        /// Write the list into this directory instead of printing it
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Client settlement rollup with totals
    Clients {
        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        sort: Option<ClientColumn>,

        #[arg(long, default_value = "asc")]
        direction: SortDirection,

        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Per-bet settlements for the wallet ledger
    Settle {
        /// Only bets that won on this declared number
        #[arg(long)]
        winning_number: Option<String>,
    },
}

fn main() -> BookResult<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigLoader::new().with_path(path).load()?,
        None => ConfigLoader::new().load()?,
    };
    init_tracing(&config, cli.verbose);

    let snapshot = load_snapshot(&cli.snapshot)?;
    info!(
        draw_id = %snapshot.draw.id,
        bets = snapshot.bets.len(),
        clients = snapshot.clients.len(),
        "snapshot loaded"
    );
    let engine = ReportEngine::new(config)?;

    match cli.command {
        Commands::Book {
            filter,
            search,
            sort,
            direction,
            page,
            page_size,
            outcome,
        } => {
            if let Some(outcome) = outcome {
                return print(&engine.outcome_detail(&snapshot, filter, &outcome));
            }
            let mut query = engine.outcome_query().page(page);
            if let Some(size) = page_size {
                query.page_size = size;
            }
            if let Some(needle) = search {
                query = query.search(needle);
            }
            if let Some(column) = sort {
                query = query.sort(column, direction);
            }
            let book = engine.outcome_book(&snapshot, filter);
            let rows = engine.outcome_page(&snapshot, filter, &query);
            print(&json!({
                "drawId": book.draw_id,
                "filter": filter,
                "betsFolded": book.bets_folded,
                "betsDropped": book.bets_dropped,
                "totalExposure": book.total_exposure(),
                "rows": rows,
            }))
        }
        Commands::Breakdown { game_type, filter } => {
            let direct = engine.direct_breakdown(&snapshot, game_type, filter);
            let coverage = engine.coverage(&snapshot, game_type, filter);
            print(&json!({ "numbers": direct, "coverage": coverage }))
        }
        Commands::Unbooked {
            game_type,
            filter,
            export,
        } => match export {
            Some(dir) => {
                let path = engine.export_unbooked(&snapshot, game_type, filter, &dir)?;
                print(&json!({ "exported": path }))
            }
            None => print(&engine.unbooked_numbers(&snapshot, game_type, filter)),
        },
        Commands::Clients {
            search,
            sort,
            direction,
            page,
        } => {
            let mut query = engine.client_query().page(page);
            if let Some(needle) = search {
                query = query.search(needle);
            }
            if let Some(column) = sort {
                query = query.sort(column, direction);
            }
            print(&engine.client_report(&snapshot, &query))
        }
        Commands::Settle { winning_number } => match winning_number {
            Some(number) => print(&engine.winning_breakdown(&snapshot, &number)),
            None => {
                let settled = engine.settle(&snapshot);
                let rollup = engine.client_rollup(&snapshot);
                print(&json!({
                    "settlements": settled,
                    "totals": settlement::client_rollup_totals(&rollup),
                }))
            }
        },
    }
}

fn init_tracing(config: &EngineConfig, verbose: bool) {
    let fallback = if verbose { "debug" } else { config.logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_snapshot(path: &Path) -> BookResult<DrawSnapshot> {
    let content = std::fs::read_to_string(path).map_err(|e| SnapshotError::ReadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(serde_json::from_str(&content)?)
}

fn print<T: Serialize>(value: &T) -> BookResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
