use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::info;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod engine;
mod export;
mod inputter;
mod loader;
mod model;
mod record;
mod ui;

use controller::Controller;
use domain::{DEFAULT_PAGE_SIZE, GmvConfig, GmvError};
use engine::{SortDir, SortSpec};
use model::{Model, Status};
use record::Field;
use ui::MatchUI;

#[derive(Parser, Debug)]
#[command(
    name = "gmv",
    version,
    about = "Terminal viewer for gazette/registry match result sets"
)]
struct Cli {
    /// Match result file (.json backend dump, or .csv/.parquet/.arrow export)
    input: String,

    /// Rows per page within each volume group
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Apply a search query before the first render
    #[arg(short, long)]
    query: Option<String>,

    /// Sort column (e.g. causeNo, name_of_deceased, "Date Published")
    #[arg(long)]
    sort: Option<String>,

    /// Sort descending instead of ascending
    #[arg(long, requires = "sort")]
    desc: bool,

    /// Write the filtered set as CSV and exit without opening the viewer
    #[arg(long, value_name = "FILE")]
    export: Option<PathBuf>,

    /// Log file (the viewer owns the terminal)
    #[arg(long, default_value = "gmv.log")]
    log_file: String,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), GmvError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;
    info!("Starting gmv!");

    let input = shellexpand::full(&cli.input)
        .map_err(|e| GmvError::LoadingFailed(e.to_string()))?
        .into_owned();
    let records = loader::load_records(Path::new(&input))?;
    let source_name = Path::new(&input)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("matches")
        .to_string();

    let config = GmvConfig::default().page_size(cli.page_size);
    let mut model = Model::init(config.clone(), records, source_name);

    if let Some(query) = cli.query {
        model.set_query(query);
    }
    if let Some(key) = cli.sort.as_deref() {
        let field =
            Field::parse(key).ok_or_else(|| GmvError::UnknownSortKey(key.to_string()))?;
        let dir = if cli.desc {
            SortDir::Descending
        } else {
            SortDir::Ascending
        };
        model.set_sort(SortSpec { key: field, dir });
    }

    // Headless mode: run the pipeline and emit the CSV, no TUI.
    if let Some(path) = cli.export {
        let count = model.export_to(&path)?;
        println!("Exported {} rows to {}", count, path.display());
        return Ok(());
    }

    let mut ui = MatchUI::new(&config);
    let controller = Controller::new(&config);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(&model.view(), f))?;
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }
    }
    ratatui::restore();

    Ok(())
}

fn init_tracing(log_file: &str) -> Result<(), GmvError> {
    let file = std::fs::File::create(log_file)?;
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}
