use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use gridstate::io::{config_io, json_io};
use gridstate::state::columns::ColumnDef;
use gridstate::state::data_model::derive_columns;
use gridstate::state::sort::{SortDirection, SortKey, SortModel};
use gridstate::state::GridState;

#[derive(Parser)]
#[command(name = "gridstate")]
#[command(about = "Run records through the grid pipeline and print the displayed page", long_about = None)]
struct Cli {
    /// JSON array of objects
    records: PathBuf,

    /// Grid config; defaults to the `<name>.grid.json` sidecar
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    quick_filter: Option<String>,

    /// `field`, `field:asc` or `field:desc`; repeat for multi-sort
    #[arg(long, value_parser = parse_sort_key)]
    sort: Vec<SortKey>,

    /// Zero-based page; turns pagination on
    #[arg(long)]
    page: Option<usize>,

    #[arg(long)]
    group_by: Vec<String>,
}

fn parse_sort_key(raw: &str) -> Result<SortKey, String> {
    let (field, direction) = match raw.rsplit_once(':') {
        Some((field, "asc")) => (field, SortDirection::Asc),
        Some((field, "desc")) => (field, SortDirection::Desc),
        Some((_, other)) => return Err(format!("unknown sort direction '{other}'")),
        None => (raw, SortDirection::Asc),
    };
    if field.is_empty() {
        return Err("sort field is empty".to_string());
    }
    Ok(SortKey::new(field, direction))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let records = json_io::load_records(&cli.records)
        .with_context(|| format!("loading {}", cli.records.display()))?;
    let mut config = match &cli.config {
        Some(path) => config_io::load_config(path),
        None => config_io::load_sidecar(&cli.records),
    }
    .context("loading grid config")?;

    if config.columns.is_empty() {
        let shared: Vec<_> = records.iter().cloned().map(std::sync::Arc::new).collect();
        config.columns = derive_columns(&shared).into_iter().map(ColumnDef::new).collect();
    }
    if !cli.group_by.is_empty() {
        config.options.group_by = cli.group_by.clone();
    }
    if cli.page.is_some() {
        config.options.pagination = true;
    }

    let mut grid = GridState::from_records(config, records);
    if let Some(text) = &cli.quick_filter {
        grid.set_quick_filter(text);
    }
    for key in &cli.sort {
        if grid.column(&key.field).is_none() {
            bail!("unknown sort field '{}'", key.field);
        }
    }
    grid.set_sort_model(SortModel::from_keys(cli.sort));
    if let Some(page) = cli.page {
        grid.set_page(page);
    }

    let table = grid.export();
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}
