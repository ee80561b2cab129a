//! Checklist Ingest - build and index a taxonomic tree from a core file

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use clb_common::logging::{init_logging, LogConfig, LogLevel};
use clb_ingest::config::{parse_delimiter, ImportConfig};
use clb_ingest::importer::{ChecklistImporter, ImportReport};
use clb_ingest::nested_set::in_lft_order;
use clb_ingest::store::{MemoryStore, TaxonStore};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "clb-ingest")]
#[command(author, version, about = "Checklist tree builder and nested-set indexer")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import a core file and report what was built
    Import(ImportArgs),

    /// Import a core file and log every indexed taxon in tree order
    Tree(ImportArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Delimited core file with a header row of term names
    file: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "CLB_CONFIG")]
    config: Option<PathBuf>,

    /// Column delimiter: a single character or tab, comma, semicolon, pipe
    #[arg(short, long)]
    delimiter: Option<String>,

    /// Writes per committed batch
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Write the import report as JSON to this path
    #[arg(short, long)]
    report: Option<PathBuf>,
}

impl ImportArgs {
    fn import_config(&self) -> Result<ImportConfig> {
        let mut config = ImportConfig::layered(self.config.as_deref())
            .context("Failed to load import configuration")?;

        if let Some(delimiter) = &self.delimiter {
            config.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(report) = &self.report {
            config.report_path = Some(report.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

fn import(args: &ImportArgs) -> Result<(MemoryStore, ImportReport)> {
    let config = args.import_config()?;
    let importer = ChecklistImporter::new(config);
    let mut store = MemoryStore::new();

    let report = importer
        .import_file(&mut store, &args.file)
        .with_context(|| format!("Failed to import {}", args.file.display()))?;

    if !report.warnings.is_empty() {
        warn!(warnings = report.warnings.len(), "Some references could not be resolved");
    }
    info!(duration_ms = report.duration_ms(), "{}", report.summary());

    if let Some(path) = &importer.config().report_path {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    Ok((store, report))
}

fn log_tree(store: &MemoryStore) -> Result<()> {
    // rgt values of the currently open ancestors
    let mut open: Vec<u64> = Vec::new();
    for node in in_lft_order(store) {
        let taxon = store.taxon_ref(node)?;
        let Some((lft, rgt)) = taxon.interval() else {
            continue;
        };
        while open.last().is_some_and(|top| *top < lft) {
            open.pop();
        }
        info!(
            "{}{} [{}, {}] {}",
            "  ".repeat(open.len()),
            taxon.display_name(),
            lft,
            rgt,
            taxon.taxon_rank.as_deref().unwrap_or("")
        );
        open.push(rgt);
    }
    Ok(())
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flags
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("clb-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    match &cli.command {
        Command::Import(args) => {
            info!("Importing checklist");
            import(args)?;
        },
        Command::Tree(args) => {
            info!("Importing checklist for tree listing");
            let (store, _) = import(args)?;
            log_tree(&store)?;
        },
    }

    info!("Done");
    Ok(())
}
