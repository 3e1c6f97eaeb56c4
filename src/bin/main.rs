//! erdsync CLI - keep a diagram in sync with project schema files
//!
//! Usage:
//!   erdsync pull [--diagram <file>] [--path <dir>...]
//!   erdsync push [--diagram <file>] [--out <file>]
//!   erdsync layout [--diagram <file>]
//!   erdsync validate [--path <dir>...]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use erdsync::config::Settings;
use erdsync::inference::InferenceEngine;
use erdsync::schema::{JsonSchemaScanner, SchemaScanner};
use erdsync::sync::FileSyncWriter;
use erdsync::workspace::Workspace;

#[derive(Parser)]
#[command(name = "erdsync")]
#[command(about = "Keeps entity-relationship diagrams synchronized with transformation-project schema files")]
#[command(version)]
struct Cli {
    /// Path to an erdsync.toml (discovered when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan schema documents and merge inferred relationships into the diagram
    Pull {
        /// Diagram file to update
        #[arg(long)]
        diagram: Option<PathBuf>,

        /// Schema roots to scan (overrides configured paths)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
    },

    /// Write the canonical relationship batch back for the project
    Push {
        /// Diagram file to read
        #[arg(long)]
        diagram: Option<PathBuf>,

        /// Batch output file
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Print computed edge geometry as JSON
    Layout {
        /// Diagram file to read
        #[arg(long)]
        diagram: Option<PathBuf>,
    },

    /// Scan and report candidate statistics without touching the diagram
    Validate {
        /// Schema roots to scan (overrides configured paths)
        #[arg(long = "path")]
        paths: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load(path),
        None => Settings::discover(),
    };
    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Pull { diagram, paths } => run_pull(&settings, diagram, paths),
        Commands::Push { diagram, out } => run_push(&settings, diagram, out),
        Commands::Layout { diagram } => run_layout(&settings, diagram),
        Commands::Validate { paths } => run_validate(&settings, paths),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_workspace(
    settings: &Settings,
    diagram: Option<PathBuf>,
) -> Result<(Workspace, PathBuf), Box<dyn std::error::Error>> {
    let path = diagram.unwrap_or_else(|| settings.project.diagram_file.clone());
    let workspace = if path.exists() {
        Workspace::load_file(&path)?
    } else {
        Workspace::new()
    };
    Ok((
        workspace.with_aggregation_mode(settings.aggregation.mode),
        path,
    ))
}

fn scan_paths(settings: &Settings, overrides: Vec<PathBuf>) -> Vec<PathBuf> {
    if overrides.is_empty() {
        settings.project.schema_paths.clone()
    } else {
        overrides
    }
}

fn run_pull(
    settings: &Settings,
    diagram: Option<PathBuf>,
    paths: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut workspace, path) = load_workspace(settings, diagram)?;
    let scanner = JsonSchemaScanner::new();
    let report = workspace.pull(
        &scanner,
        &scan_paths(settings, paths),
        &settings.inference_config(),
    )?;
    workspace.save_file(&path)?;

    println!(
        "pulled {} inferred relationships ({} total, {} new entities)",
        report.inferred, report.total, report.created_entities
    );
    if report.skipped_malformed + report.skipped_unresolved > 0 {
        println!(
            "skipped {} malformed and {} unresolvable candidates",
            report.skipped_malformed, report.skipped_unresolved
        );
    }
    Ok(())
}

fn run_push(
    settings: &Settings,
    diagram: Option<PathBuf>,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut workspace, _) = load_workspace(settings, diagram)?;
    let out = out.unwrap_or_else(|| settings.project.sync_file.clone());
    let mut writer = FileSyncWriter::new(&out);
    let result = workspace.push(&mut writer)?;
    println!(
        "pushed {} relationship tests ({} removals) to {}",
        result.written,
        result.removed,
        out.display()
    );
    Ok(())
}

fn run_layout(
    settings: &Settings,
    diagram: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (workspace, _) = load_workspace(settings, diagram)?;
    let layouts = workspace.layout();
    println!("{}", serde_json::to_string_pretty(&layouts)?);
    Ok(())
}

fn run_validate(
    settings: &Settings,
    paths: Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scanner = JsonSchemaScanner::new();
    let tests = scanner.scan(&scan_paths(settings, paths))?;
    let engine = InferenceEngine::default();
    let (candidates, malformed) = engine.normalize(&tests);

    println!(
        "{} relationship tests scanned: {} well-formed, {} malformed",
        tests.len(),
        candidates.len(),
        malformed
    );
    Ok(())
}
