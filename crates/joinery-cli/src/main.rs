//! joinery CLI
//!
//! Command-line tool for analyzing, merging, and diagnosing collections
//! of CSV datasets linked by shared column names.

use clap::{Parser, Subcommand};
use joinery_core::{
    diagnose, discover_files, execute_plan, plan_merge, AnalysisReport, ConnectivityGraph,
    DuplicateReport, Error, LoadFailure, PlanOutcome, SchemaIndex,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "joinery")]
#[command(about = "Graph-based CSV join analyzer and merger", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the connectivity graph and report whether a merge is possible
    Analyze {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Analyze, execute the merge plan, and write the unified CSV
    Merge {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = "merged_data.csv")]
        output: PathBuf,

        /// Overwrite the output file if it exists
        #[arg(short, long)]
        force: bool,
    },

    /// Diagnose duplicate join-key values and predicted row explosion
    Diagnose {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// List discovered datasets
    List {
        /// Root directories to scan
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Show column names for each dataset
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> joinery_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze { root, format } => cmd_analyze(&root, &format),
        Commands::Merge {
            root,
            output,
            force,
        } => cmd_merge(&root, &output, force),
        Commands::Diagnose { root, format } => cmd_diagnose(&root, &format),
        Commands::List { root, verbose } => cmd_list(&root, verbose),
    }
}

/// Discover files and index their headers
fn load_index(roots: &[PathBuf]) -> joinery_core::Result<(SchemaIndex, Vec<LoadFailure>)> {
    let files = discover_files(roots)?;
    if files.is_empty() {
        return Err(Error::NoInput);
    }
    Ok(SchemaIndex::build(&files))
}

/// Analysis mode tolerates broken files: warn and exclude
fn warn_skipped(skipped: &[LoadFailure]) {
    for failure in skipped {
        eprintln!(
            "Warning: skipping {}: {}",
            failure.path.display(),
            failure.reason
        );
    }
}

/// Merge and diagnose modes need every dataset; a missing one changes
/// connectivity, so any load failure aborts before planning
fn abort_on_failures(skipped: &[LoadFailure]) -> joinery_core::Result<()> {
    if skipped.is_empty() {
        return Ok(());
    }
    for failure in skipped {
        eprintln!(
            "Error: cannot load {}: {}",
            failure.path.display(),
            failure.reason
        );
    }
    Err(Error::LoadFailures(skipped.len()))
}

fn cmd_analyze(roots: &[PathBuf], format: &str) -> joinery_core::Result<()> {
    let (index, skipped) = load_index(roots)?;
    warn_skipped(&skipped);

    let graph = ConnectivityGraph::build(&index);
    let outcome = plan_merge(&graph);

    match format.to_lowercase().as_str() {
        "json" => {
            let report = AnalysisReport::build(roots, &index, &skipped, &graph, &outcome);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => print_analysis(&index, &graph, &outcome),
        _ => {
            eprintln!("Unknown format: {}. Supported formats: text, json", format);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_analysis(index: &SchemaIndex, graph: &ConnectivityGraph, outcome: &PlanOutcome) {
    println!("Datasets ({}):", index.len());
    for ds in &index.datasets {
        println!(
            "  {}: {} columns{}",
            ds.name,
            ds.column_count(),
            encoding_note(&ds.encoding)
        );
    }

    println!();
    println!("Connections ({}):", graph.edges.len());
    for edge in &graph.edges {
        println!(
            "  {} <-> {} via: {}",
            edge.left,
            edge.right,
            edge.shared.join(", ")
        );
    }

    let isolated = graph.isolated();
    if !isolated.is_empty() {
        println!();
        println!("Isolated datasets: {}", isolated.join(", "));
    }

    println!();
    println!("Total distinct columns: {}", index.distinct_column_count());

    match outcome {
        PlanOutcome::Mergeable(plan) => {
            println!("Mergeable: yes");
            println!();
            println!("Merge plan (root: {}):", plan.root);
            for (i, step) in plan.steps.iter().enumerate() {
                println!(
                    "  {}. merge {} + {} on: {}",
                    i + 1,
                    step.base,
                    step.incoming,
                    step.on.join(", ")
                );
            }
        }
        PlanOutcome::Disconnected { groups } => {
            println!("Mergeable: no");
            println!();
            print_groups(groups);
        }
    }
}

fn print_groups(groups: &[Vec<String>]) {
    println!("Unmergeable groups (no shared columns between them):");
    for (i, group) in groups.iter().enumerate() {
        println!("  {}. {}", i + 1, group.join(", "));
    }
}

fn encoding_note(encoding: &str) -> String {
    if encoding == "UTF-8" {
        String::new()
    } else {
        format!(" [{}]", encoding)
    }
}

fn cmd_merge(roots: &[PathBuf], output: &PathBuf, force: bool) -> joinery_core::Result<()> {
    let (index, skipped) = load_index(roots)?;
    abort_on_failures(&skipped)?;

    let graph = ConnectivityGraph::build(&index);
    let plan = match plan_merge(&graph) {
        PlanOutcome::Mergeable(plan) => plan,
        PlanOutcome::Disconnected { groups } => {
            println!("Cannot merge: the datasets are not fully connected.");
            println!();
            print_groups(&groups);
            std::process::exit(1);
        }
    };

    if output.exists() && !force {
        eprintln!(
            "Output file {} already exists (use --force to overwrite)",
            output.display()
        );
        std::process::exit(1);
    }

    println!("Merging {} datasets...", index.len());
    for (i, step) in plan.steps.iter().enumerate() {
        println!(
            "  {}. merge {} + {} on: {}",
            i + 1,
            step.base,
            step.incoming,
            step.on.join(", ")
        );
    }

    let merged = execute_plan(&plan, &index)?;
    merged.write_csv_file(output)?;

    println!();
    println!("Saved merged data to {}", output.display());
    println!(
        "Final shape: {} rows x {} columns",
        merged.row_count(),
        merged.column_count()
    );

    // In an outer-join chain the output can only exceed the summed input
    // rows when some join key repeats on both sides
    if merged.row_count() > merged.input_rows {
        println!();
        println!(
            "Warning: merged row count ({}) exceeds total input rows ({}).",
            merged.row_count(),
            merged.input_rows
        );
        println!("Join keys are likely not unique; run `joinery diagnose` for a breakdown.");
    }

    Ok(())
}

fn cmd_diagnose(roots: &[PathBuf], format: &str) -> joinery_core::Result<()> {
    let (index, skipped) = load_index(roots)?;
    abort_on_failures(&skipped)?;

    let report = diagnose(&index)?;

    match format.to_lowercase().as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "text" => print_diagnosis(&report),
        _ => {
            eprintln!("Unknown format: {}. Supported formats: text, json", format);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_diagnosis(report: &DuplicateReport) {
    println!("Datasets:");
    for ds in &report.datasets {
        println!("  {}: {} rows", ds.name, ds.rows);
    }

    println!();
    if report.candidate_columns.is_empty() {
        println!("No column is shared by two or more datasets; nothing to diagnose.");
        return;
    }
    println!(
        "Candidate join columns: {}",
        report.candidate_columns.join(", ")
    );

    for column in &report.candidate_columns {
        println!();
        println!("Column '{}':", column);
        for cr in report.column_reports.iter().filter(|r| &r.column == column) {
            if cr.duplicates > 0 {
                println!(
                    "  {}: {} values, {} distinct ({} duplicates)",
                    cr.dataset, cr.rows, cr.distinct, cr.duplicates
                );
                println!("    duplicate values: {}", cr.duplicate_values.join(", "));
            } else {
                println!("  {}: {} values, no duplicates", cr.dataset, cr.rows);
            }
            if cr.case_whitespace_flag {
                println!(
                    "    case/whitespace differences detected ({} duplicates after normalizing)",
                    cr.normalized_duplicates
                );
            }
            if !cr.samples.is_empty() {
                let samples: Vec<String> = cr
                    .samples
                    .iter()
                    .map(|s| format!("'{}' ({})", s.value, s.kind))
                    .collect();
                println!("    samples: {}", samples.join(", "));
            }
        }
    }

    println!();
    println!("Pairwise join simulation:");
    for pair in &report.pair_reports {
        println!(
            "  '{}': {} & {}: {} common values",
            pair.column, pair.left, pair.right, pair.common_values
        );
        let marker = if pair.explosion { "  <-- EXPLOSION" } else { "" };
        println!(
            "    simulated outer join: {} rows ({}: {}, {}: {}){}",
            pair.simulated_rows, pair.left, pair.left_rows, pair.right, pair.right_rows, marker
        );
        for c in &pair.contributors {
            println!(
                "      value '{}': {} x {} = {} rows",
                c.value, c.left_count, c.right_count, c.rows
            );
        }
    }
}

fn cmd_list(roots: &[PathBuf], verbose: bool) -> joinery_core::Result<()> {
    let (index, skipped) = load_index(roots)?;
    warn_skipped(&skipped);

    println!("Datasets ({}):", index.len());
    for ds in &index.datasets {
        println!(
            "  {} ({} columns){}",
            ds.name,
            ds.column_count(),
            encoding_note(&ds.encoding)
        );
        if verbose {
            let names: Vec<&str> = ds.columns.iter().map(|c| c.name.as_str()).collect();
            println!("    columns: {}", names.join(", "));
        }
    }

    Ok(())
}
