//! csvmerge CLI
//!
//! Command-line tool for merging, filtering and converting CSV files.

mod cli;
mod logging;

use clap::Parser;
use cli::{Cli, Commands, MergeArgs};
use csvmerge_core::{
    expand_inputs, export_table, merge_files, output_path, parse_csv, scan_directory,
    table_stats, BatchFile, BatchJob, ExportFormat, FilterOperator, FilterRule, MergeConfig,
    MergeResult, Table,
};
use logging::{init_logging, LogConfig};
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Base name used when no output file is given
const DEFAULT_OUTPUT_NAME: &str = "merged_data";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> csvmerge_core::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose, cli.quiet)
        .with_format(cli.log_format)
        .with_log_file(cli.log_file.clone());
    init_logging(&log_config)?;

    match cli.command {
        Commands::Merge {
            merge,
            output,
            format,
        } => cmd_merge(&merge, output, format.map(Into::into)),
        Commands::Preview { merge, limit } => cmd_preview(&merge, limit),
        Commands::Stats {
            inputs,
            recursive,
            json,
        } => cmd_stats(&inputs, recursive, json),
        Commands::Scan { root, recursive } => cmd_scan(&root, recursive),
        Commands::Batch { batch } => cmd_batch(&batch),
        Commands::CreateConfig { output } => cmd_create_config(&output),
        Commands::CreateBatch {
            output,
            file,
            job_output,
        } => cmd_create_batch(&output, &file, &job_output),
    }
}

fn run_merge(args: &MergeArgs) -> csvmerge_core::Result<MergeResult> {
    let config = args.to_config()?;
    let files = expand_inputs(&args.inputs, args.recursive)?;
    info!(files = files.len(), "starting merge");
    merge_files(&files, &config)
}

fn print_log(entries: &[String]) {
    for entry in entries {
        println!("{}", entry);
    }
}

fn cmd_merge(
    args: &MergeArgs,
    output: Option<PathBuf>,
    format: Option<ExportFormat>,
) -> csvmerge_core::Result<()> {
    let (path, format) = match output {
        Some(path) => {
            let format = format
                .or_else(|| ExportFormat::from_path(&path))
                .unwrap_or_default();
            (path, format)
        }
        None => {
            let format = format.unwrap_or_default();
            (output_path(Path::new("."), DEFAULT_OUTPUT_NAME, format), format)
        }
    };

    let result = run_merge(args)?;
    print_log(&result.log);

    export_table(&result.table, &path, format)?;
    println!();
    println!(
        "Exported {} rows x {} columns to {}",
        result.row_count,
        result.column_count,
        path.display()
    );

    Ok(())
}

fn cmd_preview(args: &MergeArgs, limit: usize) -> csvmerge_core::Result<()> {
    let result = run_merge(args)?;
    print_log(&result.log);
    println!();
    print_table(&result.table, limit);

    Ok(())
}

fn print_table(table: &Table, limit: usize) {
    let header = table.column_names();
    println!("{}", header.join("\t"));
    println!("{}", "-".repeat(header.len() * 12));

    for row in table.rows.iter().take(limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > limit {
        println!("... ({} more rows)", table.row_count() - limit);
    }
}

fn cmd_stats(inputs: &[PathBuf], recursive: bool, json: bool) -> csvmerge_core::Result<()> {
    let files = expand_inputs(inputs, recursive)?;

    let mut all = Vec::new();
    for path in &files {
        match parse_csv(path) {
            Ok(table) => all.push(table_stats(&table)),
            Err(e) => error!("{}: {}", path.display(), e),
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    for stats in &all {
        println!("{}", stats.source);
        println!("  Rows: {}", stats.rows);
        println!("  Columns: {}", stats.columns);
        println!("  Missing values: {}", stats.total_missing());
        for col in &stats.column_stats {
            println!("    {} ({}): {} missing", col.name, col.kind, col.missing);
        }
        println!();
    }
    println!("{} of {} files read", all.len(), files.len());

    Ok(())
}

fn cmd_scan(root: &Path, recursive: bool) -> csvmerge_core::Result<()> {
    let files = scan_directory(root, recursive)?;

    println!("Scanned {}:", root.display());
    for file in &files {
        println!("  {}", file.display());
    }
    println!();
    println!("Found {} files", files.len());

    Ok(())
}

fn run_job(job: &BatchJob) -> csvmerge_core::Result<MergeResult> {
    let files = expand_inputs(&job.files, false)?;
    let result = merge_files(&files, &job.config)?;

    let format = job
        .format
        .or_else(|| ExportFormat::from_path(&job.output))
        .unwrap_or_default();
    export_table(&result.table, &job.output, format)?;
    Ok(result)
}

fn cmd_batch(batch_path: &Path) -> csvmerge_core::Result<()> {
    let batch = BatchFile::load(batch_path)?;

    println!("Running batch with {} jobs", batch.jobs.len());
    println!();

    let mut succeeded = 0;
    let mut errors = Vec::new();

    for (i, job) in batch.jobs.iter().enumerate() {
        let name = job
            .name
            .clone()
            .unwrap_or_else(|| format!("job {}", i + 1));
        println!("Processing {}", name);

        match run_job(job) {
            Ok(result) => {
                for entry in &result.log {
                    println!("  {}", entry);
                }
                println!(
                    "  Wrote {} rows to {}",
                    result.row_count,
                    job.output.display()
                );
                succeeded += 1;
            }
            Err(e) => {
                error!(job = %name, "{}", e);
                errors.push((name, e.to_string()));
            }
        }
    }

    println!();
    println!("Batch complete:");
    println!("  {} of {} jobs succeeded", succeeded, batch.jobs.len());

    if !errors.is_empty() {
        println!("\nErrors ({}):", errors.len());
        for (name, err) in &errors {
            println!("  {}: {}", name, err);
        }
    }

    Ok(())
}

fn cmd_create_config(output: &Path) -> csvmerge_core::Result<()> {
    let mut config = MergeConfig::default();
    config
        .filters
        .push(FilterRule::new("ColumnName", FilterOperator::Ne, "value"));

    config.save(output)?;
    println!("Created config file: {}", output.display());
    println!();
    println!("Edit the file to configure your merge, then run:");
    println!("  csvmerge merge <files...> --config {}", output.display());

    Ok(())
}

fn cmd_create_batch(output: &Path, files: &[PathBuf], job_output: &Path) -> csvmerge_core::Result<()> {
    let files = if files.is_empty() {
        vec![PathBuf::from("file1.csv"), PathBuf::from("file2.csv")]
    } else {
        files.to_vec()
    };

    let batch = BatchFile {
        jobs: vec![BatchJob {
            name: Some("example".to_string()),
            files,
            output: job_output.to_path_buf(),
            format: None,
            config: MergeConfig::default(),
        }],
    };

    batch.save(output)?;
    println!("Created batch file: {}", output.display());
    println!();
    println!("Edit the file to configure your batch, then run:");
    println!("  csvmerge batch --batch {}", output.display());

    Ok(())
}
