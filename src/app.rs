//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs the analysis pipeline
//! - prints reports
//! - writes optional exports

use clap::Parser;

use crate::cli::{AnalyzeArgs, Cli, Command, CountsArgs, DemoArgs, FetchArgs};
use crate::data::sample::{generate_recording, SyntheticConfig};
use crate::domain::AnalysisConfig;
use crate::error::AppError;
use crate::io::export;
use crate::segment::aggregate;

pub mod pipeline;

/// Entry point for the `spikefit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Counts(args) => handle_counts(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Demo(args) => handle_demo(args),
    }
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let run = pipeline::run_analysis(&config)?;
    print_run(&config, &run)
}

fn handle_counts(args: CountsArgs) -> Result<(), AppError> {
    let store = crate::io::ingest::load_recording(&args.csv)?;

    let table = aggregate::spike_counts(&store);
    println!("{}", crate::report::format_spike_counts(&table));

    for cell in store.cell_names() {
        let counts = aggregate::measurement_counts(&store, cell)?;
        println!("{}", crate::report::format_measurement_counts(cell, &counts));
    }

    if let Some(path) = &args.export_csv {
        export::write_counts_csv(path, &table)?;
        println!("Wrote counts CSV to {}", path.display());
    }

    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let path = crate::data::fetch::fetch_recording(&args.id, &args.file, &args.data_dir)?;
    println!("Recording available at {}", path.display());
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let store = generate_recording(&SyntheticConfig {
        n_cells: args.cells,
        trains_per_cell: args.trains,
        samples_per_train: args.samples,
        seed: args.seed,
        ..SyntheticConfig::default()
    })?;

    let config = AnalysisConfig {
        csv_path: "synthetic".into(),
        model: args.model,
        initial_value: 1.0,
        // The synthetic IF decays, so exponents must be free to go negative.
        lower_bound: -10.0,
        thresholds: vec![150.0, 400.0, 800.0],
        use_log_axes: false,
        cells: None,
        merge_subset: false,
        max_trains: 5,
        export_json: None,
        export_csv: None,
    };

    let run = pipeline::run_analysis_with_store(&store, &config)?;
    print_run(&config, &run)
}

fn print_run(config: &AnalysisConfig, run: &pipeline::AnalysisOutput) -> Result<(), AppError> {
    println!("{}", crate::report::format_spike_counts(&run.spike_counts));
    println!("{}", crate::report::format_sweeps(&run.sweeps, &run.poor_fits));

    if let Some(path) = &config.export_json {
        let doc = export::build_metrics_file(
            &run.sweeps,
            &run.poor_fits,
            config.model,
            config.use_log_axes,
        );
        export::write_metrics_json(path, &doc)?;
        println!("Wrote metrics JSON to {}", path.display());
    }
    if let Some(path) = &config.export_csv {
        export::write_sweeps_csv(path, &run.sweeps)?;
        println!("Wrote sweep CSV to {}", path.display());
    }

    Ok(())
}

fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    AnalysisConfig {
        csv_path: args.csv.clone(),
        model: args.model,
        initial_value: args.initial,
        lower_bound: args.lower_bound,
        thresholds: args.thresholds.clone(),
        use_log_axes: args.log_axes,
        cells: args.cells.clone(),
        merge_subset: args.merge,
        max_trains: args.max_trains,
        export_json: args.export_json.clone(),
        export_csv: args.export_csv.clone(),
    }
}
