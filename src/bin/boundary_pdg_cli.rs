//! CLI entry point (spec §6): parses a JSON-serialized [`Module`], runs the
//! full pipeline, and writes the output files spec §6 names under
//! `--out-dir`. Exit code `0` on success, non-zero on a fatal error.

use boundary_pdg::config::{AnalysisConfig, Cli};
use boundary_pdg::ir::Module;
use boundary_pdg::pipeline::{output, run};
use clap::Parser;
use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    boundary_pdg::init_rayon();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "boundary-pdg run failed");
            eprintln!("boundary-pdg: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> boundary_pdg::errors::Result<()> {
    let cli = Cli::parse();
    let config = AnalysisConfig::from_cli(&cli)?;

    let module_json = std::fs::read_to_string(&config.module_path)?;
    let module: Module = serde_json::from_str(&module_json)
        .map_err(|e| boundary_pdg::errors::BoundaryPdgError::config(format!("malformed module JSON: {e}")))?;

    let outputs = run(&config, &module)?;
    output::write_outputs(&config.out_dir, &outputs)?;

    tracing::info!(
        out_dir = %config.out_dir.display(),
        emitted_functions = outputs.stats.get("idl.emitted_functions"),
        "analysis complete"
    );

    Ok(())
}
