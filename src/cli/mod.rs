//! Command-line interface
//!
//! With no arguments the binary reads the default export and reports the
//! investigative outcome, then the disciplinary outcome. Reports go to
//! stdout; progress lines and logs go to stderr.

use clap::Parser;
use colored::*;
use std::path::PathBuf;
use std::time::Instant;

use crate::config::{OutcomeMode, PipelineConfig};
use crate::dataset::load_records;
use crate::error::Result;
use crate::pipeline::run_outcome;
use crate::report::OutcomeReport;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString    { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn section(title: &str) {
    eprintln!();
    eprintln!("  {} {}", accent("›"), title.white().bold());
    eprintln!("  {}", dim(&"─".repeat(56)));
}

fn step_ok(msg: &str, detail: &str) {
    eprintln!("  {} {} {}", ok("✓"), msg, dim(detail));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "complaint-outcomes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Which complaint attributes predict sustained findings and discipline")]
#[command(long_about = None)]
pub struct Cli {
    /// JSON array of complaint records (overrides the config file)
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Outcome to model; repeat for several (default: investigative, disciplinary)
    #[arg(long = "outcome")]
    pub outcomes: Vec<OutcomeMode>,

    /// Pipeline configuration (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for `{outcome}_report.json` files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (or defaults) with `--data` applied on top
    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        let config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };
        Ok(match &self.data {
            Some(path) => config.with_data_path(path.clone()),
            None => config,
        })
    }

    /// Requested outcomes, in the order given
    pub fn outcomes(&self) -> Vec<OutcomeMode> {
        if self.outcomes.is_empty() {
            OutcomeMode::ALL.to_vec()
        } else {
            self.outcomes.clone()
        }
    }
}

/// Load the records once and print a report per requested outcome
pub fn run(cli: &Cli) -> Result<Vec<OutcomeReport>> {
    let config = cli.pipeline_config()?;

    let start = Instant::now();
    let records = load_records(&config.data_path)?;
    step_ok(
        &format!("Loaded {} records", records.len()),
        &format!("{} in {:.2?}", config.data_path.display(), start.elapsed()),
    );

    let mut reports = Vec::new();
    for mode in cli.outcomes() {
        section(&format!("{} outcome", mode));
        let start = Instant::now();
        let report = run_outcome(&records, mode, &config)?;
        print!("{}", report.render());

        if let Some(dir) = &cli.output {
            let path = report.save_json(dir)?;
            step_ok("Saved report", &path.display().to_string());
        }
        step_ok(&format!("Finished {}", mode), &format!("{:.2?}", start.elapsed()));
        reports.push(report);
    }

    Ok(reports)
}
