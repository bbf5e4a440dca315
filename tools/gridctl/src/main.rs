//! gridctl - GridLink inverter register tool
//!
//! Validates register catalogs, decodes snapshots, previews register writes
//! and replays sample logs through the energy integrators.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use gridlink_calc::{CycleReport, Reading};
use gridlink_registers::{ResolvedModel, Unavailable, Value};
use serde::Serialize;
use std::path::PathBuf;

use gridctl::commands::{self, ModelSummary, ReplaySummary};
use gridctl::samples::parse_words_json;
use gridctl::GridctlConfig;

#[derive(Parser)]
#[command(
    name = "gridctl",
    about = "GridLink inverter register catalog and energy total tool",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (YAML, TOML or JSON)
    #[arg(short, long, global = true, env = "GRIDCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Catalog file, overrides the configured one
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Model name, overrides the configured one
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Totals state file, overrides the configured one
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the catalog, print per-model counts
    Check,

    /// Decode one register snapshot for the selected model
    Decode {
        /// Snapshot as a JSON object of address -> word
        #[arg(long, conflicts_with = "words_file", required_unless_present = "words_file")]
        words: Option<String>,

        /// File containing the JSON snapshot
        #[arg(long)]
        words_file: Option<PathBuf>,
    },

    /// Show the register words a write would send
    Encode {
        /// Entity key
        #[arg(short, long)]
        key: String,

        /// Physical value, or option label for selects
        #[arg(long, allow_hyphen_values = true)]
        value: String,
    },

    /// Replay a timestamp,address,word CSV log through the integrators
    Replay {
        /// Sample log
        #[arg(short, long)]
        samples: PathBuf,
    },
}

impl Cli {
    /// Layered config with command line overrides applied last
    fn resolve_config(&self) -> Result<GridctlConfig> {
        let mut config = GridctlConfig::load(self.config.as_deref())?;
        if let Some(catalog) = &self.catalog {
            config.catalog = catalog.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(state_file) = &self.state_file {
            config.state_file = state_file.clone();
        }
        if self.verbose {
            config.log.level = "debug".to_string();
        }
        if self.no_color {
            config.log.ansi = false;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let config = cli.resolve_config()?;
    common::init_with_config(&config.log)
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    match &cli.command {
        Commands::Check => {
            let summaries = commands::check_catalog(&config.catalog)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                print_check(&config, &summaries);
            }
        },
        Commands::Decode { words, words_file } => {
            let json = match (words, words_file) {
                (Some(words), _) => words.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read snapshot: {}", path.display()))?,
                (None, None) => return Err(anyhow!("--words or --words-file is required")),
            };
            let words = parse_words_json(&json)?;
            let model = commands::load_model(&config.catalog, &config.model)?;
            let readings = commands::decode_snapshot(&model, &words);
            if cli.json {
                let rows: Vec<DecodedRow> = readings.iter().map(DecodedRow::from).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_decode(&model, &readings);
            }
        },
        Commands::Encode { key, value } => {
            let model = commands::load_model(&config.catalog, &config.model)?;
            let words = commands::encode_entity(&model, key, value)?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&words)?);
            } else {
                println!("{} {} = {}", "Write".bright_cyan(), key.bold(), value);
                for (address, word) in &words {
                    println!("  {:>5}  0x{:04X}  ({})", address, word, word);
                }
            }
        },
        Commands::Replay { samples } => {
            let model = commands::load_model(&config.catalog, &config.model)?;
            let summary = commands::replay(model, samples, &config.state_file).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_replay(&config, &summary);
            }
        },
    }

    Ok(())
}

// ============================================================================
// Output
// ============================================================================

/// JSON row for one decoded entity
#[derive(Serialize)]
struct DecodedRow<'a> {
    key: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unavailable: Option<String>,
}

impl<'a> From<&'a (String, Result<Value, Unavailable>)> for DecodedRow<'a> {
    fn from((key, result): &'a (String, Result<Value, Unavailable>)) -> Self {
        Self {
            key,
            value: result.as_ref().ok(),
            unavailable: result.as_ref().err().map(|e| e.to_string()),
        }
    }
}

fn unit_of<'a>(model: &'a ResolvedModel, key: &str) -> &'a str {
    model
        .get(key)
        .and_then(|entity| entity.presentation().unit.as_deref())
        .unwrap_or("")
}

fn print_check(config: &GridctlConfig, summaries: &[ModelSummary]) {
    println!(
        "{} {}",
        "Catalog OK:".green().bold(),
        config.catalog.display()
    );
    for summary in summaries {
        let kinds: Vec<String> = summary
            .kinds
            .iter()
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        println!(
            "  {:<6} {:>3} entities ({}), {} registers",
            summary.name.bold(),
            summary.entities,
            kinds.join(", "),
            summary.addresses
        );
    }
}

fn print_decode(model: &ResolvedModel, readings: &[(String, Result<Value, Unavailable>)]) {
    for (key, result) in readings {
        match result {
            Ok(value) => println!("  {:<28} {} {}", key, value, unit_of(model, key)),
            Err(reason) => println!(
                "  {:<28} {} {}",
                key,
                "unavailable".yellow(),
                format!("({})", reason).dimmed()
            ),
        }
    }
}

fn print_replay(config: &GridctlConfig, summary: &ReplaySummary) {
    for cycle in &summary.cycles {
        print_cycle_totals(cycle);
    }

    println!();
    println!(
        "{} {} cycle(s), totals saved to {}",
        "Replay complete:".green().bold(),
        summary.cycles.len(),
        config.state_file.display()
    );
    for (key, total) in &summary.totals {
        println!("  {:<28} {}", key, total);
    }

    let failed = summary.cycles_with_persist_failures();
    if failed > 0 {
        eprintln!(
            "{} totals could not be persisted in {} cycle(s)",
            "WARNING".yellow(),
            failed
        );
    }
}

fn print_cycle_totals(cycle: &CycleReport) {
    let totals: Vec<String> = cycle
        .readings
        .iter()
        .filter_map(|(key, reading)| match reading {
            Reading::Total { update } => Some(format!("{}={}", key, update.total)),
            _ => None,
        })
        .collect();
    println!(
        "{}  {}",
        cycle.timestamp.to_rfc3339().bright_blue(),
        totals.join("  ")
    );
}
