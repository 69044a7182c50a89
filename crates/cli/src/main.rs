use anyhow::{Context, Result};
use bracket_opt::api::{
    optimize_with_catalog, sample_batch, DesignInputs, OptimizationResult, ReplayToken,
    ScenarioCfg, SearchCfg, SearchError, TableCatalog,
};
use clap::{Parser, Subcommand};
use polars::prelude::*;
use serde_json::json;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::SubscriberBuilder;

mod channels;
mod provenance;

use provenance::{write_sidecar, Payload};

#[derive(Parser)]
#[command(name = "cli")]
#[command(about = "Masonry support bracket optimiser")]
struct Cmd {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// Optimise one design read from a JSON `DesignInputs` file
    Optimize {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        out: PathBuf,
        /// Channel table CSV; defaults to the built-in table
        #[arg(long)]
        channels: Option<PathBuf>,
        #[arg(long)]
        no_prune: bool,
        #[arg(long, default_value_t = 10)]
        max_alternatives: usize,
    },
    /// Optimise sampled scenarios and write a CSV summary
    Sweep {
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// First replay index
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long, default_value_t = 100)]
        count: usize,
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        channels: Option<PathBuf>,
        #[arg(long)]
        no_prune: bool,
    },
    /// Write the built-in channel table as CSV
    Channels {
        #[arg(long)]
        out: PathBuf,
    },
    /// Print a small provenance JSON block
    Report,
}

fn main() -> Result<()> {
    SubscriberBuilder::default().with_target(false).init();
    match Cmd::parse().action {
        Action::Optimize {
            input,
            out,
            channels,
            no_prune,
            max_alternatives,
        } => {
            let cfg = SearchCfg::default()
                .with_prune(!no_prune)
                .with_max_alternatives(max_alternatives);
            optimize_file(&input, &out, channels.as_deref(), cfg).map(|_| ())
        }
        Action::Sweep {
            seed,
            start,
            count,
            out,
            channels,
            no_prune,
        } => {
            let cfg = SearchCfg::default().with_prune(!no_prune);
            sweep(ReplayToken::new(seed, start), count, &out, channels.as_deref(), cfg)
        }
        Action::Channels { out } => {
            channels::save_catalog(&TableCatalog::reference(), &out)?;
            write_sidecar(&out, Payload::new("channels", json!({})))?;
            Ok(())
        }
        Action::Report => {
            println!("{}", serde_json::to_string_pretty(&provenance::header())?);
            Ok(())
        }
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn catalog_from(path: Option<&Path>) -> Result<TableCatalog> {
    match path {
        Some(p) => channels::load_catalog(p),
        None => Ok(TableCatalog::reference()),
    }
}

fn optimize_file(
    input: &Path,
    out: &Path,
    channels: Option<&Path>,
    cfg: SearchCfg,
) -> Result<OptimizationResult> {
    let raw = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let inputs: DesignInputs = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing design inputs from {}", input.display()))?;
    let catalog = catalog_from(channels)?;
    let result = optimize_with_catalog(&inputs, &catalog, cfg)
        .with_context(|| format!("optimising {}", input.display()))?;
    let sel = &result.selected;
    tracing::info!(
        weight = sel.weight,
        bracket = %sel.candidate.bracket_type,
        angle = %sel.candidate.angle_orientation,
        centres = sel.candidate.bracket_centres,
        channel = %sel.candidate.channel_family,
        overridden = result.overridden,
        "selected"
    );
    for alert in &result.alerts {
        tracing::warn!("{alert}");
    }

    ensure_parent(out)?;
    fs::write(out, serde_json::to_vec_pretty(&result)?)
        .with_context(|| format!("writing {}", out.display()))?;
    let mut payload = Payload::new(
        "optimize",
        json!({
            "prune": cfg.prune,
            "max_alternatives": cfg.max_alternatives,
            "stats": result.stats,
        }),
    )
    .with_input(input);
    if let Some(p) = channels {
        payload = payload.with_input(p);
    }
    write_sidecar(out, payload)?;
    Ok(result)
}

/// Column buffers for the sweep summary.
#[derive(Default)]
struct SweepTable {
    seed: Vec<u64>,
    index: Vec<u64>,
    slab: Vec<f64>,
    cavity: Vec<f64>,
    support_level: Vec<f64>,
    load: Vec<Option<f64>>,
    exclusion_limit: Vec<Option<f64>>,
    status: Vec<String>,
    weight: Vec<Option<f64>>,
    bracket_type: Vec<Option<String>>,
    angle_orientation: Vec<Option<String>>,
    centres: Vec<Option<u32>>,
    channel: Vec<Option<String>>,
    overridden: Vec<Option<bool>>,
    evaluated: Vec<Option<u64>>,
    pruned: Vec<Option<u64>>,
}

impl SweepTable {
    fn push(
        &mut self,
        tok: ReplayToken,
        inputs: &DesignInputs,
        outcome: &Result<OptimizationResult, SearchError>,
    ) {
        self.seed.push(tok.seed);
        self.index.push(tok.index);
        self.slab.push(inputs.slab_thickness);
        self.cavity.push(inputs.cavity_width);
        self.support_level.push(inputs.support_level);
        self.load.push(inputs.characteristic_load);
        self.exclusion_limit.push(inputs.exclusion_limit());
        let ok = outcome.as_ref().ok();
        let status = match outcome {
            Ok(_) => "ok",
            Err(SearchError::InfeasibleDesign { .. }) => "infeasible",
            Err(SearchError::Cancelled { .. }) => "cancelled",
            Err(SearchError::InvalidInputs { .. }) => "invalid",
        };
        self.status.push(status.to_string());
        self.weight.push(ok.map(|r| r.selected.weight));
        self.bracket_type
            .push(ok.map(|r| r.selected.candidate.bracket_type.to_string()));
        self.angle_orientation
            .push(ok.map(|r| r.selected.candidate.angle_orientation.to_string()));
        self.centres.push(ok.map(|r| r.selected.candidate.bracket_centres));
        self.channel
            .push(ok.map(|r| r.selected.candidate.channel_family.clone()));
        self.overridden.push(ok.map(|r| r.overridden));
        self.evaluated.push(ok.map(|r| r.stats.evaluated as u64));
        self.pruned.push(ok.map(|r| r.stats.pruned as u64));
    }

    fn into_frame(self) -> PolarsResult<DataFrame> {
        df!(
            "seed" => self.seed,
            "index" => self.index,
            "slab_thickness" => self.slab,
            "cavity_width" => self.cavity,
            "support_level" => self.support_level,
            "characteristic_load" => self.load,
            "exclusion_limit" => self.exclusion_limit,
            "status" => self.status,
            "weight" => self.weight,
            "bracket_type" => self.bracket_type,
            "angle_orientation" => self.angle_orientation,
            "bracket_centres" => self.centres,
            "channel_family" => self.channel,
            "overridden" => self.overridden,
            "evaluated" => self.evaluated,
            "pruned" => self.pruned
        )
    }
}

fn sweep(
    start: ReplayToken,
    count: usize,
    out: &Path,
    channels: Option<&Path>,
    cfg: SearchCfg,
) -> Result<()> {
    let catalog = catalog_from(channels)?;
    let scenarios = ScenarioCfg::default();
    let mut table = SweepTable::default();
    let mut feasible = 0usize;
    for (tok, inputs) in sample_batch(&scenarios, start, count) {
        let outcome = optimize_with_catalog(&inputs, &catalog, cfg);
        match &outcome {
            Ok(_) => feasible += 1,
            Err(e) => {
                tracing::debug!(seed = tok.seed, index = tok.index, error = %e, "scenario failed")
            }
        }
        table.push(tok, &inputs, &outcome);
    }
    tracing::info!(count, feasible, out = %out.display(), "sweep done");

    let mut df = table.into_frame()?;
    ensure_parent(out)?;
    let mut file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("writing {}", out.display()))?;
    let mut payload = Payload::new(
        "sweep",
        json!({
            "seed": start.seed,
            "start": start.index,
            "count": count,
            "prune": cfg.prune,
            "feasible": feasible,
        }),
    );
    if let Some(p) = channels {
        payload = payload.with_input(p);
    }
    write_sidecar(out, payload)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn optimize_file_writes_result_and_sidecar() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("inputs.json");
        let inputs = DesignInputs::new(250.0, 100.0, -160.0, 3.0);
        fs::write(&input, serde_json::to_vec(&inputs).unwrap()).unwrap();
        let out = dir.path().join("out").join("result.json");
        let result = optimize_file(&input, &out, None, SearchCfg::default()).unwrap();
        let written: serde_json::Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
        assert_eq!(
            written["selected"]["weight"].as_f64().unwrap(),
            result.selected.weight
        );
        assert!(dir.path().join("out").join("result.provenance.json").exists());
    }

    #[test]
    fn minimal_json_inputs_use_defaults() {
        let inputs: DesignInputs = serde_json::from_str(
            r#"{"slab_thickness": 250, "cavity_width": 100, "support_level": -160,
                "characteristic_load": 3.0}"#,
        )
        .unwrap();
        assert_eq!(inputs, DesignInputs::new(250.0, 100.0, -160.0, 3.0));
    }

    #[test]
    fn sweep_writes_one_row_per_scenario() {
        let dir = tempdir().unwrap();
        let out = dir.path().join("sweep.csv");
        sweep(ReplayToken::new(1, 0), 4, &out, None, SearchCfg::default()).unwrap();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(out.clone()))
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(df.height(), 4);
        assert!(df.column("status").is_ok());
        assert!(dir.path().join("sweep.provenance.json").exists());
    }
}
