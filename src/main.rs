mod app;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use eframe::egui;

use app::YieldscopeApp;
use yieldscope::config::Settings;
use yieldscope::data::filter::RecordFilter;
use yieldscope::data::ingest::{format_field, ingest_file};
use yieldscope::data::loader;
use yieldscope::data::model::YieldType;
use yieldscope::physics::ParametricNrModel;
use yieldscope::render::{self, DEFAULT_DIFF_FILE, DEFAULT_FIGURE_FILE};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "yieldscope", version, about = "Liquid xenon yield data vs. a recoil yield model")]
struct Cli {
    /// JSON settings file (column names, missing markers, detector).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a CSV/Parquet table into one JSON record per drift field.
    Ingest {
        input: PathBuf,
        /// `charge` or `light`.
        #[arg(long)]
        yield_type: YieldType,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print the records matching a glob pattern.
    List {
        pattern: String,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Draw one record against the model.
    Plot {
        record: PathBuf,
        #[arg(long, default_value = DEFAULT_FIGURE_FILE)]
        out: PathBuf,
    },
    /// Draw every matching record as one page; long batches are split
    /// into numbered files.
    Batch {
        pattern: String,
        #[arg(long)]
        out: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Plot the percent error of every matching record against drift field.
    Diffs {
        pattern: String,
        #[arg(long, default_value = DEFAULT_DIFF_FILE)]
        out: PathBuf,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Open the interactive viewer, optionally preloading records.
    View { pattern: Option<String> },
}

/// Record selection flags shared by `list`, `batch` and `diffs`.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Lowest drift field [V/cm], inclusive.
    #[arg(long)]
    field_min: Option<f64>,
    /// Highest drift field [V/cm], inclusive.
    #[arg(long)]
    field_max: Option<f64>,
    /// Lowest recoil energy [keV] every sample must reach.
    #[arg(long)]
    energy_min: Option<f64>,
    /// Highest recoil energy [keV] no sample may exceed.
    #[arg(long)]
    energy_max: Option<f64>,
    /// Interaction type, matched exactly (e.g. NR).
    #[arg(long)]
    interaction: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self) -> RecordFilter {
        RecordFilter {
            field: bounds(self.field_min, self.field_max),
            energy: bounds(self.energy_min, self.energy_max),
            interaction_type: self.interaction.clone(),
        }
    }
}

/// A one-sided bound leaves the other side open.
fn bounds(low: Option<f64>, high: Option<f64>) -> Option<(f64, f64)> {
    match (low, high) {
        (None, None) => None,
        (low, high) => Some((
            low.unwrap_or(f64::NEG_INFINITY),
            high.unwrap_or(f64::INFINITY),
        )),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("failed to read settings")?;
    let model = ParametricNrModel::new(settings.detector.clone());

    match cli.command {
        Command::Ingest {
            input,
            yield_type,
            out_dir,
        } => {
            let written = ingest_file(&input, yield_type, &out_dir, &settings)
                .with_context(|| format!("failed to ingest {}", input.display()))?;
            for path in &written {
                println!("{}", path.display());
            }
        }
        Command::List { pattern, filter } => {
            let records = filter.to_filter().select(&loader::load_all(&pattern)?);
            for r in &records {
                println!(
                    "{}\t{} V/cm\t{}\t{}\t{} samples",
                    r.identification,
                    format_field(r.field),
                    r.yield_type,
                    r.interaction_type,
                    r.len()
                );
            }
        }
        Command::Plot { record, out } => {
            let record = loader::load_record(&record)?;
            render::render(&model, &record, Some(&out))
                .with_context(|| format!("failed to plot {}", record.identification))?;
        }
        Command::Batch {
            pattern,
            out,
            filter,
        } => {
            let records = filter.to_filter().select(&loader::load_all(&pattern)?);
            let written = render::render_batch(&model, &records, &out)
                .with_context(|| format!("failed to write {}", out.display()))?;
            for path in &written {
                println!("{}", path.display());
            }
        }
        Command::Diffs {
            pattern,
            out,
            filter,
        } => {
            let records = filter.to_filter().select(&loader::load_all(&pattern)?);
            render::render_diffs(&model, &records, &out)
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
        Command::View { pattern } => {
            let mut app = YieldscopeApp::new(model);
            if let Some(pattern) = pattern {
                app.state.set_records(loader::load_all(&pattern)?);
            }
            run_viewer(app)?;
        }
    }
    Ok(())
}

fn run_viewer(app: YieldscopeApp) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Yieldscope – Yield Comparison",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
    .map_err(|e| anyhow::anyhow!("viewer failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_sided_bounds_stay_open() {
        assert_eq!(bounds(None, None), None);
        assert_eq!(bounds(Some(100.0), None), Some((100.0, f64::INFINITY)));
        assert_eq!(bounds(None, Some(5.0)), Some((f64::NEG_INFINITY, 5.0)));
    }

    #[test]
    fn filter_flags_parse() {
        let cli = Cli::parse_from([
            "yieldscope",
            "batch",
            "records/*.json",
            "--out",
            "all.svg",
            "--field-min",
            "200",
            "--interaction",
            "NR",
        ]);
        let Command::Batch { filter, out, .. } = cli.command else {
            panic!("expected batch");
        };
        assert_eq!(out, PathBuf::from("all.svg"));
        let f = filter.to_filter();
        assert_eq!(f.field, Some((200.0, f64::INFINITY)));
        assert_eq!(f.energy, None);
        assert_eq!(f.interaction_type.as_deref(), Some("NR"));
    }

    #[test]
    fn diffs_defaults_its_output_file() {
        let cli = Cli::parse_from(["yieldscope", "diffs", "records/*.json", "--field-max", "1000"]);
        let Command::Diffs { pattern, out, filter } = cli.command else {
            panic!("expected diffs");
        };
        assert_eq!(pattern, "records/*.json");
        assert_eq!(out, PathBuf::from(DEFAULT_DIFF_FILE));
        assert_eq!(filter.to_filter().field, Some((f64::NEG_INFINITY, 1000.0)));
    }

    #[test]
    fn yield_type_is_validated() {
        assert!(Cli::try_parse_from(["yieldscope", "ingest", "t.csv", "--yield-type", "heat"]).is_err());
        let cli = Cli::parse_from(["yieldscope", "ingest", "t.csv", "--yield-type", "light"]);
        assert!(matches!(
            cli.command,
            Command::Ingest { yield_type: YieldType::Light, .. }
        ));
    }
}
