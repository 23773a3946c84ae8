//! # Isocost CLI
//!
//! Command-line interface for the isocost library.
//! Renders travel-cost isolines around a set of weighted destinations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use isocost::{
    Aggregation, BoundingBox, CalculatorKind, CostCalculator, DefaultCostMatrixProvider, Destination, Discretizer,
    ExploreOptions, ExploreStats, Explorer, RecordingSink, RenderSink, Scale, SvgSink, ViewConfig,
};
use log::{debug, error, info};
use serde::Serialize;

mod cli;

use cli::output::{check_overwrite_permission, resolve_output, write_output};
use cli::{OutputDestination, OverwriteBehavior};

/// Command-line interface for isocost
#[derive(Parser)]
#[command(name = "isocost")]
#[command(about = "Adaptive isoline explorer for weighted travel costs")]
#[command(long_about = "Draws lines of equal travel cost around a set of weighted destinations:
  isocost render places.json                 # Write places.isocost.svg
  isocost render places.json map.svg         # Write map.svg
  isocost render places.json - --format json # Stream JSON segments to stdout
  isocost cost places.json --at 48.85,2.35   # Aggregated cost from one place

Destination files hold a list of {lat, long, weight, name} records, or a
tree of {aggregate, weight, name, destinations} sets.

File Overwrite Behavior:
  By default, you'll be prompted if destination file exists
  --force                          # Overwrite without asking
  --no-clobber                     # Never overwrite, fail if file exists")]
#[command(version = env!("ISOCOST_VERSION"))]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Options shared by every subcommand that builds a cost model
#[derive(clap::Args)]
struct ModelArgs {
    /// JSON destination file
    input: PathBuf,

    /// Cost calculator: taxicab, eight-directions, euclidean, lat-corrected or haversine
    #[arg(short, long, default_value = "haversine")]
    calculator: String,

    /// Calculator parameter (rotation, diagonal cost, reference latitude or planet radius)
    #[arg(long, allow_hyphen_values = true)]
    calculator_param: Option<f64>,

    /// Aggregation applied to a flat destination list: all, any, two-of-them or tsp
    #[arg(short, long, default_value = "all")]
    aggregate: String,
}

#[derive(Subcommand)]
enum Command {
    /// Explore the cost field and write its isolines
    Render {
        #[command(flatten)]
        model: ModelArgs,

        /// Output file path, or "-" for stdout
        #[arg(default_value = "")]
        output: String,

        /// Band scale: linear, ln, log2, log10, sqrt, log (with --base) or log:<base>
        #[arg(short, long, default_value = "linear")]
        discretizer: String,

        /// Band width, in the discretizer's scale
        #[arg(long, default_value_t = 0.5)]
        step: f64,

        /// Cost at which banding starts
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset: f64,

        /// Logarithm base for the "log" discretizer
        #[arg(long)]
        base: Option<f64>,

        /// Explored box as min_lat,min_long,max_lat,max_long (default: around the destinations)
        #[arg(long, allow_hyphen_values = true)]
        bbox: Option<String>,

        /// Growth of the destinations' box, in percent
        #[arg(long, default_value_t = 50.0)]
        expand: f64,

        /// Largest cell is the view's smaller side divided by this
        #[arg(long, default_value_t = 2.0)]
        max_divisor: f64,

        /// Smallest cell is the view's smaller side divided by this
        #[arg(long, default_value_t = 80.0)]
        min_divisor: f64,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Svg)]
        format: OutputFormat,

        /// Also draw flat and fine cells
        #[arg(long)]
        draw_cells: bool,

        /// Show what would be rendered without exploring
        #[arg(long)]
        dry_run: bool,

        /// Force overwrite existing files without prompting
        #[arg(short, long, conflicts_with = "no_clobber")]
        force: bool,

        /// Never overwrite existing files (fail if destination exists)
        #[arg(long)]
        no_clobber: bool,
    },

    /// Print the aggregated cost from one place
    Cost {
        #[command(flatten)]
        model: ModelArgs,

        /// Origin as lat,long
        #[arg(long, allow_hyphen_values = true)]
        at: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
enum OutputFormat {
    Svg,
    Json,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Json => "json",
        }
    }
}

/// JSON document written by `render --format json`
#[derive(Serialize)]
struct RenderReport<'a> {
    bbox: &'a BoundingBox,
    calculator: &'static str,
    discretizer: &'a Discretizer,
    stats: &'a ExploreStats,
    #[serde(flatten)]
    render: &'a RecordingSink,
}

/// A loaded destination tree with its calculator
struct CostModel {
    destination: Destination,
    kind: CalculatorKind,
    calculator: Arc<dyn CostCalculator>,
}

impl ModelArgs {
    fn load(&self) -> Result<CostModel> {
        let aggregation: Aggregation = self.aggregate.parse()?;
        let kind: CalculatorKind = self.calculator.parse()?;
        let destination = isocost::load_destinations(&self.input, aggregation)
            .with_context(|| format!("loading destinations from {}", self.input.display()))?;

        // Without an explicit reference, lat-corrected uses the destinations' centroid
        let parameter = match (kind, self.calculator_param) {
            (CalculatorKind::LatCorrected, None) => Some(destination.centroid()?.lat()),
            (_, parameter) => parameter,
        };
        let calculator = kind.build(parameter)?;
        debug!("Loaded {} destination places, calculator {kind}", destination.places().len());

        Ok(CostModel { destination, kind, calculator })
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Stderr)
        .init();

    if cli.verbose {
        eprintln!("🗺️  Isocost v{} starting...", env!("ISOCOST_VERSION"));
    }

    match cli.command {
        Command::Render {
            model,
            output,
            discretizer,
            step,
            offset,
            base,
            bbox,
            expand,
            max_divisor,
            min_divisor,
            format,
            draw_cells,
            dry_run,
            force,
            no_clobber,
        } => {
            let cost_model = model.load()?;
            let scale = parse_scale(&discretizer, base)?;
            let discretizer = Discretizer::new(scale, step, offset)?;

            let view_config = ViewConfig {
                expand_percent: expand,
                max_divisor,
                min_divisor,
                ..Default::default()
            };
            let view = match bbox {
                Some(text) => cli::args::parse_bbox(&text)?,
                None => view_config.view_box(&cost_model.destination)?,
            };
            let mut options = view_config.explore_options(&view)?;
            options.draw_cells = draw_cells;

            let output = resolve_output(&model.input, &output, format.extension());

            if dry_run {
                eprintln!(
                    "🔍 [DRY RUN] Would render {} with {} and {discretizer:?} over {view} (cells {:.4}..{:.4} degrees) to {output:?}",
                    model.input.display(),
                    cost_model.kind,
                    options.min_size,
                    options.max_size
                );
                return Ok(());
            }

            render(cost_model, discretizer, view, options, format, output, OverwriteBehavior::from_flags(force, no_clobber))
                .await
        }
        Command::Cost { model, at } => {
            let origin = cli::args::parse_place(&at)?;
            print_cost(model.load()?, &origin).await
        }
    }
}

/// Explore the view and write the rendered document
async fn render(
    model: CostModel,
    discretizer: Discretizer,
    view: BoundingBox,
    mut options: ExploreOptions,
    format: OutputFormat,
    output: OutputDestination,
    overwrite: OverwriteBehavior,
) -> Result<()> {
    // Spinner only when stdout is free for it
    let progress = match &output {
        OutputDestination::File(file_path) => {
            check_overwrite_permission(file_path, &overwrite)?;
            eprintln!("📁 Saving to: {file_path}");
            let manager = cli::ProgressManager::new(&format!("🧭 Exploring {view}"));
            options.progress = Some(manager.callback());
            Some(manager)
        }
        OutputDestination::Stdout => None,
    };

    let provider = Arc::new(DefaultCostMatrixProvider::new(Arc::clone(&model.calculator)));
    let mut explorer = Explorer::new(model.destination, Arc::new(discretizer.clone()), provider, options)?;

    let (contents, stats) = match format {
        OutputFormat::Svg => {
            let mut sink = SvgSink::new(view);
            let stats = explore_into(&mut explorer, &mut sink).await?;
            (sink.to_svg(), stats)
        }
        OutputFormat::Json => {
            let mut sink = RecordingSink::new(vec![view.clone()]);
            let stats = explore_into(&mut explorer, &mut sink).await?;
            let report = RenderReport {
                bbox: &view,
                calculator: model.kind.name(),
                discretizer: &discretizer,
                stats: &stats,
                render: &sink,
            };
            (serde_json::to_string_pretty(&report)?, stats)
        }
    };

    if let Some(manager) = progress {
        manager.finish(&stats);
    }
    info!("Rendered {stats}");
    write_output(&output, &contents)?;
    Ok(())
}

async fn explore_into<S: RenderSink>(explorer: &mut Explorer, sink: &mut S) -> Result<ExploreStats> {
    explorer.add_markers(&mut *sink);
    Ok(explorer.explore_view(sink).await?)
}

/// Print matrix and round-trip costs from one origin
async fn print_cost(model: CostModel, origin: &isocost::Place) -> Result<()> {
    let units = model.calculator.units();
    let direct = model.destination.direct_cost(origin, model.calculator.as_ref())?;
    let centroid = model.destination.centroid()?;

    let provider = Arc::new(DefaultCostMatrixProvider::new(Arc::clone(&model.calculator)));
    let discretizer = Arc::new(Discretizer::linear(1.0, 0.0)?);
    let mut explorer = Explorer::new(model.destination, discretizer, provider, ExploreOptions::default())?;
    let cost = explorer.cost_at(origin).await?;

    println!("cost from {origin}: {}", with_units(cost, units));
    println!("round trip: {}", with_units(direct, units));
    println!("centroid: {centroid}");
    Ok(())
}

/// Scale named on the command line; `--base` overrides an inline `log:<base>`
fn parse_scale(name: &str, base: Option<f64>) -> isocost::Result<Scale> {
    match base {
        Some(_) => Scale::from_name(name.split_once(':').map_or(name, |(name, _)| name), base),
        None => name.parse(),
    }
}

fn with_units(value: f64, units: &str) -> String {
    if units.is_empty() {
        format!("{value:.4}")
    } else {
        format!("{value:.4} {units}")
    }
}
