use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use burnout_guard_core::{
    render_assessment, FeatureScaler, FileArtifactStore, IndicatorForm, OutputFormat, RiskModel,
    FEATURE_NAMES,
};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "burnout-guard",
    author,
    version,
    about = "Student Burnout Risk Predictor CLI"
)]
struct Cli {
    /// Directory containing the fitted artifacts (burnout_model.json, scaler.json)
    #[arg(
        long = "artifacts-dir",
        value_name = "DIR",
        default_value = "./artifacts",
        global = true
    )]
    artifacts_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one student's burnout risk from the six indicators
    Predict(PredictArgs),
    /// Show fitted artifact metadata and feature importances
    Inspect {
        /// Emit metadata as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct PredictArgs {
    /// Read the indicators from a JSON file instead of flags
    #[arg(long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Attendance percentage (40–100)
    #[arg(long, value_parser = parse_attendance)]
    attendance: Option<f64>,

    /// Weekly study time, 1 = very low .. 4 = very high
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    study_time: Option<u8>,

    /// Number of past course failures (0–4)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=4))]
    failures: Option<u8>,

    /// Health status, 1 = very poor .. 5 = excellent
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    health: Option<u8>,

    /// Social activity level, 1 = low .. 5 = high
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
    social_activity: Option<u8>,

    /// Marks trend: final grade minus initial grade (−10–10)
    #[arg(long, value_parser = parse_marks_trend, allow_negative_numbers = true)]
    marks_trend: Option<f64>,

    /// Emit the assessment as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Predict(args) => predict(&cli.artifacts_dir, args),
        Commands::Inspect { json } => inspect(&cli.artifacts_dir, json),
    }
}

fn predict(artifacts_dir: &Path, args: PredictArgs) -> Result<()> {
    let form = if let Some(path) = &args.input {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read indicator file at {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid indicator JSON in {}", path.display()))?
    } else {
        IndicatorForm {
            attendance: args.attendance,
            study_time: args.study_time,
            failures: args.failures,
            health: args.health,
            social_activity: args.social_activity,
            marks_trend: args.marks_trend,
        }
    };

    let store = FileArtifactStore::new(artifacts_dir);
    let predictor = store.predictor().with_context(|| {
        format!(
            "failed to load fitted artifacts from {}",
            artifacts_dir.display()
        )
    })?;
    let assessment = predictor.predict(&form)?;

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    print!("{}", render_assessment(&assessment, format)?);
    if args.json {
        println!();
    }
    Ok(())
}

fn inspect(artifacts_dir: &Path, json: bool) -> Result<()> {
    let artifacts = FileArtifactStore::new(artifacts_dir).load().with_context(|| {
        format!(
            "failed to load fitted artifacts from {}",
            artifacts_dir.display()
        )
    })?;
    let model = &artifacts.model;
    let importances = model.feature_importances();

    if json {
        let features: Vec<_> = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                json!({
                    "feature": name,
                    "importance": importances.map(|scores| scores[idx]),
                })
            })
            .collect();
        let metadata = json!({
            "n_features": model.n_features(),
            "n_trees": model.n_trees(),
            "scaler_features": artifacts.scaler.n_features(),
            "features": features,
        });
        println!("{}", serde_json::to_string_pretty(&metadata)?);
        return Ok(());
    }

    println!(
        "Decision forest: {} tree(s) over {} features (scaler fitted on {})",
        model.n_trees(),
        model.n_features(),
        artifacts.scaler.n_features()
    );
    for (idx, name) in FEATURE_NAMES.iter().enumerate() {
        match importances {
            Some(scores) => println!("- {name:<16} importance {score:>6.3}", score = scores[idx]),
            None => println!("- {name}"),
        }
    }
    if importances.is_none() {
        println!("Feature importance not available for this model.");
    }
    Ok(())
}

fn parse_attendance(raw: &str) -> Result<f64, String> {
    parse_bounded(raw, 40.0, 100.0)
}

fn parse_marks_trend(raw: &str) -> Result<f64, String> {
    parse_bounded(raw, -10.0, 10.0)
}

fn parse_bounded(raw: &str, min: f64, max: f64) -> Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a number"))?;
    if !(min..=max).contains(&value) {
        return Err(format!("{value} is not in {min}..={max}"));
    }
    Ok(value)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
