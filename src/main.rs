//! Posture analyzer command line tool.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::info;
use posture_analyzer::{
    app::PostureApp,
    config::{Config, EXAMPLE_CONFIG},
};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Verdict sentence
    Text,
    /// YAML summary
    Yaml,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Video file to analyze
    #[arg(short, long, required_unless_present = "example_config")]
    video: Option<PathBuf>,

    /// Write an annotated copy of the video here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Pose landmark ONNX model, overrides the configuration
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Share of correct frames needed for a correct verdict (0.0-1.0)
    #[arg(long)]
    min_correct_ratio: Option<f64>,

    /// Result format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("loading {}", path.display()))?
        }
        None => Config::default(),
    };
    if let Some(model) = args.model {
        config.models.pose_landmarks = model;
    }
    if let Some(ratio) = args.min_correct_ratio {
        config.aggregation.min_correct_ratio = ratio;
    }

    let video = args.video.context("--video is required")?;

    let mut app = PostureApp::new(config)?;
    let verdict = app.analyze(&video, args.output.as_deref())?;

    match args.format {
        OutputFormat::Text => println!("{verdict}"),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&verdict)?),
    }

    Ok(())
}
