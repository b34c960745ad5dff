use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dermaclass::commands;
use dermaclass::config::Config;
use dermaclass::state::ClassifierState;
use log::{info, LevelFilter};
use rayon::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about = "Classify skin lesion images with a pre-trained model", long_about = None)]
struct Args {
    #[arg(required = true, help = "Images (.jpg, .jpeg or .png) to upload and classify")]
    images: Vec<PathBuf>,

    #[arg(long, help = "JSON config file; any field left out keeps its default")]
    config: Option<PathBuf>,

    #[arg(long, help = "Path to the ONNX classifier, overriding the config file")]
    model: Option<PathBuf>,

    #[arg(long, help = "Directory uploads are saved to, overriding the config file")]
    uploads_dir: Option<PathBuf>,

    #[arg(long, help = "Print one JSON object per image instead of text")]
    json: bool,

    #[arg(long, default_value = "info", help = "Log level: off, error, warn, info, debug or trace")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let log_level: LevelFilter = args.log_level.parse()
        .map_err(|_| anyhow::anyhow!("Invalid log level {:?}", args.log_level))?;

    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log_level)
        .parse_default_env()
        .init();

    let mut config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to read config {:?}", path))?,
        None => Config::default(),
    };
    if let Some(model) = args.model {
        config.model_path = model;
    }
    if let Some(uploads_dir) = args.uploads_dir {
        config.uploads_dir = uploads_dir;
    }

    // Startup errors (missing model, class table drift, bad config) end the process here.
    let state = ClassifierState::from_config(&config).context("Failed to start the classifier")?;
    info!("Classifying {} image(s); uploads are saved to {:?}", args.images.len(), state.uploads.root());

    // The pipeline is read-only, so requests can run side by side. Results keep the input order.
    let results: Vec<_> = args.images
        .par_iter()
        .map(|path| commands::classify_path(path, &state))
        .collect();

    let mut stdout = std::io::stdout().lock();
    for result in results
    {
        match (result, args.json)
        {
            (Ok(report), true) => writeln!(stdout, "{}", serde_json::to_string(&report)?)?,
            (Ok(report), false) => writeln!(stdout, "{}\n", report)?,
            (Err(rejection), true) => writeln!(stdout, "{}", serde_json::to_string(&rejection)?)?,
            (Err(rejection), false) => writeln!(stdout, "{}\n{}\n", rejection.filename, rejection.error)?,
        }
    }

    Ok(())
}
