//! siteml command-line tool: train a model from a config file, or serve a
//! prediction from saved artifacts.

use clap::{Parser, Subcommand};
use siteml::artifact::ArtifactStore;
use siteml::config::PipelineConfig;
use siteml::inference::{parse_request, InferenceService, PredictionResponse};
use siteml::logging::{init_logging, LogFormat};
use siteml::trainer::TrainingPipeline;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "siteml")]
#[command(about = "Construction project outcome prediction", version)]
struct Cli {
    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train, select and save the best model
    Train {
        /// Pipeline configuration (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Predict from a JSON request
    Predict {
        /// Directory holding preprocessor.bin and model.bin
        #[arg(short, long, default_value = "artifacts")]
        artifacts: PathBuf,

        /// JSON file with one request object or an array of them; `-` reads stdin
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Give up on a request after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let result = match cli.command {
        Commands::Train { config } => train(config),
        Commands::Predict {
            artifacts,
            input,
            timeout_ms,
        } => predict(artifacts, &input, timeout_ms.map(Duration::from_millis)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn train(config: PathBuf) -> siteml::Result<()> {
    let config = PipelineConfig::from_file(config)?;
    let report = TrainingPipeline::new(config).run()?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn predict(artifacts: PathBuf, input: &str, timeout: Option<Duration>) -> siteml::Result<()> {
    let service = InferenceService::load(&ArtifactStore::new(artifacts))?;

    let body = if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(input)?
    };

    let respond = |request: &str| -> PredictionResponse {
        match parse_request(request) {
            Ok(record) => match timeout {
                Some(limit) => service.respond_with_timeout(&record, limit),
                None => service.respond(&record),
            },
            Err(e) => {
                warn!(error = %e, "malformed prediction request");
                PredictionResponse::failure()
            }
        }
    };

    let output = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Array(requests)) => {
            let responses: Vec<PredictionResponse> =
                requests.iter().map(|r| respond(&r.to_string())).collect();
            serde_json::to_string_pretty(&responses)?
        }
        _ => serde_json::to_string_pretty(&respond(&body))?,
    };
    println!("{output}");
    service.shutdown();
    Ok(())
}
