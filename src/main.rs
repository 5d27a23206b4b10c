use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Instant;

use clap::{Parser, Subcommand};
use env_logger::{Builder, Env};
use log::{debug, info, LevelFilter};
use sysinfo::{get_current_pid, ProcessExt, System, SystemExt};

use mental_health_risk::batch::score_batch;
use mental_health_risk::config::{AppConfig, ArtifactPaths};
use mental_health_risk::error::RiskError;
use mental_health_risk::report;
use mental_health_risk::training;
use mental_health_risk::{ScoringContext, SurveyResponse};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(short, long, parse(from_os_str), default_value = "config/config.toml",
    help = "Configuration file")]
    config: PathBuf,
    #[clap(short, long, parse(from_occurrences),
    help = "Verbose level")]
    verbose: usize,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the classifier from a survey CSV and save its artifacts
    Train {
        #[clap(short, long, parse(from_os_str), help = "Survey responses CSV")]
        data: Option<PathBuf>,
        #[clap(short, long, parse(from_os_str), help = "Artifact directory")]
        artifacts: Option<PathBuf>,
        #[clap(short, long, parse(from_os_str),
        help = "Write the encoded training frame as parquet")]
        gold: Option<PathBuf>,
    },
    /// Score one survey response given as JSON
    Predict {
        #[clap(short, long, parse(from_os_str), help = "Survey response JSON")]
        input: PathBuf,
        #[clap(short, long, parse(from_os_str), help = "Artifact directory")]
        artifacts: Option<PathBuf>,
    },
    /// Score every row of a survey CSV
    Batch {
        #[clap(short, long, parse(from_os_str), help = "Survey responses CSV")]
        input: PathBuf,
        #[clap(short, long, parse(from_os_str), help = "Predictions CSV")]
        output: PathBuf,
        #[clap(short, long, parse(from_os_str), help = "Artifact directory")]
        artifacts: Option<PathBuf>,
    },
}

/// Resident memory of this process in bytes, 0 if unavailable.
fn monitor_memory() -> u64 {
    let mut sys = System::new();
    match get_current_pid() {
        Ok(pid) => {
            sys.refresh_process(pid);
            sys.process(pid).map(|p| p.memory()).unwrap_or(0)
        }
        Err(_) => 0,
    }
}

fn artifact_paths(config: &AppConfig, dir: Option<PathBuf>) -> ArtifactPaths {
    match dir {
        Some(dir) => ArtifactPaths::in_dir(dir, &config.artifacts),
        None => config.artifacts.paths(),
    }
}

#[tokio::main]
async fn main() -> Result<(), RiskError> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)?;

    let log_level = match cli.verbose {
        0 => LevelFilter::from_str(&config.logging.level).unwrap_or(LevelFilter::Info),
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter("MHR_LOG");
    Builder::new()
        .filter(Some("mental_health_risk"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    run(cli.command, config).await
}

async fn run(command: Command, mut config: AppConfig) -> Result<(), RiskError> {
    match command {
        Command::Train {
            data,
            artifacts,
            gold,
        } => {
            if let Some(data) = data {
                config.training.data_path = data.to_string_lossy().into_owned();
            }
            if let Some(gold) = gold {
                config.training.gold_path = Some(gold.to_string_lossy().into_owned());
            }
            let paths = artifact_paths(&config, artifacts);

            let start_time = Instant::now();
            let start_memory = monitor_memory();

            let outcome = training::train(&config.training, &paths).await?;

            println!("{}", outcome.report);
            if let Some(cv) = outcome.cv_accuracy {
                println!("Cross-validation accuracy: {:.3}", cv);
            }

            let end_memory = monitor_memory();
            info!(
                "Trained on {} rows, evaluated on {} rows in {:?}, memory delta {} bytes",
                outcome.train_rows,
                outcome.test_rows,
                start_time.elapsed(),
                end_memory.saturating_sub(start_memory)
            );
        }
        Command::Predict { input, artifacts } => {
            let paths = artifact_paths(&config, artifacts);
            let context = ScoringContext::load(&paths).await?;

            let bytes = tokio::fs::read(&input).await?;
            let response: SurveyResponse = serde_json::from_slice(&bytes)?;

            let label = context.score(&response.answers)?;
            println!("{}", report::render(response.name.as_deref(), label));
        }
        Command::Batch {
            input,
            output,
            artifacts,
        } => {
            let paths = artifact_paths(&config, artifacts);
            let context = ScoringContext::load(&paths).await?;

            let reader = File::open(&input)?;
            let writer = BufWriter::new(File::create(&output)?);
            let summary = score_batch(&context, reader, writer)?;

            println!(
                "Wrote {} predictions to {} ({} high, {} low, {} failed)",
                summary.total(),
                output.display(),
                summary.high,
                summary.low,
                summary.failed
            );
        }
    }

    Ok(())
}
