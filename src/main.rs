use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facs_fusion::device::{DeviceClient, DeviceCommand};
use facs_fusion::recorder::CsvRecorder;
use facs_fusion::{replay, EmotionEngine, EngineConfig};
use tracing::info;

#[derive(Parser)]
#[command(name = "facs-fusion-cli")]
#[command(about = "Expression fusion and stable emotion detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded raw channel weights through the engine
    Replay {
        /// CSV with one raw channel per column
        #[arg(short, long)]
        input: PathBuf,
        /// Where to write the time/AU/score CSV
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON engine config (defaults apply to missing fields)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Seconds per row
        #[arg(long, default_value_t = 0.1)]
        dt: f32,
    },
    /// Send a command to the remote device
    Send {
        #[arg(short, long)]
        target: String, // e.g., 192.168.0.201:5005
        /// FEED_PET or TOGGLE_LIGHT
        #[arg(short = 'm', long)]
        command: String,
        /// Keep the connection open this long to log replies
        #[arg(long, default_value_t = 1)]
        linger_secs: u64,
    },
    /// Print the default engine config as JSON
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facs_fusion=info,facs_fusion_cli=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            input,
            output,
            config,
            dt,
        } => {
            let config = match config {
                Some(path) => EngineConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => EngineConfig::default(),
            };

            let file = File::open(&input)
                .with_context(|| format!("Failed to open {}", input.display()))?;
            let samples = replay::read_samples(BufReader::new(file))
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            info!("loaded {} samples from {}", samples.len(), input.display());

            let mut engine = EmotionEngine::new(config);
            let summary = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let mut recorder = CsvRecorder::new(BufWriter::new(file));
                    recorder.start();
                    let summary = replay::run(&mut engine, &samples, dt, Some(&mut recorder))?;
                    recorder.into_inner()?;
                    summary
                }
                None => replay::run::<BufWriter<File>>(&mut engine, &samples, dt, None)?,
            };

            println!("ticks: {}", summary.ticks);
            match summary.calibrated_at {
                Some(t) => println!("calibrated at: {:.3}s", t),
                None => println!("calibrated at: never"),
            }
            for (emotion, at) in summary.first_confirmed.iter() {
                match at {
                    Some(t) => println!("{}: confirmed at {:.3}s", emotion.as_str(), t),
                    None => println!("{}: not confirmed", emotion.as_str()),
                }
            }
            if summary.rows_recorded > 0 {
                println!("rows recorded: {}", summary.rows_recorded);
            }
        }
        Commands::Send {
            target,
            command,
            linger_secs,
        } => {
            let command: DeviceCommand = command.parse()?;
            let mut client = DeviceClient::connect(target.as_str())
                .with_context(|| format!("Failed to connect to {}", target))?;
            client.send(command)?;
            thread::sleep(Duration::from_secs(linger_secs));
            client.close();
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&EngineConfig::default())?);
        }
    }

    Ok(())
}
