use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::EnvFilter;

use controller::modules::{self, Options};
use shared_resources::config::Config;

#[derive(Parser, Debug)]
#[command(name = "elevator-bank")]
#[command(version)]
#[command(about = "Multi-elevator bank simulator with a TCP command service")]
struct Args {
    /// Path to the JSON configuration (defaults to ./config.json when present).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of elevators.
    #[arg(long)]
    elevators: Option<u8>,

    /// Number of floors.
    #[arg(long)]
    floors: Option<u8>,

    /// TCP port of the command service; 0 picks a free one.
    #[arg(long)]
    port: Option<u16>,

    /// Do not start the command service.
    #[arg(long)]
    no_server: bool,

    /// Neither restore from nor write to the backup directory.
    #[arg(long)]
    no_backup: bool,

    /// Run the scripted demo.
    #[arg(long)]
    demo: bool,

    /// Print replies only, without the live status table.
    #[arg(long)]
    headless: bool,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(elevators) = self.elevators {
            config.elevator.num_elevators = elevators;
        }
        if let Some(floors) = self.floors {
            config.elevator.num_floors = floors;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if self.no_server {
            config.server.enabled = false;
        }
        if self.no_backup {
            config.backup.enabled = false;
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    setup_tracing(&args);

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    args.apply(&mut config);
    if let Err(e) = config.validate() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let options = Options { demo: args.demo, headless: args.headless };
    match modules::run(config, options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("elevator bank failed: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never scribble over the status table.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
