//! webserverd - detached web server supervisor
//!
//! Starts a web server in the background, tracks it through a PID file,
//! and stops, restarts or reports on it from later invocations.

use clap::{Parser, Subcommand};
use webserverd_core::{error::DaemonError, init_logging};

mod cli;

use cli::ConfigArgs;

#[derive(Parser)]
#[command(name = "webserverd")]
#[command(about = "Supervise a detached web server through a PID file")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Print the outcome as JSON instead of a status line
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server unless it is already running
    Start,
    /// Stop the running web server
    Stop,
    /// Stop (if running) and start the web server again
    Restart,
    /// Show whether the web server is running
    Status,
    /// Print the identifier of the supervised process
    Pid,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli::log_level(cli.verbose)) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(2);
    }

    let result = cli::load_config(&cli.config).and_then(|config| {
        let mut supervisor = webserverd_core::Supervisor::new(config)?;
        match cli.command {
            Commands::Start => cli::daemon::run_start(&mut supervisor, cli.json),
            Commands::Stop => cli::daemon::run_stop(&mut supervisor, cli.json),
            Commands::Restart => cli::daemon::run_restart(&mut supervisor, cli.json),
            Commands::Status => cli::daemon::run_status(&mut supervisor, cli.json),
            Commands::Pid => cli::daemon::run_pid(&mut supervisor, cli.json),
        }
    });

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let exit_code = match e {
                // Configuration errors (exit code 2)
                DaemonError::Config(_) | DaemonError::Toml(_) | DaemonError::TomlSerialize(_) => 2,
                // Launch and environment failures (exit code 1 - runtime)
                DaemonError::Launch(_) | DaemonError::Environment(_) => 1,
                // IO errors (exit code 1 - runtime)
                DaemonError::Io(_) => 1,
            };

            eprintln!("{}", e);
            std::process::exit(exit_code);
        }
    }
}
