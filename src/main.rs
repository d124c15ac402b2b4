#![warn(clippy::all)]

// main entry point
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use env_logger::Env;
use log::{error, info, warn, LevelFilter};

use hostcap::commands::BandwidthLimiter;
use hostcap::error::StartupError;
use hostcap::settings::limits::parse_mbps;
use hostcap::settings::{Settings, SettingsBuilder};
use hostcap::{LimiterError, Result};

mod console;

/// How often the main thread checks whether the limiter is still running
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Limit the download and upload bandwidth of the whole host.
#[derive(Parser, Debug)]
#[command(name = "hostcap", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Download limit in Mbps (0 = unlimited)
    #[arg(short, long, value_name = "MBPS", value_parser = parse_mbps)]
    download_mbps: Option<f64>,

    /// Upload limit in Mbps (0 = unlimited)
    #[arg(short, long, value_name = "MBPS", value_parser = parse_mbps)]
    upload_mbps: Option<f64>,

    /// WinDivert filter selecting the packets to shape
    #[arg(short, long)]
    filter: Option<String>,

    /// WinDivert handle priority
    #[arg(long, allow_negative_numbers = true)]
    priority: Option<i16>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Don't read commands from stdin
    #[arg(long)]
    no_console: bool,
}

/// Initialize the application logger
///
/// Logs to stdout as `[HH:MM:SS.mmm] LEVEL - target: message`, at info
/// level unless `RUST_LOG` or `--verbose` say otherwise.
fn init_logger(verbose: bool) -> std::result::Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
}

/// Main entry point for hostcap
fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logger(cli.verbose) {
        eprintln!("Failed to initialize logger: {}", e);
        return ExitCode::FAILURE;
    }

    info!("hostcap starting up");

    match run(&cli) {
        Ok(()) => {
            info!("hostcap stopped");
            ExitCode::SUCCESS
        }
        Err(LimiterError::Startup(StartupError::PrivilegeRequired)) => {
            error!("hostcap requires administrator privileges to intercept packets. Please run as administrator.");
            ExitCode::FAILURE
        }
        Err(e) if e.is_startup() => {
            error!("Failed to start: {}", e);
            ExitCode::FAILURE
        }
        Err(LimiterError::Capture(e)) => {
            error!("Limiter stopped after a capture failure: {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the configuration file, if any, and applies command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let base = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let mut builder = SettingsBuilder::from_settings(base);
    if let Some(mbps) = cli.download_mbps {
        builder = builder.download_mbps(mbps);
    }
    if let Some(mbps) = cli.upload_mbps {
        builder = builder.upload_mbps(mbps);
    }
    if let Some(filter) = &cli.filter {
        builder = builder.filter(filter.as_str());
    }
    if let Some(priority) = cli.priority {
        builder = builder.priority(priority);
    }

    let settings = builder.build();
    settings.validate()?;
    Ok(settings)
}

fn run(cli: &Cli) -> Result<()> {
    let settings = load_settings(cli)?;
    let limiter = Arc::new(BandwidthLimiter::from_settings(&settings)?);

    let interrupted = limiter.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received, stopping");
        interrupted.stop();
    })
    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    limiter.start()?;
    match limiter.status() {
        Ok(status) => info!("{}", status),
        Err(e) => warn!("Failed to read status: {}", e),
    }

    if !cli.no_console {
        let console_limiter = limiter.clone();
        thread::Builder::new()
            .name("hostcap-console".to_string())
            .spawn(move || console::run_console(&console_limiter, io::stdin().lock(), io::stdout()))?;
    }

    while limiter.is_running() {
        thread::sleep(POLL_INTERVAL);
    }

    limiter.join()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "hostcap",
            "--download-mbps",
            "10",
            "--upload-mbps",
            "2.5",
            "--filter",
            "tcp",
            "--priority",
            "-3",
        ]);

        let settings = load_settings(&cli).unwrap();

        assert_eq!(settings.limits.download_mbps, 10.0);
        assert_eq!(settings.limits.upload_mbps, 2.5);
        assert_eq!(settings.capture.filter, "tcp");
        assert_eq!(settings.capture.priority, -3);
    }

    #[test]
    fn test_cli_rejects_negative_limits() {
        let result = Cli::try_parse_from(["hostcap", "--download-mbps", "-5"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["hostcap", "--upload-mbps", "lots"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["hostcap"]);

        assert!(!cli.verbose);
        assert!(!cli.no_console);
        assert_eq!(load_settings(&cli).unwrap(), Settings::default());
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::parse_from(["hostcap", "--config", "/nonexistent/hostcap.toml"]);
        assert!(matches!(load_settings(&cli), Err(LimiterError::Io(_))));
    }
}
