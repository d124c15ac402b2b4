//! Interactive stdin console of the binary.
//!
//! One command per line:
//!
//! * `limit <download_mbps> <upload_mbps>` - change both limits
//! * `status` - print the limiter status as JSON
//! * `stats` - print per-direction statistics as JSON
//! * `stop` / `quit` - stop the limiter
//! * `help` - list commands

use std::io::{BufRead, Write};

use log::{debug, error};

use hostcap::commands::BandwidthLimiter;
use hostcap::network::core::SourceOpener;
use hostcap::settings::limits::parse_mbps;

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Limit { download_mbps: f64, upload_mbps: f64 },
    Status,
    Stats,
    Stop,
    Help,
}

const HELP: &str = "commands: limit <download_mbps> <upload_mbps> | status | stats | stop | help";

/// Parses one console line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Option<Result<ConsoleCommand, String>> {
    let mut words = line.split_whitespace();
    let command = words.next()?;

    let parsed = match command.to_ascii_lowercase().as_str() {
        "limit" => match (words.next(), words.next(), words.next()) {
            (Some(download), Some(upload), None) => parse_mbps(download).and_then(|download_mbps| {
                parse_mbps(upload).map(|upload_mbps| ConsoleCommand::Limit {
                    download_mbps,
                    upload_mbps,
                })
            }),
            _ => Err("usage: limit <download_mbps> <upload_mbps>".to_string()),
        },
        "status" => Ok(ConsoleCommand::Status),
        "stats" => Ok(ConsoleCommand::Stats),
        "stop" | "quit" | "exit" => Ok(ConsoleCommand::Stop),
        "help" | "?" => Ok(ConsoleCommand::Help),
        other => Err(format!("unknown command '{}', try 'help'", other)),
    };
    Some(parsed)
}

/// Runs one command against the limiter and writes its reply.
///
/// Returns `false` once the console should stop reading.
pub fn execute<O: SourceOpener>(
    limiter: &BandwidthLimiter<O>,
    command: ConsoleCommand,
    output: &mut impl Write,
) -> std::io::Result<bool> {
    match command {
        ConsoleCommand::Limit {
            download_mbps,
            upload_mbps,
        } => match limiter.set_limits(download_mbps, upload_mbps) {
            Ok(()) => writeln!(output, "ok")?,
            Err(e) => writeln!(output, "error: {}", e)?,
        },
        ConsoleCommand::Status => match limiter.status() {
            Ok(status) => writeln!(output, "{}", to_json(&status))?,
            Err(e) => writeln!(output, "error: {}", e)?,
        },
        ConsoleCommand::Stats => match limiter.statistics() {
            Ok(statistics) => writeln!(output, "{}", to_json(&statistics))?,
            Err(e) => writeln!(output, "error: {}", e)?,
        },
        ConsoleCommand::Stop => {
            limiter.stop();
            writeln!(output, "stopping")?;
            return Ok(false);
        }
        ConsoleCommand::Help => writeln!(output, "{}", HELP)?,
    }
    Ok(true)
}

fn to_json(value: &impl serde::Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

/// Reads commands until end of input, a stop command, or the limiter
/// stopping on its own.
pub fn run_console<O: SourceOpener>(
    limiter: &BandwidthLimiter<O>,
    input: impl BufRead,
    mut output: impl Write,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read console input: {}", e);
                break;
            }
        };

        let keep_going = match parse_command(&line) {
            None => Ok(true),
            Some(Ok(command)) => execute(limiter, command, &mut output),
            Some(Err(message)) => writeln!(output, "error: {}", message).map(|_| true),
        };

        match keep_going.and_then(|keep_going| output.flush().map(|_| keep_going)) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                error!("Failed to write console output: {}", e);
                break;
            }
        }
    }
    debug!("Console closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_limit() {
        assert_eq!(
            parse_command("limit 10 5"),
            Some(Ok(ConsoleCommand::Limit {
                download_mbps: 10.0,
                upload_mbps: 5.0
            }))
        );
        assert_eq!(
            parse_command("  LIMIT 0 2.5 "),
            Some(Ok(ConsoleCommand::Limit {
                download_mbps: 0.0,
                upload_mbps: 2.5
            }))
        );
    }

    #[test]
    fn test_parse_rejects_bad_limits() {
        assert!(matches!(parse_command("limit -1 5"), Some(Err(_))));
        assert!(matches!(parse_command("limit 10"), Some(Err(_))));
        assert!(matches!(parse_command("limit 1 2 3"), Some(Err(_))));
        assert!(matches!(parse_command("limit a b"), Some(Err(_))));
    }

    #[test]
    fn test_parse_other_commands() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("status"), Some(Ok(ConsoleCommand::Status)));
        assert_eq!(parse_command("quit"), Some(Ok(ConsoleCommand::Stop)));
        assert!(matches!(parse_command("reboot"), Some(Err(_))));
    }

    #[test]
    fn test_console_session() {
        let limiter = BandwidthLimiter::new();
        let input = "limit 10 5\n\nstatus\nbogus\nstop\nstatus\n".as_bytes();
        let mut output = Vec::new();

        run_console(&limiter, input, &mut output);

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "ok");
        assert!(lines[1].contains("\"phase\":\"stopped\""));
        assert!(lines[1].contains("\"download_mbps\":10.0"));
        assert!(lines[2].starts_with("error: unknown command"));
        assert_eq!(lines[3], "stopping");
        // Nothing is read after stop
        assert_eq!(lines.len(), 4);
    }
}
