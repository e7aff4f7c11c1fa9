mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "lablink", version, about = "Framed instrument I/O over TCP and UDP")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_subcommand() {
        let cli = Cli::try_parse_from([
            "lablink",
            "query",
            "192.168.1.5:5025",
            "--data",
            "*IDN?\\n",
            "--termination",
            "\\n",
        ])
        .expect("query args should parse");

        assert!(matches!(cli.command, Command::Query(_)));
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "lablink",
            "query",
            "192.168.1.5:5025",
            "--data",
            "*IDN?",
            "--file",
            "/tmp/cmd.bin",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_length_combined_with_termination() {
        let err = Cli::try_parse_from([
            "lablink",
            "read",
            "192.168.1.5:5025",
            "--length",
            "8",
            "--termination",
            "\\n",
        ])
        .expect_err("conflicting framing rules should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_read_with_timing_flags() {
        let cli = Cli::try_parse_from([
            "lablink",
            "read",
            "gen.lab.example:9000",
            "--response",
            "2s",
            "--continuation",
            "50ms",
            "--total",
            "5s",
            "--on-total",
            "return",
        ])
        .expect("read args should parse");

        assert!(matches!(cli.command, Command::Read(_)));
    }

    #[test]
    fn parses_respond_with_script() {
        let cli = Cli::try_parse_from([
            "lablink",
            "respond",
            "127.0.0.1:0",
            "--script",
            "PONG,0.05",
            "--once",
        ])
        .expect("respond args should parse");

        assert!(matches!(cli.command, Command::Respond(_)));
    }
}
