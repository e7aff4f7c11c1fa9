use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use lablink_framing::{DataStrategy, Length, StopCondition, Termination, Timeout};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod query;
pub mod read;
pub mod respond;
pub mod version;
pub mod write;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a command and collect its framed answer.
    Query(QueryArgs),
    /// Collect one framed answer without sending anything.
    Read(ReadArgs),
    /// Send bytes verbatim.
    Write(WriteArgs),
    /// Serve scripted answers, for exercising clients without an instrument.
    Respond(RespondArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Query(args) => query::run(args, format),
        Command::Read(args) => read::run(args, format),
        Command::Write(args) => write::run(args, format),
        Command::Respond(args) => respond::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum TransportKind {
    Tcp,
    Udp,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum StrategyArg {
    /// Drop the collected bytes.
    Discard,
    /// Return the collected bytes as the answer.
    Return,
    /// Keep the collected bytes for the next read.
    Store,
}

impl From<StrategyArg> for DataStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Discard => DataStrategy::Discard,
            StrategyArg::Return => DataStrategy::Return,
            StrategyArg::Store => DataStrategy::Store,
        }
    }
}

/// How a read decides it has a complete answer. Timing flags apply unless
/// `--length` or `--termination` selects a content rule instead.
#[derive(Args, Debug)]
pub struct FramingArgs {
    /// Deadline for the first answer fragment (e.g. 5s, 500ms).
    #[arg(long, default_value = "1s")]
    pub response: String,

    /// Longest allowed gap between answer fragments.
    #[arg(long, default_value = "100ms")]
    pub continuation: String,

    /// Hard ceiling on the whole read, counted from its start.
    #[arg(long)]
    pub total: Option<String>,

    /// What to do with collected bytes when the response deadline expires.
    #[arg(long, value_enum, default_value_t = StrategyArg::Discard)]
    pub on_response: StrategyArg,

    /// What to do with collected bytes when the continuation gap expires.
    #[arg(long, value_enum, default_value_t = StrategyArg::Return)]
    pub on_continuation: StrategyArg,

    /// What to do with collected bytes when the total ceiling expires.
    #[arg(long, value_enum, default_value_t = StrategyArg::Discard)]
    pub on_total: StrategyArg,

    /// Stop after exactly N bytes; surplus is kept for the next read.
    #[arg(long, conflicts_with_all = ["termination", "term_inclusive"])]
    pub length: Option<usize>,

    /// Stop at this byte sequence (supports \n, \r, \t, \0, \xNN escapes).
    #[arg(long)]
    pub termination: Option<String>,

    /// Keep the terminator in the returned answer.
    #[arg(long, requires = "termination")]
    pub term_inclusive: bool,
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Instrument address as host:port.
    pub address: String,
    /// Transport protocol.
    #[arg(long, value_enum, default_value_t = TransportKind::Tcp)]
    pub transport: TransportKind,
    /// Command string (supports \n, \r, \t, \0, \xNN escapes).
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the command from a file, verbatim.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub framing: FramingArgs,
}

#[derive(Args, Debug)]
pub struct ReadArgs {
    /// Instrument address as host:port.
    pub address: String,
    /// Transport protocol.
    #[arg(long, value_enum, default_value_t = TransportKind::Tcp)]
    pub transport: TransportKind,
    #[command(flatten)]
    pub framing: FramingArgs,
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// Instrument address as host:port.
    pub address: String,
    /// Transport protocol.
    #[arg(long, value_enum, default_value_t = TransportKind::Tcp)]
    pub transport: TransportKind,
    /// Payload string (supports \n, \r, \t, \0, \xNN escapes).
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the payload from a file, verbatim.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RespondArgs {
    /// Address to bind, as host:port (port 0 picks a free one).
    pub address: String,
    /// Transport protocol.
    #[arg(long, value_enum, default_value_t = TransportKind::Tcp)]
    pub transport: TransportKind,
    /// Answer script "payload,delay;payload,delay;..." with delays in
    /// seconds. Without it, the first payload each peer sends is taken as
    /// the script.
    #[arg(long)]
    pub script: Option<String>,
    /// Serve a single peer, then exit.
    #[arg(long)]
    pub once: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn build_stop_condition(args: &FramingArgs) -> CliResult<StopCondition> {
    if let Some(count) = args.length {
        if count == 0 {
            return Err(CliError::new(USAGE, "--length must be greater than zero"));
        }
        return Ok(Length::new(count).into());
    }
    if let Some(sequence) = &args.termination {
        let sequence = unescape(sequence)?;
        if sequence.is_empty() {
            return Err(CliError::new(USAGE, "--termination must not be empty"));
        }
        return Ok(Termination::new(sequence)
            .with_inclusive(args.term_inclusive)
            .into());
    }

    let mut timeout = Timeout::new(parse_duration(&args.response)?)
        .with_response_strategy(args.on_response.into())
        .with_continuation(parse_duration(&args.continuation)?)
        .with_continuation_strategy(args.on_continuation.into())
        .with_total_strategy(args.on_total.into());
    if let Some(total) = &args.total {
        timeout = timeout.with_total(parse_duration(total)?);
    }
    Ok(timeout.into())
}

pub fn resolve_payload(data: &Option<String>, file: &Option<PathBuf>) -> CliResult<Vec<u8>> {
    if let Some(data) = data {
        return unescape(data);
    }
    if let Some(path) = file {
        return std::fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}

/// Expand backslash escapes so terminators and commands can be given on a
/// shell command line.
pub fn unescape(input: &str) -> CliResult<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('0') => out.push(0),
            Some('\\') => out.push(b'\\'),
            Some('x') => {
                let (Some(hi), Some(lo)) = (chars.next(), chars.next()) else {
                    return Err(CliError::new(
                        USAGE,
                        format!("truncated \\x escape in {input:?}"),
                    ));
                };
                let mut digits = String::new();
                digits.push(hi);
                digits.push(lo);
                let byte = u8::from_str_radix(&digits, 16).map_err(|_| {
                    CliError::new(USAGE, format!("invalid \\x escape \\x{digits}"))
                })?;
                out.push(byte);
            }
            Some(other) => {
                return Err(CliError::new(USAGE, format!("unsupported escape \\{other}")))
            }
            None => return Err(CliError::new(USAGE, "dangling backslash in payload")),
        }
    }
    Ok(out)
}
