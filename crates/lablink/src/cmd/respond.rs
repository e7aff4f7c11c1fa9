use std::io::{Read, Write};
use std::net::{TcpListener, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cmd::{unescape, RespondArgs, TransportKind};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::OutputFormat;

// Big enough for any sane script in a single recv.
const REQUEST_BUFFER: usize = 64 * 1024;

#[derive(Clone)]
struct ScriptStep {
    payload: Vec<u8>,
    delay: Duration,
}

pub fn run(args: RespondArgs, _format: OutputFormat) -> CliResult<i32> {
    let preset = args.script.as_deref().map(parse_script).transpose()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    match args.transport {
        TransportKind::Tcp => serve_tcp(&args, preset, &running),
        TransportKind::Udp => serve_udp(&args, preset, &running),
    }
}

fn serve_tcp(
    args: &RespondArgs,
    preset: Option<Vec<ScriptStep>>,
    running: &AtomicBool,
) -> CliResult<i32> {
    let listener =
        TcpListener::bind(&args.address).map_err(|err| io_error("bind failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?;
    announce(&local.to_string());
    info!(%local, "tcp responder listening");

    while running.load(Ordering::SeqCst) {
        let (mut peer, remote) = match listener.accept() {
            Ok(pair) => pair,
            Err(err) => return Err(io_error("accept failed", err)),
        };
        debug!(%remote, "peer connected");

        let mut request = vec![0u8; REQUEST_BUFFER];
        let received = match peer.read(&mut request) {
            Ok(n) => n,
            Err(err) => {
                warn!(%remote, error = %err, "request read failed");
                continue;
            }
        };

        let steps = match select_script(&preset, &request[..received]) {
            Ok(steps) => steps,
            Err(err) => {
                warn!(%remote, error = %err, "unusable script from peer");
                continue;
            }
        };

        for step in &steps {
            thread::sleep(step.delay);
            if peer.write_all(&step.payload).is_err() {
                debug!(%remote, "peer hung up mid-script");
                break;
            }
        }

        if args.once {
            return Ok(SUCCESS);
        }
    }

    Ok(SUCCESS)
}

fn serve_udp(
    args: &RespondArgs,
    preset: Option<Vec<ScriptStep>>,
    running: &AtomicBool,
) -> CliResult<i32> {
    let socket = UdpSocket::bind(&args.address).map_err(|err| io_error("bind failed", err))?;
    let local = socket
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?;
    announce(&local.to_string());
    info!(%local, "udp responder listening");

    let mut request = vec![0u8; REQUEST_BUFFER];
    while running.load(Ordering::SeqCst) {
        let (received, remote) = match socket.recv_from(&mut request) {
            Ok(pair) => pair,
            Err(err) => return Err(io_error("receive failed", err)),
        };
        debug!(%remote, size = received, "datagram received");

        let steps = match select_script(&preset, &request[..received]) {
            Ok(steps) => steps,
            Err(err) => {
                warn!(%remote, error = %err, "unusable script from peer");
                continue;
            }
        };

        for step in &steps {
            thread::sleep(step.delay);
            if let Err(err) = socket.send_to(&step.payload, remote) {
                warn!(%remote, error = %err, "answer send failed");
                break;
            }
        }

        if args.once {
            return Ok(SUCCESS);
        }
    }

    Ok(SUCCESS)
}

fn select_script(
    preset: &Option<Vec<ScriptStep>>,
    request: &[u8],
) -> CliResult<Vec<ScriptStep>> {
    match preset {
        Some(steps) => Ok(steps.clone()),
        None => parse_script(&String::from_utf8_lossy(request)),
    }
}

/// `payload,delay;payload,delay;...` with delays in seconds. Payloads may
/// contain commas; the delimiter is the last comma of each step.
fn parse_script(input: &str) -> CliResult<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for segment in input.trim().split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let Some((payload, delay)) = segment.rsplit_once(',') else {
            return Err(CliError::new(
                DATA_INVALID,
                format!("script step {segment:?} is missing its delay"),
            ));
        };
        let seconds: f64 = delay.trim().parse().map_err(|_| {
            CliError::new(DATA_INVALID, format!("invalid script delay {delay:?}"))
        })?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(CliError::new(
                DATA_INVALID,
                format!("invalid script delay {delay:?}"),
            ));
        }
        steps.push(ScriptStep {
            payload: unescape(payload)?,
            delay: Duration::from_secs_f64(seconds),
        });
    }
    if steps.is_empty() {
        return Err(CliError::new(DATA_INVALID, "script has no steps"));
    }
    Ok(steps)
}

fn announce(address: &str) {
    // Printed before serving so callers binding port 0 can find us.
    println!("listening on {address}");
    let _ = std::io::stdout().flush();
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
