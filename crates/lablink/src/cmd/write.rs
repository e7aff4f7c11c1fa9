use lablink_adapter::Adapter;
use lablink_framing::Length;
use lablink_transport::{Tcp, Transport};
#[cfg(unix)]
use lablink_transport::Udp;

use crate::cmd::{resolve_payload, TransportKind, WriteArgs};
use crate::exit::{adapter_error, transport_error, CliResult, SUCCESS};
#[cfg(not(unix))]
use crate::exit::{CliError, USAGE};
use crate::output::OutputFormat;

pub fn run(args: WriteArgs, _format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.data, &args.file)?;

    // The adapter wants a stop condition even though a plain write never
    // consults it.

    match args.transport {
        TransportKind::Tcp => {
            let transport = Tcp::from_descriptor(&args.address)
                .map_err(|err| transport_error("invalid address", err))?;
            send(Adapter::new(transport, Length::new(1)), &payload)
        }
        #[cfg(unix)]
        TransportKind::Udp => {
            let transport = Udp::from_descriptor(&args.address)
                .map_err(|err| transport_error("invalid address", err))?;
            send(Adapter::new(transport, Length::new(1)), &payload)
        }
        #[cfg(not(unix))]
        TransportKind::Udp => Err(CliError::new(
            USAGE,
            "the udp transport is only available on unix targets",
        )),
    }
}

fn send<T: Transport>(mut adapter: Adapter<T>, payload: &[u8]) -> CliResult<i32> {
    adapter
        .write(payload)
        .map_err(|err| adapter_error("write failed", err))?;
    Ok(SUCCESS)
}
