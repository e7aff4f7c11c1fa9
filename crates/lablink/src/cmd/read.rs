use lablink_adapter::Adapter;
use lablink_transport::{Tcp, Transport};
#[cfg(unix)]
use lablink_transport::Udp;

use crate::cmd::{build_stop_condition, ReadArgs, TransportKind};
use crate::exit::{adapter_error, transport_error, CliResult, SUCCESS};
#[cfg(not(unix))]
use crate::exit::{CliError, USAGE};
use crate::output::{print_answer, OutputFormat};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let condition = build_stop_condition(&args.framing)?;

    match args.transport {
        TransportKind::Tcp => {
            let transport = Tcp::from_descriptor(&args.address)
                .map_err(|err| transport_error("invalid address", err))?;
            collect(Adapter::new(transport, condition), &args, "tcp", format)
        }
        #[cfg(unix)]
        TransportKind::Udp => {
            let transport = Udp::from_descriptor(&args.address)
                .map_err(|err| transport_error("invalid address", err))?;
            collect(Adapter::new(transport, condition), &args, "udp", format)
        }
        #[cfg(not(unix))]
        TransportKind::Udp => Err(CliError::new(
            USAGE,
            "the udp transport is only available on unix targets",
        )),
    }
}

fn collect<T: Transport>(
    mut adapter: Adapter<T>,
    args: &ReadArgs,
    transport: &str,
    format: OutputFormat,
) -> CliResult<i32> {
    let answer = adapter
        .read()
        .map_err(|err| adapter_error("read failed", err))?;
    print_answer(&answer, &args.address, transport, format);
    Ok(SUCCESS)
}
