//! Ask an instrument for its identity string.
//!
//! Run with:
//!   cargo run --example query-idn -- 192.168.1.5:5025
//!
//! Without an instrument, serve a canned answer first:
//!   cargo run --features cli -- respond 127.0.0.1:5025 \
//!     --script 'LABLINK,MODEL-1\n,0.05' --once

use lablink::adapter::Adapter;
use lablink::framing::Termination;
use lablink::transport::Tcp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5025".to_string());

    let transport = Tcp::from_descriptor(&address)?;
    let mut adapter = Adapter::new(transport, Termination::new(&b"\n"[..]));

    eprintln!("Querying {address}");
    let answer = adapter.query(b"*IDN?\n")?;
    println!("{}", String::from_utf8_lossy(&answer));

    Ok(())
}
