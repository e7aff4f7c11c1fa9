//! Capture whatever a chatty endpoint emits inside a fixed window.
//!
//! Run with:
//!   cargo run --example bounded-capture -- 127.0.0.1:5025
//!
//! A scripted stream to capture from:
//!   cargo run --features cli -- respond 127.0.0.1:5025 \
//!     --script 'tick,0.1;tick,0.1;tick,0.1;tick,0.1' --once

use std::time::Duration;

use lablink::adapter::Adapter;
use lablink::framing::{DataStrategy, Timeout};
use lablink::transport::Tcp;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:5025".to_string());

    // Whatever arrives in the first half second is the capture; the gap
    // rule alone would follow the stream forever.
    let window = Timeout::new(Duration::from_secs(2))
        .with_continuation(Duration::from_millis(300))
        .with_total(Duration::from_millis(500))
        .with_total_strategy(DataStrategy::Return);

    let transport = Tcp::from_descriptor(&address)?;
    let mut adapter = Adapter::new(transport, window);

    adapter.write(b"START\n")?;
    let capture = adapter.read()?;
    eprintln!("captured {} bytes", capture.len());
    println!("{}", String::from_utf8_lossy(&capture));

    Ok(())
}
