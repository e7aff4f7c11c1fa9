#![cfg(feature = "cli")]

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn lablink() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_lablink"));
    command.arg("--log-level").arg("error");
    command
}

/// Bind an ephemeral port and serve one connection from a test thread.
fn one_shot_device<F>(serve: F) -> (String, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("device listener should bind");
    let address = listener
        .local_addr()
        .expect("device listener should have an address")
        .to_string();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("device should accept");
        serve(stream);
    });
    (address, handle)
}

fn drain(mut stream: &TcpStream) -> Vec<u8> {
    let mut collected = Vec::new();
    let mut buf = [0u8; 256];
    while let Ok(n) = stream.read(&mut buf) {
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    collected
}

#[test]
fn version_prints_package_version() {
    let output = lablink().arg("version").output().expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn query_collects_a_scripted_answer() {
    let (requests_tx, requests_rx) = mpsc::channel();
    let (address, device) = one_shot_device(move |mut stream| {
        let mut request = [0u8; 64];
        let n = stream.read(&mut request).expect("request should arrive");
        requests_tx
            .send(request[..n].to_vec())
            .expect("request should be handed to the test");
        thread::sleep(Duration::from_millis(20));
        stream
            .write_all(b"LABLINK,MODEL-1\n")
            .expect("answer should send");
        // Hold the connection open until the client is done.
        let _ = drain(&stream);
    });

    let output = lablink()
        .args(["--format", "raw", "query", &address])
        .args(["--data", "*IDN?\\n", "--termination", "\\n"])
        .output()
        .expect("query should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"LABLINK,MODEL-1");
    assert_eq!(
        requests_rx.recv().expect("device should report the request"),
        b"*IDN?\n"
    );

    device.join().expect("device thread should finish");
}

#[test]
fn read_of_a_silent_endpoint_returns_empty() {
    let (address, device) = one_shot_device(|stream| {
        let _ = drain(&stream);
    });

    let output = lablink()
        .args(["--format", "raw", "read", &address, "--response", "200ms"])
        .output()
        .expect("read should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(output.stdout.is_empty());

    device.join().expect("device thread should finish");
}

#[test]
fn write_delivers_bytes_verbatim() {
    let (written_tx, written_rx) = mpsc::channel();
    let (address, device) = one_shot_device(move |stream| {
        written_tx
            .send(drain(&stream))
            .expect("written bytes should be handed to the test");
    });

    let output = lablink()
        .args(["write", &address, "--data", "*RST\\n"])
        .output()
        .expect("write should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        written_rx.recv().expect("device should report written bytes"),
        b"*RST\n"
    );

    device.join().expect("device thread should finish");
}

#[test]
fn malformed_address_exits_with_usage_code() {
    let output = lablink()
        .args(["query", "[half-open", "--data", "hi"])
        .output()
        .expect("query should run");

    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn respond_plays_a_client_supplied_script() {
    let mut child = lablink()
        .args(["respond", "127.0.0.1:0", "--once"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("respond should start");

    let stdout = child.stdout.take().expect("child stdout should be piped");
    let mut lines = BufReader::new(stdout).lines();
    let announcement = lines
        .next()
        .expect("respond should announce its address")
        .expect("announcement should be readable");
    let address = announcement
        .strip_prefix("listening on ")
        .expect("announcement should name the address")
        .to_string();

    let mut stream = TcpStream::connect(&address).expect("client should connect");
    stream
        .write_all(b"PING,0.05;DONE,0.05")
        .expect("script should send");

    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    let mut collected = Vec::new();
    let mut buf = [0u8; 64];
    while collected.len() < 8 {
        let n = stream.read(&mut buf).expect("scripted answer should arrive");
        if n == 0 {
            break;
        }
        collected.extend_from_slice(&buf[..n]);
    }
    assert_eq!(collected, b"PINGDONE");

    drop(stream);
    let status = child.wait().expect("respond should exit after --once");
    assert!(status.success());
}

#[test]
fn respond_preset_script_ignores_the_trigger_payload() {
    let mut child = lablink()
        .args(["respond", "127.0.0.1:0", "--script", "PONG,0", "--once"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("respond should start");

    let stdout = child.stdout.take().expect("child stdout should be piped");
    let mut lines = BufReader::new(stdout).lines();
    let announcement = lines
        .next()
        .expect("respond should announce its address")
        .expect("announcement should be readable");
    let address = announcement
        .strip_prefix("listening on ")
        .expect("announcement should name the address")
        .to_string();

    let mut stream = TcpStream::connect(&address).expect("client should connect");
    stream.write_all(b"anything").expect("trigger should send");

    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout should be settable");
    let mut answer = [0u8; 16];
    let n = stream.read(&mut answer).expect("answer should arrive");
    assert_eq!(&answer[..n], b"PONG");

    drop(stream);
    let status = child.wait().expect("respond should exit after --once");
    assert!(status.success());
}

#[cfg(unix)]
#[test]
fn udp_query_round_trips_a_datagram() {
    let socket = std::net::UdpSocket::bind(("127.0.0.1", 0)).expect("device socket should bind");
    let address = socket
        .local_addr()
        .expect("device socket should have an address")
        .to_string();
    let device = thread::spawn(move || {
        let mut request = [0u8; 256];
        let (n, remote) = socket
            .recv_from(&mut request)
            .expect("datagram should arrive");
        assert_eq!(&request[..n], b"PING");
        thread::sleep(Duration::from_millis(10));
        socket
            .send_to(b"ACK", remote)
            .expect("answer datagram should send");
    });

    let output = lablink()
        .args(["--format", "raw", "query", &address, "--transport", "udp"])
        .args(["--data", "PING", "--response", "2s"])
        .output()
        .expect("query should run");

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(output.stdout, b"ACK");

    device.join().expect("device thread should finish");
}
