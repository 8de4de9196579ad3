//! End-to-end tests for the FIX logon flow.
//!
//! Each test starts a real server on an ephemeral port, speaks FIX over a
//! plain TcpStream, and asserts on the exact echo bytes.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fixgate::{Config, Server};

const LOGON: &[u8] = b"8=FIX.4.2\x019=70\x0135=A\x0134=1\x0149=CLIENT1\x01\
    52=20250314-15:24:42.191\x0156=EXECUTOR\x0198=0\x01108=30\x0110=088\x01";

const ECHO: &[u8] = b"8=FIX.4.2\x019=70\x0135=A\x0134=1\x0149=EXECUTOR\x01\
    56=CLIENT1\x0152=20250314-15:24:42.191\x0198=0\x01108=30\x0110=088\x01";

/// Start a test server with two workers; returns its address, the join
/// handle, and the shutdown flag.
fn start_test_server() -> (std::net::SocketAddr, thread::JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let config = Config {
        port: 0,
        workers: 2,
        ..Config::default()
    };
    let server = Server::bind(&config, shutdown.clone()).expect("server bind failed");
    let addr = server.local_addr();
    let handle = thread::spawn(move || {
        server.run().expect("server run failed");
    });
    (addr, handle, shutdown)
}

fn stop_test_server(handle: thread::JoinHandle<()>, shutdown: Arc<AtomicBool>) {
    shutdown.store(true, Ordering::SeqCst);
    handle.join().expect("server thread panicked");
}

fn connect(addr: std::net::SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect failed");
    stream.set_nodelay(true).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    stream
}

/// Read from `stream` until `want` bytes arrived or the deadline passes.
fn read_exactly(stream: &mut TcpStream, want: usize, deadline: Duration) -> Vec<u8> {
    let start = Instant::now();
    let mut out = Vec::with_capacity(want);
    let mut buf = [0u8; 16384];
    while out.len() < want && start.elapsed() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => panic!("read failed: {e}"),
        }
    }
    out
}

/// Assert the server closes the connection without sending anything.
fn assert_closed_silently(stream: &mut TcpStream) {
    let start = Instant::now();
    let mut buf = [0u8; 256];
    loop {
        match stream.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => panic!("unexpected {} response bytes", n),
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                assert!(
                    start.elapsed() < Duration::from_secs(5),
                    "connection was not closed"
                );
            }
            Err(_) => return, // reset also counts as closed
        }
    }
}

/// Build a valid logon with the given sequence number.
fn build_logon(seq: u32) -> Vec<u8> {
    let body = format!("35=A\x0134={}\x0149=CLIENT1\x0156=EXECUTOR\x0198=0\x01108=30\x01", seq);
    let head = format!("8=FIX.4.2\x019={}\x01", body.len());
    let mut wire = head.into_bytes();
    wire.extend_from_slice(body.as_bytes());
    let sum: u32 = wire.iter().map(|&b| b as u32).sum();
    wire.extend_from_slice(format!("10={:03}\x01", sum % 256).as_bytes());
    wire
}

/// The echo the server produces for [`build_logon`]: comp ids swapped,
/// body length and checksum mirrored verbatim.
fn expected_echo(seq: u32) -> Vec<u8> {
    let logon = build_logon(seq);
    let n = logon.len();
    let checksum = &logon[n - 4..n - 1];
    let body_len = 44 + seq.to_string().len(); // body grows with the seq digits
    let mut echo = format!(
        "8=FIX.4.2\x019={}\x0135=A\x0134={}\x0149=EXECUTOR\x0156=CLIENT1\x0198=0\x01108=30\x01",
        body_len, seq
    )
    .into_bytes();
    echo.extend_from_slice(b"10=");
    echo.extend_from_slice(checksum);
    echo.push(0x01);
    echo
}

#[test]
fn happy_logon_gets_echo_with_swapped_comp_ids() {
    let (addr, handle, shutdown) = start_test_server();
    let mut stream = connect(addr);

    stream.write_all(LOGON).unwrap();
    let response = read_exactly(&mut stream, ECHO.len(), Duration::from_secs(5));
    assert_eq!(response, ECHO);

    drop(stream);
    stop_test_server(handle, shutdown);
}

#[test]
fn split_read_produces_identical_echo() {
    let (addr, handle, shutdown) = start_test_server();
    let mut stream = connect(addr);

    stream.write_all(&LOGON[..40]).unwrap();
    stream.flush().unwrap();
    thread::sleep(Duration::from_millis(100));
    stream.write_all(&LOGON[40..]).unwrap();

    let response = read_exactly(&mut stream, ECHO.len(), Duration::from_secs(5));
    assert_eq!(response, ECHO);

    drop(stream);
    stop_test_server(handle, shutdown);
}

#[test]
fn bad_checksum_closes_connection_without_response() {
    let (addr, handle, shutdown) = start_test_server();
    let mut stream = connect(addr);

    let mut bad = LOGON.to_vec();
    let n = bad.len();
    bad[n - 4..n - 1].copy_from_slice(b"000");
    stream.write_all(&bad).unwrap();

    assert_closed_silently(&mut stream);

    drop(stream);
    stop_test_server(handle, shutdown);
}

#[test]
fn non_digit_tag_closes_connection() {
    let (addr, handle, shutdown) = start_test_server();
    let mut stream = connect(addr);

    stream.write_all(b"8=FIX.4.2\x01A=foo\x01").unwrap();
    assert_closed_silently(&mut stream);

    drop(stream);
    stop_test_server(handle, shutdown);
}

#[test]
fn two_logons_in_one_write_get_two_echoes_in_order() {
    let (addr, handle, shutdown) = start_test_server();
    let mut stream = connect(addr);

    let mut both = LOGON.to_vec();
    both.extend_from_slice(LOGON);
    stream.write_all(&both).unwrap();

    let response = read_exactly(&mut stream, 2 * ECHO.len(), Duration::from_secs(5));
    let mut expected = ECHO.to_vec();
    expected.extend_from_slice(ECHO);
    assert_eq!(response, expected);

    drop(stream);
    stop_test_server(handle, shutdown);
}

#[test]
fn ten_thousand_logons_echo_in_order() {
    const COUNT: u32 = 10_000;

    let (addr, handle, shutdown) = start_test_server();
    let stream = connect(addr);

    let mut wire = Vec::new();
    let mut expected = Vec::new();
    for seq in 1..=COUNT {
        wire.extend_from_slice(&build_logon(seq));
        expected.extend_from_slice(&expected_echo(seq));
    }

    let mut writer = stream.try_clone().unwrap();
    let writer_handle = thread::spawn(move || {
        writer.write_all(&wire).unwrap();
        writer.flush().unwrap();
    });

    let mut reader = stream;
    let response = read_exactly(&mut reader, expected.len(), Duration::from_secs(60));
    writer_handle.join().unwrap();

    assert_eq!(response.len(), expected.len());
    assert_eq!(response, expected);

    drop(reader);
    stop_test_server(handle, shutdown);
}
