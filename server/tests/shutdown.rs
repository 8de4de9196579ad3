//! Integration tests for graceful shutdown.

use std::io::Read;
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fixgate::{Config, Server};

#[test]
fn shutdown_flag_stops_server_and_closes_clients() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let config = Config {
        port: 0,
        workers: 2,
        ..Config::default()
    };
    let server = Server::bind(&config, shutdown.clone()).expect("bind failed");
    let addr = server.local_addr();
    let handle = thread::spawn(move || server.run().expect("run failed"));

    // A few idle clients spread across the workers.
    let clients: Vec<TcpStream> = (0..4)
        .map(|_| {
            let c = TcpStream::connect(addr).expect("connect failed");
            c.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            c
        })
        .collect();

    // Give the workers a turn to adopt the fds off their pipes.
    thread::sleep(Duration::from_millis(300));

    let start = Instant::now();
    shutdown.store(true, Ordering::SeqCst);
    handle.join().expect("server thread panicked");
    // Acceptor notices within its 1s poll timeout, workers within 100ms.
    assert!(start.elapsed() < Duration::from_secs(5), "shutdown took too long");

    // Every client sees EOF once its worker closed the connection.
    for mut client in clients {
        let mut buf = [0u8; 1];
        match client.read(&mut buf) {
            Ok(0) => {}
            Ok(n) => panic!("unexpected {} bytes during shutdown", n),
            Err(_) => {} // reset also counts as closed
        }
    }
}

#[test]
fn server_exits_promptly_with_no_connections() {
    let shutdown = Arc::new(AtomicBool::new(false));
    let config = Config {
        port: 0,
        workers: 1,
        ..Config::default()
    };
    let server = Server::bind(&config, shutdown.clone()).expect("bind failed");
    let handle = thread::spawn(move || server.run().expect("run failed"));

    thread::sleep(Duration::from_millis(50));
    let start = Instant::now();
    shutdown.store(true, Ordering::SeqCst);
    handle.join().expect("server thread panicked");
    assert!(start.elapsed() < Duration::from_secs(5));
}
