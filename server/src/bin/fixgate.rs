//! FIX gateway server binary.

use clap::Parser;
use fixgate::config::{self, Config};
use fixgate::{logging, signal, Server};
use tracing::{error, warn};

#[derive(Parser)]
#[command(name = "fixgate")]
#[command(about = "Multi-threaded TCP server terminating FIX 4.x sessions")]
struct Args {
    /// TCP port to listen on (1-65535); invalid or missing values use 8080
    port: Option<String>,
}

fn main() {
    logging::init();
    let args = Args::parse();

    let port = match args.port.as_deref() {
        None => config::DEFAULT_PORT,
        Some(raw) => match raw.parse::<u16>() {
            Ok(p) if p >= 1 => p,
            _ => {
                warn!(
                    given = raw,
                    "invalid port, must be in 1-65535; using {}",
                    config::DEFAULT_PORT
                );
                config::DEFAULT_PORT
            }
        },
    };

    let shutdown = signal::install_signal_handler();
    let config = Config {
        port,
        ..Config::default()
    };

    let server = match Server::bind(&config, shutdown) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "failed to start");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}
