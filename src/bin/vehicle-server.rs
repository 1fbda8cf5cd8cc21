//! Server entry point.
//!
//! Usage: `vehicle-server <port>`. Listen address and worker pool size come
//! from the environment (`VEHICLE_PROTOCOL_SERVER_ADDRESS`,
//! `VEHICLE_PROTOCOL_WORKER_POOL_SIZE`); the port argument overrides the
//! address's port. Exit codes: 2 missing or invalid configuration, 3 bind
//! failure, 4 fatal I/O.

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use vehicle_protocol::config::NetworkConfig;
use vehicle_protocol::protocol::commands::standard_registry;
use vehicle_protocol::protocol::pipeline::RequestPipeline;
use vehicle_protocol::service::UdpServer;
use vehicle_protocol::store::{MemoryStore, VehicleStore};
use vehicle_protocol::utils::logging;

const EXIT_CONFIG: i32 = 2;
const EXIT_BIND: i32 = 3;
const EXIT_IO: i32 = 4;

#[tokio::main]
async fn main() {
    logging::init();
    info!("starting vehicle server");

    let Some(raw_port) = std::env::args().nth(1) else {
        error!("server port not specified; usage: vehicle-server <port>");
        process::exit(EXIT_CONFIG);
    };
    let Ok(port) = raw_port.parse::<u16>() else {
        error!(port = %raw_port, "server port is not a number");
        process::exit(EXIT_CONFIG);
    };

    let config = match NetworkConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load configuration");
            process::exit(EXIT_CONFIG);
        }
    };
    if let Err(e) = config.validate_strict() {
        error!(error = %e, "invalid configuration");
        process::exit(EXIT_CONFIG);
    }

    let mut addr: SocketAddr = match config.server.address.parse() {
        Ok(addr) => addr,
        Err(_) => {
            error!(address = %config.server.address, "invalid listen address");
            process::exit(EXIT_CONFIG);
        }
    };
    addr.set_port(port);

    let store: Arc<dyn VehicleStore> = Arc::new(MemoryStore::new());
    let registry = Arc::new(standard_registry(store.clone()));
    let pipeline = Arc::new(RequestPipeline::new(registry, store));

    let server = match UdpServer::bind(addr, pipeline, config.server.worker_pool_size).await {
        Ok(server) => server,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind server socket");
            process::exit(EXIT_BIND);
        }
    };

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("ctrl+c detected, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    if let Err(e) = server.run_with_shutdown(shutdown_rx).await {
        error!(error = %e, "fatal I/O error in receive loop");
        process::exit(EXIT_IO);
    }

    info!("server stopped");
}
