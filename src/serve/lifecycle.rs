//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use tiny_http::Server;

use crate::log;
use crate::logger::Logger;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(
    interface: IpAddr,
    base_port: u16,
    logger: &dyn Logger,
) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                // port 0 asks the OS for any free port
                let addr = server.server_addr().to_ip().unwrap_or(addr);
                if offset > 0 {
                    log!(logger; "serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow::anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Set once Ctrl+C has been received.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    pub fn is_requested(&self) -> bool {
        !self.rx.is_empty()
    }
}

/// Install the Ctrl+C handler for `server`.
///
/// The handler marks the signal and unblocks the request loop, so
/// `incoming_requests` ends and the caller can stop the engine.
pub fn install_shutdown_handler(
    server: Arc<Server>,
    logger: Arc<dyn Logger>,
) -> Result<ShutdownSignal> {
    let (tx, rx) = channel::bounded::<()>(1);

    ctrlc::set_handler(move || {
        if tx.try_send(()).is_ok() {
            log!(logger; "serve"; "shutting down...");
        }
        server.unblock();
    })
    .context("failed to set Ctrl+C handler")?;

    Ok(ShutdownSignal { rx })
}
