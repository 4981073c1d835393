//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::{BufWriter, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, TrySendError};

use crate::config::Config;
use crate::error::{CfkvError, Result};
use crate::protocol::{write_response, Response};
use crate::service::RawKvService;
use crate::storage::Storage;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for cfkv
///
/// One acceptor thread feeds accepted streams into a bounded queue drained
/// by `worker_threads` workers. When the queue is full the connection is
/// refused with an error response.
pub struct Server<S> {
    config: Config,
    service: RawKvService<S>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

/// Signals a running server to stop
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }
}

impl<S: Storage + 'static> Server<S> {
    /// Bind the listen address; the server does not accept until `run`
    pub fn bind(config: Config, service: RawKvService<S>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            CfkvError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            service,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Address actually bound (useful when binding port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Start the server (blocking until shutdown)
    ///
    /// On shutdown the queue is closed and workers are joined once their
    /// current connections end.
    pub fn run(&self) -> Result<()> {
        let (sender, receiver) = channel::bounded::<TcpStream>(self.config.max_connections);

        let mut workers = Vec::with_capacity(self.config.worker_threads);
        for id in 0..self.config.worker_threads {
            let receiver = receiver.clone();
            let service = self.service.clone();
            let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

            let worker = thread::Builder::new()
                .name(format!("cfkv-worker-{}", id))
                .spawn(move || {
                    for stream in receiver.iter() {
                        serve_connection(stream, service.clone(), read_ms, write_ms);
                    }
                })?;
            workers.push(worker);
        }
        drop(receiver);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        while !self.shutdown.load(Ordering::Acquire) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    match sender.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(stream)) => {
                            tracing::warn!("Connection queue full, refusing {}", addr);
                            refuse(stream, "server busy: too many connections");
                        }
                        Err(TrySendError::Disconnected(_)) => {
                            return Err(CfkvError::Network("all workers exited".to_string()));
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down; waiting for workers");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }
}

fn serve_connection<S: Storage>(
    stream: TcpStream,
    service: RawKvService<S>,
    read_ms: u64,
    write_ms: u64,
) {
    let mut connection = match Connection::new(stream, service) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Failed to set up connection: {}", e);
            return;
        }
    };

    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
    }

    if let Err(e) = connection.handle() {
        tracing::warn!("Connection {} closed with error: {}", connection.peer_addr(), e);
    }
}

/// Tell a client it cannot be served, then close
fn refuse(stream: TcpStream, reason: &str) {
    let mut writer = BufWriter::new(stream);
    if let Err(e) = write_response(&mut writer, &Response::Failure(reason.to_string())) {
        tracing::debug!("Could not notify refused client: {}", e);
    }
}
