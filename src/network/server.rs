//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::io::{BufWriter, ErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use crate::config::Config;
use crate::error::{MenuError, Result};
use crate::kv::KvBackend;
use crate::menu::MenuService;
use crate::protocol::{write_response, Response};

use super::Connection;

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Signals a running server to stop accepting connections
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// TCP server for the menu service
///
/// One acceptor (the thread calling [`Server::run`]) feeds accepted sockets
/// to `worker_threads` workers over a channel. Sockets beyond
/// `max_connections` get an error response and are closed.
pub struct Server<B> {
    config: Config,
    service: Arc<MenuService<B>>,
    listener: TcpListener,
    shutdown: ShutdownHandle,

    /// Connections queued or being served
    active: Arc<AtomicUsize>,
}

impl<B: KvBackend + 'static> Server<B> {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, service: Arc<MenuService<B>>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            MenuError::Network(format!("Failed to bind {}: {}", config.listen_addr, e))
        })?;
        // Non-blocking so the accept loop can notice shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            service,
            listener,
            shutdown: ShutdownHandle(Arc::new(AtomicBool::new(false))),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for stopping the server from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking)
    ///
    /// Returns after shutdown has been signalled and every worker has
    /// finished its current connection.
    pub fn run(&self) -> Result<()> {
        tracing::info!(
            addr = %self.local_addr()?,
            workers = self.config.worker_threads,
            max_connections = self.config.max_connections,
            "Server listening"
        );

        let (sender, receiver) = channel::unbounded::<TcpStream>();

        let workers: Vec<_> = (0..self.config.worker_threads)
            .map(|i| {
                let receiver = receiver.clone();
                let service = Arc::clone(&self.service);
                let active = Arc::clone(&self.active);
                let config = self.config.clone();
                thread::Builder::new()
                    .name(format!("menukv-worker-{}", i))
                    .spawn(move || worker_loop(receiver, service, active, config))
            })
            .collect::<std::io::Result<_>>()?;
        drop(receiver);

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
                        tracing::warn!("Refusing {}: connection limit reached", addr);
                        refuse(stream);
                        continue;
                    }
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping {}: {}", addr, e);
                        continue;
                    }
                    self.active.fetch_add(1, Ordering::SeqCst);
                    if sender.send(stream).is_err() {
                        self.active.fetch_sub(1, Ordering::SeqCst);
                        return Err(MenuError::Network("All workers exited".to_string()));
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutdown requested, waiting for workers");
        drop(sender);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }
        Ok(())
    }

    /// Connections queued or being served right now
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

fn worker_loop<B: KvBackend>(
    receiver: Receiver<TcpStream>,
    service: Arc<MenuService<B>>,
    active: Arc<AtomicUsize>,
    config: Config,
) {
    for stream in receiver.iter() {
        match Connection::new(stream, Arc::clone(&service)) {
            Ok(mut connection) => {
                let served = connection
                    .set_timeouts(config.read_timeout_ms, config.write_timeout_ms)
                    .and_then(|_| connection.handle());
                if let Err(e) = served {
                    tracing::debug!("Connection {} ended with error: {}", connection.peer_addr(), e);
                }
            }
            Err(e) => tracing::warn!("Failed to set up connection: {}", e),
        }
        active.fetch_sub(1, Ordering::SeqCst);
    }
}

fn refuse(stream: TcpStream) {
    let _ = stream.set_nonblocking(false);
    let mut writer = BufWriter::new(stream);
    let _ = write_response(&mut writer, &Response::error("too many connections"));
}
