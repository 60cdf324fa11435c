//! TCP Server
//!
//! Accepts connections and dispatches them to worker threads.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, SendTimeoutError, Sender};
use parking_lot::Mutex;

use super::Connection;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, StashError};

/// How long the acceptor sleeps when no connection is pending, and how long
/// it waits on a full worker queue before re-checking the shutdown flag
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Streams currently held by workers
///
/// Shutdown closes whatever is still registered once the grace period runs
/// out, which unblocks workers stuck in a read or write.
#[derive(Default)]
struct OpenStreams {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl OpenStreams {
    fn register(&self, stream: &TcpStream) -> Option<u64> {
        let clone = stream.try_clone().ok()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, clone);
        Some(id)
    }

    fn remove(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    /// Shut down every registered stream; returns how many were closed
    fn close_all(&self) -> usize {
        let streams: Vec<TcpStream> = self.streams.lock().drain().map(|(_, s)| s).collect();
        for stream in &streams {
            let _ = stream.shutdown(Shutdown::Both);
        }
        streams.len()
    }
}

/// TCP server for StashKV
///
/// One acceptor loop (the thread calling `run`) on a non-blocking listener,
/// and `max_connections` worker threads fed through a bounded channel.
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    open_streams: Arc<OpenStreams>,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;

        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            engine,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            open_streams: Arc::new(OpenStreams::default()),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` when set; clone it into signal handlers
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Serve until shutdown is signalled (blocking)
    ///
    /// On shutdown, stops accepting and lets workers finish the command
    /// they are serving. Connections still open after
    /// `shutdown_timeout_ms` are closed; all workers are joined before
    /// returning.
    pub fn run(&self) -> Result<()> {
        let worker_count = self.config.max_connections;
        let (sender, receiver) = channel::bounded::<TcpStream>(worker_count);

        let workers = (0..worker_count)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<Result<Vec<_>>>()?;
        drop(receiver);

        tracing::info!("Server started with {} workers", worker_count);

        let mut result = Ok(());
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    if let Err(e) = self.dispatch(&sender, stream) {
                        result = Err(e);
                        break;
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

        tracing::info!("Shutting down, waiting for {} workers", workers.len());
        drop(sender);

        let deadline = Instant::now() + Duration::from_millis(self.config.shutdown_timeout_ms);
        while workers.iter().any(|worker| !worker.is_finished()) && Instant::now() < deadline {
            thread::sleep(ACCEPT_POLL_INTERVAL);
        }

        let closed = self.open_streams.close_all();
        if closed > 0 {
            tracing::warn!(
                "Closed {} connections still open after {} ms shutdown timeout",
                closed,
                self.config.shutdown_timeout_ms
            );
        }

        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        result
    }

    /// Hand a stream to the worker pool, giving up if shutdown starts while
    /// every worker is busy
    fn dispatch(&self, sender: &Sender<TcpStream>, mut stream: TcpStream) -> Result<()> {
        loop {
            match sender.send_timeout(stream, ACCEPT_POLL_INTERVAL) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(returned)) => {
                    if self.shutdown.load(Ordering::SeqCst) {
                        tracing::debug!("Dropping queued connection for shutdown");
                        return Ok(());
                    }
                    stream = returned;
                }
                Err(SendTimeoutError::Disconnected(_)) => {
                    return Err(StashError::Server("all workers exited".to_string()));
                }
            }
        }
    }

    fn spawn_worker(&self, id: usize, receiver: Receiver<TcpStream>) -> Result<thread::JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let shutdown = Arc::clone(&self.shutdown);
        let open_streams = Arc::clone(&self.open_streams);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("stashkv-worker-{}", id))
            .spawn(move || {
                for stream in receiver.iter() {
                    let registered = open_streams.register(&stream);
                    let served = Connection::new(stream, Arc::clone(&engine), Arc::clone(&shutdown))
                        .and_then(|mut conn| {
                            conn.set_timeouts(read_ms, write_ms)?;
                            conn.handle()
                        });
                    if let Some(stream_id) = registered {
                        open_streams.remove(stream_id);
                    }
                    if let Err(e) = served {
                        tracing::debug!("Connection ended with error: {}", e);
                    }
                }
            })?;

        Ok(handle)
    }
}
