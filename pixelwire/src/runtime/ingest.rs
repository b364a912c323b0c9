//! Frame ingestion server.
//!
//! One worker thread multiplexes three readiness sources with mio: the
//! listening socket, the active client (if any), and a [`mio::Waker`] used
//! for cancellation. Sockets are non-blocking, so a frame that arrives in
//! pieces is accumulated across readiness events and the worker only ever
//! blocks in `poll`.
//!
//! ```text
//! Listening ──accept──> ReadingFrame ──full frame──> Acked ─┐
//!     ^                      ^                              │
//!     │                      └──────────────────────────────┘
//!     └──── EOF / error: close, free slot, submit Frame::Clear
//! ```

use std::io::{self, ErrorKind, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;

use mio::net::TcpStream;
use mio::{Events, Interest, Poll, Token, Waker};
use thiserror::Error;

use crate::config::ServerConfig;
use crate::frame::{Frame, FrameSink};
use crate::net::{ACK, FrameListener};
use crate::sync::{CancellableWorker, StopSignal, Tickable};
use crate::sync::worker::FatalHandler;
use crate::trace::{debug, info, trace, warn};

const LISTENER: Token = Token(0);
const CLIENT: Token = Token(1);
const WAKE: Token = Token(2);

const EVENT_CAPACITY: usize = 8;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("frame length must be non-zero")]
    EmptyFrame,
    #[error("failed to set up poll: {0}")]
    Setup(#[source] io::Error),
    #[error("poll failed: {0}")]
    Poll(#[source] io::Error),
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),
    #[error("failed to register client: {0}")]
    Register(#[source] io::Error),
}

/// The single active client.
struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buf: Box<[u8]>,
    filled: usize,
    frames: u64,
}

impl Connection {
    fn new(stream: TcpStream, peer: SocketAddr, frame_len: usize) -> Self {
        Self {
            stream,
            peer,
            buf: vec![0; frame_len].into_boxed_slice(),
            filled: 0,
            frames: 0,
        }
    }

    /// Reads until the socket would block, submitting and acknowledging each
    /// complete frame. Returns `false` once the connection is finished.
    ///
    /// Reads never cross a frame boundary, so bytes of the next frame stay in
    /// the socket until the current one has been acknowledged.
    fn pump<S: FrameSink + ?Sized>(&mut self, sink: &S) -> bool {
        loop {
            match self.stream.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    debug!(peer = %self.peer, partial = self.filled, "client closed connection");
                    return false;
                }
                Ok(n) => {
                    self.filled += n;
                    if self.filled < self.buf.len() {
                        continue;
                    }
                    self.filled = 0;
                    self.frames += 1;
                    sink.submit(Frame::pixels(self.buf.clone()));
                    trace!(peer = %self.peer, frame = self.frames, "frame received");

                    if let Err(_e) = self.stream.write_all(ACK) {
                        debug!(peer = %self.peer, error = %_e, "failed to acknowledge frame");
                        return false;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return true,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(_e) => {
                    debug!(peer = %self.peer, error = %_e, "client read failed");
                    return false;
                }
            }
        }
    }
}

/// Worker state of a running [`FrameIngestServer`].
struct IngestLoop<S> {
    poll: Poll,
    events: Events,
    listener: FrameListener,
    client: Option<Connection>,
    sink: Arc<S>,
    frame_len: usize,
}

impl<S: FrameSink + 'static> IngestLoop<S> {
    fn service_client(&mut self) {
        let Some(conn) = self.client.as_mut() else {
            return;
        };
        if !conn.pump(&*self.sink) {
            self.disconnect();
        }
    }

    /// Closes the active client and tells the renderer to blank the strip.
    fn disconnect(&mut self) {
        let Some(mut conn) = self.client.take() else {
            return;
        };
        if let Err(_e) = self.poll.registry().deregister(&mut conn.stream) {
            debug!(peer = %conn.peer, error = %_e, "failed to deregister client");
        }
        info!(peer = %conn.peer, frames = conn.frames, "client disconnected");
        drop(conn);
        self.sink.submit(Frame::Clear);
    }

    /// Drains the accept queue. Connections arriving while a client is
    /// active are closed without touching it.
    fn accept_pending(&mut self) -> Result<(), IngestError> {
        loop {
            match self.listener.accept() {
                Ok((mut stream, peer)) => {
                    if self.client.is_some() {
                        info!(peer = %peer, "rejecting connection, a client is already active");
                        drop(stream);
                        continue;
                    }
                    if let Err(_e) = stream.set_nodelay(true) {
                        debug!(peer = %peer, error = %_e, "failed to set TCP_NODELAY");
                    }
                    self.poll
                        .registry()
                        .register(&mut stream, CLIENT, Interest::READABLE)
                        .map_err(IngestError::Register)?;
                    info!(peer = %peer, "client connected");
                    self.client = Some(Connection::new(stream, peer, self.frame_len));
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(IngestError::Accept(e)),
            }
        }
    }
}

impl<S: FrameSink + 'static> Tickable for IngestLoop<S> {
    type Error = IngestError;

    fn tick(&mut self, stop: &StopSignal) -> Result<(), IngestError> {
        if let Err(e) = self.poll.poll(&mut self.events, None) {
            if e.kind() == ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(IngestError::Poll(e));
        }
        if stop.is_raised() {
            return Ok(());
        }

        let mut client_ready = false;
        let mut accept_ready = false;
        for event in &self.events {
            match event.token() {
                CLIENT => client_ready = true,
                LISTENER => accept_ready = true,
                _ => {}
            }
        }

        // The client goes first so a disconnect frees the slot for a
        // connection waiting in the same batch.
        if client_ready {
            self.service_client();
        }
        if accept_ready {
            self.accept_pending()?;
        }
        Ok(())
    }
}

/// Accepts one producer at a time and feeds its frames into a [`FrameSink`].
///
/// Every accepted frame is exactly `frame_len` bytes and is acknowledged with
/// [`ACK`]. When the producer goes away the sink receives [`Frame::Clear`].
pub struct FrameIngestServer<S: FrameSink + 'static> {
    config: ServerConfig,
    frame_len: usize,
    sink: Arc<S>,
    on_fatal: Option<FatalHandler>,
    worker: Option<CancellableWorker<IngestLoop<S>>>,
    local_addr: Option<SocketAddr>,
}

impl<S: FrameSink + 'static> FrameIngestServer<S> {
    #[must_use]
    pub fn new(config: ServerConfig, frame_len: usize, sink: Arc<S>) -> Self {
        Self {
            config,
            frame_len,
            sink,
            on_fatal: None,
            worker: None,
            local_addr: None,
        }
    }

    /// Routes fatal worker errors to `handler` instead of exiting.
    #[must_use]
    pub fn with_fatal_handler(mut self, handler: FatalHandler) -> Self {
        self.on_fatal = Some(handler);
        self
    }

    /// Binds the listening socket and starts the worker.
    ///
    /// Returns the bound address. Calling `run` on a running server returns
    /// the current address; a server whose worker died on a fatal error is
    /// torn down and bound afresh.
    ///
    /// # Errors
    ///
    /// Socket and poll setup errors are returned here rather than raised
    /// inside the worker.
    pub fn run(&mut self) -> Result<SocketAddr, IngestError> {
        if let Some(addr) = self.local_addr {
            if self.is_running() {
                return Ok(addr);
            }
            warn!(addr = %addr, "ingest worker has exited, rebinding");
            self.stop();
        }
        if self.frame_len == 0 {
            return Err(IngestError::EmptyFrame);
        }

        let addr = self.config.socket_addr();
        let mut listener = FrameListener::bind(addr, self.config.backlog)
            .map_err(|source| IngestError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| IngestError::Bind { addr, source })?;

        let poll = Poll::new().map_err(IngestError::Setup)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .map_err(IngestError::Setup)?;
        let waker = Arc::new(Waker::new(poll.registry(), WAKE).map_err(IngestError::Setup)?);

        let tickable = IngestLoop {
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener,
            client: None,
            sink: Arc::clone(&self.sink),
            frame_len: self.frame_len,
        };
        let mut worker = CancellableWorker::new("pixel-ingest", tickable, waker);
        if let Some(handler) = &self.on_fatal {
            worker = worker.with_fatal_handler(Arc::clone(handler));
        }
        worker.start();

        info!(addr = %local_addr, frame_len = self.frame_len, "frame ingest listening");
        self.worker = Some(worker);
        self.local_addr = Some(local_addr);
        Ok(local_addr)
    }

    /// Stops the worker and closes the listening and client sockets.
    pub fn stop(&mut self) {
        let Some(mut worker) = self.worker.take() else {
            return;
        };
        worker.stop();
        if worker.get_mut().is_none() {
            warn!("ingest worker was lost to a panic");
        }
        drop(worker);
        self.local_addr = None;
        info!("frame ingest stopped");
    }

    /// Address the server is listening on, while running.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(CancellableWorker::is_running)
    }

    /// Bytes per frame.
    #[must_use]
    pub const fn frame_len(&self) -> usize {
        self.frame_len
    }
}
