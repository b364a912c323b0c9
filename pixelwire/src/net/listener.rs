//! TCP listener for mio-based frame ingestion.
//!
//! The socket is created with rustix so the listen backlog and socket
//! options are under our control, then handed to mio for readiness polling.

use std::io;
use std::net::SocketAddr;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use mio::event::Source;
use mio::net::{TcpListener as MioTcpListener, TcpStream};
use mio::{Interest, Registry, Token};
use rustix::net::{AddressFamily, SocketFlags, SocketType, sockopt};

/// A non-blocking listening TCP socket.
pub struct FrameListener {
    inner: MioTcpListener,
}

impl FrameListener {
    /// Creates a socket, sets `SO_REUSEADDR`, binds `addr` and listens with
    /// the given backlog.
    ///
    /// # Errors
    ///
    /// Returns the first failing step (socket, option, bind or listen).
    pub fn bind(addr: SocketAddr, backlog: i32) -> io::Result<Self> {
        let family = if addr.is_ipv4() {
            AddressFamily::INET
        } else {
            AddressFamily::INET6
        };
        let fd: OwnedFd = rustix::net::socket_with(
            family,
            SocketType::STREAM,
            SocketFlags::NONBLOCK | SocketFlags::CLOEXEC,
            None,
        )?;
        sockopt::set_socket_reuseaddr(&fd, true)?;
        rustix::net::bind(&fd, &addr)?;
        rustix::net::listen(&fd, backlog)?;

        let std_listener = std::net::TcpListener::from(fd);
        Ok(Self {
            inner: MioTcpListener::from_std(std_listener),
        })
    }

    /// Accepts one pending connection, or `WouldBlock` if none is queued.
    pub fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept()
    }

    /// Returns the bound address. Useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

impl AsFd for FrameListener {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.inner.as_fd()
    }
}

impl Source for FrameListener {
    fn register(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &Registry,
        token: Token,
        interests: Interest,
    ) -> io::Result<()> {
        self.inner.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.inner.deregister(registry)
    }
}
