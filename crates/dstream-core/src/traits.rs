//! Platform socket trait
//!
//! The narrow set of socket primitives the readers need. Each target OS
//! provides one implementation in `dstream::sys`; the reader code above it
//! only speaks this trait.

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Which kind of socket to create
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// `AF_INET` datagram socket
    Datagram,
    /// Link-layer capture socket (`AF_PACKET` / `SOCK_RAW`), Linux only
    Packet,
}

/// How a receive-buffer enlargement request was honored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvBuffer {
    /// Full size applied, bypassing the system limit
    Forced,
    /// Requested via the unprivileged path; the kernel may cap it at its
    /// configured maximum
    Limited,
}

/// Outcome of one blocking receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recv {
    /// `n` bytes were received
    Data(usize),
    /// Receive timeout expired with nothing to read
    TimedOut,
    /// A signal interrupted the wait
    Interrupted,
}

/// Platform-specific socket operations.
///
/// The socket is owned exclusively by the implementing value and closed
/// when it is dropped.
pub trait PlatformSocket: Sized + Send {
    /// Create a new socket of the given kind
    fn open(kind: SocketKind) -> io::Result<Self>;

    /// Ask the kernel for a receive buffer of `bytes`
    fn set_recv_buffer(&self, bytes: usize) -> io::Result<RecvBuffer>;

    /// Bind to a local IPv4 address and port
    fn bind_ipv4(&self, addr: Ipv4Addr, port: u16) -> io::Result<()>;

    /// Port the socket is bound to (resolves an ephemeral port 0)
    fn local_port(&self) -> io::Result<u16>;

    /// Install a receive timeout, `None` blocks forever
    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Receive one datagram or frame into `buf`
    fn recv(&self, buf: &mut [u8]) -> io::Result<Recv>;

    /// Last socket error reported by the OS for this thread
    fn last_error() -> io::Error;
}
