//! Socket readers
//!
//! Both socket modes share the same construction skeleton:
//!
//! 1. create the socket
//! 2. enlarge the receive buffer (best-effort, never fatal)
//! 3. mode-specific setup: bind address (UDP) or filter + device (raw)
//! 4. install the receive timeout
//!
//! Any failure after step 1 drops the half-built socket, which closes it
//! before the error reaches the caller.

pub mod filter;
pub mod frame;
pub mod raw;
pub mod udp;

use std::time::Duration;

use dstream_core::{kdebug, kwarn, PlatformSocket, RecvBuffer, SocketKind, StreamError, StreamResult};

/// Step 1: create a socket of `kind`
pub(crate) fn open_socket<S: PlatformSocket>(kind: SocketKind) -> StreamResult<S> {
    S::open(kind).map_err(|e| StreamError::resource("failed to create socket", e))
}

/// Step 2: ask for a `bytes` receive buffer, logging how it went
pub(crate) fn enlarge_recv_buffer<S: PlatformSocket>(sock: &S, bytes: usize) {
    match sock.set_recv_buffer(bytes) {
        Ok(RecvBuffer::Forced) => kdebug!("receive buffer forced to {} bytes", bytes),
        Ok(RecvBuffer::Limited) if cfg!(target_os = "linux") => kwarn!(
            "SO_RCVBUFFORCE failed (CAP_NET_ADMIN required), \
             receive buffer of {} bytes may be capped by net.core.rmem_max",
            bytes
        ),
        Ok(RecvBuffer::Limited) => kdebug!("receive buffer set to {} bytes", bytes),
        Err(e) => kwarn!(
            "failed to set receive buffer to {} bytes: {}, using system default",
            bytes,
            e
        ),
    }
}

/// Step 4: install the receive timeout
pub(crate) fn install_timeout<S: PlatformSocket>(sock: &S, timeout: Option<Duration>) -> StreamResult<()> {
    sock.set_recv_timeout(timeout)
        .map_err(|e| StreamError::resource("failed to set receive timeout", e))?;
    match timeout {
        Some(t) => kdebug!("receive timeout {} ms", t.as_millis()),
        None => kdebug!("receive timeout disabled, reads block"),
    }
    Ok(())
}
