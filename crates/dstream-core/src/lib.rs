//! # dstream-core
//!
//! Core types and traits for dstream chunk readers.
//!
//! This crate is platform-agnostic and contains no OS-specific code.
//! The file, UDP and raw-capture readers live in `dstream`.
//!
//! ## Modules
//!
//! - `source` - The `StreamSource` capability every reader implements
//! - `error` - Error taxonomy (config, resource, timeout, parse, read)
//! - `traits` - Platform socket trait implemented per target OS
//! - `kprint` - Kernel-style debug printing macros
//! - `env` - Environment variable utilities

pub mod source;
pub mod error;
pub mod traits;
pub mod kprint;
pub mod env;

// Re-exports for convenience
pub use source::StreamSource;
pub use error::{ConfigError, ErrorKind, ParseError, StreamError, StreamResult};
pub use traits::{PlatformSocket, Recv, RecvBuffer, SocketKind};
pub use kprint::{set_flush_enabled, set_log_level, LogLevel};
pub use env::{env_get, env_get_bool};

/// Constants shared by all readers
pub mod constants {
    /// Default read-ahead buffer for file readers (4 MiB)
    pub const DEFAULT_READ_AHEAD: usize = 4 * 1024 * 1024;

    /// Target socket receive buffer (4 MiB, best-effort)
    pub const SOCKET_RCVBUF_SIZE: usize = 4 * 1024 * 1024;

    /// Largest link-layer frame a raw capture socket can hand us
    pub const MAX_FRAME_SIZE: usize = 65536;

    /// Ethernet II header: dst(6) + src(6) + ethertype(2)
    pub const ETH_HEADER_LEN: usize = 14;

    /// IPv4 header without options
    pub const IPV4_MIN_HEADER_LEN: usize = 20;

    /// UDP header: src port, dst port, length, checksum
    pub const UDP_HEADER_LEN: usize = 8;

    /// Shortest frame that can carry an Ethernet + IPv4 + UDP header stack
    pub const MIN_UDP_FRAME_LEN: usize = ETH_HEADER_LEN + IPV4_MIN_HEADER_LEN + UDP_HEADER_LEN;

    /// EtherType for IPv4
    pub const ETHERTYPE_IPV4: u16 = 0x0800;

    /// IP protocol number for UDP
    pub const IPPROTO_UDP: u8 = 17;

    cfg_if::cfg_if! {
        if #[cfg(target_os = "linux")] {
            /// Whether link-layer capture sockets exist on this target
            pub const RAW_CAPTURE_AVAILABLE: bool = true;
        } else {
            /// Whether link-layer capture sockets exist on this target
            pub const RAW_CAPTURE_AVAILABLE: bool = false;
        }
    }
}
