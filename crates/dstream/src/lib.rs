//! # dstream
//!
//! Fixed-size chunk readers over heterogeneous continuous sources.
//!
//! Three concrete readers implement [`StreamSource`]:
//!
//! - [`FileReader`] - sequential chunks from a local file with a large
//!   read-ahead buffer
//! - [`UdpReader`] - one datagram per call from a bound UDP socket
//! - [`RawReader`] - UDP payloads recovered from link-layer frames captured
//!   on a network interface (Linux `AF_PACKET`), pre-filtered in the kernel
//!   by a classic BPF program and port-matched in userspace
//!
//! The [`open_socket_reader`] factory is the single runtime dispatch point
//! between the two socket modes.
//!
//! ```ignore
//! use dstream::{open_socket_reader, SocketConfig, SocketMode};
//!
//! let config = SocketConfig::from_env()
//!     .mode(SocketMode::Udp)
//!     .address("127.0.0.1")
//!     .port(9999)
//!     .timeout_ms(1000)
//!     .chunk_size(9000);
//!
//! let mut reader = open_socket_reader(&config)?;
//! let mut buf = reader.chunk_buffer();
//! let n = reader.read_into(&mut buf)?;
//! ```

pub mod config;
pub mod file;
pub mod socket;
pub mod sys;
pub mod factory;

// Re-exports
pub use config::{parse_addr, FileConfig, SocketConfig, SocketMode};
pub use factory::{open_file_reader, open_socket_reader};
pub use file::FileReader;
pub use socket::raw::RawReader;
pub use socket::udp::UdpReader;

pub use dstream_core::{
    kdebug, kerror, kinfo, kprint, kprintln, ktrace, kwarn, set_log_level, ErrorKind, LogLevel,
    StreamError, StreamResult, StreamSource,
};
