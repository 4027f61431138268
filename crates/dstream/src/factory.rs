//! Reader construction
//!
//! The only place that picks a concrete reader at runtime. Everything
//! downstream works through `Box<dyn StreamSource>`.

use dstream_core::{kdebug, StreamResult, StreamSource};

use crate::config::{FileConfig, SocketConfig, SocketMode};
use crate::file::FileReader;
use crate::socket::raw::RawReader;
use crate::socket::udp::UdpReader;

/// Build the socket reader selected by `config.mode`.
///
/// Fails with `StreamError::Unsupported` for raw mode on platforms without
/// link-layer capture sockets.
pub fn open_socket_reader(config: &SocketConfig) -> StreamResult<Box<dyn StreamSource>> {
    config.validate()?;
    let reader: Box<dyn StreamSource> = match config.mode {
        SocketMode::Udp => Box::new(UdpReader::open(config)?),
        SocketMode::Raw => Box::new(RawReader::open(config)?),
    };
    kdebug!(
        "{} reader ready: chunk {} bytes, timeout {} ms",
        config.mode,
        config.chunk_size,
        config.timeout_ms
    );
    Ok(reader)
}

/// Build a file reader behind the same capability.
pub fn open_file_reader(config: &FileConfig) -> StreamResult<Box<dyn StreamSource>> {
    Ok(Box::new(FileReader::with_config(config)?))
}
