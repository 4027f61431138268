//! Library defaults, overridable through the environment

use dstream_core::constants;

/// File read-ahead buffer (`DSTREAM_READ_AHEAD`)
pub const READ_AHEAD: usize = constants::DEFAULT_READ_AHEAD;

/// Socket receive buffer target (`DSTREAM_RCVBUF`)
pub const RECV_BUFFER: usize = constants::SOCKET_RCVBUF_SIZE;

/// Receive timeout in milliseconds (`DSTREAM_TIMEOUT_MS`)
pub const TIMEOUT_MS: i32 = 1000;

/// Socket chunk size, one jumbo-frame payload
pub const SOCKET_CHUNK_SIZE: usize = 9000;

/// File chunk size (4 MiB)
pub const FILE_CHUNK_SIZE: usize = 4 * 1024 * 1024;

pub const ADDRESS: &str = "127.0.0.1";
pub const PORT: u16 = 9999;
pub const DEVICE: &str = "lo";
