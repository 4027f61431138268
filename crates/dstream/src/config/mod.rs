//! Reader configuration
//!
//! Compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder calls
//! 2. Environment variables (`from_env()` only)
//! 3. Library defaults (`defaults`)
//!
//! # Example
//!
//! ```rust,ignore
//! use dstream::config::{SocketConfig, SocketMode};
//!
//! let config = SocketConfig::from_env()
//!     .mode(SocketMode::Raw)
//!     .device("enp3s0")
//!     .address("192.168.250.196")
//!     .port(9999)
//!     .chunk_size(7184);
//! ```

pub mod defaults;

use std::fmt;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use dstream_core::env::env_get;
use dstream_core::ConfigError;

/// Interface names are `IFNAMSIZ` (16) bytes including the NUL
const MAX_DEVICE_NAME: usize = 15;

/// Socket source selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SocketMode {
    /// Regular bound datagram socket
    #[default]
    Udp,
    /// Link-layer capture with kernel filter and userspace port match
    Raw,
}

impl fmt::Display for SocketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocketMode::Udp => write!(f, "UDP"),
            SocketMode::Raw => write!(f, "RAW"),
        }
    }
}

impl FromStr for SocketMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(SocketMode::Udp),
            "raw" => Ok(SocketMode::Raw),
            _ => Err(ConfigError::InvalidValue("mode must be udp or raw")),
        }
    }
}

/// Socket reader configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// UDP or raw capture
    pub mode: SocketMode,
    /// Local IPv4 address to bind (UDP mode)
    pub address: String,
    /// Local port (UDP) or destination port to match (raw)
    pub port: u16,
    /// Interface to capture on (raw mode)
    pub device: String,
    /// Receive timeout in milliseconds, `<= 0` blocks forever
    pub timeout_ms: i32,
    /// Maximum bytes delivered per read
    pub chunk_size: usize,
    /// Receive buffer target in bytes, best-effort
    pub recv_buffer: usize,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl SocketConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `DSTREAM_RCVBUF` - Receive buffer target in bytes
    /// - `DSTREAM_TIMEOUT_MS` - Receive timeout in milliseconds
    pub fn from_env() -> Self {
        Self {
            recv_buffer: env_get("DSTREAM_RCVBUF", defaults::RECV_BUFFER),
            timeout_ms: env_get("DSTREAM_TIMEOUT_MS", defaults::TIMEOUT_MS),
            ..Self::new()
        }
    }

    /// Create config with library defaults only (no env override).
    pub fn new() -> Self {
        Self {
            mode: SocketMode::Udp,
            address: defaults::ADDRESS.to_string(),
            port: defaults::PORT,
            device: defaults::DEVICE.to_string(),
            timeout_ms: defaults::TIMEOUT_MS,
            chunk_size: defaults::SOCKET_CHUNK_SIZE,
            recv_buffer: defaults::RECV_BUFFER,
        }
    }

    pub fn mode(mut self, mode: SocketMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn address(mut self, addr: impl Into<String>) -> Self {
        self.address = addr.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn device(mut self, dev: impl Into<String>) -> Self {
        self.device = dev.into();
        self
    }

    pub fn timeout_ms(mut self, ms: i32) -> Self {
        self.timeout_ms = ms;
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn recv_buffer(mut self, bytes: usize) -> Self {
        self.recv_buffer = bytes;
        self
    }

    /// Parsed bind address
    pub fn ipv4(&self) -> Result<Ipv4Addr, ConfigError> {
        self.address
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(self.address.clone()))
    }

    /// Receive timeout, `None` when blocking forever
    pub fn recv_timeout(&self) -> Option<Duration> {
        if self.timeout_ms > 0 {
            Some(Duration::from_millis(self.timeout_ms as u64))
        } else {
            None
        }
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("chunk_size must be > 0"));
        }
        match self.mode {
            SocketMode::Udp => {
                self.ipv4()?;
            }
            SocketMode::Raw => {
                if self.device.is_empty() {
                    return Err(ConfigError::InvalidValue("raw mode requires a device name"));
                }
                if self.device.len() > MAX_DEVICE_NAME {
                    return Err(ConfigError::InvalidValue("device name too long"));
                }
                if self.device.contains('\0') {
                    return Err(ConfigError::InvalidValue("device name contains NUL"));
                }
            }
        }
        Ok(())
    }
}

/// File reader configuration with builder pattern.
#[derive(Debug, Clone)]
pub struct FileConfig {
    /// File to read
    pub path: PathBuf,
    /// Maximum bytes delivered per read
    pub chunk_size: usize,
    /// Initial byte offset
    pub offset: u64,
    /// Read-ahead buffer in bytes, 0 reads straight from the file
    pub read_ahead: usize,
}

impl FileConfig {
    /// Create config from library defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `DSTREAM_READ_AHEAD` - Read-ahead buffer size in bytes
    pub fn from_env(path: impl AsRef<Path>, chunk_size: usize) -> Self {
        Self {
            read_ahead: env_get("DSTREAM_READ_AHEAD", defaults::READ_AHEAD),
            ..Self::new(path, chunk_size)
        }
    }

    /// Create config with library defaults only (no env override).
    pub fn new(path: impl AsRef<Path>, chunk_size: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size,
            offset: 0,
            read_ahead: defaults::READ_AHEAD,
        }
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn read_ahead(mut self, bytes: usize) -> Self {
        self.read_ahead = bytes;
        self
    }

    /// Validate configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::InvalidValue("chunk_size must be > 0"));
        }
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue("path must not be empty"));
        }
        Ok(())
    }
}

/// Split a `dev:ip:port` triple, e.g. `enp3s0:192.168.250.196:9999`.
///
/// The IP part is returned verbatim; `SocketConfig::validate` checks it.
pub fn parse_addr(s: &str) -> Result<(String, String, u16), ConfigError> {
    let (dev, rest) = s
        .split_once(':')
        .ok_or(ConfigError::InvalidFormat("missing first ':'"))?;
    let (ip, port) = rest
        .split_once(':')
        .ok_or(ConfigError::InvalidFormat("missing second ':'"))?;

    let port: u16 = match port.parse() {
        Ok(p) if p >= 1 => p,
        _ => return Err(ConfigError::InvalidPort(port.to_string())),
    };

    Ok((dev.to_string(), ip.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_defaults() {
        let config = SocketConfig::new();
        assert_eq!(config.mode, SocketMode::Udp);
        assert_eq!(config.port, 9999);
        assert_eq!(config.recv_buffer, 4 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_builder() {
        let config = SocketConfig::new()
            .mode(SocketMode::Raw)
            .device("eth0")
            .port(5000)
            .timeout_ms(250)
            .chunk_size(1500);

        assert_eq!(config.mode, SocketMode::Raw);
        assert_eq!(config.device, "eth0");
        assert_eq!(config.recv_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.chunk_size, 1500);
    }

    #[test]
    fn test_non_positive_timeout_blocks_forever() {
        assert_eq!(SocketConfig::new().timeout_ms(0).recv_timeout(), None);
        assert_eq!(SocketConfig::new().timeout_ms(-5).recv_timeout(), None);
    }

    #[test]
    fn test_socket_validation() {
        let config = SocketConfig::new().chunk_size(0);
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue("chunk_size must be > 0"))
        );

        let config = SocketConfig::new().address("300.1.2.3");
        assert!(matches!(config.validate(), Err(ConfigError::InvalidAddress(_))));

        let config = SocketConfig::new().mode(SocketMode::Raw).device("");
        assert!(config.validate().is_err());

        // Raw mode does not bind by address, so a bad one is tolerated
        let config = SocketConfig::new().mode(SocketMode::Raw).address("nope");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_mode_parse() {
        assert_eq!("RAW".parse::<SocketMode>(), Ok(SocketMode::Raw));
        assert_eq!("udp".parse::<SocketMode>(), Ok(SocketMode::Udp));
        assert!("tcp".parse::<SocketMode>().is_err());
        assert_eq!(SocketMode::Raw.to_string(), "RAW");
    }

    #[test]
    fn test_file_config() {
        let config = FileConfig::new("/tmp/x.bin", 4096).offset(100).read_ahead(0);
        assert_eq!(config.offset, 100);
        assert_eq!(config.read_ahead, 0);
        assert!(config.validate().is_ok());

        assert!(FileConfig::new("", 4096).validate().is_err());
        assert!(FileConfig::new("/tmp/x.bin", 0).validate().is_err());
    }

    #[test]
    fn test_file_config_env_read_ahead() {
        std::env::set_var("DSTREAM_READ_AHEAD", "65536");
        let config = FileConfig::from_env("/tmp/x.bin", 4096);
        std::env::remove_var("DSTREAM_READ_AHEAD");
        assert_eq!(config.read_ahead, 65536);
    }

    #[test]
    fn test_parse_addr() {
        let (dev, ip, port) = parse_addr("enp3s0:192.168.250.196:9999").unwrap();
        assert_eq!(dev, "enp3s0");
        assert_eq!(ip, "192.168.250.196");
        assert_eq!(port, 9999);
    }

    #[test]
    fn test_parse_addr_errors() {
        assert_eq!(
            parse_addr("lo"),
            Err(ConfigError::InvalidFormat("missing first ':'"))
        );
        assert_eq!(
            parse_addr("lo:127.0.0.1"),
            Err(ConfigError::InvalidFormat("missing second ':'"))
        );
        assert!(matches!(parse_addr("lo:127.0.0.1:0"), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(parse_addr("lo:127.0.0.1:70000"), Err(ConfigError::InvalidPort(_))));
        assert!(matches!(parse_addr("lo:127.0.0.1:99x"), Err(ConfigError::InvalidPort(_))));
    }
}
