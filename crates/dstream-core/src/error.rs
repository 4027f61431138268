//! Error types for dstream readers

use core::fmt;
use std::io;

/// Result type for reader operations
pub type StreamResult<T> = Result<T, StreamError>;

/// Coarse classification of a `StreamError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad address, port, device, path or size supplied at construction
    Config,
    /// OS refused to open, allocate, bind or configure a handle
    Resource,
    /// Requested source kind does not exist on this platform
    Unsupported,
    /// No data within the receive timeout
    Timeout,
    /// Captured frame could not be decoded
    Parse,
    /// Unrecoverable failure while reading
    Read,
}

/// Errors that can occur while building or reading a source
#[derive(Debug)]
pub enum StreamError {
    /// Invalid configuration, surfaced before any OS resource is touched
    Config(ConfigError),

    /// OS-level failure during construction. `context` names the step.
    Resource {
        context: String,
        source: io::Error,
    },

    /// Source kind not available on this platform
    Unsupported(&'static str),

    /// No data arrived within the configured timeout
    Timeout,

    /// Malformed captured frame
    Parse(ParseError),

    /// Underlying read failed (not a timeout, interruption or end-of-stream)
    Read(io::Error),
}

impl StreamError {
    /// Build a resource error for a named setup step
    pub fn resource(context: impl Into<String>, source: io::Error) -> Self {
        StreamError::Resource {
            context: context.into(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            StreamError::Config(_) => ErrorKind::Config,
            StreamError::Resource { .. } => ErrorKind::Resource,
            StreamError::Unsupported(_) => ErrorKind::Unsupported,
            StreamError::Timeout => ErrorKind::Timeout,
            StreamError::Parse(_) => ErrorKind::Parse,
            StreamError::Read(_) => ErrorKind::Read,
        }
    }

    /// True when the caller is expected to simply call `read_into` again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StreamError::Timeout)
    }

    /// Shorthand for `kind() == ErrorKind::Timeout`
    pub fn is_timeout(&self) -> bool {
        matches!(self, StreamError::Timeout)
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Config(e) => write!(f, "{}", e),
            StreamError::Resource { context, source } => write!(f, "{}: {}", context, source),
            StreamError::Unsupported(what) => write!(f, "unsupported on this platform: {}", what),
            StreamError::Timeout => write!(f, "socket receive timeout expired"),
            StreamError::Parse(e) => write!(f, "frame parse error: {}", e),
            StreamError::Read(e) => write!(f, "read error: {}", e),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Config(e) => Some(e),
            StreamError::Resource { source, .. } => Some(source),
            StreamError::Parse(e) => Some(e),
            StreamError::Read(e) => Some(e),
            StreamError::Unsupported(_) | StreamError::Timeout => None,
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A field holds a value outside its allowed range
    InvalidValue(&'static str),

    /// Address string is not a dotted-quad IPv4 address
    InvalidAddress(String),

    /// Port string is not in 1..=65535
    InvalidPort(String),

    /// `dev:ip:port` triple is missing a separator
    InvalidFormat(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "invalid config: {}", msg),
            ConfigError::InvalidAddress(addr) => write!(f, "invalid IP address: {}", addr),
            ConfigError::InvalidPort(port) => write!(f, "invalid port number: {}", port),
            ConfigError::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for StreamError {
    fn from(e: ConfigError) -> Self {
        StreamError::Config(e)
    }
}

/// Captured-frame decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Frame shorter than Ethernet + minimal IPv4 + UDP headers
    FrameTooShort { len: usize },

    /// IHL field decodes to fewer than 20 bytes
    BadIpHeaderLength { len: usize },

    /// IPv4 options push the UDP header past the end of the frame
    Truncated { len: usize, needed: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::FrameTooShort { len } => {
                write!(f, "received frame too small for UDP packet ({} bytes)", len)
            }
            ParseError::BadIpHeaderLength { len } => {
                write!(f, "invalid IP header length: {}", len)
            }
            ParseError::Truncated { len, needed } => {
                write!(f, "frame size mismatch: {} bytes, headers need {}", len, needed)
            }
        }
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for StreamError {
    fn from(e: ParseError) -> Self {
        StreamError::Parse(e)
    }
}
