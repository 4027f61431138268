//! Bound UDP datagram reader

use std::io;
use std::net::Ipv4Addr;

use dstream_core::{kdebug, PlatformSocket, Recv, SocketKind, StreamError, StreamResult, StreamSource};

use super::{enlarge_recv_buffer, install_timeout, open_socket};
use crate::config::SocketConfig;
use crate::sys::Socket;

/// One datagram per `read_into`, from a socket bound to `address:port`.
///
/// Datagrams longer than the chunk size are truncated by the kernel.
#[derive(Debug)]
pub struct UdpReader {
    sock: Socket,
    address: Ipv4Addr,
    port: u16,
    chunk_size: usize,
}

impl UdpReader {
    pub fn open(config: &SocketConfig) -> StreamResult<Self> {
        config.validate()?;
        let address = config.ipv4()?;

        let sock: Socket = open_socket(SocketKind::Datagram)?;
        enlarge_recv_buffer(&sock, config.recv_buffer);

        sock.bind_ipv4(address, config.port).map_err(|e| {
            StreamError::resource(format!("failed to bind {}:{}", address, config.port), e)
        })?;
        let port = sock
            .local_port()
            .map_err(|e| StreamError::resource("failed to query bound port", e))?;
        kdebug!("udp socket bound to {}:{}", address, port);

        install_timeout(&sock, config.recv_timeout())?;

        Ok(Self {
            sock,
            address,
            port,
            chunk_size: config.chunk_size,
        })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Bound port; differs from the configured one when that was 0
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Map one receive outcome onto the reader contract
pub(crate) fn recv_outcome(res: io::Result<Recv>) -> StreamResult<usize> {
    match res {
        Ok(Recv::Data(n)) => Ok(n),
        Ok(Recv::TimedOut) => Err(StreamError::Timeout),
        Ok(Recv::Interrupted) => Ok(0),
        Err(e) => Err(StreamError::Read(e)),
    }
}

impl StreamSource for UdpReader {
    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        recv_outcome(self.sock.recv(&mut buf[..self.chunk_size]))
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn type_tag(&self) -> String {
        "SocketReader<UDP>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dstream_core::ErrorKind;
    use std::net::UdpSocket;
    use std::time::{Duration, Instant};

    fn loopback(timeout_ms: i32, chunk: usize) -> UdpReader {
        let config = SocketConfig::new()
            .address("127.0.0.1")
            .port(0)
            .timeout_ms(timeout_ms)
            .chunk_size(chunk);
        UdpReader::open(&config).unwrap()
    }

    fn send(port: u16, data: &[u8]) {
        let tx = UdpSocket::bind("127.0.0.1:0").unwrap();
        tx.send_to(data, ("127.0.0.1", port)).unwrap();
    }

    #[test]
    fn test_receive_datagram() {
        let mut reader = loopback(1000, 9000);
        assert_ne!(reader.port(), 0);
        assert_eq!(reader.address(), Ipv4Addr::LOCALHOST);

        send(reader.port(), b"hello dstream");
        let mut buf = reader.chunk_buffer();
        let n = reader.read_into(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello dstream");
    }

    #[test]
    fn test_one_datagram_per_call() {
        let mut reader = loopback(1000, 9000);
        send(reader.port(), &[1u8; 100]);
        send(reader.port(), &[2u8; 200]);

        let mut buf = reader.chunk_buffer();
        assert_eq!(reader.read_into(&mut buf).unwrap(), 100);
        assert_eq!(reader.read_into(&mut buf).unwrap(), 200);
        assert!(buf[..200].iter().all(|&b| b == 2));
    }

    #[test]
    fn test_datagram_truncated_to_chunk() {
        let mut reader = loopback(1000, 64);
        send(reader.port(), &[7u8; 500]);

        let mut buf = vec![0u8; 128];
        assert_eq!(reader.read_into(&mut buf).unwrap(), 64);
        assert!(buf[64..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_timeout_is_recoverable() {
        let mut reader = loopback(100, 9000);
        let mut buf = reader.chunk_buffer();

        let start = Instant::now();
        let err = reader.read_into(&mut buf).unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(90));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_recoverable());

        // Still usable afterwards
        send(reader.port(), b"late");
        assert_eq!(reader.read_into(&mut buf).unwrap(), 4);
    }

    #[test]
    fn test_recv_outcome_mapping() {
        assert_eq!(recv_outcome(Ok(Recv::Data(12))).unwrap(), 12);
        assert_eq!(recv_outcome(Ok(Recv::Interrupted)).unwrap(), 0);
        assert!(recv_outcome(Ok(Recv::TimedOut)).unwrap_err().is_timeout());
        let err = recv_outcome(Err(io::Error::from(io::ErrorKind::ConnectionReset))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Read);
    }

    #[test]
    fn test_bad_address_is_config_error() {
        let config = SocketConfig::new().address("not-an-ip").port(0);
        let err = UdpReader::open(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_port_in_use_is_resource_error() {
        let taken = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();

        let config = SocketConfig::new().address("127.0.0.1").port(port);
        let err = UdpReader::open(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert!(err.to_string().contains("failed to bind"));
    }

    #[test]
    fn test_type_tag() {
        let reader = loopback(100, 1500);
        assert_eq!(reader.type_tag(), "SocketReader<UDP>");
        assert_eq!(reader.chunk_size(), 1500);
    }
}
