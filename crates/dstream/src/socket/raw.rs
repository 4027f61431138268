//! Link-layer UDP capture
//!
//! Frames come off an `AF_PACKET` socket bound to one interface. The kernel
//! filter admits IPv4/UDP only; each `read_into` then walks the headers of
//! every captured frame until one is addressed to the target port.
//!
//! A busy link carrying other UDP ports can keep the loop spinning without
//! any single receive timing out, so the whole call is bounded by the
//! configured timeout as well.

use std::io;
use std::time::{Duration, Instant};

use dstream_core::{ktrace, Recv, StreamError, StreamResult, StreamSource};

use super::frame::{parse_frame, Verdict};
use crate::config::SocketConfig;
use crate::sys::Socket;

/// `sll_pkttype` of frames this host transmitted (linux/if_packet.h)
pub const PACKET_OUTGOING: u8 = 4;

/// Receive frames through `recv` until one carries a UDP payload for `port`,
/// then copy that payload (truncated to `out.len()`) into `out`.
///
/// `recv` fills `scratch` and reports the outcome plus the frame's packet
/// type. `budget` bounds the total time spent discarding frames.
pub(crate) fn capture_loop<F>(
    mut recv: F,
    scratch: &mut [u8],
    out: &mut [u8],
    port: u16,
    budget: Option<Duration>,
) -> StreamResult<usize>
where
    F: FnMut(&mut [u8]) -> io::Result<(Recv, u8)>,
{
    let deadline = budget.map(|b| Instant::now() + b);

    loop {
        let (outcome, pkttype) = recv(scratch).map_err(StreamError::Read)?;
        let len = match outcome {
            Recv::Data(n) => n,
            Recv::TimedOut => return Err(StreamError::Timeout),
            Recv::Interrupted => return Ok(0),
        };

        if pkttype == PACKET_OUTGOING {
            ktrace!("skip outgoing frame ({} bytes)", len);
        } else {
            match parse_frame(&scratch[..len], port)? {
                Verdict::Payload(range) => {
                    let n = range.len().min(out.len());
                    out[..n].copy_from_slice(&scratch[range.start..range.start + n]);
                    if n < range.len() {
                        ktrace!("payload of {} bytes truncated to {}", range.len(), n);
                    }
                    return Ok(n);
                }
                Verdict::OtherPort(p) => ktrace!("skip frame for port {}", p),
                Verdict::NotUdp => ktrace!("skip non-udp frame ({} bytes)", len),
            }
        }

        if let Some(d) = deadline {
            if Instant::now() >= d {
                return Err(StreamError::Timeout);
            }
        }
    }
}

/// Raw capture reader delivering UDP payloads addressed to one port.
#[derive(Debug)]
pub struct RawReader {
    sock: Socket,
    scratch: Box<[u8]>,
    device: String,
    port: u16,
    chunk_size: usize,
    timeout: Option<Duration>,
}

impl RawReader {
    #[cfg(target_os = "linux")]
    pub fn open(config: &SocketConfig) -> StreamResult<Self> {
        use dstream_core::constants::MAX_FRAME_SIZE;
        use dstream_core::{kdebug, SocketKind};

        use super::filter::{to_sock_filter, UDP_IPV4_FILTER};
        use super::{enlarge_recv_buffer, install_timeout, open_socket};

        config.validate()?;
        let device = config.device.clone();

        let sock: Socket = open_socket(SocketKind::Packet)?;
        enlarge_recv_buffer(&sock, config.recv_buffer);

        sock.attach_filter(&to_sock_filter(&UDP_IPV4_FILTER))
            .map_err(|e| StreamError::resource("failed to attach BPF filter", e))?;
        kdebug!("attached {}-instruction udp/ipv4 filter", UDP_IPV4_FILTER.len());

        sock.bind_to_device(&device).map_err(|e| {
            StreamError::resource(format!("failed to bind to device {}", device), e)
        })?;
        let ifindex = sock.interface_index(&device).map_err(|e| {
            StreamError::resource(format!("failed to get interface index for {}", device), e)
        })?;
        kdebug!("device {} has ifindex {}", device, ifindex);

        sock.bind_link(ifindex).map_err(|e| {
            StreamError::resource(format!("failed to bind raw socket to {}", device), e)
        })?;

        install_timeout(&sock, config.recv_timeout())?;

        Ok(Self {
            sock,
            scratch: vec![0u8; MAX_FRAME_SIZE].into_boxed_slice(),
            device,
            port: config.port,
            chunk_size: config.chunk_size,
            timeout: config.recv_timeout(),
        })
    }

    #[cfg(not(target_os = "linux"))]
    pub fn open(config: &SocketConfig) -> StreamResult<Self> {
        config.validate()?;
        Err(StreamError::Unsupported("raw socket capture"))
    }

    /// Interface frames are captured on
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Destination port payloads are matched against
    pub fn port(&self) -> u16 {
        self.port
    }

    #[cfg(target_os = "linux")]
    fn recv_frame(sock: &Socket, scratch: &mut [u8]) -> io::Result<(Recv, u8)> {
        sock.recv_link(scratch)
    }

    #[cfg(not(target_os = "linux"))]
    fn recv_frame(_sock: &Socket, _scratch: &mut [u8]) -> io::Result<(Recv, u8)> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "raw socket capture"))
    }
}

impl StreamSource for RawReader {
    fn read_into(&mut self, buf: &mut [u8]) -> StreamResult<usize> {
        let sock = &self.sock;
        capture_loop(
            |scratch| Self::recv_frame(sock, scratch),
            &mut self.scratch,
            &mut buf[..self.chunk_size],
            self.port,
            self.timeout,
        )
    }

    fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    fn type_tag(&self) -> String {
        "SocketReader<RAW>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::frame::synth::udp_frame;
    use dstream_core::constants::MAX_FRAME_SIZE;
    use dstream_core::{ErrorKind, ParseError};
    use std::collections::VecDeque;

    const PACKET_HOST: u8 = 0;

    enum Feed {
        Frame(Vec<u8>, u8),
        TimedOut,
        Interrupted,
        Fail,
    }

    fn feeder(items: Vec<Feed>) -> impl FnMut(&mut [u8]) -> io::Result<(Recv, u8)> {
        let mut q: VecDeque<Feed> = items.into();
        move |scratch| match q.pop_front().expect("capture loop read past the feed") {
            Feed::Frame(f, ty) => {
                scratch[..f.len()].copy_from_slice(&f);
                Ok((Recv::Data(f.len()), ty))
            }
            Feed::TimedOut => Ok((Recv::TimedOut, 0)),
            Feed::Interrupted => Ok((Recv::Interrupted, 0)),
            Feed::Fail => Err(io::Error::from(io::ErrorKind::BrokenPipe)),
        }
    }

    fn run(items: Vec<Feed>, out: &mut [u8], budget: Option<Duration>) -> StreamResult<usize> {
        let mut scratch = vec![0u8; MAX_FRAME_SIZE];
        capture_loop(feeder(items), &mut scratch, out, 9999, budget)
    }

    #[test]
    fn test_matching_frame() {
        let payload: Vec<u8> = (0..=255).collect();
        let mut out = vec![0u8; 9000];
        let n = run(vec![Feed::Frame(udp_frame(6, 9999, &payload), PACKET_HOST)], &mut out, None).unwrap();
        assert_eq!(&out[..n], payload.as_slice());
    }

    #[test]
    fn test_mismatch_then_match_in_one_call() {
        let mut out = vec![0u8; 9000];
        let n = run(
            vec![
                Feed::Frame(udp_frame(5, 53, b"dns"), PACKET_HOST),
                Feed::Frame(udp_frame(5, 9999, b"mine"), PACKET_OUTGOING),
                Feed::Frame(udp_frame(5, 9999, b"wanted"), PACKET_HOST),
            ],
            &mut out,
            None,
        )
        .unwrap();
        assert_eq!(&out[..n], b"wanted");
    }

    #[test]
    fn test_payload_truncated_to_chunk() {
        let mut out = vec![0u8; 16];
        let n = run(vec![Feed::Frame(udp_frame(5, 9999, &[9u8; 100]), PACKET_HOST)], &mut out, None).unwrap();
        assert_eq!(n, 16);
    }

    #[test]
    fn test_short_frame_is_parse_error() {
        let mut out = vec![0u8; 64];
        let frame = udp_frame(5, 9999, b"")[..41].to_vec();
        let err = run(vec![Feed::Frame(frame, PACKET_HOST)], &mut out, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(matches!(err, StreamError::Parse(ParseError::FrameTooShort { len: 41 })));
    }

    #[test]
    fn test_timeout_and_interrupt() {
        let mut out = vec![0u8; 64];
        assert!(run(vec![Feed::TimedOut], &mut out, None).unwrap_err().is_timeout());
        assert_eq!(run(vec![Feed::Interrupted], &mut out, None).unwrap(), 0);
        assert_eq!(
            run(vec![Feed::Fail], &mut out, None).unwrap_err().kind(),
            ErrorKind::Read
        );
    }

    #[test]
    fn test_mismatch_loop_bounded_by_timeout() {
        let mut scratch = vec![0u8; MAX_FRAME_SIZE];
        let mut out = vec![0u8; 64];
        let noise = udp_frame(5, 1234, b"noise");
        let mut seen = 0u32;
        let recv = |s: &mut [u8]| {
            seen += 1;
            std::thread::sleep(Duration::from_millis(2));
            s[..noise.len()].copy_from_slice(&noise);
            Ok((Recv::Data(noise.len()), PACKET_HOST))
        };

        let start = Instant::now();
        let err = capture_loop(recv, &mut scratch, &mut out, 9999, Some(Duration::from_millis(30)))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() >= Duration::from_millis(30));
        assert!(seen > 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_open_without_capability_or_device() {
        // Missing CAP_NET_RAW fails at socket creation, a missing device at
        // bind; both are resource errors
        let config = SocketConfig::new()
            .mode(crate::config::SocketMode::Raw)
            .device("dstreamnone0")
            .port(9999);
        let err = RawReader::open(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[cfg(not(target_os = "linux"))]
    #[test]
    fn test_open_unsupported() {
        let config = SocketConfig::new().mode(crate::config::SocketMode::Raw).device("en0");
        let err = RawReader::open(&config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_empty_device_is_config_error() {
        let config = SocketConfig::new().mode(crate::config::SocketMode::Raw).device("");
        assert_eq!(RawReader::open(&config).unwrap_err().kind(), ErrorKind::Config);
    }
}
