//! Ethernet / IPv4 / UDP frame walking
//!
//! ```text
//!  0             14                14+IHL         14+IHL+8
//!  | Ethernet II  | IPv4 (20..60)   | UDP header   | payload ...
//!  | ..type@12..  | ver/ihl@14      | dport@+2..+4 |
//!  |              | proto@23        |              |
//! ```

use std::ops::Range;

use dstream_core::constants::{
    ETHERTYPE_IPV4, ETH_HEADER_LEN, IPPROTO_UDP, IPV4_MIN_HEADER_LEN, MIN_UDP_FRAME_LEN,
    UDP_HEADER_LEN,
};
use dstream_core::ParseError;

const ETHERTYPE_OFFSET: usize = 12;
const IP_PROTO_OFFSET: usize = ETH_HEADER_LEN + 9;

/// What a captured frame turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// UDP payload for the target port, as a range into the frame
    Payload(Range<usize>),
    /// UDP datagram addressed to another port
    OtherPort(u16),
    /// Not an IPv4/UDP frame
    NotUdp,
}

#[inline]
fn be16(b: &[u8], off: usize) -> u16 {
    u16::from_be_bytes([b[off], b[off + 1]])
}

/// Locate the UDP payload of `frame` if its destination port is `port`.
///
/// Frames shorter than the minimal header stack, with an IHL below 5, or
/// whose IPv4 options run past the end are parse errors.
pub fn parse_frame(frame: &[u8], port: u16) -> Result<Verdict, ParseError> {
    let len = frame.len();
    if len < MIN_UDP_FRAME_LEN {
        return Err(ParseError::FrameTooShort { len });
    }

    if be16(frame, ETHERTYPE_OFFSET) != ETHERTYPE_IPV4 || frame[IP_PROTO_OFFSET] != IPPROTO_UDP {
        return Ok(Verdict::NotUdp);
    }

    let ip_header_len = ((frame[ETH_HEADER_LEN] & 0x0F) as usize) * 4;
    if ip_header_len < IPV4_MIN_HEADER_LEN {
        return Err(ParseError::BadIpHeaderLength { len: ip_header_len });
    }

    let udp = ETH_HEADER_LEN + ip_header_len;
    let headers = udp + UDP_HEADER_LEN;
    if len < headers {
        return Err(ParseError::Truncated { len, needed: headers });
    }

    let dport = be16(frame, udp + 2);
    if dport != port {
        return Ok(Verdict::OtherPort(dport));
    }

    Ok(Verdict::Payload(headers..len))
}
