//! Transport layer protocols implementation
//!
//! This module contains implementations for transport layer protocols:
//! - TCP: Transmission Control Protocol (segment codec only, no connection state)
//! - UDP: User Datagram Protocol

pub mod tcp;
pub mod udp;

pub use tcp::{TcpFlags, TcpMessage};
pub use udp::UdpMessage;

use crate::network::{checksum, IpProtocol};

/// Checksum a TCP or UDP segment together with its IPv4 pseudo header
///
/// Pseudo header: src_ip(4) + dst_ip(4) + zero(1) + protocol(1) + segment_len(2).
/// The segment's own checksum field must already be zeroed.
pub fn pseudo_header_checksum(src_ip: [u8; 4], dst_ip: [u8; 4], protocol: IpProtocol, segment: &[u8]) -> u16 {
    let mut buf = Vec::with_capacity(12 + segment.len());
    buf.extend_from_slice(&src_ip);
    buf.extend_from_slice(&dst_ip);
    buf.push(0);
    buf.push(protocol.into());
    buf.extend_from_slice(&(segment.len() as u16).to_be_bytes());
    buf.extend_from_slice(segment);

    checksum(&buf)
}
