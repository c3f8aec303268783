//! IPv4 protocol implementation
//!
//! This module provides IPv4 header parsing and serialization.
//!
//! Features:
//! - Permissive parsing (no version or checksum enforcement on ingress)
//! - Fixed 20-byte serialization with the checksum computed and patched in
//! - Payload extraction bounded by the header and total length fields
//!
//! Options are not supported: an ingress header with options is skipped over
//! using IHL, and egress headers never carry any.

use std::fmt;

use crate::error::FormatError;
use crate::network::checksum;
use byteorder::{BigEndian, ByteOrder};

pub const IPV4_HEADER_LEN: usize = 20;
const IPV4_VERSION: u8 = 4;
const DEFAULT_IHL: u8 = 5; // 5 * 4 = 20 bytes
const DEFAULT_TTL: u8 = 64;

const FRAGMENT_OFFSET_MASK: u16 = 0x1FFF;

/// Protocol carried in the IPv4 payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpProtocol {
    Icmp,
    Tcp,
    Udp,
    Other(u8),
}

impl From<u8> for IpProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => IpProtocol::Icmp,
            6 => IpProtocol::Tcp,
            17 => IpProtocol::Udp,
            other => IpProtocol::Other(other),
        }
    }
}

impl From<IpProtocol> for u8 {
    fn from(value: IpProtocol) -> Self {
        match value {
            IpProtocol::Icmp => 1,
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
            IpProtocol::Other(other) => other,
        }
    }
}

impl fmt::Display for IpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpProtocol::Icmp => f.write_str("ICMP"),
            IpProtocol::Tcp => f.write_str("TCP"),
            IpProtocol::Udp => f.write_str("UDP"),
            IpProtocol::Other(n) => write!(f, "Unknown({})", n),
        }
    }
}

/// IPv4 packet header
///
/// Represents the 20-byte option-less IPv4 header as defined in RFC 791
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Header {
    pub version: u8,
    pub ihl: u8, // Internet Header Length, in 32-bit words
    pub tos: u8, // Type of Service
    pub total_len: u16,
    pub id: u16,
    pub flags: u8,            // top 3 bits of the flags/fragment field
    pub fragment_offset: u16, // bottom 13 bits
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub src_addr: [u8; 4],
    pub dst_addr: [u8; 4],
}

impl Ipv4Header {
    /// Create an egress header carrying `payload_len` bytes
    ///
    /// Version 4, IHL 5, TTL 64, identification 0 and no fragmentation flags.
    /// The checksum is left at zero; [`Ipv4Header::encode`] computes it.
    pub fn new(protocol: IpProtocol, src_addr: [u8; 4], dst_addr: [u8; 4], payload_len: usize) -> Self {
        Ipv4Header {
            version: IPV4_VERSION,
            ihl: DEFAULT_IHL,
            tos: 0,
            total_len: (IPV4_HEADER_LEN + payload_len) as u16,
            id: 0,
            flags: 0,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src_addr,
            dst_addr,
        }
    }

    /// Parse an IPv4 header from the start of a byte slice
    ///
    /// Only the length is checked; version and checksum are taken as found.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < IPV4_HEADER_LEN {
            return Err(FormatError::too_short("IPv4", IPV4_HEADER_LEN, data.len()));
        }

        let flags_frag = BigEndian::read_u16(&data[6..8]);
        let mut src_addr = [0u8; 4];
        let mut dst_addr = [0u8; 4];
        src_addr.copy_from_slice(&data[12..16]);
        dst_addr.copy_from_slice(&data[16..20]);

        Ok(Ipv4Header {
            version: data[0] >> 4,
            ihl: data[0] & 0x0F,
            tos: data[1],
            total_len: BigEndian::read_u16(&data[2..4]),
            id: BigEndian::read_u16(&data[4..6]),
            flags: (flags_frag >> 13) as u8,
            fragment_offset: flags_frag & FRAGMENT_OFFSET_MASK,
            ttl: data[8],
            protocol: IpProtocol::from(data[9]),
            checksum: BigEndian::read_u16(&data[10..12]),
            src_addr,
            dst_addr,
        })
    }

    /// Serialize to a 20-byte header with a freshly computed checksum
    ///
    /// The stored `checksum` field is ignored.
    pub fn encode(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = self.encode_unchecked();
        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[10..12], sum);
        bytes
    }

    /// Header bytes with the checksum field zeroed
    fn encode_unchecked(&self) -> [u8; IPV4_HEADER_LEN] {
        let mut bytes = [0u8; IPV4_HEADER_LEN];
        bytes[0] = (self.version << 4) | (self.ihl & 0x0F);
        bytes[1] = self.tos;
        BigEndian::write_u16(&mut bytes[2..4], self.total_len);
        BigEndian::write_u16(&mut bytes[4..6], self.id);
        let flags_frag = ((self.flags as u16 & 0x07) << 13) | (self.fragment_offset & FRAGMENT_OFFSET_MASK);
        BigEndian::write_u16(&mut bytes[6..8], flags_frag);
        bytes[8] = self.ttl;
        bytes[9] = self.protocol.into();
        // bytes[10..12] stays zero
        bytes[12..16].copy_from_slice(&self.src_addr);
        bytes[16..20].copy_from_slice(&self.dst_addr);
        bytes
    }

    /// Check the stored checksum against the other header fields
    pub fn has_valid_checksum(&self) -> bool {
        checksum(&self.encode_unchecked()) == self.checksum
    }

    /// Get the declared header length in bytes
    pub fn header_len(&self) -> usize {
        (self.ihl as usize) * 4
    }

    /// Slice the transport payload out of a whole IPv4 packet
    ///
    /// The payload starts after IHL words and ends at `total_len`, clamped to
    /// the bytes present so trailing link-layer padding is dropped.
    pub fn payload<'a>(&self, packet: &'a [u8]) -> Result<&'a [u8], FormatError> {
        let header_len = self.header_len();
        if header_len < IPV4_HEADER_LEN || header_len > packet.len() {
            return Err(FormatError::HeaderOverrun {
                what: "IPv4",
                declared: header_len,
                actual: packet.len(),
            });
        }

        let end = (self.total_len as usize).clamp(header_len, packet.len());
        Ok(&packet[header_len..end])
    }
}

impl fmt::Display for Ipv4Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[IPv4] {} -> {} | Proto: {} | Len: {} | TTL: {}",
            DottedQuad(&self.src_addr),
            DottedQuad(&self.dst_addr),
            self.protocol,
            self.total_len,
            self.ttl
        )
    }
}

/// Formats a 4-byte address as `a.b.c.d`
pub struct DottedQuad<'a>(pub &'a [u8; 4]);

impl fmt::Display for DottedQuad<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = *self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}
