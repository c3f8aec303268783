//! UDP (User Datagram Protocol) implementation
//!
//! This module provides UDP datagram parsing and serialization.

use std::fmt;

use crate::error::FormatError;
use crate::network::IpProtocol;
use crate::transport::pseudo_header_checksum;
use byteorder::{BigEndian, ByteOrder};

/// UDP header length in bytes
pub const UDP_HEADER_LEN: usize = 8;

/// UDP datagram
///
/// Represents the 8-byte UDP header as defined in RFC 768 plus its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpMessage {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16, // Length of UDP header and data
    pub checksum: u16,
    pub data: Vec<u8>,
}

impl UdpMessage {
    /// Parse a UDP datagram; everything after the header is data
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < UDP_HEADER_LEN {
            return Err(FormatError::too_short("UDP", UDP_HEADER_LEN, data.len()));
        }

        Ok(UdpMessage {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            length: BigEndian::read_u16(&data[4..6]),
            checksum: BigEndian::read_u16(&data[6..8]),
            data: data[UDP_HEADER_LEN..].to_vec(),
        })
    }

    /// Serialize the datagram sent from `src_ip` to `dst_ip`
    ///
    /// The length field is derived from the data. A computed checksum of zero
    /// goes on the wire as 0xFFFF, since zero means "no checksum".
    pub fn encode(&self, src_ip: [u8; 4], dst_ip: [u8; 4]) -> Vec<u8> {
        let total_len = UDP_HEADER_LEN + self.data.len();
        let mut bytes = vec![0u8; total_len];
        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u16(&mut bytes[4..6], total_len as u16);
        bytes[UDP_HEADER_LEN..].copy_from_slice(&self.data);

        let sum = match pseudo_header_checksum(src_ip, dst_ip, IpProtocol::Udp, &bytes) {
            0 => 0xFFFF,
            sum => sum,
        };
        BigEndian::write_u16(&mut bytes[6..8], sum);
        bytes
    }

    /// Build the echo of this datagram: same data, ports swapped
    pub fn echo(&self) -> UdpMessage {
        UdpMessage {
            src_port: self.dst_port,
            dst_port: self.src_port,
            length: (UDP_HEADER_LEN + self.data.len()) as u16,
            checksum: 0,
            data: self.data.clone(),
        }
    }
}

impl fmt::Display for UdpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[UDP] Port {} -> {} | Len: {} | Sum: 0x{:04x}",
            self.src_port, self.dst_port, self.length, self.checksum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const SRC: [u8; 4] = [10, 0, 0, 5];
    const DST: [u8; 4] = [10, 0, 0, 1];

    fn datagram(data: &[u8]) -> UdpMessage {
        UdpMessage {
            src_port: 40000,
            dst_port: 7,
            length: 0,
            checksum: 0,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_encode_checksum_verifies() {
        let bytes = datagram(b"hello").encode(SRC, DST);
        assert_eq!(bytes.len(), 13);
        assert_eq!(BigEndian::read_u16(&bytes[4..6]), 13);
        assert_eq!(pseudo_header_checksum(SRC, DST, IpProtocol::Udp, &bytes), 0);
    }

    #[test]
    fn test_zero_checksum_sent_as_all_ones() {
        // Pick a data word that cancels the rest of the sum exactly
        let mut msg = datagram(&[0x12, 0x34, 0x00, 0x00]);
        let first = msg.encode(SRC, DST);
        msg.data[2..4].copy_from_slice(&first[6..8]);

        let bytes = msg.encode(SRC, DST);
        let mut zeroed = bytes.clone();
        zeroed[6] = 0;
        zeroed[7] = 0;
        assert_eq!(pseudo_header_checksum(SRC, DST, IpProtocol::Udp, &zeroed), 0);
        assert_eq!(&bytes[6..8], &[0xFF, 0xFF]);
        assert_eq!(pseudo_header_checksum(SRC, DST, IpProtocol::Udp, &bytes), 0);
    }

    #[test]
    fn test_minimum_length() {
        let bytes = datagram(b"").encode(SRC, DST);
        assert!(UdpMessage::parse(&bytes).unwrap().data.is_empty());
        assert_eq!(
            UdpMessage::parse(&bytes[..UDP_HEADER_LEN - 1]),
            Err(FormatError::too_short("UDP", 8, 7))
        );
    }

    #[test]
    fn test_echo_swaps_ports() {
        let echo = datagram(b"abc").echo();
        assert_eq!((echo.src_port, echo.dst_port), (7, 40000));
        assert_eq!(echo.data, b"abc");
    }

    #[test]
    fn test_round_trip_random() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let len = rng.gen_range(0..64);
            let mut msg = UdpMessage {
                src_port: rng.gen(),
                dst_port: rng.gen(),
                length: (UDP_HEADER_LEN + len) as u16,
                checksum: 0,
                data: (0..len).map(|_| rng.gen()).collect(),
            };
            let (src, dst) = (rng.gen(), rng.gen());
            let bytes = msg.encode(src, dst);
            msg.checksum = BigEndian::read_u16(&bytes[6..8]);
            assert_ne!(msg.checksum, 0);
            assert_eq!(UdpMessage::parse(&bytes).unwrap(), msg);
        }
    }
}
