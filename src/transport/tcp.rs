//! TCP (Transmission Control Protocol) segment codec
//!
//! Parsing and serialization only. Options on ingress are skipped using the
//! data offset and never interpreted; egress segments carry none.

use std::fmt;

use crate::error::FormatError;
use crate::network::IpProtocol;
use crate::transport::pseudo_header_checksum;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

/// Minimum TCP header length in bytes
pub const TCP_HEADER_LEN: usize = 20;
const MIN_DATA_OFFSET: u8 = 5;
const MAX_DATA_OFFSET: u8 = 15; // 4-bit field

bitflags! {
    /// Control bits from the low 6 bits of byte 13
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TcpFlags: u8 {
        const FIN = 0x01;
        const SYN = 0x02;
        const RST = 0x04;
        const PSH = 0x08;
        const ACK = 0x10;
        const URG = 0x20;
    }
}

/// TCP segment
///
/// The header as defined in RFC 793 plus the data that follows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpMessage {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_number: u32,
    pub ack_number: u32,
    pub data_offset: u8, // header length in 32-bit words
    pub flags: TcpFlags,
    pub window_size: u16,
    pub checksum: u16,
    pub urgent_ptr: u16,
    pub data: Vec<u8>,
}

impl TcpMessage {
    /// Parse a TCP segment
    ///
    /// Fails when the buffer is shorter than the fixed header or than the
    /// header length declared by the data offset.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < TCP_HEADER_LEN {
            return Err(FormatError::too_short("TCP", TCP_HEADER_LEN, data.len()));
        }

        let data_offset = data[12] >> 4;
        let header_len = data_offset as usize * 4;
        if data.len() < header_len {
            return Err(FormatError::HeaderOverrun {
                what: "TCP",
                declared: header_len,
                actual: data.len(),
            });
        }

        Ok(TcpMessage {
            src_port: BigEndian::read_u16(&data[0..2]),
            dst_port: BigEndian::read_u16(&data[2..4]),
            seq_number: BigEndian::read_u32(&data[4..8]),
            ack_number: BigEndian::read_u32(&data[8..12]),
            data_offset,
            flags: TcpFlags::from_bits_truncate(data[13]),
            window_size: BigEndian::read_u16(&data[14..16]),
            checksum: BigEndian::read_u16(&data[16..18]),
            urgent_ptr: BigEndian::read_u16(&data[18..20]),
            // An offset below 5 cannot point inside the fixed header
            data: data[header_len.max(TCP_HEADER_LEN)..].to_vec(),
        })
    }

    /// Serialize the segment sent from `src_ip` to `dst_ip`
    ///
    /// A data offset below 5 (including unset) is written as 5 and one above
    /// 15 as 15. A larger offset reserves a zero-filled option area.
    pub fn encode(&self, src_ip: [u8; 4], dst_ip: [u8; 4]) -> Vec<u8> {
        let data_offset = self.data_offset.clamp(MIN_DATA_OFFSET, MAX_DATA_OFFSET);
        let header_len = data_offset as usize * 4;
        let mut bytes = vec![0u8; header_len + self.data.len()];

        BigEndian::write_u16(&mut bytes[0..2], self.src_port);
        BigEndian::write_u16(&mut bytes[2..4], self.dst_port);
        BigEndian::write_u32(&mut bytes[4..8], self.seq_number);
        BigEndian::write_u32(&mut bytes[8..12], self.ack_number);
        bytes[12] = data_offset << 4;
        bytes[13] = self.flags.bits();
        BigEndian::write_u16(&mut bytes[14..16], self.window_size);
        BigEndian::write_u16(&mut bytes[18..20], self.urgent_ptr);
        bytes[header_len..].copy_from_slice(&self.data);

        let sum = pseudo_header_checksum(src_ip, dst_ip, IpProtocol::Tcp, &bytes);
        BigEndian::write_u16(&mut bytes[16..18], sum);
        bytes
    }

    /// Get the header length in bytes
    pub fn header_len(&self) -> usize {
        self.data_offset.clamp(MIN_DATA_OFFSET, MAX_DATA_OFFSET) as usize * 4
    }
}

impl fmt::Display for TcpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.flags.iter_names().map(|(name, _)| name).collect();
        write!(
            f,
            "[TCP] {} -> {} | Seq: {} | Ack: {} | Flags: [{}]",
            self.src_port,
            self.dst_port,
            self.seq_number,
            self.ack_number,
            names.join(" ")
        )
    }
}
