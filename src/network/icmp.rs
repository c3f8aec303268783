//! ICMP (Internet Control Message Protocol) implementation
//!
//! Parsing and serialization of ICMP messages. Only Echo Request and Echo
//! Reply are interpreted; other types pass through as opaque data.

use std::fmt;

use crate::error::FormatError;
use crate::network::checksum;
use byteorder::{BigEndian, ByteOrder};

/// ICMP header length in bytes
pub const ICMP_HEADER_LEN: usize = 8;

/// ICMP message types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IcmpType {
    EchoReply,
    EchoRequest,
    Other(u8),
}

impl From<u8> for IcmpType {
    fn from(value: u8) -> Self {
        match value {
            0 => IcmpType::EchoReply,
            8 => IcmpType::EchoRequest,
            other => IcmpType::Other(other),
        }
    }
}

impl From<IcmpType> for u8 {
    fn from(value: IcmpType) -> Self {
        match value {
            IcmpType::EchoReply => 0,
            IcmpType::EchoRequest => 8,
            IcmpType::Other(other) => other,
        }
    }
}

/// An ICMP message as defined in RFC 792
///
/// `identifier` and `sequence` are the Echo fields; for other types they hold
/// the raw "rest of header" word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpMessage {
    pub msg_type: IcmpType,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub data: Vec<u8>,
}

impl IcmpMessage {
    /// Parse an ICMP message; everything after the 8-byte header is data
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < ICMP_HEADER_LEN {
            return Err(FormatError::too_short("ICMP", ICMP_HEADER_LEN, data.len()));
        }

        Ok(IcmpMessage {
            msg_type: IcmpType::from(data[0]),
            code: data[1],
            checksum: BigEndian::read_u16(&data[2..4]),
            identifier: BigEndian::read_u16(&data[4..6]),
            sequence: BigEndian::read_u16(&data[6..8]),
            data: data[ICMP_HEADER_LEN..].to_vec(),
        })
    }

    /// Serialize the message, computing the checksum over all of it
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ICMP_HEADER_LEN + self.data.len()];
        bytes[0] = self.msg_type.into();
        bytes[1] = self.code;
        BigEndian::write_u16(&mut bytes[4..6], self.identifier);
        BigEndian::write_u16(&mut bytes[6..8], self.sequence);
        bytes[ICMP_HEADER_LEN..].copy_from_slice(&self.data);

        let sum = checksum(&bytes);
        BigEndian::write_u16(&mut bytes[2..4], sum);
        bytes
    }

    /// Check if this is an Echo Request message
    pub fn is_echo_request(&self) -> bool {
        self.msg_type == IcmpType::EchoRequest
    }

    /// Build the Echo Reply answering this message
    ///
    /// Identifier, sequence and data are copied; the checksum is filled in by
    /// [`IcmpMessage::encode`].
    pub fn echo_reply(&self) -> IcmpMessage {
        IcmpMessage {
            msg_type: IcmpType::EchoReply,
            code: 0,
            checksum: 0,
            identifier: self.identifier,
            sequence: self.sequence,
            data: self.data.clone(),
        }
    }
}

impl fmt::Display for IcmpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.msg_type {
            IcmpType::EchoRequest => "Echo Request",
            IcmpType::EchoReply => "Echo Reply",
            IcmpType::Other(_) => "Unknown",
        };
        write!(
            f,
            "[ICMP] Type={} ({}) | ID={} Seq={}",
            u8::from(self.msg_type),
            kind,
            self.identifier,
            self.sequence
        )
    }
}
