//! ARP (Address Resolution Protocol) for Ethernet/IPv4
//!
//! Wire layout, 28 bytes:
//! `hwtype(2) | ptype(2) | hlen(1) | plen(1) | op(2) | sha(6) | spa(4) | tha(6) | tpa(4)`

use std::fmt;

use crate::error::{FormatError, ValidationError};
use crate::link::MacDisplay;
use crate::network::ipv4::DottedQuad;
use byteorder::{BigEndian, ByteOrder};

/// Size of an Ethernet/IPv4 ARP message
pub const ARP_LEN: usize = 28;

const HARDWARE_ETHERNET: u16 = 1;
const PROTOCOL_IPV4: u16 = 0x0800;
const MAC_LEN: u8 = 6;
const IPV4_LEN: u8 = 4;

/// ARP operation code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArpOperation {
    Request,
    Reply,
    Other(u16),
}

impl From<u16> for ArpOperation {
    fn from(value: u16) -> Self {
        match value {
            1 => ArpOperation::Request,
            2 => ArpOperation::Reply,
            other => ArpOperation::Other(other),
        }
    }
}

impl From<ArpOperation> for u16 {
    fn from(value: ArpOperation) -> Self {
        match value {
            ArpOperation::Request => 1,
            ArpOperation::Reply => 2,
            ArpOperation::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArpMessage {
    pub hardware_type: u16,
    pub protocol_type: u16,
    pub hardware_len: u8,
    pub protocol_len: u8,
    pub operation: ArpOperation,
    pub sender_mac: [u8; 6],
    pub sender_ip: [u8; 4],
    pub target_mac: [u8; 6],
    pub target_ip: [u8; 4],
}

impl ArpMessage {
    /// Parse an ARP message; the address fields are read at their
    /// Ethernet/IPv4 offsets regardless of the declared lengths
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < ARP_LEN {
            return Err(FormatError::too_short("ARP", ARP_LEN, data.len()));
        }

        let mut msg = ArpMessage {
            hardware_type: BigEndian::read_u16(&data[0..2]),
            protocol_type: BigEndian::read_u16(&data[2..4]),
            hardware_len: data[4],
            protocol_len: data[5],
            operation: ArpOperation::from(BigEndian::read_u16(&data[6..8])),
            sender_mac: [0; 6],
            sender_ip: [0; 4],
            target_mac: [0; 6],
            target_ip: [0; 4],
        };
        msg.sender_mac.copy_from_slice(&data[8..14]);
        msg.sender_ip.copy_from_slice(&data[14..18]);
        msg.target_mac.copy_from_slice(&data[18..24]);
        msg.target_ip.copy_from_slice(&data[24..28]);

        Ok(msg)
    }

    /// Serialize to the 28-byte wire form
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ARP_LEN];
        BigEndian::write_u16(&mut bytes[0..2], self.hardware_type);
        BigEndian::write_u16(&mut bytes[2..4], self.protocol_type);
        bytes[4] = self.hardware_len;
        bytes[5] = self.protocol_len;
        BigEndian::write_u16(&mut bytes[6..8], self.operation.into());
        bytes[8..14].copy_from_slice(&self.sender_mac);
        bytes[14..18].copy_from_slice(&self.sender_ip);
        bytes[18..24].copy_from_slice(&self.target_mac);
        bytes[24..28].copy_from_slice(&self.target_ip);
        bytes
    }

    /// Build the ARP reply answering this request as `local_mac`/`local_ip`
    ///
    /// The reply is addressed to whoever sent the request. Fails if the local
    /// MAC is not 6 bytes or the local IP is not 4 bytes.
    pub fn build_reply(&self, local_mac: &[u8], local_ip: &[u8]) -> Result<Vec<u8>, ValidationError> {
        let (sender_mac, sender_ip) = match (<[u8; 6]>::try_from(local_mac), <[u8; 4]>::try_from(local_ip)) {
            (Ok(mac), Ok(ip)) => (mac, ip),
            _ => {
                return Err(ValidationError::InvalidAddressLength {
                    mac: local_mac.len(),
                    ip: local_ip.len(),
                })
            }
        };

        let reply = ArpMessage {
            hardware_type: HARDWARE_ETHERNET,
            protocol_type: PROTOCOL_IPV4,
            hardware_len: MAC_LEN,
            protocol_len: IPV4_LEN,
            operation: ArpOperation::Reply,
            sender_mac,
            sender_ip,
            target_mac: self.sender_mac,
            target_ip: self.sender_ip,
        };
        Ok(reply.encode())
    }
}

impl fmt::Display for ArpMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operation {
            ArpOperation::Request => "Request",
            ArpOperation::Reply => "Reply",
            ArpOperation::Other(_) => "Unknown",
        };
        write!(
            f,
            "[ARP] Op={} | Who has {}? Tell {} ({})",
            op,
            DottedQuad(&self.target_ip),
            DottedQuad(&self.sender_ip),
            MacDisplay(&self.sender_mac)
        )
    }
}
