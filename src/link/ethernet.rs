//! Ethernet II frame parsing and serialization

use std::fmt;

use crate::error::FormatError;
use crate::link::MacDisplay;
use byteorder::{BigEndian, ByteOrder};

/// Ethernet II header length in bytes
pub const ETHERNET_HEADER_LEN: usize = 14;

/// Layer-3 protocol identifier carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EtherType {
    Ipv4,
    Arp,
    Ipv6,
    Other(u16),
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            0x0800 => EtherType::Ipv4,
            0x0806 => EtherType::Arp,
            0x86DD => EtherType::Ipv6,
            other => EtherType::Other(other),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(value: EtherType) -> Self {
        match value {
            EtherType::Ipv4 => 0x0800,
            EtherType::Arp => 0x0806,
            EtherType::Ipv6 => 0x86DD,
            EtherType::Other(other) => other,
        }
    }
}

/// An Ethernet II frame: header plus owned payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub dst_mac: [u8; 6],
    pub src_mac: [u8; 6],
    pub ether_type: EtherType,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    /// Parse a raw frame as read from the TAP device
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < ETHERNET_HEADER_LEN {
            return Err(FormatError::too_short("Ethernet", ETHERNET_HEADER_LEN, data.len()));
        }

        let mut dst_mac = [0u8; 6];
        let mut src_mac = [0u8; 6];
        dst_mac.copy_from_slice(&data[0..6]);
        src_mac.copy_from_slice(&data[6..12]);

        Ok(EthernetFrame {
            dst_mac,
            src_mac,
            ether_type: EtherType::from(BigEndian::read_u16(&data[12..14])),
            payload: data[ETHERNET_HEADER_LEN..].to_vec(),
        })
    }

    /// Serialize header and payload in wire order
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; ETHERNET_HEADER_LEN + self.payload.len()];
        bytes[0..6].copy_from_slice(&self.dst_mac);
        bytes[6..12].copy_from_slice(&self.src_mac);
        BigEndian::write_u16(&mut bytes[12..14], self.ether_type.into());
        bytes[ETHERNET_HEADER_LEN..].copy_from_slice(&self.payload);
        bytes
    }
}

impl fmt::Display for EthernetFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.ether_type {
            EtherType::Ipv4 => "IPv4",
            EtherType::Arp => "ARP",
            EtherType::Ipv6 => "IPv6",
            EtherType::Other(_) => "Unknown",
        };
        write!(
            f,
            "[Eth] {} -> {} | Type: 0x{:04x} ({}) | Payload: {} bytes",
            MacDisplay(&self.src_mac),
            MacDisplay(&self.dst_mac),
            u16::from(self.ether_type),
            kind,
            self.payload.len()
        )
    }
}
