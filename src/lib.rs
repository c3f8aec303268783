//! A user-space Ethernet/IPv4 stack on a TAP device
//!
//! This library provides:
//! - Ethernet II and ARP codecs
//! - IPv4 and ICMP codecs with the Internet checksum
//! - UDP and TCP codecs with pseudo-header checksums
//! - A stateless reply engine answering ARP, ping, UDP echo and a minimal TCP handshake
//! - A TAP device wrapper and the loop that feeds frames to the engine

pub mod config;
pub mod error;
pub mod iface;
pub mod link;
pub mod network;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, LocalIdentity};
pub use error::{Error, FormatError, ValidationError};
pub use iface::{NetworkInterface, Reaction, ReplyKind};
pub use link::{ArpMessage, ArpOperation, EtherType, EthernetFrame};
pub use network::{checksum, IcmpMessage, IcmpType, IpProtocol, Ipv4Header};
pub use transport::{TcpFlags, TcpMessage, UdpMessage};
