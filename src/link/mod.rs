//! Link layer protocols
//!
//! - Ethernet II framing
//! - ARP for Ethernet/IPv4

use std::fmt;

pub mod arp;
pub mod ethernet;

pub use arp::{ArpMessage, ArpOperation};
pub use ethernet::{EtherType, EthernetFrame};

/// Formats a 6-byte hardware address as `aa:bb:cc:dd:ee:ff`
pub struct MacDisplay<'a>(pub &'a [u8; 6]);

impl fmt::Display for MacDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = *self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}
