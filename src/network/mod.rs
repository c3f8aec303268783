//! Network layer protocols
//!
//! - IPv4: Internet Protocol version 4 (header only, no options on egress)
//! - ICMP: Echo Request / Echo Reply
//!
//! The Internet checksum lives here because every layer above Ethernet uses it.

pub mod icmp;
pub mod ipv4;

pub use icmp::{IcmpMessage, IcmpType};
pub use ipv4::{IpProtocol, Ipv4Header};

/// Calculate the Internet checksum (RFC 1071)
///
/// Sums the data as big-endian 16-bit words, folds the carries back into the
/// low 16 bits and returns the one's complement. An odd trailing byte counts
/// as the high byte of a zero-padded word.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
        // Fold eagerly so very large buffers cannot overflow the accumulator
        if sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    if let [last] = words.remainder() {
        sum += (*last as u32) << 8;
    }

    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}
