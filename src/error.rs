//! Error types shared by the codecs and the reply engine

use thiserror::Error;

/// A wire-format problem with an ingress buffer.
///
/// Always recoverable: the frame is dropped and nothing is sent back.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("packet too short for {what}: {actual} bytes (min {expected})")]
    TooShort {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{what} header declares {declared} bytes but only {actual} are present")]
    HeaderOverrun {
        what: &'static str,
        declared: usize,
        actual: usize,
    },
}

impl FormatError {
    pub(crate) fn too_short(what: &'static str, expected: usize, actual: usize) -> Self {
        FormatError::TooShort {
            what,
            expected,
            actual,
        }
    }
}

/// A malformed value supplied by the caller rather than by the wire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid address length: MAC is {mac} bytes (want 6), IP is {ip} bytes (want 4)")]
    InvalidAddressLength { mac: usize, ip: usize },
}

/// Any failure surfaced by [`crate::NetworkInterface::process_frame`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = FormatError::too_short("ARP", 28, 27);
        assert_eq!(err.to_string(), "packet too short for ARP: 27 bytes (min 28)");

        let err: Error = ValidationError::InvalidAddressLength { mac: 5, ip: 4 }.into();
        assert!(err.to_string().starts_with("invalid address length"));
    }
}
