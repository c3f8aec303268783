//! Runtime configuration
//!
//! Defaults match a TAP device named `tap0` answering as 192.168.1.10 with a
//! locally administered MAC. Every value can be overridden from the
//! environment (`TAPSTACK_*`).

use std::net::Ipv4Addr;

use thiserror::Error;

pub const ENV_DEVICE: &str = "TAPSTACK_DEV";
pub const ENV_MAC: &str = "TAPSTACK_MAC";
pub const ENV_IP: &str = "TAPSTACK_IP";
pub const ENV_PORT: &str = "TAPSTACK_PORT";
pub const ENV_MTU: &str = "TAPSTACK_MTU";
pub const ENV_HOST_CIDR: &str = "TAPSTACK_HOST_CIDR";

const DEFAULT_DEVICE: &str = "tap0";
const DEFAULT_MAC: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
const DEFAULT_IP: [u8; 4] = [192, 168, 1, 10];
const DEFAULT_SERVED_PORT: u16 = 80;
const DEFAULT_MTU: usize = 1500;

/// Smallest buffer able to hold an Ethernet header plus an IPv4 header
const MIN_MTU: usize = 34;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}: invalid MAC address {value:?} (want six hex octets like 02:00:00:00:00:01)")]
    InvalidMac { var: &'static str, value: String },

    #[error("{var}: invalid IPv4 address {value:?}")]
    InvalidIp { var: &'static str, value: String },

    #[error("{var}: invalid number {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var}: {value} is below the minimum of {min}")]
    TooSmall { var: &'static str, value: usize, min: usize },
}

/// Who the stack answers as
///
/// Passed by value into the reply engine; nothing else holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalIdentity {
    pub mac: [u8; 6],
    pub ip: [u8; 4],
    /// The single TCP port that is "open"; everything else gets RST
    pub served_port: u16,
}

impl Default for LocalIdentity {
    fn default() -> Self {
        LocalIdentity {
            mac: DEFAULT_MAC,
            ip: DEFAULT_IP,
            served_port: DEFAULT_SERVED_PORT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// TAP device name
    pub device: String,
    pub identity: LocalIdentity,
    /// Read buffer size for one frame
    pub mtu: usize,
    /// Address to assign to the host side of the TAP device, e.g. `192.168.1.1/24`
    pub host_cidr: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device: DEFAULT_DEVICE.to_string(),
            identity: LocalIdentity::default(),
            mtu: DEFAULT_MTU,
            host_cidr: None,
        }
    }
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load using `lookup` to fetch each variable
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(device) = lookup(ENV_DEVICE) {
            config.device = device;
        }
        if let Some(value) = lookup(ENV_MAC) {
            config.identity.mac =
                parse_mac(&value).ok_or(ConfigError::InvalidMac { var: ENV_MAC, value })?;
        }
        if let Some(value) = lookup(ENV_IP) {
            let ip: Ipv4Addr = value
                .parse()
                .map_err(|_| ConfigError::InvalidIp { var: ENV_IP, value: value.clone() })?;
            config.identity.ip = ip.octets();
        }
        if let Some(value) = lookup(ENV_PORT) {
            config.identity.served_port = value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var: ENV_PORT, value: value.clone() })?;
        }
        if let Some(value) = lookup(ENV_MTU) {
            let mtu: usize = value
                .parse()
                .map_err(|_| ConfigError::InvalidNumber { var: ENV_MTU, value: value.clone() })?;
            if mtu < MIN_MTU {
                return Err(ConfigError::TooSmall {
                    var: ENV_MTU,
                    value: mtu,
                    min: MIN_MTU,
                });
            }
            config.mtu = mtu;
        }
        config.host_cidr = lookup(ENV_HOST_CIDR).filter(|cidr| !cidr.is_empty());

        Ok(config)
    }
}

/// Parse `aa:bb:cc:dd:ee:ff` (or `-` separated)
pub fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = text.split(|c| c == ':' || c == '-');
    for octet in mac.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        *octet = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(mac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.device, "tap0");
        assert_eq!(config.identity.ip, [192, 168, 1, 10]);
        assert_eq!(config.identity.served_port, 80);
        assert_eq!(config.mtu, 1500);
        assert_eq!(config.host_cidr, None);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            (ENV_DEVICE, "tap7"),
            (ENV_MAC, "02:AB:cd:00:00:09"),
            (ENV_IP, "10.0.0.1"),
            (ENV_PORT, "8080"),
            (ENV_MTU, "9000"),
            (ENV_HOST_CIDR, "10.0.0.254/24"),
        ])
        .unwrap();
        assert_eq!(config.device, "tap7");
        assert_eq!(config.identity.mac, [0x02, 0xab, 0xcd, 0, 0, 0x09]);
        assert_eq!(config.identity.ip, [10, 0, 0, 1]);
        assert_eq!(config.identity.served_port, 8080);
        assert_eq!(config.mtu, 9000);
        assert_eq!(config.host_cidr.as_deref(), Some("10.0.0.254/24"));
    }

    #[test]
    fn test_rejects_malformed_values() {
        assert!(matches!(load(&[(ENV_MAC, "02:00:00:00:00")]), Err(ConfigError::InvalidMac { .. })));
        assert!(matches!(load(&[(ENV_IP, "10.0.0.256")]), Err(ConfigError::InvalidIp { .. })));
        assert!(matches!(load(&[(ENV_PORT, "70000")]), Err(ConfigError::InvalidNumber { .. })));
        assert_eq!(
            load(&[(ENV_MTU, "20")]),
            Err(ConfigError::TooSmall { var: ENV_MTU, value: 20, min: MIN_MTU })
        );
    }

    #[test]
    fn test_parse_mac() {
        assert_eq!(parse_mac("aa-bb-cc-dd-ee-ff"), Some([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]));
        assert_eq!(parse_mac("aa:bb:cc:dd:ee:ff:00"), None);
        assert_eq!(parse_mac("aa:bb:cc:dd:ee:f"), None);
        assert_eq!(parse_mac("zz:bb:cc:dd:ee:ff"), None);
    }
}
