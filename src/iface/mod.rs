//! Interface layer
//!
//! - Reply engine: one ingress frame in, at most one reply out
//! - Device abstraction over a TAP interface
//! - The blocking ingestion loop tying the two together

pub mod device;
pub mod interface;
pub mod runner;

pub use device::{configure_interface, Device, TapDevice};
pub use interface::{NetworkInterface, Reaction, ReplyKind};
pub use runner::{serve, ServeStats};
