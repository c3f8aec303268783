//! Layer-2 device access
//!
//! The reply engine never touches a device; the ingestion loop talks to one
//! through the [`Device`] trait so it can run against a TAP interface or an
//! in-memory script.

use std::io;
use std::process::Command;

use tun_tap::{Iface, Mode};

/// A source and sink of raw Ethernet frames
pub trait Device {
    /// Read one frame into `buf`, returning its length
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write one complete frame
    fn write(&mut self, frame: &[u8]) -> io::Result<usize>;
}

/// A Linux TAP interface opened without packet info headers
pub struct TapDevice {
    iface: Iface,
}

impl TapDevice {
    /// Open (or create) the TAP interface `name`
    ///
    /// Needs CAP_NET_ADMIN.
    pub fn open(name: &str) -> io::Result<Self> {
        let iface = Iface::without_packet_info(name, Mode::Tap)?;
        Ok(TapDevice { iface })
    }

    /// The name the kernel actually assigned
    pub fn name(&self) -> &str {
        self.iface.name()
    }

    /// Release the interface. Dropping has the same effect.
    pub fn close(self) {}
}

impl Device for TapDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.iface.recv(buf)
    }

    fn write(&mut self, frame: &[u8]) -> io::Result<usize> {
        self.iface.send(frame)
    }
}

/// Assign `ip_cidr` to the host side of `iface_name` and bring it up
///
/// Shells out to `ip addr add` and `ip link set up`.
pub fn configure_interface(iface_name: &str, ip_cidr: &str) -> io::Result<()> {
    run_ip(&["addr", "add", ip_cidr, "dev", iface_name])?;
    run_ip(&["link", "set", "up", "dev", iface_name])?;
    log::info!("Interface {} configured with {} and brought up", iface_name, ip_cidr);
    Ok(())
}

fn run_ip(args: &[&str]) -> io::Result<()> {
    let status = Command::new("ip").args(args).status()?;
    if !status.success() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("`ip {}` failed with {}", args.join(" "), status),
        ));
    }
    Ok(())
}
