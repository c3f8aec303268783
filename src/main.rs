//! tapstack: answer ARP, ping, UDP echo and TCP handshakes on a TAP device
//!
//! ```sh
//! sudo ip tuntap add dev tap0 mode tap user $USER
//! TAPSTACK_HOST_CIDR=192.168.1.1/24 RUST_LOG=debug cargo run
//! ```
//!
//! Configuration comes from `TAPSTACK_*` environment variables; see
//! `tapstack::config`.

use std::sync::mpsc;
use std::thread;

use anyhow::{Context, Result};
use tapstack::config::Config;
use tapstack::iface::{configure_interface, serve, NetworkInterface, ServeStats, TapDevice};
use tapstack::link::MacDisplay;
use tapstack::network::ipv4::DottedQuad;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().context("invalid configuration")?;

    log::info!("Initializing interface {}...", config.device);
    let mut device = TapDevice::open(&config.device)
        .with_context(|| format!("failed to open TAP device {}", config.device))?;
    log::info!("Interface {} ready", device.name());

    if let Some(cidr) = &config.host_cidr {
        configure_interface(device.name(), cidr)
            .with_context(|| format!("failed to configure {} on {}", cidr, device.name()))?;
    }

    let identity = config.identity;
    log::info!(
        "I am {} (MAC: {}), serving TCP port {}. Waiting for frames...",
        DottedQuad(&identity.ip),
        MacDisplay(&identity.mac),
        identity.served_port
    );

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<&'static str>();

    let signal_tx = shutdown_tx.clone();
    ctrlc::set_handler(move || {
        let _ = signal_tx.send("signal received");
    })
    .context("failed to install signal handler")?;

    let mtu = config.mtu;
    thread::Builder::new()
        .name("ingress".into())
        .spawn(move || {
            let iface = NetworkInterface::new(identity);
            let mut stats = ServeStats::default();
            if let Err(e) = serve(&mut device, &iface, mtu, &mut stats) {
                log::error!("Read error: {}", e);
            }
            log::info!(
                "Processed {} frames: {} replies, {} dropped, {} write errors",
                stats.received,
                stats.replied,
                stats.dropped,
                stats.write_errors
            );
            device.close();
            let _ = shutdown_tx.send("device loop ended");
        })
        .context("failed to spawn ingress thread")?;

    let reason = shutdown_rx.recv().unwrap_or("all senders gone");
    log::info!("Shutting down ({})", reason);
    Ok(())
}
