//! The ingestion loop: read a frame, react, write the reply

use std::io;

use crate::error::{Error, FormatError};
use crate::iface::device::Device;
use crate::iface::interface::{NetworkInterface, Reaction, ReplyKind};
use crate::link::{ArpMessage, EtherType, EthernetFrame};
use crate::network::ipv4::DottedQuad;
use crate::network::{IcmpMessage, IpProtocol, Ipv4Header};
use crate::transport::{TcpMessage, UdpMessage};

/// Frame counters updated by [`serve`]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ServeStats {
    pub received: u64,
    pub replied: u64,
    pub dropped: u64,
    pub write_errors: u64,
}

/// Process frames from `device` until a read fails
///
/// Each read buffer holds `mtu` bytes plus the Ethernet header. Malformed
/// frames are dropped and failed writes are logged and counted; only a read
/// error ends the loop.
pub fn serve<D: Device>(device: &mut D, iface: &NetworkInterface, mtu: usize, stats: &mut ServeStats) -> io::Result<()> {
    let mut buf = vec![0u8; mtu + crate::link::ethernet::ETHERNET_HEADER_LEN];

    loop {
        let nbytes = device.read(&mut buf)?;
        handle_frame(device, iface, &buf[..nbytes], stats);
    }
}

/// React to one frame, writing any reply. Returns the reply sent, if any.
fn handle_frame<D: Device>(
    device: &mut D,
    iface: &NetworkInterface,
    frame: &[u8],
    stats: &mut ServeStats,
) -> Option<ReplyKind> {
    stats.received += 1;
    log::trace!("[Frame #{}] received {} bytes", stats.received, frame.len());

    if log::log_enabled!(log::Level::Debug) {
        describe(frame);
    }

    match iface.process_frame(frame) {
        Ok(Reaction::Reply { frame: reply, kind }) => {
            log::info!("{}", kind);
            match device.write(&reply) {
                Ok(_) => {
                    stats.replied += 1;
                    Some(kind)
                }
                Err(e) => {
                    stats.write_errors += 1;
                    log::warn!("Write error: {}", e);
                    None
                }
            }
        }
        Ok(Reaction::Established { peer, port }) => {
            log::info!("[TCP] Connection ESTABLISHED with {}:{}", DottedQuad(&peer), port);
            None
        }
        Ok(Reaction::Ignored) => None,
        Err(e) => {
            record_failure(&e, stats);
            None
        }
    }
}

fn record_failure(err: &Error, stats: &mut ServeStats) {
    stats.dropped += 1;
    match err {
        Error::Format(FormatError::TooShort { what: "TCP", .. } | FormatError::HeaderOverrun { what: "TCP", .. }) => {
            log::warn!("TCP Error: {}", err)
        }
        Error::Format(e) => log::debug!("Dropping frame: {}", e),
        // The engine's identity is fixed-size, so this only fires if a
        // caller-built identity ever stops being so.
        Error::Validation(e) => log::error!("Cannot build reply: {}", e),
    }
}

/// Log what a frame contains, layer by layer, as far as it parses
fn describe(data: &[u8]) {
    let Ok(frame) = EthernetFrame::parse(data) else {
        return;
    };
    log::debug!("{}", frame);

    match frame.ether_type {
        EtherType::Arp => {
            if let Ok(arp) = ArpMessage::parse(&frame.payload) {
                log::debug!("{}", arp);
            }
        }
        EtherType::Ipv4 => {
            let Ok(header) = Ipv4Header::parse(&frame.payload) else {
                return;
            };
            log::debug!("{}", header);
            let Ok(payload) = header.payload(&frame.payload) else {
                return;
            };
            match header.protocol {
                IpProtocol::Icmp => {
                    if let Ok(icmp) = IcmpMessage::parse(payload) {
                        log::debug!("{}", icmp);
                    }
                }
                IpProtocol::Udp => {
                    if let Ok(udp) = UdpMessage::parse(payload) {
                        log::debug!("{} | {:?}", udp, String::from_utf8_lossy(&udp.data));
                    }
                }
                IpProtocol::Tcp => {
                    if let Ok(tcp) = TcpMessage::parse(payload) {
                        log::debug!("{}", tcp);
                    }
                }
                IpProtocol::Other(_) => {}
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LocalIdentity;
    use crate::error::ValidationError;
    use crate::link::ArpOperation;
    use crate::network::IcmpType;
    use crate::transport::TcpFlags;
    use std::collections::VecDeque;

    const PEER_MAC: [u8; 6] = [0xAA; 6];
    const PEER_IP: [u8; 4] = [10, 0, 0, 5];
    const LOCAL_IP: [u8; 4] = [10, 0, 0, 1];

    /// Plays back scripted frames, then reports end of input
    struct ScriptedDevice {
        incoming: VecDeque<Vec<u8>>,
        written: Vec<Vec<u8>>,
        /// Number of upcoming writes to fail
        failing_writes: usize,
    }

    impl ScriptedDevice {
        fn new(frames: Vec<Vec<u8>>) -> Self {
            ScriptedDevice {
                incoming: VecDeque::from(frames),
                written: Vec::new(),
                failing_writes: 0,
            }
        }
    }

    impl Device for ScriptedDevice {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.incoming.pop_front() {
                Some(frame) => {
                    buf[..frame.len()].copy_from_slice(&frame);
                    Ok(frame.len())
                }
                None => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "script finished")),
            }
        }

        fn write(&mut self, frame: &[u8]) -> io::Result<usize> {
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "device busy"));
            }
            self.written.push(frame.to_vec());
            Ok(frame.len())
        }
    }

    fn iface() -> NetworkInterface {
        NetworkInterface::new(LocalIdentity {
            mac: [0xBB; 6],
            ip: LOCAL_IP,
            served_port: 80,
        })
    }

    fn arp_request(target_ip: [u8; 4]) -> Vec<u8> {
        let request = ArpMessage {
            hardware_type: 1,
            protocol_type: 0x0800,
            hardware_len: 6,
            protocol_len: 4,
            operation: ArpOperation::Request,
            sender_mac: PEER_MAC,
            sender_ip: PEER_IP,
            target_mac: [0; 6],
            target_ip,
        };
        EthernetFrame {
            dst_mac: [0xFF; 6],
            src_mac: PEER_MAC,
            ether_type: EtherType::Arp,
            payload: request.encode(),
        }
        .encode()
    }

    fn ipv4_frame(protocol: IpProtocol, data: &[u8]) -> Vec<u8> {
        let mut payload = Ipv4Header::new(protocol, PEER_IP, LOCAL_IP, data.len()).encode().to_vec();
        payload.extend_from_slice(data);
        EthernetFrame {
            dst_mac: [0xBB; 6],
            src_mac: PEER_MAC,
            ether_type: EtherType::Ipv4,
            payload,
        }
        .encode()
    }

    fn tcp_frame(dst_port: u16, flags: TcpFlags) -> Vec<u8> {
        let segment = TcpMessage {
            src_port: 40000,
            dst_port,
            seq_number: 500,
            ack_number: 0,
            data_offset: 5,
            flags,
            window_size: 64240,
            checksum: 0,
            urgent_ptr: 0,
            data: Vec::new(),
        };
        ipv4_frame(IpProtocol::Tcp, &segment.encode(PEER_IP, LOCAL_IP))
    }

    #[test]
    fn test_serve_replies_and_drops() {
        let iface = iface();
        let mut device = ScriptedDevice::new(vec![
            arp_request(LOCAL_IP),
            vec![0u8; 6],               // runt
            arp_request([10, 0, 0, 9]), // someone else
        ]);

        let mut stats = ServeStats::default();
        let err = serve(&mut device, &iface, 1500, &mut stats).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        assert_eq!(
            stats,
            ServeStats {
                received: 3,
                replied: 1,
                dropped: 1,
                write_errors: 0,
            }
        );
        assert_eq!(device.written.len(), 1);

        let reply = EthernetFrame::parse(&device.written[0]).unwrap();
        assert_eq!(reply.dst_mac, PEER_MAC);
        assert_eq!(ArpMessage::parse(&reply.payload).unwrap().sender_ip, LOCAL_IP);
    }

    #[test]
    fn test_failed_write_does_not_stop_serving() {
        let iface = iface();
        let mut device = ScriptedDevice::new(vec![
            arp_request(LOCAL_IP),
            arp_request(LOCAL_IP),
            arp_request(LOCAL_IP),
        ]);
        device.failing_writes = 1;

        let mut stats = ServeStats::default();
        let err = serve(&mut device, &iface, 1500, &mut stats).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        assert!(device.incoming.is_empty());
        assert_eq!(device.written.len(), 2);
        assert_eq!(
            stats,
            ServeStats {
                received: 3,
                replied: 2,
                dropped: 0,
                write_errors: 1,
            }
        );
    }

    #[test]
    fn test_reply_kind_for_each_rule() {
        let iface = iface();
        let mut device = ScriptedDevice::new(Vec::new());
        let mut stats = ServeStats::default();
        let mut run = |frame: Vec<u8>| handle_frame(&mut device, &iface, &frame, &mut stats);

        assert_eq!(run(arp_request(LOCAL_IP)), Some(ReplyKind::ArpReply { requester: PEER_IP }));

        let ping = IcmpMessage {
            msg_type: IcmpType::EchoRequest,
            code: 0,
            checksum: 0,
            identifier: 7,
            sequence: 3,
            data: b"ping".to_vec(),
        };
        assert_eq!(
            run(ipv4_frame(IpProtocol::Icmp, &ping.encode())),
            Some(ReplyKind::EchoReply {
                identifier: 7,
                sequence: 3
            })
        );

        let datagram = UdpMessage {
            src_port: 5353,
            dst_port: 7,
            length: 10,
            checksum: 0,
            data: b"hi".to_vec(),
        };
        assert_eq!(
            run(ipv4_frame(IpProtocol::Udp, &datagram.encode(PEER_IP, LOCAL_IP))),
            Some(ReplyKind::UdpEcho {
                src_port: 5353,
                dst_port: 7,
                data: b"hi".to_vec()
            })
        );

        assert_eq!(run(tcp_frame(22, TcpFlags::SYN)), Some(ReplyKind::Rst { port: 22 }));
        assert_eq!(run(tcp_frame(80, TcpFlags::SYN)), Some(ReplyKind::SynAck { port: 80 }));
        assert_eq!(
            run(tcp_frame(80, TcpFlags::FIN | TcpFlags::ACK)),
            Some(ReplyKind::FinAck { port: 80 })
        );
        assert_eq!(run(tcp_frame(80, TcpFlags::PSH)), None);

        drop(run);
        assert_eq!(device.written.len(), 6);
        assert_eq!(stats.replied, 6);
    }

    #[test]
    fn test_reply_kind_messages() {
        assert_eq!(ReplyKind::Rst { port: 22 }.to_string(), "[TCP] Port 22 closed. Sending RST");
        assert_eq!(
            ReplyKind::EchoReply {
                identifier: 7,
                sequence: 3
            }
            .to_string(),
            "[ICMP] Ping Request (ID=7 Seq=3). Sending Pong"
        );
    }

    #[test]
    fn test_failures_are_counted_as_drops() {
        let mut stats = ServeStats::default();
        record_failure(&FormatError::too_short("TCP", 20, 12).into(), &mut stats);
        record_failure(&ValidationError::InvalidAddressLength { mac: 5, ip: 4 }.into(), &mut stats);
        assert_eq!(stats.dropped, 2);
        assert_eq!(stats.replied, 0);
    }
}
