//! Frame processing and reply construction
//!
//! This module turns one ingress Ethernet frame into at most one reply:
//! - ARP requests for the local address get an ARP reply
//! - ICMP Echo Requests get an Echo Reply
//! - UDP datagrams are echoed back with the ports swapped
//! - TCP segments are answered from a fixed decision table
//!
//! No state survives between frames. TCP is a per-segment reaction, not a
//! connection: the handshake numbers are constants.

use std::fmt;

use crate::config::LocalIdentity;
use crate::error::Error;
use crate::link::{ArpMessage, ArpOperation, EtherType, EthernetFrame};
use crate::network::ipv4::DottedQuad;
use crate::network::{IcmpMessage, IpProtocol, Ipv4Header};
use crate::transport::{TcpFlags, TcpMessage, UdpMessage};

/// Our initial sequence number in every SYN+ACK
pub const SYN_ACK_SEQ: u32 = 1000;
/// Our sequence number once the SYN is consumed; also what the peer ACKs
pub const FIN_ACK_SEQ: u32 = 1001;

const OPEN_WINDOW: u16 = 65535;

/// What processing a frame produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// One encoded Ethernet frame to write back, and the rule that built it
    Reply { frame: Vec<u8>, kind: ReplyKind },
    /// A peer acknowledged our SYN+ACK. Nothing is sent or remembered.
    Established { peer: [u8; 4], port: u16 },
    /// Nothing to do: not for us, or nothing we answer
    Ignored,
}

/// Which rule produced a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyKind {
    /// ARP reply to `requester`, who asked for our address
    ArpReply { requester: [u8; 4] },
    EchoReply { identifier: u16, sequence: u16 },
    /// Datagram from `src_port` to `dst_port` echoed back
    UdpEcho { src_port: u16, dst_port: u16, data: Vec<u8> },
    /// Segment to a port we do not serve
    Rst { port: u16 },
    SynAck { port: u16 },
    FinAck { port: u16 },
}

impl fmt::Display for ReplyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplyKind::ArpReply { requester } => {
                write!(f, "[ARP] {} asked who we are. Sending reply", DottedQuad(requester))
            }
            ReplyKind::EchoReply { identifier, sequence } => {
                write!(f, "[ICMP] Ping Request (ID={} Seq={}). Sending Pong", identifier, sequence)
            }
            ReplyKind::UdpEcho { src_port, dst_port, data } => {
                write!(f, "[UDP] {} -> {}: {:?}. Echoing", src_port, dst_port, String::from_utf8_lossy(data))
            }
            ReplyKind::Rst { port } => write!(f, "[TCP] Port {} closed. Sending RST", port),
            ReplyKind::SynAck { port } => {
                write!(f, "[TCP] Connection request (SYN) on port {}. Sending SYN-ACK", port)
            }
            ReplyKind::FinAck { port } => write!(f, "[TCP] Client sent FIN on port {}. Sending FIN-ACK", port),
        }
    }
}

/// Network interface answering as a fixed local identity
#[derive(Debug, Clone)]
pub struct NetworkInterface {
    identity: LocalIdentity,
}

impl NetworkInterface {
    pub fn new(identity: LocalIdentity) -> Self {
        NetworkInterface { identity }
    }

    pub fn identity(&self) -> &LocalIdentity {
        &self.identity
    }

    /// Process one raw ingress frame
    ///
    /// Malformed frames come back as [`Error::Format`]; the caller should drop
    /// them. Frames addressed elsewhere or of an unknown kind are
    /// [`Reaction::Ignored`].
    pub fn process_frame(&self, data: &[u8]) -> Result<Reaction, Error> {
        let frame = EthernetFrame::parse(data)?;

        match frame.ether_type {
            EtherType::Arp => self.process_arp(&frame),
            EtherType::Ipv4 => self.process_ipv4(&frame),
            _ => Ok(Reaction::Ignored),
        }
    }

    fn process_arp(&self, frame: &EthernetFrame) -> Result<Reaction, Error> {
        let request = ArpMessage::parse(&frame.payload)?;
        if request.operation != ArpOperation::Request || !self.is_for_us(&request.target_ip) {
            return Ok(Reaction::Ignored);
        }

        let payload = request.build_reply(&self.identity.mac, &self.identity.ip)?;
        let reply = EthernetFrame {
            dst_mac: request.sender_mac,
            src_mac: self.identity.mac,
            ether_type: EtherType::Arp,
            payload,
        };
        Ok(Reaction::Reply {
            frame: reply.encode(),
            kind: ReplyKind::ArpReply {
                requester: request.sender_ip,
            },
        })
    }

    fn process_ipv4(&self, frame: &EthernetFrame) -> Result<Reaction, Error> {
        let ip_header = Ipv4Header::parse(&frame.payload)?;
        if !self.is_for_us(&ip_header.dst_addr) {
            return Ok(Reaction::Ignored);
        }

        let payload = ip_header.payload(&frame.payload)?;

        // Dispatch based on protocol
        match ip_header.protocol {
            IpProtocol::Icmp => self.process_icmpv4(frame, &ip_header, payload),
            IpProtocol::Udp => self.process_udp(frame, &ip_header, payload),
            IpProtocol::Tcp => self.process_tcp(frame, &ip_header, payload),
            IpProtocol::Other(_) => Ok(Reaction::Ignored),
        }
    }

    fn process_icmpv4(&self, frame: &EthernetFrame, ip_header: &Ipv4Header, payload: &[u8]) -> Result<Reaction, Error> {
        let request = IcmpMessage::parse(payload)?;
        if !request.is_echo_request() {
            return Ok(Reaction::Ignored);
        }

        let reply = request.echo_reply().encode();
        let kind = ReplyKind::EchoReply {
            identifier: request.identifier,
            sequence: request.sequence,
        };
        Ok(self.reply_ipv4(frame, ip_header, IpProtocol::Icmp, reply, kind))
    }

    fn process_udp(&self, frame: &EthernetFrame, ip_header: &Ipv4Header, payload: &[u8]) -> Result<Reaction, Error> {
        let datagram = UdpMessage::parse(payload)?;
        let reply = datagram.echo().encode(self.identity.ip, ip_header.src_addr);
        let kind = ReplyKind::UdpEcho {
            src_port: datagram.src_port,
            dst_port: datagram.dst_port,
            data: datagram.data,
        };
        Ok(self.reply_ipv4(frame, ip_header, IpProtocol::Udp, reply, kind))
    }

    fn process_tcp(&self, frame: &EthernetFrame, ip_header: &Ipv4Header, payload: &[u8]) -> Result<Reaction, Error> {
        let segment = TcpMessage::parse(payload)?;

        let (reply, kind) = match tcp_response(&segment, self.identity.served_port) {
            TcpResponse::Send(reply, kind) => (reply, kind),
            TcpResponse::Established => {
                return Ok(Reaction::Established {
                    peer: ip_header.src_addr,
                    port: segment.src_port,
                })
            }
            TcpResponse::Nothing => return Ok(Reaction::Ignored),
        };

        let bytes = reply.encode(self.identity.ip, ip_header.src_addr);
        Ok(self.reply_ipv4(frame, ip_header, IpProtocol::Tcp, bytes, kind))
    }

    /// Wrap a transport payload in IPv4 and Ethernet headers back to the sender
    fn reply_ipv4(
        &self,
        frame: &EthernetFrame,
        ip_header: &Ipv4Header,
        protocol: IpProtocol,
        data: Vec<u8>,
        kind: ReplyKind,
    ) -> Reaction {
        let header = Ipv4Header::new(protocol, self.identity.ip, ip_header.src_addr, data.len());
        let mut payload = Vec::with_capacity(header.total_len as usize);
        payload.extend_from_slice(&header.encode());
        payload.extend_from_slice(&data);

        let reply = EthernetFrame {
            dst_mac: frame.src_mac,
            src_mac: self.identity.mac,
            ether_type: EtherType::Ipv4,
            payload,
        };
        Reaction::Reply {
            frame: reply.encode(),
            kind,
        }
    }

    /// Check if the address is ours. Broadcasts are not answered.
    fn is_for_us(&self, dst_addr: &[u8; 4]) -> bool {
        dst_addr == &self.identity.ip
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TcpResponse {
    Send(TcpMessage, ReplyKind),
    Established,
    Nothing,
}

/// The TCP decision table. Rules are checked strictly in order.
fn tcp_response(segment: &TcpMessage, served_port: u16) -> TcpResponse {
    let answer = |seq_number: u32, flags: TcpFlags, window_size: u16| TcpMessage {
        src_port: segment.dst_port,
        dst_port: segment.src_port,
        seq_number,
        ack_number: segment.seq_number.wrapping_add(1),
        data_offset: 5,
        flags,
        window_size,
        checksum: 0,
        urgent_ptr: 0,
        data: Vec::new(),
    };

    let port = segment.dst_port;
    if port != served_port {
        TcpResponse::Send(answer(0, TcpFlags::RST | TcpFlags::ACK, 0), ReplyKind::Rst { port })
    } else if segment.flags.contains(TcpFlags::SYN) {
        TcpResponse::Send(
            answer(SYN_ACK_SEQ, TcpFlags::SYN | TcpFlags::ACK, OPEN_WINDOW),
            ReplyKind::SynAck { port },
        )
    } else if segment.flags.contains(TcpFlags::FIN) {
        TcpResponse::Send(
            answer(FIN_ACK_SEQ, TcpFlags::FIN | TcpFlags::ACK, OPEN_WINDOW),
            ReplyKind::FinAck { port },
        )
    } else if segment.flags.contains(TcpFlags::ACK) && segment.ack_number == FIN_ACK_SEQ {
        TcpResponse::Established
    } else {
        TcpResponse::Nothing
    }
}
