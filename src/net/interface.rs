use crate::net::arp::{ArpMessage, ArpOpcode};
use crate::net::ethernet::{ethernet_broadcast, EtherType, EthernetAddress, EthernetFrame};
use crate::net::ipv4::InternetDatagram;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;

/// How long a learned IP-to-Ethernet mapping stays usable
pub const ARP_ENTRY_TTL_MS: u64 = 30_000;

/// Minimum spacing between ARP requests for the same IP address
pub const ARP_REQUEST_PERIOD_MS: u64 = 5_000;

/// Where a `NetworkInterface` puts the frames it sends.
pub trait OutputPort {
    fn transmit(&mut self, frame: &EthernetFrame);
}

impl<F: FnMut(&EthernetFrame)> OutputPort for F {
    fn transmit(&mut self, frame: &EthernetFrame) {
        self(frame)
    }
}

/// Captures every frame, oldest first.
impl OutputPort for VecDeque<EthernetFrame> {
    fn transmit(&mut self, frame: &EthernetFrame) {
        self.push_back(frame.clone());
    }
}

#[derive(Debug, Clone, Copy)]
struct ArpEntry {
    ethernet_address: EthernetAddress,
    age_ms: u64,
}

/// Connects the IP layer to an Ethernet link.
///
/// Outbound datagrams are addressed to a next-hop IP. If its Ethernet address is
/// unknown the datagram waits while an ARP request goes out; the reply releases it.
/// Inbound frames are filtered by destination and either answered (ARP) or queued
/// for the caller (IPv4). Time only advances through `tick`.
pub struct NetworkInterface<P: OutputPort> {
    name: String,
    port: P,
    ethernet_address: EthernetAddress,
    ip_address: Ipv4Addr,
    arp_cache: HashMap<Ipv4Addr, ArpEntry>,
    // IP -> ms since its ARP request was sent
    pending_requests: HashMap<Ipv4Addr, u64>,
    waiting: VecDeque<(InternetDatagram, Ipv4Addr)>,
    datagrams_received: VecDeque<InternetDatagram>,
}

impl<P: OutputPort> NetworkInterface<P> {
    pub fn new(name: impl Into<String>, port: P, ethernet_address: EthernetAddress, ip_address: Ipv4Addr) -> Self {
        let name = name.into();
        log::info!(
            "{}: network interface has Ethernet address {} and IP address {}",
            name,
            ethernet_address,
            ip_address
        );

        NetworkInterface {
            name,
            port,
            ethernet_address,
            ip_address,
            arp_cache: HashMap::new(),
            pending_requests: HashMap::new(),
            waiting: VecDeque::new(),
            datagrams_received: VecDeque::new(),
        }
    }

    /// Send `dgram` toward `next_hop`, which is usually a router or default gateway
    /// but may also be the datagram's own destination.
    pub fn send_datagram(&mut self, dgram: &InternetDatagram, next_hop: Ipv4Addr) {
        if let Some(entry) = self.arp_cache.get(&next_hop) {
            let dst = entry.ethernet_address;
            self.transmit_datagram(dgram, dst);
            return;
        }

        self.waiting.push_back((dgram.clone(), next_hop));
        if self.pending_requests.contains_key(&next_hop) {
            log::debug!("{}: ARP request for {} already in flight", self.name, next_hop);
            return;
        }

        log::debug!("{}: who has {}? tell {}", self.name, next_hop, self.ip_address);
        let request = ArpMessage::request(self.ethernet_address, self.ip_address, next_hop);
        self.transmit(ethernet_broadcast(), EtherType::Arp, request.serialize());
        self.pending_requests.insert(next_hop, 0);
    }

    pub fn recv_frame(&mut self, frame: &EthernetFrame) {
        let dst = frame.header.dst;
        if dst != self.ethernet_address && dst != ethernet_broadcast() {
            log::debug!("{}: ignoring frame for {}", self.name, dst);
            return;
        }

        match frame.header.ether_type {
            EtherType::Ipv4 => match InternetDatagram::parse(&frame.payload) {
                Ok(dgram) => self.datagrams_received.push_back(dgram),
                Err(e) => log::debug!("{}: dropping IPv4 frame: {}", self.name, e),
            },
            EtherType::Arp => match ArpMessage::parse(&frame.payload) {
                Ok(msg) => self.recv_arp(&msg),
                Err(e) => log::debug!("{}: dropping ARP frame: {}", self.name, e),
            },
            EtherType::Unknown(ether_type) => {
                log::debug!("{}: dropping frame with EtherType {:#06x}", self.name, ether_type)
            }
        }
    }

    /// Advance ARP ages by `ms_since_last_tick`, forgetting expired mappings and requests.
    pub fn tick(&mut self, ms_since_last_tick: u64) {
        self.pending_requests.retain(|_, age_ms| {
            *age_ms = age_ms.saturating_add(ms_since_last_tick);
            *age_ms < ARP_REQUEST_PERIOD_MS
        });
        self.arp_cache.retain(|_, entry| {
            entry.age_ms = entry.age_ms.saturating_add(ms_since_last_tick);
            entry.age_ms < ARP_ENTRY_TTL_MS
        });
    }

    pub fn datagrams_received(&mut self) -> &mut VecDeque<InternetDatagram> {
        &mut self.datagrams_received
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ethernet_address(&self) -> EthernetAddress {
        self.ethernet_address
    }

    pub fn ip_address(&self) -> Ipv4Addr {
        self.ip_address
    }

    pub fn output(&self) -> &P {
        &self.port
    }

    pub fn output_mut(&mut self) -> &mut P {
        &mut self.port
    }

    fn recv_arp(&mut self, msg: &ArpMessage) {
        let sender_ip = msg.sender_ip_address;
        self.arp_cache.insert(
            sender_ip,
            ArpEntry {
                ethernet_address: msg.sender_ethernet_address,
                age_ms: 0,
            },
        );
        self.pending_requests.remove(&sender_ip);

        match msg.opcode {
            ArpOpcode::Request if msg.target_ip_address == self.ip_address => {
                log::debug!("{}: {} is at {}, telling {}", self.name, self.ip_address, self.ethernet_address, sender_ip);
                let reply = ArpMessage::reply_to(msg, self.ethernet_address, self.ip_address);
                self.transmit(msg.sender_ethernet_address, EtherType::Arp, reply.serialize());
            }
            ArpOpcode::Reply if msg.target_ethernet_address == self.ethernet_address => {
                log::debug!("{}: {} is at {}", self.name, sender_ip, msg.sender_ethernet_address);
                let (ready, still_waiting): (VecDeque<_>, VecDeque<_>) = std::mem::take(&mut self.waiting)
                    .into_iter()
                    .partition(|(_, next_hop)| *next_hop == sender_ip);
                self.waiting = still_waiting;
                for (dgram, _) in ready {
                    self.transmit_datagram(&dgram, msg.sender_ethernet_address);
                }
            }
            _ => {}
        }
    }

    fn transmit_datagram(&mut self, dgram: &InternetDatagram, dst: EthernetAddress) {
        match dgram.serialize() {
            Ok(bytes) => self.transmit(dst, EtherType::Ipv4, bytes),
            Err(e) => log::debug!("{}: dropping outbound datagram: {}", self.name, e),
        }
    }

    fn transmit(&mut self, dst: EthernetAddress, ether_type: EtherType, payload: Vec<u8>) {
        let frame = EthernetFrame::new(dst, self.ethernet_address, ether_type, payload);
        self.port.transmit(&frame);
    }
}
