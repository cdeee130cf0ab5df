use eui48::MacAddress;
use netstack::conn::{ByteStream, Reassembler};
use netstack::net::{EthernetFrame, NetworkInterface};
use netstack::tcp::config::TIMEOUT_DFLT;
use netstack::tcp::{TcpHeader, TcpReceiver, TcpSender, TcpSenderMessage, Wrap32};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::collections::VecDeque;
use std::net::Ipv4Addr;

const CAPACITY: usize = 4000;

/// One end of the link: an interface plus a TCP sender/receiver pair.
struct Host {
    iface: NetworkInterface<VecDeque<EthernetFrame>>,
    sender: TcpSender,
    receiver: TcpReceiver,
    port: u16,
    peer_ip: Ipv4Addr,
    peer_port: u16,
    needs_ack: bool,
}

impl Host {
    fn new(name: &str, mac: [u8; 6], ip: Ipv4Addr, port: u16, peer_ip: Ipv4Addr, peer_port: u16, isn: u32) -> Self {
        Host {
            iface: NetworkInterface::new(name, VecDeque::new(), MacAddress::new(mac), ip),
            sender: TcpSender::new(ByteStream::new(CAPACITY), Wrap32::new(isn), TIMEOUT_DFLT),
            receiver: TcpReceiver::new(Reassembler::new(ByteStream::new(CAPACITY))),
            port,
            peer_ip,
            peer_port,
            needs_ack: false,
        }
    }

    fn transmit(&mut self, msg: &TcpSenderMessage) {
        let header = TcpHeader::from_messages(self.port, self.peer_port, msg, &self.receiver.send());
        let dgram = header.to_datagram(self.iface.ip_address(), self.peer_ip).unwrap();
        self.iface.send_datagram(&dgram, self.peer_ip);
    }

    /// Send whatever the window allows, or a bare ack if something arrived
    fn send_segments(&mut self) {
        let mut msgs = vec![];
        self.sender.push(|msg| msgs.push(msg.clone()));
        if msgs.is_empty() && self.needs_ack {
            msgs.push(self.sender.make_empty_message());
        }
        self.needs_ack = false;
        for msg in &msgs {
            self.transmit(msg);
        }
    }

    fn deliver(&mut self) {
        while let Some(dgram) = self.iface.datagrams_received().pop_front() {
            let header = TcpHeader::from_datagram(&dgram).unwrap();
            assert_eq!(header.dst_port, self.port);

            let segment = header.sender_message();
            self.receiver.receive(&segment);
            self.sender.receive(&header.receiver_message());
            if segment.sequence_length() > 0 {
                self.needs_ack = true;
            }
        }
    }

    fn tick(&mut self, ms: u64) {
        let mut msgs = vec![];
        self.sender.tick(ms, |msg| msgs.push(msg.clone()));
        for msg in &msgs {
            self.transmit(msg);
        }
        self.iface.tick(ms);
    }
}

fn hosts() -> (Host, Host) {
    let _ = env_logger::builder().is_test(true).try_init();

    let a_ip = Ipv4Addr::new(192, 168, 0, 1);
    let b_ip = Ipv4Addr::new(192, 168, 0, 2);
    let a = Host::new("a", [2, 0, 0, 0, 0, 0xa], a_ip, 40000, b_ip, 80, 0xffff_fff0);
    let b = Host::new("b", [2, 0, 0, 0, 0, 0xb], b_ip, 80, a_ip, 40000, 12345);
    (a, b)
}

/// Carry frames across the wire (through their byte encoding) until both sides go quiet
fn exchange(a: &mut Host, b: &mut Host) -> usize {
    let mut carried = 0;
    loop {
        let from_a: Vec<EthernetFrame> = a.iface.output_mut().drain(..).collect();
        let from_b: Vec<EthernetFrame> = b.iface.output_mut().drain(..).collect();
        if from_a.is_empty() && from_b.is_empty() {
            return carried;
        }
        carried += from_a.len() + from_b.len();
        for frame in &from_a {
            b.iface.recv_frame(&EthernetFrame::parse(&frame.serialize()).unwrap());
        }
        for frame in &from_b {
            a.iface.recv_frame(&EthernetFrame::parse(&frame.serialize()).unwrap());
        }
    }
}

fn round(a: &mut Host, b: &mut Host) {
    a.send_segments();
    b.send_segments();
    exchange(a, b);
    a.deliver();
    b.deliver();
}

fn handshake(a: &mut Host, b: &mut Host) {
    round(a, b);
    round(a, b);
    assert!(a.receiver.send().ackno.is_some());
    assert!(b.receiver.send().ackno.is_some());
    assert_eq!(a.sender.sequence_numbers_in_flight(), 0);
    assert_eq!(b.sender.sequence_numbers_in_flight(), 0);
}

#[test]
fn test_transfer_both_directions() {
    let (mut a, mut b) = hosts();

    let mut rng = StdRng::seed_from_u64(144);
    let mut a_data = vec![0u8; 20_000];
    let mut b_data = vec![0u8; 7_000];
    rng.fill_bytes(&mut a_data);
    rng.fill_bytes(&mut b_data);

    let mut a_to_write = &a_data[..];
    let mut b_to_write = &b_data[..];
    let mut a_received = vec![];
    let mut b_received = vec![];

    for _ in 0..200 {
        let n = a.sender.writer().push(a_to_write);
        a_to_write = &a_to_write[n..];
        if a_to_write.is_empty() {
            a.sender.writer().close();
        }
        let n = b.sender.writer().push(b_to_write);
        b_to_write = &b_to_write[n..];
        if b_to_write.is_empty() {
            b.sender.writer().close();
        }

        round(&mut a, &mut b);

        let buffered = a.receiver.stream_out().bytes_buffered();
        a_received.extend(a.receiver.stream_out_mut().read_bytes(buffered));
        let buffered = b.receiver.stream_out().bytes_buffered();
        b_received.extend(b.receiver.stream_out_mut().read_bytes(buffered));

        let done = a.receiver.stream_out().is_finished()
            && b.receiver.stream_out().is_finished()
            && a.sender.sequence_numbers_in_flight() == 0
            && b.sender.sequence_numbers_in_flight() == 0;
        if done {
            break;
        }
    }

    assert_eq!(b_received, a_data);
    assert_eq!(a_received, b_data);
    assert!(a.receiver.stream_out().is_finished());
    assert!(b.receiver.stream_out().is_finished());
    assert_eq!(a.sender.sequence_numbers_in_flight(), 0);
    assert_eq!(b.sender.sequence_numbers_in_flight(), 0);
    assert_eq!(a.sender.consecutive_retransmissions(), 0);
}

#[test]
fn test_lost_segment_is_retransmitted() {
    let (mut a, mut b) = hosts();
    handshake(&mut a, &mut b);

    a.sender.writer().push(b"hello world");
    a.send_segments();
    a.iface.output_mut().clear(); // lost on the wire
    exchange(&mut a, &mut b);
    b.deliver();
    assert_eq!(b.receiver.stream_out().bytes_buffered(), 0);

    a.tick(TIMEOUT_DFLT - 1);
    assert!(a.iface.output().is_empty());
    a.tick(1);
    assert_eq!(a.sender.consecutive_retransmissions(), 1);
    exchange(&mut a, &mut b);
    b.deliver();
    assert_eq!(b.receiver.stream_out_mut().read_bytes(11), b"hello world".to_vec());

    round(&mut a, &mut b);
    assert_eq!(a.sender.sequence_numbers_in_flight(), 0);
    assert_eq!(a.sender.consecutive_retransmissions(), 0);
}

#[test]
fn test_arp_resolution_survives_idle_period() {
    let (mut a, mut b) = hosts();
    handshake(&mut a, &mut b);

    // Both mappings are known, so a segment goes out as a single IPv4 frame
    a.sender.writer().push(b"x");
    a.send_segments();
    assert_eq!(exchange(&mut a, &mut b), 1);
    b.deliver();
    round(&mut a, &mut b);

    // After the cache expires the next segment needs a fresh request/reply
    a.iface.tick(30_000);
    b.iface.tick(30_000);
    a.sender.writer().push(b"y");
    a.send_segments();
    assert_eq!(exchange(&mut a, &mut b), 3);
    b.deliver();
    assert_eq!(b.receiver.stream_out_mut().read_bytes(2), b"xy".to_vec());
}
