use crate::net::ipv4::{InternetDatagram, IpHeader, PROTO_TCP};
use crate::packet::errors::HeaderError;
use crate::packet::{fold_checksum, ones_complement_sum, require_len};
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::tcp::wrap32::Wrap32;
use bitflags::bitflags;
use std::net::Ipv4Addr;

pub const TCP_HEADER_LEN: usize = 20;

bitflags! {
    // Bit positions [ CWR, ECE, URG, ACK, PSH, RST, SYN, FIN ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TcpFlags: u8 {
        const CWR = 1 << 7;
        const ECE = 1 << 6;
        const URG = 1 << 5;
        const ACK = 1 << 4;
        const PSH = 1 << 3;
        const RST = 1 << 2;
        const SYN = 1 << 1;
        const FIN = 1 << 0;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpHeader {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq_no: Wrap32,
    pub ack_no: Wrap32,
    pub data_offset: u8, // Upper 4 bits
    pub reserved: u8,    // Lower 4 bits
    pub flags: TcpFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent: u16,
    pub options: Vec<u8>,
    pub payload: Vec<u8>, // Append payload to end of TCP header for ease of use
}

impl Default for TcpHeader {
    fn default() -> Self {
        TcpHeader {
            src_port: 0,
            dst_port: 0,
            seq_no: Wrap32::new(0),
            ack_no: Wrap32::new(0),
            data_offset: 5,
            reserved: 0,
            flags: TcpFlags::empty(),
            window: 0,
            checksum: 0,
            urgent: 0,
            options: vec![],
            payload: vec![],
        }
    }
}

impl TcpHeader {
    /// Combine what our sender and our receiver want to say into one segment
    pub fn from_messages(
        src_port: u16,
        dst_port: u16,
        sender: &TcpSenderMessage,
        receiver: &TcpReceiverMessage,
    ) -> Self {
        let mut flags = TcpFlags::empty();
        flags.set(TcpFlags::SYN, sender.syn);
        flags.set(TcpFlags::FIN, sender.fin);
        flags.set(TcpFlags::RST, sender.rst || receiver.rst);
        flags.set(TcpFlags::ACK, receiver.ackno.is_some());

        TcpHeader {
            src_port,
            dst_port,
            seq_no: sender.seqno,
            ack_no: receiver.ackno.unwrap_or_default(),
            flags,
            window: receiver.window_size,
            payload: sender.payload.clone(),
            ..Default::default()
        }
    }

    /// The part of this segment meant for our receiver
    pub fn sender_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: self.seq_no,
            syn: self.flags.contains(TcpFlags::SYN),
            payload: self.payload.clone(),
            fin: self.flags.contains(TcpFlags::FIN),
            rst: self.flags.contains(TcpFlags::RST),
        }
    }

    /// The part of this segment meant for our sender
    pub fn receiver_message(&self) -> TcpReceiverMessage {
        TcpReceiverMessage {
            ackno: self.flags.contains(TcpFlags::ACK).then_some(self.ack_no),
            window_size: self.window,
            rst: self.flags.contains(TcpFlags::RST),
        }
    }

    /// Length on the wire: header, options and payload
    pub fn wire_len(&self) -> usize {
        self.data_offset as usize * 4 + self.payload.len()
    }

    /// Serialize into `buf`, computing the checksum against the enclosing `iph`.
    pub fn serialize(&self, buf: &mut [u8], iph: &IpHeader) -> Result<usize, HeaderError> {
        let header_len = self.data_offset as usize * 4; // 20 + options
        if header_len != TCP_HEADER_LEN + self.options.len() {
            return Err(HeaderError::LengthMismatch {
                declared: header_len,
                actual: TCP_HEADER_LEN + self.options.len(),
            });
        }
        let total_len = header_len + self.payload.len();
        if buf.len() < total_len {
            return Err(HeaderError::BufferTooSmall {
                expected: total_len,
                found: buf.len(),
            });
        }

        buf[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        buf[4..8].copy_from_slice(&self.seq_no.raw_value().to_be_bytes());
        buf[8..12].copy_from_slice(&self.ack_no.raw_value().to_be_bytes());
        buf[12] = (self.data_offset << 4) | self.reserved;
        buf[13] = self.flags.bits();
        buf[14..16].copy_from_slice(&self.window.to_be_bytes());
        buf[16..18].fill(0); // Set checksum to 0 initially
        buf[18..20].copy_from_slice(&self.urgent.to_be_bytes());
        buf[TCP_HEADER_LEN..header_len].copy_from_slice(&self.options);
        buf[header_len..total_len].copy_from_slice(&self.payload);

        let checksum = Self::checksum(&buf[..total_len], iph);
        buf[16..18].copy_from_slice(&checksum.to_be_bytes());

        Ok(total_len)
    }

    /// Parse a segment, verifying its checksum against the enclosing `iph`.
    pub fn parse(buf: &[u8], iph: &IpHeader) -> Result<Self, HeaderError> {
        require_len(buf, TCP_HEADER_LEN)?;

        let data_offset = buf[12] >> 4;
        let header_len = data_offset as usize * 4;
        if header_len < TCP_HEADER_LEN {
            return Err(HeaderError::Unsupported {
                field: "TCP data offset",
                value: data_offset as u32,
            });
        }
        require_len(buf, header_len)?;

        if Self::checksum(buf, iph) != 0 {
            return Err(HeaderError::BadChecksum("TCP".to_string()));
        }

        Ok(TcpHeader {
            src_port: u16::from_be_bytes([buf[0], buf[1]]),
            dst_port: u16::from_be_bytes([buf[2], buf[3]]),
            seq_no: Wrap32::new(u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]])),
            ack_no: Wrap32::new(u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]])),
            data_offset,
            reserved: buf[12] & 0x0f,
            flags: TcpFlags::from_bits_truncate(buf[13]),
            window: u16::from_be_bytes([buf[14], buf[15]]),
            checksum: u16::from_be_bytes([buf[16], buf[17]]),
            urgent: u16::from_be_bytes([buf[18], buf[19]]),
            options: buf[TCP_HEADER_LEN..header_len].to_vec(),
            payload: buf[header_len..].to_vec(),
        })
    }

    /// Checksum over the IPv4 pseudo-header and the whole segment in `data`
    pub fn checksum(data: &[u8], iph: &IpHeader) -> u16 {
        let mut pseudo = [0u8; 12];
        pseudo[0..4].copy_from_slice(&iph.src_ip.octets());
        pseudo[4..8].copy_from_slice(&iph.dst_ip.octets());
        pseudo[9] = iph.protocol;
        pseudo[10..12].copy_from_slice(&(data.len() as u16).to_be_bytes());

        let sum = ones_complement_sum(0, &pseudo);
        fold_checksum(ones_complement_sum(sum, data))
    }

    /// Wrap this segment in an IPv4 datagram from `src_ip` to `dst_ip`
    pub fn to_datagram(&self, src_ip: Ipv4Addr, dst_ip: Ipv4Addr) -> Result<InternetDatagram, HeaderError> {
        let mut dgram = InternetDatagram::new(src_ip, dst_ip, PROTO_TCP, vec![0u8; self.wire_len()])?;
        self.serialize(&mut dgram.payload, &dgram.header)?;
        Ok(dgram)
    }

    /// Extract the segment carried by an IPv4 datagram
    pub fn from_datagram(dgram: &InternetDatagram) -> Result<Self, HeaderError> {
        if dgram.header.protocol != PROTO_TCP {
            return Err(HeaderError::Unsupported {
                field: "IP protocol",
                value: dgram.header.protocol as u32,
            });
        }
        Self::parse(&dgram.payload, &dgram.header)
    }
}

// -- Unit tests --
