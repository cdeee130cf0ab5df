use crate::packet::errors::HeaderError;
use crate::packet::require_len;
use eui48::MacAddress;

pub const ETHERNET_HEADER_LEN: usize = 14;

pub type EthernetAddress = MacAddress;

/// ff:ff:ff:ff:ff:ff
pub fn ethernet_broadcast() -> EthernetAddress {
    MacAddress::broadcast()
}

/// Read a 6-byte hardware address at the front of `buf`. The caller checks the length.
pub(crate) fn read_address(buf: &[u8]) -> EthernetAddress {
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&buf[..6]);
    MacAddress::new(octets)
}

// https://www.iana.org/assignments/ieee-802-numbers/ieee-802-numbers.xhtml
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EtherType {
    Ipv4,
    Arp,
    Unknown(u16),
}

impl EtherType {
    pub const IPV4: u16 = 0x0800;
    pub const ARP: u16 = 0x0806;
}

impl From<u16> for EtherType {
    fn from(value: u16) -> Self {
        match value {
            EtherType::IPV4 => EtherType::Ipv4,
            EtherType::ARP => EtherType::Arp,
            other => EtherType::Unknown(other),
        }
    }
}

impl From<EtherType> for u16 {
    fn from(ether_type: EtherType) -> Self {
        match ether_type {
            EtherType::Ipv4 => EtherType::IPV4,
            EtherType::Arp => EtherType::ARP,
            EtherType::Unknown(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: EthernetAddress,
    pub src: EthernetAddress,
    pub ether_type: EtherType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EthernetFrame {
    pub header: EthernetHeader,
    pub payload: Vec<u8>,
}

impl EthernetFrame {
    pub fn new(dst: EthernetAddress, src: EthernetAddress, ether_type: EtherType, payload: Vec<u8>) -> Self {
        EthernetFrame {
            header: EthernetHeader { dst, src, ether_type },
            payload,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ETHERNET_HEADER_LEN + self.payload.len());
        buf.extend_from_slice(self.header.dst.as_bytes());
        buf.extend_from_slice(self.header.src.as_bytes());
        buf.extend_from_slice(&u16::from(self.header.ether_type).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        require_len(buf, ETHERNET_HEADER_LEN)?;

        Ok(EthernetFrame {
            header: EthernetHeader {
                dst: read_address(&buf[0..6]),
                src: read_address(&buf[6..12]),
                ether_type: EtherType::from(u16::from_be_bytes([buf[12], buf[13]])),
            },
            payload: buf[ETHERNET_HEADER_LEN..].to_vec(),
        })
    }
}
