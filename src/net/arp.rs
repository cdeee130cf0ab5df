use crate::net::ethernet::{read_address, EtherType, EthernetAddress};
use crate::packet::errors::HeaderError;
use crate::packet::require_len;
use eui48::MacAddress;
use std::net::Ipv4Addr;

pub const ARP_MESSAGE_LEN: usize = 28;

const HW_TYPE_ETHERNET: u16 = 1;
const HW_ADDR_LEN: u8 = 6;
const PROTO_ADDR_LEN: u8 = 4;

// https://datatracker.ietf.org/doc/html/rfc826
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArpOpcode {
    Request = 1,
    Reply = 2,
}

/// An ARP message for Ethernet hardware and IPv4 protocol addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpMessage {
    pub opcode: ArpOpcode,
    pub sender_ethernet_address: EthernetAddress,
    pub sender_ip_address: Ipv4Addr,
    pub target_ethernet_address: EthernetAddress,
    pub target_ip_address: Ipv4Addr,
}

impl ArpMessage {
    /// Who has `target_ip`? Tell `sender_ip`.
    pub fn request(sender_ethernet: EthernetAddress, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        ArpMessage {
            opcode: ArpOpcode::Request,
            sender_ethernet_address: sender_ethernet,
            sender_ip_address: sender_ip,
            target_ethernet_address: MacAddress::nil(),
            target_ip_address: target_ip,
        }
    }

    /// The answer to `request`, sent from `sender_ethernet` / `sender_ip`
    pub fn reply_to(request: &ArpMessage, sender_ethernet: EthernetAddress, sender_ip: Ipv4Addr) -> Self {
        ArpMessage {
            opcode: ArpOpcode::Reply,
            sender_ethernet_address: sender_ethernet,
            sender_ip_address: sender_ip,
            target_ethernet_address: request.sender_ethernet_address,
            target_ip_address: request.sender_ip_address,
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(ARP_MESSAGE_LEN);
        buf.extend_from_slice(&HW_TYPE_ETHERNET.to_be_bytes());
        buf.extend_from_slice(&EtherType::IPV4.to_be_bytes());
        buf.push(HW_ADDR_LEN);
        buf.push(PROTO_ADDR_LEN);
        buf.extend_from_slice(&(self.opcode as u16).to_be_bytes());
        buf.extend_from_slice(self.sender_ethernet_address.as_bytes());
        buf.extend_from_slice(&self.sender_ip_address.octets());
        buf.extend_from_slice(self.target_ethernet_address.as_bytes());
        buf.extend_from_slice(&self.target_ip_address.octets());
        buf
    }

    /// Parse an Ethernet/IPv4 ARP message. Anything else is rejected.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        require_len(buf, ARP_MESSAGE_LEN)?;

        let hw_type = u16::from_be_bytes([buf[0], buf[1]]);
        let proto_type = u16::from_be_bytes([buf[2], buf[3]]);
        if hw_type != HW_TYPE_ETHERNET {
            return Err(HeaderError::Unsupported {
                field: "ARP hardware type",
                value: hw_type as u32,
            });
        }
        if proto_type != EtherType::IPV4 {
            return Err(HeaderError::Unsupported {
                field: "ARP protocol type",
                value: proto_type as u32,
            });
        }
        if buf[4] != HW_ADDR_LEN || buf[5] != PROTO_ADDR_LEN {
            return Err(HeaderError::Unsupported {
                field: "ARP address length",
                value: u16::from_be_bytes([buf[4], buf[5]]) as u32,
            });
        }

        let opcode = match u16::from_be_bytes([buf[6], buf[7]]) {
            1 => ArpOpcode::Request,
            2 => ArpOpcode::Reply,
            other => {
                log::warn!("ARP message with unknown opcode {:#x}", other);
                return Err(HeaderError::Unsupported {
                    field: "ARP opcode",
                    value: other as u32,
                });
            }
        };

        Ok(ArpMessage {
            opcode,
            sender_ethernet_address: read_address(&buf[8..14]),
            sender_ip_address: Ipv4Addr::new(buf[14], buf[15], buf[16], buf[17]),
            target_ethernet_address: read_address(&buf[18..24]),
            target_ip_address: Ipv4Addr::new(buf[24], buf[25], buf[26], buf[27]),
        })
    }
}
