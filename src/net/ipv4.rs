use crate::packet::errors::HeaderError;
use crate::packet::{fold_checksum, ones_complement_sum, require_len};
use bitflags::bitflags;
use std::net::Ipv4Addr;

pub const IPV4_HEADER_LEN: usize = 20;
pub const DEFAULT_TTL: u8 = 64;
pub const PROTO_TCP: u8 = 6;

bitflags! {
    // Bit positions [ RF, DF, MF, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0 ]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IpFlags: u16 {
        const RF = 1 << 15; // Reserved Flag
        const DF = 1 << 14; // Don't Fragment
        const MF = 1 << 13; // More Fragments
    }
}

impl IpFlags {
    /// Pack the flags and the 13-bit fragment offset into one word
    pub fn pack(self, frag_offset: u16) -> u16 {
        self.bits() | (frag_offset & 0x1fff)
    }

    /// Split a word into flags and fragment offset
    pub fn unpack(bits: u16) -> (Self, u16) {
        (Self::from_bits_truncate(bits & 0xe000), bits & 0x1fff)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpHeader {
    pub version: u8, // Always 4
    pub ihl: u8,     // Header length in 32-bit words; 5 when we send
    pub tos: u8,
    pub total_len: u16,
    pub id: u16,
    pub flags: IpFlags,   // 3 bits, part of u16
    pub frag_offset: u16, // 13 bits, part of u16
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
}

impl Default for IpHeader {
    fn default() -> Self {
        IpHeader {
            version: 4,
            ihl: 5,
            tos: 0,
            total_len: IPV4_HEADER_LEN as u16,
            id: 0,
            flags: IpFlags::DF,
            frag_offset: 0,
            ttl: DEFAULT_TTL,
            protocol: 0,
            checksum: 0,
            src_ip: Ipv4Addr::UNSPECIFIED,
            dst_ip: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl IpHeader {
    /// Length of the header on the wire, options included
    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    /// Serialize into the first 20 bytes of `buf`, filling in the checksum.
    /// Options are never written.
    pub fn serialize(&self, buf: &mut [u8]) -> Result<usize, HeaderError> {
        if buf.len() < IPV4_HEADER_LEN {
            return Err(HeaderError::BufferTooSmall {
                expected: IPV4_HEADER_LEN,
                found: buf.len(),
            });
        }

        buf[0] = (self.version << 4) | 5;
        buf[1] = self.tos;
        buf[2..4].copy_from_slice(&self.total_len.to_be_bytes());
        buf[4..6].copy_from_slice(&self.id.to_be_bytes());
        buf[6..8].copy_from_slice(&self.flags.pack(self.frag_offset).to_be_bytes());
        buf[8] = self.ttl;
        buf[9] = self.protocol;
        buf[10..12].fill(0); // Set checksum to 0 initially
        buf[12..16].copy_from_slice(&self.src_ip.octets());
        buf[16..20].copy_from_slice(&self.dst_ip.octets());

        let checksum = Self::checksum(&buf[..IPV4_HEADER_LEN]);
        buf[10..12].copy_from_slice(&checksum.to_be_bytes());

        Ok(IPV4_HEADER_LEN)
    }

    /// Parse the header at the front of `buf`. Options are skipped.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        require_len(buf, IPV4_HEADER_LEN)?;

        let version = buf[0] >> 4;
        if version != 4 {
            return Err(HeaderError::Unsupported {
                field: "IP version",
                value: version as u32,
            });
        }

        let ihl = buf[0] & 0x0f;
        let header_len = ihl as usize * 4;
        if header_len < IPV4_HEADER_LEN {
            return Err(HeaderError::Unsupported {
                field: "IP header length",
                value: ihl as u32,
            });
        }
        require_len(buf, header_len)?;

        if Self::checksum(&buf[..header_len]) != 0 {
            return Err(HeaderError::BadChecksum("IP".to_string()));
        }

        let (flags, frag_offset) = IpFlags::unpack(u16::from_be_bytes([buf[6], buf[7]]));

        Ok(IpHeader {
            version,
            ihl,
            tos: buf[1],
            total_len: u16::from_be_bytes([buf[2], buf[3]]),
            id: u16::from_be_bytes([buf[4], buf[5]]),
            flags,
            frag_offset,
            ttl: buf[8],
            protocol: buf[9],
            checksum: u16::from_be_bytes([buf[10], buf[11]]),
            src_ip: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            dst_ip: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
        })
    }

    /// Internet checksum (RFC 1071) over `data`. Zero when `data` carries a valid checksum.
    pub fn checksum(data: &[u8]) -> u16 {
        fold_checksum(ones_complement_sum(0, data))
    }
}

/// An IPv4 header and its payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternetDatagram {
    pub header: IpHeader,
    pub payload: Vec<u8>,
}

impl InternetDatagram {
    /// A datagram with default header fields, a correct length and checksum
    pub fn new(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, protocol: u8, payload: Vec<u8>) -> Result<Self, HeaderError> {
        let total_len = IPV4_HEADER_LEN + payload.len();
        let total_len = u16::try_from(total_len).map_err(|_| HeaderError::LengthMismatch {
            declared: u16::MAX as usize,
            actual: total_len,
        })?;

        let mut header = IpHeader {
            total_len,
            protocol,
            src_ip,
            dst_ip,
            ..Default::default()
        };
        let mut buf = [0u8; IPV4_HEADER_LEN];
        header.serialize(&mut buf)?;
        header.checksum = u16::from_be_bytes([buf[10], buf[11]]);

        Ok(InternetDatagram { header, payload })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, HeaderError> {
        let total_len = IPV4_HEADER_LEN + self.payload.len();
        if self.header.total_len as usize != total_len {
            return Err(HeaderError::LengthMismatch {
                declared: self.header.total_len as usize,
                actual: total_len,
            });
        }

        let mut buf = vec![0u8; total_len];
        self.header.serialize(&mut buf)?;
        buf[IPV4_HEADER_LEN..].copy_from_slice(&self.payload);
        Ok(buf)
    }

    /// Parse a datagram. Bytes past the header's total length (link-layer padding) are dropped.
    pub fn parse(buf: &[u8]) -> Result<Self, HeaderError> {
        let header = IpHeader::parse(buf)?;
        let total_len = header.total_len as usize;
        if total_len < header.header_len() || total_len > buf.len() {
            return Err(HeaderError::LengthMismatch {
                declared: total_len,
                actual: buf.len(),
            });
        }

        let payload = buf[header.header_len()..total_len].to_vec();

        // Options are not kept, so describe the datagram as it would be re-serialized
        let mut header = header;
        header.ihl = 5;
        header.total_len = (IPV4_HEADER_LEN + payload.len()) as u16;

        Ok(InternetDatagram { header, payload })
    }
}

// -- Unit tests --
