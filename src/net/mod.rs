pub mod arp;
pub mod ethernet;
pub mod interface;
pub mod ipv4;

// -- Re-export structs for more concise usage

pub use arp::{ArpMessage, ArpOpcode};
pub use ethernet::{ethernet_broadcast, EtherType, EthernetAddress, EthernetFrame, EthernetHeader};
pub use interface::{NetworkInterface, OutputPort};
pub use ipv4::{InternetDatagram, IpFlags, IpHeader};
