//! A user-space network stack: TCP sender and receiver over IPv4, carried in
//! Ethernet frames with ARP address resolution.
//!
//! Nothing here touches a socket or a clock. Callers push segments and frames
//! in, collect what comes out, and advance time with `tick`.

pub mod conn;
pub mod net;
pub mod packet;
pub mod tcp;
