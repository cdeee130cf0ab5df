use crate::tcp::wrap32::Wrap32;
use rand::Rng;

/// Default capacity of the inbound and outbound byte streams
pub const DEFAULT_CAPACITY: usize = 64000;

/// Largest payload the sender puts in a single segment
pub const MAX_PAYLOAD_SIZE: usize = 1000;

/// Initial retransmission timeout in milliseconds
pub const TIMEOUT_DFLT: u64 = 1000;

/// Consecutive retransmissions a caller should tolerate before giving up on a connection
pub const MAX_RETX_ATTEMPTS: u64 = 8;

/// Per-connection settings for a `TcpSender` / `TcpReceiver` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpConfig {
    pub rt_timeout: u64,          // Initial RTO in milliseconds
    pub recv_capacity: usize,     // Capacity of the inbound stream
    pub send_capacity: usize,     // Capacity of the outbound stream
    pub max_payload_size: usize,  // Payload limit per segment
    pub isn: Wrap32,              // Our initial sequence number
}

impl Default for TcpConfig {
    /// Default settings with a random ISN
    fn default() -> Self {
        TcpConfig {
            rt_timeout: TIMEOUT_DFLT,
            recv_capacity: DEFAULT_CAPACITY,
            send_capacity: DEFAULT_CAPACITY,
            max_payload_size: MAX_PAYLOAD_SIZE,
            isn: Wrap32::new(rand::thread_rng().gen()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TcpConfig::default();
        assert_eq!(config.rt_timeout, 1000);
        assert_eq!(config.recv_capacity, 64000);
        assert_eq!(config.send_capacity, 64000);
        assert_eq!(config.max_payload_size, 1000);
    }
}
