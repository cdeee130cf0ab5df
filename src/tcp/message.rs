use crate::tcp::wrap32::Wrap32;

/// What the sender half of a peer puts on the wire
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TcpSenderMessage {
    pub seqno: Wrap32,
    pub syn: bool,
    pub payload: Vec<u8>,
    pub fin: bool,
    pub rst: bool,
}

impl TcpSenderMessage {
    /// Sequence numbers occupied by this message. SYN and FIN count one each.
    pub fn sequence_length(&self) -> u64 {
        self.payload.len() as u64 + self.syn as u64 + self.fin as u64
    }
}

/// What the receiver half of a peer reports back to the remote sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpReceiverMessage {
    pub ackno: Option<Wrap32>,
    pub window_size: u16,
    pub rst: bool,
}
