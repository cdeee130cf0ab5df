use crate::conn::byte_stream::ByteStream;
use crate::tcp::config::{TcpConfig, MAX_PAYLOAD_SIZE};
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::tcp::timer::RetransmissionTimer;
use crate::tcp::wrap32::Wrap32;
use std::collections::VecDeque;

/// The sender end of a TCP peer.
///
/// Reads from an outgoing `ByteStream`, cuts it into segments that fit the
/// receiver's advertised window and keeps every segment until it has been
/// acknowledged in full. Time only moves when the owner calls `tick`.
#[derive(Debug)]
pub struct TcpSender {
    input: ByteStream,                         // Stream of outgoing data
    isn: Wrap32,                               // Our initial sequence number
    initial_rto_ms: u64,                       // RTO restored after every acknowledgment
    max_payload_size: usize,                   // Payload limit per segment
    next_seqno: u64,                           // Absolute seqno of the next new byte
    acked_seqno: u64,                          // Absolute seqno of the oldest unacked byte
    bytes_in_flight: u64,                      // Sequence numbers sent but not yet acked
    window_size: u16,                          // Advertised window from receiver
    syn_sent: bool,                            // Has the SYN gone out?
    fin_sent: bool,                            // Has the FIN gone out?
    outstanding: VecDeque<TcpSenderMessage>,   // Sent but un'acked segments, oldest first
    timer: RetransmissionTimer,                // Timer for the oldest outstanding segment
    consecutive_retransmissions: u64,          // Retransmissions since the last new ack
}

impl TcpSender {
    pub fn new(input: ByteStream, isn: Wrap32, initial_rto_ms: u64) -> Self {
        TcpSender {
            input,
            isn,
            initial_rto_ms,
            max_payload_size: MAX_PAYLOAD_SIZE,
            next_seqno: 0,
            acked_seqno: 0,
            bytes_in_flight: 0,
            window_size: 1, // Enough to get the SYN out before hearing from the receiver
            syn_sent: false,
            fin_sent: false,
            outstanding: VecDeque::new(),
            timer: RetransmissionTimer::new(initial_rto_ms),
            consecutive_retransmissions: 0,
        }
    }

    /// A sender with a fresh outgoing stream, ISN, RTO and payload limit taken from `config`
    pub fn from_config(config: &TcpConfig) -> Self {
        let mut sender = TcpSender::new(
            ByteStream::new(config.send_capacity),
            config.isn,
            config.rt_timeout,
        );
        sender.max_payload_size = config.max_payload_size;
        sender
    }

    /// Send as many new segments as the window allows
    pub fn push<F>(&mut self, mut transmit: F)
    where
        F: FnMut(&TcpSenderMessage),
    {
        // A zero window is treated as one, so a single probe byte may go out
        let window = u64::from(self.window_size.max(1));

        while self.bytes_in_flight < window && !self.fin_sent {
            let mut msg = self.make_empty_message();
            msg.syn = !self.syn_sent;

            let budget = window - self.bytes_in_flight - msg.syn as u64;
            let payload_len = budget.min(self.max_payload_size as u64) as usize;
            msg.payload = self.input.read_bytes(payload_len);

            // FIN only goes out once it fits in the window next to the payload
            if self.input.is_finished() && budget > msg.payload.len() as u64 {
                msg.fin = true;
            }

            let length = msg.sequence_length();
            if length == 0 {
                break;
            }

            self.syn_sent = true;
            self.fin_sent = msg.fin;
            self.next_seqno += length;
            self.bytes_in_flight += length;
            if !self.timer.is_running() {
                self.timer = self.timer.start();
            }

            log::trace!(
                "send seqno={} len={} syn={} fin={} in_flight={}",
                msg.seqno,
                length,
                msg.syn,
                msg.fin,
                self.bytes_in_flight
            );
            transmit(&msg);
            self.outstanding.push_back(msg);
        }
    }

    /// A segment that occupies no sequence numbers, e.g. for a bare acknowledgment
    pub fn make_empty_message(&self) -> TcpSenderMessage {
        TcpSenderMessage {
            seqno: Wrap32::wrap(self.next_seqno, self.isn),
            syn: false,
            payload: Vec::new(),
            fin: false,
            rst: self.input.has_error(),
        }
    }

    /// Absorb an acknowledgment and window update from the remote receiver
    pub fn receive(&mut self, msg: &TcpReceiverMessage) {
        self.window_size = msg.window_size;
        if msg.rst {
            self.input.set_error();
        }

        let Some(ackno) = msg.ackno else {
            // No ackno yet and nothing to offer: the remote reader gave up
            if msg.window_size == 0 {
                self.input.set_error();
            }
            return;
        };

        let abs_ackno = ackno.unwrap(self.isn, self.next_seqno);
        if abs_ackno > self.next_seqno {
            log::debug!("ignoring ackno {} beyond next seqno {}", abs_ackno, self.next_seqno);
            return;
        }

        let mut acked_any = false;
        while let Some(front) = self.outstanding.front() {
            let length = front.sequence_length();
            if abs_ackno < self.acked_seqno + length {
                break; // Not (fully) acknowledged yet
            }
            self.acked_seqno += length;
            self.bytes_in_flight -= length;
            self.outstanding.pop_front();
            acked_any = true;
        }

        if acked_any {
            self.consecutive_retransmissions = 0;
            self.timer = RetransmissionTimer::new(self.initial_rto_ms);
            if !self.outstanding.is_empty() {
                self.timer = self.timer.start();
            }
        }
    }

    /// Let `ms_since_last_tick` milliseconds pass, retransmitting on timeout
    pub fn tick<F>(&mut self, ms_since_last_tick: u64, mut transmit: F)
    where
        F: FnMut(&TcpSenderMessage),
    {
        self.timer = self.timer.tick(ms_since_last_tick);
        if !self.timer.is_expired() {
            return;
        }

        if let Some(front) = self.outstanding.front() {
            log::trace!("retransmit seqno={} rto={}ms", front.seqno, self.timer.rto_ms());
            transmit(front);
        }
        // Back off only while the receiver has room; probing a zero window keeps its pace
        if self.window_size != 0 {
            self.timer = self.timer.backoff();
        }
        self.timer = self.timer.reset();
        self.consecutive_retransmissions += 1;
    }

    pub fn sequence_numbers_in_flight(&self) -> u64 {
        self.bytes_in_flight
    }

    pub fn consecutive_retransmissions(&self) -> u64 {
        self.consecutive_retransmissions
    }

    /// The outgoing stream, for the application to write into
    pub fn writer(&mut self) -> &mut ByteStream {
        &mut self.input
    }

    pub fn reader(&self) -> &ByteStream {
        &self.input
    }
}

// -- Unit tests --
