use crate::conn::byte_stream::ByteStream;
use crate::conn::reassembler::Reassembler;
use crate::tcp::message::{TcpReceiverMessage, TcpSenderMessage};
use crate::tcp::wrap32::Wrap32;

/// The receiver end of a TCP peer
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,   // Handles incoming TCP segments
    zero_point: Option<Wrap32>, // The remote ISN, learned from its SYN
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        TcpReceiver {
            reassembler,
            zero_point: None,
        }
    }

    /// Absorb a segment from the remote sender
    pub fn receive(&mut self, message: &TcpSenderMessage) {
        if self.stream_out().has_error() {
            return;
        }
        if message.rst {
            self.reassembler.output_mut().set_error();
            return;
        }

        let zero_point = match self.zero_point {
            Some(zero_point) => zero_point,
            None if message.syn => *self.zero_point.insert(message.seqno),
            None => return, // Nothing is buffered before the connection exists
        };

        // The SYN occupies absolute seqno 0, so stream index = abs_seqno - 1
        let checkpoint = self.stream_out().bytes_pushed() + 1;
        let abs_seqno = message.seqno.unwrap(zero_point, checkpoint);
        let Some(stream_index) = (abs_seqno + message.syn as u64).checked_sub(1) else {
            return; // A non-SYN segment claiming the SYN's seqno
        };

        self.reassembler.insert(stream_index, &message.payload, message.fin);
    }

    /// The acknowledgment and window to report back
    pub fn send(&self) -> TcpReceiverMessage {
        let stream = self.stream_out();
        let window_size = stream.available_capacity().min(u16::MAX as usize) as u16;
        let ackno = self.zero_point.map(|zero_point| {
            let next = stream.bytes_pushed() + 1 + stream.is_closed() as u64;
            Wrap32::wrap(next, zero_point)
        });

        TcpReceiverMessage {
            ackno,
            window_size,
            rst: stream.has_error(),
        }
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// The reassembled inbound stream
    pub fn stream_out(&self) -> &ByteStream {
        self.reassembler.output()
    }

    pub fn stream_out_mut(&mut self) -> &mut ByteStream {
        self.reassembler.output_mut()
    }
}

// -- Unit tests --
