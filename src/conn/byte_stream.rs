use std::collections::VecDeque;
use std::io;
use std::io::{Read, Write};

/// A bounded in-memory pipe. One side pushes bytes and eventually closes it,
/// the other side peeks and pops. Either side may flag an error.
#[derive(Debug)]
pub struct ByteStream {
    buffer: VecDeque<u8>,
    capacity: usize,
    closed: bool,
    error: bool,
    bytes_pushed: u64,
    bytes_popped: u64,
}

impl ByteStream {
    pub fn new(capacity: usize) -> Self {
        ByteStream {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            closed: false,
            error: false,
            bytes_pushed: 0,
            bytes_popped: 0,
        }
    }

    // -- Writer side --

    /// Push as much of `data` as fits. Returns the number of bytes accepted.
    pub fn push(&mut self, data: &[u8]) -> usize {
        if self.closed {
            return 0;
        }
        let to_write = data.len().min(self.available_capacity());
        self.buffer.extend(&data[..to_write]);
        self.bytes_pushed += to_write as u64;
        to_write
    }

    /// Signal that no more bytes will be pushed
    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn set_error(&mut self) {
        self.error = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The remaining capacity in the underlying buffer
    pub fn available_capacity(&self) -> usize {
        self.capacity - self.buffer.len()
    }

    /// Total number of bytes ever pushed
    pub fn bytes_pushed(&self) -> u64 {
        self.bytes_pushed
    }

    // -- Reader side --

    /// Peek up to `amount` bytes without consuming them
    pub fn peek(&self, amount: usize) -> Vec<u8> {
        self.buffer.iter().take(amount).copied().collect()
    }

    /// Discard up to `amount` buffered bytes
    pub fn pop(&mut self, amount: usize) {
        let to_pop = amount.min(self.buffer.len());
        self.buffer.drain(..to_pop);
        self.bytes_popped += to_pop as u64;
    }

    /// Consume up to `amount` bytes from the stream
    pub fn read_bytes(&mut self, amount: usize) -> Vec<u8> {
        let data = self.peek(amount);
        self.pop(data.len());
        data
    }

    /// Closed and fully drained
    pub fn is_finished(&self) -> bool {
        self.closed && self.buffer.is_empty()
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// The number of bytes still in the buffer (not consumed yet)
    pub fn bytes_buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Total number of bytes ever popped
    pub fn bytes_popped(&self) -> u64 {
        self.bytes_popped
    }
}

impl Read for ByteStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = buf.len().min(self.buffer.len());
        for (dst, src) in buf.iter_mut().zip(self.buffer.drain(..to_read)) {
            *dst = src;
        }
        self.bytes_popped += to_read as u64;
        Ok(to_read)
    }
}

impl Write for ByteStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed"));
        }
        Ok(self.push(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// -- Unit tests --
