use crate::conn::byte_stream::ByteStream;
use std::collections::BTreeMap;
use std::io;
use std::io::Read;
use std::ops::Bound::{Excluded, Included};

/// Puts indexed substrings of a stream back in order and writes them into a `ByteStream`.
#[derive(Debug)]
pub struct Reassembler {
    segments: BTreeMap<u64, Vec<u8>>, // Out-of-order, non-overlapping segments. key = start index
    output: ByteStream,               // The assembled ByteStream, ready to be read
    last_index: Option<u64>,          // One past the final byte, once known
}

impl Reassembler {
    /// New `Reassembler` with the provided `ByteStream` as output
    pub fn new(output: ByteStream) -> Self {
        Reassembler {
            segments: BTreeMap::new(),
            output,
            last_index: None,
        }
    }

    /// Insert the substring `data` starting at stream index `first_index`.
    ///
    /// Bytes that fall before the next expected byte, or beyond the output's
    /// available capacity, are discarded.
    pub fn insert(&mut self, first_index: u64, data: &[u8], is_last: bool) {
        let data_end = first_index + data.len() as u64;
        if is_last {
            self.last_index = Some(data_end);
        }

        let start = first_index.max(self.first_unassembled());
        let end = data_end.min(self.first_unacceptable());
        if start < end {
            let window = &data[(start - first_index) as usize..(end - first_index) as usize];
            self.buffer(start, window.to_vec());
        }

        self.try_write();
    }

    /// The total number of bytes pending reassembly in the buffer
    pub fn bytes_pending(&self) -> u64 {
        self.segments.values().map(|segment| segment.len() as u64).sum()
    }

    /// The underlying `ByteStream` output
    pub fn output(&self) -> &ByteStream {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut ByteStream {
        &mut self.output
    }

    /// Index of the next byte the output is waiting for
    pub fn first_unassembled(&self) -> u64 {
        self.output.bytes_pushed()
    }

    fn first_unacceptable(&self) -> u64 {
        self.first_unassembled() + self.output.available_capacity() as u64
    }

    /// Buffer `[start, start + data.len())`, merging with any overlapping or adjacent segment
    fn buffer(&mut self, mut start: u64, mut data: Vec<u8>) {
        let mut end = start + data.len() as u64;

        // A segment beginning at or before `start` may cover or touch the new data
        let previous = self
            .segments
            .range(..=start)
            .next_back()
            .map(|(&seg_start, seg)| (seg_start, seg_start + seg.len() as u64));
        if let Some((seg_start, seg_end)) = previous {
            if seg_end >= end {
                return; // Already buffered
            }
            if seg_end >= start {
                if let Some(mut merged) = self.segments.remove(&seg_start) {
                    merged.extend_from_slice(&data[(seg_end - start) as usize..]);
                    start = seg_start;
                    data = merged;
                }
            }
        }

        // Absorb every segment that begins inside or right after the merged range
        while let Some(seg_start) = self
            .segments
            .range((Excluded(start), Included(end)))
            .next()
            .map(|(&seg_start, _)| seg_start)
        {
            if let Some(seg) = self.segments.remove(&seg_start) {
                let seg_end = seg_start + seg.len() as u64;
                if seg_end > end {
                    data.extend_from_slice(&seg[(end - seg_start) as usize..]);
                    end = seg_end;
                }
            }
        }

        self.segments.insert(start, data);
    }

    /// Write contiguous data from the buffer to the output `ByteStream`
    fn try_write(&mut self) {
        loop {
            let next = self.first_unassembled();
            let Some(data) = self.segments.remove(&next) else {
                break;
            };
            let n = self.output.push(&data);
            if n < data.len() {
                // Capacity is reserved on insert, so this only happens once the output was closed
                break;
            }
        }

        if self.last_index == Some(self.first_unassembled()) {
            self.output.close();
        }
    }
}

impl Read for Reassembler {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.output.read(buf)
    }
}

// -- Unit tests --
