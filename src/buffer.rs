use crate::error::{ServerError, ServerResult};
use std::io::{self, Read};

/// A receive buffer with a hard capacity.
///
/// Unlike a growable buffer it never reallocates: once `capacity` bytes are
/// held, reads stop. The request parser relies on this to enforce the request
/// head limit.
pub struct Buffer {
    data: Vec<u8>,
    read_pos: usize,
    write_pos: usize,
}

impl Buffer {
    /// Create a new buffer with the specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            read_pos: 0,
            write_pos: 0,
        }
    }

    /// Read data from a reader into the free tail of the buffer.
    ///
    /// Returns `Ok(0)` both at end of stream and when the buffer is full;
    /// callers tell the two apart with [`Buffer::is_full`].
    pub fn read_from<R: Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.compact();

        if self.remaining_capacity() == 0 {
            return Ok(0);
        }

        let bytes_read = reader.read(&mut self.data[self.write_pos..])?;
        self.write_pos += bytes_read;

        Ok(bytes_read)
    }

    /// Position of the first occurrence of `needle` in the unread data
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        if needle.is_empty() {
            return Some(0);
        }
        self.slice().windows(needle.len()).position(|window| window == needle)
    }

    /// Move unread data to the front so the whole tail is free
    fn compact(&mut self) {
        if self.read_pos == 0 {
            return;
        }
        self.data.copy_within(self.read_pos..self.write_pos, 0);
        self.write_pos -= self.read_pos;
        self.read_pos = 0;
    }

    /// Reset the buffer, clearing all data
    pub fn reset(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
    }

    /// Get the amount of data available to read
    pub fn available_data(&self) -> usize {
        self.write_pos - self.read_pos
    }

    /// Free bytes, counting space reclaimable by compaction
    pub fn remaining_capacity(&self) -> usize {
        self.data.len() - self.available_data()
    }

    /// Whether every byte of capacity holds unread data
    pub fn is_full(&self) -> bool {
        self.available_data() == self.data.len()
    }

    /// Get a slice of the buffer's data
    pub fn slice(&self) -> &[u8] {
        &self.data[self.read_pos..self.write_pos]
    }

    /// Get the total capacity of the buffer
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Advance the read position by the specified amount
    pub fn advance_read(&mut self, amount: usize) -> ServerResult<()> {
        let available = self.available_data();
        if amount > available {
            return Err(ServerError::Buffer(format!(
                "Cannot advance read position beyond write position ({} > {})",
                amount, available
            )));
        }

        self.read_pos += amount;

        if self.read_pos == self.write_pos {
            self.reset();
        }

        Ok(())
    }
}
