use std::ops::ControlFlow;

use bytes::{Bytes, BytesMut};

use crate::config::LineOverflow;
use crate::constants;

/// Splits a chunked byte stream into lines and keeps the most recent ones.
///
/// Completed lines, terminator included, are written into a fixed number of
/// circular slots; once all slots are used the oldest line is overwritten.
/// Bytes after the last `\n` stay in an in-progress buffer until their line
/// is terminated, bounded by `max_line_length`.
#[derive(Debug)]
pub struct LineRingBuffer {
    slots: Vec<Bytes>,
    next_slot: usize,
    len: usize,
    partial: BytesMut,
    max_line_length: usize,
    overflow: LineOverflow,
    truncated: bool,
}

impl LineRingBuffer {
    /// Creates a buffer retaining `capacity` lines. A zero capacity is raised to one.
    pub fn new(capacity: usize, max_line_length: usize, overflow: LineOverflow) -> LineRingBuffer {
        LineRingBuffer {
            slots: vec![Bytes::new(); capacity.max(1)],
            next_slot: 0,
            len: 0,
            partial: BytesMut::new(),
            max_line_length,
            overflow,
            truncated: false,
        }
    }

    /// Feeds the next chunk of the stream.
    ///
    /// Every line completed by this chunk is stored and handed to `on_line`
    /// before the following bytes are looked at. When `on_line` breaks, the
    /// rest of the chunk is left unread and `Break` is returned.
    pub fn feed<F>(&mut self, chunk: &[u8], mut on_line: F) -> crate::Result<ControlFlow<()>>
    where
        F: FnMut(&[u8]) -> ControlFlow<()>,
    {
        let mut rest = chunk;

        while !rest.is_empty() {
            match memchr::memchr(constants::LF, rest) {
                Some(idx) => {
                    self.push_content(&rest[..idx])?;
                    rest = &rest[idx + 1..];

                    let line = self.complete_line();
                    if on_line(&line[..]).is_break() {
                        return Ok(ControlFlow::Break(()));
                    }
                }
                None => {
                    self.push_content(rest)?;
                    break;
                }
            }
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Returns the line stored in the given circular slot.
    pub fn get(&self, slot: usize) -> Option<&[u8]> {
        if slot < self.len {
            Some(&self.slots[slot][..])
        } else {
            None
        }
    }

    /// Returns the most recently completed line.
    pub fn latest(&self) -> Option<&[u8]> {
        if self.len == 0 {
            return None;
        }

        let idx = (self.next_slot + self.slots.len() - 1) % self.slots.len();
        Some(&self.slots[idx][..])
    }

    /// Iterates over the retained lines from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let start = if self.len < self.slots.len() { 0 } else { self.next_slot };

        (0..self.len).map(move |offset| &self.slots[(start + offset) % self.slots.len()][..])
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of retained lines.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes received after the last line terminator.
    pub fn pending(&self) -> &[u8] {
        &self.partial
    }

    /// Drops all retained lines and any in-progress line.
    pub fn reset(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Bytes::new();
        }
        self.next_slot = 0;
        self.len = 0;
        self.partial.clear();
        self.truncated = false;
    }

    fn push_content(&mut self, data: &[u8]) -> crate::Result<()> {
        let room = self.max_line_length.saturating_sub(self.partial.len());

        if data.len() <= room {
            self.partial.extend_from_slice(data);
            return Ok(());
        }

        match self.overflow {
            LineOverflow::Fail => Err(crate::Error::LineTooLong {
                limit: self.max_line_length,
            }),
            LineOverflow::Truncate => {
                self.partial.extend_from_slice(&data[..room]);
                if !self.truncated {
                    log::warn!("line exceeded {} bytes, truncating", self.max_line_length);
                    self.truncated = true;
                }
                Ok(())
            }
        }
    }

    fn complete_line(&mut self) -> Bytes {
        self.partial.extend_from_slice(&[constants::LF]);
        let line = self.partial.split().freeze();
        self.truncated = false;

        self.slots[self.next_slot] = line.clone();
        self.next_slot = (self.next_slot + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());

        line
    }
}
