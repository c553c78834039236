//! Batch scheduling contract: the fixed-capacity frame an engine
//! consumes per invocation, and the two-way classification each
//! buffer lands in afterward.
//!
//! This stands in for the host scheduler's node-invocation loop
//! (`spec.md` §5): a non-blocking callable runs once per frame, never
//! suspends, and hands each buffer to exactly one downstream fate.

use crate::buffer::{Buffer, FRAME_CAPACITY};

/// Where a processed buffer goes next. Plain lookups are left
/// unresolved here — the host owns FIB lookups and delivery; the core
/// only says which family to look up in, or that the packet is
/// dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextHop {
    Drop,
    LookupV4,
    LookupV6,
}

/// One classified outbound buffer.
pub struct Dispatched {
    pub buffer: Buffer,
    pub next_hop: NextHop,
}

/// A batch of up to `FRAME_CAPACITY` buffers handed to an engine in
/// one invocation, built from the host's buffer handles and associated
/// `adj_index`/`sw_if_index` metadata.
pub struct Frame {
    buffers: Vec<Buffer>,
}

impl Frame {
    pub fn new(buffers: Vec<Buffer>) -> Self {
        debug_assert!(buffers.len() <= FRAME_CAPACITY);
        Frame { buffers }
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    pub fn into_buffers(self) -> Vec<Buffer> {
        self.buffers
    }

    /// Runs `f` over each buffer in input order, preserving FIFO
    /// enqueue order into the returned dispatch list (`spec.md` §5
    /// "Ordering").
    pub fn dispatch<F>(self, mut f: F) -> Vec<Dispatched>
    where
        F: FnMut(Buffer) -> Vec<Dispatched>,
    {
        let mut out = Vec::with_capacity(self.buffers.len());
        for buffer in self.buffers {
            out.extend(f(buffer));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_preserves_input_order() {
        let frame = Frame::new(vec![
            Buffer::from_bytes(&[1]),
            Buffer::from_bytes(&[2]),
            Buffer::from_bytes(&[3]),
        ]);
        let out = frame.dispatch(|b| {
            let tag = b.current_data()[0];
            vec![Dispatched {
                buffer: b,
                next_hop: if tag % 2 == 0 { NextHop::LookupV6 } else { NextHop::Drop },
            }]
        });
        let tags: Vec<u8> = out.iter().map(|d| d.buffer.current_data()[0]).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }
}
