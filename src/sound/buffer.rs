// buffer.rs - Output double buffer

//! Double-buffer allocator for decoded samples.
//!
//! The decoder owns two caller-supplied buffers of equal length. Before it
//! writes samples it takes the buffer that is *not* active, marks it active,
//! fills it, and only then hands it to the sample sink. The other buffer is
//! left alone for whoever is still consuming the previous block.

use super::decoder::{DecodeError, DecodeResult, MIN_BUFFER_SIZE};

/// Identifies one of the two output buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    A,
    B,
}

impl BufferSlot {
    /// The other slot
    pub fn other(self) -> Self {
        match self {
            BufferSlot::A => BufferSlot::B,
            BufferSlot::B => BufferSlot::A,
        }
    }

    fn index(self) -> usize {
        match self {
            BufferSlot::A => 0,
            BufferSlot::B => 1,
        }
    }
}

/// Two fixed buffers with an active marker
#[derive(Debug)]
pub struct DoubleBuffer<'a> {
    slots: [&'a mut [u8]; 2],
    /// Most recently designated buffer, `None` until samples first flow
    active: Option<BufferSlot>,
}

impl<'a> DoubleBuffer<'a> {
    /// Wrap two caller-owned buffers
    ///
    /// Both buffers must be the same length and at least
    /// [`MIN_BUFFER_SIZE`] bytes.
    pub fn new(a: &'a mut [u8], b: &'a mut [u8]) -> DecodeResult<Self> {
        if a.len() != b.len() {
            return Err(DecodeError::BufferSizeMismatch {
                a: a.len(),
                b: b.len(),
            });
        }
        if a.len() < MIN_BUFFER_SIZE {
            return Err(DecodeError::BufferTooSmall {
                size: a.len(),
                min: MIN_BUFFER_SIZE,
            });
        }
        Ok(Self {
            slots: [a, b],
            active: None,
        })
    }

    /// Capacity of each buffer in bytes
    pub fn capacity(&self) -> usize {
        self.slots[0].len()
    }

    /// The active slot, if samples have been produced yet
    pub fn active_slot(&self) -> Option<BufferSlot> {
        self.active
    }

    /// The slot that is safe to fill next
    pub fn free_slot(&self) -> BufferSlot {
        match self.active {
            Some(slot) => slot.other(),
            None => BufferSlot::A,
        }
    }

    /// Contents of the active buffer
    pub fn current(&self) -> Option<&[u8]> {
        self.active.map(|slot| &*self.slots[slot.index()])
    }

    /// Contents of the free buffer
    pub fn free(&self) -> &[u8] {
        &self.slots[self.free_slot().index()]
    }

    /// Designate the free buffer as active and return it for writing
    pub fn acquire(&mut self) -> (BufferSlot, &mut [u8]) {
        let slot = self.free_slot();
        self.active = Some(slot);
        (slot, &mut *self.slots[slot.index()])
    }

    pub(crate) fn as_ptr(&self, slot: BufferSlot) -> *const u8 {
        self.slots[slot.index()].as_ptr()
    }
}
