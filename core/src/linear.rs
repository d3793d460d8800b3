//! Linear (DMA) access
//!
//! A DMA engine needs one start address and one length, so it cannot follow
//! the ring around its physical end. The `get_linear_*_info` functions hand out
//! the longest contiguous [`LinearSpan`] that starts at a given logical offset
//! and does not wrap. A range that straddles the end of the ring therefore
//! takes two transfers: after the first one, move the index past it with
//! [`Fifo::advance_read_pointer`] or [`Fifo::advance_write_pointer`] and ask
//! again.
//!
//! ```rust
//! use umfifo::Fifo;
//!
//! let mut buf = [0u8; 4];
//! let mut fifo: Fifo<'_> = Fifo::new();
//! fifo.configure(Some(&mut buf[..]), 4, 1, false).unwrap();
//!
//! fifo.write_n(&[0, 0, 0], 3);
//! fifo.read_n(&mut [0u8; 3], 3);
//!
//! // Three slots can be written, but only one before the end of the ring
//! let mut span = fifo.get_linear_write_info(0, 3);
//! assert_eq!(span.len(), 1);
//! unsafe { span.as_mut_slice() }.copy_from_slice(&[7]);
//! unsafe { fifo.advance_write_pointer(span.len()) };
//!
//! let mut span = fifo.get_linear_write_info(0, 2);
//! assert_eq!(span.len(), 2);
//! unsafe { span.as_mut_slice() }.copy_from_slice(&[8, 9]);
//! unsafe { fifo.advance_write_pointer(span.len()) };
//!
//! let mut out = [0u8; 3];
//! assert_eq!(fifo.read_n(&mut out, 3), 3);
//! assert_eq!(out, [7, 8, 9]);
//! ```

use crate::{fifo::Fifo, lock::Lock};
use core::{
    marker::PhantomData,
    ptr::NonNull,
    slice::{from_raw_parts, from_raw_parts_mut},
    sync::atomic::Ordering::{Acquire, Release},
};

/// A contiguous run of items inside a FIFO's storage
///
/// The span is only a description: the FIFO indices are not touched until
/// one of the pointer advance functions is called.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearSpan<'a> {
    ptr: NonNull<u8>,
    len: u16,
    item_size: u16,
    pd: PhantomData<&'a [u8]>,
}

impl<'a> LinearSpan<'a> {
    fn new(ptr: NonNull<u8>, len: u16, item_size: u16) -> Self {
        Self {
            ptr,
            len,
            item_size,
            pd: PhantomData,
        }
    }

    /// Address of the first byte, suitable for a DMA descriptor
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Number of items in the span
    pub fn len(&self) -> u16 {
        self.len
    }

    /// Is the span empty?
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes in the span
    pub fn byte_len(&self) -> usize {
        self.len as usize * self.item_size as usize
    }

    /// View the span as bytes
    ///
    /// # Safety
    ///
    /// The span must still describe stored items (no read or index move has
    /// released them since), and nothing may write to them while the returned
    /// slice is alive.
    pub unsafe fn as_slice(&self) -> &'a [u8] {
        from_raw_parts(self.ptr.as_ptr(), self.byte_len())
    }

    /// View the span as writable bytes
    ///
    /// # Safety
    ///
    /// The span must still describe free slots (no write or index move has
    /// claimed them since), and no other reference to them may exist while the
    /// returned slice is alive.
    pub unsafe fn as_mut_slice(&mut self) -> &'a mut [u8] {
        from_raw_parts_mut(self.ptr.as_ptr(), self.byte_len())
    }
}

impl<'a, L: Lock> Fifo<'a, L> {
    /// Longest contiguous run of stored items starting `offset` items after the
    /// oldest one, limited to `n` items
    ///
    /// The returned span never crosses the physical end of the storage. It is
    /// empty if `offset` is at or past the number of stored items.
    ///
    /// If the write index was moved more than `depth` items ahead, the read
    /// index is corrected first.
    pub fn get_linear_read_info(&self, offset: u16, n: u16) -> LinearSpan<'_> {
        if !self.idx.is_configured() {
            return LinearSpan::new(self.buf, 0, self.item_size);
        }
        self.lock.with(|| {
            let (rd, cnt) = self.reconcile();
            self.linear_span(rd, cnt, offset, n)
        })
    }

    /// Longest contiguous run of free slots starting `offset` slots after the
    /// write position, limited to `n` items
    ///
    /// The returned span never crosses the physical end of the storage. It is
    /// empty if `offset` is at or past the number of free slots.
    pub fn get_linear_write_info(&self, offset: u16, n: u16) -> LinearSpan<'_> {
        if !self.idx.is_configured() {
            return LinearSpan::new(self.buf, 0, self.item_size);
        }
        let (wr, rd) = self.indices();
        self.linear_span(wr, self.idx.remaining(wr, rd), offset, n)
    }

    /// Span of at most `n` of `avail` items that start `offset` after `start`
    pub(crate) fn linear_span(&self, start: u16, avail: u16, offset: u16, n: u16) -> LinearSpan<'_> {
        let slot = self.idx.slot(self.idx.advance(start, offset));
        let ptr = self.ring().slot_ptr(slot);
        // SAFETY: derived from the non-null storage base
        let ptr = unsafe { NonNull::new_unchecked(ptr) };

        let len = if offset >= avail {
            0
        } else {
            n.min(avail - offset).min(self.idx.depth() - slot)
        };
        LinearSpan::new(ptr, len, self.item_size)
    }

    /// Move the write index forward by `n` items, as if `n` items were written
    ///
    /// # Safety
    ///
    /// No bounds check, no overwrite policy, and no lock. The caller must make
    /// sure the `n` slots really were filled (e.g. by a DMA transfer into a
    /// span from [`get_linear_write_info`](Self::get_linear_write_info)), and
    /// that no other writer runs concurrently. Moving more than the free space
    /// is detected by [`overflowed`](Self::overflowed).
    pub unsafe fn advance_write_pointer(&self, n: u16) {
        let wr = self.wr_idx.load(Acquire);
        self.wr_idx.store(self.idx.advance(wr, n), Release);
    }

    /// Move the write index backward by `n` items, forgetting the newest ones
    ///
    /// # Safety
    ///
    /// As [`advance_write_pointer`](Self::advance_write_pointer). Moving back
    /// past the read index corrupts the item count.
    pub unsafe fn backward_write_pointer(&self, n: u16) {
        let wr = self.wr_idx.load(Acquire);
        self.wr_idx.store(self.idx.backward(wr, n), Release);
    }

    /// Move the read index forward by `n` items, as if `n` items were read
    ///
    /// # Safety
    ///
    /// No bounds check and no lock. The caller must make sure at least `n`
    /// items are stored, and that no other reader runs concurrently.
    pub unsafe fn advance_read_pointer(&self, n: u16) {
        let rd = self.rd_idx.load(Acquire);
        self.rd_idx.store(self.idx.advance(rd, n), Release);
    }

    /// Move the read index backward by `n` items, making them readable again
    ///
    /// # Safety
    ///
    /// As [`advance_read_pointer`](Self::advance_read_pointer). The caller must
    /// make sure the slots still hold the old items and that the writer has not
    /// reused them.
    pub unsafe fn backward_read_pointer(&self, n: u16) {
        let rd = self.rd_idx.load(Acquire);
        self.rd_idx.store(self.idx.backward(rd, n), Release);
    }
}
