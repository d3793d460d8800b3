//! Lock-free writer and reader handles
//!
//! A [`Fifo`] without a [`SyncLock`](crate::SyncLock) is not `Sync`. To use it
//! from two contexts at once (an interrupt handler and the main loop, or two
//! threads), split it. The [`Writer`] can only append and the [`Reader`] can
//! only remove or look, so each side only ever stores to its own index.
//!
//! Overwriting writes move the read index, so an overwritable FIFO cannot be
//! split. Give it a real lock instead.

use crate::{fifo::Fifo, linear::LinearSpan, lock::NoLock, Error, Result};

impl<'a> Fifo<'a, NoLock> {
    /// Split the FIFO into its writing and reading halves
    ///
    /// Fails with [`Error::Unconfigured`] on an unconfigured FIFO, and with
    /// [`Error::Overwritable`] on an overwritable one. The FIFO stays borrowed
    /// while either half is alive, so its configuration cannot change under
    /// them.
    pub fn split(&mut self) -> Result<(Writer<'_>, Reader<'_>)> {
        if !self.idx.is_configured() {
            return Err(Error::Unconfigured);
        }
        if self.overwritable() {
            return Err(Error::Overwritable);
        }
        let fifo: &Fifo<'_> = self;
        Ok((Writer { fifo }, Reader { fifo }))
    }
}

/// The writing half of a split [`Fifo`]
pub struct Writer<'f> {
    fifo: &'f Fifo<'f, NoLock>,
}

// Through a Writer only the write index and the free slots are stored to
unsafe impl<'f> Send for Writer<'f> {}

impl<'f> Writer<'f> {
    /// Append one item, see [`Fifo::write`]
    pub fn write(&mut self, item: &[u8]) -> Result<()> {
        self.fifo.write(item)
    }

    /// Append up to `n` items, see [`Fifo::write_n`]
    pub fn write_n(&mut self, items: &[u8], n: u16) -> u16 {
        self.fifo.write_n(items, n)
    }

    /// Number of free slots
    pub fn remaining(&self) -> u16 {
        self.fifo.remaining()
    }

    /// Is the FIFO full?
    pub fn full(&self) -> bool {
        self.fifo.full()
    }

    /// Size of one item in bytes
    pub fn item_size(&self) -> u16 {
        self.fifo.item_size()
    }

    /// Longest contiguous run of free slots, see [`Fifo::get_linear_write_info`]
    pub fn get_linear_write_info(&mut self, offset: u16, n: u16) -> LinearSpan<'f> {
        self.fifo.get_linear_write_info(offset, n)
    }

    /// Commit `n` slots filled through a [`LinearSpan`]
    ///
    /// # Safety
    ///
    /// As [`Fifo::advance_write_pointer`].
    pub unsafe fn advance_write_pointer(&mut self, n: u16) {
        self.fifo.advance_write_pointer(n)
    }

    /// Take back the `n` newest items
    ///
    /// # Safety
    ///
    /// As [`Fifo::backward_write_pointer`]. The reader may already have seen
    /// those items.
    pub unsafe fn backward_write_pointer(&mut self, n: u16) {
        self.fifo.backward_write_pointer(n)
    }
}

/// The reading half of a split [`Fifo`]
pub struct Reader<'f> {
    fifo: &'f Fifo<'f, NoLock>,
}

// Through a Reader only the read index and the overflow flag are stored to
unsafe impl<'f> Send for Reader<'f> {}

impl<'f> Reader<'f> {
    /// Remove the oldest item, see [`Fifo::read`]
    pub fn read(&mut self, out: &mut [u8]) -> Result<()> {
        self.fifo.read(out)
    }

    /// Remove up to `n` of the oldest items, see [`Fifo::read_n`]
    pub fn read_n(&mut self, out: &mut [u8], n: u16) -> u16 {
        self.fifo.read_n(out, n)
    }

    /// Copy the oldest item without removing it
    pub fn peek(&self, out: &mut [u8]) -> Result<()> {
        self.fifo.peek(out)
    }

    /// Copy the item `offset` positions after the oldest one, see [`Fifo::peek_at`]
    pub fn peek_at(&self, offset: u16, out: &mut [u8]) -> Result<()> {
        self.fifo.peek_at(offset, out)
    }

    /// Copy up to `n` items without removing them, see [`Fifo::peek_at_n`]
    pub fn peek_at_n(&self, offset: u16, out: &mut [u8], n: u16) -> u16 {
        self.fifo.peek_at_n(offset, out, n)
    }

    /// Number of stored items
    pub fn count(&self) -> u16 {
        self.fifo.count()
    }

    /// Is the FIFO empty?
    pub fn empty(&self) -> bool {
        self.fifo.empty()
    }

    /// Size of one item in bytes
    pub fn item_size(&self) -> u16 {
        self.fifo.item_size()
    }

    /// Has unread data been lost? See [`Fifo::overflowed`]
    pub fn overflowed(&self) -> bool {
        self.fifo.overflowed()
    }

    /// See [`Fifo::correct_read_pointer`]
    pub fn correct_read_pointer(&mut self) {
        self.fifo.correct_read_pointer()
    }

    /// Longest contiguous run of stored items, see [`Fifo::get_linear_read_info`]
    pub fn get_linear_read_info(&mut self, offset: u16, n: u16) -> LinearSpan<'f> {
        self.fifo.get_linear_read_info(offset, n)
    }

    /// Release `n` items consumed through a [`LinearSpan`]
    ///
    /// # Safety
    ///
    /// As [`Fifo::advance_read_pointer`].
    pub unsafe fn advance_read_pointer(&mut self, n: u16) {
        self.fifo.advance_read_pointer(n)
    }

    /// Make the `n` most recently read items readable again
    ///
    /// # Safety
    ///
    /// As [`Fifo::backward_read_pointer`].
    pub unsafe fn backward_read_pointer(&mut self, n: u16) {
        self.fifo.backward_read_pointer(n)
    }
}
