//! Moving items from one FIFO straight into another
//!
//! The source is walked in at most two linear runs and each run goes through
//! the target's own write path, so the target applies its own capacity check
//! and overwrite policy. Items are relayed as raw bytes: both FIFOs must use
//! the same item size.
//!
//! Both locks are held for the whole transfer. They are always taken in
//! address order (the FIFO at the lower address first), so two transfers in
//! opposite directions between the same pair cannot deadlock.

use crate::{copy::CopyMode, fifo::Fifo, lock::Lock};
use core::{slice::from_raw_parts, sync::atomic::Ordering::Release};

impl<'a, L: Lock> Fifo<'a, L> {
    /// Copy up to `n` items, starting `offset` items after the oldest one, into
    /// `target`, without removing them here
    ///
    /// Returns the number of items the target accepted. That is 0 if the item
    /// sizes differ, if `target` is this FIFO, or if `offset` is at or past the
    /// number of stored items.
    ///
    /// Both locks are held for the duration, see the module docs.
    pub fn peek_n_into_other_fifo<L2: Lock>(
        &self,
        target: &Fifo<'_, L2>,
        offset: u16,
        n: u16,
    ) -> u16 {
        if !self.can_relay_to(target) {
            return 0;
        }
        self.with_both(target, || {
            let (rd, cnt) = self.effective_read();
            self.relay(target, rd, cnt, offset, n)
        })
    }

    /// Move up to `n` items, starting `offset` items after the oldest one, into
    /// `target`
    ///
    /// Returns the number of items the target accepted. If it accepted any, the
    /// read index here moves past the last of them, so the `offset` skipped
    /// items are consumed as well. If it accepted none, nothing changes here.
    ///
    /// Both locks are held for the duration, see the module docs.
    pub fn read_n_into_other_fifo<L2: Lock>(
        &self,
        target: &Fifo<'_, L2>,
        offset: u16,
        n: u16,
    ) -> u16 {
        if !self.can_relay_to(target) {
            return 0;
        }
        self.with_both(target, || {
            let (rd, cnt) = self.reconcile();
            let moved = self.relay(target, rd, cnt, offset, n);
            if moved != 0 {
                // `offset + moved <= cnt <= depth`, no overflow
                self.rd_idx.store(self.idx.advance(rd, offset + moved), Release);
            }
            moved
        })
    }

    /// Run `f` holding both locks, lower address first
    fn with_both<L2: Lock, R>(&self, target: &Fifo<'_, L2>, f: impl FnOnce() -> R) -> R {
        let this = self as *const Self as usize;
        let other = target as *const Fifo<'_, L2> as usize;
        if this < other {
            self.lock.with(|| target.lock.with(f))
        } else {
            target.lock.with(|| self.lock.with(f))
        }
    }

    fn can_relay_to<L2: Lock>(&self, target: &Fifo<'_, L2>) -> bool {
        let same = core::ptr::eq(
            self as *const Self as *const u8,
            target as *const Fifo<'_, L2> as *const u8,
        );
        !same
            && self.idx.is_configured()
            && target.idx.is_configured()
            && self.item_size == target.item_size
    }

    /// Hand the `cnt - offset` items after `rd + offset` to `target`, one
    /// linear run at a time
    fn relay<L2: Lock>(&self, target: &Fifo<'_, L2>, rd: u16, cnt: u16, offset: u16, n: u16) -> u16 {
        if offset >= cnt {
            return 0;
        }
        let mut todo = n.min(cnt - offset);
        let mut skip = offset;
        let mut moved = 0;

        // At most two runs: up to the physical end, then from slot 0
        while todo != 0 {
            let span = self.linear_span(rd, cnt, skip, todo);
            if span.is_empty() {
                break;
            }
            // SAFETY: the span describes stored items, which no writer touches
            // while they are unread
            let bytes = unsafe { from_raw_parts(span.as_ptr(), span.byte_len()) };
            // The target's lock is already held
            let accepted = target.push_n_locked(bytes, span.len(), CopyMode::Incrementing);

            moved += accepted;
            if accepted < span.len() {
                // Target is full
                break;
            }
            todo -= span.len();
            skip += span.len();
        }
        moved
    }
}
