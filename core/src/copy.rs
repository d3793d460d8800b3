//! Moving items between caller memory and the ring
//!
//! A multi-item copy either steps through the caller's memory item by item
//! ([`CopyMode::Incrementing`]), or uses the same address for every item
//! ([`CopyMode::Constant`]). The latter is what a hardware FIFO register
//! needs, so constant-address accesses are volatile.

use core::ptr::{self, NonNull};

/// How the caller side address moves during a multi-item copy
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt_0_3", derive(defmt::Format))]
pub enum CopyMode {
    /// Item `k` lives `k * item_size` bytes after the start of the caller's memory
    #[default]
    Incrementing,

    /// Every item is read from (or written to) the same caller address
    Constant,
}

impl CopyMode {
    /// How many of `n` items a caller slice of `len` bytes can supply or receive
    pub(crate) fn clamp(self, len: usize, item_size: u16, n: u16) -> u16 {
        let item_size = item_size as usize;
        match self {
            CopyMode::Incrementing => {
                let fit = len / item_size;
                if fit < n as usize {
                    fit as u16
                } else {
                    n
                }
            }
            CopyMode::Constant if len >= item_size => n,
            CopyMode::Constant => 0,
        }
    }
}

/// The byte region behind a configured FIFO
#[derive(Clone, Copy)]
pub(crate) struct Ring {
    pub(crate) base: NonNull<u8>,
    pub(crate) depth: u16,
    pub(crate) item_size: u16,
}

impl Ring {
    /// Pointer to the first byte of physical slot `slot`
    #[inline(always)]
    pub(crate) fn slot_ptr(&self, slot: u16) -> *mut u8 {
        debug_assert!(slot < self.depth);
        // SAFETY: `slot < depth`, and the region holds `depth * item_size` bytes
        unsafe {
            self.base
                .as_ptr()
                .add(slot as usize * self.item_size as usize)
        }
    }

    /// Split `n` items starting at `slot` into the run before the physical end
    /// of the ring and the run that wraps around to slot 0
    #[inline(always)]
    fn split(&self, slot: u16, n: u16) -> (u16, u16) {
        let lin = n.min(self.depth - slot);
        (lin, n - lin)
    }

    /// Copy `n` items from `src` into the ring, starting at `slot`
    ///
    /// # Safety
    ///
    /// `src` must be readable for `n * item_size` bytes in incrementing mode,
    /// or `item_size` bytes in constant mode, and must not overlap the ring.
    /// `n` must not exceed `depth`, and the caller must own the target slots.
    pub(crate) unsafe fn push(&self, slot: u16, src: *const u8, n: u16, mode: CopyMode) {
        let isz = self.item_size as usize;
        let (lin, wrap) = self.split(slot, n);

        match mode {
            CopyMode::Incrementing => {
                ptr::copy_nonoverlapping(src, self.slot_ptr(slot), lin as usize * isz);
                ptr::copy_nonoverlapping(
                    src.add(lin as usize * isz),
                    self.base.as_ptr(),
                    wrap as usize * isz,
                );
            }
            CopyMode::Constant => {
                for i in 0..n {
                    let dst = self.slot_ptr((slot + i) % self.depth);
                    for b in 0..isz {
                        dst.add(b).write(src.add(b).read_volatile());
                    }
                }
            }
        }
    }

    /// Copy `n` items out of the ring, starting at `slot`, into `dst`
    ///
    /// # Safety
    ///
    /// `dst` must be writable for `n * item_size` bytes in incrementing mode,
    /// or `item_size` bytes in constant mode, and must not overlap the ring.
    /// `n` must not exceed `depth`, and the source slots must hold items.
    pub(crate) unsafe fn pull(&self, slot: u16, dst: *mut u8, n: u16, mode: CopyMode) {
        let isz = self.item_size as usize;
        let (lin, wrap) = self.split(slot, n);

        match mode {
            CopyMode::Incrementing => {
                ptr::copy_nonoverlapping(self.slot_ptr(slot), dst, lin as usize * isz);
                ptr::copy_nonoverlapping(
                    self.base.as_ptr(),
                    dst.add(lin as usize * isz),
                    wrap as usize * isz,
                );
            }
            CopyMode::Constant => {
                for i in 0..n {
                    let src = self.slot_ptr((slot + i) % self.depth);
                    for b in 0..isz {
                        dst.add(b).write_volatile(src.add(b).read());
                    }
                }
            }
        }
    }
}
