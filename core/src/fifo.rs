//! The FIFO instance: configuration, queries, and the write, read and peek paths

use crate::{
    copy::{CopyMode, Ring},
    index::Indexer,
    lock::{Lock, NoLock, SyncLock},
    storage::{Inline, Storage},
    Error, Result,
};
use const_init::ConstInit;
use core::{
    marker::PhantomData,
    ptr::NonNull,
    sync::atomic::{
        AtomicBool, AtomicU16,
        Ordering::{Acquire, Relaxed, Release},
    },
};

/// A circular FIFO of fixed-size items over caller owned storage
///
/// Items are plain byte strings of `item_size` bytes. A FIFO holds up to
/// `depth` of them; it never allocates and never blocks.
///
/// All item operations take `&self`. One writer and one reader may use the
/// same FIFO from different contexts (an interrupt handler and a task, or two
/// interrupt priorities) at the same time without a lock, as long as neither
/// side is re-entered. If a side can be re-entered, use a real [`Lock`].
///
/// A `Fifo` is only `Sync`, and so only shareable between threads or placed
/// in a `static`, when its lock is a [`SyncLock`]. Every operation then runs
/// under that lock, overwriting writes included. Without a lock, a FIFO used
/// from two contexts at once must be [`split`](Fifo::split) into a
/// [`Writer`](crate::Writer) and a [`Reader`](crate::Reader) first.
///
/// ```rust,compile_fail
/// fn shared<T: Sync>(_: &T) {}
///
/// let fifo: umfifo::Fifo<'static> = umfifo::Fifo::new();
/// shared(&fifo);
/// ```
pub struct Fifo<'a, L = NoLock> {
    pub(crate) buf: NonNull<u8>,

    /// Depth and double space limits
    pub(crate) idx: Indexer,

    pub(crate) item_size: u16,

    /// Discard the oldest items instead of rejecting writes when full
    pub(crate) overwritable: AtomicBool,

    /// Where the next item will be written. Owned by the writer
    pub(crate) wr_idx: AtomicU16,

    /// Where the next item will be read from. Owned by the reader
    pub(crate) rd_idx: AtomicU16,

    /// Set when an overwriting write discarded unread items, cleared by
    /// `correct_read_pointer` and `clear`
    pub(crate) overflow: AtomicBool,

    /// Addressing of the source memory in `write_n`
    pub(crate) wr_mode: CopyMode,

    /// Addressing of the destination memory in `read_n` and `peek_at_n`
    pub(crate) rd_mode: CopyMode,

    pub(crate) lock: L,

    pd: PhantomData<&'a mut [u8]>,
}

// The indices are atomics, and the storage is only reached through them
unsafe impl<'a, L: Lock + Send> Send for Fifo<'a, L> {}

// Sharing is only sound if every operation is serialised by the lock
unsafe impl<'a, L: SyncLock + Sync> Sync for Fifo<'a, L> {}

impl<'a, L: Lock + ConstInit> Fifo<'a, L> {
    /// Create a new, unconfigured FIFO
    ///
    /// Until [`configure`](Self::configure) succeeds, the FIFO reads as empty
    /// and every write fails.
    pub const fn new() -> Self {
        Self::with_lock(L::INIT)
    }
}

impl<'a, L: Lock + ConstInit> Default for Fifo<'a, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: Lock + ConstInit> Fifo<'static, L> {
    /// Create a configured FIFO at compile time, for use in a `static`
    ///
    /// If `depth`, `item_size` or the size of `buf` are unusable (see
    /// [`configure`](Self::configure)) the FIFO is left unconfigured, exactly
    /// as [`new`](Self::new) would create it.
    ///
    /// A plain `static` needs a [`SyncLock`]. A lock-free FIFO can live in a
    /// `static mut` instead, and is split once at start-up:
    ///
    /// ```rust
    /// use umfifo::{Fifo, Inline};
    ///
    /// static BUF: Inline<64> = Inline::new();
    /// // SAFETY: nothing else uses BUF
    /// static mut FIFO: Fifo<'static> = unsafe { Fifo::new_static(&BUF, 16, 4, false) };
    ///
    /// // SAFETY: this is the only reference ever taken to FIFO
    /// let fifo = unsafe { &mut *core::ptr::addr_of_mut!(FIFO) };
    /// assert_eq!(fifo.depth(), 16);
    ///
    /// let (mut tx, mut rx) = fifo.split().unwrap();
    /// tx.write(&[1, 2, 3, 4]).unwrap();
    /// assert_eq!(rx.count(), 1);
    /// ```
    ///
    /// # Safety
    ///
    /// `buf` must not be given to any other FIFO, nor accessed in any other way,
    /// for as long as this FIFO is in use.
    pub const unsafe fn new_static<const N: usize>(
        buf: &'static Inline<N>,
        depth: u16,
        item_size: u16,
        overwritable: bool,
    ) -> Self {
        Self::new_static_with_lock(buf, depth, item_size, overwritable, L::INIT)
    }
}

impl<L: Lock> Fifo<'static, L> {
    /// Like [`new_static`](Self::new_static), with a lock built by the caller
    ///
    /// For locks that have no [`ConstInit`] value of their own, such as a
    /// `std::sync::Mutex<()>` or an RTOS mutex that needs a handle.
    ///
    /// # Safety
    ///
    /// As [`new_static`](Self::new_static).
    pub const unsafe fn new_static_with_lock<const N: usize>(
        buf: &'static Inline<N>,
        depth: u16,
        item_size: u16,
        overwritable: bool,
        lock: L,
    ) -> Self {
        let idx = match Indexer::new(depth) {
            Some(idx) if item_size != 0 && (depth as usize * item_size as usize) <= N => idx,
            _ => Indexer::UNCONFIGURED,
        };
        let item_size = if idx.is_configured() { item_size } else { 0 };

        Self {
            buf: buf.as_non_null(),
            idx,
            item_size,
            overwritable: AtomicBool::new(overwritable),
            wr_idx: AtomicU16::new(0),
            rd_idx: AtomicU16::new(0),
            overflow: AtomicBool::new(false),
            wr_mode: CopyMode::Incrementing,
            rd_mode: CopyMode::Incrementing,
            lock,
            pd: PhantomData,
        }
    }
}

impl<'a, L: Lock> Fifo<'a, L> {
    /// Create a new, unconfigured FIFO protected by an externally constructed lock
    pub const fn with_lock(lock: L) -> Self {
        Self {
            buf: NonNull::dangling(),
            idx: Indexer::UNCONFIGURED,
            item_size: 0,
            overwritable: AtomicBool::new(false),
            wr_idx: AtomicU16::new(0),
            rd_idx: AtomicU16::new(0),
            overflow: AtomicBool::new(false),
            wr_mode: CopyMode::Incrementing,
            rd_mode: CopyMode::Incrementing,
            lock,
            pd: PhantomData,
        }
    }

    /// (Re)configure the FIFO over `buffer`
    ///
    /// Holds `depth` items of `item_size` bytes each. Fails with
    /// [`Error::InvalidConfig`] if there is no buffer, if `depth` or
    /// `item_size` is zero, if `depth` exceeds [`MAX_DEPTH`](crate::MAX_DEPTH),
    /// or if the buffer is shorter than `depth * item_size` bytes. A failed call
    /// leaves the previous configuration in place.
    ///
    /// On success both indices are reset, the overflow flag is cleared, and the
    /// used part of the buffer is zeroed.
    pub fn configure<S: Storage + 'a>(
        &mut self,
        buffer: Option<S>,
        depth: u16,
        item_size: u16,
        overwritable: bool,
    ) -> Result<()> {
        let Some(buffer) = buffer else {
            warn!("configure: no buffer");
            return Err(Error::InvalidConfig);
        };
        let Some(idx) = Indexer::new(depth) else {
            warn!("configure: bad depth {=u16}", depth);
            return Err(Error::InvalidConfig);
        };
        if item_size == 0 {
            warn!("configure: zero item size");
            return Err(Error::InvalidConfig);
        }

        let (ptr, len) = buffer.ptr_len();
        let bytes = depth as usize * item_size as usize;
        if bytes > len {
            warn!("configure: buffer too short");
            return Err(Error::InvalidConfig);
        }

        // Explicitly zero the data, so that linear spans never hand out
        // uninitialised bytes
        unsafe {
            ptr.as_ptr().write_bytes(0u8, bytes);
        }

        self.buf = ptr;
        self.idx = idx;
        self.item_size = item_size;
        *self.overwritable.get_mut() = overwritable;
        *self.wr_idx.get_mut() = 0;
        *self.rd_idx.get_mut() = 0;
        *self.overflow.get_mut() = false;

        debug!("configured: depth {=u16} item size {=u16}", depth, item_size);
        Ok(())
    }

    /// Empty the FIFO
    ///
    /// Both indices return to zero and the overflow flag is cleared. The
    /// configuration and the stored bytes are untouched.
    pub fn clear(&self) {
        self.lock.with(|| {
            self.wr_idx.store(0, Release);
            self.rd_idx.store(0, Release);
            self.overflow.store(false, Release);
        })
    }

    /// Change the overwrite policy
    pub fn set_overwritable(&self, overwritable: bool) -> Result<()> {
        if !self.idx.is_configured() {
            return Err(Error::Unconfigured);
        }
        self.overwritable.store(overwritable, Relaxed);
        Ok(())
    }

    /// Is the FIFO overwritable?
    pub fn overwritable(&self) -> bool {
        self.overwritable.load(Relaxed)
    }

    /// Set how `write_n` steps through its source memory
    pub fn set_write_copy_mode(&mut self, mode: CopyMode) {
        self.wr_mode = mode;
    }

    /// Set how `read_n` and `peek_at_n` step through their destination memory
    pub fn set_read_copy_mode(&mut self, mode: CopyMode) {
        self.rd_mode = mode;
    }

    /// Addressing used by `write_n`
    pub fn write_copy_mode(&self) -> CopyMode {
        self.wr_mode
    }

    /// Addressing used by `read_n` and `peek_at_n`
    pub fn read_copy_mode(&self) -> CopyMode {
        self.rd_mode
    }

    /// Item capacity, zero while unconfigured
    pub fn depth(&self) -> u16 {
        self.idx.depth()
    }

    /// Size of one item in bytes, zero while unconfigured
    pub fn item_size(&self) -> u16 {
        self.item_size
    }

    /// Number of stored items
    ///
    /// Never more than `depth`, even if the write index was moved further
    /// ahead by [`advance_write_pointer`](Self::advance_write_pointer).
    pub fn count(&self) -> u16 {
        let (wr, rd) = self.indices();
        self.idx.count(wr, rd)
    }

    /// Is the FIFO empty?
    pub fn empty(&self) -> bool {
        self.count() == 0
    }

    /// Is the FIFO full? An unconfigured FIFO is never full
    pub fn full(&self) -> bool {
        self.idx.is_configured() && self.count() == self.idx.depth()
    }

    /// Number of free slots
    pub fn remaining(&self) -> u16 {
        let (wr, rd) = self.indices();
        self.idx.remaining(wr, rd)
    }

    /// Has unread data been lost?
    ///
    /// True after an overwriting write discarded unread items, or while the
    /// write index is more than `depth` items ahead of the read index (only
    /// possible through the unchecked pointer moves, e.g. after a DMA burst).
    /// Stays set until [`correct_read_pointer`](Self::correct_read_pointer) or
    /// [`clear`](Self::clear).
    pub fn overflowed(&self) -> bool {
        if !self.idx.is_configured() {
            return false;
        }
        let (wr, rd) = self.indices();
        self.overflow.load(Acquire) || self.idx.distance(wr, rd) > self.idx.depth()
    }

    /// Reconcile the read index after the write index was moved externally
    ///
    /// If the write index is more than `depth` items ahead, the read index is
    /// moved so that exactly the newest `depth` items remain. The overflow flag
    /// is cleared.
    pub fn correct_read_pointer(&self) {
        if !self.idx.is_configured() {
            return;
        }
        self.lock.with(|| {
            self.reconcile();
            self.overflow.store(false, Release);
        })
    }

    /// Raw write index, in `[0, 2 * depth)`
    pub fn write_index(&self) -> u16 {
        self.wr_idx.load(Acquire)
    }

    /// Raw read index, in `[0, 2 * depth)`
    pub fn read_index(&self) -> u16 {
        self.rd_idx.load(Acquire)
    }

    // Write path

    /// Append one item
    ///
    /// Only the first `item_size` bytes of `item` are used. If the FIFO is
    /// full and not overwritable this fails with [`Error::Full`] and nothing
    /// changes. If it is overwritable, the oldest item is discarded first and
    /// [`overflowed`](Self::overflowed) becomes true.
    pub fn write(&self, item: &[u8]) -> Result<()> {
        let isz = self.configured_item_size()?;
        if item.len() < isz as usize {
            return Err(Error::BufferTooSmall);
        }

        self.lock.with(|| {
            let wr = self.wr_idx.load(Acquire);
            let rd = self.rd_idx.load(Acquire);
            let depth = self.idx.depth();

            if self.idx.distance(wr, rd) >= depth {
                if !self.overwritable.load(Relaxed) {
                    return Err(Error::Full);
                }
                // Discard just enough to keep the newest `depth - 1` plus this one
                self.discard_before(self.idx.advance(wr, 1));
            }

            // SAFETY: the slot at `wr` is free, and `item` holds one item
            unsafe {
                self.ring()
                    .push(self.idx.slot(wr), item.as_ptr(), 1, CopyMode::Incrementing);
            }
            self.wr_idx.store(self.idx.advance(wr, 1), Release);
            Ok(())
        })
    }

    /// Append up to `n` items, returning how many were accepted
    ///
    /// In [`CopyMode::Incrementing`] item `k` is taken from
    /// `items[k * item_size..]`, and `n` is limited to what `items` holds. In
    /// [`CopyMode::Constant`] every item is (volatile) read from
    /// `items[..item_size]`.
    ///
    /// A FIFO that is not overwritable takes as many items as it has room for.
    /// An overwritable one takes all of them, discarding the oldest data as
    /// needed (only the last `depth` items survive if `n > depth`).
    pub fn write_n(&self, items: &[u8], n: u16) -> u16 {
        self.write_n_mode(items, n, self.wr_mode)
    }

    pub(crate) fn write_n_mode(&self, items: &[u8], n: u16, mode: CopyMode) -> u16 {
        let Ok(isz) = self.configured_item_size() else {
            return 0;
        };
        let n = mode.clamp(items.len(), isz, n);
        if n == 0 {
            return 0;
        }

        self.lock.with(|| self.push_n_locked(items, n, mode))
    }

    /// Body of `write_n`, with the lock already held
    ///
    /// `n` must already be clamped to what `items` holds, and be non-zero.
    pub(crate) fn push_n_locked(&self, items: &[u8], n: u16, mode: CopyMode) -> u16 {
        let isz = self.item_size;
        let wr = self.wr_idx.load(Acquire);
        let rd = self.rd_idx.load(Acquire);
        let depth = self.idx.depth();
        let used = self.idx.distance(wr, rd);

        if !self.overwritable.load(Relaxed) {
            let n = n.min(depth.saturating_sub(used));
            if n != 0 {
                // SAFETY: `n` free slots start at `wr`, `items` holds `n` items
                unsafe {
                    self.ring().push(self.idx.slot(wr), items.as_ptr(), n, mode);
                }
                self.wr_idx.store(self.idx.advance(wr, n), Release);
            }
            return n;
        }

        // Overwritable: only the newest `depth` items can survive
        let (src, kept) = match mode {
            CopyMode::Incrementing if n > depth => {
                // SAFETY: `items` holds `n` items, skipping `n - depth` stays in bounds
                let skip = (n - depth) as usize * isz as usize;
                (unsafe { items.as_ptr().add(skip) }, depth)
            }
            _ => (items.as_ptr(), n.min(depth)),
        };

        let new_wr = self.idx.advance(wr, kept);
        if used as u32 + n as u32 > depth as u32 {
            self.discard_before(new_wr);
        }

        // SAFETY: the read index now leaves `kept` slots free at `wr`
        unsafe {
            self.ring().push(self.idx.slot(wr), src, kept, mode);
        }
        self.wr_idx.store(new_wr, Release);
        n
    }

    /// Move the read index so that exactly `depth` items end at `new_wr`
    ///
    /// Only called with the lock held, by overwriting writes.
    fn discard_before(&self, new_wr: u16) {
        trace!("overwrite: discarding unread items");
        self.rd_idx
            .store(self.idx.backward(new_wr, self.idx.depth()), Release);
        self.overflow.store(true, Release);
    }

    // Read path

    /// Remove the oldest item into `out`
    ///
    /// Fails with [`Error::Empty`] if there is nothing to read, leaving `out`
    /// untouched.
    pub fn read(&self, out: &mut [u8]) -> Result<()> {
        let isz = self.configured_item_size()?;
        if out.len() < isz as usize {
            return Err(Error::BufferTooSmall);
        }

        self.lock.with(|| {
            let (rd, cnt) = self.reconcile();
            if cnt == 0 {
                return Err(Error::Empty);
            }

            // SAFETY: the slot at `rd` holds an item, `out` holds one item
            unsafe {
                self.ring()
                    .pull(self.idx.slot(rd), out.as_mut_ptr(), 1, CopyMode::Incrementing);
            }
            self.rd_idx.store(self.idx.advance(rd, 1), Release);
            Ok(())
        })
    }

    /// Remove up to `n` of the oldest items into `out`, returning how many
    ///
    /// Honours the read copy mode: in [`CopyMode::Constant`] every item is
    /// (volatile) written to `out[..item_size]`.
    pub fn read_n(&self, out: &mut [u8], n: u16) -> u16 {
        let Ok(isz) = self.configured_item_size() else {
            return 0;
        };
        let mode = self.rd_mode;
        let n = mode.clamp(out.len(), isz, n);
        if n == 0 {
            return 0;
        }

        self.lock.with(|| {
            let (rd, cnt) = self.reconcile();
            let n = n.min(cnt);
            if n != 0 {
                // SAFETY: `n` items start at `rd`, `out` has room for them
                unsafe {
                    self.ring().pull(self.idx.slot(rd), out.as_mut_ptr(), n, mode);
                }
                self.rd_idx.store(self.idx.advance(rd, n), Release);
            }
            n
        })
    }

    // Peek path

    /// Copy the oldest item into `out` without removing it
    pub fn peek(&self, out: &mut [u8]) -> Result<()> {
        self.peek_at(0, out)
    }

    /// Copy the item `offset` positions after the oldest one into `out`
    ///
    /// Fails with [`Error::Empty`] if the FIFO is empty, or
    /// [`Error::OutOfRange`] if `offset >= count()`. Never changes an index.
    pub fn peek_at(&self, offset: u16, out: &mut [u8]) -> Result<()> {
        let isz = self.configured_item_size()?;
        if out.len() < isz as usize {
            return Err(Error::BufferTooSmall);
        }

        self.lock.with(|| {
            let (rd, cnt) = self.effective_read();
            if cnt == 0 {
                return Err(Error::Empty);
            }
            if offset >= cnt {
                return Err(Error::OutOfRange);
            }

            let pos = self.idx.advance(rd, offset);
            // SAFETY: `pos` is before the write index, `out` holds one item
            unsafe {
                self.ring()
                    .pull(self.idx.slot(pos), out.as_mut_ptr(), 1, CopyMode::Incrementing);
            }
            Ok(())
        })
    }

    /// Copy up to `n` items, starting `offset` positions after the oldest one,
    /// into `out` without removing them. Returns how many were copied.
    pub fn peek_at_n(&self, offset: u16, out: &mut [u8], n: u16) -> u16 {
        let Ok(isz) = self.configured_item_size() else {
            return 0;
        };
        let mode = self.rd_mode;
        let n = mode.clamp(out.len(), isz, n);

        self.lock.with(|| {
            let (rd, cnt) = self.effective_read();
            if offset >= cnt {
                return 0;
            }
            let n = n.min(cnt - offset);
            if n != 0 {
                let pos = self.idx.advance(rd, offset);
                // SAFETY: `n` items start at `pos`, `out` has room for them
                unsafe {
                    self.ring().pull(self.idx.slot(pos), out.as_mut_ptr(), n, mode);
                }
            }
            n
        })
    }

    // Helpers

    #[inline(always)]
    pub(crate) fn indices(&self) -> (u16, u16) {
        (self.wr_idx.load(Acquire), self.rd_idx.load(Acquire))
    }

    #[inline(always)]
    pub(crate) fn ring(&self) -> Ring {
        Ring {
            base: self.buf,
            depth: self.idx.depth(),
            item_size: self.item_size,
        }
    }

    #[inline(always)]
    pub(crate) fn configured_item_size(&self) -> Result<u16> {
        if self.idx.is_configured() {
            Ok(self.item_size)
        } else {
            Err(Error::Unconfigured)
        }
    }

    /// Where reading effectively starts, and how many items are readable
    ///
    /// If the write index ran more than `depth` ahead, the oldest readable item
    /// is the one `depth` behind the write index. Nothing is stored.
    pub(crate) fn effective_read(&self) -> (u16, u16) {
        let (wr, rd) = self.indices();
        let depth = self.idx.depth();
        if self.idx.distance(wr, rd) > depth {
            (self.idx.backward(wr, depth), depth)
        } else {
            (rd, self.idx.distance(wr, rd))
        }
    }

    /// Like `effective_read`, but stores the corrected read index and raises
    /// the overflow flag if it had to move
    ///
    /// Only called with the lock held, by destructive reads.
    pub(crate) fn reconcile(&self) -> (u16, u16) {
        let (wr, rd) = self.indices();
        let (new_rd, cnt) = self.effective_read();
        if new_rd != rd {
            warn!("write index ran {=u16} items ahead, correcting", self.idx.distance(wr, rd));
            self.rd_idx.store(new_rd, Release);
            // The skipped items are lost, same as after an overwrite
            self.overflow.store(true, Release);
        }
        (new_rd, cnt)
    }
}

impl<'a, L> core::fmt::Debug for Fifo<'a, L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Fifo")
            .field("depth", &self.idx.depth())
            .field("item_size", &self.item_size)
            .field("overwritable", &self.overwritable.load(Relaxed))
            .field("wr_idx", &self.wr_idx.load(Relaxed))
            .field("rd_idx", &self.rd_idx.load(Relaxed))
            .field("wr_mode", &self.wr_mode)
            .field("rd_mode", &self.rd_mode)
            .finish()
    }
}
