//! Unmasked index arithmetic
//!
//! Read and write positions are kept in "double space": each index counts over
//! `[0, 2 * depth)` instead of `[0, depth)`. Folding an index with `% depth`
//! gives the physical slot, while the distance between the two indices
//! (modulo `2 * depth`) gives the number of stored items. Because the distance
//! can reach `depth` without wrapping to zero, full and empty never look alike.
//!
//! The indices are plain `u16`s. The part of the `u16` range above
//! `wrap_limit` is never used; when an addition or subtraction lands there (or
//! wraps the `u16` itself), skipping over that unused headroom puts the index
//! back where modular arithmetic over `2 * depth` says it belongs.

/// The largest depth a FIFO may have, so that `2 * depth - 1` still fits in a `u16`.
pub const MAX_DEPTH: u16 = 0x8000;

/// Index model for one FIFO instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Indexer {
    /// Item capacity
    depth: u16,

    /// Largest value either index may hold: `2 * depth - 1`
    wrap_limit: u16,

    /// `u16::MAX - wrap_limit`, the index space that is never used
    headroom: u16,
}

impl Indexer {
    /// The index model of a FIFO that has not been configured
    pub(crate) const UNCONFIGURED: Self = Self {
        depth: 0,
        wrap_limit: 0,
        headroom: u16::MAX,
    };

    pub(crate) const fn new(depth: u16) -> Option<Self> {
        if depth == 0 || depth > MAX_DEPTH {
            return None;
        }
        let wrap_limit = (2 * depth as u32 - 1) as u16;
        Some(Self {
            depth,
            wrap_limit,
            headroom: u16::MAX - wrap_limit,
        })
    }

    #[inline(always)]
    pub(crate) const fn depth(&self) -> u16 {
        self.depth
    }

    #[inline(always)]
    pub(crate) const fn is_configured(&self) -> bool {
        self.depth != 0
    }

    /// Reduce a step to less than `2 * depth`, so a single fold is enough
    #[inline(always)]
    fn reduce(&self, n: u16) -> u16 {
        (n as u32 % (2 * self.depth as u32)) as u16
    }

    /// Move `idx` forward by `n` positions
    pub(crate) fn advance(&self, idx: u16, n: u16) -> u16 {
        if !self.is_configured() {
            return idx;
        }
        let n = self.reduce(n);
        let next = idx.wrapping_add(n);

        // Either the u16 wrapped, or we landed in the unused space. Both cases
        // fold back by exactly `2 * depth` once the headroom is skipped.
        if (next < idx) || (next > self.wrap_limit) {
            next.wrapping_add(self.headroom)
        } else {
            next
        }
    }

    /// Move `idx` backward by `n` positions
    pub(crate) fn backward(&self, idx: u16, n: u16) -> u16 {
        if !self.is_configured() {
            return idx;
        }
        let n = self.reduce(n);
        let prev = idx.wrapping_sub(n);

        if (prev > idx) || (prev > self.wrap_limit) {
            prev.wrapping_sub(self.headroom)
        } else {
            prev
        }
    }

    /// Raw distance from `rd` to `wr`, in `[0, 2 * depth)`
    ///
    /// This exceeds `depth` only if the write index was moved past the reader
    /// by something other than the write path, e.g. a DMA engine.
    pub(crate) fn distance(&self, wr: u16, rd: u16) -> u16 {
        let cnt = wr.wrapping_sub(rd);
        if rd > wr {
            cnt.wrapping_sub(self.headroom)
        } else {
            cnt
        }
    }

    /// Number of stored items, never more than `depth`
    pub(crate) fn count(&self, wr: u16, rd: u16) -> u16 {
        self.distance(wr, rd).min(self.depth)
    }

    /// Number of free slots
    pub(crate) fn remaining(&self, wr: u16, rd: u16) -> u16 {
        self.depth - self.count(wr, rd)
    }

    /// Physical slot of a double space index
    #[inline(always)]
    pub(crate) fn slot(&self, idx: u16) -> u16 {
        if self.is_configured() {
            idx % self.depth
        } else {
            0
        }
    }
}
