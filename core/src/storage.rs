//! Caller owned item storage
//!
//! A [`Fifo`](crate::Fifo) never allocates. The bytes it stores items in are
//! handed to it by the caller, and stay borrowed for the lifetime of the FIFO.

use const_init::ConstInit;
use core::{cell::UnsafeCell, mem::MaybeUninit, ptr::NonNull};

/// A region of bytes that can back a FIFO
///
/// # Safety
///
/// `ptr_len` must return a pointer valid for reads and writes of `len` bytes
/// for as long as the implementing value's lifetime, and no other live
/// reference may access those bytes while the FIFO uses them.
pub unsafe trait Storage {
    /// Give up the region as a base pointer and a length in bytes
    fn ptr_len(self) -> (NonNull<u8>, usize);
}

unsafe impl<'a> Storage for &'a mut [u8] {
    fn ptr_len(self) -> (NonNull<u8>, usize) {
        let len = self.len();
        (NonNull::from(self).cast::<u8>(), len)
    }
}

unsafe impl<'a, const N: usize> Storage for &'a mut [u8; N] {
    fn ptr_len(self) -> (NonNull<u8>, usize) {
        (NonNull::from(self).cast::<u8>(), N)
    }
}

unsafe impl<'a> Storage for &'a mut [MaybeUninit<u8>] {
    fn ptr_len(self) -> (NonNull<u8>, usize) {
        let len = self.len();
        // SAFETY: the FIFO zeroes the region before handing any of it out
        (NonNull::from(self).cast::<u8>(), len)
    }
}

unsafe impl<'a, const N: usize> Storage for &'a mut Inline<N> {
    fn ptr_len(self) -> (NonNull<u8>, usize) {
        (self.as_non_null(), N)
    }
}

/// Inline, const-initialised storage of `N` bytes
///
/// Suitable for placing in a `static`, see [`Fifo::new_static`](crate::Fifo::new_static).
/// The bytes start zeroed, so a static `Inline` lands in `.bss`.
pub struct Inline<const N: usize> {
    buf: UnsafeCell<[u8; N]>,
}

// The bytes are only ever reached through the single FIFO the storage is given to
unsafe impl<const N: usize> Sync for Inline<N> {}

impl<const N: usize> Inline<N> {
    /// Create a new, zeroed storage region
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0u8; N]),
        }
    }

    /// Size of the region in bytes
    pub const fn len(&self) -> usize {
        N
    }

    /// Is the region zero sized?
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    pub(crate) const fn as_non_null(&self) -> NonNull<u8> {
        let ptr: *mut [u8; N] = self.buf.get();
        // SAFETY: UnsafeCell is repr transparent, and `get` never returns null
        unsafe { NonNull::new_unchecked(ptr.cast::<u8>()) }
    }
}

impl<const N: usize> Default for Inline<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ConstInit for Inline<N> {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self::new();
}
