//! # umfifo
//!
//! umfifo is a fixed-depth, lockless, no_std circular FIFO of fixed-size items,
//! built around *unmasked* read and write indices.
//!
//! It is designed (primarily) to move data between an interrupt handler (or a
//! DMA engine) and application code on embedded systems.
//!
//! Both indices count over twice the depth of the FIFO. The difference between
//! them is therefore enough to tell a full FIFO from an empty one: no slot is
//! lost, no shared `count` field is needed, and the depth does not have to be a
//! power of two. The writer only ever stores to the write index and the reader
//! only ever stores to the read index, so once a [`Fifo`] is split into a
//! [`Writer`] and a [`Reader`], one producer context and one consumer context
//! may use it concurrently without a lock.
//!
//! ## Local usage
//!
//! ```rust
//! use umfifo::Fifo;
//!
//! // Four items of one byte each
//! let mut buf = [0u8; 4];
//! let mut fifo: Fifo<'_> = Fifo::new();
//! fifo.configure(Some(&mut buf[..]), 4, 1, false).unwrap();
//!
//! assert_eq!(fifo.write_n(&[1, 2, 3, 4], 4), 4);
//! assert!(fifo.full());
//!
//! // Not overwritable, so the fifth item is rejected
//! assert!(fifo.write(&[5]).is_err());
//!
//! let mut out = [0u8; 1];
//! fifo.read(&mut out).unwrap();
//! assert_eq!(out, [1]);
//! assert_eq!(fifo.count(), 3);
//! ```
//!
//! ## Static usage
//!
//! ```rust
//! use umfifo::{Fifo, Inline};
//!
//! static BUF: Inline<16> = Inline::new();
//! // SAFETY: BUF is handed to exactly one FIFO
//! static mut FIFO: Fifo<'static> = unsafe { Fifo::new_static(&BUF, 8, 2, false) };
//!
//! // SAFETY: taken once, at start-up
//! let fifo = unsafe { &mut *core::ptr::addr_of_mut!(FIFO) };
//! let (mut tx, mut rx) = fifo.split().unwrap();
//!
//! // `tx` goes to the interrupt handler, `rx` to the main loop
//! tx.write(&[0xAA, 0x55]).unwrap();
//!
//! let mut out = [0u8; 2];
//! rx.read(&mut out).unwrap();
//! assert_eq!(out, [0xAA, 0x55]);
//! ```
//!
//! ## DMA usage
//!
//! See the [`linear`] module: [`Fifo::get_linear_read_info`] and
//! [`Fifo::get_linear_write_info`] hand out contiguous spans, and the unsafe
//! pointer moves tell the FIFO what the DMA engine did afterwards.
//!
//! ## Locking
//!
//! If more than one context may use the *same* side of a FIFO (two writers
//! under an RTOS, for example), or the FIFO is overwritable, attach a
//! [`SyncLock`] with [`Fifo::with_lock`] or [`Fifo::new_static_with_lock`].
//! Such a FIFO is `Sync` and can be shared as is. The default [`NoLock`] is
//! zero sized and compiles away entirely, but a FIFO that uses it is only
//! shared through its split halves.
//!
//! ## Feature flags
//!
//! * `std`: implements [`Lock`] for `std::sync::Mutex<()>`
//! * `critical-section`: provides [`lock::CsLock`]
//! * `thumbv6`: provides [`lock::CmLock`], built on `cortex-m` interrupt masking
//! * `defmt_0_3`: `defmt::Format` for public types, and `defmt` logging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod copy;
mod fifo;
mod index;
pub mod linear;
pub mod lock;
pub mod storage;
mod split;
mod transfer;

pub use copy::CopyMode;
pub use fifo::Fifo;
pub use index::MAX_DEPTH;
pub use linear::LinearSpan;
pub use lock::{Lock, NoLock, SyncLock};
pub use split::{Reader, Writer};
pub use storage::{Inline, Storage};

/// Re-export of external types/traits
///
pub mod export {
    pub use const_init::ConstInit;
}

use core::{fmt as core_fmt, result::Result as CoreResult};

/// Result type used by the `umfifo` interfaces
pub type Result<T> = CoreResult<T, Error>;

/// Error type used by the `umfifo` interfaces
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
#[cfg_attr(feature = "defmt_0_3", derive(defmt::Format))]
pub enum Error {
    /// The buffer, depth or item size given to `configure` is unusable
    InvalidConfig,

    /// The FIFO has not been configured yet
    Unconfigured,

    /// The FIFO is full and not overwritable
    Full,

    /// The FIFO holds no items
    Empty,

    /// The requested offset is at or past the number of stored items
    OutOfRange,

    /// The caller's slice is shorter than one item
    BufferTooSmall,

    /// An overwritable FIFO cannot be split, its writer needs a lock
    Overwritable,
}

impl core_fmt::Display for Error {
    fn fmt(&self, f: &mut core_fmt::Formatter<'_>) -> core_fmt::Result {
        let msg = match self {
            Error::InvalidConfig => "invalid fifo configuration",
            Error::Unconfigured => "fifo is not configured",
            Error::Full => "fifo is full",
            Error::Empty => "fifo is empty",
            Error::OutOfRange => "offset is out of range",
            Error::BufferTooSmall => "buffer is smaller than one item",
            Error::Overwritable => "overwritable fifo cannot be split",
        };
        f.write_str(msg)
    }
}

impl core::error::Error for Error {}
