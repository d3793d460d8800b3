//! Optional mutual exclusion
//!
//! A single writer and a single reader never need a lock: split the FIFO
//! into a [`Writer`](crate::Writer) and a [`Reader`](crate::Reader) and hand
//! one to each context. A lock is required to share the [`Fifo`](crate::Fifo)
//! itself, e.g. between two RTOS tasks that both write, or between an
//! overwriting writer and a reader. Such a lock must be a [`SyncLock`].
//!
//! Which lock a FIFO uses is chosen by its type parameter, so the lock-free
//! configuration costs nothing at runtime: [`NoLock`] is zero sized and its
//! [`Lock::with`] is just a call.
//!
//! The lock itself is constructed by the caller and attached with
//! [`Fifo::with_lock`](crate::Fifo::with_lock). Anything that can run a closure
//! while excluding the other contexts can implement [`Lock`] and [`SyncLock`],
//! for example a wrapper around an RTOS mutex handle.

use const_init::ConstInit;

/// Scoped mutual exclusion
///
/// Every index-mutating FIFO operation runs inside `with`, except for the
/// unchecked DMA pointer moves. Implementations must release the lock when the
/// closure returns, whichever way it returns.
pub trait Lock {
    /// Run `f` while holding the lock
    fn with<R>(&self, f: impl FnOnce() -> R) -> R;
}

/// A [`Lock`] under which no two FIFO operations can run at the same time
///
/// Only a FIFO with such a lock is `Sync`.
///
/// # Safety
///
/// While one call to [`Lock::with`] runs its closure, no other call on the
/// same lock may run its closure, from any thread or interrupt priority that
/// can reach the FIFO. Nested calls on one context may be allowed.
pub unsafe trait SyncLock: Lock {}

/// No locking at all
///
/// For single-threaded targets, or for one writer plus one reader.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoLock;

impl Lock for NoLock {
    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        f()
    }
}

impl ConstInit for NoLock {
    const INIT: Self = NoLock;
}

/// Locking built on the `critical-section` crate
///
/// The critical section is only held for the duration of one FIFO operation.
#[cfg(feature = "critical-section")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CsLock;

#[cfg(feature = "critical-section")]
impl Lock for CsLock {
    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_cs| f())
    }
}

// A critical section excludes every other context on the system
#[cfg(feature = "critical-section")]
unsafe impl SyncLock for CsLock {}

#[cfg(feature = "critical-section")]
impl ConstInit for CsLock {
    const INIT: Self = CsLock;
}

/// Locking that masks interrupts on Cortex-M
///
/// This is provided for `thumbv6` targets, which have no CAS atomics.
#[cfg(feature = "thumbv6")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CmLock;

#[cfg(feature = "thumbv6")]
impl Lock for CmLock {
    #[inline(always)]
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        cortex_m::interrupt::free(|_| f())
    }
}

// thumbv6 parts are single core, so masking interrupts excludes everything
#[cfg(feature = "thumbv6")]
unsafe impl SyncLock for CmLock {}

#[cfg(feature = "thumbv6")]
impl ConstInit for CmLock {
    const INIT: Self = CmLock;
}

/// A poisoned mutex still protects the indices, so poisoning is ignored
#[cfg(feature = "std")]
impl Lock for std::sync::Mutex<()> {
    fn with<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f()
    }
}

#[cfg(feature = "std")]
unsafe impl SyncLock for std::sync::Mutex<()> {}

#[cfg(test)]
mod test {
    use super::{Lock, NoLock};
    use core::cell::Cell;

    /// Counts acquisitions and checks they never nest
    pub(crate) struct CountingLock {
        pub(crate) taken: Cell<u32>,
        held: Cell<bool>,
    }

    impl CountingLock {
        pub(crate) const fn new() -> Self {
            Self {
                taken: Cell::new(0),
                held: Cell::new(false),
            }
        }
    }

    impl Lock for CountingLock {
        fn with<R>(&self, f: impl FnOnce() -> R) -> R {
            assert!(!self.held.replace(true), "lock taken twice");
            self.taken.set(self.taken.get() + 1);
            let res = f();
            self.held.set(false);
            res
        }
    }

    #[test]
    fn nolock_is_free() {
        assert_eq!(core::mem::size_of::<NoLock>(), 0);
        assert_eq!(NoLock.with(|| 7), 7);
    }

    #[test]
    fn counting_lock_counts() {
        let lock = CountingLock::new();
        lock.with(|| ());
        lock.with(|| ());
        assert_eq!(lock.taken.get(), 2);
    }

    #[cfg(feature = "std")]
    #[test]
    fn mutex_survives_poison() {
        use std::sync::Mutex;

        let lock = Mutex::new(());
        let _ = std::panic::catch_unwind(|| {
            let _g = lock.lock().unwrap();
            panic!("poison it");
        });
        assert!(lock.is_poisoned());
        assert_eq!(lock.with(|| 3), 3);
    }
}

#[cfg(test)]
pub(crate) use test::CountingLock;
