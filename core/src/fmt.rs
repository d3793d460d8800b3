//! Logging shims
//!
//! Forward to `defmt` when the `defmt_0_3` feature is enabled, and compile to
//! nothing otherwise. Arguments are still borrowed in the disabled case so that
//! they do not trigger unused variable warnings.

#![macro_use]
#![allow(unused_macros)]

macro_rules! trace {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt_0_3")]
            ::defmt::trace!($s $(, $x)*);
            #[cfg(not(feature = "defmt_0_3"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! debug {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt_0_3")]
            ::defmt::debug!($s $(, $x)*);
            #[cfg(not(feature = "defmt_0_3"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt_0_3")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(feature = "defmt_0_3"))]
            let _ = ($( & $x ),*);
        }
    };
}
