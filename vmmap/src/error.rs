// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::fmt;

/// Errors returned by the allocation paths of
/// [`AddressSpaceMap`](crate::AddressSpaceMap).
///
/// All of these are recoverable and leave the map unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A mapping was requested with a size of zero.
    ZeroSize,
    /// An address computation would exceed the representable address range.
    Overflow,
    /// No gap in the address space, including the trailing gap, is large
    /// enough for the request.
    OutOfSpace,
    /// The given address does not fall inside any mapped region.
    NotFound,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ZeroSize => f.write_str("mapping size must be non-zero"),
            Error::Overflow => {
                f.write_str("address computation would exceed the representable range")
            }
            Error::OutOfSpace => f.write_str("no gap in the address space is large enough"),
            Error::NotFound => f.write_str("address does not fall inside any mapped region"),
        }
    }
}

impl core::error::Error for Error {}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error:expr, $msg:expr) => {
        if !$cond {
            tracing::error!($msg);
            return Err($error);
        }
    };
    ($cond:expr, $error:expr) => {
        if !$cond {
            return Err($error);
        }
    };
}
