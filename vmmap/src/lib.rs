// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! # Virtual address space map.
//!
//! This crate tracks which sub-ranges of a bounded linear address space are
//! occupied and finds free ranges large enough to satisfy new allocation
//! requests, honoring an optional placement hint.
//!
//! Mapped regions live in an address-ordered [red-black tree](rbtree)
//! augmented with free-space information: every region carries the size of
//! the gap immediately below it, and every tree node caches the largest gap
//! anywhere in its subtree. [`AddressSpaceMap::map`] uses the cached maxima
//! to prune its search for an unmapped area, so "find me N bytes at or above
//! address H" completes in logarithmic time instead of scanning every
//! mapping.
//!
//! The map stores an opaque [`PhysicalAddress`] and a [`Permissions`] mask
//! with each region but never interprets either; translating mappings into
//! page tables (or anything else) is the caller's business. A single
//! [`AddressSpaceMap`] is exclusively owned and provides no internal
//! synchronization.

#![cfg_attr(not(test), no_std)]

mod address;
mod address_space;
mod error;
mod region;

use core::fmt;

pub use address::{PhysicalAddress, VirtualAddress};
pub use address_space::AddressSpaceMap;
pub use error::Error;
pub use region::Region;

bitflags::bitflags! {
    /// Access permissions of a mapped region.
    ///
    /// Stored and returned with each region; the map itself never branches
    /// on them.
    #[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
    pub struct Permissions: u8 {
        /// Allow reads from the memory region
        const READ = 1 << 0;
        /// Allow writes to the memory region
        const WRITE = 1 << 1;
        /// Allow code execution from the memory region
        const EXECUTE = 1 << 2;
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}
