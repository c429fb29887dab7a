// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::cmp;

use crate::{Permissions, PhysicalAddress, VirtualAddress};

/// A contiguous mapped region of an address space.
#[derive(Debug)]
pub struct Region {
    /// First byte of the mapped interval.
    pub start: VirtualAddress,
    /// First byte past the mapped interval.
    pub end: VirtualAddress,
    /// Physical address backing this region. Stored, never interpreted.
    pub phys: PhysicalAddress,
    /// Access permissions of this region. Stored, never interpreted.
    pub permissions: Permissions,
    /// Free space between the previous region (or the bottom of the address
    /// space) and `start`. Maintained by the map as neighbors come and go.
    pub(crate) gap: usize,
}

impl Region {
    pub(crate) fn new(
        start: VirtualAddress,
        end: VirtualAddress,
        permissions: Permissions,
        phys: PhysicalAddress,
    ) -> Self {
        debug_assert!(start < end);
        Self {
            start,
            end,
            phys,
            permissions,
            gap: 0,
        }
    }

    /// Returns the size of this region in bytes.
    ///
    /// # Panics
    ///
    /// Panics if the region's bounds are inverted, which cannot happen for a
    /// region handed out by the map.
    #[must_use]
    pub fn size(&self) -> usize {
        self.end
            .checked_sub_addr(self.start)
            .expect("region end precedes its start")
    }

    /// Returns `true` if `addr` falls inside this region.
    #[must_use]
    pub fn contains(&self, addr: VirtualAddress) -> bool {
        self.start <= addr && addr < self.end
    }

    /// Returns the free space immediately below this region.
    #[must_use]
    pub fn gap(&self) -> usize {
        self.gap
    }
}

impl rbtree::Entry for Region {
    type Key = VirtualAddress;
    /// The largest gap anywhere in the subtree below (and including) this
    /// region; lets the unmapped-area search skip subtrees that cannot help.
    type Aggregate = usize;

    fn key(&self) -> &VirtualAddress {
        &self.start
    }

    fn aggregate(&self, left: Option<usize>, right: Option<usize>) -> usize {
        let mut max_gap = self.gap;
        if let Some(left) = left {
            max_gap = cmp::max(max_gap, left);
        }
        if let Some(right) = right {
            max_gap = cmp::max(max_gap, right);
        }
        max_gap
    }
}
