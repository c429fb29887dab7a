// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use core::cmp;
use core::cmp::Ordering;

use rbtree::{Iter, NodeId, RbTree};

use crate::{Error, Permissions, PhysicalAddress, Region, VirtualAddress};

/// An address space map: an address-ordered set of disjoint mapped regions
/// over the closed interval `[base, end]`, with hint-guided first-fit
/// allocation of unmapped space.
pub struct AddressSpaceMap {
    /// A binary search tree of the regions that make up this address space,
    /// augmented with the largest free gap per subtree.
    regions: RbTree<Region>,
    /// The lowest usable address.
    base: VirtualAddress,
    /// The highest usable address (inclusive).
    end: VirtualAddress,
    /// Free space between the end of the highest region and the end of the
    /// address space; the full space size while the map is empty.
    last_gap: usize,
}

impl AddressSpaceMap {
    /// Creates an empty map over the closed address interval `[base, end]`.
    ///
    /// # Panics
    ///
    /// Panics if `base > end`.
    #[must_use]
    pub fn new(base: VirtualAddress, end: VirtualAddress) -> Self {
        assert!(base <= end, "address space bounds are inverted");
        let mut map = Self {
            regions: RbTree::new(),
            base,
            end,
            last_gap: 0,
        };
        map.last_gap = map.tail_space(base);
        map
    }

    /// Returns the lowest usable address.
    #[must_use]
    pub fn base(&self) -> VirtualAddress {
        self.base
    }

    /// Returns the highest usable address (inclusive).
    #[must_use]
    pub fn end(&self) -> VirtualAddress {
        self.end
    }

    /// Returns the free space between the highest region and the end of the
    /// address space.
    #[must_use]
    pub fn last_gap(&self) -> usize {
        self.last_gap
    }

    /// Returns the number of mapped regions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Returns `true` if nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Gets an iterator over the mapped regions, in address order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, Region> {
        self.regions.iter()
    }

    /// Returns the region containing `addr`, if any.
    #[must_use]
    pub fn find_region(&self, addr: VirtualAddress) -> Option<&Region> {
        match self.search_containing(addr)? {
            (id, Ordering::Equal) => self.regions.get(id),
            _ => None,
        }
    }

    /// Maps a region of `size` bytes at the lowest unmapped address that is
    /// greater than or equal to `hint` (or to the bottom of the space when
    /// no hint is given), and returns the address it was mapped at.
    ///
    /// `permissions` and `phys` are stored with the region and handed back
    /// on lookup; the map never interprets them.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroSize`] when `size` is zero.
    /// - [`Error::OutOfSpace`] when no gap, including the trailing gap, can
    ///   hold `size` bytes at or above the hint.
    /// - [`Error::Overflow`] when the only candidate placement would exceed
    ///   the representable address range.
    ///
    /// On any error the map is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the map's internal bookkeeping is corrupted.
    pub fn map(
        &mut self,
        hint: Option<VirtualAddress>,
        size: usize,
        permissions: Permissions,
        phys: PhysicalAddress,
    ) -> Result<VirtualAddress, Error> {
        let start = self.find_spot(hint, size)?;
        // The stored end is exclusive, so the region must also not touch
        // the very top of the representable range.
        let end = start.checked_add(size).ok_or(Error::Overflow)?;

        tracing::trace!("mapping {start}..{end} ({size} bytes) with {permissions}");

        let id = self.regions.insert(Region::new(start, end, permissions, phys));

        // The new region's gap runs from its predecessor (or the bottom of
        // the space) up to `start`.
        let pred_end = match self.regions.prev(id) {
            Some(pred) => self.region(pred).end,
            None => self.base,
        };
        let gap = start
            .checked_sub_addr(pred_end)
            .expect("new region starts below its predecessor's end");
        self.region_mut(id).gap = gap;
        self.regions.propagate(id);

        // The successor's gap shrinks to the space above the new region; a
        // new highest region shrinks the trailing gap instead.
        if let Some(succ) = self.regions.next(id) {
            let succ_gap = self
                .region(succ)
                .start
                .checked_sub_addr(end)
                .expect("new region ends past its successor's start");
            self.region_mut(succ).gap = succ_gap;
            self.regions.propagate(succ);
        } else {
            self.last_gap = self.tail_space(end);
        }

        Ok(start)
    }

    /// Unmaps the region containing `addr`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when `addr` does not fall inside any mapped
    /// region; the map is left unchanged.
    ///
    /// # Panics
    ///
    /// Panics if the map's internal bookkeeping is corrupted.
    pub fn unmap(&mut self, addr: VirtualAddress) -> Result<(), Error> {
        let Some((id, Ordering::Equal)) = self.search_containing(addr) else {
            tracing::trace!("unmap at {addr}: no region contains the address");
            return Err(Error::NotFound);
        };

        let succ = self.regions.next(id);
        let region = self.regions.remove(id);
        tracing::trace!("unmapped {}..{}", region.start, region.end);

        if let Some(succ) = succ {
            // The successor inherits the freed space below it.
            let reclaimed = region
                .gap
                .checked_add(region.size())
                .expect("gap accounting overflow");
            let succ_region = self.region_mut(succ);
            succ_region.gap = succ_region
                .gap
                .checked_add(reclaimed)
                .expect("gap accounting overflow");
            self.regions.propagate(succ);
        } else {
            // Removed the highest region; the trailing gap grows back.
            self.last_gap = match self.regions.last() {
                Some(last) => self.tail_space(self.region(last).end),
                None => self.tail_space(self.base),
            };
        }

        Ok(())
    }

    /// Finds the lowest unmapped address at or above `hint` (or the bottom
    /// of the space) where `size` bytes fit, without mapping anything.
    ///
    /// The search walks the region tree pruning every subtree whose cached
    /// largest gap is smaller than `size`, then scans forward in address
    /// order from the first region above the hint, and finally considers
    /// the space between the highest region and the end of the space.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroSize`] when `size` is zero.
    /// - [`Error::OutOfSpace`] when no gap at or above the hint fits.
    /// - [`Error::Overflow`] when the only candidate placement would exceed
    ///   the representable address range.
    ///
    /// # Panics
    ///
    /// Panics if the map's internal bookkeeping is corrupted.
    pub fn find_spot(
        &self,
        hint: Option<VirtualAddress>,
        size: usize,
    ) -> Result<VirtualAddress, Error> {
        crate::ensure!(size > 0, Error::ZeroSize);
        // Placement never goes below the bottom of the space.
        let hint = hint.map_or(self.base, |hint| cmp::max(hint, self.base));

        tracing::trace!("searching for {size} bytes at or above {hint}");

        // Phase 1: hint-guided descent. Walk towards the first region that
        // starts above the hint, pruning every subtree whose largest cached
        // gap is too small to ever produce an admissible start.
        let mut anchor = None;
        if let Some(root) = self.regions.root()
            && self.regions.aggregate(root) >= size
        {
            let mut curr = Some(root);
            while let Some(node) = curr {
                if hint < self.region(node).start {
                    anchor = Some(node);
                    curr = self
                        .regions
                        .left(node)
                        .filter(|&left| self.regions.aggregate(left) >= size);
                } else {
                    curr = self
                        .regions
                        .right(node)
                        .filter(|&right| self.regions.aggregate(right) >= size);
                }
            }
        }

        // Phase 2: forward scan. The anchor's gap may straddle the hint, so
        // it is checked against `max(hint, gap start)`; every later gap lies
        // wholly above the hint and its own size decides admissibility.
        let mut scan = anchor;
        while let Some(node) = scan {
            let region = self.region(node);
            let gap_start = region
                .start
                .checked_sub(region.gap)
                .expect("gap reaches below the address space");
            let candidate = cmp::max(hint, gap_start);
            let avail = region
                .start
                .checked_sub_addr(candidate)
                .expect("candidate past the region start");
            if avail >= size {
                tracing::trace!("found spot {candidate} below region {}", region.start);
                return Ok(candidate);
            }
            scan = self.next_fitting_gap(node, size);
        }

        // Fall back to the space between the highest region and the end.
        let floor = match self.regions.last() {
            Some(last) => cmp::max(hint, self.region(last).end),
            None => hint,
        };
        crate::ensure!(size <= self.tail_space(floor), Error::OutOfSpace);
        // The region's exclusive end must stay representable.
        crate::ensure!(floor.checked_add(size).is_some(), Error::Overflow);
        tracing::trace!("found spot {floor} in the trailing gap");
        Ok(floor)
    }

    /// Asserts the map's bookkeeping invariants: tree validity (including
    /// the cached per-subtree gap maxima), strict ordering and disjointness
    /// of regions, per-region gap values and the trailing gap.
    ///
    /// # Panics
    ///
    /// Panics if any invariant is violated.
    #[track_caller]
    pub fn assert_valid(&self) {
        self.regions.assert_valid();

        let mut pred_end = self.base;
        for region in &self.regions {
            assert!(region.end > region.start, "region is empty or inverted");
            assert!(
                region.start >= pred_end,
                "regions overlap or are out of order"
            );
            assert_eq!(
                region.gap,
                region
                    .start
                    .checked_sub_addr(pred_end)
                    .expect("ordering was just asserted"),
                "stale gap below region at {}",
                region.start,
            );
            pred_end = region.end;
        }

        assert_eq!(self.last_gap, self.tail_space(pred_end), "stale last_gap");
    }

    /// Free addresses in `from..=self.end`; zero when `from` is past the
    /// end. Saturates when the range spans the whole representable space.
    fn tail_space(&self, from: VirtualAddress) -> usize {
        match self.end.checked_sub_addr(from) {
            Some(span) => span.saturating_add(1),
            None => 0,
        }
    }

    fn search_containing(&self, addr: VirtualAddress) -> Option<(NodeId, Ordering)> {
        self.regions.search_by(|region| {
            if addr < region.start {
                Ordering::Less
            } else if addr >= region.end {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    /// Returns the next region in address order after `node` whose
    /// preceding gap holds at least `size` bytes, skipping whole subtrees
    /// whose cached largest gap cannot fit.
    fn next_fitting_gap(&self, node: NodeId, size: usize) -> Option<NodeId> {
        if let Some(right) = self.regions.right(node)
            && self.regions.aggregate(right) >= size
        {
            return Some(self.leftmost_fitting(right, size));
        }

        // Climb to the first ancestor entered from the left; its own gap
        // and its right subtree are the next candidates in address order.
        let mut curr = node;
        while let Some(parent) = self.regions.parent(curr) {
            if self.regions.left(parent) == Some(curr) {
                if self.region(parent).gap >= size {
                    return Some(parent);
                }
                if let Some(right) = self.regions.right(parent)
                    && self.regions.aggregate(right) >= size
                {
                    return Some(self.leftmost_fitting(right, size));
                }
            }
            curr = parent;
        }
        None
    }

    /// Descends to the lowest-addressed region in `subtree` whose preceding
    /// gap holds `size` bytes. The caller guarantees the subtree's cached
    /// maximum fits.
    fn leftmost_fitting(&self, mut subtree: NodeId, size: usize) -> NodeId {
        loop {
            if let Some(left) = self.regions.left(subtree)
                && self.regions.aggregate(left) >= size
            {
                subtree = left;
                continue;
            }
            if self.region(subtree).gap >= size {
                return subtree;
            }
            subtree = self
                .regions
                .right(subtree)
                .expect("cached maximum promised a fitting gap in this subtree");
        }
    }

    fn region(&self, id: NodeId) -> &Region {
        self.regions.get(id).expect("live region id")
    }

    fn region_mut(&mut self, id: NodeId) -> &mut Region {
        self.regions.get_mut(id).expect("live region id")
    }
}

impl core::fmt::Debug for AddressSpaceMap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AddressSpaceMap")
            .field("base", &self.base)
            .field("end", &self.end)
            .field("last_gap", &self.last_gap)
            .field("regions", &self.regions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(addr: usize) -> VirtualAddress {
        VirtualAddress::new(addr)
    }

    fn fixture() -> AddressSpaceMap {
        AddressSpaceMap::new(addr(0x10), addr(0x1000))
    }

    fn map_at(map: &mut AddressSpaceMap, hint: usize, size: usize) -> VirtualAddress {
        map.map(
            Some(addr(hint)),
            size,
            Permissions::READ,
            PhysicalAddress::new(0),
        )
        .unwrap()
    }

    #[test]
    fn search_prefers_the_gap_straddling_the_hint() {
        let mut map = fixture();
        map_at(&mut map, 0x100, 0x10);
        map_at(&mut map, 0x200, 0x10);
        map.assert_valid();

        // The gap below 0x100 spans 0x10..0x100 and straddles a hint of
        // 0x80; the candidate must start at the hint, not at the gap start.
        assert_eq!(map.find_spot(Some(addr(0x80)), 0x20), Ok(addr(0x80)));
        // Too large for the space above the hint; the next fitting gap is
        // between the two regions.
        assert_eq!(map.find_spot(Some(addr(0xc0)), 0x80), Ok(addr(0x110)));
    }

    #[test]
    fn search_skips_subtrees_without_a_fitting_gap() {
        let mut map = fixture();
        // Regions packed tightly at the bottom, one large gap at the top.
        for i in 0..8 {
            map_at(&mut map, 0x20 + i * 0x10, 0x10);
        }
        map_at(&mut map, 0x800, 0x10);
        map.assert_valid();

        // Only the gap below 0x800 fits 0x100 bytes.
        assert_eq!(map.find_spot(None, 0x100), Ok(addr(0xa0)));
    }

    #[test]
    fn hint_inside_a_region_moves_past_it() {
        let mut map = fixture();
        map_at(&mut map, 0x100, 0x100);
        map.assert_valid();

        assert_eq!(map.find_spot(Some(addr(0x180)), 0x10), Ok(addr(0x200)));
    }

    #[test]
    fn trailing_gap_accounts_for_the_inclusive_end() {
        let mut map = fixture();
        // The space holds 0x1000 - 0x10 + 1 bytes in total.
        assert_eq!(map.last_gap(), 0xff1);
        let start = map_at(&mut map, 0, 0xff1);
        assert_eq!(start, addr(0x10));
        map.assert_valid();
        assert_eq!(map.last_gap(), 0);
        assert_eq!(
            map.map(None, 1, Permissions::READ, PhysicalAddress::new(0)),
            Err(Error::OutOfSpace)
        );
    }

    #[test]
    fn mapping_at_the_top_of_the_representable_range_overflows() {
        let mut map = AddressSpaceMap::new(addr(0), VirtualAddress::MAX);
        // The last byte would sit at usize::MAX, whose exclusive end is not
        // representable.
        assert_eq!(
            map.map(
                Some(VirtualAddress::MAX),
                1,
                Permissions::READ,
                PhysicalAddress::new(0)
            ),
            Err(Error::Overflow)
        );
        assert!(map.is_empty());
    }
}
