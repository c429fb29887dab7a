#![allow(dead_code, reason = "shared across test binaries")]

use vmmap::{AddressSpaceMap, Error, Permissions, PhysicalAddress, VirtualAddress};

/// Bounds of the address space used throughout the tests, matching the
/// configuration the interactive harness historically ran with.
pub const VA_BASE: usize = 0x10;
pub const VA_END: usize = 0x1000;

pub fn addr(addr: usize) -> VirtualAddress {
    VirtualAddress::new(addr)
}

pub fn new_map() -> AddressSpaceMap {
    AddressSpaceMap::new(addr(VA_BASE), addr(VA_END))
}

pub fn map_at(
    map: &mut AddressSpaceMap,
    hint: Option<usize>,
    size: usize,
) -> Result<VirtualAddress, Error> {
    map.map(
        hint.map(addr),
        size,
        Permissions::READ | Permissions::WRITE,
        PhysicalAddress::new(0xdead_0000),
    )
}
