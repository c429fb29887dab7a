mod common;

use common::{VA_BASE, VA_END, map_at, new_map};
use rand::prelude::SliceRandom;
use vmmap::{AddressSpaceMap, VirtualAddress};

fn snapshot(map: &AddressSpaceMap) -> (Vec<(VirtualAddress, VirtualAddress)>, usize) {
    (
        map.iter().map(|region| (region.start, region.end)).collect(),
        map.last_gap(),
    )
}

#[test]
fn map_then_unmap_restores_the_previous_state() {
    let mut map = new_map();
    map_at(&mut map, Some(0x100), 0x20).unwrap();
    map_at(&mut map, Some(0x300), 0x20).unwrap();
    map_at(&mut map, Some(0x800), 0x20).unwrap();
    map.assert_valid();

    let probes = [
        (None, 0x10),
        (Some(0x120), 0x30),
        // The highest mapping exercises the trailing-gap bookkeeping.
        (Some(0xf00), 0x40),
        (Some(0x2), 0x10),
    ];
    for (hint, size) in probes {
        let before = snapshot(&map);
        let start = map_at(&mut map, hint, size).unwrap();
        map.assert_valid();
        map.unmap(start).unwrap();
        map.assert_valid();
        assert_eq!(snapshot(&map), before);
    }
}

#[test]
fn a_full_cycle_of_mappings_drains_back_to_empty() {
    let mut map = new_map();
    let mut rng = rand::rng();

    let mut starts = Vec::new();
    for i in 0..48 {
        starts.push(map_at(&mut map, Some(0x20 + i * 0x30), 0x18).unwrap());
        map.assert_valid();
    }

    starts.shuffle(&mut rng);
    for start in starts {
        map.unmap(start).unwrap();
        map.assert_valid();
    }

    assert!(map.is_empty());
    assert_eq!(map.last_gap(), VA_END - VA_BASE + 1);
}
