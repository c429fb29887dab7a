//! Differential test of the tree-based unmapped-area search against a
//! straight-line reference allocator over a sorted interval list.

use proptest::prelude::*;
use vmmap::{AddressSpaceMap, Error, Permissions, PhysicalAddress, VirtualAddress};

const BASE: usize = 0x10;
const END: usize = 0x400;

#[derive(Debug, Clone)]
enum Op {
    Map { hint: Option<usize>, size: usize },
    Unmap { addr: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (proptest::option::of(0usize..0x500), 1usize..0x100)
            .prop_map(|(hint, size)| Op::Map { hint, size }),
        2 => (0usize..0x500).prop_map(|addr| Op::Unmap { addr }),
    ]
}

/// Linear-scan first fit: the lowest admissible start at or above the hint,
/// walking the sorted interval list front to back.
fn model_find_spot(model: &[(usize, usize)], hint: Option<usize>, size: usize) -> Option<usize> {
    let hint = hint.unwrap_or(BASE).max(BASE);
    let mut pred_end = BASE;
    for &(start, end) in model {
        let candidate = hint.max(pred_end);
        if candidate <= start && start - candidate >= size {
            return Some(candidate);
        }
        pred_end = end;
    }
    let candidate = hint.max(pred_end);
    let last = candidate.checked_add(size - 1)?;
    (last <= END).then_some(candidate)
}

fn model_unmap(model: &mut Vec<(usize, usize)>, addr: usize) -> bool {
    if let Some(pos) = model
        .iter()
        .position(|&(start, end)| start <= addr && addr < end)
    {
        model.remove(pos);
        true
    } else {
        false
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

proptest! {
    #[test]
    fn behaves_like_the_linear_reference(
        ops in proptest::collection::vec(op_strategy(), 1..200),
    ) {
        init_tracing();
        let mut map = AddressSpaceMap::new(VirtualAddress::new(BASE), VirtualAddress::new(END));
        let mut model: Vec<(usize, usize)> = Vec::new();

        for op in ops {
            match op {
                Op::Map { hint, size } => {
                    let expected = model_find_spot(&model, hint, size);
                    let got = map.map(
                        hint.map(VirtualAddress::new),
                        size,
                        Permissions::READ,
                        PhysicalAddress::new(0),
                    );
                    match expected {
                        Some(start) => {
                            prop_assert_eq!(got, Ok(VirtualAddress::new(start)));
                            let pos = model
                                .iter()
                                .position(|&(s, _)| s > start)
                                .unwrap_or(model.len());
                            model.insert(pos, (start, start + size));
                        }
                        None => {
                            prop_assert!(matches!(
                                got,
                                Err(Error::OutOfSpace) | Err(Error::Overflow)
                            ));
                        }
                    }
                }
                Op::Unmap { addr } => {
                    let got = map.unmap(VirtualAddress::new(addr));
                    if model_unmap(&mut model, addr) {
                        prop_assert_eq!(got, Ok(()));
                    } else {
                        prop_assert_eq!(got, Err(Error::NotFound));
                    }
                }
            }
            // Rebuilds every cached gap maximum from scratch and compares.
            map.assert_valid();
        }

        let final_regions: Vec<(usize, usize)> = map
            .iter()
            .map(|region| (region.start.get(), region.end.get()))
            .collect();
        prop_assert_eq!(final_regions, model);
    }
}
