// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

macro_rules! address_impl {
    ($addr:ident) => {
        impl $addr {
            pub const MIN: Self = Self(0);
            pub const MAX: Self = Self(usize::MAX);

            /// Creates an address from a raw value.
            #[must_use]
            pub const fn new(addr: usize) -> Self {
                Self(addr)
            }

            /// Returns the raw address value.
            #[must_use]
            pub const fn get(self) -> usize {
                self.0
            }

            /// Adds an unsigned offset to this address, returning `None` on
            /// overflow.
            #[must_use]
            pub const fn checked_add(self, rhs: usize) -> Option<Self> {
                if let Some(out) = self.0.checked_add(rhs) {
                    Some(Self(out))
                } else {
                    None
                }
            }

            /// Subtracts an unsigned offset from this address, returning
            /// `None` on underflow.
            #[must_use]
            pub const fn checked_sub(self, rhs: usize) -> Option<Self> {
                if let Some(out) = self.0.checked_sub(rhs) {
                    Some(Self(out))
                } else {
                    None
                }
            }

            /// Returns the distance in bytes from `rhs` up to `self`, or
            /// `None` when `rhs` is the higher address.
            #[must_use]
            pub const fn checked_sub_addr(self, rhs: Self) -> Option<usize> {
                self.0.checked_sub(rhs.0)
            }
        }

        impl ::core::fmt::Display for $addr {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_fmt(format_args!("{:#x}", self.0))
            }
        }

        impl ::core::fmt::Debug for $addr {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.debug_tuple(stringify!($addr))
                    .field(&format_args!("{:#x}", self.0))
                    .finish()
            }
        }
    };
}

/// A virtual address within a managed address space.
#[repr(transparent)]
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct VirtualAddress(usize);
address_impl!(VirtualAddress);

/// A physical address, carried as opaque region payload.
#[repr(transparent)]
#[derive(Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct PhysicalAddress(usize);
address_impl!(PhysicalAddress);
