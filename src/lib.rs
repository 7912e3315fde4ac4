#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod error;

/// A hash map built on hopscotch hashing.
///
/// This module provides a `HopMap` that stores `(K, V)` pairs in a
/// `NeighborhoodTable`, with an entry API and default-insert access.
pub mod hash_map;

/// A hash set built on hopscotch hashing.
///
/// This module provides a `HopSet` with set algebra on top of a
/// `NeighborhoodTable`.
pub mod hash_set;

/// The hopscotch hashing engine shared by the set and the map.
pub mod hash_table;

/// Neighborhood sizes and the packed per-slot hop word.
pub mod neighborhood;

#[cfg(feature = "serde")]
mod serde_impls;

pub use error::LoadError;
pub use hash_map::Entry;
pub use hash_map::HopMap;
pub use hash_set::HopSet;
pub use hash_table::NeighborhoodTable;
pub use neighborhood::DefaultNeighborhood;
pub use neighborhood::Hop8;
pub use neighborhood::Hop16;
pub use neighborhood::Hop32;
pub use neighborhood::Neighborhood;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// Hasher builder used when none is named.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// Hasher builder used when none is named.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// Placeholder when neither `foldhash` nor `std` is enabled.
        ///
        /// It cannot be constructed, so callers must name a hasher builder.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}
