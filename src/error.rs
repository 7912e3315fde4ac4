//! Errors raised when rebuilding a table from a dump.

use thiserror::Error;

/// Why a dumped table was rejected by `load`.
///
/// Every variant describes a dump that does not reproduce a valid table under
/// the neighborhood size and hasher supplied to `load`. Reloading with a
/// different hasher typically surfaces as [`LoadError::Misplaced`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The dump was written by a table with another neighborhood size.
    #[error("neighborhood size mismatch: dump uses {found}, table expects {expected}")]
    NeighborhoodMismatch {
        /// Neighborhood size of the loading table
        expected: usize,
        /// Neighborhood size recorded in the dump
        found: u32,
    },

    /// The recorded capacity is not a power of two at least as large as the
    /// neighborhood.
    #[error("invalid capacity {0}")]
    InvalidCapacity(usize),

    /// One of the per-slot arrays has the wrong length.
    #[error("{what} has {found} elements, expected {expected}")]
    LengthMismatch {
        /// Which array is malformed
        what: &'static str,
        /// `capacity + H - 1`
        expected: usize,
        /// Length found in the dump
        found: usize,
    },

    /// A hop word uses bits beyond the neighborhood.
    #[error("hop word {word:#x} at slot {slot} does not fit the neighborhood")]
    WordOutOfRange {
        /// Slot index
        slot: usize,
        /// The offending word
        word: u32,
    },

    /// A slot's occupied flag disagrees with whether it holds an entry.
    #[error("occupancy flag of slot {slot} disagrees with its contents")]
    OccupancyMismatch {
        /// Slot index
        slot: usize,
    },

    /// An entry is not recorded in the neighborhood of its home bucket.
    #[error("entry at slot {slot} is not recorded by its home bucket {home}")]
    Misplaced {
        /// Slot index of the entry
        slot: usize,
        /// Home bucket computed with the loading hasher
        home: usize,
    },

    /// Two entries in the dump compare equal.
    #[error("entry at position {position} duplicates an earlier entry")]
    DuplicateEntry {
        /// Position of the second copy: a slot index, or `capacity + H - 1`
        /// plus its index in the overflow list
        position: usize,
    },

    /// Neighborhood bitmaps point at more slots than hold entries.
    #[error("neighborhood bitmaps record {recorded} entries, but {occupied} slots are occupied")]
    StrayNeighborBits {
        /// Total bits set across all bitmaps
        recorded: usize,
        /// Number of occupied slots
        occupied: usize,
    },

    /// The recorded entry count disagrees with the entries present.
    #[error("dump declares {declared} entries, but holds {found}")]
    LenMismatch {
        /// Count recorded in the dump
        declared: usize,
        /// Occupied slots plus overflow entries
        found: usize,
    },
}
