use core::fmt::Debug;

/// Unsigned integer used to store one packed hop word per slot.
///
/// Bit 0 is the occupied flag of the slot itself, bits `1..BITS` form the
/// neighborhood bitmap of the bucket rooted at that slot.
pub trait HopWord: Copy + Default + Eq + Debug {
    /// Width of the word in bits.
    const BITS: u32;

    /// Widen the word for bit manipulation.
    fn to_bits(self) -> u32;

    /// Narrow a bit pattern back into the word. Bits above `BITS` are dropped.
    fn from_bits(bits: u32) -> Self;
}

macro_rules! hop_word {
    ($($ty:ty),*) => {
        $(
            impl HopWord for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline(always)]
                fn to_bits(self) -> u32 {
                    self as u32
                }

                #[inline(always)]
                fn from_bits(bits: u32) -> Self {
                    bits as $ty
                }
            }
        )*
    };
}

hop_word!(u8, u16, u32);

/// Compile-time neighborhood configuration of a table.
///
/// `SIZE` is the neighborhood size H. Every entry lives within `SIZE - 1`
/// slots of its home bucket, which bounds a lookup to at most `SIZE - 1`
/// comparisons.
pub trait Neighborhood {
    /// Packed word type, wide enough for `SIZE` bits.
    type Word: HopWord;

    /// The neighborhood size H. Must be a power of two no wider than `Word`.
    const SIZE: usize;

    /// Number of slots tracked by a bucket's bitmap, `H - 1`. Also the number
    /// of trailing padding slots behind the last bucket.
    const HOP_WINDOW: usize = Self::SIZE - 1;

    /// Longest forward scan for an empty slot before the table grows.
    const PROBE_LIMIT: usize = Self::SIZE * 16;

    #[doc(hidden)]
    const VALID: () = assert!(
        Self::SIZE.is_power_of_two()
            && Self::SIZE >= 2
            && Self::SIZE as u32 <= <Self::Word as HopWord>::BITS,
        "neighborhood size must be a power of two that fits in its hop word"
    );
}

/// Neighborhood of 8 slots, one byte of hop information per slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hop8;

/// Neighborhood of 16 slots, two bytes of hop information per slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hop16;

/// Neighborhood of 32 slots, four bytes of hop information per slot.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hop32;

impl Neighborhood for Hop8 {
    type Word = u8;

    const SIZE: usize = 8;
}

impl Neighborhood for Hop16 {
    type Word = u16;

    const SIZE: usize = 16;
}

impl Neighborhood for Hop32 {
    type Word = u32;

    const SIZE: usize = 32;
}

cfg_if::cfg_if! {
    if #[cfg(feature = "eight-way")] {
        /// Neighborhood used when none is named, selected by cargo feature.
        pub type DefaultNeighborhood = Hop8;
    } else if #[cfg(feature = "sixteen-way")] {
        /// Neighborhood used when none is named, selected by cargo feature.
        pub type DefaultNeighborhood = Hop16;
    } else {
        /// Neighborhood used when none is named, selected by cargo feature.
        pub type DefaultNeighborhood = Hop32;
    }
}

const OCCUPIED: u32 = 1;

/// One packed hop word: the occupied flag of slot `i` and the neighborhood
/// bitmap of bucket `i`.
///
/// The two halves describe different relations and never conflict: slot `i`
/// may hold an entry from an earlier bucket while bucket `i` owns entries in
/// later slots.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
#[repr(transparent)]
pub(crate) struct HopInfo<W> {
    word: W,
}

impl<W: HopWord> HopInfo<W> {
    #[inline(always)]
    pub(crate) fn from_bits(bits: u32) -> Self {
        Self {
            word: W::from_bits(bits),
        }
    }

    #[inline(always)]
    pub(crate) fn bits(self) -> u32 {
        self.word.to_bits()
    }

    #[inline(always)]
    pub(crate) fn is_occupied(self) -> bool {
        self.bits() & OCCUPIED != 0
    }

    #[inline(always)]
    pub(crate) fn set_occupied(&mut self) {
        debug_assert!(!self.is_occupied());
        self.word = W::from_bits(self.bits() | OCCUPIED);
    }

    #[inline(always)]
    pub(crate) fn clear_occupied(&mut self) {
        debug_assert!(self.is_occupied());
        self.word = W::from_bits(self.bits() & !OCCUPIED);
    }

    /// Bitmap of owned slots: bit `k` set means slot `bucket + k` belongs to
    /// this bucket.
    #[inline(always)]
    pub(crate) fn neighbors(self) -> u32 {
        self.bits() >> 1
    }

    #[inline(always)]
    pub(crate) fn neighbor_bit(self, offset: usize) -> bool {
        self.neighbors() & (1 << offset) != 0
    }

    #[inline(always)]
    pub(crate) fn set_neighbor(&mut self, offset: usize) {
        debug_assert!(!self.neighbor_bit(offset));
        self.word = W::from_bits(self.bits() | (1 << (offset + 1)));
    }

    #[inline(always)]
    pub(crate) fn clear_neighbor(&mut self, offset: usize) {
        debug_assert!(self.neighbor_bit(offset));
        self.word = W::from_bits(self.bits() & !(1 << (offset + 1)));
    }

    /// Number of slots owned by this bucket.
    #[inline(always)]
    pub(crate) fn neighbor_count(self) -> u32 {
        self.neighbors().count_ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_and_probe_limits() {
        assert_eq!(Hop8::HOP_WINDOW, 7);
        assert_eq!(Hop8::PROBE_LIMIT, 128);
        assert_eq!(Hop16::HOP_WINDOW, 15);
        assert_eq!(Hop16::PROBE_LIMIT, 256);
        assert_eq!(Hop32::HOP_WINDOW, 31);
        assert_eq!(Hop32::PROBE_LIMIT, 512);
    }

    #[test]
    fn occupied_flag_is_independent_of_neighbors() {
        let mut info = HopInfo::<u8>::default();
        assert!(!info.is_occupied());
        assert_eq!(info.neighbors(), 0);

        info.set_neighbor(0);
        assert!(!info.is_occupied());
        assert!(info.neighbor_bit(0));

        info.set_occupied();
        assert!(info.is_occupied());
        assert_eq!(info.bits(), 0b11);

        info.set_neighbor(6);
        assert_eq!(info.neighbors(), 0b100_0001);
        assert_eq!(info.neighbor_count(), 2);

        info.clear_neighbor(0);
        assert!(info.is_occupied());
        assert_eq!(info.neighbors(), 0b100_0000);

        info.clear_occupied();
        assert_eq!(info.bits(), 0b1000_0000);
    }

    #[test]
    fn widest_offset_uses_top_bit() {
        let mut info = HopInfo::<u32>::default();
        info.set_neighbor(Hop32::HOP_WINDOW - 1);
        assert_eq!(info.bits(), 1 << 31);
        assert!(info.neighbor_bit(30));
        assert_eq!(HopInfo::<u32>::from_bits(info.bits()), info);
    }
}
