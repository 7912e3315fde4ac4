use alloc::vec::Vec;
use core::fmt;
use core::fmt::Formatter;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::marker::PhantomData;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use serde::de::Error as _;
use serde::de::SeqAccess;
use serde::de::Visitor;
use serde::ser::SerializeTuple;

use crate::HopMap;
use crate::HopSet;
use crate::error::LoadError;
use crate::hash_table::NeighborhoodTable;
use crate::neighborhood::HopInfo;
use crate::neighborhood::HopWord;
use crate::neighborhood::Neighborhood;

/// Number of fields in a dump: neighborhood size, len, capacity, hop words,
/// slots, overflow entries.
const DUMP_FIELDS: usize = 6;

/// A table dump as read back, before any validation.
struct RawDump<T> {
    size: u32,
    len: usize,
    capacity: usize,
    words: Vec<u32>,
    slots: Vec<Option<T>>,
    overflow: Vec<T>,
}

struct HopWords<'a, W>(&'a [HopInfo<W>]);

impl<W: HopWord> Serialize for HopWords<'_, W> {
    fn serialize<Sr: Serializer>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error> {
        serializer.collect_seq(self.0.iter().map(|info| info.bits()))
    }
}

struct Slots<'a, T, N: Neighborhood>(&'a NeighborhoodTable<T, N>);

impl<T: Serialize, N: Neighborhood> Serialize for Slots<'_, T, N> {
    fn serialize<Sr: Serializer>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error> {
        let table = self.0;
        serializer.collect_seq((0..table.slot_count()).map(|slot| table.get_at(slot)))
    }
}

struct Overflow<'a, T>(&'a [(u64, T)]);

impl<T: Serialize> Serialize for Overflow<'_, T> {
    fn serialize<Sr: Serializer>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error> {
        serializer.collect_seq(self.0.iter().map(|(_, value)| value))
    }
}

impl<T, N: Neighborhood> NeighborhoodTable<T, N> {
    /// Writes the physical layout as one tuple.
    fn save<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        T: Serialize,
        Sr: Serializer,
    {
        let mut tuple = serializer.serialize_tuple(DUMP_FIELDS)?;
        tuple.serialize_element(&(N::SIZE as u32))?;
        tuple.serialize_element(&self.populated)?;
        tuple.serialize_element(&self.capacity)?;
        tuple.serialize_element(&HopWords(&self.hops))?;
        tuple.serialize_element(&Slots(self))?;
        tuple.serialize_element(&Overflow(&self.overflow))?;
        tuple.end()
    }

    /// Rebuilds the exact layout of a dump, checking it against `hasher` and
    /// rejecting entries that `eq` considers the same.
    fn from_dump(
        dump: RawDump<T>,
        hasher: impl Fn(&T) -> u64,
        eq: impl Fn(&T, &T) -> bool,
    ) -> Result<Self, LoadError> {
        if dump.size as usize != N::SIZE {
            return Err(LoadError::NeighborhoodMismatch {
                expected: N::SIZE,
                found: dump.size,
            });
        }
        if !dump.capacity.is_power_of_two() || dump.capacity < N::SIZE {
            return Err(LoadError::InvalidCapacity(dump.capacity));
        }

        let slot_count = dump
            .capacity
            .checked_add(N::HOP_WINDOW)
            .ok_or(LoadError::InvalidCapacity(dump.capacity))?;
        for (what, found) in [("hop words", dump.words.len()), ("slots", dump.slots.len())] {
            if found != slot_count {
                return Err(LoadError::LengthMismatch {
                    what,
                    expected: slot_count,
                    found,
                });
            }
        }

        let mut table = Self::allocate(dump.capacity);
        let mut occupied = 0;
        for (slot, (word, entry)) in dump.words.into_iter().zip(dump.slots).enumerate() {
            if word.checked_shr(N::SIZE as u32).unwrap_or(0) != 0 {
                return Err(LoadError::WordOutOfRange { slot, word });
            }

            let info = HopInfo::from_bits(word);
            match (info.is_occupied(), entry) {
                (true, Some(value)) => {
                    table.slots[slot].write(value);
                    occupied += 1;
                }
                (false, None) => {}
                _ => return Err(LoadError::OccupancyMismatch { slot }),
            }
            // Written only after the slot is filled, so an early return never
            // drops uninitialized memory.
            table.hops[slot] = info;
        }

        for slot in 0..slot_count {
            let Some(value) = table.get_at(slot) else {
                continue;
            };
            let home = table.bucket_of(hasher(value));
            if home > slot
                || slot - home >= N::HOP_WINDOW
                || !table.hops[home].neighbor_bit(slot - home)
            {
                return Err(LoadError::Misplaced { slot, home });
            }
        }

        let recorded: usize = table
            .hops
            .iter()
            .map(|info| info.neighbor_count() as usize)
            .sum();
        if recorded != occupied {
            return Err(LoadError::StrayNeighborBits { recorded, occupied });
        }

        // Every neighbor bit now names an occupied slot, so lookups are safe.
        // A lookup stops at the first match, which must be the slot itself.
        for slot in 0..slot_count {
            let Some(value) = table.get_at(slot) else {
                continue;
            };
            if table.find(hasher(value), |other| eq(other, value)) != Some(slot) {
                return Err(LoadError::DuplicateEntry { position: slot });
            }
        }

        table.populated = occupied;
        for value in dump.overflow {
            let hash = hasher(&value);
            if table.find(hash, |other| eq(other, &value)).is_some() {
                return Err(LoadError::DuplicateEntry {
                    position: slot_count + table.overflow.len(),
                });
            }
            table.overflow.push((hash, value));
            table.populated += 1;
        }
        if table.populated != dump.len {
            return Err(LoadError::LenMismatch {
                declared: dump.len,
                found: table.populated,
            });
        }

        Ok(table)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for RawDump<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_tuple(
            DUMP_FIELDS,
            DumpVisitor {
                _marker: PhantomData,
            },
        )
    }
}

struct DumpVisitor<T> {
    _marker: PhantomData<T>,
}

impl<'de, T: Deserialize<'de>> Visitor<'de> for DumpVisitor<T> {
    type Value = RawDump<T>;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "a hopscotch table dump of {DUMP_FIELDS} fields")
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let size = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(0, &self))?;
        let len = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(1, &self))?;
        let capacity = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(2, &self))?;
        let words = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(3, &self))?;
        let slots = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(4, &self))?;
        let overflow = seq
            .next_element()?
            .ok_or_else(|| A::Error::invalid_length(5, &self))?;

        Ok(RawDump {
            size,
            len,
            capacity,
            words,
            slots,
            overflow,
        })
    }
}

impl<T, S, N> HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Writes the set's exact physical layout: neighborhood size, length,
    /// capacity, every hop word, every slot (`None` when empty) and the
    /// overflow entries, as one serde tuple.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let set: HopSet<u32> = (0..10).collect();
    ///
    /// let mut bytes = Vec::new();
    /// set.save(&mut serde_json::Serializer::new(&mut bytes)).unwrap();
    ///
    /// let mut de = serde_json::Deserializer::from_slice(&bytes);
    /// let loaded = HopSet::load(&mut de, set.hasher().clone()).unwrap();
    /// assert_eq!(set, loaded);
    /// # }
    /// ```
    pub fn save<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        T: Serialize,
        Sr: Serializer,
    {
        self.table.save(serializer)
    }

    /// Rebuilds a set from a dump written by [`save`](Self::save).
    ///
    /// The dump must come from a set with the same neighborhood size, and
    /// `hash_builder` must hash exactly like the one used when saving: each
    /// entry is checked against its home neighborhood. Any mismatch is
    /// reported as the deserializer's custom error, carrying a
    /// [`LoadError`].
    pub fn load<'de, D>(deserializer: D, hash_builder: S) -> Result<Self, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let dump = RawDump::deserialize(deserializer)?;
        let table = NeighborhoodTable::from_dump(dump, |v| hash_builder.hash_one(v), T::eq)
            .map_err(|err| {
                log::warn!("rejecting hop set dump: {err}");
                D::Error::custom(err)
            })?;

        Ok(Self {
            table,
            hash_builder,
        })
    }
}

impl<K, V, S, N> HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Writes the map's exact physical layout. Entries are written as
    /// `(key, value)` pairs; see [`HopSet::save`] for the layout.
    pub fn save<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        K: Serialize,
        V: Serialize,
        Sr: Serializer,
    {
        self.table.save(serializer)
    }

    /// Rebuilds a map from a dump written by [`save`](Self::save), with the
    /// same checks as [`HopSet::load`].
    pub fn load<'de, D>(deserializer: D, hash_builder: S) -> Result<Self, D::Error>
    where
        K: Deserialize<'de>,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let dump = RawDump::deserialize(deserializer)?;
        let table = NeighborhoodTable::from_dump(
            dump,
            |(k, _)| hash_builder.hash_one(k),
            |(a, _), (b, _)| a == b,
        )
        .map_err(|err| {
                log::warn!("rejecting hop map dump: {err}");
                D::Error::custom(err)
            })?;

        Ok(Self {
            table,
            hash_builder,
        })
    }
}

impl<T, S, N> Serialize for HopSet<T, S, N>
where
    T: Serialize + Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        self.save(serializer)
    }
}

impl<'de, T, S, N> Deserialize<'de> for HopSet<T, S, N>
where
    T: Deserialize<'de> + Hash + Eq,
    S: Default + BuildHasher,
    N: Neighborhood,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Self::load(deserializer, S::default())
    }
}

impl<K, V, S, N> Serialize for HopMap<K, V, S, N>
where
    K: Serialize + Hash + Eq,
    V: Serialize,
    S: BuildHasher,
    N: Neighborhood,
{
    fn serialize<Sr>(&self, serializer: Sr) -> Result<Sr::Ok, Sr::Error>
    where
        Sr: Serializer,
    {
        self.save(serializer)
    }
}

impl<'de, K, V, S, N> Deserialize<'de> for HopMap<K, V, S, N>
where
    K: Deserialize<'de> + Hash + Eq,
    V: Deserialize<'de>,
    S: Default + BuildHasher,
    N: Neighborhood,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Self::load(deserializer, S::default())
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use serde_json::Value;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::neighborhood::Hop8;
    use crate::neighborhood::Hop16;

    #[derive(Clone, PartialEq, Debug)]
    struct SipHashBuilder {
        k1: u64,
        k2: u64,
    }

    impl BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(self.k1, self.k2)
        }
    }

    impl Default for SipHashBuilder {
        fn default() -> Self {
            Self {
                k1: OsRng.try_next_u64().unwrap_or(0),
                k2: OsRng.try_next_u64().unwrap_or(0),
            }
        }
    }

    /// Sends every key to bucket 0.
    #[derive(Clone, Default)]
    struct ConstantState;

    struct ConstantHasher;

    impl Hasher for ConstantHasher {
        fn finish(&self) -> u64 {
            0
        }

        fn write(&mut self, _: &[u8]) {}
    }

    impl BuildHasher for ConstantState {
        type Hasher = ConstantHasher;

        fn build_hasher(&self) -> Self::Hasher {
            ConstantHasher
        }
    }

    type Set = HopSet<u64, SipHashBuilder, Hop8>;

    fn sample() -> Set {
        let mut set: Set = HopSet::with_capacity(8);
        for k in 0..300u64 {
            set.insert(k * 7);
        }
        for k in 0..50u64 {
            set.remove(&(k * 14));
        }
        set
    }

    fn dump(set: &Set) -> Value {
        serde_json::to_value(set).unwrap()
    }

    fn load_set(value: Value, hash_builder: SipHashBuilder) -> Result<Set, serde_json::Error> {
        HopSet::load(value, hash_builder)
    }

    #[test]
    fn set_round_trip_preserves_layout() {
        let set = sample();
        let json = serde_json::to_string(&set).unwrap();

        let mut de = serde_json::Deserializer::from_str(&json);
        let loaded: Set = HopSet::load(&mut de, set.hasher().clone()).unwrap();

        assert_eq!(loaded.len(), set.len());
        assert_eq!(loaded.capacity(), set.capacity());
        assert_eq!(loaded.table.hops, set.table.hops);
        for slot in 0..set.table.slot_count() {
            assert_eq!(loaded.get_at(slot), set.get_at(slot));
        }
        assert_eq!(loaded, set);
        loaded
            .table
            .assert_invariants(|v| loaded.hash_builder.hash_one(v));
    }

    #[test]
    fn dump_layout_fields() {
        let set = sample();
        let value = dump(&set);

        assert_eq!(value[0], 8);
        assert_eq!(value[1], set.len() as u64);
        assert_eq!(value[2], set.capacity() as u64);
        let slot_count = set.capacity() + 7;
        assert_eq!(value[3].as_array().unwrap().len(), slot_count);
        assert_eq!(value[4].as_array().unwrap().len(), slot_count);
        assert_eq!(value[5].as_array().unwrap().len(), 0);
    }

    #[test]
    fn map_round_trip_with_overflow() {
        let mut map: HopMap<String, u32, ConstantState, Hop8> = HopMap::new();
        for k in 0..20u32 {
            map.insert(k.to_string(), k);
        }
        assert_eq!(map.table.overflow.len(), 13);

        let json = serde_json::to_string(&map).unwrap();
        let loaded: HopMap<String, u32, ConstantState, Hop8> = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded.table.overflow.len(), 13);
        for k in 0..20u32 {
            assert_eq!(loaded.get(&k.to_string()), Some(&k));
        }
        assert_eq!(loaded, map);
    }

    #[test]
    fn empty_set_round_trip() {
        let set: Set = HopSet::new();
        let loaded = load_set(dump(&set), set.hasher().clone()).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.capacity(), 8);
    }

    #[test]
    fn rejects_other_neighborhood_size() {
        let set = sample();
        let err = HopSet::<u64, SipHashBuilder, Hop16>::load(dump(&set), set.hasher().clone())
            .unwrap_err();
        assert!(err.to_string().contains("neighborhood size mismatch"), "{err}");
    }

    #[test]
    fn rejects_different_hasher() {
        let set = sample();
        let other = SipHashBuilder {
            k1: set.hasher().k1 ^ 1,
            k2: set.hasher().k2,
        };
        let err = load_set(dump(&set), other).unwrap_err();
        assert!(err.to_string().contains("not recorded by its home bucket"), "{err}");
    }

    #[test]
    fn rejects_cleared_bitmaps() {
        let set = sample();
        let mut value = dump(&set);
        for word in value[3].as_array_mut().unwrap() {
            let bits = word.as_u64().unwrap();
            *word = Value::from(bits & 1);
        }

        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("not recorded by its home bucket"), "{err}");
    }

    #[test]
    fn rejects_stray_neighbor_bit() {
        let set = sample();
        let mut value = dump(&set);
        let words = value[3].as_array_mut().unwrap();
        let (slot, bits) = words
            .iter()
            .enumerate()
            .map(|(slot, word)| (slot, word.as_u64().unwrap()))
            .find(|(_, bits)| bits >> 1 != (1 << 7) - 1)
            .unwrap();
        let free = (1..8).find(|bit| bits & (1 << bit) == 0).unwrap();
        words[slot] = Value::from(bits | (1 << free));

        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("neighborhood bitmaps record"), "{err}");
    }

    #[test]
    fn rejects_occupancy_mismatch() {
        let set = sample();
        let mut value = dump(&set);
        let slot = (0..set.table.slot_count())
            .find(|&slot| set.get_at(slot).is_some())
            .unwrap();
        value[4][slot] = Value::Null;

        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("occupancy flag"), "{err}");
    }

    #[test]
    fn rejects_bad_capacity_and_lengths() {
        let set = sample();

        let mut value = dump(&set);
        value[2] = Value::from(set.capacity() as u64 + 1);
        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("invalid capacity"), "{err}");

        let mut value = dump(&set);
        value[4].as_array_mut().unwrap().pop();
        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("slots has"), "{err}");

        let mut value = dump(&set);
        value[1] = Value::from(set.len() as u64 + 1);
        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("dump declares"), "{err}");
    }

    #[test]
    fn rejects_duplicate_overflow_entry() {
        let set = sample();
        assert!(set.contains(&7));

        // A copy of a slotted key.
        let mut value = dump(&set);
        value[5].as_array_mut().unwrap().push(Value::from(7));
        value[1] = Value::from(set.len() as u64 + 1);
        let err = load_set(value, set.hasher().clone()).unwrap_err();
        assert!(err.to_string().contains("duplicates"), "{err}");

        // The same key listed twice in the overflow list.
        assert!(!set.contains(&1));
        let mut value = dump(&set);
        value[5].as_array_mut().unwrap().push(Value::from(1));
        value[5].as_array_mut().unwrap().push(Value::from(1));
        value[1] = Value::from(set.len() as u64 + 2);
        let err = load_set(value, set.hasher().clone()).unwrap_err();
        let expected = LoadError::DuplicateEntry {
            position: set.table.slot_count() + 1,
        };
        assert!(err.to_string().contains(&expected.to_string()), "{err}");

        // One extra distinct key is accepted.
        let mut value = dump(&set);
        value[5].as_array_mut().unwrap().push(Value::from(1));
        value[1] = Value::from(set.len() as u64 + 1);
        let loaded = load_set(value, set.hasher().clone()).unwrap();
        assert_eq!(loaded.len(), set.len() + 1);
        assert!(loaded.contains(&1));
    }

    #[test]
    fn rejects_duplicate_slot_entry() {
        let mut set: HopSet<u64, ConstantState, Hop8> = HopSet::new();
        for k in 0..5u64 {
            set.insert(k);
        }
        let mut value = serde_json::to_value(&set).unwrap();
        value[4][1] = value[4][0].clone();

        let err = HopSet::<u64, ConstantState, Hop8>::load(value, ConstantState).unwrap_err();
        assert!(err.to_string().contains("duplicates"), "{err}");
    }

    #[test]
    fn rejects_truncated_dump() {
        let set = sample();
        let mut value = dump(&set);
        value.as_array_mut().unwrap().truncate(4);
        assert!(load_set(value, set.hasher().clone()).is_err());
    }
}
