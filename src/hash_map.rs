use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;

use crate::DefaultHashBuilder;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::NeighborhoodTable;
use crate::neighborhood::DefaultNeighborhood;
use crate::neighborhood::Neighborhood;

/// A hash map backed by a hopscotch [`NeighborhoodTable`].
///
/// Keys and values are stored together as one `(K, V)` entry per slot, so a
/// displacement during insertion always moves a key and its value as a unit.
///
/// Unlike `std::collections::HashMap`, [`insert`](Self::insert) never
/// overwrites: it reports whether the key was new. Use
/// [`insert_or_replace`](Self::insert_or_replace) or the entry API to update.
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use hop_set::HopMap;
///
/// let mut map: HopMap<&str, i32> = HopMap::new();
/// assert!(map.insert("a", 1).1);
/// assert!(!map.insert("a", 2).1);
/// assert_eq!(map.get(&"a"), Some(&1));
///
/// *map.get_or_insert_default("b") += 5;
/// assert_eq!(map.get(&"b"), Some(&5));
/// assert_eq!(map.get_or(&"c", &-1), &-1);
/// # }
/// ```
pub struct HopMap<K, V, S = DefaultHashBuilder, N: Neighborhood = DefaultNeighborhood> {
    pub(crate) table: NeighborhoodTable<(K, V), N>,
    pub(crate) hash_builder: S,
}

impl<K, V, S, N> Clone for HopMap<K, V, S, N>
where
    K: Clone,
    V: Clone,
    S: Clone,
    N: Neighborhood,
{
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K, V, S, N> Debug for HopMap<K, V, S, N>
where
    K: Debug,
    V: Debug,
    N: Neighborhood,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.table.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S, N> PartialEq for HopMap<K, V, S, N>
where
    K: Hash + Eq,
    V: PartialEq,
    S: BuildHasher,
    N: Neighborhood,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

impl<K, V, S, N> Eq for HopMap<K, V, S, N>
where
    K: Hash + Eq,
    V: Eq,
    S: BuildHasher,
    N: Neighborhood,
{
}

impl<K, V, S, N> HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Creates a new hash map with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use hop_set::HopMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HopMap<i32, String, _> = HopMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash map with at least the given number of buckets and
    /// the given hasher builder.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: NeighborhoodTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of home buckets, always a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all entries, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all entries and releases storage, returning to the capacity of
    /// a freshly created map.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Grows the map until it has at least `len() + additional` buckets.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, |(k, _)| self.hash_builder.hash_one(k));
    }

    /// Inserts a key-value pair if the key is absent.
    ///
    /// Returns the position of the entry for `key` and whether it was newly
    /// inserted. An existing entry keeps its value; `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopMap;
    ///
    /// let mut map: HopMap<i32, &str> = HopMap::new();
    /// let (position, inserted) = map.insert(37, "a");
    /// assert!(inserted);
    /// assert_eq!(map.insert(37, "b"), (position, false));
    /// assert_eq!(map.get(&37), Some(&"a"));
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (usize, bool) {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(
            hash,
            |(k, _)| k == &key,
            |(k, _)| self.hash_builder.hash_one(k),
        ) {
            TableEntry::Occupied(entry) => (entry.position(), false),
            TableEntry::Vacant(entry) => (entry.insert_full((key, value)).0, true),
        }
    }

    /// Inserts a key-value pair, replacing the value of an existing entry.
    /// Returns the previous value.
    pub fn insert_or_replace(&mut self, key: K, value: V) -> Option<V> {
        match self.entry(key) {
            Entry::Occupied(mut entry) => Some(entry.insert(value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns the position of the entry for `key`, if present.
    ///
    /// Positions stay valid until the map is next modified.
    pub fn find(&self, key: &K) -> Option<usize> {
        let hash = self.hash_builder.hash_one(key);
        self.table.find(hash, |(k, _)| k == key)
    }

    /// Returns the entry stored at `position`, if any.
    pub fn get_at(&self, position: usize) -> Option<(&K, &V)> {
        self.table.get_at(position).map(|(k, v)| (k, v))
    }

    /// Returns the entry stored at `position` with a mutable value, if any.
    pub fn get_at_mut(&mut self, position: usize) -> Option<(&K, &mut V)> {
        self.table
            .get_at_mut(position)
            .map(|(k, v)| (&*k, v))
    }

    /// Returns a reference to the value for `key`.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .get_mut(hash, |(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .get(hash, |(k, _)| k == key)
            .map(|(k, v)| (k, v))
    }

    /// Returns the value for `key`, or `default` if the key is absent. The
    /// map is never modified.
    pub fn get_or<'a>(&'a self, key: &K, default: &'a V) -> &'a V {
        self.get(key).unwrap_or(default)
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Removes `key` from the map, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key` from the map, returning the stored key and value.
    pub fn remove_entry(&mut self, key: &K) -> Option<(K, V)> {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(hash, |(k, _)| k == key)
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopMap;
    ///
    /// let mut counts: HopMap<char, usize> = HopMap::new();
    /// for c in "hopscotch".chars() {
    ///     counts.entry(c).and_modify(|n| *n += 1).or_insert(1);
    /// }
    /// assert_eq!(counts.get(&'o'), Some(&2));
    /// assert_eq!(counts.get(&'h'), Some(&2));
    /// assert_eq!(counts.get(&'s'), Some(&1));
    /// # }
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, N> {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry(
            hash,
            |(k, _)| k == &key,
            |(k, _)| self.hash_builder.hash_one(k),
        ) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry { entry }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry { entry, key }),
        }
    }

    /// Returns the value for `key`, inserting `V::default()` first if the key
    /// is absent.
    pub fn get_or_insert_default(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Returns an iterator over `(&K, &V)` pairs in slot order.
    pub fn iter(&self) -> Iter<'_, K, V, N> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over `(&K, &mut V)` pairs in slot order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, N> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys of the map.
    pub fn keys(&self) -> Keys<'_, K, V, N> {
        Keys { inner: self.iter() }
    }

    /// Returns an iterator over the values of the map.
    pub fn values(&self) -> Values<'_, K, V, N> {
        Values { inner: self.iter() }
    }

    /// Returns an iterator over mutable references to the values of the map.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V, N> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Removes and yields every entry. Capacity is kept.
    pub fn drain(&mut self) -> Drain<'_, K, V, N> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(|(k, v)| f(k, v));
    }
}

impl<K, V, S, N> HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    /// Creates a new hash map using the default hasher builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash map with at least the given number of buckets using
    /// the default hasher builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S, N> Default for HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, N> FromIterator<(K, V)> for HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HopMap::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, N> Extend<(K, V)> for HopMap<K, V, S, N>
where
    K: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Later pairs replace the values of earlier ones with the same key.
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert_or_replace(k, v);
        }
    }
}

impl<K, V, S, N> IntoIterator for HopMap<K, V, S, N>
where
    N: Neighborhood,
{
    type IntoIter = IntoIter<K, V, N>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, N> IntoIterator for &'a HopMap<K, V, S, N>
where
    N: Neighborhood,
{
    type IntoIter = Iter<'a, K, V, N>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.table.iter(),
        }
    }
}

/// A view into a single entry in a map, which may be vacant or occupied.
///
/// This enum is constructed from the [`entry`] method on [`HopMap`].
///
/// [`entry`]: HopMap::entry
pub enum Entry<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, N>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, N>),
}

impl<'a, K, V, N: Neighborhood> Entry<'a, K, V, N> {
    /// Inserts a default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts a value computed from a closure if the entry is vacant and
    /// returns a mutable reference.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Provides in-place mutable access to an occupied entry before any
    /// potential inserts.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns a reference to this entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, N> Entry<'a, K, V, N>
where
    V: Default,
    N: Neighborhood,
{
    /// Inserts the default value if the entry is vacant and returns a mutable
    /// reference.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant entry in the map.
pub struct VacantEntry<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    entry: crate::hash_table::VacantEntry<'a, (K, V), N>,
    key: K,
}

impl<'a, K, V, N: Neighborhood> VacantEntry<'a, K, V, N> {
    /// Gets a reference to the key that would be used when inserting a value.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Take ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts the value into the map and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        &mut self.entry.insert((self.key, value)).1
    }
}

/// A view into an occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    entry: crate::hash_table::OccupiedEntry<'a, (K, V), N>,
}

impl<'a, K, V, N: Neighborhood> OccupiedEntry<'a, K, V, N> {
    /// Gets a reference to the key in the entry.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Gets a reference to the value in the entry.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Gets a mutable reference to the value in the entry.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value in the entry and returns the old value.
    pub fn insert(&mut self, value: V) -> V {
        core::mem::replace(&mut self.entry.get_mut().1, value)
    }

    /// Removes the entry from the map and returns the value.
    pub fn remove(self) -> V {
        self.entry.remove().1
    }

    /// Removes the entry from the map and returns the key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove()
    }
}

/// An iterator over the key-value pairs of a [`HopMap`].
pub struct Iter<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::Iter<'a, (K, V), N>,
}

impl<'a, K, V, N: Neighborhood> Iterator for Iter<'a, K, V, N> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> DoubleEndedIterator for Iter<'_, K, V, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (k, v))
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for Iter<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for Iter<'_, K, V, N> {}

/// A mutable iterator over the key-value pairs of a [`HopMap`].
pub struct IterMut<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::IterMut<'a, (K, V), N>,
}

impl<'a, K, V, N: Neighborhood> Iterator for IterMut<'a, K, V, N> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> DoubleEndedIterator for IterMut<'_, K, V, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, v)| (&*k, v))
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for IterMut<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for IterMut<'_, K, V, N> {}

/// An iterator over the keys of a [`HopMap`].
pub struct Keys<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: Iter<'a, K, V, N>,
}

impl<'a, K, V, N: Neighborhood> Iterator for Keys<'a, K, V, N> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> DoubleEndedIterator for Keys<'_, K, V, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(k, _)| k)
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for Keys<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for Keys<'_, K, V, N> {}

/// An iterator over the values of a [`HopMap`].
pub struct Values<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: Iter<'a, K, V, N>,
}

impl<'a, K, V, N: Neighborhood> Iterator for Values<'a, K, V, N> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> DoubleEndedIterator for Values<'_, K, V, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|(_, v)| v)
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for Values<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for Values<'_, K, V, N> {}

/// A mutable iterator over the values of a [`HopMap`].
pub struct ValuesMut<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: IterMut<'a, K, V, N>,
}

impl<'a, K, V, N: Neighborhood> Iterator for ValuesMut<'a, K, V, N> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for ValuesMut<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for ValuesMut<'_, K, V, N> {}

/// A draining iterator over the key-value pairs of a [`HopMap`].
pub struct Drain<'a, K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::Drain<'a, (K, V), N>,
}

impl<K, V, N: Neighborhood> Iterator for Drain<'_, K, V, N> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for Drain<'_, K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for Drain<'_, K, V, N> {}

/// A consuming iterator over the key-value pairs of a [`HopMap`].
pub struct IntoIter<K, V, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::IntoIter<(K, V), N>,
}

impl<K, V, N: Neighborhood> Iterator for IntoIter<K, V, N> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V, N: Neighborhood> ExactSizeIterator for IntoIter<K, V, N> {}

impl<K, V, N: Neighborhood> FusedIterator for IntoIter<K, V, N> {}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use core::hash::BuildHasher;

    use rand::Rng;
    use rand::SeedableRng;
    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use rand::rngs::SmallRng;
    use siphasher::sip::SipHasher;

    use super::*;
    use crate::neighborhood::Hop8;

    #[derive(Clone)]
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

    type Map<K, V> = HopMap<K, V, SipHashBuilder, Hop8>;

    fn check<K: Hash + Eq, V>(map: &Map<K, V>) {
        map.table
            .assert_invariants(|(k, _)| map.hash_builder.hash_one(k));
    }

    #[test]
    fn test_new_and_with_hasher() {
        let map: Map<i32, String> = HopMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);

        let map: Map<i32, String> = HopMap::with_hasher(SipHashBuilder::default());
        assert!(map.is_empty());
    }

    #[test]
    fn test_with_capacity() {
        let map: Map<i32, String> = HopMap::with_capacity(100);
        assert_eq!(map.capacity(), 128);
    }

    #[test]
    fn insert_does_not_overwrite() {
        let mut map: Map<&str, i32> = HopMap::new();
        let (position, inserted) = map.insert("a", 1);
        assert!(inserted);
        assert_eq!(map.insert("a", 2), (position, false));
        assert_eq!(map.get(&"a"), Some(&1));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_or_replace() {
        let mut map: Map<&str, i32> = HopMap::new();
        assert_eq!(map.insert_or_replace("a", 1), None);
        assert_eq!(map.insert_or_replace("a", 2), Some(1));
        assert_eq!(map.get(&"a"), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn default_insert_on_access() {
        let mut map: Map<&str, i32> = HopMap::new();
        map.insert("a", 1);

        assert_eq!(*map.get_or_insert_default("b"), 0);
        assert_eq!(map.len(), 2);

        let position = map.find(&"b").expect("b was inserted");
        assert_eq!(map.get_at(position), Some((&"b", &0)));

        *map.get_or_insert_default("a") += 10;
        assert_eq!(map.get(&"a"), Some(&11));
        check(&map);
    }

    #[test]
    fn get_or_never_inserts() {
        let mut map: Map<&str, i32> = HopMap::new();
        map.insert("a", 1);

        let fallback = -1;
        assert_eq!(map.get_or(&"a", &fallback), &1);
        assert_eq!(map.get_or(&"z", &fallback), &-1);
        assert_eq!(map.len(), 1);
        assert!(!map.contains_key(&"z"));
    }

    #[test]
    fn test_get_mut_and_get_at_mut() {
        let mut map: Map<i32, String> = HopMap::new();
        map.insert(1, "one".to_string());

        if let Some(value) = map.get_mut(&1) {
            value.push('!');
        }
        assert_eq!(map.get(&1), Some(&"one!".to_string()));

        let position = map.find(&1).unwrap();
        let (key, value) = map.get_at_mut(position).unwrap();
        assert_eq!(*key, 1);
        value.clear();
        assert_eq!(map.get(&1), Some(&String::new()));
        assert!(map.get_mut(&2).is_none());
    }

    #[test]
    fn test_get_key_value_and_contains() {
        let mut map: Map<i32, &str> = HopMap::new();
        map.insert(3, "c");
        assert_eq!(map.get_key_value(&3), Some((&3, &"c")));
        assert!(map.contains_key(&3));
        assert!(!map.contains_key(&4));
    }

    #[test]
    fn test_remove() {
        let mut map: Map<i32, &str> = HopMap::new();
        map.insert(1, "a");
        map.insert(2, "b");

        assert_eq!(map.remove(&1), Some("a"));
        assert_eq!(map.remove(&1), None);
        assert_eq!(map.remove_entry(&2), Some((2, "b")));
        assert!(map.is_empty());
        check(&map);
    }

    #[test]
    fn test_entry_api() {
        let mut map: Map<&str, i32> = HopMap::new();

        *map.entry("a").or_insert(1) += 1;
        assert_eq!(map.get(&"a"), Some(&2));

        map.entry("a").and_modify(|v| *v *= 10).or_insert(0);
        assert_eq!(map.get(&"a"), Some(&20));

        map.entry("b").and_modify(|v| *v *= 10).or_insert(7);
        assert_eq!(map.get(&"b"), Some(&7));

        assert_eq!(*map.entry("c").or_default(), 0);
        assert_eq!(*map.entry("d").or_insert_with(|| 4), 4);
        assert_eq!(map.entry("d").key(), &"d");
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_occupied_and_vacant_entries() {
        let mut map: Map<String, i32> = HopMap::new();
        map.insert("x".to_string(), 1);

        match map.entry("x".to_string()) {
            Entry::Occupied(mut entry) => {
                assert_eq!(entry.key(), "x");
                assert_eq!(entry.insert(5), 1);
                assert_eq!(*entry.get(), 5);
            }
            Entry::Vacant(_) => panic!("x should be present"),
        }

        match map.entry("y".to_string()) {
            Entry::Vacant(entry) => {
                assert_eq!(entry.key(), "y");
                assert_eq!(entry.into_key(), "y");
            }
            Entry::Occupied(_) => panic!("y should be absent"),
        }
        assert_eq!(map.len(), 1);

        match map.entry("x".to_string()) {
            Entry::Occupied(entry) => assert_eq!(entry.remove_entry(), ("x".to_string(), 5)),
            Entry::Vacant(_) => panic!("x should be present"),
        }
        assert!(map.is_empty());
        check(&map);
    }

    #[test]
    fn values_follow_keys_through_growth() {
        let mut map: Map<u64, u64> = HopMap::with_capacity(8);
        for k in 0..5000u64 {
            assert!(map.insert(k, k * 3).1);
        }

        assert_eq!(map.len(), 5000);
        for k in 0..5000u64 {
            assert_eq!(map.get(&k), Some(&(k * 3)));
        }
        check(&map);

        for k in (0..5000u64).filter(|k| k % 2 == 1) {
            assert_eq!(map.remove(&k), Some(k * 3));
        }
        assert_eq!(map.len(), 2500);
        check(&map);
    }

    #[test]
    fn test_iterators() {
        let mut map: Map<i32, i32> = (0..20).map(|k| (k, k * 2)).collect();

        let mut keys: Vec<i32> = map.keys().copied().collect();
        keys.sort();
        assert_eq!(keys, (0..20).collect::<Vec<_>>());

        let mut values: Vec<i32> = map.values().copied().collect();
        values.sort();
        assert_eq!(values, (0..20).map(|k| k * 2).collect::<Vec<_>>());

        for (k, v) in map.iter_mut() {
            *v += k;
        }
        for v in map.values_mut() {
            *v += 1;
        }
        for (k, v) in &map {
            assert_eq!(*v, k * 3 + 1);
        }

        let forward: Vec<_> = map.iter().map(|(k, _)| *k).collect();
        let mut backward: Vec<_> = map.keys().rev().copied().collect();
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(map.iter().len(), 20);
    }

    #[test]
    fn test_drain_and_into_iter() {
        let mut map: Map<i32, i32> = (0..10).map(|k| (k, k)).collect();
        let capacity = map.capacity();

        let mut drained: Vec<_> = map.drain().collect();
        drained.sort();
        assert_eq!(drained, (0..10).map(|k| (k, k)).collect::<Vec<_>>());
        assert!(map.is_empty());
        assert_eq!(map.capacity(), capacity);

        map.insert(1, 1);
        let owned: Vec<_> = map.into_iter().collect();
        assert_eq!(owned, [(1, 1)]);
    }

    #[test]
    fn test_retain() {
        let mut map: Map<i32, i32> = (0..50).map(|k| (k, k)).collect();
        map.retain(|k, v| {
            *v += 1;
            k % 5 == 0
        });
        assert_eq!(map.len(), 10);
        assert_eq!(map.get(&10), Some(&11));
        check(&map);
    }

    #[test]
    fn test_clear_reset_and_eq() {
        let mut map: Map<i32, i32> = (0..100).map(|k| (k, k)).collect();
        let copy = map.clone();
        assert_eq!(map, copy);

        map.insert_or_replace(5, 0);
        assert_ne!(map, copy);

        let grown = map.capacity();
        map.clear();
        assert_eq!(map.capacity(), grown);
        assert!(map.is_empty());

        map.reset();
        assert_eq!(map.capacity(), 8);
        assert_eq!(copy.len(), 100);
    }

    #[test]
    fn test_extend_later_wins() {
        let mut map: Map<&str, i32> = HopMap::new();
        map.extend([("a", 1), ("b", 2), ("a", 3)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a"), Some(&3));
    }

    #[test]
    fn test_debug() {
        let mut map: Map<i32, &str> = HopMap::new();
        map.insert(1, "a");
        assert_eq!(alloc::format!("{map:?}"), r#"{1: "a"}"#);
    }

    #[test]
    fn drain_and_into_iter_are_exact_and_fused() {
        let mut map: Map<u32, u32> = (0..40).map(|k| (k, k * 2)).collect();

        let mut drain = map.drain();
        assert_eq!(drain.len(), 40);
        drain.next();
        assert_eq!(drain.len(), 39);
        assert_eq!(drain.by_ref().count(), 39);
        assert_eq!(drain.next(), None);
        assert_eq!(drain.next(), None);
        drop(drain);
        assert!(map.is_empty());

        let map: Map<u32, u32> = (0..10).map(|k| (k, k)).collect();
        let mut iter = map.into_iter();
        assert_eq!(iter.len(), 10);
        let mut seen: Vec<_> = iter.by_ref().collect();
        assert_eq!(iter.len(), 0);
        assert_eq!(iter.next(), None);
        seen.sort();
        assert_eq!(seen, (0..10).map(|k| (k, k)).collect::<Vec<_>>());
    }

    #[test]
    fn random_operations_match_model() {
        let mut rng = SmallRng::seed_from_u64(0x5eed_0002);
        let mut map: Map<u64, u64> = HopMap::new();
        let mut model = hashbrown::HashMap::new();

        for step in 0..4000u64 {
            let key = rng.random_range(0..300u64);
            match rng.random_range(0..4) {
                0 => {
                    let (_, inserted) = map.insert(key, step);
                    assert_eq!(inserted, !model.contains_key(&key), "insert {key}");
                    model.entry(key).or_insert(step);
                }
                1 => assert_eq!(
                    map.insert_or_replace(key, step),
                    model.insert(key, step),
                    "replace {key}"
                ),
                2 => assert_eq!(map.remove(&key), model.remove(&key), "remove {key}"),
                _ => assert_eq!(map.get(&key), model.get(&key), "get {key}"),
            }
            assert_eq!(map.len(), model.len());
            check(&map);
        }

        for (key, value) in &model {
            assert_eq!(map.get(key), Some(value));
        }
        assert_eq!(map.iter().count(), model.len());
    }
}
