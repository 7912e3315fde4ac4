use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::BitAnd;
use core::ops::BitAndAssign;
use core::ops::BitOr;
use core::ops::BitOrAssign;
use core::ops::BitXor;
use core::ops::BitXorAssign;
use core::ops::Sub;
use core::ops::SubAssign;

use crate::DefaultHashBuilder;
use crate::hash_table::Entry;
use crate::hash_table::NeighborhoodTable;
use crate::neighborhood::DefaultNeighborhood;
use crate::neighborhood::Neighborhood;

/// A hash set backed by a hopscotch [`NeighborhoodTable`].
///
/// `HopSet<T, S, N>` stores values of type `T` where `T` implements
/// `Hash + Eq`, hashes them with the builder `S`, and keeps every value within
/// `N::SIZE - 1` slots of its home bucket.
///
/// Besides the usual set operations it supports set algebra through
/// operators on references:
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use hop_set::HopSet;
///
/// let a: HopSet<i32> = (1..=4).collect();
/// let b: HopSet<i32> = (3..=6).collect();
///
/// assert_eq!((&a | &b).len(), 6);
/// assert_eq!((&a & &b).len(), 2);
/// assert_eq!((&a - &b).len(), 2);
/// assert_eq!((&a ^ &b).len(), 4);
/// # }
/// ```
pub struct HopSet<T, S = DefaultHashBuilder, N: Neighborhood = DefaultNeighborhood> {
    pub(crate) table: NeighborhoodTable<T, N>,
    pub(crate) hash_builder: S,
}

impl<T, S, N> Clone for HopSet<T, S, N>
where
    T: Clone,
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

impl<T, S, N> PartialEq for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }
}

impl<T, S, N> Eq for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
}

impl<T, S, N> Debug for HopSet<T, S, N>
where
    T: Debug,
    N: Neighborhood,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.table.iter()).finish()
    }
}

impl<T, S, N> HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Creates a new hash set with the given hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(feature = "std")]
    /// # {
    /// use std::collections::hash_map::RandomState;
    ///
    /// use hop_set::HopSet;
    ///
    /// let set: HopSet<i32, _> = HopSet::with_hasher(RandomState::new());
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(0, hash_builder)
    }

    /// Creates a new hash set with at least the given number of buckets and
    /// the given hasher builder.
    ///
    /// The capacity is rounded up to a power of two, and never below the
    /// neighborhood size.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self {
            table: NeighborhoodTable::with_capacity(capacity),
            hash_builder,
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<i32> = HopSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.insert(1);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of home buckets, always a power of two.
    ///
    /// The set may hold somewhat more elements than this, as the last
    /// neighborhood extends past the final bucket.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Returns a reference to the set's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Removes all elements, keeping the allocated capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<i32> = (0..100).collect();
    /// let capacity = set.capacity();
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(set.capacity(), capacity);
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Removes all elements and releases storage, returning to the capacity
    /// of a freshly created set. The hasher builder is kept.
    pub fn reset(&mut self) {
        self.table.reset();
    }

    /// Grows the set until it has at least `len() + additional` buckets.
    pub fn reserve(&mut self, additional: usize) {
        self.table
            .reserve(additional, |v| self.hash_builder.hash_one(v));
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was newly inserted. An equal value already
    /// present is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<i32> = HopSet::new();
    /// assert_eq!(set.insert(37), true);
    /// assert_eq!(set.insert(37), false);
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn insert(&mut self, value: T) -> bool {
        self.insert_full(value).1
    }

    /// Adds a value to the set, returning its position and whether it was
    /// newly inserted.
    ///
    /// If an equal value is already present, its position is returned and the
    /// set is unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<&str> = HopSet::new();
    /// let (position, inserted) = set.insert_full("a");
    /// assert!(inserted);
    /// assert_eq!(set.get_at(position), Some(&"a"));
    /// assert_eq!(set.insert_full("a"), (position, false));
    /// # }
    /// ```
    pub fn insert_full(&mut self, value: T) -> (usize, bool) {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| v == &value, |v| self.hash_builder.hash_one(v))
        {
            Entry::Occupied(entry) => (entry.position(), false),
            Entry::Vacant(entry) => (entry.insert_full(value).0, true),
        }
    }

    /// Adds a value to the set, replacing the existing value, if any, that is
    /// equal to the given one. Returns the replaced value.
    pub fn replace(&mut self, value: T) -> Option<T> {
        let hash = self.hash_builder.hash_one(&value);
        match self
            .table
            .entry(hash, |v| v == &value, |v| self.hash_builder.hash_one(v))
        {
            Entry::Occupied(mut entry) => Some(core::mem::replace(entry.get_mut(), value)),
            Entry::Vacant(entry) => {
                entry.insert(value);
                None
            }
        }
    }

    /// Returns `true` if the set contains a value.
    pub fn contains(&self, value: &T) -> bool {
        self.find(value).is_some()
    }

    /// Returns the position of the value, if present.
    ///
    /// Positions stay valid until the set is next modified.
    pub fn find(&self, value: &T) -> Option<usize> {
        let hash = self.hash_builder.hash_one(value);
        self.table.find(hash, |v| v == value)
    }

    /// Returns the value stored at `position`, if any.
    pub fn get_at(&self, position: usize) -> Option<&T> {
        self.table.get_at(position)
    }

    /// Returns a reference to the value in the set, if any, that is equal to
    /// the given value.
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.get(hash, |v| v == value)
    }

    /// Removes a value from the set. Returns whether the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<i32> = HopSet::new();
    /// set.insert(1);
    /// assert_eq!(set.remove(&1), true);
    /// assert_eq!(set.remove(&1), false);
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) -> bool {
        self.take(value).is_some()
    }

    /// Removes and returns the value in the set, if any, that is equal to the
    /// given one.
    pub fn take(&mut self, value: &T) -> Option<T> {
        let hash = self.hash_builder.hash_one(value);
        self.table.remove(hash, |v| v == value)
    }

    /// Returns an iterator over the values of the set in slot order.
    ///
    /// The iterator is double-ended; iterating from the back walks the slots
    /// in decreasing order.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator that removes and yields all values from the set.
    /// Capacity is kept.
    ///
    /// Calling `mem::forget` on the returned iterator leaks the values not
    /// yet yielded.
    pub fn drain(&mut self) -> Drain<'_, T, N> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let mut set: HopSet<i32> = (0..10).collect();
    /// set.retain(|&v| v % 2 == 0);
    /// assert_eq!(set.len(), 5);
    /// # }
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&T) -> bool) {
        self.table.retain(|v| f(v));
    }

    /// Returns `true` if the sets share at least one element.
    ///
    /// Iterates the smaller set and stops at the first common element.
    pub fn intersects(&self, other: &Self) -> bool {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|v| large.contains(v))
    }

    /// Returns `true` if the set contains no elements in common with `other`.
    pub fn is_disjoint(&self, other: &Self) -> bool {
        !self.intersects(other)
    }

    /// Returns `true` if `other` contains every element of `self`.
    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        self.iter().all(|v| other.contains(v))
    }

    /// Returns `true` if `self` contains every element of `other`.
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Visits the values in `self` or `other`, without duplicates.
    pub fn union<'a>(&'a self, other: &'a Self) -> Union<'a, T, S, N> {
        Union {
            iter: self.iter(),
            rest: other.difference(self),
        }
    }

    /// Visits the values in both `self` and `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let a: HopSet<i32> = [1, 2, 3].into_iter().collect();
    /// let b: HopSet<i32> = [2, 3, 4].into_iter().collect();
    ///
    /// let mut common: Vec<_> = a.intersection(&b).copied().collect();
    /// common.sort();
    /// assert_eq!(common, [2, 3]);
    /// # }
    /// ```
    pub fn intersection<'a>(&'a self, other: &'a Self) -> Intersection<'a, T, S, N> {
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        Intersection {
            iter: small.iter(),
            other: large,
        }
    }

    /// Visits the values in `self` but not in `other`.
    pub fn difference<'a>(&'a self, other: &'a Self) -> Difference<'a, T, S, N> {
        Difference {
            iter: self.iter(),
            other,
        }
    }

    /// Visits the values in exactly one of `self` and `other`.
    pub fn symmetric_difference<'a>(&'a self, other: &'a Self) -> SymmetricDifference<'a, T, S, N> {
        SymmetricDifference {
            iter: self.difference(other).chain(other.difference(self)),
        }
    }
}

impl<T, S, N> HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    /// Creates a new hash set using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let set: HopSet<i32> = HopSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a new hash set with at least the given number of buckets using
    /// the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use hop_set::HopSet;
    ///
    /// let set: HopSet<i32> = HopSet::with_capacity(100);
    /// assert_eq!(set.capacity(), 128);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<T, S, N> Default for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, S, N> BitOrAssign<&HopSet<T, S, N>> for HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Inserts every element of `rhs` not yet present.
    fn bitor_assign(&mut self, rhs: &HopSet<T, S, N>) {
        for v in rhs {
            if !self.contains(v) {
                self.insert(v.clone());
            }
        }
    }
}

impl<T, S, N> BitAndAssign<&HopSet<T, S, N>> for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Keeps only the elements also present in `rhs`.
    fn bitand_assign(&mut self, rhs: &HopSet<T, S, N>) {
        self.retain(|v| rhs.contains(v));
    }
}

impl<T, S, N> SubAssign<&HopSet<T, S, N>> for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Removes every element present in `rhs`.
    fn sub_assign(&mut self, rhs: &HopSet<T, S, N>) {
        if self.len() <= rhs.len() {
            self.retain(|v| !rhs.contains(v));
        } else {
            for v in rhs {
                self.remove(v);
            }
        }
    }
}

impl<T, S, N> BitXorAssign<&HopSet<T, S, N>> for HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher,
    N: Neighborhood,
{
    /// Removes the elements shared with `rhs` and inserts the ones only `rhs`
    /// has.
    fn bitxor_assign(&mut self, rhs: &HopSet<T, S, N>) {
        for v in rhs {
            if !self.remove(v) {
                self.insert(v.clone());
            }
        }
    }
}

impl<T, S, N> BitOr<&HopSet<T, S, N>> for &HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    N: Neighborhood,
{
    type Output = HopSet<T, S, N>;

    /// Returns the union of `self` and `rhs` as a new set.
    fn bitor(self, rhs: &HopSet<T, S, N>) -> HopSet<T, S, N> {
        let (large, small) = if self.len() >= rhs.len() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let mut out = large.clone();
        out |= small;
        out
    }
}

impl<T, S, N> BitAnd<&HopSet<T, S, N>> for &HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    N: Neighborhood,
{
    type Output = HopSet<T, S, N>;

    /// Returns the intersection of `self` and `rhs` as a new set.
    fn bitand(self, rhs: &HopSet<T, S, N>) -> HopSet<T, S, N> {
        let mut out = HopSet::with_hasher(self.hash_builder.clone());
        for v in self.intersection(rhs) {
            out.insert(v.clone());
        }
        out
    }
}

impl<T, S, N> Sub<&HopSet<T, S, N>> for &HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    N: Neighborhood,
{
    type Output = HopSet<T, S, N>;

    /// Returns the elements of `self` not in `rhs` as a new set.
    fn sub(self, rhs: &HopSet<T, S, N>) -> HopSet<T, S, N> {
        let mut out = HopSet::with_hasher(self.hash_builder.clone());
        for v in self.difference(rhs) {
            out.insert(v.clone());
        }
        out
    }
}

impl<T, S, N> BitXor<&HopSet<T, S, N>> for &HopSet<T, S, N>
where
    T: Hash + Eq + Clone,
    S: BuildHasher + Clone,
    N: Neighborhood,
{
    type Output = HopSet<T, S, N>;

    /// Returns the elements in exactly one of `self` and `rhs` as a new set.
    fn bitxor(self, rhs: &HopSet<T, S, N>) -> HopSet<T, S, N> {
        let mut out = self - rhs;
        for v in rhs.difference(self) {
            out.insert(v.clone());
        }
        out
    }
}

/// An iterator over the values of a [`HopSet`].
pub struct Iter<'a, T, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::Iter<'a, T, N>,
}

impl<'a, T, N: Neighborhood> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, N: Neighborhood> DoubleEndedIterator for Iter<'_, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back()
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, N: Neighborhood> FusedIterator for Iter<'_, T, N> {}

/// A draining iterator over the values of a [`HopSet`].
pub struct Drain<'a, T, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::Drain<'a, T, N>,
}

impl<T, N: Neighborhood> Iterator for Drain<'_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for Drain<'_, T, N> {}

impl<T, N: Neighborhood> FusedIterator for Drain<'_, T, N> {}

/// A consuming iterator over the values of a [`HopSet`].
pub struct IntoIter<T, N: Neighborhood = DefaultNeighborhood> {
    inner: crate::hash_table::IntoIter<T, N>,
}

impl<T, N: Neighborhood> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for IntoIter<T, N> {}

impl<T, N: Neighborhood> FusedIterator for IntoIter<T, N> {}

impl<T, S, N> IntoIterator for HopSet<T, S, N>
where
    N: Neighborhood,
{
    type IntoIter = IntoIter<T, N>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, T, S, N> IntoIterator for &'a HopSet<T, S, N>
where
    N: Neighborhood,
{
    type IntoIter = Iter<'a, T, N>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        Iter {
            inner: self.table.iter(),
        }
    }
}

impl<T, S, N> FromIterator<T> for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher + Default,
    N: Neighborhood,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = HopSet::new();
        set.extend(iter);
        set
    }
}

impl<T, S, N> Extend<T> for HopSet<T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, T, S, N> Extend<&'a T> for HopSet<T, S, N>
where
    T: Hash + Eq + Copy + 'a,
    S: BuildHasher,
    N: Neighborhood,
{
    fn extend<I: IntoIterator<Item = &'a T>>(&mut self, iter: I) {
        self.extend(iter.into_iter().copied());
    }
}

/// A lazy iterator over the union of two sets.
pub struct Union<'a, T, S, N: Neighborhood = DefaultNeighborhood> {
    iter: Iter<'a, T, N>,
    rest: Difference<'a, T, S, N>,
}

impl<'a, T, S, N> Iterator for Union<'a, T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().or_else(|| self.rest.next())
    }
}

/// A lazy iterator over the intersection of two sets.
pub struct Intersection<'a, T, S, N: Neighborhood = DefaultNeighborhood> {
    iter: Iter<'a, T, N>,
    other: &'a HopSet<T, S, N>,
}

impl<'a, T, S, N> Iterator for Intersection<'a, T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// A lazy iterator over the difference of two sets.
pub struct Difference<'a, T, S, N: Neighborhood = DefaultNeighborhood> {
    iter: Iter<'a, T, N>,
    other: &'a HopSet<T, S, N>,
}

impl<'a, T, S, N> Iterator for Difference<'a, T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let v = self.iter.next()?;
            if !self.other.contains(v) {
                return Some(v);
            }
        }
    }
}

/// A lazy iterator over the symmetric difference of two sets.
pub struct SymmetricDifference<'a, T, S, N: Neighborhood = DefaultNeighborhood> {
    iter: core::iter::Chain<Difference<'a, T, S, N>, Difference<'a, T, S, N>>,
}

impl<'a, T, S, N> Iterator for SymmetricDifference<'a, T, S, N>
where
    T: Hash + Eq,
    S: BuildHasher,
    N: Neighborhood,
{
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}
