use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem::MaybeUninit;

use crate::neighborhood::DefaultNeighborhood;
use crate::neighborhood::HopInfo;
use crate::neighborhood::Neighborhood;

/// Why a placement attempt could not find a slot inside the home
/// neighborhood.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exhausted {
    /// No empty slot within the probe limit.
    Probe,
    /// An empty slot exists, but no chain of moves brings it close enough to
    /// the home bucket.
    Displacement,
}

/// A prepared location for a new entry.
#[derive(Debug, Clone, Copy)]
enum Vacancy {
    /// Unoccupied slot `index` inside the neighborhood of bucket `home`.
    Slot { home: usize, index: usize },
    /// Doubling cannot make room: the home neighborhood is saturated by one
    /// hash, or the table is already sparse.
    Overflow,
}

/// An open-addressing hash table using hopscotch hashing.
///
/// Every slot carries one packed hop word (see [`Neighborhood`]): bit 0 marks
/// the slot as occupied and the remaining bits record which of the next
/// `H - 1` slots hold entries whose home bucket is this slot. Lookups
/// therefore compare at most `H - 1` entries. Insertions walk an empty slot
/// backward toward the home bucket by moving closer entries forward, and
/// double the capacity when that fails.
///
/// The table knows nothing about keys. Callers supply the hash of an entry
/// and an equality predicate, plus a `hasher` used to rehash stored entries
/// when the table grows.
///
/// Positions returned by [`find`](Self::find) are physical slot indices.
/// Entries that spilled to the overflow list are addressed by positions at or
/// past [`slot_count`](Self::slot_count). Any insertion or removal may move
/// entries, so positions are only valid until the next mutation.
///
/// ## Example
///
/// ```rust
/// use hop_set::hash_table::NeighborhoodTable;
/// use hop_set::neighborhood::Hop8;
///
/// fn hash(v: &u64) -> u64 {
///     v.wrapping_mul(0x9E37_79B9_7F4A_7C15)
/// }
///
/// let mut table: NeighborhoodTable<u64, Hop8> = NeighborhoodTable::new();
/// for v in 0..100u64 {
///     table.entry(hash(&v), |&x| x == v, hash).or_insert(v);
/// }
///
/// assert_eq!(table.len(), 100);
/// assert_eq!(table.get(hash(&42), |&x| x == 42), Some(&42));
/// assert!(table.capacity().is_power_of_two());
/// ```
pub struct NeighborhoodTable<T, N: Neighborhood = DefaultNeighborhood> {
    pub(crate) hops: Box<[HopInfo<N::Word>]>,
    pub(crate) slots: Box<[MaybeUninit<T>]>,
    pub(crate) overflow: Vec<(u64, T)>,
    pub(crate) populated: usize,
    pub(crate) capacity: usize,
}

impl<T, N> Debug for NeighborhoodTable<T, N>
where
    T: Debug,
    N: Neighborhood,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NeighborhoodTable")
            .field("len", &self.populated)
            .field("capacity", &self.capacity)
            .field(
                "hops",
                &self
                    .hops
                    .iter()
                    .enumerate()
                    .filter(|(_, info)| info.bits() != 0)
                    .map(|(index, info)| format!("{index:>4}:{:0w$b}", info.bits(), w = N::SIZE))
                    .collect::<Vec<_>>(),
            )
            .field("entries", &self.iter().collect::<Vec<_>>())
            .field("overflow", &self.overflow.len())
            .finish()
    }
}

impl<T, N> Clone for NeighborhoodTable<T, N>
where
    T: Clone,
    N: Neighborhood,
{
    fn clone(&self) -> Self {
        let mut table = Self::allocate(self.capacity);

        for (index, info) in self.hops.iter().enumerate() {
            if !info.is_occupied() {
                continue;
            }

            // SAFETY: the slot is occupied, so it holds an initialized value.
            let value = unsafe { self.slots[index].assume_init_ref() }.clone();
            table.slots[index].write(value);
            table.hops[index].set_occupied();
        }

        // Same capacity means the same physical layout, bitmaps included.
        table.hops.copy_from_slice(&self.hops);
        table.overflow = self.overflow.clone();
        table.populated = self.populated;

        table
    }
}

impl<T, N: Neighborhood> Drop for NeighborhoodTable<T, N> {
    fn drop(&mut self) {
        self.drop_slots();
    }
}

impl<T, N: Neighborhood> Default for NeighborhoodTable<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, N: Neighborhood> NeighborhoodTable<T, N> {
    /// Creates an empty table with the smallest capacity, one neighborhood.
    pub fn new() -> Self {
        Self::with_capacity(N::SIZE)
    }

    /// Creates an empty table with at least `capacity` buckets.
    ///
    /// The hint is rounded up to a power of two and never goes below the
    /// neighborhood size.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hop_set::hash_table::NeighborhoodTable;
    /// # use hop_set::neighborhood::Hop8;
    /// #
    /// let table: NeighborhoodTable<u32, Hop8> = NeighborhoodTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    ///
    /// let table: NeighborhoodTable<u32, Hop8> = NeighborhoodTable::with_capacity(0);
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity
            .max(N::SIZE)
            .checked_next_power_of_two()
            .expect("capacity overflow");
        Self::allocate(capacity)
    }

    pub(crate) fn allocate(capacity: usize) -> Self {
        let () = N::VALID;
        debug_assert!(capacity.is_power_of_two());

        let slot_count = capacity
            .checked_add(N::HOP_WINDOW)
            .expect("capacity overflow");

        Self {
            hops: alloc::vec![HopInfo::default(); slot_count].into_boxed_slice(),
            slots: Box::new_uninit_slice(slot_count),
            overflow: Vec::new(),
            populated: 0,
            capacity,
        }
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no entries.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of home buckets. Always a power of two.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of physical slots: the buckets plus `H - 1`
    /// trailing padding slots.
    pub fn slot_count(&self) -> usize {
        self.hops.len()
    }

    #[inline(always)]
    pub(crate) fn bucket_of(&self, hash: u64) -> usize {
        (hash as usize) & (self.capacity - 1)
    }

    /// Returns the position of the entry matching `hash` and `eq`, if any.
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<usize> {
        let home = self.bucket_of(hash);
        if let Some(index) = self.search_neighborhood(home, &eq) {
            return Some(index);
        }

        self.search_overflow(hash, &eq)
            .map(|index| self.slot_count() + index)
    }

    #[inline]
    fn search_neighborhood(&self, home: usize, eq: &impl Fn(&T) -> bool) -> Option<usize> {
        let mut neighbors = self.hops[home].neighbors();
        while neighbors != 0 {
            let index = home + neighbors.trailing_zeros() as usize;
            // SAFETY: a neighbor bit is only ever set for an occupied slot.
            if eq(unsafe { self.slots[index].assume_init_ref() }) {
                return Some(index);
            }
            neighbors &= neighbors - 1;
        }

        None
    }

    #[cold]
    #[inline(never)]
    fn search_overflow(&self, hash: u64, eq: &impl Fn(&T) -> bool) -> Option<usize> {
        self.overflow
            .iter()
            .position(|(stored, value)| *stored == hash && eq(value))
    }

    /// Returns a reference to the entry matching `hash` and `eq`.
    pub fn get(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        self.find(hash, eq).and_then(|index| self.get_at(index))
    }

    /// Returns a mutable reference to the entry matching `hash` and `eq`.
    pub fn get_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        self.find(hash, eq).and_then(|index| self.get_at_mut(index))
    }

    /// Returns the entry stored at `position`, or `None` if that position is
    /// empty or out of range.
    pub fn get_at(&self, position: usize) -> Option<&T> {
        if position < self.slot_count() {
            if !self.hops[position].is_occupied() {
                return None;
            }
            // SAFETY: the slot is occupied.
            return Some(unsafe { self.slots[position].assume_init_ref() });
        }

        self.overflow
            .get(position - self.slot_count())
            .map(|(_, value)| value)
    }

    /// Mutable variant of [`get_at`](Self::get_at).
    ///
    /// Callers must not change the entry in a way that changes its hash.
    pub fn get_at_mut(&mut self, position: usize) -> Option<&mut T> {
        if position < self.slot_count() {
            if !self.hops[position].is_occupied() {
                return None;
            }
            // SAFETY: the slot is occupied.
            return Some(unsafe { self.slots[position].assume_init_mut() });
        }

        let overflow_index = position - self.slot_count();
        self.overflow
            .get_mut(overflow_index)
            .map(|(_, value)| value)
    }

    /// Reference to a position known to be occupied.
    fn occupied_mut(&mut self, position: usize) -> &mut T {
        if position < self.slot_count() {
            debug_assert!(self.hops[position].is_occupied());
            // SAFETY: callers only pass positions they just found or filled.
            unsafe { self.slots[position].assume_init_mut() }
        } else {
            let overflow_index = position - self.slot_count();
            &mut self.overflow[overflow_index].1
        }
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// If no matching entry exists, room is made for one before this returns:
    /// neighbors may be displaced and the table may grow, rehashing stored
    /// entries with `hasher`. A vacant entry that is dropped without being
    /// filled leaves the table fully consistent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use hop_set::hash_table::Entry;
    /// # use hop_set::hash_table::NeighborhoodTable;
    /// #
    /// fn hash(pair: &(u32, &str)) -> u64 {
    ///     (pair.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    /// }
    ///
    /// let mut table: NeighborhoodTable<(u32, &str)> = NeighborhoodTable::new();
    /// let key = 7;
    /// let h = hash(&(key, ""));
    ///
    /// match table.entry(h, |&(k, _)| k == key, hash) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((key, "seven"));
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// match table.entry(h, |&(k, _)| k == key, hash) {
    ///     Entry::Occupied(mut entry) => entry.get_mut().1 = "SEVEN",
    ///     Entry::Vacant(_) => unreachable!(),
    /// }
    /// assert_eq!(table.get(h, |&(k, _)| k == key), Some(&(7, "SEVEN")));
    /// ```
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&T) -> bool,
        hasher: impl Fn(&T) -> u64,
    ) -> Entry<'_, T, N> {
        if let Some(index) = self.find(hash, eq) {
            return Entry::Occupied(OccupiedEntry { table: self, index });
        }

        let vacancy = self.vacancy(hash, &hasher);
        Entry::Vacant(VacantEntry {
            table: self,
            hash,
            vacancy,
        })
    }

    /// Inserts a value the caller knows is not yet present and returns its
    /// position.
    pub fn insert_unique(&mut self, hash: u64, value: T, hasher: impl Fn(&T) -> u64) -> usize {
        self.place(hash, value, &hasher)
    }

    fn place(&mut self, hash: u64, value: T, hasher: &impl Fn(&T) -> u64) -> usize {
        let vacancy = self.vacancy(hash, hasher);
        self.occupy(hash, vacancy, value)
    }

    /// Finds room for a new entry, growing the table until it fits.
    fn vacancy(&mut self, hash: u64, hasher: &impl Fn(&T) -> u64) -> Vacancy {
        loop {
            let home = self.bucket_of(hash);
            match self.make_room(home) {
                Ok(index) => return Vacancy::Slot { home, index },
                Err(exhausted) => {
                    if self.is_saturated(home, hash, hasher) || self.is_sparse() {
                        log::trace!(
                            "no room near bucket {home} ({exhausted:?}), spilling to overflow \
                             ({} entries)",
                            self.overflow.len() + 1
                        );
                        return Vacancy::Overflow;
                    }

                    log::debug!(
                        "placement near bucket {home} failed ({exhausted:?}), growing from {} \
                         buckets",
                        self.capacity
                    );
                    self.grow(hasher);
                }
            }
        }
    }

    /// Locates an empty slot and walks it back into the neighborhood of
    /// `home`. Returns the slot index, which is left unoccupied.
    fn make_room(&mut self, home: usize) -> Result<usize, Exhausted> {
        let probe_end = (home + N::PROBE_LIMIT).min(self.slot_count());
        let mut hole = (home..probe_end)
            .find(|&index| !self.hops[index].is_occupied())
            .ok_or(Exhausted::Probe)?;

        while hole - home >= N::HOP_WINDOW {
            let (from, owner) = self.find_movable(hole).ok_or(Exhausted::Displacement)?;
            self.relocate(owner, from, hole);
            hole = from;
        }

        Ok(hole)
    }

    /// Returns the lowest slot before `hole` whose entry may move into `hole`
    /// without leaving its own neighborhood, together with its home bucket.
    fn find_movable(&self, hole: usize) -> Option<(usize, usize)> {
        let first = hole + 1 - N::HOP_WINDOW;
        for from in first..hole {
            for owner in first..=from {
                if self.hops[owner].neighbor_bit(from - owner) {
                    return Some((from, owner));
                }
            }
        }

        None
    }

    fn relocate(&mut self, owner: usize, from: usize, to: usize) {
        debug_assert!(self.hops[from].is_occupied());
        debug_assert!(!self.hops[to].is_occupied());
        debug_assert!(to - owner < N::HOP_WINDOW);

        // SAFETY: `from` is occupied and therefore initialized. `to` is
        // unoccupied, so writing over it leaks nothing. The occupancy flags
        // move with the value right after, so the read value is never dropped
        // twice.
        unsafe {
            let value = self.slots[from].assume_init_read();
            self.slots[to].write(value);
        }

        self.hops[from].clear_occupied();
        self.hops[to].set_occupied();
        self.hops[owner].clear_neighbor(from - owner);
        self.hops[owner].set_neighbor(to - owner);
    }

    /// True when the neighborhood of `home` is full and every resident shares
    /// `hash`, so no amount of doubling can separate them.
    fn is_saturated(&self, home: usize, hash: u64, hasher: &impl Fn(&T) -> u64) -> bool {
        let info = self.hops[home];
        if info.neighbor_count() as usize != N::HOP_WINDOW {
            return false;
        }

        let mut neighbors = info.neighbors();
        while neighbors != 0 {
            let index = home + neighbors.trailing_zeros() as usize;
            // SAFETY: owned slots are occupied.
            let resident = unsafe { self.slots[index].assume_init_ref() };
            if hasher(resident) as usize != hash as usize {
                return false;
            }
            neighbors &= neighbors - 1;
        }

        true
    }

    /// True when fewer than one bucket in `H` is in use. Placement only fails
    /// at this load when hashes cluster in a way doubling cannot spread, and
    /// growth stays bounded by `2 * H * len()`.
    #[inline]
    fn is_sparse(&self) -> bool {
        self.populated.saturating_mul(N::SIZE) < self.capacity
    }

    fn occupy(&mut self, hash: u64, vacancy: Vacancy, value: T) -> usize {
        self.populated += 1;

        match vacancy {
            Vacancy::Slot { home, index } => {
                debug_assert!(!self.hops[index].is_occupied());
                debug_assert!(index - home < N::HOP_WINDOW);

                self.slots[index].write(value);
                self.hops[index].set_occupied();
                self.hops[home].set_neighbor(index - home);
                index
            }
            Vacancy::Overflow => {
                self.overflow.push((hash, value));
                self.slot_count() + self.overflow.len() - 1
            }
        }
    }

    #[cold]
    fn grow(&mut self, hasher: &impl Fn(&T) -> u64) {
        let capacity = self.capacity.checked_mul(2).expect("capacity overflow");
        self.rehash(capacity, hasher);
    }

    /// Moves every entry into fresh storage with `capacity` buckets.
    fn rehash(&mut self, capacity: usize, hasher: &impl Fn(&T) -> u64) {
        log::debug!(
            "rehashing {} entries from {} to {} buckets",
            self.populated,
            self.capacity,
            capacity
        );

        let fresh = Self::allocate(capacity);
        let mut old = core::mem::replace(self, fresh);

        // Ownership note: entries are moved out of `old` one by one. Clearing
        // each occupied flag before the read means `old`'s destructor only
        // ever sees the entries that were not moved yet.
        for index in 0..old.slot_count() {
            if !old.hops[index].is_occupied() {
                continue;
            }

            old.hops[index].clear_occupied();
            old.populated -= 1;
            // SAFETY: the slot was occupied until the line above.
            let value = unsafe { old.slots[index].assume_init_read() };
            let hash = hasher(&value);
            self.place(hash, value, hasher);
        }

        for (hash, value) in core::mem::take(&mut old.overflow) {
            old.populated -= 1;
            self.place(hash, value, hasher);
        }

        debug_assert_eq!(old.populated, 0);
    }

    /// Grows the table until it has at least `len() + additional` buckets.
    pub fn reserve(&mut self, additional: usize, hasher: impl Fn(&T) -> u64) {
        let required = self.populated.saturating_add(additional);
        if required > self.capacity {
            let capacity = required
                .checked_next_power_of_two()
                .expect("capacity overflow");
            self.rehash(capacity, &hasher);
        }
    }

    /// Removes and returns the entry matching `hash` and `eq`.
    ///
    /// The vacated slot is not compacted; it is reusable by later
    /// insertions right away.
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        let position = self.find(hash, eq)?;
        self.remove_at(position)
    }

    /// Removes and returns the entry at `position`, if any.
    pub fn remove_at(&mut self, position: usize) -> Option<T> {
        if position >= self.slot_count() {
            let overflow_index = position - self.slot_count();
            if overflow_index >= self.overflow.len() {
                return None;
            }
            self.populated -= 1;
            return Some(self.overflow.swap_remove(overflow_index).1);
        }

        if !self.hops[position].is_occupied() {
            return None;
        }

        let home = self.owner_of(position);
        self.hops[home].clear_neighbor(position - home);
        self.hops[position].clear_occupied();
        self.populated -= 1;

        // SAFETY: the slot was occupied until the line above, and its flag
        // is now clear so ownership passes to the caller.
        Some(unsafe { self.slots[position].assume_init_read() })
    }

    /// Home bucket of the occupied slot at `index`, recovered from the
    /// bitmaps alone.
    fn owner_of(&self, index: usize) -> usize {
        let first = index.saturating_sub(N::HOP_WINDOW - 1);
        for owner in first..=index {
            if self.hops[owner].neighbor_bit(index - owner) {
                return owner;
            }
        }

        unreachable!("occupied slot {index} is not owned by any bucket");
    }

    /// Keeps only the entries for which `f` returns `true`.
    pub fn retain(&mut self, mut f: impl FnMut(&mut T) -> bool) {
        for index in 0..self.slot_count() {
            if !self.hops[index].is_occupied() {
                continue;
            }

            // SAFETY: the slot is occupied.
            if !f(unsafe { self.slots[index].assume_init_mut() }) {
                drop(self.remove_at(index));
            }
        }

        if !self.overflow.is_empty() {
            let before = self.overflow.len();
            self.overflow.retain_mut(|(_, value)| f(value));
            self.populated -= before - self.overflow.len();
        }
    }

    /// Removes all entries, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.drop_slots();
        self.hops.fill(HopInfo::default());
        self.overflow.clear();
        self.populated = 0;
    }

    /// Removes all entries and releases storage, returning to the capacity of
    /// a freshly created table.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn drop_slots(&mut self) {
        if !core::mem::needs_drop::<T>() {
            return;
        }

        for (info, slot) in self.hops.iter_mut().zip(self.slots.iter_mut()) {
            if info.is_occupied() {
                info.clear_occupied();
                // SAFETY: the slot was occupied and its flag is now clear, so
                // it is dropped exactly once.
                unsafe { slot.assume_init_drop() };
            }
        }
    }

    /// Returns a double-ended iterator over all entries in physical slot
    /// order, followed by overflow entries.
    pub fn iter(&self) -> Iter<'_, T, N> {
        Iter {
            hops: self.hops.iter(),
            slots: self.slots.iter(),
            overflow: self.overflow.iter(),
            remaining: self.populated,
        }
    }

    /// Mutable variant of [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> IterMut<'_, T, N> {
        IterMut {
            hops: self.hops.iter(),
            slots: self.slots.iter_mut(),
            overflow: self.overflow.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Removes and yields every entry. Capacity is kept.
    pub fn drain(&mut self) -> Drain<'_, T, N> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Computes how far each slotted entry sits from its home bucket.
    #[cfg(any(test, feature = "stats"))]
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut distances = alloc::vec![0; N::HOP_WINDOW];
        for info in self.hops.iter() {
            let mut neighbors = info.neighbors();
            while neighbors != 0 {
                distances[neighbors.trailing_zeros() as usize] += 1;
                neighbors &= neighbors - 1;
            }
        }

        ProbeHistogram {
            distances,
            overflow: self.overflow.len(),
        }
    }

    /// Checks placement, bitmap and occupancy invariants, panicking on the
    /// first violation.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self, hasher: impl Fn(&T) -> u64) {
        assert!(self.capacity.is_power_of_two());
        assert_eq!(self.slot_count(), self.capacity + N::HOP_WINDOW);

        let mut occupied = 0;
        for index in 0..self.slot_count() {
            if !self.hops[index].is_occupied() {
                continue;
            }
            occupied += 1;

            // SAFETY: the slot is occupied.
            let value = unsafe { self.slots[index].assume_init_ref() };
            let home = self.bucket_of(hasher(value));
            assert!(
                home <= index && index - home < N::HOP_WINDOW,
                "slot {index} lies outside the neighborhood of bucket {home}"
            );
            assert!(
                self.hops[home].neighbor_bit(index - home),
                "bucket {home} does not record slot {index}"
            );
        }

        let recorded: usize = self
            .hops
            .iter()
            .map(|info| info.neighbor_count() as usize)
            .sum();
        assert_eq!(recorded, occupied, "stray neighbor bits");

        for (hash, value) in &self.overflow {
            assert_eq!(*hash, hasher(value));
        }
        assert_eq!(self.populated, occupied + self.overflow.len());
    }
}

/// Distribution of entry distances from their home buckets.
#[cfg(any(test, feature = "stats"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `distances[k]` is the number of entries stored `k` slots past their
    /// home bucket.
    pub distances: Vec<usize>,
    /// Entries held in the overflow list.
    pub overflow: usize,
}

#[cfg(any(test, feature = "stats"))]
impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.distances.iter().sum::<usize>() + self.overflow
    }

    /// Mean distance of slotted entries from their home bucket.
    pub fn mean_distance(&self) -> f64 {
        let slotted: usize = self.distances.iter().sum();
        if slotted == 0 {
            return 0.0;
        }
        let weighted: usize = self
            .distances
            .iter()
            .enumerate()
            .map(|(distance, count)| distance * count)
            .sum();
        weighted as f64 / slotted as f64
    }

    /// Pretty-print the histogram.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let total = self.total().max(1);
        println!("=== Probe Distance Histogram ===");
        for (distance, count) in self.distances.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            let pct = *count as f64 / total as f64 * 100.0;
            println!("{distance:>3}: {count:>9} ({pct:>6.2}%)");
        }
        println!("overflow: {}", self.overflow);
        println!("mean distance: {:.3}", self.mean_distance());
    }
}

/// A view into a single entry in a table, which may be vacant or occupied.
///
/// This enum is constructed from [`NeighborhoodTable::entry`].
pub enum Entry<'a, T, N: Neighborhood = DefaultNeighborhood> {
    /// An entry matching the predicate exists.
    Occupied(OccupiedEntry<'a, T, N>),
    /// No matching entry exists; room for one has been prepared.
    Vacant(VacantEntry<'a, T, N>),
}

impl<'a, T, N: Neighborhood> Entry<'a, T, N> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the stored value.
    pub fn or_insert(self, default: T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Like [`or_insert`](Self::or_insert), computing the value lazily.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a mut T {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Modifies an occupied entry in place.
    pub fn and_modify(self, f: impl FnOnce(&mut T)) -> Self {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }
}

impl<'a, T, N> Entry<'a, T, N>
where
    T: Default,
    N: Neighborhood,
{
    /// Inserts `T::default()` if the entry is vacant.
    pub fn or_default(self) -> &'a mut T {
        self.or_insert_with(T::default)
    }
}

/// A prepared, still empty location for a new entry.
pub struct VacantEntry<'a, T, N: Neighborhood = DefaultNeighborhood> {
    table: &'a mut NeighborhoodTable<T, N>,
    hash: u64,
    vacancy: Vacancy,
}

impl<'a, T, N: Neighborhood> VacantEntry<'a, T, N> {
    /// Inserts the value and returns a mutable reference to it.
    pub fn insert(self, value: T) -> &'a mut T {
        self.insert_full(value).1
    }

    /// Inserts the value and returns its position along with a mutable
    /// reference to it.
    pub fn insert_full(self, value: T) -> (usize, &'a mut T) {
        let VacantEntry {
            table,
            hash,
            vacancy,
        } = self;
        let position = table.occupy(hash, vacancy, value);
        (position, table.occupied_mut(position))
    }
}

/// A view of an entry already present in the table.
pub struct OccupiedEntry<'a, T, N: Neighborhood = DefaultNeighborhood> {
    table: &'a mut NeighborhoodTable<T, N>,
    index: usize,
}

impl<'a, T, N: Neighborhood> OccupiedEntry<'a, T, N> {
    /// Position of the entry.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Gets a reference to the entry.
    pub fn get(&self) -> &T {
        match self.table.get_at(self.index) {
            Some(value) => value,
            None => unreachable!("occupied entry points at an empty position"),
        }
    }

    /// Gets a mutable reference to the entry.
    pub fn get_mut(&mut self) -> &mut T {
        self.table.occupied_mut(self.index)
    }

    /// Converts into a mutable reference tied to the table borrow.
    pub fn into_mut(self) -> &'a mut T {
        let OccupiedEntry { table, index } = self;
        table.occupied_mut(index)
    }

    /// Removes the entry from the table and returns it.
    pub fn remove(self) -> T {
        let OccupiedEntry { table, index } = self;
        match table.remove_at(index) {
            Some(value) => value,
            None => unreachable!("occupied entry points at an empty position"),
        }
    }
}

/// An iterator over the entries of a [`NeighborhoodTable`].
///
/// Walks physical slots in increasing order (or decreasing order from the
/// back), then the overflow list.
pub struct Iter<'a, T, N: Neighborhood = DefaultNeighborhood> {
    hops: core::slice::Iter<'a, HopInfo<N::Word>>,
    slots: core::slice::Iter<'a, MaybeUninit<T>>,
    overflow: core::slice::Iter<'a, (u64, T)>,
    remaining: usize,
}

impl<'a, T, N: Neighborhood> Iterator for Iter<'a, T, N> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while let (Some(info), Some(slot)) = (self.hops.next(), self.slots.next()) {
            if info.is_occupied() {
                self.remaining -= 1;
                // SAFETY: the slot is occupied.
                return Some(unsafe { slot.assume_init_ref() });
            }
        }

        let (_, value) = self.overflow.next()?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, N: Neighborhood> DoubleEndedIterator for Iter<'_, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        if let Some((_, value)) = self.overflow.next_back() {
            self.remaining -= 1;
            return Some(value);
        }

        while let (Some(info), Some(slot)) = (self.hops.next_back(), self.slots.next_back()) {
            if info.is_occupied() {
                self.remaining -= 1;
                // SAFETY: the slot is occupied.
                return Some(unsafe { slot.assume_init_ref() });
            }
        }

        None
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for Iter<'_, T, N> {}

impl<T, N: Neighborhood> FusedIterator for Iter<'_, T, N> {}

/// A mutable iterator over the entries of a [`NeighborhoodTable`].
pub struct IterMut<'a, T, N: Neighborhood = DefaultNeighborhood> {
    hops: core::slice::Iter<'a, HopInfo<N::Word>>,
    slots: core::slice::IterMut<'a, MaybeUninit<T>>,
    overflow: core::slice::IterMut<'a, (u64, T)>,
    remaining: usize,
}

impl<'a, T, N: Neighborhood> Iterator for IterMut<'a, T, N> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        while let (Some(info), Some(slot)) = (self.hops.next(), self.slots.next()) {
            if info.is_occupied() {
                self.remaining -= 1;
                // SAFETY: the slot is occupied.
                return Some(unsafe { slot.assume_init_mut() });
            }
        }

        let (_, value) = self.overflow.next()?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, N: Neighborhood> DoubleEndedIterator for IterMut<'_, T, N> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        if let Some((_, value)) = self.overflow.next_back() {
            self.remaining -= 1;
            return Some(value);
        }

        while let (Some(info), Some(slot)) = (self.hops.next_back(), self.slots.next_back()) {
            if info.is_occupied() {
                self.remaining -= 1;
                // SAFETY: the slot is occupied.
                return Some(unsafe { slot.assume_init_mut() });
            }
        }

        None
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for IterMut<'_, T, N> {}

impl<T, N: Neighborhood> FusedIterator for IterMut<'_, T, N> {}

/// A draining iterator over the entries of a [`NeighborhoodTable`].
///
/// Entries not yet yielded are removed when the iterator is dropped.
pub struct Drain<'a, T, N: Neighborhood = DefaultNeighborhood> {
    table: &'a mut NeighborhoodTable<T, N>,
    index: usize,
}

impl<T, N: Neighborhood> Iterator for Drain<'_, T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        take_next(self.table, &mut self.index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<T, N: Neighborhood> Drop for Drain<'_, T, N> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for Drain<'_, T, N> {}

impl<T, N: Neighborhood> FusedIterator for Drain<'_, T, N> {}

/// An owning iterator over the entries of a [`NeighborhoodTable`].
pub struct IntoIter<T, N: Neighborhood = DefaultNeighborhood> {
    table: NeighborhoodTable<T, N>,
    index: usize,
}

impl<T, N: Neighborhood> Iterator for IntoIter<T, N> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        take_next(&mut self.table, &mut self.index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.len(), Some(self.table.len()))
    }
}

impl<T, N: Neighborhood> ExactSizeIterator for IntoIter<T, N> {}

impl<T, N: Neighborhood> FusedIterator for IntoIter<T, N> {}

impl<T, N: Neighborhood> IntoIterator for NeighborhoodTable<T, N> {
    type IntoIter = IntoIter<T, N>;
    type Item = T;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            table: self,
            index: 0,
        }
    }
}

impl<'a, T, N: Neighborhood> IntoIterator for &'a NeighborhoodTable<T, N> {
    type IntoIter = Iter<'a, T, N>;
    type Item = &'a T;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Removes the next occupied slot at or after `*index`, then falls back to
/// the overflow list.
fn take_next<T, N: Neighborhood>(
    table: &mut NeighborhoodTable<T, N>,
    index: &mut usize,
) -> Option<T> {
    if table.is_empty() {
        return None;
    }

    while *index < table.slot_count() {
        let current = *index;
        *index += 1;
        if table.hops[current].is_occupied() {
            return table.remove_at(current);
        }
    }

    let (_, value) = table.overflow.pop()?;
    table.populated -= 1;
    Some(value)
}
