use std::borrow::Borrow;
use std::fmt::{self, Debug};
use std::ops::Index;

use crate::algo::{compact_equal_neighbors, merge_with_binary_search};
use crate::iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};

/// An ordered map over a single contiguous array of key-value slots.
///
/// The slot array holds at most two sorted runs, separated by a split index:
/// the left run `[0, split)` and the right run `[split, len)`. A flat map has
/// `split == 0` and is just a sorted array. Insertions go into the (small)
/// right run; once the right run grows past its budget the runs are merged
/// back into one. This keeps insertion at O(√n) amortised element moves and
/// O(log n) comparisons, against O(n) moves for a plain sorted array and a
/// pointer chase per element for a node-based tree.
///
/// Erasing a key that sits strictly inside the left run does not shift the
/// left run. Instead a second copy of the key is inserted into the right run;
/// a key present in both runs counts as erased, and iteration skips the pair.
/// The pairs are physically removed on the next merge. Because the marker
/// carries a default value and its own copy of the key, [`remove`] requires
/// `K: Clone` and `V: Default`.
///
/// Any structural mutation invalidates cursors, which the borrow checker
/// enforces.
///
/// [`remove`]: SquareMap::remove
#[derive(Clone)]
pub struct SquareMap<K, V> {
    container: Vec<(K, V)>,
    split: usize,
    erased: usize,
}

impl<K, V> Default for SquareMap<K, V> {
    fn default() -> Self {
        SquareMap {
            container: Vec::new(),
            split: 0,
            erased: 0,
        }
    }
}

impl<K, V> SquareMap<K, V>
where
    K: Ord,
{
    /// Below this distance from the end, an insertion just shifts the right
    /// run instead of considering a merge.
    #[cfg(debug_assertions)]
    pub const MIN_SPLIT_LEN: usize = 5;
    /// Below this distance from the end, an insertion just shifts the right
    /// run instead of considering a merge.
    #[cfg(not(debug_assertions))]
    pub const MIN_SPLIT_LEN: usize = 50;

    /// Makes an empty map.
    pub fn new() -> Self {
        SquareMap {
            container: Vec::new(),
            split: 0,
            erased: 0,
        }
    }

    /// Makes an empty map with room for `capacity` slots.
    pub fn with_capacity(capacity: usize) -> Self {
        SquareMap {
            container: Vec::with_capacity(capacity),
            split: 0,
            erased: 0,
        }
    }

    /// Number of live entries. Slots spent on erased-key pairs don't count.
    pub fn len(&self) -> usize {
        self.container.len() - 2 * self.erased
    }

    /// True if the map holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots the backing array can hold without reallocating.
    pub fn capacity(&self) -> usize {
        self.container.capacity()
    }

    /// Reserves room for at least `additional` more slots.
    pub fn reserve(&mut self, additional: usize) {
        self.container.reserve(additional);
    }

    /// Drops excess backing capacity.
    pub fn shrink_to_fit(&mut self) {
        self.container.shrink_to_fit();
    }

    /// Removes all entries.
    pub fn clear(&mut self) {
        self.container.clear();
        self.split = 0;
        self.erased = 0;
    }

    /// Lower bounds for `key` in both runs, plus whether each run holds the
    /// key. Present in exactly one run means live; in both means erased.
    fn search<Q>(&self, key: &Q) -> (usize, usize, bool, bool)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let len = self.container.len();
        let s = self.split;
        let (left, right) = self.container.split_at(s);
        let l = left.partition_point(|(k, _)| k.borrow() < key);
        let r = s + right.partition_point(|(k, _)| k.borrow() < key);
        let in_left = l < s && self.container[l].0.borrow() == key;
        let in_right = r < len && self.container[r].0.borrow() == key;
        (l, r, in_left, in_right)
    }

    /// Container index of the live slot for `key`, if any.
    fn locate<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.search(key) {
            (l, _, true, false) => Some(l),
            (_, r, false, true) => Some(r),
            _ => None,
        }
    }

    /// Returns a reference to the value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).map(|i| &self.container[i].1)
    }

    /// Returns the stored entry for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).map(|i| {
            let (k, v) = &self.container[i];
            (k, v)
        })
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.locate(key) {
            Some(i) => Some(&mut self.container[i].1),
            None => None,
        }
    }

    /// True if the map holds a live entry for `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.locate(key).is_some()
    }

    /// Cursor positioned at `key`, yielding it and every later entry in key
    /// order. Empty if `key` is absent (or erased).
    pub fn find<Q>(&self, key: &Q) -> Iter<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (l, r, in_left, in_right) = self.search(key);
        if in_left == in_right {
            return Iter::empty();
        }
        // The found slot heads its run's remainder; the other remainder
        // starts at the next strictly larger key of the opposite run.
        let (left, right) = self.container.split_at(self.split);
        Iter::new(&left[l..], &right[r - self.split..])
    }

    /// Entry with the smallest key, if any.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.iter().next()
    }

    /// Entry with the largest key, if any.
    ///
    /// O(1): the largest live key always occupies the last slot.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        if self.is_empty() {
            return None;
        }
        let (k, v) = self.container.last().unwrap();
        Some((k, v))
    }

    /// Inserts `value` under `key`, returning the previous value if the key
    /// was live. Re-inserting an erased key behaves like inserting a fresh
    /// one: the stale slot is revived in place and `None` is returned.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.insert_inner(key, value).1
    }

    /// The insertion path proper. Returns the container index of the slot
    /// now holding `value`, plus the displaced value for a live overwrite.
    fn insert_inner(&mut self, key: K, value: V) -> (usize, Option<V>) {
        let len = self.container.len();
        let s = self.split;
        let (l, r, in_left, in_right) = self.search(&key);

        if in_left {
            if in_right {
                // Key was erased: drop the right-run marker and revive the
                // left slot. Its old value is logically long gone.
                self.container.remove(r);
                self.erased -= 1;
                self.container[l].1 = value;
                // Removing the first right-run slot can leave the runs
                // jointly sorted, in which case the split is moot, or expose
                // another marker pair tied across the boundary.
                if self.container[self.split - 1].0 < self.container[self.split].0 {
                    debug_assert_eq!(self.erased, 0);
                    self.split = 0;
                } else if self.container[self.split - 1].0 == self.container[self.split].0 {
                    self.merge();
                    // The revived slot moved; look it up again in the flat run.
                    let idx = self.container.partition_point(|(k, _)| *k < key);
                    return (idx, None);
                }
                return (l, None);
            }
            let old = std::mem::replace(&mut self.container[l].1, value);
            return (l, Some(old));
        }
        if in_right {
            let old = std::mem::replace(&mut self.container[r].1, value);
            return (r, Some(old));
        }

        // New key, to be inserted into the right run at r. Shift if the
        // shift is short or the grown right run stays within its budget.
        let move_distance = len - r;
        let right_len = len - s;
        if move_distance < Self::MIN_SPLIT_LEN || 4 * right_len * right_len < s {
            self.container.insert(r, (key, value));
            return (r, None);
        }

        // The shift would be too long: flatten, then open a fresh right run
        // holding just the new key. The largest key is already in the last
        // slot, so inserting immediately before it keeps both runs sorted.
        self.merge();
        let pos = self.container.len() - 1;
        self.container.insert(pos, (key, value));
        self.split = pos;
        (pos, None)
    }

    /// Removes `key`, returning its value if it was live.
    ///
    /// Erasing a key strictly inside the left run plants a `(key, default)`
    /// marker in the right run instead of shifting the left run, which is
    /// why the bounds ask for `K: Clone` and `V: Default`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q> + Clone,
        Q: Ord + ?Sized,
        V: Default,
    {
        self.locate(key).map(|p| self.erase_at(p))
    }

    /// Erases the live slot at container index `p`.
    fn erase_at(&mut self, p: usize) -> V
    where
        K: Clone,
        V: Default,
    {
        if self.split == 0 {
            return self.container.remove(p).1;
        }

        if p + 1 >= self.split {
            // Right run, or the last slot of the left run: shift-erase.
            let (_, value) = self.container.remove(p);
            if p < self.split {
                self.split -= 1;
            }
            let n = self.container.len();
            if self.split == 0 || self.split >= n {
                // One of the runs emptied out; its erased pairs went with it.
                debug_assert_eq!(self.erased, 0);
                self.split = 0;
            } else if self.container[self.split - 1].0 < self.container[self.split].0 {
                // The runs are now jointly sorted, so the split is moot.
                // A cross-run duplicate would contradict joint sortedness.
                debug_assert_eq!(self.erased, 0);
                self.split = 0;
            } else if self.container[self.split - 1].0 == self.container[self.split].0 {
                // The boundary slots tie: an earlier interior erase planted a
                // marker pair whose two halves have become adjacent across
                // the boundary. Collapse it by flattening.
                self.merge();
            } else if p == n && self.container[n - 1].0 <= self.container[self.split - 1].0 {
                // Erasing the largest key left a last slot that no longer
                // dominates the left run (it may even be an erased marker for
                // the left run's last key); restore the max-is-last invariant.
                self.merge();
            }
            return value;
        }

        // Strictly inside the left run: plant an erased-key marker in the
        // right run and leave the left run untouched.
        let key = self.container[p].0.clone();
        let value = std::mem::replace(&mut self.container[p].1, V::default());
        let r = self.split + self.container[self.split..].partition_point(|(k, _)| *k < key);
        self.container.insert(r, (key, V::default()));
        self.erased += 1;
        if self.erased * self.erased > self.container.len() {
            self.merge();
        }
        value
    }

    /// Reduces the map to a single flat sorted run, dropping every
    /// erased-key pair. Idempotent. O(n) moves, O(√n · log n) comparisons.
    pub fn merge(&mut self) {
        if self.split == 0 {
            return;
        }
        let split = self.split;
        merge_with_binary_search(&mut self.container, split, |a, b| a.0 < b.0);
        self.split = 0;
        if self.erased > 0 {
            compact_equal_neighbors(&mut self.container, |a, b| a.0 < b.0);
            self.erased = 0;
        }
    }

    /// Consumes the map and hands back the backing array as-is, erased-key
    /// pairs included.
    pub fn into_vec(self) -> Vec<(K, V)> {
        self.container
    }

    /// Adopts `container` as the backing array of a flat map.
    ///
    /// The slots must be strictly increasing by key; this is not
    /// re-validated.
    pub fn replace(&mut self, container: Vec<(K, V)>) {
        self.container = container;
        self.split = 0;
        self.erased = 0;
    }

    /// Adopts `container` with a split at index `split` (`split >= len`
    /// means flat).
    ///
    /// Both runs must be strictly increasing by key, the first right-run key
    /// smaller than the last left-run key, the last slot largest of all, and
    /// no key present in both runs; none of this is re-validated.
    pub fn replace_with_split(&mut self, container: Vec<(K, V)>, split: usize) {
        self.split = if split >= container.len() { 0 } else { split };
        self.container = container;
        self.erased = 0;
    }

    /// Cursor at the first slot of the right run, empty when the map is
    /// flat (or when that slot happens to hold an erased key).
    pub fn split_point(&self) -> Iter<'_, K, V> {
        if self.split == 0 || self.split >= self.container.len() {
            return Iter::empty();
        }
        self.find(&self.container[self.split].0)
    }

    /// Iterates the live entries in strictly increasing key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let (left, right) = self.container.split_at(self.split);
        Iter::new(left, right)
    }

    /// Iterates the live entries with mutable values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        let (left, right) = self.container.split_at_mut(self.split);
        IterMut::new(left, right)
    }

    /// Iterates the live keys in increasing order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Iterates the live values in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Iterates the live values mutably in key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut(self.iter_mut())
    }

    /// Entry for `key`, for in-place inspection or insertion.
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V> {
        match self.locate(&key) {
            Some(index) => Entry::Occupied(OccupiedEntry { map: self, index }),
            None => Entry::Vacant(VacantEntry { map: self, key }),
        }
    }

    /// Panics unless the internal structure is coherent: both runs strictly
    /// sorted, the split necessary, the largest key last, and the erased
    /// counter matching the cross-run duplicates. Intended for tests and
    /// fuzzing.
    ///
    /// The relative run sizes are deliberately not constrained: repeatedly
    /// erasing the largest left-run key can make the left run arbitrarily
    /// small.
    pub fn validate(&self) {
        let n = self.container.len();
        let strictly_sorted =
            |run: &[(K, V)]| run.windows(2).all(|w| w[0].0 < w[1].0);

        if self.split == 0 {
            assert_eq!(self.erased, 0, "flat map with erased slots");
            assert!(strictly_sorted(&self.container), "flat run out of order");
            return;
        }

        assert!(self.split < n, "split index out of range");
        let (left, right) = self.container.split_at(self.split);
        assert!(strictly_sorted(left), "left run out of order");
        assert!(strictly_sorted(right), "right run out of order");
        assert!(
            right[0].0 < left[left.len() - 1].0,
            "split without overlap between runs"
        );
        assert!(
            right[right.len() - 1].0 > left[left.len() - 1].0,
            "largest key is not in the last slot"
        );
        let duplicates = right
            .iter()
            .filter(|(k, _)| left.binary_search_by(|(lk, _)| lk.cmp(k)).is_ok())
            .count();
        assert_eq!(duplicates, self.erased, "erased counter out of sync");
    }

    /// Container index of the split. Test hook.
    #[doc(hidden)]
    pub fn split_index(&self) -> usize {
        self.split
    }

    /// Number of erased-key pairs currently in the backing array. Test hook.
    #[doc(hidden)]
    pub fn erased_len(&self) -> usize {
        self.erased
    }
}

/// A view into a single map slot, occupied or vacant.
pub enum Entry<'a, K, V> {
    /// No live entry under the key.
    Vacant(VacantEntry<'a, K, V>),
    /// A live entry under the key.
    Occupied(OccupiedEntry<'a, K, V>),
}

/// View into a map slot without a live entry.
pub struct VacantEntry<'a, K, V> {
    map: &'a mut SquareMap<K, V>,
    key: K,
}

/// View into a map slot holding a live entry.
pub struct OccupiedEntry<'a, K, V> {
    map: &'a mut SquareMap<K, V>,
    index: usize,
}

impl<'a, K: Ord, V> Entry<'a, K, V> {
    /// Inserts `default` if vacant; returns a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if vacant; returns a mutable
    /// reference to the value.
    pub fn or_insert_with<F: FnOnce() -> V>(self, default: F) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Inserts the default value if vacant; returns a mutable reference to
    /// the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(V::default)
    }

    /// The entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K: Ord, V> VacantEntry<'a, K, V> {
    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let (index, _) = self.map.insert_inner(self.key, value);
        &mut self.map.container[index].1
    }

    /// The key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes the key back.
    pub fn into_key(self) -> K {
        self.key
    }
}

impl<'a, K: Ord, V> OccupiedEntry<'a, K, V> {
    /// The entry's key.
    pub fn key(&self) -> &K {
        &self.map.container[self.index].0
    }

    /// The entry's value.
    pub fn get(&self) -> &V {
        &self.map.container[self.index].1
    }

    /// The entry's value, mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.map.container[self.index].1
    }

    /// The entry's value, mutably, for the map's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.map.container[self.index].1
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(&mut self.map.container[self.index].1, value)
    }

    /// Removes the entry, returning its value.
    pub fn remove(self) -> V
    where
        K: Clone,
        V: Default,
    {
        self.map.erase_at(self.index)
    }
}

impl<K: Ord + Debug, V: Debug> Debug for SquareMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Ord, V: PartialEq> PartialEq for SquareMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Ord, V: Eq> Eq for SquareMap<K, V> {}

impl<K, V, Q> Index<&Q> for SquareMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// # Panics
    ///
    /// Panics if the key is absent (or erased).
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for SquareMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SquareMap::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for SquareMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K: Ord, V, const N: usize> From<[(K, V); N]> for SquareMap<K, V> {
    fn from(arr: [(K, V); N]) -> Self {
        arr.into_iter().collect()
    }
}

impl<K: Ord, V> IntoIterator for SquareMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    /// Flattens once, then streams the plain sorted vector.
    fn into_iter(mut self) -> IntoIter<K, V> {
        self.merge();
        IntoIter(self.container.into_iter())
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a SquareMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a mut SquareMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> IterMut<'a, K, V> {
        self.iter_mut()
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::SquareMap;
    use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, SerializeMap, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    impl<K, V> Serialize for SquareMap<K, V>
    where
        K: Ord + Serialize,
        V: Serialize,
    {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (k, v) in self {
                map.serialize_entry(k, v)?;
            }
            map.end()
        }
    }

    struct SquareMapVisitor<K, V>(PhantomData<(K, V)>);

    impl<'de, K, V> Visitor<'de> for SquareMapVisitor<K, V>
    where
        K: Ord + Deserialize<'de>,
        V: Deserialize<'de>,
    {
        type Value = SquareMap<K, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = SquareMap::with_capacity(access.size_hint().unwrap_or(0));
            while let Some((k, v)) = access.next_entry()? {
                map.insert(k, v);
            }
            Ok(map)
        }
    }

    impl<'de, K, V> Deserialize<'de> for SquareMap<K, V>
    where
        K: Ord + Deserialize<'de>,
        V: Deserialize<'de>,
    {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(SquareMapVisitor(PhantomData))
        }
    }
}
