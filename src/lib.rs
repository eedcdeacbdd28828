//! An ordered map backed by one contiguous sorted array split into two runs.
//!
//! [`SquareMap`] sits between a node-based tree and a flat sorted vector:
//! lookups cost O(log n) comparisons against cache-friendly contiguous
//! storage, and insertions at arbitrary positions cost O(√n) amortised
//! element moves instead of the vector's O(n). The trick is keeping recent
//! insertions in a small second sorted run at the tail of the array and
//! merging it back into the main run only once it outgrows its budget.
//!
//! ```
//! use squaremap::SquareMap;
//!
//! let mut map = SquareMap::new();
//! map.insert(3, "three");
//! map.insert(1, "one");
//! map.insert(2, "two");
//!
//! assert_eq!(map.get(&2), Some(&"two"));
//! let keys: Vec<u32> = map.keys().copied().collect();
//! assert_eq!(keys, [1, 2, 3]);
//! ```
//!
//! Keys are ordered by their [`Ord`] implementation. Erasing a key buried in
//! the bulk of the array is also cheap; see [`SquareMap::remove`] for the
//! marker scheme and the extra bounds it needs.

#![deny(missing_docs)]

mod algo;
mod iter;
mod map;

pub use iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use map::{Entry, OccupiedEntry, SquareMap, VacantEntry};
