//! The two array algorithms the map is built on: a stable merge tuned for a
//! small right run, and a compaction that drops *all* members of every
//! equal-key run.

use std::ptr;

/// Merges the two adjacent sorted runs `v[..middle]` and `v[middle..]` into
/// one sorted range, stably: elements that compare equal keep their relative
/// order, with left-run elements before right-run ones.
///
/// Optimized for a right run much smaller than the left. With `l = middle`
/// and `r = v.len() - middle`, the cost is `O(r log l)` comparisons,
/// `O(l + r)` element moves and `O(r)` scratch space.
///
/// All comparisons are performed up front; if `is_less` panics, `v` has not
/// been modified.
pub(crate) fn merge_with_binary_search<T, F>(v: &mut [T], middle: usize, mut is_less: F)
where
    F: FnMut(&T, &T) -> bool,
{
    let len = v.len();
    if middle == 0 || middle == len {
        return;
    }
    let right_len = len - middle;

    // Upper-bound position in the left run for each right-run element. The
    // right run is sorted, so these are non-decreasing, and searching the
    // full left run gives the same index as the shrinking-boundary search a
    // one-pass merge would do.
    let (left, right) = v.split_at(middle);
    let positions: Vec<usize> = right
        .iter()
        .map(|b| left.partition_point(|a| !is_less(b, a)))
        .collect();

    // Backward gap walk. The scratch buffer is raw storage only: its length
    // stays zero, so it never owns (or drops) any element. No user code runs
    // past this point.
    let mut buffer: Vec<T> = Vec::with_capacity(right_len);
    unsafe {
        let p = v.as_mut_ptr();
        let buf = buffer.as_mut_ptr();
        // Safety: buffer capacity is right_len; the source slots become the
        // gap and are overwritten before anything reads them again.
        ptr::copy_nonoverlapping(p.add(middle), buf, right_len);

        let mut dst = len; // One past the next slot to fill.
        let mut mid = middle; // End of the not-yet-moved part of the left run.
        for i in (0..right_len).rev() {
            let pos = positions[i];
            let block = mid - pos;
            // Safety: pos <= mid <= dst - block within the original slice.
            ptr::copy(p.add(pos), p.add(dst - block), block);
            dst -= block + 1;
            ptr::copy_nonoverlapping(buf.add(i), p.add(dst), 1);
            mid = pos;
        }
        debug_assert_eq!(dst, mid);
    }
}

/// Removes every element that belongs to a run of equal neighbors from the
/// sorted vector `v`, keeping only elements whose key occurred exactly once.
///
/// This is not `dedup`: a duplicated element loses *all* its copies. In the
/// map, a key present in both runs marks an erasure, and after merging the
/// two copies land adjacent; both have to go.
///
/// `O(n)` comparisons; moves only happen from the first duplicate onward.
pub(crate) fn compact_equal_neighbors<T, F>(v: &mut Vec<T>, mut is_less: F)
where
    F: FnMut(&T, &T) -> bool,
{
    let n = v.len();
    let mut read = 0;
    let mut write = 0;
    while read < n {
        let mut run_end = read + 1;
        while run_end < n && !is_less(&v[read], &v[run_end]) {
            run_end += 1;
        }
        if run_end - read == 1 {
            if write != read {
                v.swap(write, read);
            }
            write += 1;
        }
        read = run_end;
    }
    v.truncate(write);
}
