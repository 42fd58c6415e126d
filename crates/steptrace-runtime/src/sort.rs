//! Sorting and binary heaps over a fallible comparison.
//!
//! Comparing two runtime values may run user code (`__lt__`) and may raise,
//! so neither `slice::sort_by` nor `BinaryHeap` fits. Callers copy items out
//! of the container, sort or sift the copy, and write it back, so no
//! container borrow is held while user code runs.

use crate::error::RtResult;

/// Stable merge sort; `less(a, b)` is `a < b`.
pub(crate) fn merge_sort<T, F>(mut items: Vec<T>, less: &mut F) -> RtResult<Vec<T>>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, less)?;
    let right = merge_sort(right, less)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        // Ties take from the left run, which keeps the sort stable.
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => less(r, l)?,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    Ok(out)
}

/// Moves the item at `pos` toward the root until its parent is not greater.
fn sift_down<T: Clone, F>(heap: &mut [T], start: usize, mut pos: usize, less: &mut F) -> RtResult<()>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    let item = heap[pos].clone();
    while pos > start {
        let parent = (pos - 1) >> 1;
        if less(&item, &heap[parent])? {
            heap[pos] = heap[parent].clone();
            pos = parent;
            continue;
        }
        break;
    }
    heap[pos] = item;
    Ok(())
}

/// Moves the item at `pos` down to a leaf along the smaller children, then
/// back up into place.
fn sift_up<T: Clone, F>(heap: &mut [T], mut pos: usize, less: &mut F) -> RtResult<()>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    let end = heap.len();
    let start = pos;
    let item = heap[pos].clone();
    let mut child = 2 * pos + 1;
    while child < end {
        let right = child + 1;
        if right < end && !less(&heap[child], &heap[right])? {
            child = right;
        }
        heap[pos] = heap[child].clone();
        pos = child;
        child = 2 * pos + 1;
    }
    heap[pos] = item;
    sift_down(heap, start, pos, less)
}

pub(crate) fn heap_push<T: Clone, F>(heap: &mut Vec<T>, item: T, less: &mut F) -> RtResult<()>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    heap.push(item);
    let last = heap.len() - 1;
    sift_down(heap, 0, last, less)
}

pub(crate) fn heap_pop<T: Clone, F>(heap: &mut Vec<T>, less: &mut F) -> RtResult<Option<T>>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    let Some(last) = heap.pop() else {
        return Ok(None);
    };
    if heap.is_empty() {
        return Ok(Some(last));
    }
    let top = std::mem::replace(&mut heap[0], last);
    sift_up(heap, 0, less)?;
    Ok(Some(top))
}

pub(crate) fn heapify<T: Clone, F>(heap: &mut [T], less: &mut F) -> RtResult<()>
where
    F: FnMut(&T, &T) -> RtResult<bool>,
{
    for pos in (0..heap.len() / 2).rev() {
        sift_up(heap, pos, less)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lt(a: &i32, b: &i32) -> RtResult<bool> {
        Ok(a < b)
    }

    #[test]
    fn merge_sort_is_stable() {
        let items = vec![(2, 'a'), (1, 'b'), (2, 'c'), (1, 'd')];
        let sorted = merge_sort(items, &mut |a: &(i32, char), b: &(i32, char)| Ok(a.0 < b.0)).unwrap();
        assert_eq!(sorted, vec![(1, 'b'), (1, 'd'), (2, 'a'), (2, 'c')]);
    }

    #[test]
    fn comparison_errors_propagate() {
        let result = merge_sort(vec![3, 1, 2], &mut |_: &i32, _: &i32| {
            crate::error::raise(crate::error::ExcKind::TypeError, "boom")
        });
        assert!(result.is_err());
    }

    #[test]
    fn heap_matches_reference_layout() {
        // heapq.heapify([5, 3, 8, 1, 9, 2]) == [1, 3, 2, 5, 9, 8]
        let mut heap = vec![5, 3, 8, 1, 9, 2];
        heapify(&mut heap, &mut lt).unwrap();
        assert_eq!(heap, vec![1, 3, 2, 5, 9, 8]);
    }

    proptest! {
        #[test]
        fn merge_sort_sorts(items in proptest::collection::vec(-100i32..100, 0..64)) {
            let sorted = merge_sort(items.clone(), &mut lt).unwrap();
            let mut expected = items;
            expected.sort();
            prop_assert_eq!(sorted, expected);
        }

        #[test]
        fn heap_pops_in_order(items in proptest::collection::vec(-100i32..100, 0..64)) {
            let mut heap = Vec::new();
            for item in &items {
                heap_push(&mut heap, *item, &mut lt).unwrap();
            }
            let mut popped = Vec::new();
            while let Some(item) = heap_pop(&mut heap, &mut lt).unwrap() {
                popped.push(item);
            }
            let mut expected = items;
            expected.sort();
            prop_assert_eq!(popped, expected);
        }
    }
}
