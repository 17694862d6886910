//! Binary heap with an injected comparator
//!
//! Used as the frontier of the weighted expansion. Unlike
//! `std::collections::BinaryHeap`, the ordering comes from a closure rather
//! than an `Ord` impl, and the sift-down after an extraction can be deferred.

use std::cmp::Ordering;

/// Min-heap under a caller-supplied comparator
///
/// The item for which `compare` returns `Less` against every other item is
/// the top. After `extract_top(false)` the heap is left unbalanced until the
/// next `insert`, `extract_top`, `peek` or explicit `rebalance`.
///
/// # Example
///
/// ```
/// use biome_regions::PriorityQueue;
///
/// let mut queue = PriorityQueue::new(|a: &u32, b: &u32| a.cmp(b));
/// for n in [5, 1, 4, 2] {
///     queue.insert(n);
/// }
/// assert_eq!(queue.extract_top(true), Some(1));
/// assert_eq!(queue.extract_top(false), Some(2));
/// assert_eq!(queue.peek(), Some(&4));
/// ```
pub struct PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    items: Vec<T>,
    compare: F,
    pending: bool,
}

impl<T, F> PriorityQueue<T, F>
where
    F: Fn(&T, &T) -> Ordering,
{
    /// Create an empty queue ordered by `compare`
    pub fn new(compare: F) -> Self {
        Self {
            items: Vec::new(),
            compare,
            pending: false,
        }
    }

    /// Create an empty queue with room for `capacity` items
    pub fn with_capacity(capacity: usize, compare: F) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            compare,
            pending: false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add an item, sifting it up to its place
    pub fn insert(&mut self, item: T) {
        self.rebalance();
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    /// Remove and return the top item, `None` when empty
    ///
    /// With `rebalance` false the sift-down is postponed, so a burst of
    /// extractions that ends in an insert pays for one repair instead of two.
    pub fn extract_top(&mut self, rebalance: bool) -> Option<T> {
        self.rebalance();
        if self.items.is_empty() {
            return None;
        }
        let top = self.items.swap_remove(0);
        if rebalance {
            self.sift_down(0);
        } else {
            self.pending = !self.items.is_empty();
        }
        Some(top)
    }

    /// The current top item, repairing a deferred extraction first
    pub fn peek(&mut self) -> Option<&T> {
        self.rebalance();
        self.items.first()
    }

    /// Apply a deferred sift-down, if any
    pub fn rebalance(&mut self) {
        if self.pending {
            self.pending = false;
            self.sift_down(0);
        }
    }

    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;
            if (self.compare)(&self.items[index], &self.items[parent]) != Ordering::Less {
                break;
            }
            self.items.swap(index, parent);
            index = parent;
        }
    }

    fn sift_down(&mut self, mut index: usize) {
        let len = self.items.len();
        loop {
            let left = 2 * index + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && (self.compare)(&self.items[right], &self.items[left]) == Ordering::Less {
                child = right;
            }
            if (self.compare)(&self.items[child], &self.items[index]) != Ordering::Less {
                break;
            }
            self.items.swap(index, child);
            index = child;
        }
    }
}
