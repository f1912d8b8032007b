//! Bounded per-frame cache.
//!
//! Holds the most recently computed values keyed by frame. When the
//! capacity is exceeded the entry with the numerically smallest frame is
//! evicted. This matches least-recently-used only while callers walk
//! frames in non-decreasing order; other access patterns cost extra
//! recomputation, never wrong results.
//!
//! The cache itself is not synchronized. Owners wrap it in a
//! `parking_lot::Mutex` or `RwLock`.

use std::collections::BTreeMap;

use super::Frame;

/// Frame-keyed cache with smallest-key eviction.
#[derive(Clone, Debug)]
pub struct FrameCache<V> {
    entries: BTreeMap<Frame, V>,
    capacity: usize,
}

impl<V: Clone> FrameCache<V> {
    /// Create a cache retaining at most `capacity` frames (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Get a cached value.
    #[inline]
    pub fn get(&self, frame: Frame) -> Option<V> {
        self.entries.get(&frame).cloned()
    }

    /// Insert or replace the value for a frame.
    ///
    /// Returns the evicted frame, if the insert pushed the cache over
    /// capacity.
    pub fn insert(&mut self, frame: Frame, value: V) -> Option<Frame> {
        self.entries.insert(frame, value);
        if self.entries.len() > self.capacity {
            return self.entries.pop_first().map(|(evicted, _)| evicted);
        }
        None
    }

    /// Clear the entire cache.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resident frames in ascending order.
    pub fn frames(&self) -> Vec<Frame> {
        self.entries.keys().copied().collect()
    }

    /// Get the number of cached frames.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if cache is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of retained frames.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_cache_insert_get() {
        let mut cache = FrameCache::new(3);
        cache.insert(10, "ten");

        assert_eq!(cache.get(10), Some("ten"));
        assert!(cache.get(11).is_none());
        assert_eq!(cache.frames(), vec![10]);
    }

    #[test]
    fn test_cache_evicts_smallest_frame() {
        let mut cache = FrameCache::new(3);
        assert_eq!(cache.insert(1, 1), None);
        assert_eq!(cache.insert(2, 2), None);
        assert_eq!(cache.insert(3, 3), None);
        assert_eq!(cache.insert(4, 4), Some(1));

        assert_eq!(cache.frames(), vec![2, 3, 4]);
    }

    #[test]
    fn test_cache_backwards_access_evicts_new_key() {
        // Walking backwards inserts the smallest key, which goes straight out.
        let mut cache = FrameCache::new(2);
        cache.insert(10, ());
        cache.insert(9, ());
        assert_eq!(cache.insert(8, ()), Some(8));
        assert_eq!(cache.frames(), vec![9, 10]);
    }

    #[test]
    fn test_cache_replace_does_not_evict() {
        let mut cache = FrameCache::new(2);
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.insert(2, "c"), None);
        assert_eq!(cache.get(2), Some("c"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicted_values_stay_alive() {
        let mut cache = FrameCache::new(1);
        let held = Arc::new(vec![1.0f32, 2.0]);
        cache.insert(1, Arc::clone(&held));
        cache.insert(2, Arc::new(vec![]));

        assert!(cache.get(1).is_none());
        assert_eq!(*held, vec![1.0, 2.0]);
        assert_eq!(Arc::strong_count(&held), 1);
    }

    #[test]
    fn test_cache_clear_and_capacity() {
        let mut cache = FrameCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(5, 5);
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(5), None);
    }
}
