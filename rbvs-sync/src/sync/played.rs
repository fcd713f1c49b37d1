//! Play-once cache
//!
//! Remembers the most recently played video ids so the same video is not
//! started twice in a session. Capacity is bounded; when a new id would
//! exceed it, the oldest-inserted id is evicted.

use std::collections::{HashSet, VecDeque};

/// Default number of remembered ids
pub const PLAYED_CAPACITY: usize = 10;

/// Bounded FIFO set of played video ids
#[derive(Debug, Clone)]
pub struct PlayedSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    capacity: usize,
}

impl PlayedSet {
    pub fn new() -> Self {
        Self::with_capacity(PLAYED_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity + 1),
            members: HashSet::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn contains(&self, video_id: &str) -> bool {
        self.members.contains(video_id)
    }

    /// Record `video_id` as played
    ///
    /// Returns the evicted id, if inserting pushed the set over capacity.
    /// Re-inserting a known id changes nothing.
    pub fn insert(&mut self, video_id: impl Into<String>) -> Option<String> {
        let video_id = video_id.into();
        if !self.members.insert(video_id.clone()) {
            return None;
        }
        self.order.push_back(video_id);

        if self.order.len() > self.capacity {
            let evicted = self.order.pop_front()?;
            self.members.remove(&evicted);
            return Some(evicted);
        }
        None
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for PlayedSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_exceeds_capacity() {
        let mut played = PlayedSet::new();
        for i in 0..25 {
            played.insert(format!("id-{}", i));
            assert!(played.len() <= PLAYED_CAPACITY);
        }
        assert_eq!(played.len(), PLAYED_CAPACITY);
    }

    #[test]
    fn test_eleventh_insert_evicts_oldest() {
        let mut played = PlayedSet::new();
        for i in 0..10 {
            assert_eq!(played.insert(format!("id-{}", i)), None);
        }

        assert_eq!(played.insert("id-10"), Some("id-0".to_string()));
        assert!(!played.contains("id-0"));
        assert!(played.contains("id-1"));
        assert!(played.contains("id-10"));
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut played = PlayedSet::with_capacity(2);
        played.insert("a");
        played.insert("b");
        assert_eq!(played.insert("a"), None);
        assert_eq!(played.len(), 2);

        // "a" keeps its original position and is evicted first
        assert_eq!(played.insert("c"), Some("a".to_string()));
    }
}
