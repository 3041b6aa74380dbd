//! Pool of fragment views so scrolling recycles instead of reallocating

use ahash::{AHashMap, AHashSet};
use std::collections::VecDeque;
use std::hash::Hash;

/// Views currently on screen keyed by fragment identity, plus a queue of
/// off-screen views ready to be handed out again
#[derive(Debug)]
pub struct ViewReuseQueue<K, V> {
    pub queued_views: VecDeque<V>,
    pub used_views: AHashMap<K, V>,
}

impl<K, V> Default for ViewReuseQueue<K, V> {
    fn default() -> Self {
        Self {
            queued_views: VecDeque::new(),
            used_views: AHashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Copy, V: Default> ViewReuseQueue<K, V> {
    /// The view already used for `key`, else a recycled or new one
    pub fn get_or_create_view(&mut self, key: K) -> &mut V {
        let queued = &mut self.queued_views;
        self.used_views
            .entry(key)
            .or_insert_with(|| queued.pop_front().unwrap_or_default())
    }

    /// Move the view for `key` back to the queue
    pub fn enqueue_view(&mut self, key: &K) {
        if let Some(view) = self.used_views.remove(key) {
            self.queued_views.push_back(view);
        }
    }

    /// Enqueue every used view whose key is not in `keys`
    pub fn enqueue_views_not_in(&mut self, keys: &AHashSet<K>) {
        let stale: Vec<K> = self
            .used_views
            .keys()
            .filter(|key| !keys.contains(key))
            .copied()
            .collect();
        for key in &stale {
            self.enqueue_view(key);
        }
    }

    pub fn clear(&mut self) {
        self.queued_views.clear();
        self.used_views.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct View(u32);

    #[test]
    fn test_views_are_recycled() {
        let mut queue: ViewReuseQueue<u64, View> = ViewReuseQueue::default();
        queue.get_or_create_view(1).0 = 7;
        queue.get_or_create_view(2);

        queue.enqueue_views_not_in(&AHashSet::from_iter([2]));
        assert_eq!(queue.used_views.len(), 1);
        assert_eq!(queue.queued_views.len(), 1);

        // The recycled view keeps its state until the caller overwrites it
        assert_eq!(queue.get_or_create_view(3), &mut View(7));
        assert!(queue.queued_views.is_empty());
    }

    #[test]
    fn test_existing_key_returns_same_view() {
        let mut queue: ViewReuseQueue<u64, View> = ViewReuseQueue::default();
        queue.get_or_create_view(1).0 = 3;
        assert_eq!(queue.get_or_create_view(1).0, 3);
        assert_eq!(queue.used_views.len(), 1);
    }
}
