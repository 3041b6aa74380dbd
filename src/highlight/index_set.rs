//! Sorted, disjoint sets of byte offsets stored as half-open ranges

use std::ops::Range;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSet {
    ranges: Vec<Range<usize>>,
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_range(range: Range<usize>) -> Self {
        let mut set = Self::new();
        set.insert(range);
        set
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of offsets in the set
    pub fn len(&self) -> usize {
        self.ranges.iter().map(|r| r.len()).sum()
    }

    /// Maximal contiguous runs, in order
    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    pub fn first_range(&self) -> Option<Range<usize>> {
        self.ranges.first().cloned()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn insert(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        // First run that could touch `range`, and the first one past it
        let lo = self.ranges.partition_point(|r| r.end < range.start);
        let hi = self.ranges.partition_point(|r| r.start <= range.end);

        let mut merged = range;
        if lo < hi {
            merged.start = merged.start.min(self.ranges[lo].start);
            merged.end = merged.end.max(self.ranges[hi - 1].end);
        }
        self.ranges.splice(lo..hi, std::iter::once(merged));
    }

    pub fn remove(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let lo = self.ranges.partition_point(|r| r.end <= range.start);
        let hi = self.ranges.partition_point(|r| r.start < range.end);
        if lo >= hi {
            return;
        }

        let mut kept = Vec::with_capacity(2);
        let first = &self.ranges[lo];
        if first.start < range.start {
            kept.push(first.start..range.start);
        }
        let last = &self.ranges[hi - 1];
        if last.end > range.end {
            kept.push(range.end..last.end);
        }
        self.ranges.splice(lo..hi, kept);
    }

    pub fn contains(&self, offset: usize) -> bool {
        let idx = self.ranges.partition_point(|r| r.end <= offset);
        self.ranges.get(idx).is_some_and(|r| r.start <= offset)
    }

    /// True if any offset of `range` is in the set
    pub fn intersects(&self, range: &Range<usize>) -> bool {
        if range.is_empty() {
            return false;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        self.ranges.get(idx).is_some_and(|r| r.start < range.end)
    }

    pub fn union(&self, other: &IndexSet) -> IndexSet {
        let mut set = self.clone();
        for range in &other.ranges {
            set.insert(range.clone());
        }
        set
    }

    pub fn subtract(&self, other: &IndexSet) -> IndexSet {
        let mut set = self.clone();
        for range in &other.ranges {
            set.remove(range.clone());
        }
        set
    }

    pub fn intersection(&self, other: &IndexSet) -> IndexSet {
        let mut ranges = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let a = &self.ranges[i];
            let b = &other.ranges[j];
            let start = a.start.max(b.start);
            let end = a.end.min(b.end);
            if start < end {
                ranges.push(start..end);
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        IndexSet { ranges }
    }

    /// Move the set across an edit that replaced `pre_range` and changed the
    /// document length by `delta`
    ///
    /// Offsets inside the replaced range are dropped; offsets after it shift.
    pub fn apply_edit(&mut self, pre_range: &Range<usize>, delta: isize) {
        let shift = |offset: usize| (offset as isize + delta).max(0) as usize;
        let new_end = shift(pre_range.end).max(pre_range.start);

        let mut ranges = Vec::with_capacity(self.ranges.len() + 1);
        for range in self.ranges.drain(..) {
            if range.end <= pre_range.start {
                ranges.push(range);
            } else if range.start >= pre_range.end {
                ranges.push(shift(range.start)..shift(range.end));
            } else {
                if range.start < pre_range.start {
                    ranges.push(range.start..pre_range.start);
                }
                if range.end > pre_range.end {
                    ranges.push(new_end..shift(range.end));
                }
            }
        }
        ranges.retain(|r| !r.is_empty());

        self.ranges.clear();
        for range in ranges {
            self.insert(range);
        }
    }
}

impl FromIterator<Range<usize>> for IndexSet {
    fn from_iter<I: IntoIterator<Item = Range<usize>>>(iter: I) -> Self {
        let mut set = IndexSet::new();
        for range in iter {
            set.insert(range);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_merges_touching_ranges() {
        let mut set = IndexSet::new();
        set.insert(0..5);
        set.insert(10..15);
        set.insert(5..10);
        assert_eq!(set.ranges(), &[0..15]);

        set.insert(20..25);
        set.insert(18..21);
        assert_eq!(set.ranges(), &[0..15, 18..25]);
        assert_eq!(set.len(), 22);
    }

    #[test]
    fn test_remove_splits_ranges() {
        let mut set = IndexSet::from_range(0..20);
        set.remove(5..8);
        assert_eq!(set.ranges(), &[0..5, 8..20]);
        set.remove(0..10);
        assert_eq!(set.ranges(), &[10..20]);
        set.remove(30..40);
        assert_eq!(set.ranges(), &[10..20]);
    }

    #[test]
    fn test_contains_and_intersects() {
        let set: IndexSet = [2..4, 8..10].into_iter().collect();
        assert!(set.contains(2));
        assert!(!set.contains(4));
        assert!(set.intersects(&(3..9)));
        assert!(!set.intersects(&(4..8)));
        assert!(!set.intersects(&(3..3)));
    }

    #[test]
    fn test_set_algebra() {
        let a: IndexSet = [0..10, 20..30].into_iter().collect();
        let b: IndexSet = [5..25].into_iter().collect();
        assert_eq!(a.intersection(&b).ranges(), &[5..10, 20..25]);
        assert_eq!(a.subtract(&b).ranges(), &[0..5, 25..30]);
        assert_eq!(a.union(&b).ranges(), &[0..30]);
    }

    #[test]
    fn test_apply_edit_shifts_and_drops() {
        let mut set: IndexSet = [0..10, 20..30].into_iter().collect();
        // Replace 5..8 with nothing
        set.apply_edit(&(5..8), -3);
        assert_eq!(set.ranges(), &[0..7, 17..27]);

        // Insert 4 bytes at 17
        set.apply_edit(&(17..17), 4);
        assert_eq!(set.ranges(), &[0..7, 21..31]);
    }
}
