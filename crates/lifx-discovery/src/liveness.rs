//! Missed-cycle bookkeeping
//!
//! A device is stale after `threshold` consecutive discovery cycles without
//! any traffic from it. Traffic anywhere in a cycle resets the count.

use lifx_core::MacAddress;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
struct Entry {
    seen: bool,
    missed: u32,
}

#[derive(Debug)]
pub struct LivenessTracker {
    threshold: u32,
    entries: HashMap<MacAddress, Entry>,
}

impl LivenessTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record traffic from `mac` in the current cycle. Returns true if the
    /// device was not tracked yet.
    pub fn observe(&mut self, mac: MacAddress) -> bool {
        let mut new = false;
        let entry = self.entries.entry(mac).or_insert_with(|| {
            new = true;
            Entry::default()
        });
        entry.seen = true;
        new
    }

    pub fn forget(&mut self, mac: &MacAddress) -> bool {
        self.entries.remove(mac).is_some()
    }

    pub fn contains(&self, mac: &MacAddress) -> bool {
        self.entries.contains_key(mac)
    }

    /// Consecutive silent cycles so far
    pub fn missed(&self, mac: &MacAddress) -> Option<u32> {
        self.entries.get(mac).map(|e| e.missed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Close the current cycle. Stale devices are removed and returned.
    pub fn sweep(&mut self) -> Vec<MacAddress> {
        let threshold = self.threshold;
        let mut stale = Vec::new();

        self.entries.retain(|mac, entry| {
            if std::mem::take(&mut entry.seen) {
                entry.missed = 0;
                return true;
            }
            entry.missed += 1;
            if entry.missed >= threshold {
                stale.push(*mac);
                false
            } else {
                true
            }
        });

        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAC: MacAddress = MacAddress::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);

    #[test]
    fn test_observe_reports_new_once() {
        let mut tracker = LivenessTracker::new(3);
        assert!(tracker.observe(MAC));
        assert!(!tracker.observe(MAC));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_evicted_after_threshold_misses() {
        let mut tracker = LivenessTracker::new(3);
        tracker.observe(MAC);

        assert!(tracker.sweep().is_empty());
        assert!(tracker.sweep().is_empty());
        assert!(tracker.sweep().is_empty());
        assert_eq!(tracker.sweep(), vec![MAC]);
        assert!(!tracker.contains(&MAC));
        assert!(tracker.sweep().is_empty());
    }

    #[test]
    fn test_isolated_misses_never_evict() {
        let mut tracker = LivenessTracker::new(3);
        tracker.observe(MAC);
        tracker.sweep();

        for _ in 0..20 {
            assert!(tracker.sweep().is_empty());
            assert!(tracker.sweep().is_empty());
            tracker.observe(MAC);
            assert!(tracker.sweep().is_empty());
            assert_eq!(tracker.missed(&MAC), Some(0));
        }
    }

    #[test]
    fn test_reregistered_after_eviction() {
        let mut tracker = LivenessTracker::new(1);
        tracker.observe(MAC);
        tracker.sweep();
        assert_eq!(tracker.sweep(), vec![MAC]);
        assert!(tracker.observe(MAC));
    }

    #[test]
    fn test_zero_threshold_clamped() {
        assert_eq!(LivenessTracker::new(0).threshold(), 1);
    }
}
