use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::config::ContributionBounds;
use crate::model::WindowId;

/// Enforces local sensitivity before any noise is added: values are clamped
/// into `[min_value, max_value]` and each identity contributes at most
/// `max_contributions_per_window` times per window.
#[derive(Clone, Debug)]
pub struct ContributionBounder {
    bounds: ContributionBounds,
    counters: BTreeMap<WindowId, AHashMap<String, u32>>,
}

impl ContributionBounder {
    pub fn new(bounds: ContributionBounds) -> Self {
        Self {
            bounds,
            counters: BTreeMap::new(),
        }
    }

    /// Admits one contribution from `identity` to `window`, returning the
    /// clamped value, or `None` once the identity has reached the cap.
    pub fn admit(&mut self, window: WindowId, identity: &str, value: f64) -> Option<f64> {
        let per_identity = self.counters.entry(window).or_default();
        match per_identity.get_mut(identity) {
            Some(count) if *count >= self.bounds.max_contributions_per_window => None,
            Some(count) => {
                *count += 1;
                Some(self.bounds.clamp(value))
            }
            None => {
                per_identity.insert(identity.to_owned(), 1);
                Some(self.bounds.clamp(value))
            }
        }
    }

    pub fn contributions(&self, window: &WindowId, identity: &str) -> u32 {
        self.counters
            .get(window)
            .and_then(|per_identity| per_identity.get(identity))
            .copied()
            .unwrap_or(0)
    }

    pub fn retire(&mut self, window: &WindowId) {
        self.counters.remove(window);
    }

    pub fn tracked_windows(&self) -> usize {
        self.counters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounder(cap: u32) -> ContributionBounder {
        ContributionBounder::new(ContributionBounds {
            max_contributions_per_window: cap,
            min_value: 0.0,
            max_value: 1.0,
        })
    }

    fn window() -> WindowId {
        WindowId::new(0, 1_000)
    }

    #[test]
    fn clamps_admitted_values() {
        let mut bounder = bounder(1);
        assert_eq!(bounder.admit(window(), "a", 5.0), Some(1.0));
        assert_eq!(bounder.admit(window(), "b", -3.0), Some(0.0));
    }

    #[test]
    fn caps_per_identity_per_window() {
        let mut bounder = bounder(2);
        assert!(bounder.admit(window(), "a", 0.5).is_some());
        assert!(bounder.admit(window(), "a", 0.5).is_some());
        assert!(bounder.admit(window(), "a", 0.5).is_none());
        assert_eq!(bounder.contributions(&window(), "a"), 2);
    }

    #[test]
    fn windows_count_independently() {
        let mut bounder = bounder(1);
        let other = WindowId::new(1_000, 2_000);
        assert!(bounder.admit(window(), "a", 0.5).is_some());
        assert!(bounder.admit(other, "a", 0.5).is_some());
        assert!(bounder.admit(window(), "a", 0.5).is_none());
    }

    #[test]
    fn retire_frees_window_state() {
        let mut bounder = bounder(1);
        bounder.admit(window(), "a", 0.5);
        assert_eq!(bounder.tracked_windows(), 1);
        bounder.retire(&window());
        assert_eq!(bounder.tracked_windows(), 0);
        assert_eq!(bounder.contributions(&window(), "a"), 0);
    }
}
