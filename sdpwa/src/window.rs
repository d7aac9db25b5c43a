use std::collections::BTreeSet;

use crate::config::WindowConfig;
use crate::model::WindowId;

fn div_floor(a: i64, b: i64) -> i64 {
    a.div_euclid(b)
}

fn div_ceil(a: i64, b: i64) -> i64 {
    -(-a).div_euclid(b)
}

/// Maps timestamps to windows and schedules sealing. Windows open lazily on
/// first admitted event; `release` is the only source of time, and its
/// `up_to_ms` values advance a watermark that no window may fall behind.
#[derive(Clone, Debug)]
pub struct WindowManager {
    size_ms: i64,
    stride_ms: i64,
    origin_ms: i64,
    open: BTreeSet<WindowId>,
    watermark_ms: i64,
}

impl WindowManager {
    pub fn new(config: &WindowConfig) -> Self {
        Self {
            size_ms: config.size_ms(),
            stride_ms: config.stride_ms(),
            origin_ms: config.origin_ms,
            open: BTreeSet::new(),
            watermark_ms: config.origin_ms,
        }
    }

    /// Every window whose half-open `[start, end)` interval contains `ts`.
    /// Starts are congruent to the origin modulo the stride and clipped so
    /// no window begins before the origin.
    pub fn windows_covering(&self, ts: i64) -> Vec<WindowId> {
        let offset = ts - self.origin_ms;
        if offset < 0 {
            return Vec::new();
        }
        let lo = div_ceil(offset - self.size_ms + 1, self.stride_ms).max(0);
        let hi = div_floor(offset, self.stride_ms);
        (lo..=hi)
            .map(|k| {
                let start = self.origin_ms + k * self.stride_ms;
                WindowId::new(start, start + self.size_ms)
            })
            .collect()
    }

    /// Covering windows that may still admit an event: anything ending at or
    /// before the watermark is sealed and final. Empty means the event is late.
    pub fn admissible_windows(&self, ts: i64) -> Vec<WindowId> {
        self.windows_covering(ts)
            .into_iter()
            .filter(|window| window.window_end_ms > self.watermark_ms)
            .collect()
    }

    pub fn observe(&mut self, window: WindowId) {
        self.open.insert(window);
    }

    /// Advances the watermark and returns the open windows due for release,
    /// ordered by `(end, start)`. They stay in the open set until `retire`.
    pub fn seal_up_to(&mut self, now_ms: i64) -> Vec<WindowId> {
        if now_ms > self.watermark_ms {
            self.watermark_ms = now_ms;
        }
        self.open
            .iter()
            .filter(|window| window.window_end_ms <= now_ms)
            .copied()
            .collect()
    }

    pub fn retire(&mut self, window: &WindowId) {
        self.open.remove(window);
    }

    pub fn watermark_ms(&self) -> i64 {
        self.watermark_ms
    }

    pub fn open_count(&self) -> usize {
        self.open.len()
    }

    pub fn max_cover(&self) -> usize {
        (div_ceil(self.size_ms, self.stride_ms)) as usize
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use proptest::prelude::*;

    use super::*;

    fn manager(size_ms: u64, stride_ms: u64, origin_ms: i64) -> WindowManager {
        WindowManager::new(&WindowConfig {
            window_size: Duration::from_millis(size_ms),
            window_stride: Duration::from_millis(stride_ms),
            origin_ms,
        })
    }

    #[test]
    fn tumbling_covers_exactly_one_window() {
        let manager = manager(1_000, 1_000, 0);
        assert_eq!(
            manager.windows_covering(100),
            vec![WindowId::new(0, 1_000)]
        );
        assert_eq!(
            manager.windows_covering(999),
            vec![WindowId::new(0, 1_000)]
        );
    }

    #[test]
    fn boundary_timestamp_belongs_to_the_next_window() {
        let manager = manager(1_000, 1_000, 0);
        assert_eq!(
            manager.windows_covering(1_000),
            vec![WindowId::new(1_000, 2_000)]
        );
    }

    #[test]
    fn sliding_covers_overlapping_windows() {
        let manager = manager(1_000, 500, 0);
        assert_eq!(
            manager.windows_covering(600),
            vec![WindowId::new(0, 1_000), WindowId::new(500, 1_500)]
        );
    }

    #[test]
    fn coverage_clips_at_the_origin() {
        let manager = manager(1_000, 250, 0);
        assert_eq!(
            manager.windows_covering(100),
            vec![WindowId::new(0, 1_000)]
        );
        assert!(manager.windows_covering(100).len() < manager.max_cover());
    }

    #[test]
    fn origin_shifts_window_grid() {
        let manager = manager(1_000, 1_000, 500);
        assert_eq!(
            manager.windows_covering(700),
            vec![WindowId::new(500, 1_500)]
        );
        assert!(manager.windows_covering(400).is_empty());
    }

    #[test]
    fn seal_returns_due_windows_in_end_order() {
        let mut manager = manager(1_000, 500, 0);
        for window in manager.windows_covering(1_200) {
            manager.observe(window);
        }
        for window in manager.windows_covering(300) {
            manager.observe(window);
        }
        let sealed = manager.seal_up_to(1_600);
        assert_eq!(
            sealed,
            vec![WindowId::new(0, 1_000), WindowId::new(500, 1_500)]
        );
        assert_eq!(manager.open_count(), 3);
        for window in &sealed {
            manager.retire(window);
        }
        assert_eq!(manager.open_count(), 1);
    }

    #[test]
    fn watermark_blocks_sealed_coordinates() {
        let mut manager = manager(1_000, 1_000, 0);
        manager.seal_up_to(2_000);
        assert!(manager.admissible_windows(1_500).is_empty());
        assert_eq!(
            manager.admissible_windows(2_500),
            vec![WindowId::new(2_000, 3_000)]
        );
    }

    #[test]
    fn watermark_never_regresses() {
        let mut manager = manager(1_000, 1_000, 0);
        manager.seal_up_to(5_000);
        manager.seal_up_to(1_000);
        assert_eq!(manager.watermark_ms(), 5_000);
    }

    proptest! {
        #[test]
        fn covering_windows_contain_the_timestamp(
            size in 1i64..2_000,
            stride_frac in 1i64..2_000,
            origin in 0i64..1_000,
            offset in 0i64..500_000,
        ) {
            let stride = stride_frac.min(size);
            let manager = manager(size as u64, stride as u64, origin);
            let ts = origin + offset;
            let windows = manager.windows_covering(ts);
            prop_assert!(!windows.is_empty());
            prop_assert!(windows.len() <= manager.max_cover());
            for window in &windows {
                prop_assert!(window.contains(ts));
                prop_assert_eq!((window.window_start_ms - origin) % stride, 0);
                prop_assert!(window.window_start_ms >= origin);
                prop_assert_eq!(window.window_end_ms - window.window_start_ms, size);
            }
        }

        #[test]
        fn tumbling_coverage_is_a_partition(
            size in 1i64..2_000,
            origin in 0i64..1_000,
            offset in 0i64..500_000,
        ) {
            let manager = manager(size as u64, size as u64, origin);
            let windows = manager.windows_covering(origin + offset);
            prop_assert_eq!(windows.len(), 1);
        }
    }
}
