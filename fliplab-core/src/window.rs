//! Rolling-window interval reporting.
//!
//! A [`RollingWindow`] keeps the last `interval + 1` portfolio values so the
//! ratio newest/oldest is the return over exactly `interval` samples.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Bounded window of the most recent values; the oldest is evicted on push.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// Window spanning `interval` steps, holding `interval + 1` values.
    pub fn for_interval(interval: usize) -> Self {
        let capacity = interval + 1;
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Newest over oldest, once at least two values are held.
    pub fn ratio(&self) -> Option<f64> {
        if self.values.len() < 2 {
            return None;
        }
        let oldest = self.values.front()?;
        let newest = self.values.back()?;
        Some(newest / oldest)
    }
}

/// One interval report: portfolio values now and returns over the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntervalStatus {
    /// 1-based sample count at which the report fired.
    pub sample: u64,
    pub bh_value: f64,
    pub wave_value: f64,
    pub bh_return: f64,
    pub wave_return: f64,
}

/// Receives interval reports during `simulate`.
pub trait IntervalObserver {
    fn on_interval(&mut self, status: &IntervalStatus);
}

impl<F: FnMut(&IntervalStatus)> IntervalObserver for F {
    fn on_interval(&mut self, status: &IntervalStatus) {
        self(status)
    }
}

/// Paired windows for the buy-and-hold and wave portfolios.
#[derive(Debug, Clone)]
pub(crate) struct IntervalTracker {
    interval: usize,
    bh: RollingWindow,
    wave: RollingWindow,
}

impl IntervalTracker {
    pub(crate) fn new(interval: usize, bh_value: f64, wave_value: f64) -> Self {
        let mut tracker = Self {
            interval,
            bh: RollingWindow::for_interval(interval),
            wave: RollingWindow::for_interval(interval),
        };
        tracker.bh.push(bh_value);
        tracker.wave.push(wave_value);
        tracker
    }

    /// Record values after sample `sample` (1-based); returns a status on
    /// interval boundaries.
    pub(crate) fn record(
        &mut self,
        sample: u64,
        bh_value: f64,
        wave_value: f64,
    ) -> Option<IntervalStatus> {
        self.bh.push(bh_value);
        self.wave.push(wave_value);

        if sample % self.interval as u64 != 0 {
            return None;
        }
        Some(IntervalStatus {
            sample,
            bh_value,
            wave_value,
            bh_return: self.bh.ratio()?,
            wave_return: self.wave.ratio()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_interval_plus_one_values() {
        let mut window = RollingWindow::for_interval(3);
        for v in 1..=10 {
            window.push(v as f64);
        }
        assert_eq!(window.len(), 4);
        assert!(window.is_full());
        // Holds 7, 8, 9, 10.
        assert_eq!(window.ratio(), Some(10.0 / 7.0));
    }

    #[test]
    fn ratio_needs_two_values() {
        let mut window = RollingWindow::for_interval(5);
        assert_eq!(window.ratio(), None);
        window.push(2.0);
        assert_eq!(window.ratio(), None);
        window.push(3.0);
        assert_eq!(window.ratio(), Some(1.5));
    }

    #[test]
    fn tracker_reports_on_boundaries_only() {
        let mut tracker = IntervalTracker::new(2, 1.0, 1.0);
        assert!(tracker.record(1, 1.1, 1.0).is_none());
        let status = tracker.record(2, 1.2, 1.05).unwrap();
        assert_eq!(status.sample, 2);
        assert!((status.bh_return - 1.2).abs() < 1e-12);
        assert!((status.wave_return - 1.05).abs() < 1e-12);
        assert!(tracker.record(3, 1.3, 1.0).is_none());
        let status = tracker.record(4, 1.44, 1.1).unwrap();
        assert!((status.bh_return - 1.2).abs() < 1e-12);
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut observer = |s: &IntervalStatus| seen.push(s.sample);
            let status = IntervalStatus {
                sample: 5,
                bh_value: 2.0,
                wave_value: 2.0,
                bh_return: 1.0,
                wave_return: 1.0,
            };
            observer.on_interval(&status);
        }
        assert_eq!(seen, vec![5]);
    }
}
