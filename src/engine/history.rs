/// Bounded per-channel history used for stuck-sensor detection and health checks
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// Number of recent samples kept per channel
pub const MAX_HISTORY: usize = 10;

/// History shared between the validator (writer) and the health monitor (reader)
pub type SharedHistory = Arc<Mutex<RollingHistory>>;

/// Three parallel FIFO buffers, always of equal length.
#[derive(Debug, Clone)]
pub struct RollingHistory {
    temperature: VecDeque<f64>,
    humidity: VecDeque<f64>,
    air_quality: VecDeque<i32>,
    capacity: usize,
}

impl Default for RollingHistory {
    fn default() -> Self {
        RollingHistory::with_capacity(MAX_HISTORY)
    }
}

impl RollingHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        RollingHistory {
            temperature: VecDeque::with_capacity(capacity + 1),
            humidity: VecDeque::with_capacity(capacity + 1),
            air_quality: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn shared() -> SharedHistory {
        Arc::new(Mutex::new(RollingHistory::default()))
    }

    /// Append one sample to every channel, dropping the oldest beyond capacity
    pub fn push(&mut self, temperature: f64, humidity: f64, air_quality: i32) {
        self.temperature.push_back(temperature);
        self.humidity.push_back(humidity);
        self.air_quality.push_back(air_quality);

        while self.temperature.len() > self.capacity {
            self.temperature.pop_front();
            self.humidity.pop_front();
            self.air_quality.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.temperature.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity
    }

    pub fn temperature_stuck(&self) -> bool {
        all_identical(&self.temperature)
    }

    pub fn humidity_stuck(&self) -> bool {
        all_identical(&self.humidity)
    }

    pub fn air_quality_stuck(&self) -> bool {
        all_identical(&self.air_quality)
    }
}

fn all_identical<T: PartialEq>(values: &VecDeque<T>) -> bool {
    match values.front() {
        Some(first) => values.iter().all(|v| v == first),
        None => false,
    }
}

/// Lock the shared history, recovering the data if a previous holder panicked.
///
/// Every mutation is a single push-and-evict, so a poisoned guard never
/// exposes channels of unequal length.
pub fn lock(history: &SharedHistory) -> MutexGuard<'_, RollingHistory> {
    history.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let mut history = RollingHistory::default();
        for i in 0..15 {
            history.push(i as f64, 50.0, 600);
        }

        assert_eq!(history.len(), MAX_HISTORY);
        assert_eq!(history.temperature.front(), Some(&5.0));
        assert_eq!(history.temperature.back(), Some(&14.0));
        assert_eq!(history.humidity.len(), history.air_quality.len());
    }

    #[test]
    fn test_empty_history_is_not_stuck() {
        let history = RollingHistory::default();
        assert!(history.is_empty());
        assert!(!history.temperature_stuck());
    }

    #[test]
    fn test_stuck_per_channel() {
        let mut history = RollingHistory::with_capacity(3);
        history.push(70.0, 40.0, 600);
        history.push(71.0, 40.0, 600);
        history.push(72.0, 40.0, 600);

        assert!(history.is_full());
        assert!(!history.temperature_stuck());
        assert!(history.humidity_stuck());
        assert!(history.air_quality_stuck());
    }
}
