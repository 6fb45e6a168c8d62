//! Per-tick message counters.

use serde::{Deserialize, Serialize};

/// Counts events per simulated tick. The series grows on demand so ticks
/// that saw no traffic cost nothing until a later tick records something.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCounter {
    per_tick: Vec<u64>,
}

impl MessageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event at `tick`.
    pub fn record(&mut self, tick: u64) {
        let index = tick as usize;
        if self.per_tick.len() <= index {
            self.per_tick.resize(index + 1, 0);
        }
        self.per_tick[index] += 1;
    }

    /// Events recorded at `tick`.
    pub fn at(&self, tick: u64) -> u64 {
        self.per_tick.get(tick as usize).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.per_tick.iter().sum()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.per_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_extends_on_demand() {
        let mut counter = MessageCounter::new();
        counter.record(3);
        counter.record(3);
        counter.record(0);

        assert_eq!(counter.as_slice(), &[1, 0, 0, 2]);
        assert_eq!(counter.at(3), 2);
        assert_eq!(counter.at(99), 0);
        assert_eq!(counter.total(), 3);
    }
}
