//! Accumulate-and-reset counters driving the training and checkpoint schedules.

/// Counts environment steps until a period is reached.
///
/// Steps are added with saturation; the counter stays due until `reset` is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenceCounter {
    period: u64,
    elapsed: u64,
}

impl CadenceCounter {
    pub fn new(period: u64) -> Self {
        Self { period, elapsed: 0 }
    }

    pub fn advance(&mut self, steps: u64) {
        self.elapsed = self.elapsed.saturating_add(steps);
    }

    pub fn is_due(&self) -> bool {
        self.elapsed >= self.period
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn period(&self) -> u64 {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_exactly_at_period() {
        let mut counter = CadenceCounter::new(2_000);
        counter.advance(1_999);
        assert!(!counter.is_due());
        counter.advance(1);
        assert!(counter.is_due());
        counter.reset();
        assert_eq!(counter.elapsed(), 0);
        assert!(!counter.is_due());
    }

    #[test]
    fn test_overshoot_is_discarded_on_reset() {
        let mut counter = CadenceCounter::new(100);
        counter.advance(250);
        assert!(counter.is_due());
        counter.reset();
        counter.advance(99);
        assert!(!counter.is_due());
    }

    #[test]
    fn test_saturating_add() {
        let mut counter = CadenceCounter::new(10);
        counter.advance(u64::MAX);
        counter.advance(u64::MAX);
        assert_eq!(counter.elapsed(), u64::MAX);
        assert!(counter.is_due());
    }
}
