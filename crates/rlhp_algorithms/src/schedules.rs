//! Label schedules: how many labeled comparisons are wanted at a given point of training.
//!
//! Both schedules produce a real-valued target which is rounded up, so that
//! `count < n_desired_labels()` agrees with comparing the count against the real target.

use std::cell::Cell;
use std::time::{Duration, Instant};

use crate::templates::collaborators::LabelSchedule;

/// `pretrain_labels` up front, then one more label every `seconds_between_labels`.
///
/// The clock starts on the first call to `n_desired_labels`, not at construction.
#[derive(Debug, Clone)]
pub struct ConstantLabelSchedule {
    pretrain_labels: usize,
    seconds_between_labels: f64,
    started_at: Cell<Option<Instant>>,
}

impl ConstantLabelSchedule {
    pub fn new(pretrain_labels: usize, seconds_between_labels: f64) -> Self {
        Self {
            pretrain_labels,
            seconds_between_labels,
            started_at: Cell::new(None),
        }
    }

    pub fn desired_after(&self, elapsed: Duration) -> usize {
        if !(self.seconds_between_labels > 0.0) {
            return self.pretrain_labels;
        }
        let extra = (elapsed.as_secs_f64() / self.seconds_between_labels).ceil();
        self.pretrain_labels.saturating_add(extra as usize)
    }
}

impl LabelSchedule for ConstantLabelSchedule {
    fn n_desired_labels(&self) -> usize {
        let started_at = match self.started_at.get() {
            Some(at) => at,
            None => {
                let now = Instant::now();
                self.started_at.set(Some(now));
                now
            }
        };
        self.desired_after(started_at.elapsed())
    }
}

/// Anneals from `pretrain_labels` toward `final_labels` as environment steps accumulate.
///
/// The remaining gap decays as `0.01^(t / final_timesteps)`, so 99% of the extra labels
/// are wanted by `final_timesteps`.
#[derive(Debug, Clone)]
pub struct LabelAnnealer {
    pretrain_labels: usize,
    final_labels: usize,
    final_timesteps: u64,
    timesteps_elapsed: u64,
}

impl LabelAnnealer {
    pub fn new(pretrain_labels: usize, final_labels: usize, final_timesteps: u64) -> Self {
        Self {
            pretrain_labels,
            final_labels,
            final_timesteps,
            timesteps_elapsed: 0,
        }
    }

    pub fn timesteps_elapsed(&self) -> u64 {
        self.timesteps_elapsed
    }

    pub fn desired_at(&self, timesteps: u64) -> usize {
        if self.final_labels == 0 {
            return self.pretrain_labels;
        }
        let final_labels = self.final_labels as f64;
        let pretrain_frac = self.pretrain_labels as f64 / final_labels;
        let exp_decay_frac = if self.final_timesteps == 0 {
            0.0
        } else {
            0.01_f64.powf(timesteps as f64 / self.final_timesteps as f64)
        };
        let desired_frac = pretrain_frac + (1.0 - pretrain_frac) * (1.0 - exp_decay_frac);
        (desired_frac * final_labels).ceil().max(0.0) as usize
    }
}

impl LabelSchedule for LabelAnnealer {
    fn n_desired_labels(&self) -> usize {
        self.desired_at(self.timesteps_elapsed)
    }

    fn observe_timesteps(&mut self, total_timesteps: u64) {
        self.timesteps_elapsed = total_timesteps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_schedule_grows_with_time() {
        let schedule = ConstantLabelSchedule::new(10, 3.0);
        assert_eq!(schedule.desired_after(Duration::ZERO), 10);
        assert_eq!(schedule.desired_after(Duration::from_secs(3)), 11);
        assert_eq!(schedule.desired_after(Duration::from_millis(3_001)), 12);
        assert_eq!(schedule.desired_after(Duration::from_secs(30)), 20);
    }

    #[test]
    fn test_constant_schedule_starts_lazily() {
        let schedule = ConstantLabelSchedule::new(5, 3600.0);
        assert!(schedule.started_at.get().is_none());
        let first = schedule.n_desired_labels();
        assert!(schedule.started_at.get().is_some());
        assert!((5..=6).contains(&first));
    }

    #[test]
    fn test_annealer_endpoints() {
        let mut annealer = LabelAnnealer::new(175, 700, 5_000_000);
        assert_eq!(annealer.n_desired_labels(), 175);

        annealer.observe_timesteps(5_000_000);
        // 175 + 525 * 0.99 = 694.75
        assert_eq!(annealer.n_desired_labels(), 695);

        annealer.observe_timesteps(u64::MAX);
        assert_eq!(annealer.n_desired_labels(), 700);
    }

    #[test]
    fn test_annealer_is_monotonic() {
        let annealer = LabelAnnealer::new(25, 1000, 100_000);
        let mut previous = 0;
        for t in (0..=200_000).step_by(5_000) {
            let desired = annealer.desired_at(t);
            assert!(desired >= previous);
            previous = desired;
        }
    }

    #[test]
    fn test_boxed_schedule_forwards() {
        let mut schedule: Box<dyn LabelSchedule> = Box::new(LabelAnnealer::new(20, 100, 10));
        assert_eq!(schedule.n_desired_labels(), 20);
        schedule.observe_timesteps(1_000);
        assert_eq!(schedule.n_desired_labels(), 100);
    }
}
