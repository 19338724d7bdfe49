use std::time::Duration;

use bevy::{
    platform::collections::HashSet,
    time::{Timer, TimerMode},
};

use crate::{action::ActionRegistry, animation_clip::ClipOrigin};

/// Idle action names that exist in the current registry, in preference order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdlePool {
    names: Vec<String>,
}

impl IdlePool {
    /// Keeps the declared names the registry can play. A synthesized registry always idles on
    /// its own clips.
    pub fn build(declared: &[String], registry: &ActionRegistry) -> Self {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = declared
            .iter()
            .filter(|name| registry.contains(name) && seen.insert(name.as_str()))
            .cloned()
            .collect();

        if registry.origin() == Some(ClipOrigin::Synthesized) {
            for name in registry.names() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        Self { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Longest accepted idle period, about 136 years.
const MAX_PERIOD: Duration = Duration::from_secs(u32::MAX as u64);
/// A single tick never reports more rotations than this.
const MAX_PERIODS_PER_TICK: u32 = 1024;

fn secs_to_duration(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.)).unwrap_or(Duration::MAX)
}

/// Repeating timer that rotates through the idle pool.
#[derive(Clone, Debug)]
pub struct IdleScheduler {
    period: Duration,
    timer: Option<Timer>,
}

impl IdleScheduler {
    /// Periods outside `(0, MAX_PERIOD]`, including non-finite ones, are clamped into it.
    pub fn new(period_secs: f32) -> Self {
        let period = secs_to_duration(period_secs).clamp(Duration::from_nanos(1), MAX_PERIOD);
        Self {
            period,
            timer: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// (Re)starts the timer from zero.
    pub fn start(&mut self) {
        self.timer = Some(Timer::new(self.period, TimerMode::Repeating));
    }

    pub fn cancel(&mut self) {
        self.timer = None;
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Number of periods that elapsed during this tick.
    pub fn tick(&mut self, delta: f32) -> u32 {
        let Some(timer) = &mut self.timer else {
            return 0;
        };
        let delta =
            secs_to_duration(delta).min(self.period.saturating_mul(MAX_PERIODS_PER_TICK));
        timer.tick(delta);
        timer.times_finished_this_tick()
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec3;

    use super::*;
    use crate::{
        animation_clip::{Clip, Track},
        errors::IssueLog,
        rig::Rig,
    };

    fn rig() -> Rig {
        let mut rig = Rig::new();
        rig.add_bone("Hips", None);
        rig
    }

    #[test]
    fn scheduler_counts_elapsed_periods() {
        let mut scheduler = IdleScheduler::new(1.);
        assert_eq!(scheduler.tick(5.), 0);

        scheduler.start();
        assert_eq!(scheduler.tick(0.5), 0);
        assert_eq!(scheduler.tick(0.5), 1);
        assert_eq!(scheduler.tick(2.), 2);

        scheduler.cancel();
        assert_eq!(scheduler.tick(3.), 0);
    }

    #[test]
    fn extreme_periods_and_deltas_are_clamped() {
        assert_eq!(IdleScheduler::new(f32::INFINITY).period(), MAX_PERIOD);
        assert_eq!(IdleScheduler::new(f32::NAN).period(), Duration::from_nanos(1));
        assert_eq!(IdleScheduler::new(-4.).period(), Duration::from_nanos(1));

        let mut scheduler = IdleScheduler::new(1.);
        scheduler.start();
        assert_eq!(scheduler.tick(1e20), MAX_PERIODS_PER_TICK);
        assert_eq!(scheduler.tick(f32::INFINITY), MAX_PERIODS_PER_TICK);
        assert_eq!(scheduler.tick(0.25), 0);
    }

    #[test]
    fn repeated_idle_names_are_kept_once() {
        let registry = ActionRegistry::bind(
            ClipOrigin::Embedded,
            ["Idle", "Wave"]
                .into_iter()
                .map(|name| {
                    Clip::new(
                        name,
                        ClipOrigin::Embedded,
                        vec![Track::scale("Hips", vec![0., 1.], vec![Vec3::ONE; 2])],
                    )
                })
                .collect(),
            &rig(),
            &mut IssueLog::default(),
        );
        let declared = ["Idle", "Wave", "Idle", "Missing"].map(String::from);

        let pool = IdlePool::build(&declared, &registry);
        assert_eq!(pool.names(), &["Idle".to_string(), "Wave".to_string()]);
    }
}
