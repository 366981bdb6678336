//! Tick driver: flush, re-subscribe, run systems in order

use std::time::{Duration, Instant};

use log::error;

use crate::ecs::Registry;
use crate::events::EventBus;

/// Timing record for a single tick.
#[derive(Debug, Clone)]
pub struct TickStats {
    pub tick: u64,
    pub duration: Duration,
    pub system_times: Vec<(&'static str, Duration)>,
}

/// Runs the per-tick sequence against a registry and event bus.
///
/// Each tick: apply the registry's queued creations and destructions, reset
/// the event bus and re-run every system's `subscribe` hook, then update
/// systems in registration order. A system that returns an error is logged
/// and skipped; it never aborts the tick for the systems after it.
pub struct Scheduler {
    tick_count: u64,
    dt: f32,
    stats_history: Vec<TickStats>,
    max_stats_history: usize,
}

impl Scheduler {
    pub fn new(dt: f32) -> Self {
        Self {
            tick_count: 0,
            dt,
            stats_history: Vec::new(),
            max_stats_history: 100,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Execute one tick.
    pub fn tick(&mut self, registry: &mut Registry, bus: &mut EventBus) -> TickStats {
        let tick_start = Instant::now();
        let mut system_times = Vec::new();

        registry.flush();

        bus.reset();
        registry.subscribe_systems(bus);

        for (type_id, name) in registry.system_order() {
            let system_start = Instant::now();
            if let Err(err) = registry.run_system(type_id, bus, self.dt, self.tick_count) {
                error!("system {name} failed on tick {}: {err:?}", self.tick_count);
            }
            system_times.push((name, system_start.elapsed()));
        }

        self.tick_count += 1;
        let stats = TickStats {
            tick: self.tick_count,
            duration: tick_start.elapsed(),
            system_times,
        };

        self.stats_history.push(stats.clone());
        if self.stats_history.len() > self.max_stats_history {
            self.stats_history.remove(0);
        }
        stats
    }

    /// Run for a number of ticks.
    pub fn run(&mut self, registry: &mut Registry, bus: &mut EventBus, ticks: u64) {
        for _ in 0..ticks {
            self.tick(registry, bus);
        }
    }

    pub fn recent_stats(&self) -> &[TickStats] {
        &self.stats_history
    }

    pub fn average_tick_time(&self) -> Option<Duration> {
        if self.stats_history.is_empty() {
            return None;
        }
        let total: Duration = self.stats_history.iter().map(|s| s.duration).sum();
        Some(total / self.stats_history.len() as u32)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::ecs::{System, SystemContext, SystemCore};

    #[derive(Default)]
    struct CountingSystem {
        core: SystemCore,
        calls: u32,
    }

    impl System for CountingSystem {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn core(&self) -> &SystemCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut SystemCore {
            &mut self.core
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<()> {
            self.calls += 1;
            Ok(())
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[derive(Default)]
    struct FailingSystem {
        core: SystemCore,
    }

    impl System for FailingSystem {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn core(&self) -> &SystemCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut SystemCore {
            &mut self.core
        }

        fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<()> {
            anyhow::bail!("intentional failure")
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    #[test]
    fn test_scheduler_runs_systems_each_tick() {
        let mut registry = Registry::new();
        let mut bus = EventBus::new();
        registry.add_system(CountingSystem::default()).unwrap();

        let mut scheduler = Scheduler::new(1.0 / 60.0);
        scheduler.run(&mut registry, &mut bus, 3);

        assert_eq!(scheduler.tick_count(), 3);
        assert_eq!(registry.system::<CountingSystem>().unwrap().calls, 3);
        assert_eq!(scheduler.recent_stats().len(), 3);
    }

    #[test]
    fn test_failing_system_does_not_abort_the_tick() {
        let mut registry = Registry::new();
        let mut bus = EventBus::new();
        registry.add_system(FailingSystem::default()).unwrap();
        registry.add_system(CountingSystem::default()).unwrap();

        let mut scheduler = Scheduler::new(1.0 / 60.0);
        scheduler.tick(&mut registry, &mut bus);

        // the system registered after the failing one still ran
        assert_eq!(registry.system::<CountingSystem>().unwrap().calls, 1);
    }
}
