//! # Entity Maintenance Engine
//!
//! Owns a keyed collection of entity histories and keeps it consistent:
//!
//! ```text
//!   observe() ──┐                         ┌──> Promoted report
//!               ├──> [ Guarded state ] ───┤
//!   cycle()  ───┘   entities + epoch      └──> Dropping report (+ removal)
//! ```
//!
//! Both entry points run under one [`Guarded`] lock, so a maintenance sweep
//! never sees a half-applied observation and vice versa.
//!
//! ## Replay-calibrated time
//!
//! Every accepted observation resets the epoch to `now - event_time`. A
//! sweep then measures staleness as `now - (epoch + latest_event_time)`,
//! which stays correct when the feed is a recording whose timestamps are
//! far in the past: elapsed time is measured on the feed's own timebase.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use warden_sync::{Guarded, ThreadOfControl};

use crate::clock::{Clock, SystemClock};
use crate::config::{CycleDuration, MaintainerConfig};
use crate::error::MaintainerResult;
use crate::observation::{EntityHistory, EntityType, Observation};
use crate::report::{CallbackSink, Report, ReportKind, ReportSink};
use crate::timer::MaintenanceTimer;

/// Everything the single engine lock protects.
struct EngineState<K, P> {
    entities: HashMap<K, EntityHistory<K, P>>,
    epoch: f64,
    config: MaintainerConfig,
    cycles: u64,
    promoted: u64,
    dropped: u64,
}

impl<K, P> EngineState<K, P> {
    fn new(config: MaintainerConfig) -> Self {
        Self {
            entities: HashMap::new(),
            epoch: 0.0,
            config,
            cycles: 0,
            promoted: 0,
            dropped: 0,
        }
    }

    fn clear(&mut self) {
        self.entities.clear();
        self.epoch = 0.0;
    }
}

/// Outcome of one maintenance cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Promotion reports emitted.
    pub promoted: usize,
    /// Drop reports emitted (entities removed).
    pub dropped: usize,
    /// Entities left in the collection.
    pub remaining: usize,
    /// True if the engine was disabled and nothing was evaluated.
    pub skipped: bool,
}

/// Point-in-time copy of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntitySnapshot<P> {
    /// Current classification.
    pub entity_type: EntityType,
    /// Observations accepted.
    pub hits: usize,
    /// Observations retained.
    pub retained: usize,
    /// Event time of the latest observation.
    pub latest_event_time: f64,
    /// Payload of the latest observation.
    pub payload: P,
}

/// Status counters for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineStatus {
    /// Whether maintenance cycles are evaluated.
    pub enabled: bool,
    /// Entities currently tracked.
    pub entities: usize,
    /// Current virtual-clock offset in seconds.
    pub epoch: f64,
    /// Maintenance cycles run since creation.
    pub cycles: u64,
    /// Promotion reports emitted since creation.
    pub promoted: u64,
    /// Drop reports emitted since creation.
    pub dropped: u64,
    /// Whether the internal timer thread is running.
    pub timer_running: bool,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return f.write_str("Disabled");
        }
        write!(
            f,
            "Enabled ({} entities, {} promoted, {} dropped)",
            self.entities, self.promoted, self.dropped
        )
    }
}

/// Promotes and evicts entity histories on a periodic sweep.
pub struct EntityMaintenanceEngine<K, P> {
    state: Guarded<EngineState<K, P>>,
    cycle_duration: CycleDuration,
    clock: Arc<dyn Clock>,
    sink: Box<dyn ReportSink<K, P>>,
    timer: parking_lot::Mutex<Option<ThreadOfControl>>,
}

impl<K, P> EntityMaintenanceEngine<K, P>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    P: Clone + Send + 'static,
{
    /// Creates an engine reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::InvalidConfig`](crate::MaintainerError::InvalidConfig)
    /// if `config` fails validation.
    pub fn new(config: MaintainerConfig, sink: impl ReportSink<K, P> + 'static) -> MaintainerResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock), sink)
    }

    /// Creates an engine delivering reports to a closure.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_callback<F>(config: MaintainerConfig, callback: F) -> MaintainerResult<Self>
    where
        F: Fn(Report<K, P>) + Send + Sync + 'static,
    {
        Self::new(config, CallbackSink(callback))
    }

    /// Creates an engine reading an explicit clock.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_clock(
        config: MaintainerConfig,
        clock: Arc<dyn Clock>,
        sink: impl ReportSink<K, P> + 'static,
    ) -> MaintainerResult<Self> {
        config.validate()?;
        let cycle_duration = CycleDuration::new(config.cycle_duration_secs)?;
        Ok(Self {
            state: Guarded::new(EngineState::new(config)),
            cycle_duration,
            clock,
            sink: Box::new(sink),
            timer: parking_lot::Mutex::new(None),
        })
    }

    /// Folds one observation into its entity's history.
    ///
    /// Only `New` and `Corrected` updates with a finite event time are
    /// accepted; anything else is ignored and `Ok(false)` is returned. Accepted observations also
    /// recalibrate the virtual-clock offset.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn observe(&self, observation: Observation<K, P>) -> MaintainerResult<bool> {
        if !observation.flag.is_accepted() {
            tracing::trace!(key = ?observation.key, flag = %observation.flag, "ignoring update");
            return Ok(false);
        }
        if !observation.event_time.is_finite() {
            tracing::trace!(
                key = ?observation.key,
                event_time = observation.event_time,
                "ignoring update without a usable event time"
            );
            return Ok(false);
        }

        let mut state = self.state.lock()?;
        let now = self.clock.now();
        let limit = state.config.history_limit;
        let event_time = observation.event_time;

        let history = state.entities.entry(observation.key.clone()).or_insert_with(|| {
            tracing::debug!(key = ?observation.key, "new entity");
            EntityHistory::new()
        });
        history.push(observation, limit);

        state.epoch = now - event_time;
        tracing::debug!(epoch = state.epoch, entities = state.entities.len(), "observation folded");
        Ok(true)
    }

    /// Evaluates every entity once for promotion and eviction.
    ///
    /// A tentative entity with enough hits is promoted. Any entity whose
    /// offset-corrected age exceeds `cycle_duration * misses_before_drop` is
    /// removed. When both apply in one cycle only the drop is reported.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn run_maintenance_cycle(&self) -> MaintainerResult<CycleSummary> {
        let mut guard = self.state.lock()?;
        let state = &mut *guard;

        if !state.config.enabled {
            return Ok(CycleSummary {
                remaining: state.entities.len(),
                skipped: true,
                ..CycleSummary::default()
            });
        }

        // Read the live parameter once; later updates apply next cycle.
        let drop_limit = self.cycle_duration.secs() * f64::from(state.config.misses_before_drop);
        let threshold = state.config.hits_before_promote as usize;
        let epoch = state.epoch;
        let now = self.clock.now();
        let sink = &self.sink;
        let mut summary = CycleSummary::default();

        tracing::info!(entities = state.entities.len(), drop_limit, "checking entity collection");

        state.entities.retain(|key, history| {
            let mut report = None;

            if history.entity_type() == EntityType::Tentative && history.hits() >= threshold {
                tracing::debug!(?key, hits = history.hits(), threshold, "promoting entity");
                history.promote();
                report = Some(ReportKind::Promoted);
            }

            let Some(latest) = history.latest() else {
                return false;
            };
            let elapsed = now - (epoch + latest.event_time);
            let keep = elapsed <= drop_limit;
            if !keep {
                tracing::warn!(?key, elapsed, drop_limit, "dropping entity");
                report = Some(ReportKind::Dropping);
            }

            if let Some(kind) = report {
                match kind {
                    ReportKind::Promoted => summary.promoted += 1,
                    ReportKind::Dropping => summary.dropped += 1,
                }
                tracing::debug!(?key, %kind, entity_type = %history.entity_type(), "maintained entity");
                sink.deliver(Report {
                    key: key.clone(),
                    kind,
                    entity_type: history.entity_type(),
                    hits: history.hits(),
                    latest_event_time: latest.event_time,
                    payload: latest.payload.clone(),
                });
            }

            keep
        });

        state.cycles += 1;
        state.promoted += summary.promoted as u64;
        state.dropped += summary.dropped as u64;
        summary.remaining = state.entities.len();
        Ok(summary)
    }

    /// Replaces the configuration. Invalid values leave the old one in place.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::InvalidConfig`](crate::MaintainerError::InvalidConfig)
    /// for out-of-range values.
    pub fn configure(&self, config: MaintainerConfig) -> MaintainerResult<()> {
        config.validate()?;
        let mut state = self.state.lock()?;
        self.cycle_duration.set(config.cycle_duration_secs)?;
        tracing::info!(?config, "engine reconfigured");
        state.config = config;
        Ok(())
    }

    /// Returns a copy of the current configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn config(&self) -> MaintainerResult<MaintainerConfig> {
        Ok(self.state.lock()?.config.clone())
    }

    /// Returns the live cycle-duration handle for the host to update.
    #[must_use]
    pub fn cycle_duration(&self) -> CycleDuration {
        self.cycle_duration.clone()
    }

    /// Forgets every entity and the clock offset.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn reset(&self) -> MaintainerResult<()> {
        let mut state = self.state.lock()?;
        tracing::info!(entities = state.entities.len(), "resetting entity collection");
        state.clear();
        Ok(())
    }

    /// Spawns the periodic maintenance timer.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// timer is already running or its thread cannot be created.
    pub fn start_timer(self: &Arc<Self>) -> MaintainerResult<()> {
        let mut slot = self.timer.lock();
        if let Some(timer) = slot.as_ref() {
            if timer.is_running() {
                return Err(warden_sync::SyncError::CreateFailure(
                    warden_sync::Fault::AlreadyStarted,
                )
                .into());
            }
        }
        let timer = ThreadOfControl::named(
            "maintenance-timer",
            MaintenanceTimer::new(Arc::downgrade(self)),
        );
        timer.start()?;
        *slot = Some(timer);
        Ok(())
    }

    /// Stops the timer (if any), waits for it, and clears all state.
    ///
    /// # Errors
    ///
    /// Propagates cancellation, join and lock failures.
    pub fn shutdown(&self) -> MaintainerResult<()> {
        let timer = self.timer.lock().take();
        if let Some(timer) = timer {
            stop_timer(&timer)?;
        }
        self.reset()
    }

    /// Returns the maintenance timer period currently configured.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn maintenance_period(&self) -> MaintainerResult<std::time::Duration> {
        Ok(self.state.lock()?.config.maintenance_period())
    }

    /// Returns a copy of one entity's current state.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn entity(&self, key: &K) -> MaintainerResult<Option<EntitySnapshot<P>>> {
        let state = self.state.lock()?;
        Ok(state.entities.get(key).and_then(|history| {
            history.latest().map(|latest| EntitySnapshot {
                entity_type: history.entity_type(),
                hits: history.hits(),
                retained: history.records().count(),
                latest_event_time: latest.event_time,
                payload: latest.payload.clone(),
            })
        }))
    }

    /// Returns the number of tracked entities.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn len(&self) -> MaintainerResult<usize> {
        Ok(self.state.lock()?.entities.len())
    }

    /// Returns true if no entity is tracked.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn is_empty(&self) -> MaintainerResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Returns the current virtual-clock offset in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn epoch(&self) -> MaintainerResult<f64> {
        Ok(self.state.lock()?.epoch)
    }

    /// Returns diagnostic counters.
    ///
    /// # Errors
    ///
    /// Returns [`MaintainerError::Sync`](crate::MaintainerError::Sync) if the
    /// engine lock fails.
    pub fn status(&self) -> MaintainerResult<EngineStatus> {
        let timer_running = self.timer.lock().as_ref().is_some_and(ThreadOfControl::is_running);
        let state = self.state.lock()?;
        Ok(EngineStatus {
            enabled: state.config.enabled,
            entities: state.entities.len(),
            epoch: state.epoch,
            cycles: state.cycles,
            promoted: state.promoted,
            dropped: state.dropped,
            timer_running,
        })
    }
}

fn stop_timer(timer: &ThreadOfControl) -> MaintainerResult<()> {
    timer.cancel()?;
    if timer.is_active() {
        // Last engine reference released on the timer thread itself.
        timer.detach();
    } else {
        timer.join()?;
    }
    Ok(())
}

impl<K, P> Drop for EntityMaintenanceEngine<K, P> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            if let Err(err) = stop_timer(&timer) {
                tracing::error!(error = %err, "failed to stop maintenance timer");
            }
        }
    }
}

impl<K, P> fmt::Debug for EntityMaintenanceEngine<K, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityMaintenanceEngine")
            .field("cycle_duration", &self.cycle_duration.secs())
            .field("locked", &self.state.is_locked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::MaintainerError;
    use crate::observation::UpdateFlag;
    use crossbeam_channel::{unbounded, Receiver};

    type Engine = EntityMaintenanceEngine<u32, &'static str>;

    fn test_config() -> MaintainerConfig {
        MaintainerConfig {
            hits_before_promote: 3,
            misses_before_drop: 3,
            cycle_duration_secs: 1.0,
            maintenance_period_secs: 0.01,
            ..MaintainerConfig::default()
        }
    }

    fn engine_at(secs: f64) -> (Engine, ManualClock, Receiver<Report<u32, &'static str>>) {
        let clock = ManualClock::new(secs);
        let (tx, rx) = unbounded();
        let engine = Engine::with_clock(test_config(), Arc::new(clock.clone()), tx).unwrap();
        (engine, clock, rx)
    }

    #[test]
    fn test_promotion_after_threshold() {
        let (engine, _clock, rx) = engine_at(1000.0);
        for t in [10.0, 11.0, 12.0] {
            assert!(engine.observe(Observation::new(42, t, "hit")).unwrap());
        }

        let summary = engine.run_maintenance_cycle().unwrap();
        assert_eq!(summary.promoted, 1);
        assert_eq!(summary.dropped, 0);

        let reports: Vec<_> = rx.try_iter().collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].key, 42);
        assert_eq!(reports[0].kind, ReportKind::Promoted);
        assert_eq!(reports[0].hits, 3);

        let entity = engine.entity(&42).unwrap().unwrap();
        assert_eq!(entity.entity_type, EntityType::Confirmed);
    }

    #[test]
    fn test_below_threshold_stays_tentative() {
        let (engine, _clock, rx) = engine_at(1000.0);
        engine.observe(Observation::new(1, 10.0, "a")).unwrap();
        engine.observe(Observation::new(1, 11.0, "b")).unwrap();

        assert_eq!(engine.run_maintenance_cycle().unwrap().promoted, 0);
        assert!(rx.try_recv().is_err());
        assert_eq!(
            engine.entity(&1).unwrap().unwrap().entity_type,
            EntityType::Tentative
        );
    }

    #[test]
    fn test_second_cycle_without_input_is_silent() {
        let (engine, clock, rx) = engine_at(1000.0);
        for t in [1.0, 2.0, 3.0] {
            engine.observe(Observation::new(5, t, "x")).unwrap();
        }
        engine.observe(Observation::new(6, 3.0, "y")).unwrap();
        clock.advance(3.5);

        let first = engine.run_maintenance_cycle().unwrap();
        assert_eq!(first.dropped, 2);
        assert_eq!(rx.try_iter().count(), 2);

        let second = engine.run_maintenance_cycle().unwrap();
        assert_eq!(second, CycleSummary::default());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_stale_entity_is_dropped_once() {
        let (engine, clock, rx) = engine_at(2000.0);
        engine.observe(Observation::new(7, 50.0, "last")).unwrap();

        clock.advance(2.9);
        assert_eq!(engine.run_maintenance_cycle().unwrap().dropped, 0);

        clock.advance(0.6);
        let summary = engine.run_maintenance_cycle().unwrap();
        assert_eq!(summary.dropped, 1);
        assert_eq!(summary.remaining, 0);

        let report = rx.try_recv().unwrap();
        assert_eq!(report.key, 7);
        assert_eq!(report.kind, ReportKind::Dropping);
        assert_eq!(report.payload, "last");
        assert!(engine.entity(&7).unwrap().is_none());

        engine.run_maintenance_cycle().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_supersedes_promotion_in_same_cycle() {
        let (engine, clock, rx) = engine_at(500.0);
        for t in [1.0, 2.0, 3.0] {
            engine.observe(Observation::new(9, t, "p")).unwrap();
        }
        clock.advance(10.0);

        let summary = engine.run_maintenance_cycle().unwrap();
        assert_eq!((summary.promoted, summary.dropped), (0, 1));

        let reports: Vec<_> = rx.try_iter().collect();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, ReportKind::Dropping);
        assert_eq!(reports[0].entity_type, EntityType::Confirmed);
    }

    #[test]
    fn test_unaccepted_updates_are_ignored() {
        let (engine, _clock, _rx) = engine_at(100.0);
        engine.observe(Observation::new(1, 10.0, "n")).unwrap();
        let epoch = engine.epoch().unwrap();

        for flag in [UpdateFlag::Predicted, UpdateFlag::Dropping, UpdateFlag::Promoted] {
            assert!(!engine
                .observe(Observation::new(1, 99.0, "skip").with_flag(flag))
                .unwrap());
        }
        assert!(engine
            .observe(Observation::new(2, 10.0, "c").with_flag(UpdateFlag::Corrected))
            .unwrap());

        assert_eq!(engine.entity(&1).unwrap().unwrap().hits, 1);
        assert_eq!(engine.len().unwrap(), 2);
        assert!((engine.epoch().unwrap() - epoch).abs() < f64::EPSILON);
    }

    #[test]
    fn test_non_finite_event_time_is_ignored() {
        let (engine, clock, rx) = engine_at(1000.0);
        for key in 1..=5 {
            engine.observe(Observation::new(key, 990.0, "ok")).unwrap();
        }
        let epoch = engine.epoch().unwrap();

        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(!engine.observe(Observation::new(99, bad, "bad")).unwrap());
        }
        assert!(engine.entity(&99).unwrap().is_none());
        assert!((engine.epoch().unwrap() - epoch).abs() < f64::EPSILON);

        clock.advance(1.0);
        let summary = engine.run_maintenance_cycle().unwrap();
        assert_eq!(summary.dropped, 0);
        assert_eq!(summary.remaining, 5);
        assert_eq!(rx.try_iter().count(), 0);
    }

    #[test]
    fn test_epoch_uses_clock_read_under_lock() {
        let (engine, clock, _rx) = engine_at(500.0);
        let guard = engine.state.lock().unwrap();
        let observer = std::thread::scope(|scope| {
            let handle = scope.spawn(|| engine.observe(Observation::new(1, 100.0, "late")));
            // The observer is parked on the engine lock while time moves on.
            std::thread::sleep(std::time::Duration::from_millis(50));
            clock.advance(10.0);
            drop(guard);
            handle.join().unwrap()
        });
        assert!(observer.unwrap());
        assert!((engine.epoch().unwrap() - 410.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_confirmed_source_is_not_promoted_again() {
        let (engine, _clock, rx) = engine_at(100.0);
        for t in [1.0, 2.0, 3.0] {
            engine
                .observe(Observation::new(3, t, "c").with_type(EntityType::Confirmed))
                .unwrap();
        }
        assert_eq!(engine.run_maintenance_cycle().unwrap().promoted, 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_epoch_tracks_latest_observation_of_any_entity() {
        let (engine, clock, _rx) = engine_at(1000.0);
        engine.observe(Observation::new(1, 100.0, "a")).unwrap();
        assert!((engine.epoch().unwrap() - 900.0).abs() < 1e-9);

        clock.advance(5.0);
        engine.observe(Observation::new(2, 102.0, "b")).unwrap();
        assert!((engine.epoch().unwrap() - 903.0).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_engine_skips_cycles() {
        let (engine, clock, rx) = engine_at(1000.0);
        engine
            .configure(MaintainerConfig {
                enabled: false,
                ..test_config()
            })
            .unwrap();
        engine.observe(Observation::new(1, 1.0, "a")).unwrap();
        clock.advance(100.0);

        let summary = engine.run_maintenance_cycle().unwrap();
        assert!(summary.skipped);
        assert_eq!(summary.remaining, 1);
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.status().unwrap().to_string(), "Disabled");
    }

    #[test]
    fn test_invalid_configure_keeps_previous() {
        let (engine, _clock, _rx) = engine_at(0.0);
        let err = engine
            .configure(MaintainerConfig {
                hits_before_promote: 0,
                ..test_config()
            })
            .unwrap_err();
        assert!(matches!(err, MaintainerError::InvalidConfig(_)));
        assert_eq!(engine.config().unwrap(), test_config());
    }

    #[test]
    fn test_cycle_duration_update_applies_next_cycle() {
        let (engine, clock, rx) = engine_at(1000.0);
        engine.observe(Observation::new(1, 1.0, "a")).unwrap();
        clock.advance(2.0);

        assert_eq!(engine.run_maintenance_cycle().unwrap().dropped, 0);

        engine.cycle_duration().set(0.5).unwrap();
        assert_eq!(engine.run_maintenance_cycle().unwrap().dropped, 1);
        assert_eq!(rx.try_recv().unwrap().key, 1);
    }

    #[test]
    fn test_reset_clears_entities_and_epoch() {
        let (engine, _clock, _rx) = engine_at(1000.0);
        engine.observe(Observation::new(1, 1.0, "a")).unwrap();
        engine.reset().unwrap();
        assert!(engine.is_empty().unwrap());
        assert!(engine.epoch().unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_status_counts_reports() {
        let (engine, clock, _rx) = engine_at(1000.0);
        for t in [1.0, 2.0, 3.0] {
            engine.observe(Observation::new(1, t, "a")).unwrap();
        }
        engine.observe(Observation::new(2, 3.0, "b")).unwrap();
        engine.run_maintenance_cycle().unwrap();
        clock.advance(4.0);
        engine.run_maintenance_cycle().unwrap();

        let status = engine.status().unwrap();
        assert_eq!(status.cycles, 2);
        assert_eq!(status.promoted, 1);
        assert_eq!(status.dropped, 2);
        assert_eq!(status.entities, 0);
        assert!(!status.timer_running);
        assert_eq!(
            status.to_string(),
            "Enabled (0 entities, 1 promoted, 2 dropped)"
        );
    }

    #[test]
    fn test_history_limit_bounds_retained_records() {
        let clock = ManualClock::new(100.0);
        let engine = Engine::with_clock(
            MaintainerConfig {
                history_limit: Some(2),
                ..test_config()
            },
            Arc::new(clock),
            crate::report::NullSink,
        )
        .unwrap();
        for t in [1.0, 2.0, 3.0, 4.0] {
            engine.observe(Observation::new(1, t, "a")).unwrap();
        }
        let entity = engine.entity(&1).unwrap().unwrap();
        assert_eq!(entity.hits, 4);
        assert_eq!(entity.retained, 2);
    }
}
