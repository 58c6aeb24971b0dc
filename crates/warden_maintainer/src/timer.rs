//! # Maintenance Timer
//!
//! Runs [`EntityMaintenanceEngine::run_maintenance_cycle`] once per
//! configured period on its own thread of control.
//!
//! Cancellation is checked at the top of every cycle and during the timed
//! wait between cycles, never inside a sweep: a cycle either runs to
//! completion or does not start.

use std::fmt;
use std::hash::Hash;
use std::sync::Weak;

use warden_sync::{Control, Task};

use crate::engine::EntityMaintenanceEngine;

/// Task driving periodic maintenance.
///
/// Holds a weak reference so a forgotten timer never keeps the engine alive;
/// the task ends once the engine is gone.
pub struct MaintenanceTimer<K, P> {
    engine: Weak<EntityMaintenanceEngine<K, P>>,
}

impl<K, P> MaintenanceTimer<K, P> {
    /// Creates a timer for `engine`.
    #[must_use]
    pub fn new(engine: Weak<EntityMaintenanceEngine<K, P>>) -> Self {
        Self { engine }
    }
}

impl<K, P> Task for MaintenanceTimer<K, P>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + 'static,
    P: Clone + Send + 'static,
{
    fn run(&mut self, control: &Control) {
        tracing::info!("maintenance timer running");
        loop {
            if control.is_cancelled() {
                break;
            }

            let period = match self.engine.upgrade().map(|engine| engine.maintenance_period()) {
                Some(Ok(period)) => period,
                Some(Err(err)) => {
                    tracing::error!(error = %err, "cannot read maintenance period");
                    break;
                }
                None => break,
            };

            match control.wait_for(period) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    tracing::error!(error = %err, "maintenance timer wait failed");
                    break;
                }
            }

            let Some(engine) = self.engine.upgrade() else {
                break;
            };
            match engine.run_maintenance_cycle() {
                Ok(summary) => tracing::debug!(?summary, "maintenance cycle complete"),
                Err(err) => {
                    tracing::error!(error = %err, "maintenance cycle failed");
                    break;
                }
            }
        }
        tracing::info!("maintenance timer stopped");
    }
}
