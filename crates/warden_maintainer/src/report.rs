//! # Maintenance Reports
//!
//! Reports leave the engine through a [`ReportSink`] while the maintenance
//! sweep still holds the collection lock. Sinks must not block; hand the
//! report to a channel or queue and return.

use std::fmt;

use crossbeam_channel::Sender;

use crate::observation::EntityType;

/// Why a report was emitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReportKind {
    /// A tentative entity reached the promotion threshold.
    Promoted,
    /// An entity went quiet past its drop deadline and was removed.
    Dropping,
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Promoted => f.write_str("promoted"),
            Self::Dropping => f.write_str("dropping"),
        }
    }
}

/// State change for one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct Report<K, P> {
    /// Entity identifier.
    pub key: K,
    /// What happened.
    pub kind: ReportKind,
    /// Classification after this cycle's promotion check.
    pub entity_type: EntityType,
    /// Observations accepted for the entity.
    pub hits: usize,
    /// Event time of the latest observation.
    pub latest_event_time: f64,
    /// Payload of the latest observation.
    pub payload: P,
}

/// Receives reports from the maintenance sweep.
pub trait ReportSink<K, P>: Send + Sync {
    /// Accepts one report. Called with the collection lock held.
    fn deliver(&self, report: Report<K, P>);
}

impl<K: Send, P: Send> ReportSink<K, P> for Sender<Report<K, P>> {
    fn deliver(&self, report: Report<K, P>) {
        if self.send(report).is_err() {
            tracing::warn!("report receiver disconnected; report discarded");
        }
    }
}

/// Adapts a closure into a [`ReportSink`].
pub struct CallbackSink<F>(pub F);

impl<K, P, F> ReportSink<K, P> for CallbackSink<F>
where
    F: Fn(Report<K, P>) + Send + Sync,
{
    fn deliver(&self, report: Report<K, P>) {
        (self.0)(report);
    }
}

impl<F> fmt::Debug for CallbackSink<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackSink")
    }
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl<K, P> ReportSink<K, P> for NullSink {
    fn deliver(&self, _report: Report<K, P>) {}
}
