//! # Observations and Entity Histories
//!
//! An [`Observation`] is one time-stamped update for an entity. The engine
//! keeps the accepted observations for each key in an [`EntityHistory`],
//! oldest first.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle classification of an entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// Not yet seen often enough to be trusted.
    #[default]
    Tentative,
    /// Promoted, either upstream or by the engine.
    Confirmed,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tentative => f.write_str("tentative"),
            Self::Confirmed => f.write_str("confirmed"),
        }
    }
}

/// What an incoming update says about the entity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFlag {
    /// First report of a new entity.
    #[default]
    New,
    /// Estimate corrected by a fresh measurement.
    Corrected,
    /// Estimate predicted forward without a measurement.
    Predicted,
    /// Waiting for a prediction step.
    NeedsPrediction,
    /// Waiting for a correction step.
    NeedsCorrection,
    /// Emitted by a maintainer on promotion.
    Promoted,
    /// Emitted by a maintainer on eviction.
    Dropping,
}

impl UpdateFlag {
    /// Returns true for the updates the engine folds into a history.
    #[inline]
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::New | Self::Corrected)
    }
}

impl fmt::Display for UpdateFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Corrected => "corrected",
            Self::Predicted => "predicted",
            Self::NeedsPrediction => "needs prediction",
            Self::NeedsCorrection => "needs correction",
            Self::Promoted => "promoted",
            Self::Dropping => "dropping",
        };
        f.write_str(name)
    }
}

/// One time-stamped update for the entity identified by `key`.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation<K, P> {
    /// Stable entity identifier.
    pub key: K,
    /// Event time in seconds, on the feed's own timebase.
    pub event_time: f64,
    /// Kind of update.
    pub flag: UpdateFlag,
    /// Classification reported by the source.
    pub entity_type: EntityType,
    /// Opaque payload carried into reports.
    pub payload: P,
}

impl<K, P> Observation<K, P> {
    /// Creates a `New`, `Tentative` observation.
    pub fn new(key: K, event_time: f64, payload: P) -> Self {
        Self {
            key,
            event_time,
            flag: UpdateFlag::New,
            entity_type: EntityType::Tentative,
            payload,
        }
    }

    /// Sets the update flag.
    #[must_use]
    pub fn with_flag(mut self, flag: UpdateFlag) -> Self {
        self.flag = flag;
        self
    }

    /// Sets the source classification.
    #[must_use]
    pub fn with_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = entity_type;
        self
    }
}

/// Accepted observations for one entity.
#[derive(Clone, Debug)]
pub struct EntityHistory<K, P> {
    records: VecDeque<Observation<K, P>>,
    entity_type: EntityType,
    hits: usize,
}

impl<K, P> EntityHistory<K, P> {
    pub(crate) fn new() -> Self {
        Self {
            records: VecDeque::new(),
            entity_type: EntityType::Tentative,
            hits: 0,
        }
    }

    /// Appends an observation, trimming the oldest records beyond `limit`.
    pub(crate) fn push(&mut self, observation: Observation<K, P>, limit: Option<usize>) {
        if observation.entity_type == EntityType::Confirmed {
            self.entity_type = EntityType::Confirmed;
        }
        self.hits += 1;
        self.records.push_back(observation);
        if let Some(limit) = limit {
            while self.records.len() > limit {
                self.records.pop_front();
            }
        }
    }

    pub(crate) fn promote(&mut self) {
        self.entity_type = EntityType::Confirmed;
    }

    /// Returns the current classification.
    #[inline]
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns how many observations were ever accepted, including any
    /// trimmed by a history limit.
    #[inline]
    #[must_use]
    pub const fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the retained observations, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &Observation<K, P>> {
        self.records.iter()
    }

    /// Returns the most recent observation.
    #[must_use]
    pub fn latest(&self) -> Option<&Observation<K, P>> {
        self.records.back()
    }
}
