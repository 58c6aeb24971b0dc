//! # WARDEN Maintainer
//!
//! Keeps a keyed collection of time-stamped entity histories consistent.
//!
//! ## Design Principles
//!
//! 1. **One lock** - observations and maintenance sweeps are linearized
//! 2. **Replay-safe timing** - staleness is measured against an offset
//!    recalibrated on every observation, not raw wall-clock time
//! 3. **Reports, not errors** - an entity going quiet is an expected event
//! 4. **External configuration** - tunables live in TOML
//!
//! ## Example
//!
//! ```rust,ignore
//! use warden_maintainer::{EntityMaintenanceEngine, MaintainerConfig, Observation};
//!
//! let (tx, rx) = crossbeam_channel::unbounded();
//! let engine = Arc::new(EntityMaintenanceEngine::new(MaintainerConfig::default(), tx)?);
//! engine.start_timer()?;
//!
//! engine.observe(Observation::new(42u32, event_time, payload))?;
//! for report in rx.try_iter() {
//!     // forward promotions and drops downstream
//! }
//! engine.shutdown()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod observation;
pub mod report;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CycleDuration, MaintainerConfig};
pub use engine::{CycleSummary, EngineStatus, EntityMaintenanceEngine, EntitySnapshot};
pub use error::{MaintainerError, MaintainerResult};
pub use observation::{EntityHistory, EntityType, Observation, UpdateFlag};
pub use report::{CallbackSink, NullSink, Report, ReportKind, ReportSink};
pub use timer::MaintenanceTimer;
