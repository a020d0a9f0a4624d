//! refcheck-core library.
//!
//! Holds the reference history an applicant discloses for a background
//! check, rebuilds it from raw form input on every edit, and works out which
//! parts of the trailing coverage window are not accounted for.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at the model boundary, `anyhow::Result`
//!   for config loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod config;
pub mod dates;
pub mod error;
pub mod gaps;
pub mod identity;
pub mod model;
pub mod raw;
pub mod store;

pub use dates::{Clock, CoverageWindow, FixedClock, SystemClock};
pub use gaps::{Gap, GapPosition};
pub use identity::{Handle, HandleRegistry, Tag};
pub use model::{FormState, PeriodReference, PersonalReference};
pub use store::{AlwaysConfirm, Confirm, NeverConfirm, PeriodSeed, ReferenceStore, RemoveOutcome};
