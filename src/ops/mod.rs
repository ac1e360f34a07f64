//! High-level operations.
//!
//! This module contains the implementation of Berth commands: the
//! detection pipeline and the phases that follow it.

pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod verify;

pub use pipeline::{Detection, Mode, Pipeline, PipelineOptions, Plan};
pub use reconcile::{reconcile, BuildState, Reconciled};
pub use report::Summary;
pub use verify::{verify_imports, DylibLoader, LoadError, Loader, VerifyOutcome};
