//! trackflow-attribution - Multi-touch marketing attribution
//!
//! Given the touchpoints that led a lead or deal to convert, the engine
//! assigns each touchpoint a share of the conversion credit under one of
//! five models (first touch, last touch, linear, time decay, position
//! based). The engine itself is pure; [`AttributionService`] connects it to
//! a [`TouchpointStore`] that supplies touchpoints and keeps results.

pub mod engine;
pub mod error;
pub mod model;
pub mod report;
pub mod service;
pub mod settings;
pub mod store;
pub mod types;

pub use engine::{compute_attribution, decay_factor};
pub use error::{Result, TrackflowError};
pub use model::{AttributionModel, ModelKind, PositionSplit, model_for_kind, select_model};
pub use report::{CreditTotal, GroupBy, NO_CAMPAIGN, aggregate_credit};
pub use service::{AttributionOutcome, AttributionReport, AttributionService};
pub use settings::{
    AttributionSettings, DEFAULT_ATTRIBUTION_WINDOW_DAYS, DEFAULT_HALF_LIFE_DAYS, DEFAULT_MODEL,
};
pub use store::{InMemoryTouchpointStore, JsonFileStore, STORE_FILE, TouchpointStore};
pub use types::{
    Attribution, AttributionSummary, ConversionEvent, CreditAllocation, SubjectId, Touchpoint,
    TouchpointCredit, TouchpointId,
};
