//! Touchpoint store boundary
//!
//! The store supplies touchpoints per conversion subject and keeps the
//! credit allocations and summaries the service computes from them.

mod file;
mod memory;

pub use file::{JsonFileStore, STORE_FILE};
pub use memory::InMemoryTouchpointStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::ModelKind;
use crate::types::{AttributionSummary, CreditAllocation, SubjectId, Touchpoint};

/// Storage interface for touchpoints and attribution results
#[async_trait]
pub trait TouchpointStore: Send + Sync {
    // Touchpoints
    /// Touchpoints for a subject, ordered by `(timestamp, position)`
    async fn fetch_touchpoints(&self, subject: &SubjectId) -> Result<Vec<Touchpoint>>;
    async fn record_touchpoint(&self, touchpoint: Touchpoint) -> Result<()>;

    // Credit allocations
    /// Replace every allocation previously stored for `(subject, model)`
    async fn persist_allocations(
        &self,
        subject: &SubjectId,
        model: ModelKind,
        allocations: &[CreditAllocation],
    ) -> Result<()>;
    async fn allocations_for(&self, subject: &SubjectId) -> Result<Vec<CreditAllocation>>;
    async fn all_allocations(&self, model: Option<ModelKind>) -> Result<Vec<CreditAllocation>>;

    // Summaries
    async fn save_summary(&self, summary: &AttributionSummary) -> Result<()>;
    async fn summary_for(&self, subject: &SubjectId) -> Result<Option<AttributionSummary>>;
}

/// Order touchpoints the way the engine expects them
pub(crate) fn sort_touchpoints(touchpoints: &mut [Touchpoint]) {
    touchpoints.sort_by_key(|tp| (tp.timestamp, tp.position));
}
