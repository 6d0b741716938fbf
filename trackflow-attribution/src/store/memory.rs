//! In-memory touchpoint store
//!
//! Holds everything in process memory. Used by tests and by callers that
//! embed the engine next to their own persistence.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, TrackflowError};
use crate::model::ModelKind;
use crate::types::{AttributionSummary, CreditAllocation, SubjectId, Touchpoint};

use super::{TouchpointStore, sort_touchpoints};

/// Store contents shared by the in-memory and file-backed stores
#[derive(Debug, Default, Clone)]
pub(crate) struct StoreState {
    touchpoints: HashMap<SubjectId, Vec<Touchpoint>>,
    allocations: BTreeMap<(SubjectId, ModelKind), Vec<CreditAllocation>>,
    summaries: HashMap<SubjectId, AttributionSummary>,
}

/// Flat, serializable form of [`StoreState`]
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
    pub version: u32,
    #[serde(default)]
    pub touchpoints: Vec<Touchpoint>,
    #[serde(default)]
    pub allocations: Vec<CreditAllocation>,
    #[serde(default)]
    pub summaries: Vec<AttributionSummary>,
}

/// Current version of the snapshot format
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

impl StoreState {
    pub fn touchpoints(&self, subject: &SubjectId) -> Vec<Touchpoint> {
        self.touchpoints.get(subject).cloned().unwrap_or_default()
    }

    pub fn record_touchpoint(&mut self, touchpoint: Touchpoint) -> Result<()> {
        let journey = self
            .touchpoints
            .entry(touchpoint.subject_id.clone())
            .or_default();

        if journey.iter().any(|tp| tp.id == touchpoint.id) {
            return Err(TrackflowError::DuplicateTouchpoint {
                subject_id: touchpoint.subject_id.to_string(),
                touchpoint_id: touchpoint.id.to_string(),
            });
        }

        journey.push(touchpoint);
        sort_touchpoints(journey);
        Ok(())
    }

    pub fn replace_allocations(
        &mut self,
        subject: &SubjectId,
        model: ModelKind,
        allocations: &[CreditAllocation],
    ) {
        self.allocations
            .insert((subject.clone(), model), allocations.to_vec());
    }

    pub fn allocations_for(&self, subject: &SubjectId) -> Vec<CreditAllocation> {
        self.allocations
            .iter()
            .filter(|((s, _), _)| s == subject)
            .flat_map(|(_, allocations)| allocations.iter().cloned())
            .collect()
    }

    pub fn all_allocations(&self, model: Option<ModelKind>) -> Vec<CreditAllocation> {
        self.allocations
            .iter()
            .filter(|((_, m), _)| model.is_none_or(|wanted| *m == wanted))
            .flat_map(|(_, allocations)| allocations.iter().cloned())
            .collect()
    }

    pub fn save_summary(&mut self, summary: &AttributionSummary) {
        self.summaries
            .insert(summary.subject_id.clone(), summary.clone());
    }

    pub fn summary_for(&self, subject: &SubjectId) -> Option<AttributionSummary> {
        self.summaries.get(subject).cloned()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let mut touchpoints: Vec<Touchpoint> = self.touchpoints.values().flatten().cloned().collect();
        touchpoints.sort_by(|a, b| {
            a.subject_id
                .cmp(&b.subject_id)
                .then(a.timestamp.cmp(&b.timestamp))
                .then(a.position.cmp(&b.position))
        });

        let mut summaries: Vec<AttributionSummary> = self.summaries.values().cloned().collect();
        summaries.sort_by(|a, b| a.subject_id.cmp(&b.subject_id));

        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            touchpoints,
            allocations: self.all_allocations(None),
            summaries,
        }
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(TrackflowError::Store(format!(
                "store format version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut state = Self::default();
        for touchpoint in snapshot.touchpoints {
            state.record_touchpoint(touchpoint)?;
        }
        for allocation in snapshot.allocations {
            state
                .allocations
                .entry((allocation.subject_id.clone(), allocation.model))
                .or_default()
                .push(allocation);
        }
        for summary in snapshot.summaries {
            state.save_summary(&summary);
        }
        Ok(state)
    }
}

/// In-memory implementation of [`TouchpointStore`]
#[derive(Default)]
pub struct InMemoryTouchpointStore {
    state: RwLock<StoreState>,
}

impl InMemoryTouchpointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with touchpoints
    pub fn with_touchpoints(touchpoints: impl IntoIterator<Item = Touchpoint>) -> Result<Self> {
        let mut state = StoreState::default();
        for touchpoint in touchpoints {
            state.record_touchpoint(touchpoint)?;
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }
}

#[async_trait]
impl TouchpointStore for InMemoryTouchpointStore {
    async fn fetch_touchpoints(&self, subject: &SubjectId) -> Result<Vec<Touchpoint>> {
        Ok(self.state.read().await.touchpoints(subject))
    }

    async fn record_touchpoint(&self, touchpoint: Touchpoint) -> Result<()> {
        self.state.write().await.record_touchpoint(touchpoint)
    }

    async fn persist_allocations(
        &self,
        subject: &SubjectId,
        model: ModelKind,
        allocations: &[CreditAllocation],
    ) -> Result<()> {
        self.state
            .write()
            .await
            .replace_allocations(subject, model, allocations);
        Ok(())
    }

    async fn allocations_for(&self, subject: &SubjectId) -> Result<Vec<CreditAllocation>> {
        Ok(self.state.read().await.allocations_for(subject))
    }

    async fn all_allocations(&self, model: Option<ModelKind>) -> Result<Vec<CreditAllocation>> {
        Ok(self.state.read().await.all_allocations(model))
    }

    async fn save_summary(&self, summary: &AttributionSummary) -> Result<()> {
        self.state.write().await.save_summary(summary);
        Ok(())
    }

    async fn summary_for(&self, subject: &SubjectId) -> Result<Option<AttributionSummary>> {
        Ok(self.state.read().await.summary_for(subject))
    }
}
