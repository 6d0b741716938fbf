//! File-backed touchpoint store
//!
//! Keeps the whole store in memory and rewrites a single JSON document after
//! every mutation. A mutation becomes visible only once its document is on
//! disk. Suitable for the CLI and small installations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, TrackflowError};
use crate::model::ModelKind;
use crate::types::{AttributionSummary, CreditAllocation, SubjectId, Touchpoint};

use super::TouchpointStore;
use super::memory::{StoreSnapshot, StoreState};

/// Store file name inside the data directory
pub const STORE_FILE: &str = "store.json";

/// JSON file implementation of [`TouchpointStore`]
pub struct JsonFileStore {
    state: RwLock<StoreState>,
    file_path: PathBuf,
}

impl JsonFileStore {
    /// Load the store from `data_dir`, or start empty if no file exists yet
    pub async fn open(data_dir: &Path) -> Result<Self> {
        let file_path = data_dir.join(STORE_FILE);

        let state = if file_path.exists() {
            let content = fs::read_to_string(&file_path).await.map_err(|e| {
                TrackflowError::Store(format!("failed to read {}: {e}", file_path.display()))
            })?;
            let snapshot: StoreSnapshot = serde_json::from_str(&content)?;
            debug!(
                path = %file_path.display(),
                touchpoints = snapshot.touchpoints.len(),
                "Loaded touchpoint store"
            );
            StoreState::from_snapshot(snapshot)?
        } else {
            StoreState::default()
        };

        Ok(Self {
            state: RwLock::new(state),
            file_path,
        })
    }

    /// Path of the backing JSON file
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Apply `change` to a copy of the state, persist it, then commit it
    async fn update(&self, change: impl FnOnce(&mut StoreState) -> Result<()>) -> Result<()> {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        change(&mut next)?;
        self.persist(&next).await?;
        *state = next;
        Ok(())
    }

    /// Write `state` to disk
    ///
    /// Writes to a sibling temp file first and renames it over the store file
    /// so a crash never leaves a truncated document behind.
    async fn persist(&self, state: &StoreState) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                TrackflowError::Store(format!("failed to create data dir: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(&state.snapshot())?;
        let tmp_path = self.file_path.with_extension("json.tmp");

        fs::write(&tmp_path, content).await.map_err(|e| {
            TrackflowError::Store(format!("failed to write {}: {e}", tmp_path.display()))
        })?;
        fs::rename(&tmp_path, &self.file_path).await.map_err(|e| {
            TrackflowError::Store(format!(
                "failed to replace {}: {e}",
                self.file_path.display()
            ))
        })?;

        Ok(())
    }
}

#[async_trait]
impl TouchpointStore for JsonFileStore {
    async fn fetch_touchpoints(&self, subject: &SubjectId) -> Result<Vec<Touchpoint>> {
        Ok(self.state.read().await.touchpoints(subject))
    }

    async fn record_touchpoint(&self, touchpoint: Touchpoint) -> Result<()> {
        self.update(|state| state.record_touchpoint(touchpoint)).await
    }

    async fn persist_allocations(
        &self,
        subject: &SubjectId,
        model: ModelKind,
        allocations: &[CreditAllocation],
    ) -> Result<()> {
        self.update(|state| {
            state.replace_allocations(subject, model, allocations);
            Ok(())
        })
        .await
    }

    async fn allocations_for(&self, subject: &SubjectId) -> Result<Vec<CreditAllocation>> {
        Ok(self.state.read().await.allocations_for(subject))
    }

    async fn all_allocations(&self, model: Option<ModelKind>) -> Result<Vec<CreditAllocation>> {
        Ok(self.state.read().await.all_allocations(model))
    }

    async fn save_summary(&self, summary: &AttributionSummary) -> Result<()> {
        self.update(|state| {
            state.save_summary(summary);
            Ok(())
        })
        .await
    }

    async fn summary_for(&self, subject: &SubjectId) -> Result<Option<AttributionSummary>> {
        Ok(self.state.read().await.summary_for(subject))
    }
}
