//! Attribution service
//!
//! Runs attribution for a conversion end to end: resolve the model, fetch the
//! subject's touchpoints, keep those inside the attribution window, compute
//! credit, and persist allocations and the subject summary.
//!
//! Work for one subject is serialized so two conversions for the same deal
//! cannot interleave their writes; different subjects proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::engine::compute_attribution;
use crate::error::{Result, TrackflowError};
use crate::model::{AttributionModel, ModelKind, model_for_kind, select_model};
use crate::settings::AttributionSettings;
use crate::store::TouchpointStore;
use crate::types::{Attribution, AttributionSummary, ConversionEvent, SubjectId, Touchpoint};

/// Result of attributing one conversion under one model
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttributionOutcome {
    /// Credit was computed and persisted
    Attributed(AttributionReport),
    /// Nothing was persisted
    Skipped {
        subject_id: SubjectId,
        model: Option<ModelKind>,
        reason: String,
    },
}

impl AttributionOutcome {
    pub fn is_attributed(&self) -> bool {
        matches!(self, Self::Attributed(_))
    }

    /// The report, if credit was computed
    pub fn report(&self) -> Option<&AttributionReport> {
        match self {
            Self::Attributed(report) => Some(report),
            Self::Skipped { .. } => None,
        }
    }
}

/// Details of a persisted attribution
#[derive(Debug, Clone, Serialize)]
pub struct AttributionReport {
    pub subject_id: SubjectId,
    pub attribution: Attribution,
    pub summary: AttributionSummary,
    /// Touchpoints dropped for falling outside the attribution window
    pub excluded: usize,
}

/// Orchestrates store access and attribution computation
pub struct AttributionService {
    store: Arc<dyn TouchpointStore>,
    settings: AttributionSettings,
    /// Per-subject locks; entries are dropped once no task holds them
    subject_locks: StdMutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
}

impl AttributionService {
    /// Create a service over `store`
    pub fn new(store: Arc<dyn TouchpointStore>, settings: AttributionSettings) -> Self {
        Self {
            store,
            settings,
            subject_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Check if attribution is enabled
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    pub fn settings(&self) -> &AttributionSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn TouchpointStore> {
        &self.store
    }

    /// Attribute a conversion under its override model or the configured default
    ///
    /// Returns [`TrackflowError::UnknownModel`] or
    /// [`TrackflowError::InvalidConfig`] when the model cannot be resolved.
    /// An empty (windowed) journey is reported as
    /// [`AttributionOutcome::Skipped`], not as an error.
    pub async fn attribute(&self, event: &ConversionEvent) -> Result<AttributionOutcome> {
        if !self.settings.enabled {
            return Ok(self.disabled(event));
        }

        let model = select_model(self.model_name(event), &self.settings)?;
        let mut outcomes = self.run(event, &[model], model.kind()).await?;
        outcomes
            .pop()
            .ok_or_else(|| TrackflowError::Store("attribution produced no outcome".into()))
    }

    /// Attribute a conversion under every model, for side-by-side comparison
    ///
    /// Allocations are persisted for each model; the subject summary reflects
    /// the conversion's effective model.
    pub async fn attribute_all_models(
        &self,
        event: &ConversionEvent,
    ) -> Result<Vec<AttributionOutcome>> {
        if !self.settings.enabled {
            return Ok(vec![self.disabled(event)]);
        }

        let effective: ModelKind = self.model_name(event).parse()?;
        let models = ModelKind::ALL
            .into_iter()
            .map(|kind| model_for_kind(kind, &self.settings))
            .collect::<Result<Vec<_>>>()?;

        self.run(event, &models, effective).await
    }

    fn model_name<'a>(&'a self, event: &'a ConversionEvent) -> &'a str {
        event
            .model
            .as_deref()
            .unwrap_or(&self.settings.default_model)
    }

    fn disabled(&self, event: &ConversionEvent) -> AttributionOutcome {
        debug!(subject = %event.subject_id, "Attribution disabled, skipping");
        AttributionOutcome::Skipped {
            subject_id: event.subject_id.clone(),
            model: None,
            reason: "attribution disabled".to_string(),
        }
    }

    /// Run `models` for one conversion while holding the subject lock
    async fn run(
        &self,
        event: &ConversionEvent,
        models: &[AttributionModel],
        summary_model: ModelKind,
    ) -> Result<Vec<AttributionOutcome>> {
        let entry = self.lock_subject(&event.subject_id);
        let _guard = entry.lock.lock().await;
        self.run_locked(event, models, summary_model).await
    }

    async fn run_locked(
        &self,
        event: &ConversionEvent,
        models: &[AttributionModel],
        summary_model: ModelKind,
    ) -> Result<Vec<AttributionOutcome>> {
        let subject = &event.subject_id;
        let touchpoints = self.store.fetch_touchpoints(subject).await?;
        let total = touchpoints.len();

        let windowed: Vec<Touchpoint> = touchpoints
            .into_iter()
            .filter(|tp| within_window(tp, event.converted_at, self.settings.window()))
            .collect();
        let excluded = total - windowed.len();

        debug!(
            subject = %subject,
            touchpoints = windowed.len(),
            excluded,
            "Fetched touchpoints for conversion"
        );

        let mut outcomes = Vec::with_capacity(models.len());
        for model in models {
            let kind = model.kind();
            let attribution = match compute_attribution(&windowed, model, event.converted_at) {
                Ok(attribution) => attribution,
                Err(TrackflowError::EmptySequence) => {
                    info!(
                        subject = %subject,
                        model = %kind,
                        excluded,
                        "No touchpoints in attribution window, skipping persistence"
                    );
                    outcomes.push(AttributionOutcome::Skipped {
                        subject_id: subject.clone(),
                        model: Some(kind),
                        reason: format!(
                            "no touchpoints within attribution window ({excluded} excluded)"
                        ),
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            let computed_at = Utc::now();
            let summary = AttributionSummary::from_attribution(subject, &attribution, computed_at);
            let allocations = attribution.clone().into_allocations(subject, computed_at);

            self.store
                .persist_allocations(subject, kind, &allocations)
                .await?;
            if kind == summary_model {
                self.store.save_summary(&summary).await?;
            }

            info!(
                subject = %subject,
                model = %kind,
                touchpoints = allocations.len(),
                "Attribution persisted"
            );

            outcomes.push(AttributionOutcome::Attributed(AttributionReport {
                subject_id: subject.clone(),
                attribution,
                summary,
                excluded,
            }));
        }

        Ok(outcomes)
    }

    /// Register interest in a subject's lock; the entry is released on drop
    fn lock_subject(&self, subject: &SubjectId) -> SubjectLock<'_> {
        let lock = self
            .subject_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(subject.clone())
            .or_default()
            .clone();
        SubjectLock {
            locks: &self.subject_locks,
            subject: subject.clone(),
            lock,
        }
    }

    #[cfg(test)]
    fn tracked_subjects(&self) -> usize {
        self.subject_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A task's handle on one subject's lock
///
/// Dropping the handle, including when the owning future is cancelled while
/// waiting, removes the map entry once no other task references it.
struct SubjectLock<'a> {
    locks: &'a StdMutex<HashMap<SubjectId, Arc<Mutex<()>>>>,
    subject: SubjectId,
    lock: Arc<Mutex<()>>,
}

impl Drop for SubjectLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and this handle still reference it
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.subject);
        }
    }
}

/// Whether a touchpoint counts toward a conversion at `converted_at`
///
/// A window reaching past the earliest representable time is unbounded.
fn within_window(
    touchpoint: &Touchpoint,
    converted_at: DateTime<Utc>,
    window: Option<TimeDelta>,
) -> bool {
    let earliest = window.and_then(|window| converted_at.checked_sub_signed(window));
    touchpoint.timestamp <= converted_at
        && earliest.is_none_or(|earliest| touchpoint.timestamp >= earliest)
}
