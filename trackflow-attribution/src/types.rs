//! Core attribution types
//!
//! Touchpoints are recorded by the tracking side and are read-only here.
//! Everything the engine produces (credits, allocations, summaries) is
//! keyed by the conversion subject the touchpoints belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::ModelKind;

/// String wrapper for conversion subject identifiers (lead, deal, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Create a new subject ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// String wrapper for touchpoint identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TouchpointId(String);

impl TouchpointId {
    /// Create a new touchpoint ID from a string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh time-ordered ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TouchpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TouchpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for TouchpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An interaction event on a subject's path to conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Touchpoint {
    pub id: TouchpointId,
    pub subject_id: SubjectId,
    pub timestamp: DateTime<Utc>,
    /// Source/medium the visitor arrived through (e.g. `email`, `google/cpc`)
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    /// Insertion order assigned by the tracker; breaks timestamp ties
    #[serde(default)]
    pub position: u32,
}

impl Touchpoint {
    /// Create a touchpoint without a campaign
    pub fn new(
        id: impl Into<TouchpointId>,
        subject_id: impl Into<SubjectId>,
        timestamp: DateTime<Utc>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            subject_id: subject_id.into(),
            timestamp,
            channel: channel.into(),
            campaign_id: None,
            position: 0,
        }
    }

    /// Attach a campaign
    #[must_use]
    pub fn with_campaign(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    /// Set the insertion position
    #[must_use]
    pub fn with_position(mut self, position: u32) -> Self {
        self.position = position;
        self
    }
}

/// Terminal outcome that triggers attribution for a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub subject_id: SubjectId,
    pub converted_at: DateTime<Utc>,
    /// Per-subject model override; falls back to the configured default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ConversionEvent {
    pub fn new(subject_id: impl Into<SubjectId>, converted_at: DateTime<Utc>) -> Self {
        Self {
            subject_id: subject_id.into(),
            converted_at,
            model: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Credit assigned to a single touchpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchpointCredit {
    pub touchpoint_id: TouchpointId,
    pub channel: String,
    pub campaign_id: Option<String>,
    pub credit: f64,
}

/// Engine output: credit per touchpoint in chronological order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub model: ModelKind,
    pub credits: Vec<TouchpointCredit>,
    /// Input was not time-ordered and had to be resorted
    pub reordered: bool,
}

impl Attribution {
    /// Credit assigned to a touchpoint, if it was part of the input
    pub fn credit_for(&self, id: &TouchpointId) -> Option<f64> {
        self.credits
            .iter()
            .find(|c| &c.touchpoint_id == id)
            .map(|c| c.credit)
    }

    /// Sum of all credit fractions
    pub fn total(&self) -> f64 {
        self.credits.iter().map(|c| c.credit).sum()
    }

    /// Convert into persistable allocation records for a subject
    pub fn into_allocations(
        self,
        subject_id: &SubjectId,
        computed_at: DateTime<Utc>,
    ) -> Vec<CreditAllocation> {
        let model = self.model;
        self.credits
            .into_iter()
            .map(|c| CreditAllocation {
                subject_id: subject_id.clone(),
                touchpoint_id: c.touchpoint_id,
                model,
                credit: c.credit,
                channel: c.channel,
                campaign_id: c.campaign_id,
                computed_at,
            })
            .collect()
    }
}

/// Persisted credit for one touchpoint under one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditAllocation {
    pub subject_id: SubjectId,
    pub touchpoint_id: TouchpointId,
    pub model: ModelKind,
    pub credit: f64,
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub computed_at: DateTime<Utc>,
}

/// Per-subject attribution digest, as shown on the deal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributionSummary {
    pub subject_id: SubjectId,
    pub model: ModelKind,
    pub touchpoint_count: usize,
    pub first_touch_source: Option<String>,
    pub last_touch_source: Option<String>,
    /// Any counted touchpoint came through a campaign
    pub marketing_influenced: bool,
    pub computed_at: DateTime<Utc>,
}

impl AttributionSummary {
    /// Build a summary from the touchpoints an attribution was computed over
    pub fn from_attribution(
        subject_id: &SubjectId,
        attribution: &Attribution,
        computed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id: subject_id.clone(),
            model: attribution.model,
            touchpoint_count: attribution.credits.len(),
            first_touch_source: attribution.credits.first().map(|c| c.channel.clone()),
            last_touch_source: attribution.credits.last().map(|c| c.channel.clone()),
            marketing_influenced: attribution
                .credits
                .iter()
                .any(|c| c.campaign_id.is_some()),
            computed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_attribution() -> Attribution {
        Attribution {
            model: ModelKind::Linear,
            credits: vec![
                TouchpointCredit {
                    touchpoint_id: "tp-1".into(),
                    channel: "organic".into(),
                    campaign_id: None,
                    credit: 0.5,
                },
                TouchpointCredit {
                    touchpoint_id: "tp-2".into(),
                    channel: "email".into(),
                    campaign_id: Some("spring-sale".into()),
                    credit: 0.5,
                },
            ],
            reordered: false,
        }
    }

    #[test]
    fn test_subject_id_is_transparent_in_json() {
        let id = SubjectId::from("CRM-DEAL-0001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"CRM-DEAL-0001\"");
    }

    #[test]
    fn test_touchpoint_deserializes_without_optional_fields() {
        let json = r#"{
            "id": "tp-1",
            "subject_id": "lead-1",
            "timestamp": "2026-01-02T03:04:05Z",
            "channel": "direct"
        }"#;
        let tp: Touchpoint = serde_json::from_str(json).unwrap();
        assert_eq!(tp.position, 0);
        assert!(tp.campaign_id.is_none());
        assert_eq!(tp.subject_id.as_str(), "lead-1");
    }

    #[test]
    fn test_generated_touchpoint_ids_are_unique() {
        assert_ne!(TouchpointId::generate(), TouchpointId::generate());
    }

    #[test]
    fn test_attribution_lookup_and_total() {
        let attribution = sample_attribution();
        assert_eq!(attribution.credit_for(&"tp-2".into()), Some(0.5));
        assert_eq!(attribution.credit_for(&"tp-9".into()), None);
        assert!((attribution.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_into_allocations_carries_subject_and_model() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let allocations = sample_attribution().into_allocations(&"deal-7".into(), at);

        assert_eq!(allocations.len(), 2);
        assert!(allocations.iter().all(|a| a.model == ModelKind::Linear));
        assert!(allocations.iter().all(|a| a.subject_id.as_str() == "deal-7"));
        assert_eq!(allocations[1].campaign_id.as_deref(), Some("spring-sale"));
    }

    #[test]
    fn test_summary_records_first_and_last_source() {
        let at = Utc::now();
        let summary =
            AttributionSummary::from_attribution(&"deal-7".into(), &sample_attribution(), at);

        assert_eq!(summary.touchpoint_count, 2);
        assert_eq!(summary.first_touch_source.as_deref(), Some("organic"));
        assert_eq!(summary.last_touch_source.as_deref(), Some("email"));
        assert!(summary.marketing_influenced);
    }
}
