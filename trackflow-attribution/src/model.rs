//! Attribution models and model selection
//!
//! A [`ModelKind`] names one of the five supported weighting policies; an
//! [`AttributionModel`] is a kind bound to its parameters (half-life for
//! time decay, first/last shares for position based).

use std::fmt;
use std::str::FromStr;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackflowError};
use crate::settings::AttributionSettings;

/// The five supported attribution models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    FirstTouch,
    LastTouch,
    Linear,
    TimeDecay,
    PositionBased,
}

impl ModelKind {
    /// Every model, in the order the settings screen lists them
    pub const ALL: [ModelKind; 5] = [
        ModelKind::LastTouch,
        ModelKind::FirstTouch,
        ModelKind::Linear,
        ModelKind::TimeDecay,
        ModelKind::PositionBased,
    ];

    /// Human-readable name, as stored in settings
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::FirstTouch => "First Touch",
            Self::LastTouch => "Last Touch",
            Self::Linear => "Linear",
            Self::TimeDecay => "Time Decay",
            Self::PositionBased => "Position Based",
        }
    }

    /// Machine name used in JSON and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstTouch => "first_touch",
            Self::LastTouch => "last_touch",
            Self::Linear => "linear",
            Self::TimeDecay => "time_decay",
            Self::PositionBased => "position_based",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::FirstTouch => "100% credit to the first touchpoint",
            Self::LastTouch => "100% credit to the last touchpoint",
            Self::Linear => "Equal credit to all touchpoints",
            Self::TimeDecay => "More credit to recent touchpoints",
            Self::PositionBased => "40% first, 40% last, 20% middle",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for ModelKind {
    type Err = TrackflowError;

    /// Accepts display names ("Time Decay") and machine names ("time_decay"),
    /// case-insensitively, with `-` treated like `_`.
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        ModelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| TrackflowError::UnknownModel(s.to_string()))
    }
}

/// First/last credit shares for the position-based model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSplit {
    pub first: f64,
    pub last: f64,
}

impl PositionSplit {
    /// Create a split, rejecting negative shares or shares above 100% in total
    pub fn new(first: f64, last: f64) -> Result<Self> {
        if !first.is_finite() || !last.is_finite() || first < 0.0 || last < 0.0 {
            return Err(TrackflowError::InvalidConfig(format!(
                "position split shares must be non-negative, got first={first} last={last}"
            )));
        }
        if first + last > 1.0 + f64::EPSILON {
            return Err(TrackflowError::InvalidConfig(format!(
                "position split first + last must not exceed 1.0, got {}",
                first + last
            )));
        }
        Ok(Self { first, last })
    }

    /// Share left for interior touchpoints
    pub fn middle(&self) -> f64 {
        (1.0 - self.first - self.last).max(0.0)
    }
}

impl Default for PositionSplit {
    fn default() -> Self {
        Self {
            first: 0.4,
            last: 0.4,
        }
    }
}

/// A model kind bound to its parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributionModel {
    FirstTouch,
    LastTouch,
    Linear,
    /// Weight halves every `half_life` before the reference time
    TimeDecay { half_life: TimeDelta },
    PositionBased(PositionSplit),
}

impl AttributionModel {
    /// Time decay model, rejecting non-positive half-lives
    pub fn time_decay(half_life: TimeDelta) -> Result<Self> {
        if half_life <= TimeDelta::zero() {
            return Err(TrackflowError::InvalidConfig(format!(
                "time decay half-life must be positive, got {half_life}"
            )));
        }
        Ok(Self::TimeDecay { half_life })
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::FirstTouch => ModelKind::FirstTouch,
            Self::LastTouch => ModelKind::LastTouch,
            Self::Linear => ModelKind::Linear,
            Self::TimeDecay { .. } => ModelKind::TimeDecay,
            Self::PositionBased(_) => ModelKind::PositionBased,
        }
    }
}

/// Resolve a configured model name into a parameterized model
///
/// Fails with [`TrackflowError::UnknownModel`] for names outside the five
/// supported models and [`TrackflowError::InvalidConfig`] when the bound
/// parameters are out of range.
pub fn select_model(name: &str, settings: &AttributionSettings) -> Result<AttributionModel> {
    let kind: ModelKind = name.parse()?;
    model_for_kind(kind, settings)
}

/// Bind a known model kind to the parameters in `settings`
pub fn model_for_kind(kind: ModelKind, settings: &AttributionSettings) -> Result<AttributionModel> {
    match kind {
        ModelKind::FirstTouch => Ok(AttributionModel::FirstTouch),
        ModelKind::LastTouch => Ok(AttributionModel::LastTouch),
        ModelKind::Linear => Ok(AttributionModel::Linear),
        ModelKind::TimeDecay => AttributionModel::time_decay(settings.half_life()?),
        ModelKind::PositionBased => Ok(AttributionModel::PositionBased(PositionSplit::new(
            settings.position_first_share,
            settings.position_last_share,
        )?)),
    }
}
