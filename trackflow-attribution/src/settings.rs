//! Attribution settings
//!
//! Mirrors the attribution section of the TrackFlow settings record. All
//! fields have defaults so a partial TOML table deserializes cleanly.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackflowError};

/// Model used when neither the conversion nor the caller names one
pub const DEFAULT_MODEL: &str = "Last Touch";

/// Days before a conversion that touchpoints still count
pub const DEFAULT_ATTRIBUTION_WINDOW_DAYS: u32 = 30;

/// Default half-life for the time decay model
pub const DEFAULT_HALF_LIFE_DAYS: f64 = 7.0;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Configuration for attribution computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionSettings {
    /// Whether attribution runs at all
    pub enabled: bool,
    /// Model name used when a conversion has no override
    pub default_model: String,
    /// Lookback window in days; 0 counts every touchpoint before conversion
    pub attribution_window_days: u32,
    /// Half-life for the time decay model, in days
    pub time_decay_half_life_days: f64,
    /// Position based share for the first touchpoint
    pub position_first_share: f64,
    /// Position based share for the last touchpoint
    pub position_last_share: f64,
}

impl Default for AttributionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_model: DEFAULT_MODEL.to_string(),
            attribution_window_days: DEFAULT_ATTRIBUTION_WINDOW_DAYS,
            time_decay_half_life_days: DEFAULT_HALF_LIFE_DAYS,
            position_first_share: 0.4,
            position_last_share: 0.4,
        }
    }
}

impl AttributionSettings {
    /// Time decay half-life as a duration
    pub fn half_life(&self) -> Result<TimeDelta> {
        let days = self.time_decay_half_life_days;
        if !days.is_finite() || days <= 0.0 {
            return Err(TrackflowError::InvalidConfig(format!(
                "time_decay_half_life_days must be positive, got {days}"
            )));
        }
        let millis = (days * MILLIS_PER_DAY).round();
        if millis < 1.0 || millis > i64::MAX as f64 {
            return Err(TrackflowError::InvalidConfig(format!(
                "time_decay_half_life_days out of range: {days}"
            )));
        }
        Ok(TimeDelta::milliseconds(millis as i64))
    }

    /// Lookback window, or `None` when unbounded
    pub fn window(&self) -> Option<TimeDelta> {
        match self.attribution_window_days {
            0 => None,
            days => Some(TimeDelta::days(i64::from(days))),
        }
    }
}
