//! Credit reporting
//!
//! Rolls persisted allocations up by channel or campaign. The summed credit
//! of a group is the number of conversions attributed to it.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackflowError;
use crate::types::{CreditAllocation, SubjectId};

/// Group key for allocations without a campaign
pub const NO_CAMPAIGN: &str = "(none)";

/// Dimension to aggregate allocations by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    #[default]
    Channel,
    Campaign,
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => f.write_str("channel"),
            Self::Campaign => f.write_str("campaign"),
        }
    }
}

impl FromStr for GroupBy {
    type Err = TrackflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "channel" | "source" => Ok(Self::Channel),
            "campaign" => Ok(Self::Campaign),
            other => Err(TrackflowError::InvalidConfig(format!(
                "unknown report grouping: {other}"
            ))),
        }
    }
}

/// Aggregated credit for one channel or campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditTotal {
    pub key: String,
    /// Sum of credit fractions (attributed conversions)
    pub credit: f64,
    /// Allocations with non-zero credit
    pub touchpoints: usize,
    /// Distinct subjects with non-zero credit
    pub conversions: usize,
}

/// Sum credit per group, largest first
///
/// Allocations from different models are summed together; filter by model
/// before calling when a single-model view is wanted.
pub fn aggregate_credit(allocations: &[CreditAllocation], group_by: GroupBy) -> Vec<CreditTotal> {
    #[derive(Default)]
    struct Acc<'a> {
        credit: f64,
        touchpoints: usize,
        subjects: BTreeSet<&'a SubjectId>,
    }

    let mut groups: BTreeMap<&str, Acc<'_>> = BTreeMap::new();
    for allocation in allocations {
        let key = match group_by {
            GroupBy::Channel => allocation.channel.as_str(),
            GroupBy::Campaign => allocation.campaign_id.as_deref().unwrap_or(NO_CAMPAIGN),
        };
        let acc = groups.entry(key).or_default();
        acc.credit += allocation.credit;
        if allocation.credit > 0.0 {
            acc.touchpoints += 1;
            acc.subjects.insert(&allocation.subject_id);
        }
    }

    let mut totals: Vec<CreditTotal> = groups
        .into_iter()
        .map(|(key, acc)| CreditTotal {
            key: key.to_string(),
            credit: acc.credit,
            touchpoints: acc.touchpoints,
            conversions: acc.subjects.len(),
        })
        .collect();

    // BTreeMap already yields keys in order, so a stable sort keeps ties by key
    totals.sort_by(|a, b| b.credit.total_cmp(&a.credit));
    totals
}
