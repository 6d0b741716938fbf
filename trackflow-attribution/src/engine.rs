//! Attribution engine
//!
//! Pure functions that turn a subject's touchpoints into credit fractions.
//! The engine performs no I/O and keeps no state; callers supply the
//! touchpoints, the bound model, and the reference time on every call.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::error::{Result, TrackflowError};
use crate::model::{AttributionModel, PositionSplit};
use crate::types::{Attribution, Touchpoint, TouchpointCredit};

/// Compute per-touchpoint credit under `model`
///
/// Touchpoints are processed in ascending `(timestamp, position)` order.
/// Input that is not already in that order is resorted (stably) rather than
/// rejected, and the result is flagged as `reordered`.
///
/// For non-empty input the returned credits are non-negative and sum to 1.
/// Empty input yields [`TrackflowError::EmptySequence`]. Model parameters
/// built without their validating constructors are checked here and
/// rejected with [`TrackflowError::InvalidConfig`].
pub fn compute_attribution(
    touchpoints: &[Touchpoint],
    model: &AttributionModel,
    reference_time: DateTime<Utc>,
) -> Result<Attribution> {
    validate(model)?;
    if touchpoints.is_empty() {
        return Err(TrackflowError::EmptySequence);
    }

    let (ordered, reordered) = chronological(touchpoints);
    if reordered {
        debug!(
            count = ordered.len(),
            "Touchpoints were not time-ordered, resorted before attribution"
        );
    }

    let weights = match model {
        AttributionModel::FirstTouch => first_touch(ordered.len()),
        AttributionModel::LastTouch => last_touch(ordered.len()),
        AttributionModel::Linear => linear(ordered.len()),
        AttributionModel::TimeDecay { half_life } => {
            time_decay(&ordered, reference_time, *half_life)
        }
        AttributionModel::PositionBased(split) => position_based(ordered.len(), split),
    };

    let credits = ordered
        .into_iter()
        .zip(weights)
        .map(|(tp, credit)| TouchpointCredit {
            touchpoint_id: tp.id.clone(),
            channel: tp.channel.clone(),
            campaign_id: tp.campaign_id.clone(),
            credit,
        })
        .collect();

    Ok(Attribution {
        model: model.kind(),
        credits,
        reordered,
    })
}

/// Decay factor `2^(-Δt/half_life)` for a touchpoint `delta` before the reference
///
/// Negative deltas (touchpoints after the reference) count as zero. The
/// half-life must be positive.
pub fn decay_factor(delta: TimeDelta, half_life: TimeDelta) -> f64 {
    let delta = seconds(delta.max(TimeDelta::zero()));
    (-delta / seconds(half_life)).exp2()
}

/// Fractional seconds, keeping sub-millisecond precision
fn seconds(delta: TimeDelta) -> f64 {
    delta.num_seconds() as f64 + f64::from(delta.subsec_nanos()) / 1e9
}

fn validate(model: &AttributionModel) -> Result<()> {
    match model {
        AttributionModel::TimeDecay { half_life } => {
            AttributionModel::time_decay(*half_life)?;
        }
        AttributionModel::PositionBased(split) => {
            PositionSplit::new(split.first, split.last)?;
        }
        AttributionModel::FirstTouch | AttributionModel::LastTouch | AttributionModel::Linear => {}
    }
    Ok(())
}

/// Touchpoints in processing order, and whether the input had to be resorted
fn chronological(touchpoints: &[Touchpoint]) -> (Vec<&Touchpoint>, bool) {
    let key = |tp: &Touchpoint| (tp.timestamp, tp.position);
    let mut ordered: Vec<&Touchpoint> = touchpoints.iter().collect();

    let sorted = touchpoints.windows(2).all(|w| key(&w[0]) <= key(&w[1]));
    if !sorted {
        // sort_by_key is stable, so full ties keep their slice order
        ordered.sort_by_key(|tp| key(tp));
    }

    (ordered, !sorted)
}

fn first_touch(n: usize) -> Vec<f64> {
    let mut weights = vec![0.0; n];
    weights[0] = 1.0;
    weights
}

fn last_touch(n: usize) -> Vec<f64> {
    let mut weights = vec![0.0; n];
    weights[n - 1] = 1.0;
    weights
}

fn linear(n: usize) -> Vec<f64> {
    vec![1.0 / n as f64; n]
}

fn time_decay(
    ordered: &[&Touchpoint],
    reference_time: DateTime<Utc>,
    half_life: TimeDelta,
) -> Vec<f64> {
    let deltas: Vec<TimeDelta> = ordered
        .iter()
        .map(|tp| (reference_time - tp.timestamp).max(TimeDelta::zero()))
        .collect();

    // Measure decay from the most recent touchpoint so the largest raw weight
    // is exactly 1 and old journeys never underflow to all zeros. The ratio
    // between weights, and hence the normalized result, is unchanged.
    // `ordered` is non-empty and ascending, so the last delta is the smallest.
    let nearest = deltas[deltas.len() - 1];
    let raw: Vec<f64> = deltas
        .iter()
        .map(|&delta| decay_factor(delta - nearest, half_life))
        .collect();

    normalize(raw)
}

fn position_based(n: usize, split: &PositionSplit) -> Vec<f64> {
    match n {
        1 => vec![1.0],
        2 => {
            let ends = split.first + split.last;
            if ends <= 0.0 {
                vec![0.5, 0.5]
            } else {
                vec![split.first / ends, split.last / ends]
            }
        }
        _ => {
            let interior = split.middle() / (n - 2) as f64;
            let mut weights = vec![interior; n];
            weights[0] = split.first;
            weights[n - 1] = split.last;
            // A split with no middle share and zero ends would assign nothing
            if weights.iter().sum::<f64>() <= 0.0 {
                return linear(n);
            }
            normalize(weights)
        }
    }
}

fn normalize(weights: Vec<f64>) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelKind;
    use chrono::TimeZone;

    const EPS: f64 = 1e-9;

    fn t(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, day, hour, 0, 0).unwrap()
    }

    fn journey(count: usize) -> Vec<Touchpoint> {
        (0..count)
            .map(|i| {
                Touchpoint::new(
                    format!("tp-{i}").as_str(),
                    "deal-1",
                    t(1 + i as u32, 9),
                    format!("channel-{i}"),
                )
                .with_position(i as u32)
            })
            .collect()
    }

    fn credits(attribution: &Attribution) -> Vec<f64> {
        attribution.credits.iter().map(|c| c.credit).collect()
    }

    fn all_models() -> Vec<AttributionModel> {
        vec![
            AttributionModel::FirstTouch,
            AttributionModel::LastTouch,
            AttributionModel::Linear,
            AttributionModel::TimeDecay {
                half_life: TimeDelta::days(1),
            },
            AttributionModel::PositionBased(PositionSplit::default()),
        ]
    }

    #[test]
    fn test_first_touch_credits_earliest() {
        let result =
            compute_attribution(&journey(3), &AttributionModel::FirstTouch, t(20, 0)).unwrap();
        assert_eq!(credits(&result), vec![1.0, 0.0, 0.0]);
        assert_eq!(result.model, ModelKind::FirstTouch);
    }

    #[test]
    fn test_last_touch_credits_latest() {
        let result =
            compute_attribution(&journey(3), &AttributionModel::LastTouch, t(20, 0)).unwrap();
        assert_eq!(credits(&result), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_linear_splits_evenly() {
        let result = compute_attribution(&journey(4), &AttributionModel::Linear, t(20, 0)).unwrap();
        for credit in credits(&result) {
            assert!((credit - 0.25).abs() < EPS);
        }
    }

    #[test]
    fn test_position_based_default_split() {
        let model = AttributionModel::PositionBased(PositionSplit::default());
        let result = compute_attribution(&journey(4), &model, t(20, 0)).unwrap();
        let expected = [0.4, 0.1, 0.1, 0.4];
        for (got, want) in credits(&result).iter().zip(expected) {
            assert!((got - want).abs() < EPS, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_position_based_short_journeys() {
        let model = AttributionModel::PositionBased(PositionSplit::default());

        let one = compute_attribution(&journey(1), &model, t(20, 0)).unwrap();
        assert_eq!(credits(&one), vec![1.0]);

        let two = compute_attribution(&journey(2), &model, t(20, 0)).unwrap();
        assert_eq!(credits(&two), vec![0.5, 0.5]);
    }

    #[test]
    fn test_position_based_uneven_split_with_two_touchpoints() {
        let split = PositionSplit::new(0.3, 0.1).unwrap();
        let result =
            compute_attribution(&journey(2), &AttributionModel::PositionBased(split), t(20, 0))
                .unwrap();
        let c = credits(&result);
        assert!((c[0] - 0.75).abs() < EPS);
        assert!((c[1] - 0.25).abs() < EPS);
    }

    #[test]
    fn test_position_based_zero_split_falls_back() {
        let split = PositionSplit::new(0.0, 0.0).unwrap();
        let model = AttributionModel::PositionBased(split);

        let two = compute_attribution(&journey(2), &model, t(20, 0)).unwrap();
        assert_eq!(credits(&two), vec![0.5, 0.5]);

        // All credit goes to the interior
        let four = compute_attribution(&journey(4), &model, t(20, 0)).unwrap();
        let c = credits(&four);
        assert_eq!(c[0], 0.0);
        assert!((c[1] - 0.5).abs() < EPS);
    }

    #[test]
    fn test_decay_factor_at_zero_delta() {
        assert_eq!(decay_factor(TimeDelta::zero(), TimeDelta::days(1)), 1.0);
        assert!((decay_factor(TimeDelta::days(1), TimeDelta::days(1)) - 0.5).abs() < EPS);
        assert!((decay_factor(TimeDelta::days(2), TimeDelta::days(1)) - 0.25).abs() < EPS);
    }

    #[test]
    fn test_decay_factor_clamps_future_touchpoints() {
        assert_eq!(decay_factor(TimeDelta::days(-3), TimeDelta::days(1)), 1.0);
    }

    #[test]
    fn test_sub_millisecond_half_life_stays_finite() {
        let model = AttributionModel::TimeDecay {
            half_life: TimeDelta::microseconds(500),
        };
        let result = compute_attribution(&journey(2), &model, t(20, 0)).unwrap();
        let c = credits(&result);

        assert!(c.iter().all(|credit| credit.is_finite()));
        assert!((c.iter().sum::<f64>() - 1.0).abs() < EPS);
        assert!((c[1] - 1.0).abs() < EPS);
    }

    #[test]
    fn test_unvalidated_model_parameters_are_rejected() {
        for half_life in [TimeDelta::zero(), TimeDelta::hours(-6)] {
            let model = AttributionModel::TimeDecay { half_life };
            let err = compute_attribution(&journey(3), &model, t(20, 0)).unwrap_err();
            assert!(matches!(err, TrackflowError::InvalidConfig(_)));
        }

        let split = PositionSplit {
            first: 0.8,
            last: 0.8,
        };
        let err = compute_attribution(&journey(3), &AttributionModel::PositionBased(split), t(20, 0))
            .unwrap_err();
        assert!(matches!(err, TrackflowError::InvalidConfig(_)));
    }

    #[test]
    fn test_time_decay_favors_recent_touchpoints() {
        let touchpoints = journey(4);
        let reference = touchpoints[3].timestamp;
        let model = AttributionModel::TimeDecay {
            half_life: TimeDelta::days(1),
        };

        let result = compute_attribution(&touchpoints, &model, reference).unwrap();
        let c = credits(&result);

        for pair in c.windows(2) {
            assert!(pair[0] < pair[1], "credits should increase: {c:?}");
        }
        // Daily spacing with a one-day half-life: weights 1/8, 1/4, 1/2, 1
        assert!((c[3] - 8.0 / 15.0).abs() < EPS);
        assert!((c[0] - 1.0 / 15.0).abs() < EPS);
    }

    #[test]
    fn test_time_decay_survives_very_old_journeys() {
        let touchpoints = journey(3);
        let reference = t(1, 0) + TimeDelta::days(365 * 50);
        let model = AttributionModel::TimeDecay {
            half_life: TimeDelta::hours(1),
        };

        let result = compute_attribution(&touchpoints, &model, reference).unwrap();
        assert!((result.total() - 1.0).abs() < EPS);
        assert!(result.credits.iter().all(|c| c.credit.is_finite()));
    }

    #[test]
    fn test_credits_sum_to_one_for_every_model() {
        for n in 1..=7 {
            let touchpoints = journey(n);
            for model in all_models() {
                let result = compute_attribution(&touchpoints, &model, t(28, 0)).unwrap();
                assert!(
                    (result.total() - 1.0).abs() < EPS,
                    "{:?} with {n} touchpoints summed to {}",
                    model.kind(),
                    result.total()
                );
                assert!(result.credits.iter().all(|c| c.credit >= 0.0));
                assert_eq!(result.credits.len(), n);
            }
        }
    }

    #[test]
    fn test_empty_sequence_is_reported() {
        for model in all_models() {
            let err = compute_attribution(&[], &model, t(1, 0)).unwrap_err();
            assert!(matches!(err, TrackflowError::EmptySequence));
        }
    }

    #[test]
    fn test_unordered_input_is_resorted() {
        let mut touchpoints = journey(3);
        touchpoints.reverse();

        let result =
            compute_attribution(&touchpoints, &AttributionModel::FirstTouch, t(20, 0)).unwrap();

        assert!(result.reordered);
        assert_eq!(result.credits[0].touchpoint_id.as_str(), "tp-0");
        assert_eq!(result.credit_for(&"tp-0".into()), Some(1.0));
    }

    #[test]
    fn test_timestamp_ties_use_position() {
        let at = t(3, 12);
        let touchpoints = vec![
            Touchpoint::new("late", "deal-1", at, "email").with_position(2),
            Touchpoint::new("early", "deal-1", at, "ads").with_position(1),
        ];

        let result =
            compute_attribution(&touchpoints, &AttributionModel::LastTouch, t(20, 0)).unwrap();
        assert!(result.reordered);
        assert_eq!(result.credit_for(&"late".into()), Some(1.0));
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let at = t(3, 12);
        let touchpoints = vec![
            Touchpoint::new("a", "deal-1", at, "email"),
            Touchpoint::new("b", "deal-1", at, "ads"),
        ];

        let result =
            compute_attribution(&touchpoints, &AttributionModel::FirstTouch, t(20, 0)).unwrap();
        assert!(!result.reordered);
        assert_eq!(result.credit_for(&"a".into()), Some(1.0));
    }

    #[test]
    fn test_repeated_computation_is_identical() {
        let touchpoints = journey(5);
        for model in all_models() {
            let first = compute_attribution(&touchpoints, &model, t(25, 0)).unwrap();
            let second = compute_attribution(&touchpoints, &model, t(25, 0)).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_credits_carry_channel_and_campaign() {
        let touchpoints =
            vec![Touchpoint::new("tp", "deal-1", t(2, 0), "email").with_campaign("launch")];
        let result = compute_attribution(&touchpoints, &AttributionModel::Linear, t(3, 0)).unwrap();

        assert_eq!(result.credits[0].channel, "email");
        assert_eq!(result.credits[0].campaign_id.as_deref(), Some("launch"));
    }
}
