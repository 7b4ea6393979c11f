/// ENSO phase classification.
///
/// Turns the monthly anomaly series into four derived columns:
/// a forward-looking trimester (3-month) mean, that mean rounded to one
/// decimal, the instantaneous phase from threshold comparison, and an event
/// phase that is non-neutral only where the instantaneous phase holds for at
/// least `min_event_run` consecutive months.
///
/// The labeler is a pure function over an in-memory series: no I/O, no
/// clocks, no shared state. Given a well-formed series it cannot fail;
/// malformed input (out-of-order or duplicate months, non-finite anomalies)
/// is rejected up front with `EnsoError::InvalidSeries` and produces no
/// partial output.

use serde::Deserialize;
use std::cmp::Ordering;

use crate::model::{EnsoError, LabeledObservation, Observation, Phase};

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Tunable parameters of the classification.
///
/// Defaults match the NOAA CPC definition of El Niño / La Niña episodes:
/// a 3-month running mean of the Niño 3.4 anomaly at or beyond ±0.5 °C,
/// sustained for at least 5 consecutive overlapping trimesters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Rounded trimester mean at or above this classifies as El Niño.
    pub warm_threshold: f64,
    /// Rounded trimester mean at or below this classifies as La Niña.
    pub cold_threshold: f64,
    /// Months in the smoothing window. The window at index `i` covers
    /// `i..i+window_months`, so the last `window_months - 1` rows of any
    /// series have no defined mean.
    pub window_months: usize,
    /// Minimum consecutive months of one phase to count as an event.
    pub min_event_run: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        PhaseConfig {
            warm_threshold: 0.5,
            cold_threshold: -0.5,
            window_months: 3,
            min_event_run: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-row classification
// ---------------------------------------------------------------------------

/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Threshold classification of a rounded trimester mean.
///
/// An absent mean (the tail of the series) classifies `Neutral` by explicit
/// rule; it never reaches either threshold comparison.
pub fn classify(rounded_average: Option<f64>, config: &PhaseConfig) -> Phase {
    match rounded_average {
        Some(v) if v >= config.warm_threshold => Phase::ElNino,
        Some(v) if v <= config.cold_threshold => Phase::LaNina,
        _ => Phase::Neutral,
    }
}

// ---------------------------------------------------------------------------
// Series labeling
// ---------------------------------------------------------------------------

/// Check the labeler's preconditions: strictly increasing dates and finite
/// anomaly values. The loader already sorts, so a violation here means the
/// input itself is broken, not merely unordered.
fn validate_series(series: &[Observation]) -> Result<(), EnsoError> {
    for (i, obs) in series.iter().enumerate() {
        if !obs.anomaly.is_finite() {
            return Err(EnsoError::InvalidSeries(format!(
                "non-finite anomaly at {}",
                obs.date
            )));
        }
        if i > 0 {
            match series[i - 1].date.cmp(&obs.date) {
                Ordering::Less => {}
                Ordering::Equal => {
                    return Err(EnsoError::InvalidSeries(format!(
                        "duplicate month {}",
                        obs.date
                    )));
                }
                Ordering::Greater => {
                    return Err(EnsoError::InvalidSeries(format!(
                        "dates not increasing at {}",
                        obs.date
                    )));
                }
            }
        }
    }
    Ok(())
}

/// Label a full series.
///
/// One pass computes the trimester mean, its rounding, and the instantaneous
/// phase for every row; two further passes mark El Niño and La Niña event
/// runs. O(N) time, O(1) extra memory beyond the output.
///
/// An empty series labels to an empty table. A series shorter than the
/// window labels every row `Neutral`/`Neutral` with no defined mean.
pub fn label_phases(
    series: &[Observation],
    config: &PhaseConfig,
) -> Result<Vec<LabeledObservation>, EnsoError> {
    validate_series(series)?;

    let window = config.window_months.max(1);
    let mut labeled: Vec<LabeledObservation> = Vec::with_capacity(series.len());

    for (i, obs) in series.iter().enumerate() {
        let average = if i + window <= series.len() {
            let sum: f64 = series[i..i + window].iter().map(|o| o.anomaly).sum();
            Some(sum / window as f64)
        } else {
            None
        };
        let rounded = average.map(round_to_tenth);
        let phase = classify(rounded, config);

        labeled.push(LabeledObservation {
            date: obs.date,
            total: obs.total,
            climate_adjustment: obs.climate_adjustment,
            anomaly: obs.anomaly,
            trimester_average: average,
            trimester_average_rounded: rounded,
            trimester_phase: phase,
            event_phase: Phase::Neutral,
        });
    }

    mark_event_runs(&mut labeled, Phase::ElNino, config.min_event_run);
    mark_event_runs(&mut labeled, Phase::LaNina, config.min_event_run);

    Ok(labeled)
}

/// Mark event runs of `target` in a single forward scan.
///
/// A counter tracks consecutive months of the target phase. The moment it
/// reaches `min_run`, the whole run so far `[i - min_run + 1, i]` is marked;
/// each further month of the run marks only itself. Any other phase resets
/// the counter. Rows with an undefined trimester mean classify `Neutral`
/// and so can neither start nor extend a run.
fn mark_event_runs(labeled: &mut [LabeledObservation], target: Phase, min_run: usize) {
    let min_run = min_run.max(1);
    let mut run = 0usize;

    for i in 0..labeled.len() {
        if labeled[i].trimester_phase == target {
            run += 1;
            if run == min_run {
                for slot in &mut labeled[i + 1 - min_run..=i] {
                    slot.event_phase = target;
                }
            } else if run > min_run {
                labeled[i].event_phase = target;
            }
        } else {
            run = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    /// Build a series of consecutive months starting 1950-01 with the given
    /// anomalies. TOTAL/ClimAdjust are passthrough filler.
    fn series(anomalies: &[f64]) -> Vec<Observation> {
        anomalies
            .iter()
            .enumerate()
            .map(|(i, &anomaly)| {
                let month0 = i as u32;
                Observation {
                    date: NaiveDate::from_ymd_opt(
                        1950 + (month0 / 12) as i32,
                        month0 % 12 + 1,
                        1,
                    )
                    .unwrap(),
                    total: 25.0 + anomaly,
                    climate_adjustment: 25.0,
                    anomaly,
                }
            })
            .collect()
    }

    fn label(anomalies: &[f64]) -> Vec<LabeledObservation> {
        label_phases(&series(anomalies), &PhaseConfig::default())
            .expect("well-formed series should label")
    }

    // --- Rounding -----------------------------------------------------------

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(round_to_tenth(0.45), 0.5);
        assert_eq!(round_to_tenth(-0.45), -0.5);
        assert_eq!(round_to_tenth(0.44), 0.4);
        assert_eq!(round_to_tenth(-1.3366666666666667), -1.3);
        assert_eq!(round_to_tenth(0.0), 0.0);
    }

    // --- Threshold partition ------------------------------------------------

    #[test]
    fn test_thresholds_are_inclusive() {
        let config = PhaseConfig::default();
        assert_eq!(classify(Some(0.5), &config), Phase::ElNino);
        assert_eq!(classify(Some(-0.5), &config), Phase::LaNina);
        assert_eq!(classify(Some(0.4), &config), Phase::Neutral);
        assert_eq!(classify(Some(-0.4), &config), Phase::Neutral);
        assert_eq!(classify(Some(2.6), &config), Phase::ElNino);
        assert_eq!(classify(Some(-1.8), &config), Phase::LaNina);
    }

    #[test]
    fn test_undefined_average_classifies_neutral() {
        assert_eq!(classify(None, &PhaseConfig::default()), Phase::Neutral);
    }

    // --- Windowing boundary -------------------------------------------------

    #[test]
    fn test_exactly_last_two_rows_have_no_average() {
        let labeled = label(&[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
        for (i, row) in labeled.iter().enumerate() {
            if i < labeled.len() - 2 {
                assert!(
                    row.trimester_average.is_some(),
                    "row {} should have a defined trimester average",
                    i
                );
            } else {
                assert!(
                    row.trimester_average.is_none(),
                    "row {} is within 2 of the end and should be undefined",
                    i
                );
                assert_eq!(row.trimester_phase, Phase::Neutral);
            }
        }
    }

    #[test]
    fn test_window_covers_current_and_next_two_months() {
        let labeled = label(&[0.9, 0.0, 0.0, 0.3, 0.3]);
        // Window at index 0 is months 0..3.
        let avg = labeled[0].trimester_average.unwrap();
        assert!((avg - 0.3).abs() < 1e-12, "got {}", avg);
        // Window at index 2 is months 2..5.
        let avg = labeled[2].trimester_average.unwrap();
        assert!((avg - 0.2).abs() < 1e-12, "got {}", avg);
    }

    // --- Degenerate series --------------------------------------------------

    #[test]
    fn test_empty_series_labels_to_empty_table() {
        let labeled = label(&[]);
        assert!(labeled.is_empty());
    }

    #[test]
    fn test_short_series_is_all_neutral_with_no_averages() {
        let labeled = label(&[1.9, -1.9]);
        assert_eq!(labeled.len(), 2);
        for row in &labeled {
            assert!(row.trimester_average.is_none());
            assert_eq!(row.trimester_phase, Phase::Neutral);
            assert_eq!(row.event_phase, Phase::Neutral);
        }
    }

    // --- Event runs ---------------------------------------------------------

    #[test]
    fn test_run_of_exactly_five_is_an_event() {
        // 7 months of +1.0 gives trimester phases: elnino x5, neutral x2
        // (undefined tail) — exactly the minimum qualifying run.
        let labeled = label(&[1.0; 7]);
        for (i, row) in labeled.iter().enumerate() {
            if i < 5 {
                assert_eq!(row.trimester_phase, Phase::ElNino, "phase at row {}", i);
                assert_eq!(row.event_phase, Phase::ElNino, "event at row {}", i);
            } else {
                assert_eq!(row.event_phase, Phase::Neutral, "tail row {}", i);
            }
        }
    }

    #[test]
    fn test_run_of_four_is_not_an_event() {
        // 6 months of -1.0: lanina phases at rows 0..4 minus the undefined
        // tail leaves a run of 4 — below the event minimum.
        let labeled = label(&[-1.0; 6]);
        assert_eq!(labeled[0].trimester_phase, Phase::LaNina);
        for (i, row) in labeled.iter().enumerate() {
            assert_eq!(row.event_phase, Phase::Neutral, "row {}", i);
        }
    }

    #[test]
    fn test_long_run_marks_every_member() {
        let labeled = label(&[1.0; 12]);
        // Rows 0..=9 are elnino (10-month run), rows 10..11 undefined.
        for (i, row) in labeled.iter().enumerate() {
            if i < 10 {
                assert_eq!(row.event_phase, Phase::ElNino, "row {}", i);
            } else {
                assert_eq!(row.event_phase, Phase::Neutral, "row {}", i);
            }
        }
    }

    #[test]
    fn test_interrupted_run_resets_the_counter() {
        // 4 warm months, one neutral month, 4 warm months: neither side of
        // the gap reaches 5, so no event anywhere. The 0.0 month drags two
        // preceding windows below threshold, so build the phases directly
        // from anomalies chosen to produce: E E E E N E E E E + tail.
        let anomalies = [1.5, 1.5, 1.5, 1.5, -3.0, 1.5, 1.5, 1.5, 1.5, 1.5, 1.5];
        let labeled = label(&anomalies);
        let phases: Vec<Phase> = labeled.iter().map(|r| r.trimester_phase).collect();
        // Sanity: the -3.0 month breaks the warm run somewhere in the middle.
        assert!(phases.contains(&Phase::ElNino));
        assert!(phases[2..5].iter().any(|p| *p != Phase::ElNino));
        // No 5-run of elnino exists, so no event may be marked.
        let longest_warm = phases
            .iter()
            .fold((0usize, 0usize), |(best, cur), p| {
                if *p == Phase::ElNino {
                    (best.max(cur + 1), cur + 1)
                } else {
                    (best, 0)
                }
            })
            .0;
        assert!(longest_warm < 5, "fixture should not contain a 5-run");
        for (i, row) in labeled.iter().enumerate() {
            assert_eq!(row.event_phase, Phase::Neutral, "row {}", i);
        }
    }

    #[test]
    fn test_warm_and_cold_events_in_one_series() {
        // 8 warm months then 8 cold months. The transition windows mix
        // signs, but both ends hold a 5-run.
        let mut anomalies = vec![2.0; 8];
        anomalies.extend(vec![-2.0; 8]);
        let labeled = label(&anomalies);

        assert_eq!(labeled[0].event_phase, Phase::ElNino);
        assert_eq!(labeled[10].event_phase, Phase::LaNina);
        // No row carries an event phase that disagrees with its own
        // instantaneous phase.
        for (i, row) in labeled.iter().enumerate() {
            if row.event_phase != Phase::Neutral {
                assert_eq!(
                    row.event_phase, row.trimester_phase,
                    "event/instantaneous mismatch at row {}",
                    i
                );
            }
        }
    }

    #[test]
    fn test_event_run_invariant_holds() {
        // Mixed fixture with warm, cold, and neutral stretches.
        let anomalies = [
            0.8, 0.9, 1.0, 1.1, 1.0, 0.9, 0.8, 0.1, 0.0, -0.2, -0.8, -0.9, -1.0, -1.1, -1.0,
            -0.9, -0.2, 0.0, 0.1, 0.2,
        ];
        let labeled = label(&anomalies);
        let phases: Vec<Phase> = labeled.iter().map(|r| r.trimester_phase).collect();

        for i in 0..labeled.len() {
            let event = labeled[i].event_phase;
            if event == Phase::Neutral {
                continue;
            }
            // Find the maximal run of the instantaneous phase covering i.
            assert_eq!(phases[i], event);
            let mut start = i;
            while start > 0 && phases[start - 1] == event {
                start -= 1;
            }
            let mut end = i;
            while end + 1 < phases.len() && phases[end + 1] == event {
                end += 1;
            }
            let run_len = end - start + 1;
            assert!(
                run_len >= 5,
                "event at row {} sits in a run of only {}",
                i,
                run_len
            );
            for j in start..=end {
                assert_eq!(
                    labeled[j].event_phase, event,
                    "row {} of the covering run is not marked",
                    j
                );
            }
        }
    }

    // --- Determinism & idempotence ------------------------------------------

    #[test]
    fn test_labeling_is_deterministic() {
        let anomalies = [0.6, 0.7, 0.8, 0.9, 1.0, 0.3, -0.6, -0.7, -0.8, -0.9, -1.0, 0.0];
        let first = label(&anomalies);
        let second = label(&anomalies);
        assert_eq!(first, second);
    }

    #[test]
    fn test_relabeling_base_columns_reproduces_derived_columns() {
        let anomalies = [0.6, 0.7, 0.8, 0.9, 1.0, 1.1, 0.2, -0.6, -0.7, -0.8];
        let first = label(&anomalies);

        // Strip back to base columns and label again.
        let base: Vec<Observation> = first
            .iter()
            .map(|r| Observation {
                date: r.date,
                total: r.total,
                climate_adjustment: r.climate_adjustment,
                anomaly: r.anomaly,
            })
            .collect();
        let second = label_phases(&base, &PhaseConfig::default()).unwrap();
        assert_eq!(first, second);
    }

    // --- Precondition failures ----------------------------------------------

    #[test]
    fn test_out_of_order_dates_are_rejected() {
        let mut input = series(&[0.1, 0.2, 0.3, 0.4]);
        input.swap(1, 2);
        let result = label_phases(&input, &PhaseConfig::default());
        assert!(
            matches!(result, Err(EnsoError::InvalidSeries(_))),
            "got {:?}",
            result
        );
    }

    #[test]
    fn test_duplicate_month_is_rejected() {
        let mut input = series(&[0.1, 0.2, 0.3]);
        input[2].date = input[1].date;
        let result = label_phases(&input, &PhaseConfig::default());
        assert!(matches!(result, Err(EnsoError::InvalidSeries(_))));
    }

    #[test]
    fn test_nan_anomaly_is_rejected() {
        let mut input = series(&[0.1, 0.2, 0.3]);
        input[1].anomaly = f64::NAN;
        let result = label_phases(&input, &PhaseConfig::default());
        assert!(matches!(result, Err(EnsoError::InvalidSeries(_))));
    }

    // --- Alternate parameters -----------------------------------------------

    #[test]
    fn test_alternate_config_changes_the_classification() {
        let config = PhaseConfig {
            warm_threshold: 1.0,
            cold_threshold: -1.0,
            window_months: 3,
            min_event_run: 3,
        };
        let labeled = label_phases(&series(&[0.9; 8]), &config).unwrap();
        // 0.9 never reaches the tighter warm threshold.
        assert!(labeled.iter().all(|r| r.trimester_phase == Phase::Neutral));

        let labeled = label_phases(&series(&[1.2; 8]), &config).unwrap();
        // Run of 6 defined warm months against min_event_run = 3.
        assert_eq!(labeled[0].event_phase, Phase::ElNino);
        assert_eq!(labeled[5].event_phase, Phase::ElNino);
        assert_eq!(labeled[6].event_phase, Phase::Neutral);
    }
}
