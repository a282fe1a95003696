//! Scalar summaries over segmented trains.
//!
//! Two views:
//!
//! - `spike_counts`: per-cell sample counts per train bucket, shaped into a
//!   fixed-width table (cells with fewer trains padded with 0) for cross-cell
//!   comparison
//! - `measurement_counts`: a finer subdivision of each train epoch on
//!   time-monotonicity breaks
//!
//! Measurement rule (the source history had two divergent variants; this is
//! the one implemented and tested here): scanning a cell's stream, the final
//! sample is never examined and a sample whose successor is a boundary marker
//! is skipped outright, so runs undercount by one at every train end. Each
//! examined sample joins the current measure bucket, and the measure counter
//! increments after a non-increase (`time[i] >= time[i+1]`). The bucket is
//! never reset mid-run.

use std::collections::BTreeMap;

use crate::data::store::SampleStore;
use crate::domain::{train_label, MeasureCounts, TrainSeries};
use crate::error::AppError;
use crate::segment;

/// Fixed-width spike-count table across all cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeCountTable {
    /// Train labels `1.spike ..= max.spike`, shared by every row.
    pub train_labels: Vec<String>,
    pub rows: Vec<SpikeCountRow>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpikeCountRow {
    pub cell: String,
    /// One count per label; 0 where the cell has no such train.
    pub counts: Vec<usize>,
}

/// Sample counts per train bucket for one cell, in increasing ordinal order.
pub fn cell_spike_counts(store: &SampleStore, cell: &str) -> Result<Vec<usize>, AppError> {
    let buckets = segment::cell_trains(store, cell)?;
    Ok(buckets.values().map(TrainSeries::len).collect())
}

/// The cross-cell spike-count table, padded to the global maximum ordinal.
pub fn spike_counts(store: &SampleStore) -> SpikeCountTable {
    let views = segment::per_cell(store);

    let max_ordinal = views
        .values()
        .filter_map(|buckets| buckets.keys().next_back().copied())
        .max()
        .unwrap_or(0);

    let train_labels = (1..=max_ordinal).map(train_label).collect();

    let rows = store
        .cell_names()
        .iter()
        .map(|name| {
            let buckets = &views[name];
            let counts = (1..=max_ordinal)
                .map(|ordinal| buckets.get(&ordinal).map_or(0, TrainSeries::len))
                .collect();
            SpikeCountRow {
                cell: name.clone(),
                counts,
            }
        })
        .collect();

    SpikeCountTable { train_labels, rows }
}

/// Measurement counts for one cell: `{train epoch: {measure: count}}`.
///
/// The train key here is the 1-based contiguous-run index (epochs between
/// markers), and the measure counter restarts at 1 for each epoch.
pub fn measurement_counts(store: &SampleStore, cell: &str) -> Result<MeasureCounts, AppError> {
    let samples = store.samples(cell)?;
    let mut out = MeasureCounts::new();

    let mut epoch: u32 = 1;
    let mut measure: u32 = 1;

    for idx in 0..samples.len().saturating_sub(1) {
        let cur = samples[idx];
        if cur.is_marker() {
            epoch += 1;
            measure = 1;
            continue;
        }
        // No lookahead past a train end: the sample before a marker is
        // skipped entirely, which undercounts each run by one.
        if samples[idx + 1].time.is_nan() {
            continue;
        }

        *out.entry(epoch)
            .or_insert_with(BTreeMap::new)
            .entry(measure)
            .or_insert(0) += 1;

        if cur.time >= samples[idx + 1].time {
            measure += 1;
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sample;

    const NAN: f64 = f64::NAN;

    fn store(cells: &[(&str, &[(f64, f64)])]) -> SampleStore {
        SampleStore::new(
            cells
                .iter()
                .map(|(name, pairs)| {
                    (
                        name.to_string(),
                        pairs.iter().map(|&(t, f)| Sample::new(t, f)).collect(),
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn spike_counts_match_segmenter_bucket_lengths() {
        let s = store(&[
            ("a", &[(1.0, 2.0), (2.0, 3.0), (2.5, NAN), (3.0, 4.0)]),
            ("b", &[(0.5, 9.0)]),
        ]);
        let views = segment::per_cell(&s);
        let table = spike_counts(&s);

        for row in &table.rows {
            let buckets = &views[&row.cell];
            for (i, &count) in row.counts.iter().enumerate() {
                let ordinal = (i + 1) as u32;
                let expected = buckets.get(&ordinal).map_or(0, TrainSeries::len);
                assert_eq!(count, expected, "cell={} ordinal={ordinal}", row.cell);
            }
        }
    }

    #[test]
    fn table_is_padded_to_global_width() {
        // `a` reaches ordinal 2, `b` only ordinal 1.
        let s = store(&[
            ("a", &[(1.0, 2.0), (2.0, 3.0)]),
            ("b", &[(0.5, 9.0)]),
        ]);
        let table = spike_counts(&s);

        assert_eq!(table.train_labels, vec!["1.spike", "2.spike"]);
        assert_eq!(table.rows[0].counts, vec![1, 1]);
        assert_eq!(table.rows[1].counts, vec![1, 0]);
    }

    #[test]
    fn measurement_rule_is_stable() {
        // Single epoch: times rise 1,2,3, fall back to 2.5, rise again.
        // The final sample is never examined, so the second run counts 2.
        let s = store(&[(
            "a",
            &[(1.0, 5.0), (2.0, 5.0), (3.0, 5.0), (2.5, 5.0), (3.5, 5.0), (4.5, 5.0)],
        )]);
        let counts = measurement_counts(&s, "a").unwrap();

        let epoch1 = &counts[&1];
        assert_eq!(epoch1[&1], 3); // 1,2,3 — the decrease sample joins run 1
        assert_eq!(epoch1[&2], 2); // 2.5,3.5 — 4.5 is the unexamined tail
        assert_eq!(epoch1.len(), 2);
    }

    #[test]
    fn sample_before_marker_is_skipped() {
        let s = store(&[(
            "a",
            &[(1.0, 5.0), (2.0, 6.0), (NAN, NAN), (1.0, 7.0), (2.0, 8.0), (3.0, 9.0)],
        )]);
        let counts = measurement_counts(&s, "a").unwrap();

        // Epoch 1 has two samples but only one is countable (its second
        // sample precedes the marker and is skipped).
        assert_eq!(counts[&1][&1], 1);
        // Epoch 2: three samples, tail unexamined.
        assert_eq!(counts[&2][&1], 2);
        assert_eq!(counts.len(), 2);
    }

    #[test]
    fn equal_times_advance_the_measure_counter() {
        let s = store(&[("a", &[(1.0, 5.0), (1.0, 6.0), (2.0, 7.0), (3.0, 8.0)])]);
        let counts = measurement_counts(&s, "a").unwrap();

        let epoch1 = &counts[&1];
        assert_eq!(epoch1[&1], 1); // the equal-time pair closes run 1
        assert_eq!(epoch1[&2], 2);
    }

    #[test]
    fn unknown_cell_is_not_found() {
        let s = store(&[("a", &[(1.0, 2.0)])]);
        assert!(measurement_counts(&s, "ghost").is_err());
        assert!(cell_spike_counts(&s, "ghost").is_err());
    }
}
