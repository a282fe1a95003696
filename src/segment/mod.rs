//! Train segmentation.
//!
//! Converts the flat, NaN-delimited sample stream of each cell into train
//! buckets keyed by a positional ordinal:
//!
//! - the ordinal counter starts at 1 for every cell
//! - a boundary marker resets the counter to 1 and is consumed (never stored)
//! - a real sample lands in the bucket for the current counter value, then
//!   the counter increments
//!
//! Numbering is therefore purely positional within a reset epoch: bucket `n`
//! accumulates the n-th sample of every epoch. The merged views apply the
//! identical scan per cell but share one bucket map, aligning cells by train
//! ordinal (not by time).
//!
//! All views are pure functions recomputed per call.

pub mod aggregate;

use std::collections::HashMap;

use crate::data::store::SampleStore;
use crate::domain::{train_label, Sample, TrainMap, TrainSeries};
use crate::error::AppError;

/// Scan one cell's samples into an existing bucket map.
fn scan_into(buckets: &mut TrainMap, samples: &[Sample]) {
    let mut counter: u32 = 1;
    for sample in samples {
        if sample.is_marker() {
            counter = 1;
        } else {
            buckets
                .entry(counter)
                .or_insert_with(TrainSeries::default)
                .push(sample.time, sample.freq);
            counter += 1;
        }
    }
}

/// Train buckets for a single cell.
pub fn cell_trains(store: &SampleStore, cell: &str) -> Result<TrainMap, AppError> {
    let samples = store.samples(cell)?;
    let mut buckets = TrainMap::new();
    scan_into(&mut buckets, samples);
    Ok(buckets)
}

/// Train buckets for every cell, keyed by cell name.
///
/// Iterate `store.cell_names()` for recording order; the map itself carries
/// no ordering.
pub fn per_cell(store: &SampleStore) -> HashMap<String, TrainMap> {
    let mut out = HashMap::with_capacity(store.n_cells());
    for name in store.cell_names() {
        // The name came from the store, so the lookup cannot fail.
        let buckets = cell_trains(store, name).expect("cell name from store");
        out.insert(name.clone(), buckets);
    }
    out
}

/// Merged buckets over an explicit cell subset.
///
/// Every selected cell is scanned with its own positional counter; the
/// buckets are shared, so bucket membership is a function of each cell's own
/// counter and cell order only affects within-bucket sample order.
pub fn merged(store: &SampleStore, subset: &[String]) -> Result<TrainMap, AppError> {
    let mut buckets = TrainMap::new();
    for name in subset {
        let samples = store.samples(name)?;
        scan_into(&mut buckets, samples);
    }
    Ok(buckets)
}

/// Merged buckets over every cell in recording order.
pub fn all_merged(store: &SampleStore) -> TrainMap {
    let mut buckets = TrainMap::new();
    for name in store.cell_names() {
        let samples = store.samples(name).expect("cell name from store");
        scan_into(&mut buckets, samples);
    }
    buckets
}

/// A single train bucket, by cell and ordinal.
pub fn train(store: &SampleStore, cell: &str, ordinal: u32) -> Result<TrainSeries, AppError> {
    let buckets = cell_trains(store, cell)?;
    buckets.get(&ordinal).cloned().ok_or_else(|| {
        AppError::not_found(format!(
            "Cell '{cell}' has no train '{}'.",
            train_label(ordinal)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    const NAN: f64 = f64::NAN;

    #[test]
    fn marker_resets_ordinal_to_one() {
        // [(1,5), marker, (3,7)]: the sample after the marker is labeled
        // "1.spike" again, so bucket 1 accumulates both epochs' first samples.
        let s = store(&[("a", &[(1.0, 5.0), (2.0, NAN), (3.0, 7.0)])]);
        let buckets = cell_trains(&s, "a").unwrap();

        assert_eq!(buckets.len(), 1);
        let first = &buckets[&1];
        assert_eq!(first.times, vec![1.0, 3.0]);
        assert_eq!(first.freqs, vec![5.0, 7.0]);
    }

    #[test]
    fn ordinals_are_positional_within_an_epoch() {
        let s = store(&[(
            "a",
            &[(1.0, 10.0), (2.0, 20.0), (3.0, NAN), (4.0, 30.0), (5.0, 40.0), (6.0, 50.0)],
        )]);
        let buckets = cell_trains(&s, "a").unwrap();

        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[&1].times, vec![1.0, 4.0]);
        assert_eq!(buckets[&2].times, vec![2.0, 5.0]);
        assert_eq!(buckets[&3].times, vec![6.0]);
    }

    #[test]
    fn segmentation_is_deterministic() {
        let s = store(&[
            ("a", &[(1.0, 2.0), (2.0, NAN), (3.0, 4.0), (4.0, 5.0)]),
            ("b", &[(0.5, 9.0), (0.6, 8.0)]),
        ]);
        let first = per_cell(&s);
        let second = per_cell(&s);
        assert_eq!(first, second);
    }

    #[test]
    fn counter_resets_per_cell() {
        // Cell `a` ends mid-epoch; cell `b`'s first sample must still land in
        // bucket 1 of its own map.
        let s = store(&[
            ("a", &[(1.0, 2.0), (2.0, 3.0)]),
            ("b", &[(9.0, 4.0)]),
        ]);
        let views = per_cell(&s);
        assert_eq!(views["b"][&1].times, vec![9.0]);
    }

    #[test]
    fn merged_bucket_lengths_are_sums() {
        let s = store(&[
            ("a", &[(1.0, 2.0), (2.0, 3.0), (2.5, NAN), (3.0, 4.0)]),
            ("b", &[(0.5, 9.0), (0.6, 8.0)]),
        ]);
        let views = per_cell(&s);
        let joint = merged(&s, &["a".to_string(), "b".to_string()]).unwrap();

        for (ordinal, bucket) in &joint {
            let len_a = views["a"].get(ordinal).map_or(0, TrainSeries::len);
            let len_b = views["b"].get(ordinal).map_or(0, TrainSeries::len);
            assert_eq!(bucket.len(), len_a + len_b);
        }

        // Every per-cell sample appears in the merged bucket.
        for cell in ["a", "b"] {
            for (ordinal, bucket) in &views[cell] {
                for t in &bucket.times {
                    assert!(joint[ordinal].times.contains(t));
                }
            }
        }
    }

    #[test]
    fn all_merged_equals_full_subset() {
        let s = store(&[
            ("a", &[(1.0, 2.0), (1.5, NAN), (2.0, 3.0)]),
            ("b", &[(0.5, 9.0)]),
        ]);
        let everything = all_merged(&s);
        let explicit = merged(&s, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(everything, explicit);
    }

    #[test]
    fn all_marker_cell_contributes_no_buckets() {
        let s = store(&[
            ("live", &[(1.0, 2.0)]),
            ("quiet", &[(NAN, NAN), (NAN, NAN)]),
        ]);
        assert!(cell_trains(&s, "quiet").unwrap().is_empty());
        // And it must not poison the merged view.
        let joint = all_merged(&s);
        assert_eq!(joint[&1].times, vec![1.0]);
    }

    #[test]
    fn merged_with_unknown_cell_fails() {
        let s = store(&[("a", &[(1.0, 2.0)])]);
        let err = merged(&s, &["a".to_string(), "ghost".to_string()]).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn missing_train_lookup_is_fatal() {
        let s = store(&[("a", &[(1.0, 2.0)])]);
        assert!(train(&s, "a", 1).is_ok());
        let err = train(&s, "a", 7).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
