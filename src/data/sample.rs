//! Synthetic recording generation.
//!
//! Produces a deterministic, seeded recording whose trains follow a noisy
//! power-law IF decay. The demo command runs the full pipeline on this data,
//! and tests use it where hand-written fixtures would be unwieldy.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::data::store::SampleStore;
use crate::domain::Sample;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub n_cells: usize,
    pub trains_per_cell: usize,
    pub samples_per_train: usize,
    pub seed: u64,
    /// Power-law amplitude: `freq = amplitude * time^exponent`.
    pub amplitude: f64,
    /// Power-law exponent (negative: IF decays over the train).
    pub exponent: f64,
    /// Multiplicative noise standard deviation (0 disables noise).
    pub noise_sigma: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            n_cells: 3,
            trains_per_cell: 5,
            samples_per_train: 12,
            seed: 42,
            amplitude: 120.0,
            exponent: -0.6,
            noise_sigma: 0.05,
        }
    }
}

/// Generate a seeded synthetic recording.
pub fn generate_recording(config: &SyntheticConfig) -> Result<SampleStore, AppError> {
    if config.n_cells == 0 || config.trains_per_cell == 0 || config.samples_per_train == 0 {
        return Err(AppError::schema(
            "Synthetic config requires at least one cell, train, and sample.",
        ));
    }
    if !(config.amplitude.is_finite() && config.amplitude > 0.0) {
        return Err(AppError::schema("Synthetic amplitude must be finite and > 0."));
    }
    if !(config.noise_sigma.is_finite() && config.noise_sigma >= 0.0) {
        return Err(AppError::schema("Synthetic noise sigma must be finite and >= 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, config.noise_sigma.max(1e-12))
        .map_err(|e| AppError::schema(format!("Noise distribution error: {e}")))?;

    let mut cells = Vec::with_capacity(config.n_cells);
    for cell_idx in 0..config.n_cells {
        let name = format!("cell_{}", cell_idx + 1);
        let mut samples = Vec::new();

        for train_idx in 0..config.trains_per_cell {
            if train_idx > 0 {
                samples.push(Sample::marker());
            }
            for sample_idx in 0..config.samples_per_train {
                // Firing times restart near zero at each train.
                let time = 0.05 + 0.1 * sample_idx as f64 + 0.01 * rng.gen_range(0.0..1.0);
                let clean = config.amplitude * time.powf(config.exponent);
                let freq = if config.noise_sigma > 0.0 {
                    (clean * (1.0 + noise.sample(&mut rng))).max(0.1)
                } else {
                    clean
                };
                samples.push(Sample::new(time, freq));
            }
        }

        cells.push((name, samples));
    }

    SampleStore::new(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic_per_seed() {
        let config = SyntheticConfig::default();
        let a = generate_recording(&config).unwrap();
        let b = generate_recording(&config).unwrap();

        for name in a.cell_names() {
            let sa = a.samples(name).unwrap();
            let sb = b.samples(name).unwrap();
            assert_eq!(sa.len(), sb.len());
            for (x, y) in sa.iter().zip(sb.iter()) {
                assert!(x.is_marker() == y.is_marker());
                if !x.is_marker() {
                    assert!((x.time - y.time).abs() < 1e-15);
                    assert!((x.freq - y.freq).abs() < 1e-15);
                }
            }
        }
    }

    #[test]
    fn marker_count_matches_train_count() {
        let config = SyntheticConfig {
            n_cells: 1,
            trains_per_cell: 4,
            samples_per_train: 3,
            ..SyntheticConfig::default()
        };
        let store = generate_recording(&config).unwrap();
        let samples = store.samples("cell_1").unwrap();
        let markers = samples.iter().filter(|s| s.is_marker()).count();
        assert_eq!(markers, 3);
        assert_eq!(samples.len(), 4 * 3 + 3);
    }

    #[test]
    fn rejects_degenerate_config() {
        let config = SyntheticConfig {
            n_cells: 0,
            ..SyntheticConfig::default()
        };
        assert!(generate_recording(&config).is_err());
    }
}
