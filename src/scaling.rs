use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::features::{FEATURE_COUNT, FeatureRow};

/// Zero-mean, unit-variance feature scaling fitted on the training rows.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub means: FeatureRow,
    pub scales: FeatureRow,
}

/// Maps raw model output onto `[0, 1]` using the training target range.
/// Values outside the training range are not clipped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinMaxScaler {
    pub min: f64,
    pub max: f64,
}

/// Training-time scaler statistics, as stored alongside a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalingParams {
    pub feature_means: Vec<f64>,
    pub feature_scales: Vec<f64>,
    pub target_min: f64,
    pub target_max: f64,
}

#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl StandardScaler {
    pub fn fit(rows: &[FeatureRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(anyhow!("cannot fit feature scaler on zero rows"));
        }
        let n = rows.len() as f64;
        let mut means = [0.0; FEATURE_COUNT];
        for row in rows {
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut scales = [0.0; FEATURE_COUNT];
        for row in rows {
            for (idx, v) in row.iter().enumerate() {
                scales[idx] += (v - means[idx]).powi(2);
            }
        }
        for s in &mut scales {
            *s = nonzero_scale((*s / n).sqrt());
        }
        Ok(Self { means, scales })
    }

    pub fn transform(&self, row: &FeatureRow) -> FeatureRow {
        let mut out = [0.0; FEATURE_COUNT];
        for (idx, v) in row.iter().enumerate() {
            out[idx] = (v - self.means[idx]) / self.scales[idx];
        }
        out
    }
}

impl MinMaxScaler {
    pub fn fit(values: &[f64]) -> Result<Self> {
        let mut iter = values.iter().copied().filter(|v| v.is_finite());
        let first = iter
            .next()
            .ok_or_else(|| anyhow!("cannot fit risk scaler without target values"))?;
        let (min, max) = iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        Ok(Self { min, max })
    }

    pub fn transform(&self, value: f64) -> f64 {
        (value - self.min) / nonzero_scale(self.max - self.min)
    }
}

impl ScalingParams {
    pub fn from_scalers(features: &StandardScaler, target: &MinMaxScaler) -> Self {
        Self {
            feature_means: features.means.to_vec(),
            feature_scales: features.scales.to_vec(),
            target_min: target.min,
            target_max: target.max,
        }
    }

    pub fn into_scalers(self) -> Result<(StandardScaler, MinMaxScaler)> {
        let means: FeatureRow = self.feature_means.as_slice().try_into().map_err(|_| {
            anyhow!(
                "scaling block has {} feature means, expected {FEATURE_COUNT}",
                self.feature_means.len()
            )
        })?;
        let mut scales: FeatureRow = self.feature_scales.as_slice().try_into().map_err(|_| {
            anyhow!(
                "scaling block has {} feature scales, expected {FEATURE_COUNT}",
                self.feature_scales.len()
            )
        })?;
        for s in &mut scales {
            *s = nonzero_scale(*s);
        }
        if !self.target_min.is_finite() || !self.target_max.is_finite() {
            return Err(anyhow!("scaling block has a non-finite target range"));
        }
        Ok((
            StandardScaler { means, scales },
            MinMaxScaler {
                min: self.target_min,
                max: self.target_max,
            },
        ))
    }
}

/// Seeded shuffle split: the first `ceil(test_fraction * n)` shuffled indices
/// are held out, the rest train.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Result<TrainTestSplit> {
    if !(0.0..1.0).contains(&test_fraction) {
        return Err(anyhow!("test fraction {test_fraction} must be in [0, 1)"));
    }
    let n_test = (test_fraction * n as f64).ceil() as usize;
    if n_test >= n {
        return Err(anyhow!(
            "{n} rows leave no training rows at test fraction {test_fraction}"
        ));
    }
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let train = indices.split_off(n_test);
    Ok(TrainTestSplit {
        train,
        test: indices,
    })
}

fn nonzero_scale(scale: f64) -> f64 {
    if scale.abs() < f64::EPSILON * 10.0 || !scale.is_finite() {
        1.0
    } else {
        scale
    }
}
