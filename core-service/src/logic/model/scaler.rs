//! Standard Scaler - zero mean, unit variance
//!
//! Fit trên training matrix, lưu cùng detector. Feature có std = 0 dùng
//! scale = 1.0 để không chia cho 0.

use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations
    pub fn fit(data: &Array2<f64>) -> PipelineResult<Self> {
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::Training("cannot fit scaler on empty data".into()))?;
        let std = data.std_axis(Axis(0), 0.0);

        let scale = std
            .iter()
            .map(|&s| if s > 0.0 && s.is_finite() { s } else { 1.0 })
            .collect();

        Ok(Self {
            mean: mean.to_vec(),
            scale,
        })
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn transform_row(&self, row: ArrayView1<f64>) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, data: &Array2<f64>) -> Array2<f64> {
        let mut out = data.clone();
        for mut row in out.axis_iter_mut(Axis(0)) {
            for ((x, m), s) in row.iter_mut().zip(self.mean.iter()).zip(self.scale.iter()) {
                *x = (*x - m) / s;
            }
        }
        out
    }

    pub fn check(&self, n_features: usize) -> Result<(), String> {
        if self.mean.len() != n_features || self.scale.len() != n_features {
            return Err(format!(
                "scaler has {} features, expected {}",
                self.mean.len(),
                n_features
            ));
        }
        if self.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err("scaler contains a zero or non-finite scale".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_and_transform() {
        let data = array![[1.0, 10.0], [3.0, 10.0]];
        let scaler = StandardScaler::fit(&data).unwrap();

        assert_eq!(scaler.mean, vec![2.0, 10.0]);
        assert_eq!(scaler.scale[0], 1.0);
        // Constant column falls back to unit scale
        assert_eq!(scaler.scale[1], 1.0);

        let scaled = scaler.transform(&data);
        assert_eq!(scaled[[0, 0]], -1.0);
        assert_eq!(scaled[[1, 0]], 1.0);
        assert_eq!(scaled[[1, 1]], 0.0);

        let row = scaler.transform_row(data.row(0));
        assert_eq!(row, vec![-1.0, 0.0]);
        assert!(scaler.check(2).is_ok());
        assert!(scaler.check(3).is_err());
    }
}
