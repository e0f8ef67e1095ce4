use serde::{Deserialize, Serialize};

/// Fixed-length identity vector produced by a face recognition model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Scales `values` to unit L2 norm. A zero vector is left unchanged.
    pub fn normalized(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in values.iter_mut() {
                *x /= norm;
            }
        }
        Self(values)
    }

    pub fn values(&self) -> &[f32] {
        &self.0
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// Euclidean distance, or `None` when the dimensions differ.
    pub fn euclidean_distance(&self, other: &Embedding) -> Option<f64> {
        if self.dim() != other.dim() {
            return None;
        }
        let sum: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(a, b)| {
                let d = *a as f64 - *b as f64;
                d * d
            })
            .sum();
        Some(sum.sqrt())
    }
}
