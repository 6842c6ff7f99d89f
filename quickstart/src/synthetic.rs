use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Points drawn uniformly from `[-1, 1]^d`, labelled by a known line plus
/// bounded noise.
#[derive(Clone, Debug)]
pub struct SyntheticDataset {
    points: Array2<f64>,
    targets: Array1<f64>,
}

impl SyntheticDataset {
    pub fn generate(
        true_weights: &[f64],
        true_bias: f64,
        size: usize,
        noise: f64,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let dims = true_weights.len();
        let weights = Array1::from(true_weights.to_vec());

        let points = Array2::from_shape_simple_fn((size, dims), || rng.random_range(-1.0..=1.0));
        let mut targets = points.dot(&weights) + true_bias;
        if noise > 0.0 {
            targets.mapv_inplace(|y| y + rng.random_range(-noise..=noise));
        }
        Self { points, targets }
    }

    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    pub fn targets(&self) -> &Array1<f64> {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn dims(&self) -> usize {
        self.points.ncols()
    }
}
