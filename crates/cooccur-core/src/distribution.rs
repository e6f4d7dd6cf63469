//! Weighted categorical distribution with in-place reweighting.
//!
//! Outcomes are dense indices `0..len`. Weights are kept as given and are
//! not required to sum to 1; every draw normalizes against the current
//! total. Outcomes can be boosted (`multiply`) or removed (`remove`) between
//! draws, which is how the visit simulator models sampling without
//! replacement under co-occurrence boosts.

use rand::Rng;

/// A discrete distribution over outcome indices.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteDistribution {
    weights: Vec<f64>,
}

impl DiscreteDistribution {
    /// Build a distribution from raw weights.
    ///
    /// Negative and non-finite weights are treated as zero.
    pub fn from_weights(weights: impl IntoIterator<Item = f64>) -> Self {
        let weights = weights
            .into_iter()
            .map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();
        Self { weights }
    }

    /// Number of outcomes, including removed ones.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Current (unnormalized) weight of an outcome; 0.0 when out of range.
    pub fn weight(&self, outcome: usize) -> f64 {
        self.weights.get(outcome).copied().unwrap_or(0.0)
    }

    /// Sum of all current weights.
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Probability of drawing `outcome` under the current weights.
    pub fn probability(&self, outcome: usize) -> f64 {
        let total = self.total_weight();
        if total > 0.0 {
            self.weight(outcome) / total
        } else {
            0.0
        }
    }

    /// True when no outcome has positive weight left.
    pub fn is_exhausted(&self) -> bool {
        self.total_weight() <= 0.0
    }

    /// Multiply an outcome's weight by `factor`.
    pub fn multiply(&mut self, outcome: usize, factor: f64) {
        if let Some(w) = self.weights.get_mut(outcome) {
            *w *= factor;
        }
    }

    /// Zero an outcome's weight so it can no longer be drawn.
    pub fn remove(&mut self, outcome: usize) {
        if let Some(w) = self.weights.get_mut(outcome) {
            *w = 0.0;
        }
    }

    /// Rescale the weights to sum to 1. No-op on an exhausted distribution.
    pub fn normalize(&mut self) {
        let total = self.total_weight();
        if total > 0.0 {
            for w in &mut self.weights {
                *w /= total;
            }
        }
    }

    /// Draw one outcome, consuming exactly one uniform `f64` from `rng`.
    ///
    /// Returns `None` without touching `rng` when the distribution is
    /// exhausted.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<usize> {
        let total = self.total_weight();
        if total <= 0.0 {
            return None;
        }

        let target = rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let mut last_positive = None;
        for (idx, &w) in self.weights.iter().enumerate() {
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            last_positive = Some(idx);
            if target < cumulative {
                return Some(idx);
            }
        }

        // Rounding can leave target == cumulative at the upper end.
        last_positive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_draw_never_returns_zero_weight_outcome() {
        let dist = DiscreteDistribution::from_weights([0.0, 2.0, 0.0, 1.0]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..2000 {
            let outcome = dist.draw(&mut rng).expect("distribution has mass");
            assert!(outcome == 1 || outcome == 3, "drew zero-weight outcome {}", outcome);
        }
    }

    #[test]
    fn test_draw_frequencies_follow_unnormalized_weights() {
        // Weights sum to 2.0; the draw must normalize on its own.
        let dist = DiscreteDistribution::from_weights([1.2, 0.6, 0.2]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let trials = 20_000;
        let mut counts = [0usize; 3];
        for _ in 0..trials {
            counts[dist.draw(&mut rng).unwrap()] += 1;
        }

        let expected = [0.6, 0.3, 0.1];
        for (count, p) in counts.iter().zip(expected.iter()) {
            let freq = *count as f64 / trials as f64;
            assert!((freq - p).abs() < 0.02, "frequency {} too far from {}", freq, p);
        }
    }

    #[test]
    fn test_exhausted_draw_returns_none() {
        let mut dist = DiscreteDistribution::from_weights([0.5, 0.5]);
        dist.remove(0);
        dist.remove(1);
        assert!(dist.is_exhausted());

        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(dist.draw(&mut rng), None);
    }

    #[test]
    fn test_multiply_and_remove_then_normalize() {
        let mut dist = DiscreteDistribution::from_weights([0.6, 0.3, 0.1]);
        dist.multiply(1, 10.0);
        dist.remove(0);
        dist.normalize();

        assert!((dist.total_weight() - 1.0).abs() < 1e-12);
        assert_eq!(dist.weight(0), 0.0);
        assert!((dist.probability(1) - 3.0 / 3.1).abs() < 1e-12);
        assert!((dist.probability(2) - 0.1 / 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_weights_are_zeroed() {
        let dist = DiscreteDistribution::from_weights([-1.0, f64::NAN, f64::INFINITY, 0.25]);
        assert_eq!(dist.len(), 4);
        assert_eq!(dist.total_weight(), 0.25);
        assert_eq!(dist.probability(3), 1.0);
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut dist = DiscreteDistribution::from_weights([1.0]);
        dist.multiply(5, 3.0);
        dist.remove(9);
        assert_eq!(dist.weight(9), 0.0);
        assert_eq!(dist.total_weight(), 1.0);
    }
}
