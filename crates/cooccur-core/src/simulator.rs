//! Per-session visit simulation.
//!
//! A session is sampled without replacement from a segment's preference
//! distribution. The number of visits is Poisson around the segment's
//! average, clamped to `[1, |entities|]`. Each draw after the first
//! restarts from the raw preferences, multiplies the weight of every
//! unvisited partner of an already-visited entity by the boost multiplier
//! (cumulatively), removes visited entities and draws from what is left.
//!
//! If nothing with positive weight remains, the session ends early with
//! fewer visits than requested. This is not an error.

use rand::Rng;
use rand_distr::{Distribution, Poisson};
use tracing::trace;

use crate::catalog::Segment;
use crate::distribution::DiscreteDistribution;
use crate::session::VisitVector;

/// Result of simulating one session.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitDraw {
    pub visits: VisitVector,
    /// Entity indices in the order they were drawn.
    pub order: Vec<usize>,
    /// Visit count `k` sampled before drawing entities.
    pub requested: usize,
}

impl VisitDraw {
    /// True when the session stopped before reaching `requested` visits.
    pub fn is_underfilled(&self) -> bool {
        self.order.len() < self.requested
    }
}

/// Simulates sessions over a fixed number of entities.
#[derive(Debug, Clone, Copy)]
pub struct VisitSimulator {
    num_entities: usize,
}

impl VisitSimulator {
    pub fn new(num_entities: usize) -> Self {
        Self { num_entities }
    }

    pub fn num_entities(&self) -> usize {
        self.num_entities
    }

    /// Simulate one session for `segment`.
    ///
    /// Draw order: visit count, first entity, then one draw per further
    /// visit.
    pub fn simulate<R: Rng + ?Sized>(&self, segment: &Segment, rng: &mut R) -> VisitDraw {
        let requested = self.sample_visit_count(segment.avg_interactions, rng);
        let mut visits = VisitVector::empty(self.num_entities);
        let mut order = Vec::with_capacity(requested);

        let first = DiscreteDistribution::from_weights(segment.preferences.iter().copied());
        let Some(first) = first.draw(rng) else {
            return VisitDraw {
                visits,
                order,
                requested,
            };
        };
        visits.mark(first);
        order.push(first);

        for _ in 1..requested {
            let remaining = self.remaining_distribution(segment, &visits, &order);
            match remaining.draw(rng) {
                Some(next) => {
                    visits.mark(next);
                    order.push(next);
                }
                None => {
                    trace!(
                        segment = %segment.id,
                        requested,
                        drawn = order.len(),
                        "preference support exhausted, ending session early"
                    );
                    break;
                }
            }
        }

        VisitDraw {
            visits,
            order,
            requested,
        }
    }

    /// `k = max(1, min(|entities|, Poisson(avg)))`.
    fn sample_visit_count<R: Rng + ?Sized>(&self, avg_interactions: f64, rng: &mut R) -> usize {
        // Poisson is undefined at 0; the draw would be 0 anyway.
        let sampled = match Poisson::new(avg_interactions) {
            Ok(poisson) if avg_interactions > 0.0 => {
                let draw: f64 = poisson.sample(rng);
                draw as usize
            }
            _ => 0,
        };
        sampled.min(self.num_entities).max(1)
    }

    /// Preferences with boosts from visited entities applied and visited
    /// entities removed.
    fn remaining_distribution(
        &self,
        segment: &Segment,
        visits: &VisitVector,
        order: &[usize],
    ) -> DiscreteDistribution {
        let mut dist = DiscreteDistribution::from_weights(segment.preferences.iter().copied());

        for &visited in order {
            for boost in &segment.boosts {
                if let Some(partner) = boost.partner_of(visited) {
                    if !visits.is_visited(partner) {
                        dist.multiply(partner, boost.multiplier);
                    }
                }
            }
        }

        for &visited in order {
            dist.remove(visited);
        }

        dist.normalize();
        dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Boost;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    const X: usize = 0;
    const Y: usize = 1;
    const Z: usize = 2;

    fn xyz_segment(avg_interactions: f64, boosts: Vec<Boost>) -> Segment {
        Segment {
            id: "solo".to_string(),
            weight: 1.0,
            preferences: vec![0.6, 0.3, 0.1],
            avg_interactions,
            boosts,
        }
    }

    #[test]
    fn test_zero_average_yields_exactly_one_visit() {
        let simulator = VisitSimulator::new(3);
        let segment = xyz_segment(0.0, vec![]);
        let trials = 10_000;
        let mut counts = [0usize; 3];

        for seed in 0..trials {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let draw = simulator.simulate(&segment, &mut rng);
            assert_eq!(draw.visits.count(), 1);
            assert_eq!(draw.requested, 1);
            assert!(draw.visits.as_binary().iter().all(|&v| v <= 1));
            counts[draw.order[0]] += 1;
        }

        let expected = [0.6, 0.3, 0.1];
        for (count, p) in counts.iter().zip(expected.iter()) {
            let freq = *count as f64 / trials as f64;
            assert!((freq - p).abs() < 0.03, "frequency {} too far from {}", freq, p);
        }
    }

    #[test]
    fn test_visit_count_within_bounds() {
        let simulator = VisitSimulator::new(3);
        let segment = xyz_segment(1.0, vec![]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        for _ in 0..5_000 {
            let draw = simulator.simulate(&segment, &mut rng);
            let count = draw.visits.count();
            assert!((1..=3).contains(&count), "visit count {} out of bounds", count);
            assert_eq!(count, draw.order.len());
            assert!(!draw.is_underfilled());
        }
    }

    #[test]
    fn test_overwhelming_boost_selects_partner_second() {
        let simulator = VisitSimulator::new(3);
        let segment = xyz_segment(3.0, vec![Boost { a: X, b: Y, multiplier: 100.0 }]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut after_x = 0usize;
        let mut y_after_x = 0usize;
        for _ in 0..10_000 {
            let draw = simulator.simulate(&segment, &mut rng);
            if draw.order.len() >= 2 && draw.order[0] == X {
                after_x += 1;
                if draw.order[1] == Y {
                    y_after_x += 1;
                }
            }
        }

        assert!(after_x > 1_000, "too few X-first sessions: {}", after_x);
        let rate = y_after_x as f64 / after_x as f64;
        // Boosted Y weight is 30 against Z's 0.1.
        assert!(rate > 0.98, "P(Y second | X first) = {}", rate);
    }

    #[test]
    fn test_boost_raises_conditional_probability() {
        let simulator = VisitSimulator::new(3);
        let conditional_rate = |segment: &Segment| {
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            let (mut after_x, mut y_after_x) = (0usize, 0usize);
            for _ in 0..5_000 {
                let draw = simulator.simulate(segment, &mut rng);
                if draw.order.len() >= 2 && draw.order[0] == X {
                    after_x += 1;
                    if draw.order[1] == Y {
                        y_after_x += 1;
                    }
                }
            }
            y_after_x as f64 / after_x as f64
        };

        let plain = conditional_rate(&xyz_segment(5.0, vec![]));
        let boosted = conditional_rate(&xyz_segment(5.0, vec![Boost { a: X, b: Y, multiplier: 3.0 }]));

        // Unboosted 0.3 / 0.4 = 0.75, boosted 0.9 / 1.0 = 0.9.
        assert!((plain - 0.75).abs() < 0.04, "unboosted rate {}", plain);
        assert!(boosted > plain + 0.08, "boosted {} vs unboosted {}", boosted, plain);
    }

    #[test]
    fn test_boost_applies_in_both_directions() {
        let simulator = VisitSimulator::new(3);
        let segment = Segment {
            id: "reverse".to_string(),
            weight: 1.0,
            preferences: vec![0.1, 0.6, 0.3],
            avg_interactions: 5.0,
            boosts: vec![Boost { a: X, b: Y, multiplier: 100.0 }],
        };
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        let (mut after_y, mut x_after_y) = (0usize, 0usize);
        for _ in 0..5_000 {
            let draw = simulator.simulate(&segment, &mut rng);
            if draw.order.len() >= 2 && draw.order[0] == Y {
                after_y += 1;
                if draw.order[1] == X {
                    x_after_y += 1;
                }
            }
        }

        // X: 0.1 * 100 = 10 against Z's 0.3.
        assert!(x_after_y as f64 / after_y as f64 > 0.95);
    }

    #[test]
    fn test_exhausted_preferences_stop_early() {
        let simulator = VisitSimulator::new(3);
        let segment = Segment {
            id: "loyal".to_string(),
            weight: 1.0,
            preferences: vec![1.0, 0.0, 0.0],
            avg_interactions: 10.0,
            boosts: vec![Boost { a: X, b: Z, multiplier: 50.0 }],
        };

        let mut underfilled = 0;
        for seed in 0..500 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let draw = simulator.simulate(&segment, &mut rng);
            assert_eq!(draw.visits.count(), 1);
            assert_eq!(draw.order, vec![X]);
            if draw.is_underfilled() {
                underfilled += 1;
                assert!(draw.visits.count() < draw.requested);
            }
        }
        assert!(underfilled > 450, "expected most sessions to stop early, got {}", underfilled);
    }

    #[test]
    fn test_simulation_is_reproducible() {
        let simulator = VisitSimulator::new(3);
        let segment = xyz_segment(2.0, vec![Boost { a: Y, b: Z, multiplier: 4.0 }]);

        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            (0..200)
                .map(|_| simulator.simulate(&segment, &mut rng))
                .collect::<Vec<_>>()
        };

        assert_eq!(run(99), run(99));
    }
}
