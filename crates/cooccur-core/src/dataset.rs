//! Synthetic interaction dataset generation.
//!
//! Drives the visit simulator across `num_actors` actors and collects the
//! resulting sessions together with summary statistics.
//!
//! ## Reproducibility
//!
//! `generate` consumes a single `ChaCha8Rng` seeded from the config, in a
//! fixed order per actor: segment draw, visit-count draw, entity draws.
//! `generate_parallel` gives every actor its own ChaCha8 stream (seed from
//! the config, stream number = actor index), so its output does not depend
//! on the number of worker threads. The two modes are each reproducible
//! but do not produce the same sessions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{EntityCatalog, SegmentCatalog};
use crate::distribution::DiscreteDistribution;
use crate::error::CooccurResult;
use crate::session::{Session, SessionTable};
use crate::simulator::VisitSimulator;

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for dataset generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Number of actors (sessions) to simulate.
    pub num_actors: usize,

    /// Random seed for reproducibility.
    pub seed: u64,

    /// Number of co-occurring entity pairs kept in the statistics.
    pub top_k_pairs: usize,

    /// Prefix of generated actor ids; the index is appended zero-padded.
    pub actor_id_prefix: String,

    /// Use per-actor random streams and generate on the rayon pool.
    pub parallel: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            num_actors: 100_000,
            seed: 42,
            top_k_pairs: 5,
            actor_id_prefix: "user_".to_string(),
            parallel: false,
        }
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Generated sessions plus their statistics.
#[derive(Debug, Clone)]
pub struct InteractionDataset {
    pub table: SessionTable,
    pub stats: DatasetStats,
    pub config: GenerationConfig,
}

/// Count of actors or interactions attributed to one id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountShare {
    pub id: String,
    pub count: usize,
    /// Percentage of the relevant total (actors for segments, interactions
    /// for entities).
    pub percent: f64,
}

/// Number of sessions in which both entities were visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairCount {
    pub a: String,
    pub b: String,
    pub count: usize,
}

/// Summary statistics over a session table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub total_actors: usize,
    pub total_interactions: usize,
    pub avg_interactions_per_actor: f64,
    /// Catalog order, then any unknown labels in first-seen order.
    pub segment_counts: Vec<CountShare>,
    /// Entity column order.
    pub entity_counts: Vec<CountShare>,
    /// Ranked by count descending; ties keep column-pair order.
    pub top_pairs: Vec<PairCount>,
    /// Sessions that ended before their sampled visit count.
    pub underfilled_sessions: usize,
}

impl DatasetStats {
    /// Compute statistics over `table`.
    ///
    /// `segment_ids` fixes the reporting order of segments.
    pub fn compute(table: &SessionTable, segment_ids: &[String], top_k_pairs: usize) -> Self {
        let num_entities = table.entity_ids.len();
        let total_actors = table.len();

        let mut segment_tally: Vec<(String, usize)> =
            segment_ids.iter().map(|id| (id.clone(), 0)).collect();
        let mut entity_tally = vec![0usize; num_entities];
        let mut pair_tally = vec![0usize; num_entities * num_entities];
        let mut total_interactions = 0usize;

        for session in &table.sessions {
            match segment_tally.iter_mut().find(|(id, _)| *id == session.segment_id) {
                Some((_, count)) => *count += 1,
                None => segment_tally.push((session.segment_id.clone(), 1)),
            }

            let visited: Vec<usize> = session
                .visits
                .visited_indices()
                .filter(|&idx| idx < num_entities)
                .collect();
            total_interactions += visited.len();
            for (pos, &i) in visited.iter().enumerate() {
                entity_tally[i] += 1;
                for &j in &visited[pos + 1..] {
                    pair_tally[i * num_entities + j] += 1;
                }
            }
        }

        let percent = |count: usize, total: usize| {
            if total == 0 {
                0.0
            } else {
                count as f64 / total as f64 * 100.0
            }
        };

        let segment_counts = segment_tally
            .into_iter()
            .map(|(id, count)| CountShare {
                id,
                count,
                percent: percent(count, total_actors),
            })
            .collect();

        let entity_counts = table
            .entity_ids
            .iter()
            .zip(entity_tally.iter())
            .map(|(id, &count)| CountShare {
                id: id.clone(),
                count,
                percent: percent(count, total_interactions),
            })
            .collect();

        let mut pairs = Vec::with_capacity(num_entities * num_entities.saturating_sub(1) / 2);
        for i in 0..num_entities {
            for j in (i + 1)..num_entities {
                pairs.push(PairCount {
                    a: table.entity_ids[i].clone(),
                    b: table.entity_ids[j].clone(),
                    count: pair_tally[i * num_entities + j],
                });
            }
        }
        // Stable sort keeps canonical pair order among ties.
        pairs.sort_by(|x, y| y.count.cmp(&x.count));
        pairs.truncate(top_k_pairs);

        let avg_interactions_per_actor = if total_actors == 0 {
            0.0
        } else {
            total_interactions as f64 / total_actors as f64
        };

        Self {
            total_actors,
            total_interactions,
            avg_interactions_per_actor,
            segment_counts,
            entity_counts,
            top_pairs: pairs,
            underfilled_sessions: 0,
        }
    }

    /// Pretty-printed JSON form of the statistics.
    pub fn to_json(&self) -> CooccurResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Emit a human readable summary through `tracing`.
    pub fn log_summary(&self) {
        info!("Total actors: {}", self.total_actors);
        info!("Total interactions: {}", self.total_interactions);
        info!("Average interactions per actor: {:.2}", self.avg_interactions_per_actor);

        info!("Segment distribution:");
        for segment in &self.segment_counts {
            info!("  {}: {} ({:.1}%)", segment.id, segment.count, segment.percent);
        }

        info!("Entity interaction counts:");
        for entity in &self.entity_counts {
            info!("  {}: {} ({:.1}%)", entity.id, entity.count, entity.percent);
        }

        info!("Top co-occurrence pairs:");
        for pair in &self.top_pairs {
            info!("  {} & {}: {}", pair.a, pair.b, pair.count);
        }

        if self.underfilled_sessions > 0 {
            info!(
                "Sessions ended early (preference support exhausted): {}",
                self.underfilled_sessions
            );
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Samples one actor: segment, then session.
struct ActorSampler<'a> {
    segments: &'a SegmentCatalog,
    segment_dist: DiscreteDistribution,
    simulator: VisitSimulator,
    actor_id_prefix: &'a str,
}

impl ActorSampler<'_> {
    /// Returns the session and whether it ended early.
    fn sample<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> (Session, bool) {
        // Catalog weights are validated to sum to 1, so a segment is always drawn.
        let segment_idx = self.segment_dist.draw(rng).unwrap_or(0);
        let segment = &self.segments.as_slice()[segment_idx];

        let draw = self.simulator.simulate(segment, rng);
        let underfilled = draw.is_underfilled();
        let session = Session {
            actor_id: format!("{}{:06}", self.actor_id_prefix, index),
            segment_id: segment.id.clone(),
            visits: draw.visits,
        };
        (session, underfilled)
    }
}

/// Generator for synthetic interaction datasets.
pub struct DatasetGenerator<'a> {
    config: GenerationConfig,
    entities: &'a EntityCatalog,
    sampler: ActorSampler<'a>,
    rng: ChaCha8Rng,
}

impl<'a> DatasetGenerator<'a> {
    /// Create a new generator over validated catalogs.
    pub fn new(
        config: &'a GenerationConfig,
        entities: &'a EntityCatalog,
        segments: &'a SegmentCatalog,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let sampler = ActorSampler {
            segments,
            segment_dist: DiscreteDistribution::from_weights(segments.weights()),
            simulator: VisitSimulator::new(entities.len()),
            actor_id_prefix: &config.actor_id_prefix,
        };
        Self {
            config: config.clone(),
            entities,
            sampler,
            rng,
        }
    }

    /// Generate with the mode selected by `config.parallel`.
    pub fn run(&mut self) -> InteractionDataset {
        if self.config.parallel {
            self.generate_parallel()
        } else {
            self.generate()
        }
    }

    /// Generate sequentially from the shared random source.
    ///
    /// The source is re-seeded from `config.seed` on every call.
    pub fn generate(&mut self) -> InteractionDataset {
        self.rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let num_actors = self.config.num_actors;
        info!("Generating synthetic interaction data for {} actors...", num_actors);

        let checkpoint = (num_actors / 20).max(1);
        let mut sessions = Vec::with_capacity(num_actors);
        let mut underfilled = 0usize;

        for index in 0..num_actors {
            if index % checkpoint == 0 {
                let progress = index as f64 / num_actors as f64 * 100.0;
                info!("Progress: {:.0}% ({}/{} actors)", progress, index, num_actors);
            }

            let (session, short) = self.sampler.sample(index, &mut self.rng);
            if short {
                underfilled += 1;
                debug!(actor = %session.actor_id, "session under-filled");
            }
            sessions.push(session);
        }
        info!("Progress: 100% - dataset generation complete");

        self.finish(sessions, underfilled)
    }

    /// Generate on the rayon pool with one random stream per actor.
    pub fn generate_parallel(&self) -> InteractionDataset {
        let num_actors = self.config.num_actors;
        info!(
            "Generating synthetic interaction data for {} actors on {} threads...",
            num_actors,
            rayon::current_num_threads()
        );

        let sampled: Vec<(Session, bool)> = (0..num_actors)
            .into_par_iter()
            .map(|index| {
                let mut rng = actor_stream(self.config.seed, index);
                self.sampler.sample(index, &mut rng)
            })
            .collect();

        let underfilled = sampled.iter().filter(|(_, short)| *short).count();
        let sessions = sampled.into_iter().map(|(session, _)| session).collect();
        info!("Dataset generation complete");

        self.finish(sessions, underfilled)
    }

    fn finish(&self, sessions: Vec<Session>, underfilled: usize) -> InteractionDataset {
        let table = SessionTable::new(self.entities.ids(), sessions);
        let mut stats =
            DatasetStats::compute(&table, &self.sampler.segments.ids(), self.config.top_k_pairs);
        stats.underfilled_sessions = underfilled;

        InteractionDataset {
            table,
            stats,
            config: self.config.clone(),
        }
    }
}

/// Independent random stream for one actor.
pub fn actor_stream(seed: u64, actor_index: usize) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(actor_index as u64);
    rng
}
