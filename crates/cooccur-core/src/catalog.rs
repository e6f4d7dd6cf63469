//! Entity and segment catalogs.
//!
//! Catalogs are described by plain serde records (`EntitySpec`,
//! `SegmentSpec`) and validated once into immutable `EntityCatalog` /
//! `SegmentCatalog` values. Everything downstream works on catalog indices,
//! so declaration order drives row order and tie breaking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CooccurError, CooccurResult};

/// Allowed deviation of the summed segment weights from 1.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

// ============================================================================
// Specs (configuration records)
// ============================================================================

/// An interaction target as declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySpec {
    pub id: String,
    /// Market category, e.g. "premium" or "budget".
    pub category: String,
    pub region: String,
    pub route_class: String,
    /// Base popularity in (0, 1).
    pub base_probability: f64,
}

/// Preference mass a segment puts on one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceSpec {
    pub entity: String,
    pub weight: f64,
}

/// Unordered co-occurrence boost between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostSpec {
    pub a: String,
    pub b: String,
    pub multiplier: f64,
}

/// A behavior segment as declared in configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpec {
    pub id: String,
    /// Population share in (0, 1]; all weights must sum to 1.
    pub weight: f64,
    /// Entities not listed get zero preference.
    pub preferences: Vec<PreferenceSpec>,
    pub avg_interactions: f64,
    #[serde(default)]
    pub boosts: Vec<BoostSpec>,
}

// ============================================================================
// Entity catalog
// ============================================================================

/// A validated interaction target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub category: String,
    pub region: String,
    pub route_class: String,
    pub base_probability: f64,
}

/// Immutable, ordered set of entities.
#[derive(Debug, Clone)]
pub struct EntityCatalog {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
}

impl EntityCatalog {
    /// Validate entity specs and build the catalog.
    pub fn new(specs: &[EntitySpec]) -> CooccurResult<Self> {
        if specs.is_empty() {
            return Err(CooccurError::catalog("entities", "catalog must declare at least one entity"));
        }

        let mut entities = Vec::with_capacity(specs.len());
        let mut index = HashMap::with_capacity(specs.len());

        for (position, spec) in specs.iter().enumerate() {
            validate_label(&format!("entities[{}].id", position), &spec.id)?;

            if !(spec.base_probability > 0.0 && spec.base_probability < 1.0) {
                return Err(CooccurError::catalog(
                    format!("entities.{}.base_probability", spec.id),
                    format!("must be in (0, 1), got {}", spec.base_probability),
                ));
            }

            if index.insert(spec.id.clone(), position).is_some() {
                return Err(CooccurError::catalog(
                    "entities",
                    format!("duplicate entity id '{}'", spec.id),
                ));
            }

            entities.push(Entity {
                id: spec.id.clone(),
                category: spec.category.clone(),
                region: spec.region.clone(),
                route_class: spec.route_class.clone(),
                base_probability: spec.base_probability,
            });
        }

        Ok(Self { entities, index })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Entity> {
        self.entities.get(idx)
    }

    /// Catalog position of an entity id.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Entity ids in declaration order.
    pub fn ids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.id.clone()).collect()
    }
}

// ============================================================================
// Segment catalog
// ============================================================================

/// A boost resolved to catalog indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boost {
    pub a: usize,
    pub b: usize,
    pub multiplier: f64,
}

impl Boost {
    /// The partner of `visited` in this rule, if `visited` is one end of it.
    pub fn partner_of(&self, visited: usize) -> Option<usize> {
        if visited == self.a {
            Some(self.b)
        } else if visited == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

/// A validated segment with dense, catalog-indexed preferences.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: String,
    pub weight: f64,
    /// One entry per catalog entity.
    pub preferences: Vec<f64>,
    pub avg_interactions: f64,
    pub boosts: Vec<Boost>,
}

/// Immutable, ordered set of segments whose weights sum to 1.
#[derive(Debug, Clone)]
pub struct SegmentCatalog {
    segments: Vec<Segment>,
}

impl SegmentCatalog {
    /// Validate segment specs against the entity catalog.
    pub fn new(specs: &[SegmentSpec], entities: &EntityCatalog) -> CooccurResult<Self> {
        if specs.is_empty() {
            return Err(CooccurError::catalog("segments", "catalog must declare at least one segment"));
        }

        let mut seen = HashMap::with_capacity(specs.len());
        let mut segments = Vec::with_capacity(specs.len());

        for (position, spec) in specs.iter().enumerate() {
            validate_label(&format!("segments[{}].id", position), &spec.id)?;
            if seen.insert(spec.id.clone(), position).is_some() {
                return Err(CooccurError::catalog(
                    "segments",
                    format!("duplicate segment id '{}'", spec.id),
                ));
            }
            segments.push(resolve_segment(spec, entities)?);
        }

        let total: f64 = segments.iter().map(|s| s.weight).sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(CooccurError::catalog(
                "segments.weight",
                format!("segment weights must sum to 1, got {}", total),
            ));
        }

        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Segment> {
        self.segments.get(idx)
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }

    pub fn find(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Population weights in declaration order.
    pub fn weights(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.weight).collect()
    }

    /// Segment ids in declaration order.
    pub fn ids(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.id.clone()).collect()
    }
}

fn resolve_segment(spec: &SegmentSpec, entities: &EntityCatalog) -> CooccurResult<Segment> {
    let field = |name: &str| format!("segments.{}.{}", spec.id, name);

    if !(spec.weight > 0.0 && spec.weight <= 1.0) {
        return Err(CooccurError::catalog(
            field("weight"),
            format!("must be in (0, 1], got {}", spec.weight),
        ));
    }

    if !spec.avg_interactions.is_finite() || spec.avg_interactions < 0.0 {
        return Err(CooccurError::catalog(
            field("avg_interactions"),
            format!("must be a finite value >= 0, got {}", spec.avg_interactions),
        ));
    }

    let mut preferences = vec![0.0; entities.len()];
    for pref in &spec.preferences {
        let idx = entities.index_of(&pref.entity).ok_or_else(|| {
            CooccurError::catalog(field("preferences"), format!("unknown entity '{}'", pref.entity))
        })?;
        if !pref.weight.is_finite() || pref.weight < 0.0 {
            return Err(CooccurError::catalog(
                field("preferences"),
                format!("weight for '{}' must be finite and >= 0, got {}", pref.entity, pref.weight),
            ));
        }
        preferences[idx] = pref.weight;
    }

    if preferences.iter().sum::<f64>() <= 0.0 {
        return Err(CooccurError::catalog(
            field("preferences"),
            "preference mass must be positive",
        ));
    }

    let mut boosts = Vec::with_capacity(spec.boosts.len());
    for boost in &spec.boosts {
        let lookup = |id: &str| {
            entities.index_of(id).ok_or_else(|| {
                CooccurError::catalog(field("boosts"), format!("unknown entity '{}'", id))
            })
        };
        let a = lookup(&boost.a)?;
        let b = lookup(&boost.b)?;
        if a == b {
            return Err(CooccurError::catalog(
                field("boosts"),
                format!("boost pairs '{}' with itself", boost.a),
            ));
        }
        if !boost.multiplier.is_finite() || boost.multiplier < 1.0 {
            return Err(CooccurError::catalog(
                field("boosts"),
                format!(
                    "multiplier for ({}, {}) must be >= 1, got {}",
                    boost.a, boost.b, boost.multiplier
                ),
            ));
        }
        boosts.push(Boost {
            a,
            b,
            multiplier: boost.multiplier,
        });
    }

    Ok(Segment {
        id: spec.id.clone(),
        weight: spec.weight,
        preferences,
        avg_interactions: spec.avg_interactions,
        boosts,
    })
}

/// Ids and labels end up as flat-file headers and cells.
pub(crate) fn validate_label(field: &str, label: &str) -> CooccurResult<()> {
    if label.trim().is_empty() {
        return Err(CooccurError::catalog(field, "must not be empty"));
    }
    if label.contains([',', '"', '\n', '\r']) {
        return Err(CooccurError::catalog(
            field,
            format!("'{}' must not contain commas, quotes or line breaks", label),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str) -> EntitySpec {
        EntitySpec {
            id: id.to_string(),
            category: "premium".to_string(),
            region: "UK".to_string(),
            route_class: "long_haul".to_string(),
            base_probability: 0.1,
        }
    }

    fn pref(entity: &str, weight: f64) -> PreferenceSpec {
        PreferenceSpec {
            entity: entity.to_string(),
            weight,
        }
    }

    fn segment(id: &str, weight: f64) -> SegmentSpec {
        SegmentSpec {
            id: id.to_string(),
            weight,
            preferences: vec![pref("X", 0.6), pref("Y", 0.3), pref("Z", 0.1)],
            avg_interactions: 2.0,
            boosts: vec![],
        }
    }

    fn xyz() -> EntityCatalog {
        EntityCatalog::new(&[entity("X"), entity("Y"), entity("Z")]).unwrap()
    }

    #[test]
    fn test_entity_catalog_preserves_order() {
        let catalog = xyz();
        assert_eq!(catalog.ids(), vec!["X", "Y", "Z"]);
        assert_eq!(catalog.index_of("Z"), Some(2));
        assert_eq!(catalog.index_of("W"), None);
    }

    #[test]
    fn test_entity_catalog_rejects_duplicates_and_bad_probability() {
        assert!(EntityCatalog::new(&[entity("X"), entity("X")]).is_err());
        assert!(EntityCatalog::new(&[]).is_err());

        let mut bad = entity("X");
        bad.base_probability = 1.0;
        let err = EntityCatalog::new(&[bad]).unwrap_err();
        assert!(err.to_string().contains("base_probability"));
    }

    #[test]
    fn test_entity_catalog_rejects_unwritable_ids() {
        assert!(EntityCatalog::new(&[entity("a,b")]).is_err());
        assert!(EntityCatalog::new(&[entity("  ")]).is_err());
    }

    #[test]
    fn test_segment_weights_must_sum_to_one() {
        let entities = xyz();
        let ok = SegmentCatalog::new(&[segment("a", 0.4), segment("b", 0.6)], &entities);
        assert!(ok.is_ok());

        let err = SegmentCatalog::new(&[segment("a", 0.4), segment("b", 0.5)], &entities).unwrap_err();
        assert!(err.to_string().contains("sum to 1"), "got: {}", err);
    }

    #[test]
    fn test_single_segment_with_full_weight() {
        let catalog = SegmentCatalog::new(&[segment("only", 1.0)], &xyz()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.weights(), vec![1.0]);
    }

    #[test]
    fn test_segment_preferences_resolve_densely() {
        let entities = xyz();
        let mut spec = segment("s", 1.0);
        spec.preferences = vec![pref("Z", 0.5), pref("X", 0.5)];
        let catalog = SegmentCatalog::new(&[spec], &entities).unwrap();
        assert_eq!(catalog.get(0).unwrap().preferences, vec![0.5, 0.0, 0.5]);
    }

    #[test]
    fn test_segment_validation_failures() {
        let entities = xyz();
        let cases: Vec<(SegmentSpec, &str)> = vec![
            {
                let mut s = segment("s", 1.0);
                s.preferences.push(pref("W", 0.1));
                (s, "unknown entity 'W'")
            },
            {
                let mut s = segment("s", 1.0);
                s.preferences[0].weight = -0.2;
                (s, "must be finite and >= 0")
            },
            {
                let mut s = segment("s", 1.0);
                s.preferences = vec![pref("X", 0.0)];
                (s, "preference mass must be positive")
            },
            {
                let mut s = segment("s", 1.0);
                s.avg_interactions = -1.0;
                (s, "avg_interactions")
            },
            {
                let mut s = segment("s", 1.0);
                s.boosts.push(BoostSpec { a: "X".into(), b: "X".into(), multiplier: 2.0 });
                (s, "with itself")
            },
            {
                let mut s = segment("s", 1.0);
                s.boosts.push(BoostSpec { a: "X".into(), b: "Y".into(), multiplier: 0.5 });
                (s, "must be >= 1")
            },
            {
                let mut s = segment("s", 1.0);
                s.boosts.push(BoostSpec { a: "X".into(), b: "Q".into(), multiplier: 2.0 });
                (s, "unknown entity 'Q'")
            },
        ];

        for (spec, expected) in cases {
            let err = SegmentCatalog::new(&[spec], &entities).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{}' in '{}'",
                expected,
                err
            );
        }
    }

    #[test]
    fn test_boost_partner_is_unordered() {
        let boost = Boost { a: 0, b: 2, multiplier: 3.0 };
        assert_eq!(boost.partner_of(0), Some(2));
        assert_eq!(boost.partner_of(2), Some(0));
        assert_eq!(boost.partner_of(1), None);
    }
}
