//! Study configuration: catalogs, affinity rules, generation and quality
//! settings.
//!
//! The default study is five airlines and five traveler segments. All
//! validation happens in [`StudyConfig::catalogs`] before any session is
//! simulated.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::{BoostSpec, EntityCatalog, EntitySpec, PreferenceSpec, SegmentCatalog, SegmentSpec};
use crate::contingency::QualityConfig;
use crate::dataset::GenerationConfig;
use crate::error::{CooccurError, CooccurResult};
use crate::grouping::{AffinityConfig, AffinityGrouping};

/// Prefix of environment overrides, e.g. `COOCCUR__GENERATION__SEED=7`.
pub const ENV_PREFIX: &str = "COOCCUR";

/// Complete study configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub entities: Vec<EntitySpec>,
    pub segments: Vec<SegmentSpec>,
    pub affinity: AffinityConfig,
    pub generation: GenerationConfig,
    pub quality: QualityConfig,
}

/// Validated catalogs built from a study.
#[derive(Debug, Clone)]
pub struct StudyCatalogs {
    pub entities: EntityCatalog,
    pub segments: SegmentCatalog,
    pub affinity: AffinityGrouping,
}

impl StudyConfig {
    /// Load configuration from defaults, an optional TOML file and the
    /// environment.
    ///
    /// Layers, later wins:
    /// 1. built-in airline study
    /// 2. `path` (if given; must exist)
    /// 3. environment variables with the `COOCCUR__` prefix, `__` separating
    ///    nested keys
    pub fn load(path: Option<&Path>) -> CooccurResult<Self> {
        let defaults = config::Config::try_from(&StudyConfig::default())?;

        let mut builder = config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            if !path.exists() {
                return Err(CooccurError::not_found(path));
            }
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: StudyConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file only.
    pub fn from_file(path: &Path) -> CooccurResult<Self> {
        if !path.exists() {
            return Err(CooccurError::not_found(path));
        }
        let content = std::fs::read_to_string(path)?;
        let config: StudyConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> CooccurResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate catalogs and affinity rules.
    pub fn validate(&self) -> CooccurResult<()> {
        self.catalogs().map(|_| ())
    }

    /// Build the immutable catalogs.
    pub fn catalogs(&self) -> CooccurResult<StudyCatalogs> {
        let entities = EntityCatalog::new(&self.entities)?;
        let segments = SegmentCatalog::new(&self.segments, &entities)?;
        let affinity = self.affinity.resolve(&entities.ids())?;
        Ok(StudyCatalogs {
            entities,
            segments,
            affinity,
        })
    }
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            entities: airline_entities(),
            segments: traveler_segments(),
            affinity: AffinityConfig::default(),
            generation: GenerationConfig::default(),
            quality: QualityConfig::default(),
        }
    }
}

fn airline_entities() -> Vec<EntitySpec> {
    let airline = |id: &str, category: &str, region: &str, route_class: &str, base_probability: f64| EntitySpec {
        id: id.to_string(),
        category: category.to_string(),
        region: region.to_string(),
        route_class: route_class.to_string(),
        base_probability,
    };

    vec![
        airline("British_Airways", "premium", "UK", "long_haul", 0.15),
        airline("Virgin_Atlantic", "premium", "UK", "long_haul", 0.12),
        airline("Lufthansa", "premium", "Europe", "long_haul", 0.13),
        airline("Air_France", "premium", "Europe", "long_haul", 0.11),
        airline("Ryanair", "budget", "Europe", "short_haul", 0.20),
    ]
}

fn traveler_segments() -> Vec<SegmentSpec> {
    fn segment(
        id: &str,
        weight: f64,
        avg_interactions: f64,
        preferences: &[(&str, f64)],
        boosts: &[(&str, &str, f64)],
    ) -> SegmentSpec {
        SegmentSpec {
            id: id.to_string(),
            weight,
            preferences: preferences
                .iter()
                .map(|&(entity, weight)| PreferenceSpec {
                    entity: entity.to_string(),
                    weight,
                })
                .collect(),
            avg_interactions,
            boosts: boosts
                .iter()
                .map(|&(a, b, multiplier)| BoostSpec {
                    a: a.to_string(),
                    b: b.to_string(),
                    multiplier,
                })
                .collect(),
        }
    }

    vec![
        segment(
            "business_uk",
            0.22,
            2.2,
            &[
                ("British_Airways", 0.55),
                ("Virgin_Atlantic", 0.35),
                ("Lufthansa", 0.08),
                ("Air_France", 0.02),
                ("Ryanair", 0.00),
            ],
            &[("British_Airways", "Virgin_Atlantic", 5.0)],
        ),
        segment(
            "business_european",
            0.18,
            2.1,
            &[
                ("Lufthansa", 0.50),
                ("Air_France", 0.40),
                ("British_Airways", 0.08),
                ("Virgin_Atlantic", 0.02),
                ("Ryanair", 0.00),
            ],
            &[("Lufthansa", "Air_France", 5.0)],
        ),
        segment(
            "leisure_premium",
            0.25,
            2.8,
            &[
                ("British_Airways", 0.30),
                ("Virgin_Atlantic", 0.30),
                ("Lufthansa", 0.25),
                ("Air_France", 0.15),
                ("Ryanair", 0.00),
            ],
            &[
                ("British_Airways", "Virgin_Atlantic", 3.5),
                ("Lufthansa", "Air_France", 3.0),
            ],
        ),
        segment(
            "budget_conscious",
            0.25,
            1.8,
            &[
                ("Ryanair", 0.75),
                ("British_Airways", 0.08),
                ("Lufthansa", 0.07),
                ("Air_France", 0.06),
                ("Virgin_Atlantic", 0.04),
            ],
            &[("Ryanair", "British_Airways", 2.0)],
        ),
        segment(
            "price_shopper",
            0.10,
            3.5,
            &[
                ("Ryanair", 0.40),
                ("British_Airways", 0.20),
                ("Lufthansa", 0.18),
                ("Air_France", 0.12),
                ("Virgin_Atlantic", 0.10),
            ],
            &[
                ("Ryanair", "British_Airways", 4.0),
                ("Ryanair", "Lufthansa", 3.5),
                ("British_Airways", "Lufthansa", 2.5),
            ],
        ),
    ]
}
