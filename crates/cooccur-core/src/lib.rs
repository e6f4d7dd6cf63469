//! Synthetic categorical interaction data for correspondence analysis.
//!
//! The crate simulates "which entity did this actor interact with"
//! sessions from per-segment preference distributions with pairwise
//! co-occurrence boosts, then cross-tabulates the sessions into
//! entity × group contingency tables.
//!
//! ## Pipeline
//!
//! ```text
//! StudyConfig ──catalogs()──► EntityCatalog + SegmentCatalog
//!                                   │
//!                      DatasetGenerator (VisitSimulator per actor)
//!                                   │
//!                            SessionTable ──► records::write_sessions
//!                                   │
//!           ContingencyAggregator + GroupingRule ──► ContingencyTable
//! ```
//!
//! The correspondence analysis itself (SVD of standardized residuals) is
//! left to downstream tools that read the written contingency tables.

pub mod catalog;
pub mod config;
pub mod contingency;
pub mod dataset;
pub mod distribution;
pub mod error;
pub mod grouping;
pub mod records;
pub mod session;
pub mod simulator;

pub use catalog::{Entity, EntityCatalog, EntitySpec, Segment, SegmentCatalog, SegmentSpec};
pub use crate::config::{StudyCatalogs, StudyConfig};
pub use contingency::{ContingencyAggregator, ContingencyTable, QualityConfig, QualityWarning};
pub use dataset::{DatasetGenerator, DatasetStats, GenerationConfig, InteractionDataset};
pub use distribution::DiscreteDistribution;
pub use error::{CooccurError, CooccurResult};
pub use grouping::{
    AffinityConfig, AffinityGrouping, GroupKey, GroupingRule, InteractionPatternGrouping,
    SegmentGrouping,
};
pub use session::{Session, SessionTable, VisitVector};
pub use simulator::{VisitDraw, VisitSimulator};
