//! Grouping rules: pure functions from a session to a group label.
//!
//! The aggregator only sees the `GroupingRule` trait, so new groupings can
//! be added without touching it.

use serde::{Deserialize, Serialize};

use crate::catalog::validate_label;
use crate::error::{CooccurError, CooccurResult};
use crate::session::Session;

/// Column label of a contingency table.
pub type GroupKey = String;

/// Maps a session to its group.
pub trait GroupingRule {
    /// Short name, used in logs and output file names.
    fn name(&self) -> &str;

    fn group_key(&self, session: &Session) -> GroupKey;
}

// ============================================================================
// Segment grouping
// ============================================================================

/// Groups by the session's ground-truth segment label.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentGrouping;

impl GroupingRule for SegmentGrouping {
    fn name(&self) -> &str {
        "segment"
    }

    fn group_key(&self, session: &Session) -> GroupKey {
        session.segment_id.clone()
    }
}

// ============================================================================
// Interaction-pattern grouping
// ============================================================================

/// Groups by how many entities the session visited.
#[derive(Debug, Clone, Copy, Default)]
pub struct InteractionPatternGrouping;

impl InteractionPatternGrouping {
    pub const NO_VISITS: &'static str = "no_visits";
    pub const SINGLE: &'static str = "single";
    pub const TWO: &'static str = "two";
    pub const THREE: &'static str = "three";
    pub const MULTI: &'static str = "multi";

    /// Label for a visit count.
    pub fn label_for(count: usize) -> &'static str {
        match count {
            0 => Self::NO_VISITS,
            1 => Self::SINGLE,
            2 => Self::TWO,
            3 => Self::THREE,
            _ => Self::MULTI,
        }
    }
}

impl GroupingRule for InteractionPatternGrouping {
    fn name(&self) -> &str {
        "visit_pattern"
    }

    fn group_key(&self, session: &Session) -> GroupKey {
        Self::label_for(session.visits.count()).to_string()
    }
}

// ============================================================================
// Affinity grouping
// ============================================================================

/// A named set of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubsetSpec {
    pub name: String,
    pub members: Vec<String>,
}

/// One affinity rule. A subset is "hit" when at least one of its members
/// was visited. The rule matches when every `all_of` subset is hit, at
/// least one `any_of` subset is hit (if any are listed) and no `none_of`
/// subset is hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityRuleSpec {
    pub label: String,
    #[serde(default)]
    pub all_of: Vec<String>,
    #[serde(default)]
    pub any_of: Vec<String>,
    #[serde(default)]
    pub none_of: Vec<String>,
}

/// Affinity grouping configuration: subsets, rules in priority order and
/// the fallback label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityConfig {
    pub subsets: Vec<SubsetSpec>,
    pub rules: Vec<AffinityRuleSpec>,
    pub default_label: String,
}

impl Default for AffinityConfig {
    /// UK / EU / budget carrier rules for the default airline study.
    fn default() -> Self {
        let subset = |name: &str, members: &[&str]| SubsetSpec {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        };
        let rule = |label: &str, all_of: &[&str], any_of: &[&str], none_of: &[&str]| {
            let names = |xs: &[&str]| xs.iter().map(|x| x.to_string()).collect();
            AffinityRuleSpec {
                label: label.to_string(),
                all_of: names(all_of),
                any_of: names(any_of),
                none_of: names(none_of),
            }
        };

        Self {
            subsets: vec![
                subset("uk", &["British_Airways", "Virgin_Atlantic"]),
                subset("eu", &["Lufthansa", "Air_France"]),
                subset("budget", &["Ryanair"]),
            ],
            rules: vec![
                rule("UK_focused", &["uk"], &[], &["eu", "budget"]),
                rule("EU_focused", &["eu"], &[], &["uk", "budget"]),
                rule("Budget_focused", &["budget"], &[], &["uk", "eu"]),
                rule("Pan_European", &["uk", "eu"], &[], &[]),
                rule("Mixed_Premium_Budget", &["budget"], &["uk", "eu"], &[]),
            ],
            default_label: "No_clear_preference".to_string(),
        }
    }
}

impl AffinityConfig {
    /// Resolve subsets against an ordered list of entity columns.
    pub fn resolve(&self, entity_ids: &[String]) -> CooccurResult<AffinityGrouping> {
        validate_label("affinity.default_label", &self.default_label)?;

        let mut subsets: Vec<(&str, Vec<usize>)> = Vec::with_capacity(self.subsets.len());
        for subset in &self.subsets {
            if subsets.iter().any(|(name, _)| *name == subset.name) {
                return Err(CooccurError::catalog(
                    "affinity.subsets",
                    format!("duplicate subset '{}'", subset.name),
                ));
            }
            let mut members = Vec::with_capacity(subset.members.len());
            for member in &subset.members {
                let idx = entity_ids.iter().position(|e| e == member).ok_or_else(|| {
                    CooccurError::catalog(
                        format!("affinity.subsets.{}", subset.name),
                        format!("unknown entity '{}'", member),
                    )
                })?;
                members.push(idx);
            }
            subsets.push((subset.name.as_str(), members));
        }

        let lookup = |rule: &str, name: &str| -> CooccurResult<usize> {
            subsets
                .iter()
                .position(|(n, _)| *n == name)
                .ok_or_else(|| {
                    CooccurError::catalog(
                        format!("affinity.rules.{}", rule),
                        format!("unknown subset '{}'", name),
                    )
                })
        };

        let mut rules = Vec::with_capacity(self.rules.len());
        for spec in &self.rules {
            validate_label("affinity.rules.label", &spec.label)?;
            if spec.all_of.is_empty() && spec.any_of.is_empty() {
                return Err(CooccurError::catalog(
                    format!("affinity.rules.{}", spec.label),
                    "rule must require at least one subset",
                ));
            }
            let resolve_all = |names: &[String]| {
                names
                    .iter()
                    .map(|n| lookup(&spec.label, n))
                    .collect::<CooccurResult<Vec<_>>>()
            };
            rules.push(AffinityRule {
                label: spec.label.clone(),
                all_of: resolve_all(&spec.all_of)?,
                any_of: resolve_all(&spec.any_of)?,
                none_of: resolve_all(&spec.none_of)?,
            });
        }

        Ok(AffinityGrouping {
            subsets: subsets.into_iter().map(|(_, members)| members).collect(),
            rules,
            default_label: self.default_label.clone(),
        })
    }
}

#[derive(Debug, Clone)]
struct AffinityRule {
    label: String,
    all_of: Vec<usize>,
    any_of: Vec<usize>,
    none_of: Vec<usize>,
}

impl AffinityRule {
    fn matches(&self, hits: &[bool]) -> bool {
        self.all_of.iter().all(|&s| hits[s])
            && (self.any_of.is_empty() || self.any_of.iter().any(|&s| hits[s]))
            && !self.none_of.iter().any(|&s| hits[s])
    }
}

/// Groups by the first matching affinity rule.
#[derive(Debug, Clone)]
pub struct AffinityGrouping {
    subsets: Vec<Vec<usize>>,
    rules: Vec<AffinityRule>,
    default_label: String,
}

impl GroupingRule for AffinityGrouping {
    fn name(&self) -> &str {
        "affinity"
    }

    fn group_key(&self, session: &Session) -> GroupKey {
        let hits: Vec<bool> = self
            .subsets
            .iter()
            .map(|members| members.iter().any(|&idx| session.visits.is_visited(idx)))
            .collect();

        self.rules
            .iter()
            .find(|rule| rule.matches(&hits))
            .map(|rule| rule.label.clone())
            .unwrap_or_else(|| self.default_label.clone())
    }
}
