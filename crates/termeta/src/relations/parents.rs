//! Cross-taxonomy parent expansion.
//!
//! A term matched in text also credits its parent, the parent's parent and so
//! on, each under the label of its own taxonomy. The walk is iterative and
//! bounded: a term id is never expanded twice and at most
//! `max_parent_depth` parents are followed. Broken links truncate the walk
//! instead of failing it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use termeta_core::{Error, MatchTable, Result, Term, TermId};

use super::TermRelationshipEngine;

/// Why a parent walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionStop {
    /// The last term has no parent link.
    Root,
    /// A parent term or its taxonomy could not be resolved.
    Unresolved,
    /// A stored parent link is not a term id.
    Malformed,
    /// A parent link points back at a term already on the path.
    Cycle,
    /// The maximum depth was reached with parents remaining.
    DepthLimit,
}

impl ExpansionStop {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpansionStop::Root => "root",
            ExpansionStop::Unresolved => "unresolved",
            ExpansionStop::Malformed => "malformed",
            ExpansionStop::Cycle => "cycle",
            ExpansionStop::DepthLimit => "depth_limit",
        }
    }

    /// Whether the walk ended before reaching a root term.
    pub fn is_truncated(&self) -> bool {
        !matches!(self, ExpansionStop::Root)
    }
}

impl std::fmt::Display for ExpansionStop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of a parent walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentExpansion {
    pub matches: MatchTable,
    /// Number of parents appended.
    pub depth: usize,
    pub stop: ExpansionStop,
}

impl TermRelationshipEngine {
    /// Append every ancestor of `term` to `matches`.
    ///
    /// Truncated walks keep what they collected; see [`walk_parents`](Self::walk_parents)
    /// to observe why a walk ended.
    pub async fn expand_parent_matches(&self, matches: MatchTable, term: &Term) -> Result<MatchTable> {
        Ok(self.walk_parents(matches, term).await?.matches)
    }

    /// Follow parent links from `term`, appending each parent's id under its
    /// taxonomy label.
    ///
    /// Only metadata store failures are returned as errors.
    #[instrument(
        skip(self, matches, term),
        fields(subsystem = "relations", component = "engine", op = "walk_parents", term_id = term.term_id)
    )]
    pub async fn walk_parents(&self, mut matches: MatchTable, term: &Term) -> Result<ParentExpansion> {
        let max_depth = self.config.max_parent_depth;
        let mut visited: HashSet<TermId> = HashSet::from([term.term_id]);
        let mut current = term.term_id;
        let mut depth = 0;

        let stop = loop {
            let relations = match self.relations(current).await {
                Ok(relations) => relations,
                Err(Error::InvalidInput(reason)) => {
                    warn!(
                        subsystem = "relations",
                        component = "engine",
                        term_id = current,
                        depth,
                        error = %reason,
                        "Malformed parent link, truncating expansion"
                    );
                    break ExpansionStop::Malformed;
                }
                Err(e) => return Err(e),
            };

            let Some(link) = relations.parent else {
                break ExpansionStop::Root;
            };

            if depth >= max_depth {
                warn!(
                    subsystem = "relations",
                    component = "engine",
                    term_id = current,
                    depth,
                    "Parent depth limit reached, truncating expansion"
                );
                break ExpansionStop::DepthLimit;
            }

            let parent = match self.registry.get_term(link.term_id, &link.taxonomy).await {
                Ok(Some(parent)) => parent,
                Ok(None) => {
                    warn!(
                        subsystem = "relations",
                        component = "engine",
                        term_id = current,
                        taxonomy = %link.taxonomy,
                        parent_id = link.term_id,
                        "Parent term not found, truncating expansion"
                    );
                    break ExpansionStop::Unresolved;
                }
                Err(e) => {
                    warn!(
                        subsystem = "relations",
                        component = "engine",
                        term_id = current,
                        taxonomy = %link.taxonomy,
                        parent_id = link.term_id,
                        error = %e,
                        "Parent term lookup failed, truncating expansion"
                    );
                    break ExpansionStop::Unresolved;
                }
            };

            if !visited.insert(parent.term_id) {
                warn!(
                    subsystem = "relations",
                    component = "engine",
                    term_id = current,
                    parent_id = parent.term_id,
                    depth,
                    "Cyclic parent link, truncating expansion"
                );
                break ExpansionStop::Cycle;
            }

            let label = match self.registry.get_taxonomy(&parent.taxonomy).await {
                Ok(Some(taxonomy)) => taxonomy.label,
                Ok(None) | Err(_) => {
                    warn!(
                        subsystem = "relations",
                        component = "engine",
                        term_id = current,
                        taxonomy = %parent.taxonomy,
                        "Parent taxonomy not registered, truncating expansion"
                    );
                    break ExpansionStop::Unresolved;
                }
            };

            matches.record(label, parent.term_id);
            depth += 1;
            trace!(
                subsystem = "relations",
                component = "engine",
                term_id = parent.term_id,
                taxonomy = %parent.taxonomy,
                depth,
                "Parent matched"
            );
            current = parent.term_id;
        };

        debug!(
            subsystem = "relations",
            component = "engine",
            term_id = term.term_id,
            depth,
            stop_reason = %stop,
            result_count = matches.match_count(),
            "Parent expansion finished"
        );

        Ok(ParentExpansion {
            matches,
            depth,
            stop,
        })
    }
}
