//! The dependency index: the set of job collections still gating others.
//!
//! `PendingSet::build` collects every collection name that is the target of
//! at least one dependency edge. During the update stage a collection's name
//! leaves the set exactly once, when its update completes successfully;
//! dependents may start only once none of their declared dependencies remain.

use std::collections::HashSet;

use crate::plan::JobCollectionSpec;

/// Set of job-collection names not yet completed.
///
/// Plain data structure: mutual exclusion around `complete`/`contains_any`
/// is layered on by the coordinator's dependency gate.
#[derive(Debug, Clone, Default)]
pub struct PendingSet {
    names: HashSet<String>,
}

impl PendingSet {
    /// Build the index from the plan's job collections: every name that
    /// appears in any `depends_on` list, deduplicated.
    pub fn build(job_collections: &[JobCollectionSpec]) -> Self {
        let mut names = HashSet::new();
        for job in job_collections {
            for dep in &job.depends_on {
                names.insert(dep.clone());
            }
        }
        Self { names }
    }

    /// True if any of the given dependency names is still pending.
    pub fn contains_any(&self, deps: &[String]) -> bool {
        deps.iter().any(|d| self.names.contains(d))
    }

    /// Mark a collection completed. Returns true if it was pending.
    pub fn complete(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }
}
