//! Structural plan validation.
//!
//! The dependency gate cannot detect a cycle at runtime — a cyclic plan
//! would simply never settle — so acyclicity is checked up front, before any
//! cloud, pool, or updater call. Validation also rejects the malformed-edge
//! cases: unknown dependency names, self-dependencies, duplicate collection
//! or pool names, and references to undeclared resource pools.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{PlanError, PlanResult};
use crate::plan::DeploymentPlan;

/// Validate a deployment plan. Returns the first structural problem found.
pub fn validate(plan: &DeploymentPlan) -> PlanResult<()> {
    let mut pool_names = HashSet::new();
    for pool in &plan.resource_pools {
        if !pool_names.insert(pool.name.as_str()) {
            return Err(PlanError::DuplicatePool(pool.name.clone()));
        }
    }

    let mut collection_names = HashSet::new();
    for job in &plan.job_collections {
        if !collection_names.insert(job.name.as_str()) {
            return Err(PlanError::DuplicateCollection(job.name.clone()));
        }
    }

    for job in &plan.job_collections {
        if !pool_names.contains(job.resource_pool.as_str()) {
            return Err(PlanError::UnknownResourcePool {
                collection: job.name.clone(),
                pool: job.resource_pool.clone(),
            });
        }
        for dep in &job.depends_on {
            if dep == &job.name {
                return Err(PlanError::SelfDependency(job.name.clone()));
            }
            if !collection_names.contains(dep.as_str()) {
                return Err(PlanError::UnknownDependency {
                    collection: job.name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }

    check_acyclic(plan)
}

/// Kahn's algorithm over the dependency edges. Any name left unprocessed
/// sits on a cycle (or depends on one) and is reported.
fn check_acyclic(plan: &DeploymentPlan) -> PlanResult<()> {
    // in-degree = number of unmet dependencies; edges point dep -> dependent.
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for job in &plan.job_collections {
        in_degree.entry(job.name.as_str()).or_insert(0);
        for dep in &job.depends_on {
            *in_degree.entry(job.name.as_str()).or_insert(0) += 1;
            dependents
                .entry(dep.as_str())
                .or_default()
                .push(job.name.as_str());
        }
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();

    let mut processed = 0;
    while let Some(name) = ready.pop_front() {
        processed += 1;
        for dependent in dependents.get(name).into_iter().flatten() {
            if let Some(d) = in_degree.get_mut(dependent) {
                *d -= 1;
                if *d == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    if processed == plan.job_collections.len() {
        Ok(())
    } else {
        let mut stuck: Vec<String> = in_degree
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(n, _)| n.to_string())
            .collect();
        stuck.sort();
        Err(PlanError::DependencyCycle(stuck))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{JobCollectionSpec, ResourcePoolSpec, UpdateConfig};

    fn job(name: &str, deps: &[&str]) -> JobCollectionSpec {
        JobCollectionSpec {
            name: name.to_string(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            instances: 1,
            resource_pool: "small".to_string(),
            update: UpdateConfig::default(),
        }
    }

    fn plan(jobs: Vec<JobCollectionSpec>) -> DeploymentPlan {
        DeploymentPlan {
            name: "test".to_string(),
            dns_enabled: false,
            resource_pools: vec![ResourcePoolSpec {
                name: "small".to_string(),
                size: 8,
            }],
            job_collections: jobs,
        }
    }

    #[test]
    fn accepts_acyclic_plan() {
        let p = plan(vec![
            job("db", &[]),
            job("cache", &[]),
            job("web", &["db", "cache"]),
        ]);
        assert!(validate(&p).is_ok());
    }

    #[test]
    fn accepts_plan_with_no_edges() {
        let p = plan(vec![job("a", &[]), job("b", &[])]);
        assert!(validate(&p).is_ok());
    }

    #[test]
    fn rejects_two_node_cycle() {
        let p = plan(vec![job("a", &["b"]), job("b", &["a"])]);
        match validate(&p) {
            Err(PlanError::DependencyCycle(names)) => {
                assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_longer_cycle_behind_valid_prefix() {
        let p = plan(vec![
            job("db", &[]),
            job("a", &["db", "c"]),
            job("b", &["a"]),
            job("c", &["b"]),
        ]);
        match validate(&p) {
            Err(PlanError::DependencyCycle(names)) => {
                assert_eq!(names, vec!["a", "b", "c"]);
            }
            other => panic!("expected DependencyCycle, got {other:?}"),
        }
    }

    #[test]
    fn rejects_self_dependency() {
        let p = plan(vec![job("a", &["a"])]);
        assert!(matches!(validate(&p), Err(PlanError::SelfDependency(n)) if n == "a"));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let p = plan(vec![job("a", &["ghost"])]);
        match validate(&p) {
            Err(PlanError::UnknownDependency {
                collection,
                dependency,
            }) => {
                assert_eq!(collection, "a");
                assert_eq!(dependency, "ghost");
            }
            other => panic!("expected UnknownDependency, got {other:?}"),
        }
    }

    #[test]
    fn rejects_duplicate_collection() {
        let p = plan(vec![job("a", &[]), job("a", &[])]);
        assert!(matches!(
            validate(&p),
            Err(PlanError::DuplicateCollection(n)) if n == "a"
        ));
    }

    #[test]
    fn rejects_duplicate_pool() {
        let mut p = plan(vec![job("a", &[])]);
        p.resource_pools.push(ResourcePoolSpec {
            name: "small".to_string(),
            size: 2,
        });
        assert!(matches!(
            validate(&p),
            Err(PlanError::DuplicatePool(n)) if n == "small"
        ));
    }

    #[test]
    fn rejects_unknown_resource_pool() {
        let mut bad = job("a", &[]);
        bad.resource_pool = "huge".to_string();
        let p = plan(vec![bad]);
        match validate(&p) {
            Err(PlanError::UnknownResourcePool { collection, pool }) => {
                assert_eq!(collection, "a");
                assert_eq!(pool, "huge");
            }
            other => panic!("expected UnknownResourcePool, got {other:?}"),
        }
    }
}
