//! Deployment plan model and plan-file parsing.
//!
//! Plans are TOML documents. A minimal plan:
//!
//! ```toml
//! name = "prod"
//! dns_enabled = true
//!
//! [[resource_pools]]
//! name = "small"
//! size = 4
//!
//! [[job_collections]]
//! name = "db"
//! resource_pool = "small"
//! instances = 2
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PlanResult;

/// The desired-state specification consumed by one convergence run.
///
/// Immutable for the duration of the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeploymentPlan {
    pub name: String,
    /// Whether DNS records are bound during convergence.
    #[serde(default)]
    pub dns_enabled: bool,
    #[serde(default)]
    pub resource_pools: Vec<ResourcePoolSpec>,
    #[serde(default)]
    pub job_collections: Vec<JobCollectionSpec>,
}

impl DeploymentPlan {
    /// Parse a plan from a TOML file.
    pub fn from_file(path: &Path) -> PlanResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let plan: DeploymentPlan = toml::from_str(&content)?;
        Ok(plan)
    }

    /// Look up a job collection by name.
    pub fn job_collection(&self, name: &str) -> Option<&JobCollectionSpec> {
        self.job_collections.iter().find(|j| j.name == name)
    }

    /// Look up a resource pool spec by name.
    pub fn resource_pool(&self, name: &str) -> Option<&ResourcePoolSpec> {
        self.resource_pools.iter().find(|p| p.name == name)
    }
}

/// One named group of same-role instances — the unit of dependency ordering
/// and concurrent update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobCollectionSpec {
    pub name: String,
    /// Names of other job collections that must complete before this one
    /// starts updating.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Desired instance count.
    pub instances: u32,
    /// The resource pool backing this collection's instances.
    pub resource_pool: String,
    /// Canary/batch parameters for the updater.
    #[serde(default)]
    pub update: UpdateConfig,
}

/// A named pool of allocatable VMs with a target size.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourcePoolSpec {
    pub name: String,
    /// Target membership count.
    pub size: u32,
}

/// How a job collection's instances are updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateConfig {
    /// Instances updated one at a time before the rest, as a smoke test.
    pub canaries: u32,
    /// Instances updated per batch after the canaries pass.
    pub max_in_flight: u32,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            canaries: 1,
            max_in_flight: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_plan() {
        let plan: DeploymentPlan = toml::from_str(
            r#"
            name = "prod"

            [[resource_pools]]
            name = "small"
            size = 4

            [[job_collections]]
            name = "db"
            resource_pool = "small"
            instances = 2
            "#,
        )
        .unwrap();

        assert_eq!(plan.name, "prod");
        assert!(!plan.dns_enabled);
        assert_eq!(plan.resource_pools.len(), 1);
        let db = plan.job_collection("db").unwrap();
        assert_eq!(db.instances, 2);
        assert!(db.depends_on.is_empty());
        assert_eq!(db.update, UpdateConfig::default());
    }

    #[test]
    fn parses_dependencies_and_update_config() {
        let plan: DeploymentPlan = toml::from_str(
            r#"
            name = "prod"
            dns_enabled = true

            [[resource_pools]]
            name = "small"
            size = 8

            [[job_collections]]
            name = "db"
            resource_pool = "small"
            instances = 2

            [[job_collections]]
            name = "web"
            resource_pool = "small"
            instances = 4
            depends_on = ["db"]

            [job_collections.update]
            canaries = 2
            max_in_flight = 3
            "#,
        )
        .unwrap();

        assert!(plan.dns_enabled);
        let web = plan.job_collection("web").unwrap();
        assert_eq!(web.depends_on, vec!["db".to_string()]);
        assert_eq!(web.update.canaries, 2);
        assert_eq!(web.update.max_in_flight, 3);
    }

    #[test]
    fn plan_roundtrips_through_json() {
        let plan = DeploymentPlan {
            name: "prod".to_string(),
            dns_enabled: true,
            resource_pools: vec![ResourcePoolSpec {
                name: "small".to_string(),
                size: 4,
            }],
            job_collections: vec![JobCollectionSpec {
                name: "db".to_string(),
                depends_on: vec![],
                instances: 2,
                resource_pool: "small".to_string(),
                update: UpdateConfig::default(),
            }],
        };

        let json = serde_json::to_string(&plan).unwrap();
        let back: DeploymentPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plan);
    }

    #[test]
    fn unknown_lookup_returns_none() {
        let plan: DeploymentPlan = toml::from_str(r#"name = "empty""#).unwrap();
        assert!(plan.job_collection("db").is_none());
        assert!(plan.resource_pool("small").is_none());
    }
}
