//! Plan errors.

use thiserror::Error;

/// Result type alias for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors raised while parsing or validating a deployment plan.
///
/// All variants are fatal to a convergence run and are raised before any
/// cloud, pool, or updater call is made.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to read plan file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse plan file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate job collection name: {0}")]
    DuplicateCollection(String),

    #[error("duplicate resource pool name: {0}")]
    DuplicatePool(String),

    #[error("job collection '{collection}' depends on unknown collection '{dependency}'")]
    UnknownDependency {
        collection: String,
        dependency: String,
    },

    #[error("job collection '{0}' depends on itself")]
    SelfDependency(String),

    #[error("job collection '{collection}' references unknown resource pool '{pool}'")]
    UnknownResourcePool { collection: String, pool: String },

    #[error("dependency cycle among job collections: {}", .0.join(", "))]
    DependencyCycle(Vec<String>),
}
