//! Convergence errors.

use thiserror::Error;

/// Result type alias for convergence operations.
pub type ConvergeResult<T> = Result<T, ConvergeError>;

/// One failed job collection within a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionFailure {
    pub name: String,
    pub reason: String,
}

/// Errors that abort or fail a convergence run.
#[derive(Debug, Error)]
pub enum ConvergeError {
    /// Malformed dependency graph or plan structure; raised before any
    /// cloud, pool, or updater call.
    #[error(transparent)]
    Plan(#[from] drift_plan::PlanError),

    /// Resource pool update/refill failed. An `update` failure aborts the
    /// run before any job-collection worker starts; a `refill` failure
    /// leaves applied job updates intact and is reported as-is.
    #[error(transparent)]
    Pool(#[from] drift_pool::PoolError),

    /// A delegated binding/deletion step failed.
    #[error("{op} failed: {source}")]
    Assembler {
        op: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A cancellation request was honored at a checkpoint.
    #[error("convergence cancelled")]
    Cancelled,

    /// One or more job collections failed; collections depending on them
    /// never started and are listed as blocked.
    #[error("{}", format_failures(.failed, .blocked))]
    CollectionsFailed {
        failed: Vec<CollectionFailure>,
        blocked: Vec<String>,
    },
}

fn format_failures(failed: &[CollectionFailure], blocked: &[String]) -> String {
    let names: Vec<&str> = failed.iter().map(|f| f.name.as_str()).collect();
    let mut msg = format!(
        "{} job collection(s) failed: {}",
        failed.len(),
        names.join(", ")
    );
    if !blocked.is_empty() {
        msg.push_str(&format!("; blocked and never started: {}", blocked.join(", ")));
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_message_lists_failed_and_blocked() {
        let err = ConvergeError::CollectionsFailed {
            failed: vec![CollectionFailure {
                name: "a".to_string(),
                reason: "boom".to_string(),
            }],
            blocked: vec!["b".to_string(), "c".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "1 job collection(s) failed: a; blocked and never started: b, c"
        );
    }

    #[test]
    fn composite_message_without_blocked() {
        let err = ConvergeError::CollectionsFailed {
            failed: vec![
                CollectionFailure {
                    name: "a".to_string(),
                    reason: "boom".to_string(),
                },
                CollectionFailure {
                    name: "b".to_string(),
                    reason: "bang".to_string(),
                },
            ],
            blocked: vec![],
        };
        assert_eq!(err.to_string(), "2 job collection(s) failed: a, b");
    }
}
