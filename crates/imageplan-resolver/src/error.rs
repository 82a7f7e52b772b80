use imageplan_core::PackageId;
use thiserror::Error;

use crate::types::{Phase, PlanState};

/// Errors surfaced by [`crate::ImagePlan`].
///
/// Collaborator failures keep their original `anyhow` chain as the source.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("failed to retrieve manifest for {id}")]
    Retrieval {
        id: PackageId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to read manifest for {id}")]
    Manifest {
        id: PackageId,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to query catalog for package '{name}'")]
    Catalog {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{excluded} is excluded by {by}")]
    ConstraintExcluded { excluded: PackageId, by: PackageId },

    #[error("dependency cycle detected: {}", format_chain(.chain))]
    DependencyCycle { chain: Vec<PackageId> },

    #[error("failed to evaluate package plan for {id}")]
    PackagePlan {
        id: PackageId,
        #[source]
        source: anyhow::Error,
    },

    #[error("plan for {dependent} precedes its dependency {dependency}")]
    OrderViolation {
        dependent: PackageId,
        dependency: PackageId,
    },

    #[error("cannot {operation} an image plan in state {state}")]
    InvalidState {
        operation: &'static str,
        state: PlanState,
    },

    #[error("{phase} failed for {id}")]
    Execution {
        phase: Phase,
        id: PackageId,
        #[source]
        source: anyhow::Error,
    },

    #[error("image plan cancelled during {stage}")]
    Cancelled { stage: &'static str },
}

fn format_chain(chain: &[PackageId]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
