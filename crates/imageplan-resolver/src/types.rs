use std::fmt;

use imageplan_core::{Manifest, PackageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    Unevaluated,
    EvaluatedOk,
    EvaluatedError,
    ExecutedOk,
    ExecutedError,
}

impl PlanState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unevaluated => "UNEVALUATED",
            Self::EvaluatedOk => "EVALUATED_OK",
            Self::EvaluatedError => "EVALUATED_ERROR",
            Self::ExecutedOk => "EXECUTED_OK",
            Self::ExecutedError => "EXECUTED_ERROR",
        }
    }

    pub fn is_terminal_error(self) -> bool {
        matches!(self, Self::EvaluatedError | Self::ExecutedError)
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution phases, run across every package plan before the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Preexecute,
    Execute,
    Postexecute,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Preexecute, Phase::Execute, Phase::Postexecute];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preexecute => "preexecute",
            Self::Execute => "execute",
            Self::Postexecute => "postexecute",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    DestinationProposed,
    Evaluated,
}

/// Result of asking a planner to move a package to a destination.
#[derive(Debug)]
pub enum Outcome<P> {
    AlreadySatisfied,
    Planned(P),
}

/// What [`crate::GoalSet::propose`] did with a candidate identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposeOutcome {
    AlreadyInstalled,
    Inserted,
    Upgraded { previous: PackageId },
    Unchanged { existing: PackageId },
}

/// The computed transition for one package, owned by the image plan.
#[derive(Debug)]
pub struct PackagePlanRecord<P> {
    pub(crate) id: PackageId,
    pub(crate) manifest: Manifest,
    pub(crate) status: RecordStatus,
    pub(crate) resolved_dependencies: Vec<PackageId>,
    pub(crate) plan: P,
}

impl<P> PackagePlanRecord<P> {
    pub(crate) fn new(
        id: PackageId,
        manifest: Manifest,
        resolved_dependencies: Vec<PackageId>,
        plan: P,
    ) -> Self {
        Self {
            id,
            manifest,
            status: RecordStatus::DestinationProposed,
            resolved_dependencies,
            plan,
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Dependencies that were resolved by evaluating another identifier,
    /// as opposed to being skipped as already satisfied or not required.
    pub fn resolved_dependencies(&self) -> &[PackageId] {
        &self.resolved_dependencies
    }

    pub fn plan(&self) -> &P {
        &self.plan
    }
}

impl<P: fmt::Display> fmt::Display for PackagePlanRecord<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.plan)
    }
}
