use std::fmt;

use imageplan_core::PackageId;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::closure::ClosureWalk;
use crate::collaborators::{InstalledState, ManifestFetcher, PackagePlan, PackagePlanner};
use crate::error::PlanError;
use crate::goals::GoalSet;
use crate::order::verify_dependency_order;
use crate::select::{CandidateSelector, HighestSuccessor};
use crate::types::{PackagePlanRecord, Phase, PlanState, ProposeOutcome};

/// Turns a set of requested packages into the package plans needed to reach
/// them, then applies those plans.
///
/// An image plan is single use: once evaluation or execution fails the plan
/// stays in the error state, and a new plan must be built to retry.
pub struct ImagePlan<'a, S, F, Q>
where
    S: InstalledState + ?Sized,
    F: ManifestFetcher<S> + ?Sized,
    Q: PackagePlanner + ?Sized,
{
    image: &'a S,
    fetcher: &'a F,
    planner: &'a Q,
    selector: Box<dyn CandidateSelector + 'a>,
    cancel: CancelToken,
    goals: GoalSet,
    pkg_plans: Vec<PackagePlanRecord<Q::Plan>>,
    state: PlanState,
}

impl<'a, S, F, Q> ImagePlan<'a, S, F, Q>
where
    S: InstalledState + ?Sized,
    F: ManifestFetcher<S> + ?Sized,
    Q: PackagePlanner + ?Sized,
{
    pub fn new(image: &'a S, fetcher: &'a F, planner: &'a Q) -> Self {
        Self {
            image,
            fetcher,
            planner,
            selector: Box::new(HighestSuccessor),
            cancel: CancelToken::new(),
            goals: GoalSet::new(),
            pkg_plans: Vec::new(),
            state: PlanState::Unevaluated,
        }
    }

    pub fn with_selector(mut self, selector: impl CandidateSelector + 'a) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn goals(&self) -> &GoalSet {
        &self.goals
    }

    pub fn package_plans(&self) -> &[PackagePlanRecord<Q::Plan>] {
        &self.pkg_plans
    }

    /// Adds `fmri` to the goal set unless the image already has it or a
    /// newer version of it.
    pub fn propose(&mut self, fmri: PackageId) -> Result<ProposeOutcome, PlanError> {
        self.require_state("propose to", PlanState::Unevaluated)?;

        let fmri = fmri.or_build_release(self.image.build_release());
        if self.image.is_installed(&fmri) {
            debug!("{} already installed; not proposing", fmri);
            return Ok(ProposeOutcome::AlreadyInstalled);
        }

        let outcome = self.goals.propose(fmri);
        debug!("goal set after proposal: {:?}", outcome);
        Ok(outcome)
    }

    pub fn propose_all<I>(&mut self, fmris: I) -> Result<(), PlanError>
    where
        I: IntoIterator<Item = PackageId>,
    {
        for fmri in fmris {
            self.propose(fmri)?;
        }
        Ok(())
    }

    pub fn is_satisfied_by_goal(&self, want: &PackageId) -> bool {
        self.goals.is_satisfied_by(want)
    }

    /// Resolves the dependency closure of every goal into package plans.
    pub fn evaluate(&mut self) -> Result<(), PlanError> {
        self.require_state("evaluate", PlanState::Unevaluated)?;

        match self.evaluate_goals() {
            Ok(()) => {
                info!("evaluated {} package plan(s)", self.pkg_plans.len());
                self.state = PlanState::EvaluatedOk;
                Ok(())
            }
            Err(err) => {
                warn!("image plan evaluation failed: {}", err);
                self.state = PlanState::EvaluatedError;
                Err(err)
            }
        }
    }

    fn evaluate_goals(&mut self) -> Result<(), PlanError> {
        {
            let mut walk = ClosureWalk::new(
                self.image,
                self.fetcher,
                self.planner,
                self.selector.as_ref(),
                &self.cancel,
                &self.goals,
                &mut self.pkg_plans,
            );
            for goal in &self.goals {
                walk.evaluate_one(goal)?;
            }
        }

        verify_dependency_order(&self.pkg_plans)
    }

    /// Applies every package plan, phase by phase: all preexecutes, then
    /// all executes, then all postexecutes.
    ///
    /// A failure before postexecute rolls back, in reverse order, every plan
    /// whose preexecute completed. Postexecute failures leave the applied
    /// changes in place.
    pub fn execute(&mut self) -> Result<(), PlanError> {
        self.require_state("execute", PlanState::EvaluatedOk)?;

        match self.run_phases() {
            Ok(()) => {
                self.state = PlanState::ExecutedOk;
                Ok(())
            }
            Err(err) => {
                warn!("image plan execution failed: {}", err);
                self.state = PlanState::ExecutedError;
                Err(err)
            }
        }
    }

    fn run_phases(&mut self) -> Result<(), PlanError> {
        let mut prepared = 0;

        for phase in Phase::ALL {
            info!("{} phase: {} package plan(s)", phase, self.pkg_plans.len());
            for index in 0..self.pkg_plans.len() {
                let result = self.run_one(index, phase);
                if let Err(err) = result {
                    if phase != Phase::Postexecute {
                        self.rollback(prepared);
                    }
                    return Err(err);
                }
                if phase == Phase::Preexecute {
                    prepared = index + 1;
                }
            }
        }

        Ok(())
    }

    fn run_one(&mut self, index: usize, phase: Phase) -> Result<(), PlanError> {
        // Postexecute runs after every mutation is applied; it is not
        // interruptible.
        if phase != Phase::Postexecute && self.cancel.is_cancelled() {
            return Err(PlanError::Cancelled {
                stage: phase.as_str(),
            });
        }

        let record = &mut self.pkg_plans[index];
        let result = match phase {
            Phase::Preexecute => record.plan.preexecute(),
            Phase::Execute => record.plan.execute(),
            Phase::Postexecute => record.plan.postexecute(),
        };
        result.map_err(|source| PlanError::Execution {
            phase,
            id: record.id.clone(),
            source,
        })
    }

    fn rollback(&mut self, prepared: usize) {
        for record in self.pkg_plans[..prepared].iter_mut().rev() {
            info!("rolling back {}", record.id);
            if let Err(err) = record.plan.rollback() {
                warn!("rollback of {} failed: {:#}", record.id, err);
            }
        }
    }

    fn require_state(&self, operation: &'static str, expected: PlanState) -> Result<(), PlanError> {
        if self.state != expected {
            return Err(PlanError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }
}

impl<S, F, Q> fmt::Display for ImagePlan<'_, S, F, Q>
where
    S: InstalledState + ?Sized,
    F: ManifestFetcher<S> + ?Sized,
    Q: PackagePlanner + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.state)?;
        if self.state == PlanState::Unevaluated {
            return write!(f, "{}", self.goals);
        }
        for record in &self.pkg_plans {
            writeln!(f, "{record}")?;
        }
        Ok(())
    }
}
