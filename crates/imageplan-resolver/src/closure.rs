use std::collections::HashMap;

use imageplan_core::{Dependency, DependencyKind, Manifest, PackageId};
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::collaborators::{
    ImagePolicy, InstalledState, ManifestFetcher, PackagePlan, PackagePlanner,
};
use crate::error::PlanError;
use crate::goals::GoalSet;
use crate::select::CandidateSelector;
use crate::types::{Outcome, PackagePlanRecord, RecordStatus};

/// Depth-first walk over manifests for one `evaluate()` call. Dependencies
/// are planned before the package that declares them.
pub(crate) struct ClosureWalk<'w, S: ?Sized, F: ?Sized, Q: PackagePlanner + ?Sized> {
    image: &'w S,
    fetcher: &'w F,
    planner: &'w Q,
    selector: &'w dyn CandidateSelector,
    cancel: &'w CancelToken,
    goals: &'w GoalSet,
    records: &'w mut Vec<PackagePlanRecord<Q::Plan>>,
    in_progress: Vec<PackageId>,
    resolved: HashMap<String, PackageId>,
}

impl<'w, S, F, Q> ClosureWalk<'w, S, F, Q>
where
    S: InstalledState + ?Sized,
    F: ManifestFetcher<S> + ?Sized,
    Q: PackagePlanner + ?Sized,
{
    pub(crate) fn new(
        image: &'w S,
        fetcher: &'w F,
        planner: &'w Q,
        selector: &'w dyn CandidateSelector,
        cancel: &'w CancelToken,
        goals: &'w GoalSet,
        records: &'w mut Vec<PackagePlanRecord<Q::Plan>>,
    ) -> Self {
        Self {
            image,
            fetcher,
            planner,
            selector,
            cancel,
            goals,
            records,
            in_progress: Vec::new(),
            resolved: HashMap::new(),
        }
    }

    /// Resolves `pfmri` and everything it requires. Returns the identifier
    /// that now stands for `pfmri`'s package, which may be a newer version
    /// resolved earlier in the same walk.
    ///
    /// When an older version of the package was already planned, the newer
    /// one is planned as a separate upgrade record after it.
    pub(crate) fn evaluate_one(&mut self, pfmri: &PackageId) -> Result<PackageId, PlanError> {
        if let Some(existing) = self.resolved.get(pfmri.name()) {
            if existing.satisfies(pfmri) {
                return Ok(existing.clone());
            }
            info!("upgrading planned {} to {}", existing, pfmri);
        }

        if let Some(start) = self.in_progress_position(pfmri) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(pfmri.clone());
            return Err(PlanError::DependencyCycle { chain });
        }

        let manifest = self.load_manifest(pfmri)?;

        self.in_progress.push(pfmri.clone());
        let dependencies = self.resolve_dependencies(pfmri, &manifest);
        self.in_progress.pop();
        let dependencies = dependencies?;

        self.resolved.insert(pfmri.name().to_string(), pfmri.clone());
        self.plan_package(pfmri, manifest, dependencies)?;
        Ok(pfmri.clone())
    }

    fn load_manifest(&self, pfmri: &PackageId) -> Result<Manifest, PlanError> {
        if !self.image.has_manifest(pfmri) {
            self.check_cancelled("manifest retrieval")?;
            debug!("manifest for {} not cached; retrieving", pfmri);
            self.fetcher
                .fetch(self.image, pfmri)
                .map_err(|source| PlanError::Retrieval {
                    id: pfmri.clone(),
                    source,
                })?;
        }

        self.image
            .manifest(pfmri)
            .map_err(|source| PlanError::Manifest {
                id: pfmri.clone(),
                source,
            })
    }

    fn resolve_dependencies(
        &mut self,
        pfmri: &PackageId,
        manifest: &Manifest,
    ) -> Result<Vec<PackageId>, PlanError> {
        let build_release = self.image.build_release().to_string();
        let policy = self.image.policy();
        let mut resolved = Vec::new();

        for dependency in &manifest.dependencies {
            let f = dependency.resolved_target(&build_release);

            if self.image.is_installed(&f) {
                continue;
            }

            if self.goals.is_satisfied_by(&f) {
                // Goal entries are planned on their own. One not yet reached
                // is planned now so it lands ahead of this package; one still
                // being walked is left alone.
                if is_required(dependency, policy) && !self.is_in_progress(&f) {
                    if let Some(goal) = self.goals.get(f.name()) {
                        let goal = goal.clone().or_build_release(&build_release);
                        resolved.push(self.evaluate_one(&goal)?);
                    }
                }
                continue;
            }

            debug!("{} not in pending transaction; checking catalog", f);

            if dependency.kind == DependencyKind::Exclude {
                return Err(PlanError::ConstraintExcluded {
                    excluded: f,
                    by: pfmri.clone(),
                });
            }
            if !is_required(dependency, policy) {
                debug!("skipping optional dependency {} of {}", f, pfmri);
                continue;
            }

            if let Some(existing) = self.resolved.get(f.name()) {
                if existing.satisfies(&f) {
                    resolved.push(existing.clone());
                    continue;
                }
            }

            self.check_cancelled("catalog query")?;
            let candidates = self
                .image
                .matching_candidates(f.name())
                .map_err(|source| PlanError::Catalog {
                    name: f.name().to_string(),
                    source,
                })?;
            let chosen = self
                .selector
                .select(&f, &candidates)
                .or_build_release(&build_release);

            debug!("adding dependency {} of {}", chosen, pfmri);
            resolved.push(self.evaluate_one(&chosen)?);
        }

        Ok(resolved)
    }

    fn plan_package(
        &mut self,
        pfmri: &PackageId,
        manifest: Manifest,
        dependencies: Vec<PackageId>,
    ) -> Result<(), PlanError> {
        let outcome = self
            .planner
            .propose_destination(pfmri, &manifest)
            .map_err(|source| PlanError::PackagePlan {
                id: pfmri.clone(),
                source,
            })?;

        let plan = match outcome {
            Outcome::AlreadySatisfied => {
                info!("{} already installed", pfmri);
                return Ok(());
            }
            Outcome::Planned(plan) => plan,
        };

        let mut record = PackagePlanRecord::new(pfmri.clone(), manifest, dependencies, plan);
        record
            .plan
            .evaluate()
            .map_err(|source| PlanError::PackagePlan {
                id: pfmri.clone(),
                source,
            })?;
        record.status = RecordStatus::Evaluated;
        self.records.push(record);
        Ok(())
    }

    fn in_progress_position(&self, id: &PackageId) -> Option<usize> {
        self.in_progress
            .iter()
            .position(|pending| pending.is_same_package(id))
    }

    fn is_in_progress(&self, id: &PackageId) -> bool {
        self.in_progress_position(id).is_some()
    }

    fn check_cancelled(&self, stage: &'static str) -> Result<(), PlanError> {
        if self.cancel.is_cancelled() {
            return Err(PlanError::Cancelled { stage });
        }
        Ok(())
    }
}

fn is_required(dependency: &Dependency, policy: ImagePolicy) -> bool {
    match dependency.kind {
        DependencyKind::Optional => policy.require_optional,
        DependencyKind::Exclude => false,
        DependencyKind::Require | DependencyKind::Incorporate => true,
    }
}
