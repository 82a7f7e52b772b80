mod cancel;
mod closure;
mod collaborators;
mod error;
mod goals;
mod order;
mod plan;
mod select;
mod types;

pub use cancel::CancelToken;
pub use collaborators::{ImagePolicy, InstalledState, ManifestFetcher, PackagePlan, PackagePlanner};
pub use error::PlanError;
pub use goals::GoalSet;
pub use order::verify_dependency_order;
pub use plan::ImagePlan;
pub use select::{select_highest_successor, CandidateSelector, HighestSuccessor};
pub use types::{Outcome, PackagePlanRecord, Phase, PlanState, ProposeOutcome, RecordStatus};
