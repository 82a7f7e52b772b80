use std::collections::HashMap;

use imageplan_core::PackageId;

use crate::error::PlanError;
use crate::types::PackagePlanRecord;

/// Checks that every dependency a record was resolved against is planned
/// before that record, when it is planned at all. Dependencies are matched by
/// exact identifier, so an upgrade record planned later does not count
/// against dependents of the version it replaces.
pub fn verify_dependency_order<P>(records: &[PackagePlanRecord<P>]) -> Result<(), PlanError> {
    let positions: HashMap<&PackageId, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.id(), index))
        .collect();

    for (index, record) in records.iter().enumerate() {
        for dependency in record.resolved_dependencies() {
            let Some(&position) = positions.get(dependency) else {
                continue;
            };
            if position > index {
                return Err(PlanError::OrderViolation {
                    dependent: record.id().clone(),
                    dependency: records[position].id().clone(),
                });
            }
        }
    }

    Ok(())
}
