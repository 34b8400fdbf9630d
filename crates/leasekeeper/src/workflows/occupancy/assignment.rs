use serde::Serialize;

use super::service::{require_landlord, OccupancyManager};
use crate::domain::{Actor, PropertyId, UnitId, UnitStatus};
use crate::store::OccupancyStore;
use crate::workflows::WorkflowError;

/// A choice offered when assigning a tenant. `EntireProperty` is synthesised on read for
/// properties without unit rows and never written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssignmentOption {
    Unit { unit_id: UnitId, unit_number: String },
    EntireProperty { property_id: PropertyId, label: String },
}

impl<S> OccupancyManager<S>
where
    S: OccupancyStore + 'static,
{
    pub fn assignment_options(
        &self,
        actor: Actor,
        property_id: PropertyId,
    ) -> Result<Vec<AssignmentOption>, WorkflowError> {
        let landlord = require_landlord(actor)?;
        let property = self.owned_property(landlord, property_id)?;
        let units = self.store().units_for_property(property_id)?;

        if units.is_empty() {
            return Ok(vec![AssignmentOption::EntireProperty {
                property_id,
                label: format!("Entire property ({})", property.name),
            }]);
        }

        let mut options: Vec<AssignmentOption> = units
            .into_iter()
            .filter(|unit| unit.status == UnitStatus::Available)
            .map(|unit| AssignmentOption::Unit {
                unit_id: unit.id,
                unit_number: unit.unit_number,
            })
            .collect();
        options.sort_by(|a, b| match (a, b) {
            (
                AssignmentOption::Unit { unit_number: a, .. },
                AssignmentOption::Unit { unit_number: b, .. },
            ) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        });
        Ok(options)
    }
}
