use std::io::Read;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::service::OccupancyManager;
use crate::domain::{Actor, NewUnit, PropertyId, Unit, UnitStatus};
use crate::store::OccupancyStore;
use crate::workflows::WorkflowError;

#[derive(Debug, Deserialize)]
struct RosterRow {
    unit_number: String,
    #[serde(default)]
    bedrooms: Option<u8>,
    #[serde(default)]
    bathrooms: Option<f32>,
    #[serde(default)]
    area_sqft: Option<u32>,
    #[serde(default)]
    rent: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub property_id: PropertyId,
    pub created: Vec<Unit>,
    pub total_units: u32,
}

impl<S> OccupancyManager<S>
where
    S: OccupancyStore + 'static,
{
    /// Create units from a CSV roster (`unit_number,bedrooms,bathrooms,area_sqft,rent`).
    ///
    /// Rows go through [`OccupancyManager::create_unit`] one by one; the first failing row stops
    /// the import and earlier rows stay committed.
    pub fn import_units<R: Read>(
        &self,
        actor: Actor,
        property_id: PropertyId,
        reader: R,
    ) -> Result<ImportSummary, WorkflowError> {
        self.property(actor, property_id)?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut created = Vec::new();

        for (index, row) in csv_reader.deserialize::<RosterRow>().enumerate() {
            let line = index + 2;
            let row = row.map_err(|err| {
                WorkflowError::Validation(format!("roster line {line}: {err}"))
            })?;
            let unit = self
                .create_unit(
                    actor,
                    NewUnit {
                        property_id,
                        unit_number: row.unit_number,
                        status: UnitStatus::Available,
                        bedrooms: row.bedrooms.unwrap_or_default(),
                        bathrooms: row.bathrooms.unwrap_or_default(),
                        area_sqft: row.area_sqft,
                        rent: row.rent.unwrap_or_default(),
                    },
                )
                .map_err(|err| match err {
                    WorkflowError::Conflict(reason) => {
                        WorkflowError::Conflict(format!("roster line {line}: {reason}"))
                    }
                    WorkflowError::Validation(reason) => {
                        WorkflowError::Validation(format!("roster line {line}: {reason}"))
                    }
                    other => other,
                })?;
            created.push(unit);
        }

        let total_units = self.property(actor, property_id)?.total_units;
        info!(%property_id, imported = created.len(), total_units, "unit roster imported");
        Ok(ImportSummary {
            property_id,
            created,
            total_units,
        })
    }
}
