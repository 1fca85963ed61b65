//! # Direct Attribution
//!
//! `attrdir_em = Σ material emissions + Σ fuel emissions`

use super::*;
use crate::domain::entities::{AttributionUpdate, FuelInput, MaterialInput};
use crate::domain::errors::ValidationReason;
use crate::domain::invariants::invariant_attribution;
use crate::domain::value_objects::Emission;
use tracing::{debug, info};

impl<ES, EG, CS, CT, IL, TS> EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    pub(crate) async fn attribute(&self, process_id: ProcessId) -> Result<EmissionRecord, Fault> {
        self.catalog
            .get_process(process_id)
            .await
            .map_err(Fault::store("load process"))?
            .ok_or_else(|| Fault::not_found(EntityKind::Process, process_id))?;

        let materials = self
            .inputs
            .material_inputs(process_id)
            .await
            .map_err(Fault::store("load material inputs"))?;
        let fuels = self
            .inputs
            .fuel_inputs(process_id)
            .await
            .map_err(Fault::store("load fuel inputs"))?;

        if materials.is_empty() && fuels.is_empty() {
            return Err(Fault::not_found(EntityKind::Inputs, process_id));
        }

        let total_matdir = sum_emissions(process_id, materials.iter().map(MaterialInput::emission))?;
        let total_fueldir = sum_emissions(process_id, fuels.iter().map(FuelInput::emission))?;
        let attrdir_em = total_matdir
            .checked_add(total_fueldir)
            .ok_or(ValidationReason::EmissionOverflow(process_id))?;

        debug!(
            process_id = %process_id,
            materials = materials.len(),
            fuels = fuels.len(),
            %total_matdir,
            %total_fueldir,
            "Computed direct emission"
        );

        let record = self
            .emissions
            .upsert_attribution(AttributionUpdate {
                process_id,
                total_matdir_emission: total_matdir,
                total_fueldir_emission: total_fueldir,
                attrdir_em,
                calculation_date: self.time_source.now(),
            })
            .await
            .map_err(Fault::store("upsert attribution"))?;

        invariant_attribution(&record, self.config.attribution_tolerance)?;

        info!(
            process_id = %process_id,
            attrdir_em = %record.attrdir_em,
            version = record.version,
            "Attribution stored"
        );

        Ok(record)
    }
}

fn sum_emissions(
    process_id: ProcessId,
    emissions: impl Iterator<Item = Result<Emission, ValidationReason>>,
) -> Result<Emission, Fault> {
    let mut total = Emission::ZERO;
    for emission in emissions {
        total = total
            .checked_add(emission?)
            .ok_or(ValidationReason::EmissionOverflow(process_id))?;
    }
    Ok(total)
}
