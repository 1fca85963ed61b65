//! # Reporting
//!
//! Chain summaries and product totals, read-only.

use super::*;
use crate::domain::entities::{ChainSummaryRow, ProcessEmissionBreakdown};
use crate::domain::invariants::checked_total;
use crate::domain::value_objects::Emission;
use tracing::{info, warn};

impl<ES, EG, CS, CT, IL, TS> EmissionAccountingService<ES, EG, CS, CT, IL, TS>
where
    ES: EmissionStore,
    EG: EdgeGraph,
    CS: ChainStore,
    CT: Catalog,
    IL: InputLedger,
    TS: TimeSource,
{
    pub(crate) async fn chain_summary(&self, chain_id: ChainId) -> Result<ChainSummary, Fault> {
        let chain = self
            .chains
            .get_chain(chain_id)
            .await
            .map_err(Fault::store("load chain"))?
            .ok_or_else(|| Fault::not_found(EntityKind::Chain, chain_id))?;

        let mut rows = Vec::with_capacity(chain.links.len());
        let mut direct_splits = Vec::with_capacity(chain.links.len());

        for link in chain.ordered_links() {
            let Some(process) = self
                .catalog
                .get_process(link.process_id)
                .await
                .map_err(Fault::store("load process"))?
            else {
                warn!(
                    chain_id = %chain_id,
                    process_id = %link.process_id,
                    "Chain link points at a missing process, skipping"
                );
                continue;
            };

            let record = self
                .emissions
                .get(link.process_id)
                .await
                .map_err(Fault::store("load emission record"))?;

            if let Some(record) = &record {
                direct_splits.push((
                    record.process_id,
                    record.total_matdir_emission,
                    record.total_fueldir_emission,
                ));
            }

            rows.push(ChainSummaryRow {
                sequence_order: link.sequence_order,
                process_id: link.process_id,
                process_name: process.name,
                own_emission: record.as_ref().map_or(Emission::ZERO, |r| r.attrdir_em),
                cumulative_emission: record
                    .as_ref()
                    .and_then(|r| r.cumulative_emission)
                    .unwrap_or(Emission::ZERO),
                calculation_date: record.as_ref().map(|r| r.calculation_date),
            });
        }

        let total_own_emissions =
            checked_total(rows.iter().map(|row| (row.process_id, row.own_emission)))?;
        let total_cumulative_emissions =
            checked_total(rows.iter().map(|row| (row.process_id, row.cumulative_emission)))?;
        let total_matdir_emission =
            checked_total(direct_splits.iter().map(|&(id, matdir, _)| (id, matdir)))?;
        let total_fueldir_emission =
            checked_total(direct_splits.iter().map(|&(id, _, fueldir)| (id, fueldir)))?;

        info!(chain_id = %chain_id, rows = rows.len(), "Chain summary built");

        Ok(ChainSummary {
            chain_id,
            chain_name: chain.name,
            rows,
            total_own_emissions,
            total_cumulative_emissions,
            total_matdir_emission,
            total_fueldir_emission,
        })
    }

    pub(crate) async fn product_total(
        &self,
        product_id: ProductId,
    ) -> Result<ProductEmissionTotal, Fault> {
        let product = self
            .catalog
            .get_product(product_id)
            .await
            .map_err(Fault::store("load product"))?
            .ok_or_else(|| Fault::not_found(EntityKind::Product, product_id))?;

        let mut processes = self
            .catalog
            .processes_for_product(product_id)
            .await
            .map_err(Fault::store("load product processes"))?;
        processes.sort_by_key(|process| process.id);

        let mut breakdown = Vec::with_capacity(processes.len());
        for process in processes {
            let record = self
                .emissions
                .get(process.id)
                .await
                .map_err(Fault::store("load emission record"))?;

            breakdown.push(ProcessEmissionBreakdown {
                process_id: process.id,
                process_name: process.name,
                attrdir_em: record.as_ref().map_or(Emission::ZERO, |r| r.attrdir_em),
                cumulative_emission: record.as_ref().and_then(|r| r.cumulative_emission),
                calculated: record.is_some(),
            });
        }

        let total_attrdir_emission =
            checked_total(breakdown.iter().map(|line| (line.process_id, line.attrdir_em)))?;
        let total_cumulative_emission = checked_total(
            breakdown
                .iter()
                .filter_map(|line| line.cumulative_emission.map(|amount| (line.process_id, amount))),
        )?;
        let unpropagated_processes = breakdown
            .iter()
            .filter(|line| line.cumulative_emission.is_none())
            .count();

        info!(
            product_id = %product_id,
            processes = breakdown.len(),
            %total_cumulative_emission,
            "Product total aggregated"
        );

        Ok(ProductEmissionTotal {
            product_id,
            product_name: product.name,
            process_count: breakdown.len(),
            total_attrdir_emission,
            total_cumulative_emission,
            unpropagated_processes,
            processes: breakdown,
        })
    }
}
