pub mod check_rule_still_applies;
pub mod delete_rule;
pub mod execute_rule;
pub mod run_rules;
pub mod save_rule;
mod subscribers;

use booking_rules_domain::{ConcernedRow, RuleDefinition, RuleError, ScanParams};
use booking_rules_infra::BookingRulesContext;
use std::convert::TryFrom;

#[derive(Debug)]
pub enum ScanError {
    InvalidRule(RuleError),
    StorageError(anyhow::Error),
}

impl From<RuleError> for ScanError {
    fn from(e: RuleError) -> Self {
        Self::InvalidRule(e)
    }
}

/// Composes the query of the rule for the given scan and fetches the
/// concerned rows from the store
pub(crate) async fn scan_concerned_rows(
    definition: &RuleDefinition,
    contextid: i64,
    scan: &ScanParams<'_>,
    ctx: &BookingRulesContext,
) -> Result<Vec<ConcernedRow>, ScanError> {
    let query = definition.compose_scan(contextid, scan, &ctx.store.capabilities())?;
    let rows = ctx
        .store
        .fetch_rows(&query)
        .await
        .map_err(ScanError::StorageError)?;
    let rows = rows
        .into_iter()
        .map(ConcernedRow::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
