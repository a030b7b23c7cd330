use super::{ConcernedRow, RuleError, RuleType, ScanParams, TriggerPolicy};
use crate::event::BookingEventName;
use crate::query::{QueryBuilder, ValueKind};
use serde::{Deserialize, Serialize};

/// Notifies right away when a booking event occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReactOnEvent {
    pub boevent: BookingEventName,
}

impl ReactOnEvent {
    pub const NAME: &'static str = "rule_react_on_event";
}

impl TriggerPolicy for ReactOnEvent {
    fn rule_type(&self) -> RuleType {
        RuleType::ReactOnEvent
    }

    /// Cancelled options are kept, cancelling is itself an event to react on
    fn begin(&self, query: &mut QueryBuilder, scan: &ScanParams) -> Result<(), RuleError> {
        if scan.optionid.is_none() {
            return Err(RuleError::MissingOption);
        }
        let now = query.bind_param("now", scan.now)?;
        query.set_column("datefield", now, ValueKind::Int);
        Ok(())
    }

    fn finish(&self, _query: &mut QueryBuilder, _scan: &ScanParams) -> Result<(), RuleError> {
        Ok(())
    }

    fn nextruntime(&self, row: &ConcernedRow) -> Result<i64, RuleError> {
        Ok(row.datefield)
    }

    /// The run time is the moment of the event and can not be recomputed,
    /// so the rule applies as long as the condition still selects the user.
    fn still_applies(&self, rows: &[ConcernedRow], _nextruntime: i64) -> bool {
        !rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::super::RuleDefinition;
    use super::*;
    use crate::capabilities::StoreCapabilities;
    use crate::query::Value;
    use serde_json::json;

    fn rule() -> RuleDefinition {
        RuleDefinition::from_json(&payload(
            json!({ "boevent": "bookingoption_booked" }),
            "select_teacher_in_bo",
            json!({}),
        ))
        .expect("Valid rule")
    }

    #[test]
    fn needs_the_option_of_the_event() {
        let caps = StoreCapabilities::postgres();
        assert_eq!(
            rule().compose_scan(1, &ScanParams::default(), &caps),
            Err(RuleError::MissingOption)
        );
    }

    #[test]
    fn runs_now() {
        let caps = StoreCapabilities::postgres();
        let scan = ScanParams {
            optionid: Some(4),
            now: 500,
            ..Default::default()
        };
        let query = rule().compose_scan(1, &scan, &caps).unwrap();
        assert_eq!(query.params.get("now"), Some(&Value::Int(500)));
        assert!(query.predicates.iter().all(|p| !p.params().contains(&"threshold")));
    }
}
