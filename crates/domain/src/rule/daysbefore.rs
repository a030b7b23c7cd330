use super::{ConcernedRow, RuleError, RuleType, ScanParams, TriggerPolicy};
use crate::booking::OptionStatus;
use crate::query::{col, lit, Expr, Join, QueryBuilder, QueryError, ValueKind};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86400;

/// Largest offset a rule may count from its date, ten years
pub const MAX_OFFSET_SECONDS: i64 = 10 * 366 * SECONDS_PER_DAY;

/// Date an offset rule counts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateField {
    Coursestarttime,
    Courseendtime,
    Bookingopeningtime,
    Bookingclosingtime,
    /// Start of every session of the option
    Optiondatestarttime,
    /// Booking time plus the option duration, per user
    Selflearningcourseenddate,
    /// Due date of an open installment, supplied by the shopping cart condition
    Installmentpayment,
}

impl DateField {
    fn option_column(self) -> Option<&'static str> {
        match self {
            DateField::Coursestarttime => Some("coursestarttime"),
            DateField::Courseendtime => Some("courseendtime"),
            DateField::Bookingopeningtime => Some("bookingopeningtime"),
            DateField::Bookingclosingtime => Some("bookingclosingtime"),
            _ => None,
        }
    }
}

/// Notifies `seconds` before (or, when negative, after) a date of the option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaysBefore {
    pub seconds: i64,
    pub datefield: DateField,
}

impl DaysBefore {
    pub const NAME: &'static str = "rule_daysbefore";

    pub(super) fn validate(&self) -> Result<(), String> {
        if self.seconds.checked_abs().map_or(true, |s| s > MAX_OFFSET_SECONDS) {
            return Err(format!(
                "`seconds` must lie within {} seconds of the date",
                MAX_OFFSET_SECONDS
            ));
        }
        Ok(())
    }
}

impl TriggerPolicy for DaysBefore {
    fn rule_type(&self) -> RuleType {
        RuleType::DaysBefore
    }

    fn begin(&self, query: &mut QueryBuilder, scan: &ScanParams) -> Result<(), RuleError> {
        query.add_predicate(
            col("bo", "status")
                .ge(lit(0))
                .and(col("bo", "status").not_eq(lit(OptionStatus::Cancelled as i64))),
        );

        if let Some(column) = self.datefield.option_column() {
            query.set_column("datefield", col("bo", column), ValueKind::Int);
            return Ok(());
        }
        match self.datefield {
            DateField::Optiondatestarttime => {
                query.add_join(Join::inner(
                    "booking_optiondates",
                    "bod",
                    col("bod", "optionid").eq(col("bo", "id")),
                ))?;
                query.push_key_part(col("bod", "id"));
                query.set_column("optiondateid", col("bod", "id"), ValueKind::Int);
                query.set_column("datefield", col("bod", "coursestarttime"), ValueKind::Int);
                query.set_column(
                    "secondstonotify",
                    col("bod", "daystonotify").mul(lit(SECONDS_PER_DAY)),
                    ValueKind::Int,
                );
                if let Some(optiondateid) = scan.optiondateid {
                    let optiondateid = query.bind_param("optiondateid", optiondateid)?;
                    query.add_predicate(col("bod", "id").eq(optiondateid));
                }
            }
            DateField::Selflearningcourseenddate => {
                query.add_predicate(col("bo", "selflearningcourse").eq(lit(1)));
            }
            _ => {}
        }
        Ok(())
    }

    fn finish(&self, query: &mut QueryBuilder, scan: &ScanParams) -> Result<(), RuleError> {
        if self.datefield == DateField::Selflearningcourseenddate {
            let user = query.user().cloned().ok_or(QueryError::MissingUser)?;
            query.add_join(Join::inner(
                "booking_answers",
                "sla",
                col("sla", "optionid")
                    .eq(col("bo", "id"))
                    .and(col("sla", "userid").eq(user))
                    .and(col("sla", "waitinglist").eq(lit(0))),
            ))?;
            query.set_column(
                "datefield",
                col("sla", "timecreated").add(col("bo", "duration")),
                ValueKind::Int,
            );
        }

        let datefield = query
            .column("datefield")
            .cloned()
            .ok_or(RuleError::MissingDateField)?;
        if scan.testmode {
            query.add_predicate(datefield.is_not_null());
            return Ok(());
        }

        let threshold = query.bind_param("threshold", scan.now - scan.tolerance)?;
        let predicate = if self.datefield == DateField::Optiondatestarttime {
            // A positive session offset replaces the rule offset
            let days = Expr::Coalesce(vec![col("bod", "daystonotify"), lit(0)]);
            let session_offset = Expr::And(vec![
                days.clone().gt(lit(0)),
                datefield
                    .clone()
                    .sub(days.clone().mul(lit(SECONDS_PER_DAY)))
                    .ge(threshold.clone()),
            ]);
            let rule_offset = Expr::And(vec![
                days.le(lit(0)),
                datefield.ge(threshold.add(lit(self.seconds))),
            ]);
            Expr::Or(vec![session_offset, rule_offset])
        } else {
            datefield.ge(threshold.add(lit(self.seconds)))
        };
        query.add_predicate(predicate);
        Ok(())
    }

    fn nextruntime(&self, row: &ConcernedRow) -> Result<i64, RuleError> {
        let offset = row
            .secondstonotify
            .filter(|seconds| *seconds > 0)
            .unwrap_or(self.seconds);
        row.datefield.checked_sub(offset).ok_or_else(|| {
            RuleError::MalformedRow(format!(
                "`datefield` {} minus {} seconds is out of range",
                row.datefield, offset
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::capabilities::StoreCapabilities;
    use crate::query::Value;

    #[test]
    fn threshold_includes_the_offset() {
        let caps = StoreCapabilities::postgres();
        let rule = days_before(86400, "coursestarttime");
        let scan = ScanParams {
            now: 10_000,
            tolerance: 3600,
            ..Default::default()
        };
        let query = rule.compose_scan(1, &scan, &caps).unwrap();
        assert_eq!(query.params.get("threshold"), Some(&Value::Int(6400)));
        let expected = col("bo", "coursestarttime")
            .ge(Expr::Param("threshold".into()).add(lit(86400)));
        assert!(query.predicates.contains(&expected));
    }

    #[test]
    fn testmode_only_needs_a_date() {
        let caps = StoreCapabilities::postgres();
        let rule = days_before(86400, "courseendtime");
        let scan = ScanParams {
            testmode: true,
            ..Default::default()
        };
        let query = rule.compose_scan(1, &scan, &caps).unwrap();
        assert!(query.params.get("threshold").is_none());
        assert!(query
            .predicates
            .contains(&col("bo", "courseendtime").is_not_null()));
    }

    #[test]
    fn self_learning_courses_end_per_user() {
        let caps = StoreCapabilities::postgres();
        let rule = days_before(0, "selflearningcourseenddate");
        let query = rule
            .compose_scan(1, &ScanParams::default(), &caps)
            .unwrap();
        assert_eq!(
            query.column("datefield").unwrap().expr,
            col("sla", "timecreated").add(col("bo", "duration"))
        );
        // The answer join must come after the user was declared
        assert_eq!(query.joins.last().unwrap().alias, "sla");
    }
}
