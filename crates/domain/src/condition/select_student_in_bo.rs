use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::booking::AnswerStatus;
use crate::query::{col, Join, QueryBuilder};
use serde::{Deserialize, Serialize};

/// Role of a user answering an option, as stored in `waitinglist`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentRole {
    #[serde(rename = "0")]
    Booked,
    #[serde(rename = "1")]
    WaitingList,
    #[serde(rename = "3")]
    NotifyMeList,
    #[serde(rename = "5")]
    Deleted,
    /// Booked or on the waiting list
    #[serde(rename = "01")]
    BookedOrWaiting,
}

/// Concerns the users answering the option with a given role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectStudentInBo {
    pub borole: StudentRole,
}

impl SelectStudentInBo {
    pub const NAME: &'static str = "select_student_in_bo";
}

impl Condition for SelectStudentInBo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let option = col(query.base_alias(), "id");
        query.add_join(Join::inner(
            "booking_answers",
            "ba",
            col("ba", "optionid").eq(option),
        ))?;
        query.add_join(Join::inner("user", "u", col("u", "id").eq(col("ba", "userid"))))?;

        let status = match self.borole {
            StudentRole::Booked => AnswerStatus::Booked,
            StudentRole::WaitingList | StudentRole::BookedOrWaiting => AnswerStatus::WaitingList,
            StudentRole::NotifyMeList => AnswerStatus::NotifyMeList,
            StudentRole::Deleted => AnswerStatus::Deleted,
        };
        let status = query.bind_param("borole", status as i64)?;
        let predicate = match self.borole {
            StudentRole::BookedOrWaiting => col("ba", "waitinglist").le(status),
            _ => col("ba", "waitinglist").eq(status),
        };
        query.add_predicate(predicate);
        // Earliest answers first, they win when a user answered twice
        query.add_sort(col("ba", "timemodified"), false);
        concern_user(query, "u", ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::capabilities::StoreCapabilities;
    use crate::query::{CompareOp, Expr, Value};

    #[test]
    fn booked_or_waiting_compares_with_le() {
        let caps = StoreCapabilities::postgres();
        let condition = SelectStudentInBo {
            borole: StudentRole::BookedOrWaiting,
        };
        let query = compose(&condition, &ctx(&caps));
        assert_eq!(query.params.get("borole"), Some(&Value::Int(1)));
        assert!(query
            .predicates
            .iter()
            .any(|p| matches!(p, Expr::Compare(CompareOp::Le, _, _))));
        assert_eq!(query.sort.len(), 1);
    }

    #[test]
    fn parses_role_codes() {
        let condition: SelectStudentInBo =
            serde_json::from_str(r#"{"borole":"3"}"#).expect("Valid role");
        assert_eq!(condition.borole, StudentRole::NotifyMeList);
        assert!(serde_json::from_str::<SelectStudentInBo>(r#"{"borole":"7"}"#).is_err());
    }
}
