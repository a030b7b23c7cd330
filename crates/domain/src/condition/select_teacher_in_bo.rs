use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::{col, Join, QueryBuilder};
use serde::{Deserialize, Serialize};

/// Concerns the teachers of the option
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectTeacherInBo {}

impl SelectTeacherInBo {
    pub const NAME: &'static str = "select_teacher_in_bo";
}

impl Condition for SelectTeacherInBo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let option = col(query.base_alias(), "id");
        query.add_join(Join::inner(
            "booking_teachers",
            "bt",
            col("bt", "optionid").eq(option),
        ))?;
        query.add_join(Join::inner("user", "u", col("u", "id").eq(col("bt", "userid"))))?;
        concern_user(query, "u", ctx)
    }
}
