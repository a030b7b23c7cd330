use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::{col, Join, QueryBuilder};
use serde::{Deserialize, Serialize};

/// Concerns the booking manager of the booking instance the option belongs to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectBookingManagerInBo {}

impl SelectBookingManagerInBo {
    pub const NAME: &'static str = "select_bookingmanager_in_bo";
}

impl Condition for SelectBookingManagerInBo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let booking = col(query.base_alias(), "bookingid");
        query.add_join(Join::inner("booking", "b", col("b", "id").eq(booking)))?;
        query.add_join(Join::inner(
            "user",
            "u",
            col("u", "username").text_eq(col("b", "bookingmanager")),
        ))?;
        concern_user(query, "u", ctx)
    }
}
