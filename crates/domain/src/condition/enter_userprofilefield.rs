use super::profile::{join_profile_field, ProfileOperator};
use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::QueryBuilder;
use serde::{Deserialize, Serialize};

/// Concerns users whose custom profile field matches an entered text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnterUserProfileField {
    pub cpfield: String,
    pub operator: ProfileOperator,
    pub textfield: String,
}

impl EnterUserProfileField {
    pub const NAME: &'static str = "enter_userprofilefield";
}

impl Condition for EnterUserProfileField {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let data = join_profile_field(query, &self.cpfield)?;
        let text = query.bind_param("textfield", self.textfield.as_str())?;
        query.add_predicate(self.operator.apply(data, text));
        concern_user(query, "u", ctx)
    }
}
