use super::profile::{join_profile_field, ProfileOperator};
use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::{col, QueryBuilder};
use serde::{Deserialize, Serialize};

/// Text column of the option a profile field is compared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionField {
    Text,
    Location,
    Institution,
    Address,
}

impl OptionField {
    pub fn column(self) -> &'static str {
        match self {
            OptionField::Text => "text",
            OptionField::Location => "location",
            OptionField::Institution => "institution",
            OptionField::Address => "address",
        }
    }
}

/// Concerns users whose custom profile field matches a field of the option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchUserProfileField {
    pub cpfield: String,
    pub operator: ProfileOperator,
    pub optionfield: OptionField,
}

impl MatchUserProfileField {
    pub const NAME: &'static str = "match_userprofilefield";
}

impl Condition for MatchUserProfileField {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let option_value = col(query.base_alias(), self.optionfield.column());
        let data = join_profile_field(query, &self.cpfield)?;
        query.add_predicate(self.operator.apply(data, option_value));
        concern_user(query, "u", ctx)
    }
}
