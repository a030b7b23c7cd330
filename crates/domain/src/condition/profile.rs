use super::ConditionError;
use crate::query::{col, Expr, Join, QueryBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileOperator {
    #[serde(rename = "=")]
    Equals,
    /// Case insensitive containment
    #[serde(rename = "~")]
    Contains,
    #[serde(rename = "!=")]
    NotEquals,
    #[serde(rename = "!~")]
    NotContains,
}

impl ProfileOperator {
    pub fn apply(self, data: Expr, value: Expr) -> Expr {
        match self {
            ProfileOperator::Equals => data.text_eq(value),
            ProfileOperator::Contains => data.contains(value),
            ProfileOperator::NotEquals => data.text_eq(value).negate(),
            ProfileOperator::NotContains => data.contains(value).negate(),
        }
    }
}

/// Joins the value of the custom profile field `cpfield` and its user
/// (alias `u`). Returns the expression holding the field value.
pub(super) fn join_profile_field(
    query: &mut QueryBuilder,
    cpfield: &str,
) -> Result<Expr, ConditionError> {
    let shortname = query.bind_param("cpfield", cpfield)?;
    query.add_join(Join::inner(
        "user_info_field",
        "uif",
        col("uif", "shortname").text_eq(shortname),
    ))?;
    query.add_join(Join::inner(
        "user_info_data",
        "ud",
        col("ud", "fieldid").eq(col("uif", "id")),
    ))?;
    query.add_join(Join::inner("user", "u", col("u", "id").eq(col("ud", "userid"))))?;
    Ok(col("ud", "data"))
}
