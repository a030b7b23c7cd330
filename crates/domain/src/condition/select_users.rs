use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::{col, Expr, Join, QueryBuilder};
use serde::{Deserialize, Serialize};

/// Concerns an explicit list of users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectUsers {
    pub userids: Vec<i64>,
}

impl SelectUsers {
    pub const NAME: &'static str = "select_users";
}

impl Condition for SelectUsers {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        query.add_join(Join::inner("user", "u", Expr::True))?;
        let userids = self
            .userids
            .iter()
            .map(|id| query.bind_param("userids", *id))
            .collect::<Result<Vec<_>, _>>()?;
        query.add_predicate(col("u", "id").in_list(userids));
        concern_user(query, "u", ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::capabilities::StoreCapabilities;
    use crate::query::Value;

    #[test]
    fn binds_every_listed_user() {
        let caps = StoreCapabilities::postgres();
        let condition = SelectUsers {
            userids: vec![3, 4],
        };
        let query = compose(&condition, &ctx(&caps));
        assert_eq!(query.params.get("userids"), Some(&Value::Int(3)));
        assert_eq!(query.params.get("userids2"), Some(&Value::Int(4)));
        assert_eq!(query.joins[0].alias, "u");
    }
}
