use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::query::{col, Expr, Join, JoinKind, JoinSource, QueryBuilder, SPLIT_VALUE_COLUMN};
use serde::{Deserialize, Serialize};

/// Concerns the responsible contacts of the option. They are stored as a
/// comma separated id list, so the store must be able to split it into rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectResponsibleContactInBo {}

impl SelectResponsibleContactInBo {
    pub const NAME: &'static str = "select_responsiblecontact_in_bo";
}

impl Condition for SelectResponsibleContactInBo {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        if ctx.capabilities.split_strategy.is_none() {
            return Err(ConditionError::UnsupportedDatabase {
                condition: Self::NAME,
                family: ctx.capabilities.family,
            });
        }
        let contacts = col(query.base_alias(), "responsiblecontact");
        query.add_join(Join {
            kind: JoinKind::Inner,
            source: JoinSource::SplitIds(contacts),
            alias: "rc".into(),
            on: Expr::True,
        })?;
        query.add_join(Join::inner(
            "user",
            "u",
            col("u", "id").eq(col("rc", SPLIT_VALUE_COLUMN).to_int()),
        ))?;
        concern_user(query, "u", ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_utils::*;
    use super::*;
    use crate::capabilities::{DatabaseFamily, StoreCapabilities};

    #[test]
    fn fails_without_a_split_strategy() {
        let caps = StoreCapabilities::negotiate(DatabaseFamily::Other, None);
        let mut query = option_query();
        let res = SelectResponsibleContactInBo {}.execute(&mut query, &ctx(&caps));
        assert_eq!(
            res,
            Err(ConditionError::UnsupportedDatabase {
                condition: SelectResponsibleContactInBo::NAME,
                family: DatabaseFamily::Other
            })
        );
    }

    #[test]
    fn splits_the_contact_list() {
        let caps = StoreCapabilities::negotiate(DatabaseFamily::MySql, None);
        let query = compose(&SelectResponsibleContactInBo {}, &ctx(&caps));
        assert!(matches!(query.joins[0].source, JoinSource::SplitIds(_)));
    }
}
