use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::capabilities::StoreCapabilities;
use crate::payment::INSTALLMENTS_PATH;
use crate::query::{col, lit, Expr, Join, JoinKind, JoinSource, JsonColumn, QueryBuilder, ValueKind};
use crate::rule::RuleType;
use serde::{Deserialize, Serialize};

/// Concerns users with an open installment for the option. Every open
/// installment is its own concerned row, dated by its due date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectUserShoppingCart {}

impl SelectUserShoppingCart {
    pub const NAME: &'static str = "select_user_shopping_cart";
}

impl Condition for SelectUserShoppingCart {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_be_combined_with_bookingruletype(
        &self,
        rule_type: RuleType,
        capabilities: &StoreCapabilities,
    ) -> bool {
        rule_type == RuleType::DaysBefore && capabilities.json_records
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let option = col(query.base_alias(), "id");
        query.add_join(Join::inner(
            "booking_payment_history",
            "ph",
            col("ph", "optionid").eq(option),
        ))?;
        query.add_join(Join {
            kind: JoinKind::Inner,
            source: JoinSource::JsonRecords {
                document: col("ph", "json"),
                path: INSTALLMENTS_PATH.iter().map(|s| s.to_string()).collect(),
                columns: vec![
                    JsonColumn {
                        name: "duedate".into(),
                        key: "timestamp".into(),
                        kind: ValueKind::Int,
                    },
                    JsonColumn {
                        name: "paid".into(),
                        key: "paid".into(),
                        kind: ValueKind::Int,
                    },
                ],
            },
            alias: "inst".into(),
            on: Expr::True,
        })?;
        query.add_join(Join::inner("user", "u", col("u", "id").eq(col("ph", "userid"))))?;
        query.add_predicate(col("inst", "paid").eq(lit(0)));
        query.push_key_part(col("inst", "duedate"));
        query.set_column("datefield", col("inst", "duedate"), ValueKind::Int);
        concern_user(query, "u", ctx)
    }
}
