use super::{concern_user, Condition, ConditionContext, ConditionError};
use crate::capabilities::StoreCapabilities;
use crate::query::{col, Join, QueryBuilder};
use crate::rule::RuleType;
use serde::{Deserialize, Serialize};

/// Which user of the triggering event is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventUserSource {
    /// The user who triggered the event
    Userid,
    /// The user affected by the event
    Relateduserid,
}

/// Concerns a user named by the event that triggered the rule.
/// Only event driven rules have such an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectUserFromEvent {
    pub userfromeventtype: EventUserSource,
}

impl SelectUserFromEvent {
    pub const NAME: &'static str = "select_user_from_event";
}

impl Condition for SelectUserFromEvent {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn can_be_combined_with_bookingruletype(
        &self,
        rule_type: RuleType,
        _capabilities: &StoreCapabilities,
    ) -> bool {
        rule_type == RuleType::ReactOnEvent
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError> {
        let event = ctx.event.ok_or(ConditionError::MissingEvent(Self::NAME))?;
        let userid = match self.userfromeventtype {
            EventUserSource::Userid => event.userid,
            EventUserSource::Relateduserid => event
                .relateduserid
                .ok_or(ConditionError::EventUserMissing("relateduserid"))?,
        };
        let userid = query.bind_param("eventuserid", userid)?;
        query.add_join(Join::inner("user", "u", col("u", "id").eq(userid)))?;
        concern_user(query, "u", ctx)
    }
}
