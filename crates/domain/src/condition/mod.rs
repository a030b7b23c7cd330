mod enter_userprofilefield;
mod match_userprofilefield;
mod profile;
mod select_bookingmanager_in_bo;
mod select_responsiblecontact_in_bo;
mod select_student_in_bo;
mod select_teacher_in_bo;
mod select_user_from_event;
mod select_user_shopping_cart;
mod select_users;

pub use enter_userprofilefield::EnterUserProfileField;
pub use match_userprofilefield::{MatchUserProfileField, OptionField};
pub use profile::ProfileOperator;
pub use select_bookingmanager_in_bo::SelectBookingManagerInBo;
pub use select_responsiblecontact_in_bo::SelectResponsibleContactInBo;
pub use select_student_in_bo::{SelectStudentInBo, StudentRole};
pub use select_teacher_in_bo::SelectTeacherInBo;
pub use select_user_from_event::{EventUserSource, SelectUserFromEvent};
pub use select_user_shopping_cart::SelectUserShoppingCart;
pub use select_users::SelectUsers;

use crate::capabilities::{DatabaseFamily, StoreCapabilities};
use crate::event::BookingEvent;
use crate::query::{col, lit, QueryBuilder, QueryError};
use crate::rule::{RuleError, RuleType};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConditionError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("Condition `{condition}` is not supported by {family} databases")]
    UnsupportedDatabase {
        condition: &'static str,
        family: DatabaseFamily,
    },
    #[error("Condition `{0}` needs the event that triggered the rule")]
    MissingEvent(&'static str),
    #[error("The triggering event carries no `{0}`")]
    EventUserMissing(&'static str),
}

/// Everything a condition may consult while extending a query
#[derive(Debug, Clone, Copy)]
pub struct ConditionContext<'a> {
    pub rule_type: RuleType,
    /// Restricts the concerned users to this user
    pub userid: Option<i64>,
    pub event: Option<&'a BookingEvent>,
    pub capabilities: &'a StoreCapabilities,
}

/// Selects the users concerned by a rule.
///
/// `execute` must declare the user through `QueryBuilder::set_user` (which
/// also completes the uniqueness key), add the joins and predicates
/// identifying the users and, when `ctx.userid` is set, restrict the result
/// to that user on its own user alias.
pub trait Condition: Debug {
    fn name(&self) -> &'static str;

    fn can_be_combined_with_bookingruletype(
        &self,
        _rule_type: RuleType,
        _capabilities: &StoreCapabilities,
    ) -> bool {
        true
    }

    fn execute(&self, query: &mut QueryBuilder, ctx: &ConditionContext) -> Result<(), ConditionError>;
}

/// Declares the user of `user_alias` as the concerned user
pub(crate) fn concern_user(
    query: &mut QueryBuilder,
    user_alias: &str,
    ctx: &ConditionContext,
) -> Result<(), ConditionError> {
    query.set_user(col(user_alias, "id"));
    query.add_predicate(col(user_alias, "deleted").eq(lit(0)));
    if let Some(userid) = ctx.userid {
        let userid = query.bind_param("userid", userid)?;
        query.add_predicate(col(user_alias, "id").eq(userid));
    }
    Ok(())
}

/// The registered conditions, one variant per stable condition name
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionConfig {
    SelectUsers(SelectUsers),
    SelectStudentInBo(SelectStudentInBo),
    SelectTeacherInBo(SelectTeacherInBo),
    SelectBookingManagerInBo(SelectBookingManagerInBo),
    SelectResponsibleContactInBo(SelectResponsibleContactInBo),
    SelectUserFromEvent(SelectUserFromEvent),
    MatchUserProfileField(MatchUserProfileField),
    EnterUserProfileField(EnterUserProfileField),
    SelectUserShoppingCart(SelectUserShoppingCart),
}

fn parse<T: DeserializeOwned>(
    name: &str,
    data: serde_json::Value,
) -> Result<T, RuleError> {
    serde_json::from_value(data).map_err(|e| RuleError::InvalidConfiguration {
        variant: name.to_string(),
        reason: e.to_string(),
    })
}

fn to_data<T: Serialize>(config: &T) -> serde_json::Value {
    serde_json::to_value(config).unwrap_or(serde_json::Value::Null)
}

impl ConditionConfig {
    /// Resolves a condition by its stable name and configures it from its
    /// json slice. Unknown names and incomplete configurations are errors.
    pub fn from_parts(name: &str, data: serde_json::Value) -> Result<Self, RuleError> {
        let config = match name {
            SelectUsers::NAME => Self::SelectUsers(parse(name, data)?),
            SelectStudentInBo::NAME => Self::SelectStudentInBo(parse(name, data)?),
            SelectTeacherInBo::NAME => Self::SelectTeacherInBo(parse(name, data)?),
            SelectBookingManagerInBo::NAME => Self::SelectBookingManagerInBo(parse(name, data)?),
            SelectResponsibleContactInBo::NAME => {
                Self::SelectResponsibleContactInBo(parse(name, data)?)
            }
            SelectUserFromEvent::NAME => Self::SelectUserFromEvent(parse(name, data)?),
            MatchUserProfileField::NAME => Self::MatchUserProfileField(parse(name, data)?),
            EnterUserProfileField::NAME => Self::EnterUserProfileField(parse(name, data)?),
            SelectUserShoppingCart::NAME => Self::SelectUserShoppingCart(parse(name, data)?),
            unknown => return Err(RuleError::UnknownCondition(unknown.to_string())),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RuleError> {
        let invalid = |reason: &str| RuleError::InvalidConfiguration {
            variant: self.condition().name().to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::SelectUsers(c) if c.userids.is_empty() => Err(invalid("`userids` is empty")),
            Self::MatchUserProfileField(c) if c.cpfield.trim().is_empty() => {
                Err(invalid("`cpfield` is empty"))
            }
            Self::EnterUserProfileField(c) if c.cpfield.trim().is_empty() => {
                Err(invalid("`cpfield` is empty"))
            }
            _ => Ok(()),
        }
    }

    pub fn condition(&self) -> &dyn Condition {
        match self {
            Self::SelectUsers(c) => c,
            Self::SelectStudentInBo(c) => c,
            Self::SelectTeacherInBo(c) => c,
            Self::SelectBookingManagerInBo(c) => c,
            Self::SelectResponsibleContactInBo(c) => c,
            Self::SelectUserFromEvent(c) => c,
            Self::MatchUserProfileField(c) => c,
            Self::EnterUserProfileField(c) => c,
            Self::SelectUserShoppingCart(c) => c,
        }
    }

    pub fn name(&self) -> &'static str {
        self.condition().name()
    }

    /// The json slice this condition is stored as
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::SelectUsers(c) => to_data(c),
            Self::SelectStudentInBo(c) => to_data(c),
            Self::SelectTeacherInBo(c) => to_data(c),
            Self::SelectBookingManagerInBo(c) => to_data(c),
            Self::SelectResponsibleContactInBo(c) => to_data(c),
            Self::SelectUserFromEvent(c) => to_data(c),
            Self::MatchUserProfileField(c) => to_data(c),
            Self::EnterUserProfileField(c) => to_data(c),
            Self::SelectUserShoppingCart(c) => to_data(c),
        }
    }
}
