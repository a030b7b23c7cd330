mod daysbefore;
mod definition;
mod react_on_event;

pub use daysbefore::{DateField, DaysBefore, MAX_OFFSET_SECONDS};
pub use definition::{RuleConfig, RuleDefinition, RulePayload, RULE_JSON_VERSION};
pub use react_on_event::ReactOnEvent;

use crate::booking::Context;
use crate::capabilities::StoreCapabilities;
use crate::condition::{ConditionContext, ConditionError};
use crate::event::BookingEvent;
use crate::query::{col, lit, ComposedQuery, Expr, Join, QueryBuilder, QueryError, ResultRow, ValueKind};
use crate::shared::entity::{Entity, ID};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleType {
    #[serde(rename = "rule_daysbefore")]
    DaysBefore,
    #[serde(rename = "rule_react_on_event")]
    ReactOnEvent,
}

impl RuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleType::DaysBefore => DaysBefore::NAME,
            RuleType::ReactOnEvent => ReactOnEvent::NAME,
        }
    }
}

impl Display for RuleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RuleType {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            DaysBefore::NAME => Ok(RuleType::DaysBefore),
            ReactOnEvent::NAME => Ok(RuleType::ReactOnEvent),
            unknown => Err(RuleError::UnknownRuleType(unknown.to_string())),
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum RuleError {
    #[error("The rule json is invalid: {0}")]
    InvalidJson(String),
    #[error("Rule json version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("No rule type is registered as `{0}`")]
    UnknownRuleType(String),
    #[error("No condition is registered as `{0}`")]
    UnknownCondition(String),
    #[error("No action is registered as `{0}`")]
    UnknownAction(String),
    #[error("Invalid configuration for `{variant}`: {reason}")]
    InvalidConfiguration { variant: String, reason: String },
    #[error("Condition `{condition}` can not be combined with rules of type `{rule_type}` on this database")]
    IncompatibleCondition {
        condition: String,
        rule_type: RuleType,
    },
    #[error("The rule is stored as `{stored}` but its json describes a `{payload}` rule")]
    RuleTypeMismatch { stored: RuleType, payload: RuleType },
    #[error("Rules reacting on events need the option of the event")]
    MissingOption,
    #[error("The composed query selects no `datefield`")]
    MissingDateField,
    #[error("The concerned row is malformed: {0}")]
    MalformedRow(String),
    #[error(transparent)]
    Condition(#[from] ConditionError),
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// A persisted booking rule. `rulejson` holds the complete configuration
/// (trigger policy, condition and action), `ruletype` duplicates its rule
/// name so that rules can be loaded by type.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingRule {
    pub id: ID,
    /// Context the rule lives in. It applies to options of this context and
    /// its descendants.
    pub contextid: i64,
    pub ruletype: RuleType,
    pub isactive: bool,
    pub rulejson: String,
}

impl BookingRule {
    pub fn new(contextid: i64, definition: &RuleDefinition) -> Self {
        Self {
            id: Default::default(),
            contextid,
            ruletype: definition.rule_type(),
            isactive: true,
            rulejson: definition.to_json(),
        }
    }

    pub fn definition(&self) -> Result<RuleDefinition, RuleError> {
        let definition = RuleDefinition::from_json(&self.rulejson)?;
        if definition.rule_type() != self.ruletype {
            return Err(RuleError::RuleTypeMismatch {
                stored: self.ruletype,
                payload: definition.rule_type(),
            });
        }
        Ok(definition)
    }
}

impl Entity for BookingRule {
    fn id(&self) -> &ID {
        &self.id
    }
}

/// Restrictions and mode of one composition of a rule's query
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanParams<'a> {
    pub optionid: Option<i64>,
    pub userid: Option<i64>,
    pub optiondateid: Option<i64>,
    pub event: Option<&'a BookingEvent>,
    /// Ignores the time threshold, used to re-evaluate scheduled tasks
    pub testmode: bool,
    pub now: i64,
    /// How long a date may lie in the past and still be picked up
    pub tolerance: i64,
}

/// The part of a rule deciding which options are considered and when
/// the concerned users are notified.
///
/// `begin` runs before the condition and `finish` after it, so that the
/// policy can refer to the user the condition declared.
pub trait TriggerPolicy {
    fn rule_type(&self) -> RuleType;

    fn begin(&self, query: &mut QueryBuilder, scan: &ScanParams) -> Result<(), RuleError>;

    fn finish(&self, query: &mut QueryBuilder, scan: &ScanParams) -> Result<(), RuleError>;

    /// When the concerned user of `row` must be notified
    fn nextruntime(&self, row: &ConcernedRow) -> Result<i64, RuleError>;

    /// Decides from the rows of a test mode scan whether a task scheduled
    /// for `nextruntime` is still valid
    fn still_applies(&self, rows: &[ConcernedRow], nextruntime: i64) -> bool {
        rows.iter()
            .any(|row| self.nextruntime(row).ok() == Some(nextruntime))
    }
}

/// A row selected by a rule's composed query
#[derive(Debug, Clone, PartialEq)]
pub struct ConcernedRow {
    pub uniqueid: String,
    pub optionid: i64,
    pub optiondateid: Option<i64>,
    pub userid: i64,
    pub datefield: i64,
    /// Per row override of the rule offset
    pub secondstonotify: Option<i64>,
}

impl TryFrom<ResultRow> for ConcernedRow {
    type Error = RuleError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let int = |column: &str| row.get(column).and_then(|v| v.as_i64());
        let required = |column: &str| {
            int(column).ok_or_else(|| RuleError::MalformedRow(format!("`{}` is missing", column)))
        };
        Ok(Self {
            uniqueid: row
                .get(crate::query::UNIQUE_KEY)
                .and_then(|v| v.as_text())
                .ok_or_else(|| RuleError::MalformedRow("`uniqueid` is missing".into()))?,
            optionid: required("optionid")?,
            optiondateid: int("optiondateid"),
            userid: required(crate::query::USER_ID)?,
            datefield: required("datefield")?,
            secondstonotify: int("secondstonotify"),
        })
    }
}

/// A concerned row together with its computed run time, handed to the
/// rule's action
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledRow {
    pub row: ConcernedRow,
    pub nextruntime: i64,
}

/// Adds the predicates every rule shares: the context scope and the option
/// restriction.
fn scope_options(
    query: &mut QueryBuilder,
    contextid: i64,
    scan: &ScanParams,
) -> Result<(), RuleError> {
    if contextid != Context::SYSTEM {
        let contextid = query.bind_param("contextid", contextid)?;
        query.add_join(Join::inner(
            "context",
            "ctx",
            col("ctx", "id").eq(col("bo", "contextid")),
        ))?;
        query.add_join(Join::inner("context", "rulectx", col("rulectx", "id").eq(contextid)))?;
        let descendant = col("ctx", "path")
            .starts_with(Expr::Concat(vec![col("rulectx", "path"), lit("/")]));
        query.add_predicate(Expr::Or(vec![
            col("ctx", "path").text_eq(col("rulectx", "path")),
            descendant,
        ]));
    }
    if let Some(optionid) = scan.optionid {
        let optionid = query.bind_param("optionid", optionid)?;
        query.add_predicate(col("bo", "id").eq(optionid));
    }
    Ok(())
}

impl RuleDefinition {
    /// Composes the query selecting the rows concerned by this rule
    pub fn compose_scan(
        &self,
        contextid: i64,
        scan: &ScanParams,
        capabilities: &StoreCapabilities,
    ) -> Result<ComposedQuery, RuleError> {
        let policy = self.rule.policy();
        let mut query = QueryBuilder::new("booking_options", "bo");
        query.push_key_part(col("bo", "id"));
        query.set_column("optionid", col("bo", "id"), ValueKind::Int);

        scope_options(&mut query, contextid, scan)?;
        policy.begin(&mut query, scan)?;

        let ctx = ConditionContext {
            rule_type: policy.rule_type(),
            userid: scan.userid,
            event: scan.event,
            capabilities,
        };
        self.condition.condition().execute(&mut query, &ctx)?;

        policy.finish(&mut query, scan)?;
        Ok(query.build()?)
    }

    /// Attaches the run time to every concerned row, keeping the query order
    pub fn dispatch(&self, rows: Vec<ConcernedRow>) -> Result<Vec<ScheduledRow>, RuleError> {
        let policy = self.rule.policy();
        rows.into_iter()
            .map(|row| {
                Ok(ScheduledRow {
                    nextruntime: policy.nextruntime(&row)?,
                    row,
                })
            })
            .collect()
    }

    pub fn still_applies(&self, rows: &[ConcernedRow], nextruntime: i64) -> bool {
        let applies = self.rule.policy().still_applies(rows, nextruntime);
        if !applies {
            tracing::debug!(
                rows = rows.len(),
                nextruntime,
                "Rule no longer applies to the scheduled task"
            );
        }
        applies
    }
}
