use super::{DateField, DaysBefore, ReactOnEvent, RuleError, RuleType, TriggerPolicy};
use crate::action::ActionConfig;
use crate::capabilities::StoreCapabilities;
use crate::condition::{ConditionConfig, SelectUserShoppingCart};
use serde::{Deserialize, Serialize};

pub const RULE_JSON_VERSION: u32 = 1;

fn default_version() -> u32 {
    RULE_JSON_VERSION
}

/// The stored json form of a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulePayload {
    #[serde(default = "default_version")]
    pub version: u32,
    pub name: String,
    pub rulename: String,
    pub ruledata: serde_json::Value,
    pub conditionname: String,
    pub conditiondata: serde_json::Value,
    pub actionname: String,
    pub actiondata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleConfig {
    DaysBefore(DaysBefore),
    ReactOnEvent(ReactOnEvent),
}

impl RuleConfig {
    pub fn from_parts(name: &str, data: serde_json::Value) -> Result<Self, RuleError> {
        let invalid = |e: serde_json::Error| RuleError::InvalidConfiguration {
            variant: name.to_string(),
            reason: e.to_string(),
        };
        match name {
            DaysBefore::NAME => {
                let rule: DaysBefore = serde_json::from_value(data).map_err(invalid)?;
                rule.validate()
                    .map_err(|reason| RuleError::InvalidConfiguration {
                        variant: name.to_string(),
                        reason,
                    })?;
                Ok(Self::DaysBefore(rule))
            }
            ReactOnEvent::NAME => Ok(Self::ReactOnEvent(
                serde_json::from_value(data).map_err(invalid)?,
            )),
            unknown => Err(RuleError::UnknownRuleType(unknown.to_string())),
        }
    }

    pub fn policy(&self) -> &dyn TriggerPolicy {
        match self {
            Self::DaysBefore(rule) => rule,
            Self::ReactOnEvent(rule) => rule,
        }
    }

    pub fn data(&self) -> serde_json::Value {
        let data = match self {
            Self::DaysBefore(rule) => serde_json::to_value(rule),
            Self::ReactOnEvent(rule) => serde_json::to_value(rule),
        };
        data.unwrap_or(serde_json::Value::Null)
    }
}

/// A parsed and resolved rule: trigger policy, condition and action
#[derive(Debug, Clone, PartialEq)]
pub struct RuleDefinition {
    pub name: String,
    pub rule: RuleConfig,
    pub condition: ConditionConfig,
    pub action: ActionConfig,
}

impl RuleDefinition {
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let payload: RulePayload =
            serde_json::from_str(json).map_err(|e| RuleError::InvalidJson(e.to_string()))?;
        Self::from_payload(payload)
    }

    pub fn from_payload(payload: RulePayload) -> Result<Self, RuleError> {
        if payload.version != RULE_JSON_VERSION {
            return Err(RuleError::UnsupportedVersion(payload.version));
        }
        Ok(Self {
            name: payload.name,
            rule: RuleConfig::from_parts(&payload.rulename, payload.ruledata)?,
            condition: ConditionConfig::from_parts(&payload.conditionname, payload.conditiondata)?,
            action: ActionConfig::from_parts(&payload.actionname, payload.actiondata)?,
        })
    }

    pub fn to_payload(&self) -> RulePayload {
        RulePayload {
            version: RULE_JSON_VERSION,
            name: self.name.clone(),
            rulename: self.rule_type().as_str().to_string(),
            ruledata: self.rule.data(),
            conditionname: self.condition.name().to_string(),
            conditiondata: self.condition.data(),
            actionname: self.action.name().to_string(),
            actiondata: self.action.data(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_payload()).unwrap_or_default()
    }

    pub fn rule_type(&self) -> RuleType {
        self.rule.policy().rule_type()
    }

    /// Checks that the condition can be used with this rule on a store with
    /// the given capabilities
    pub fn check_compatibility(&self, capabilities: &StoreCapabilities) -> Result<(), RuleError> {
        let rule_type = self.rule_type();
        let incompatible = || RuleError::IncompatibleCondition {
            condition: self.condition.name().to_string(),
            rule_type,
        };
        if !self
            .condition
            .condition()
            .can_be_combined_with_bookingruletype(rule_type, capabilities)
        {
            return Err(incompatible());
        }
        // Installment due dates only exist in the shopping cart condition
        let installments = matches!(
            self.rule,
            RuleConfig::DaysBefore(DaysBefore {
                datefield: DateField::Installmentpayment,
                ..
            })
        );
        let shopping_cart = self.condition.name() == SelectUserShoppingCart::NAME;
        if installments != shopping_cart && rule_type == RuleType::DaysBefore {
            return Err(incompatible());
        }
        Ok(())
    }
}
