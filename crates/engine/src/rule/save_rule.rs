use super::subscribers::ExecuteRuleOnSaved;
use crate::shared::usecase::{Subscriber, UseCase};
use booking_rules_domain::{BookingRule, RuleDefinition, RuleError, ID};
use booking_rules_infra::BookingRulesContext;

/// Validates a rule json and stores it, as a new rule or replacing the
/// configuration of an existing one
#[derive(Debug)]
pub struct SaveRuleUseCase {
    /// `None` creates a new rule
    pub rule_id: Option<ID>,
    pub contextid: i64,
    pub rulejson: String,
    pub isactive: bool,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    InvalidRule(RuleError),
    NotFound(ID),
    StorageError(anyhow::Error),
}

#[async_trait::async_trait(?Send)]
impl UseCase for SaveRuleUseCase {
    type Response = BookingRule;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "SaveRule";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let definition =
            RuleDefinition::from_json(&self.rulejson).map_err(UseCaseErrors::InvalidRule)?;
        definition
            .check_compatibility(&ctx.store.capabilities())
            .map_err(UseCaseErrors::InvalidRule)?;

        let rule = match &self.rule_id {
            None => {
                let mut rule = BookingRule::new(self.contextid, &definition);
                rule.isactive = self.isactive;
                ctx.repos
                    .rule_repo
                    .insert(&rule)
                    .await
                    .map_err(UseCaseErrors::StorageError)?;
                rule
            }
            Some(rule_id) => {
                let mut rule = match ctx.repos.rule_repo.find(rule_id).await {
                    Some(rule) => rule,
                    None => return Err(UseCaseErrors::NotFound(rule_id.clone())),
                };
                rule.contextid = self.contextid;
                rule.ruletype = definition.rule_type();
                rule.isactive = self.isactive;
                rule.rulejson = definition.to_json();
                ctx.repos
                    .rule_repo
                    .save(&rule)
                    .await
                    .map_err(UseCaseErrors::StorageError)?;
                rule
            }
        };

        Ok(rule)
    }

    fn subscribers() -> Vec<Box<dyn Subscriber<Self>>> {
        vec![Box::new(ExecuteRuleOnSaved)]
    }
}
