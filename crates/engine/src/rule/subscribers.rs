use super::{execute_rule::ExecuteRuleUseCase, save_rule::SaveRuleUseCase};
use crate::shared::usecase::{execute, Subscriber, UseCase};
use booking_rules_domain::{BookingRule, RuleType};
use booking_rules_infra::{BookingRulesContext, RuleFailure};

/// Schedules the notifications of a saved date rule right away instead
/// of waiting for the next run of the job scheduler
pub struct ExecuteRuleOnSaved;

#[async_trait::async_trait(?Send)]
impl Subscriber<SaveRuleUseCase> for ExecuteRuleOnSaved {
    async fn notify(&self, rule: &BookingRule, ctx: &BookingRulesContext) {
        // Event rules only run when their event is dispatched
        if rule.ruletype != RuleType::DaysBefore {
            return;
        }

        // The rule is saved either way, the next run retries it
        if let Err(e) = execute(ExecuteRuleUseCase::new(rule.clone()), ctx).await {
            ctx.failure_reporter.report(RuleFailure {
                rule_id: rule.id.clone(),
                operation: ExecuteRuleUseCase::NAME,
                message: format!("{:?}", e),
            });
        }
    }
}
