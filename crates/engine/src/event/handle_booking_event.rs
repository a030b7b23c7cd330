use crate::{
    rule::execute_rule::ExecuteRuleUseCase,
    shared::usecase::{execute, UseCase},
};
use booking_rules_domain::{BookingEvent, ReactOnEvent, RuleConfig, RuleType};
use booking_rules_infra::{BookingRulesContext, RuleFailure};
use tracing::{info, warn};

/// Entry point of the host's event bus: executes every active event rule
/// reacting on the event, restricted to the event's option
#[derive(Debug)]
pub struct HandleBookingEventUseCase {
    pub event: BookingEvent,
}

#[derive(Debug, Default, PartialEq)]
pub struct HandleBookingEventResponse {
    pub matched_rules: usize,
    pub scheduled_tasks: usize,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    StorageError(anyhow::Error),
}

#[async_trait::async_trait(?Send)]
impl UseCase for HandleBookingEventUseCase {
    type Response = HandleBookingEventResponse;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "HandleBookingEvent";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let rules = ctx
            .repos
            .rule_repo
            .find_active_by_type(RuleType::ReactOnEvent)
            .await
            .map_err(UseCaseErrors::StorageError)?;

        let mut res = HandleBookingEventResponse::default();
        for rule in rules {
            let reacts = match rule.definition() {
                Ok(definition) => matches!(
                    definition.rule,
                    RuleConfig::ReactOnEvent(ReactOnEvent { boevent }) if boevent == self.event.eventname
                ),
                Err(e) => {
                    warn!(rule_id = %rule.id, "Skipping an invalid event rule: {}", e);
                    false
                }
            };
            if !reacts {
                continue;
            }
            res.matched_rules += 1;

            let rule_id = rule.id.clone();
            let usecase = ExecuteRuleUseCase {
                rule,
                optionid: Some(self.event.optionid),
                userid: None,
                event: Some(self.event.clone()),
            };
            match execute(usecase, ctx).await {
                Ok(tasks) => res.scheduled_tasks += tasks.len(),
                Err(e) => ctx.failure_reporter.report(RuleFailure {
                    rule_id,
                    operation: ExecuteRuleUseCase::NAME,
                    message: format!("{:?}", e),
                }),
            }
        }
        info!(
            event = %self.event.eventname,
            option_id = self.event.optionid,
            matched_rules = res.matched_rules,
            scheduled_tasks = res.scheduled_tasks,
            "Handled booking event"
        );

        Ok(res)
    }
}
