use super::execute_rule::ExecuteRuleUseCase;
use crate::shared::usecase::{execute, UseCase};
use booking_rules_domain::RuleType;
use booking_rules_infra::{BookingRulesContext, RuleFailure};
use tracing::info;

/// Executes every active date rule. A failing rule is reported and does
/// not stop the others.
#[derive(Debug)]
pub struct RunRulesUseCase;

#[derive(Debug, Default, PartialEq)]
pub struct RunRulesResponse {
    pub executed: usize,
    pub failed: usize,
    pub scheduled_tasks: usize,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    StorageError(anyhow::Error),
}

#[async_trait::async_trait(?Send)]
impl UseCase for RunRulesUseCase {
    type Response = RunRulesResponse;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "RunRules";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let rules = ctx
            .repos
            .rule_repo
            .find_active_by_type(RuleType::DaysBefore)
            .await
            .map_err(UseCaseErrors::StorageError)?;

        let mut res = RunRulesResponse::default();
        for rule in rules {
            let rule_id = rule.id.clone();
            match execute(ExecuteRuleUseCase::new(rule), ctx).await {
                Ok(tasks) => {
                    res.executed += 1;
                    res.scheduled_tasks += tasks.len();
                }
                Err(e) => {
                    res.failed += 1;
                    ctx.failure_reporter.report(RuleFailure {
                        rule_id,
                        operation: ExecuteRuleUseCase::NAME,
                        message: format!("{:?}", e),
                    });
                }
            }
        }
        info!(
            executed = res.executed,
            failed = res.failed,
            scheduled_tasks = res.scheduled_tasks,
            "Ran the date rules"
        );

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use serde_json::json;

    #[tokio::test]
    async fn a_failing_rule_does_not_stop_the_others() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let broken = {
            let mut rule = t.rule(day_before_rule(&[42])).await;
            rule.rulejson = r#"{"name":"Broken"}"#.into();
            t.ctx.repos.rule_repo.save(&rule).await.unwrap();
            rule
        };
        let healthy = t.rule(day_before_rule(&[42])).await;
        t.rule(rulejson(
            json!({ "boevent": "bookingoption_booked" }),
            "select_users",
            json!({ "userids": [42] }),
        ))
        .await;

        let res = execute(RunRulesUseCase, &t.ctx).await.unwrap();

        assert_eq!(
            res,
            RunRulesResponse {
                executed: 1,
                failed: 1,
                scheduled_tasks: 1,
            }
        );
        let failures = t.failures.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].rule_id, broken.id);
        assert_eq!(failures[0].operation, "ExecuteRule");
        let tasks = t.ctx.repos.task_repo.find_by_rule(&healthy.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn skips_inactive_rules() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let mut rule = t.rule(day_before_rule(&[42])).await;
        rule.isactive = false;
        t.ctx.repos.rule_repo.save(&rule).await.unwrap();

        let res = execute(RunRulesUseCase, &t.ctx).await.unwrap();
        assert_eq!(res, RunRulesResponse::default());
    }
}
