use crate::shared::usecase::UseCase;
use booking_rules_domain::{BookingRule, ID};
use booking_rules_infra::BookingRulesContext;
use tracing::info;

#[derive(Debug)]
pub struct DeleteRuleUseCase {
    pub rule_id: ID,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    NotFound(ID),
    StorageError(anyhow::Error),
}

#[async_trait::async_trait(?Send)]
impl UseCase for DeleteRuleUseCase {
    type Response = BookingRule;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "DeleteRule";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let rule = match ctx.repos.rule_repo.delete(&self.rule_id).await {
            Some(rule) => rule,
            None => return Err(UseCaseErrors::NotFound(self.rule_id.clone())),
        };
        let res = ctx
            .repos
            .task_repo
            .delete_pending_by_rule(&rule.id)
            .await
            .map_err(UseCaseErrors::StorageError)?;
        info!(
            rule_id = %rule.id,
            deleted_tasks = res.deleted_count,
            "Deleted the rule and its pending notifications"
        );

        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::execute_rule::ExecuteRuleUseCase;
    use crate::shared::usecase::execute;
    use crate::test_utils::*;

    #[tokio::test]
    async fn deletes_the_rule_and_its_pending_tasks() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx)
            .await
            .unwrap();

        let deleted = execute(
            DeleteRuleUseCase {
                rule_id: rule.id.clone(),
            },
            &t.ctx,
        )
        .await
        .unwrap();

        assert_eq!(deleted.id, rule.id);
        assert!(t.ctx.repos.rule_repo.find(&rule.id).await.is_none());
        assert!(t
            .ctx
            .repos
            .task_repo
            .find_by_rule(&rule.id)
            .await
            .unwrap()
            .is_empty());

        let res = execute(DeleteRuleUseCase { rule_id: rule.id }, &t.ctx).await;
        assert!(matches!(res, Err(UseCaseErrors::NotFound(_))));
    }
}
