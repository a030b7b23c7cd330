use super::{scan_concerned_rows, ScanError};
use crate::shared::usecase::UseCase;
use booking_rules_domain::{BookingEvent, BookingRule, RuleError, ScanParams};
use booking_rules_infra::BookingRulesContext;

/// Re-evaluates the rule in test mode for one scheduled notification,
/// right before it is delivered
#[derive(Debug)]
pub struct CheckRuleStillAppliesUseCase {
    pub rule: BookingRule,
    pub optionid: i64,
    pub userid: i64,
    pub nextruntime: i64,
    pub optiondateid: Option<i64>,
    pub event: Option<BookingEvent>,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    InvalidRule(RuleError),
    StorageError(anyhow::Error),
}

impl From<ScanError> for UseCaseErrors {
    fn from(e: ScanError) -> Self {
        match e {
            ScanError::InvalidRule(e) => Self::InvalidRule(e),
            ScanError::StorageError(e) => Self::StorageError(e),
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for CheckRuleStillAppliesUseCase {
    type Response = bool;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "CheckRuleStillApplies";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let definition = self.rule.definition().map_err(UseCaseErrors::InvalidRule)?;

        let scan = ScanParams {
            optionid: Some(self.optionid),
            userid: Some(self.userid),
            optiondateid: self.optiondateid,
            event: self.event.as_ref(),
            testmode: true,
            now: ctx.sys.get_timestamp(),
            tolerance: ctx.config.due_tolerance_secs,
        };
        let rows = scan_concerned_rows(&definition, self.rule.contextid, &scan, ctx).await?;

        Ok(definition.still_applies(&rows, self.nextruntime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::execute_rule::ExecuteRuleUseCase;
    use crate::shared::usecase::execute;
    use crate::test_utils::*;
    use booking_rules_domain::{BookingOption, User};

    fn check(rule: &BookingRule, nextruntime: i64) -> CheckRuleStillAppliesUseCase {
        CheckRuleStillAppliesUseCase {
            rule: rule.clone(),
            optionid: 7,
            userid: 42,
            nextruntime,
            optiondateid: None,
            event: None,
        }
    }

    #[tokio::test]
    async fn applies_while_nothing_changed() {
        let mut t = TestContext::new();
        t.option(7, NOW + 3 * DAY);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        let tasks = execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx)
            .await
            .unwrap();

        // Checked when the task is due, long after scheduling
        t.set_time(tasks[0].runat);
        let applies = execute(check(&rule, tasks[0].nextruntime), &t.ctx)
            .await
            .unwrap();
        assert!(applies);
    }

    #[tokio::test]
    async fn no_longer_applies_after_the_course_moved() {
        let t = TestContext::new();
        let t0 = NOW + 3 * DAY;
        let option = t.option(7, t0);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx)
            .await
            .unwrap();

        let t1 = t0 + 3600;
        t.insert(&BookingOption {
            coursestarttime: Some(t1),
            ..option
        });

        assert!(!execute(check(&rule, t0 - DAY), &t.ctx).await.unwrap());
        assert!(execute(check(&rule, t1 - DAY), &t.ctx).await.unwrap());
    }

    #[tokio::test]
    async fn no_longer_applies_when_the_user_is_deleted() {
        let t = TestContext::new();
        t.option(7, NOW + 3 * DAY);
        let user = t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;

        t.insert(&User {
            deleted: true,
            ..user
        });

        assert!(!execute(check(&rule, NOW + 2 * DAY), &t.ctx).await.unwrap());
    }
}
