use super::cache::RuleCache;
use crate::{
    rule::check_rule_still_applies::CheckRuleStillAppliesUseCase,
    shared::usecase::{execute, UseCase},
};
use booking_rules_domain::{BookingRule, ScheduledTask, TaskStatus};
use booking_rules_infra::{BookingRulesContext, Mail, RuleFailure};
use tracing::{debug, info, warn};

/// Delivers the pending tasks that are due. Every task is checked against
/// the current state of its rule and of the booking data first, and is
/// suppressed when it no longer applies.
#[derive(Debug)]
pub struct SendDueNotificationsUseCase;

#[derive(Debug, Default, PartialEq)]
pub struct SendDueNotificationsResponse {
    pub sent: usize,
    pub suppressed: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub enum UseCaseErrors {
    StorageError(anyhow::Error),
}

/// Why a task is not delivered although it is due
fn stale_reason(task: &ScheduledTask, rule: Option<&BookingRule>) -> Option<&'static str> {
    match rule {
        None => Some("the rule was deleted"),
        Some(rule) if !rule.isactive => Some("the rule is inactive"),
        Some(rule) if rule.rulejson != task.rulesnapshot => {
            Some("the rule was edited after scheduling")
        }
        Some(_) => None,
    }
}

impl SendDueNotificationsUseCase {
    async fn process(
        &self,
        task: &ScheduledTask,
        cache: &mut RuleCache,
        ctx: &BookingRulesContext,
    ) -> TaskStatus {
        let rule = cache.get(&task.ruleid, ctx).await;
        if let Some(reason) = stale_reason(task, rule) {
            debug!(task_id = %task.id, rule_id = %task.ruleid, "Suppressing task: {}", reason);
            return TaskStatus::Suppressed;
        }
        let rule = match rule {
            Some(rule) => rule.clone(),
            None => return TaskStatus::Suppressed,
        };

        let check = CheckRuleStillAppliesUseCase {
            rule,
            optionid: task.optionid,
            userid: task.userid,
            nextruntime: task.nextruntime,
            optiondateid: task.optiondateid,
            event: task.customdata.event.clone(),
        };
        match execute(check, ctx).await {
            Ok(true) => {}
            Ok(false) => return TaskStatus::Suppressed,
            Err(e) => {
                ctx.failure_reporter.report(RuleFailure {
                    rule_id: task.ruleid.clone(),
                    operation: CheckRuleStillAppliesUseCase::NAME,
                    message: format!("{:?}", e),
                });
                return TaskStatus::Failed;
            }
        }

        let mail = Mail {
            task_id: task.id.clone(),
            userid: task.userid,
            subject: task.customdata.subject.clone(),
            message: task.customdata.message.clone(),
        };
        match ctx.mailer.send(&mail).await {
            Ok(()) => TaskStatus::Sent,
            Err(e) => {
                warn!(task_id = %task.id, user_id = task.userid, "Failed to send notification: {:?}", e);
                TaskStatus::Failed
            }
        }
    }
}

#[async_trait::async_trait(?Send)]
impl UseCase for SendDueNotificationsUseCase {
    type Response = SendDueNotificationsResponse;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "SendDueNotifications";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        let now = ctx.sys.get_timestamp();
        let tasks = ctx
            .repos
            .task_repo
            .find_due(now)
            .await
            .map_err(UseCaseErrors::StorageError)?;

        let mut cache = RuleCache::new();
        let mut res = SendDueNotificationsResponse::default();
        for task in &tasks {
            let status = self.process(task, &mut cache, ctx).await;
            match status {
                TaskStatus::Sent => res.sent += 1,
                TaskStatus::Suppressed => res.suppressed += 1,
                TaskStatus::Failed => res.failed += 1,
                TaskStatus::Pending => {}
            }
            ctx.repos
                .task_repo
                .set_status(&task.id, status)
                .await
                .map_err(UseCaseErrors::StorageError)?;
        }
        if !tasks.is_empty() {
            info!(
                sent = res.sent,
                suppressed = res.suppressed,
                failed = res.failed,
                "Processed due notifications"
            );
        }

        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::execute_rule::ExecuteRuleUseCase;
    use crate::test_utils::*;
    use booking_rules_domain::BookingOption;
    use booking_rules_infra::InMemoryMailer;

    async fn schedule(t: &TestContext, rule: &BookingRule) -> ScheduledTask {
        let mut tasks = execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        tasks.remove(0)
    }

    async fn status(t: &TestContext, task: &ScheduledTask) -> TaskStatus {
        let tasks = t.ctx.repos.task_repo.find_by_rule(&task.ruleid).await.unwrap();
        tasks[0].status
    }

    #[tokio::test]
    async fn sends_due_notifications_once() {
        let mut t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        let task = schedule(&t, &rule).await;

        // Not due yet
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();
        assert_eq!(res, SendDueNotificationsResponse::default());

        t.set_time(task.runat);
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();
        assert_eq!(res.sent, 1);
        let mails = t.mailer.sent();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].userid, 42);
        assert_eq!(mails[0].subject, "Reminder");
        assert_eq!(status(&t, &task).await, TaskStatus::Sent);

        // Rescanning the rule does not send the notification again
        schedule(&t, &rule).await;
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();
        assert_eq!(res, SendDueNotificationsResponse::default());
        assert_eq!(t.mailer.sent().len(), 1);
    }

    #[tokio::test]
    async fn suppresses_notifications_of_moved_courses() {
        let mut t = TestContext::new();
        let option = t.option(1, NOW + 3 * DAY);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        let task = schedule(&t, &rule).await;
        t.insert(&BookingOption {
            coursestarttime: Some(NOW + 4 * DAY),
            ..option
        });

        t.set_time(task.runat);
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();

        assert_eq!(res.suppressed, 1);
        assert!(t.mailer.sent().is_empty());
        assert_eq!(status(&t, &task).await, TaskStatus::Suppressed);
    }

    #[tokio::test]
    async fn suppresses_notifications_of_changed_rules() {
        let mut t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let edited = t.rule(day_before_rule(&[42])).await;
        let deactivated = t.rule(day_before_rule(&[42])).await;
        let deleted = t.rule(day_before_rule(&[42])).await;
        for rule in [&edited, &deactivated, &deleted].iter() {
            schedule(&t, rule).await;
        }

        let mut rule = edited.clone();
        rule.rulejson = day_before_rule(&[42, 43]);
        t.ctx.repos.rule_repo.save(&rule).await.unwrap();
        let mut rule = deactivated.clone();
        rule.isactive = false;
        t.ctx.repos.rule_repo.save(&rule).await.unwrap();
        t.ctx.repos.rule_repo.delete(&deleted.id).await;

        t.set_time(NOW + 2 * DAY);
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();

        assert_eq!(
            res,
            SendDueNotificationsResponse {
                sent: 0,
                suppressed: 3,
                failed: 0,
            }
        );
        assert!(t.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn marks_undeliverable_notifications_as_failed() {
        let mut t = TestContext::with_mailer(InMemoryMailer::failing());
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let rule = t.rule(day_before_rule(&[42])).await;
        let task = schedule(&t, &rule).await;

        t.set_time(task.runat);
        let res = execute(SendDueNotificationsUseCase, &t.ctx).await.unwrap();

        assert_eq!(res.failed, 1);
        assert_eq!(status(&t, &task).await, TaskStatus::Failed);
    }
}
