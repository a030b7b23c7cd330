use super::{scan_concerned_rows, ScanError};
use crate::shared::usecase::UseCase;
use booking_rules_domain::{BookingEvent, BookingRule, RuleError, ScanParams, ScheduledTask};
use booking_rules_infra::BookingRulesContext;
use tracing::info;

/// Scans the rule, dispatches the concerned rows and hands them to the
/// rule's action which schedules one task per row
#[derive(Debug)]
pub struct ExecuteRuleUseCase {
    pub rule: BookingRule,
    pub optionid: Option<i64>,
    pub userid: Option<i64>,
    /// The event that triggered an event rule
    pub event: Option<BookingEvent>,
}

impl ExecuteRuleUseCase {
    pub fn new(rule: BookingRule) -> Self {
        Self {
            rule,
            optionid: None,
            userid: None,
            event: None,
        }
    }
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
impl UseCase for ExecuteRuleUseCase {
    type Response = Vec<ScheduledTask>;

    type Errors = UseCaseErrors;

    const NAME: &'static str = "ExecuteRule";

    async fn execute(&mut self, ctx: &BookingRulesContext) -> Result<Self::Response, Self::Errors> {
        if !self.rule.isactive {
            return Ok(vec![]);
        }
        let definition = self.rule.definition().map_err(UseCaseErrors::InvalidRule)?;

        let scan = ScanParams {
            optionid: self.optionid,
            userid: self.userid,
            event: self.event.as_ref(),
            now: ctx.sys.get_timestamp(),
            tolerance: ctx.config.due_tolerance_secs,
            ..Default::default()
        };
        let rows = scan_concerned_rows(&definition, self.rule.contextid, &scan, ctx).await?;
        let rows = definition
            .dispatch(rows)
            .map_err(UseCaseErrors::InvalidRule)?;

        let tasks = definition
            .action
            .schedule(&self.rule, &definition.name, &rows, self.event.as_ref());
        for task in &tasks {
            ctx.repos
                .task_repo
                .upsert(task)
                .await
                .map_err(UseCaseErrors::StorageError)?;
        }
        info!(
            rule_id = %self.rule.id,
            tasks = tasks.len(),
            "Scheduled the notifications of the rule"
        );

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::usecase::execute;
    use crate::test_utils::*;
    use booking_rules_domain::{AnswerStatus, BookingAnswer, OptionDate, TaskStatus};
    use serde_json::json;

    #[tokio::test]
    async fn schedules_one_task_a_day_before_the_course() {
        let t = TestContext::new();
        let t0 = NOW + 3 * DAY;
        t.option(7, t0);
        t.user(42);
        t.user(43);
        let rule = t.rule(day_before_rule(&[42])).await;

        let tasks = execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx)
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.userid, 42);
        assert_eq!(task.optionid, 7);
        assert_eq!(task.nextruntime, t0 - DAY);
        assert_eq!(task.runat, t0 - DAY);
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.rulesnapshot, rule.rulejson);
        assert_eq!(task.customdata.subject, "Reminder");
        assert!(task.customdata.message.starts_with("Option 7 starts "));

        let stored = t.ctx.repos.task_repo.find_by_rule(&rule.id).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn skips_options_whose_run_time_passed_beyond_the_tolerance() {
        let t = TestContext::new();
        t.user(42);
        // Run time an hour ago is within the default tolerance
        t.option(1, NOW + DAY - 1800);
        t.option(2, NOW + DAY - 2 * 3600);
        t.option(3, NOW + 5 * DAY);
        let rule = t.rule(day_before_rule(&[42])).await;

        let tasks = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await.unwrap();
        let mut optionids = tasks.iter().map(|t| t.optionid).collect::<Vec<_>>();
        optionids.sort_unstable();
        assert_eq!(optionids, vec![1, 3]);
    }

    #[tokio::test]
    async fn schedules_every_session_of_an_option() {
        let t = TestContext::new();
        t.user(42);
        t.option(1, NOW + 10 * DAY);
        for (id, start, daystonotify) in [(11, NOW + 3 * DAY, 0), (12, NOW + 5 * DAY, 2)].iter() {
            t.insert(&OptionDate {
                id: *id,
                optionid: 1,
                coursestarttime: *start,
                courseendtime: start + 3600,
                daystonotify: *daystonotify,
            });
        }
        let rule = t
            .rule(rulejson(
                json!({ "seconds": DAY, "datefield": "optiondatestarttime" }),
                "select_users",
                json!({ "userids": [42] }),
            ))
            .await;

        let mut tasks = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await.unwrap();
        tasks.sort_by_key(|t| t.optiondateid);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].optiondateid, Some(11));
        assert_eq!(tasks[0].nextruntime, NOW + 2 * DAY);
        // The session overrides the offset of the rule
        assert_eq!(tasks[1].optiondateid, Some(12));
        assert_eq!(tasks[1].nextruntime, NOW + 3 * DAY);
    }

    #[tokio::test]
    async fn booked_or_waiting_students_exclude_deleted_answers() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        let answers = [
            (1, AnswerStatus::Booked),
            (2, AnswerStatus::WaitingList),
            (3, AnswerStatus::Deleted),
            (4, AnswerStatus::NotifyMeList),
        ];
        for (userid, status) in answers.iter() {
            t.user(*userid);
            t.insert(&BookingAnswer {
                id: *userid,
                optionid: 1,
                userid: *userid,
                status: *status,
                timecreated: NOW - DAY,
                timemodified: NOW - DAY,
            });
        }
        let rule = t
            .rule(rulejson(
                json!({ "seconds": DAY, "datefield": "coursestarttime" }),
                "select_student_in_bo",
                json!({ "borole": "01" }),
            ))
            .await;

        let tasks = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await.unwrap();
        let mut userids = tasks.iter().map(|t| t.userid).collect::<Vec<_>>();
        userids.sort_unstable();
        assert_eq!(userids, vec![1, 2]);
    }

    #[tokio::test]
    async fn interval_action_spreads_the_tasks() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(1);
        t.user(2);
        let mut payload: serde_json::Value = serde_json::from_str(&day_before_rule(&[1, 2])).unwrap();
        payload["actionname"] = json!("send_mail_interval");
        payload["actiondata"] = json!({ "subject": "s", "template": "t", "interval": 60 });
        let rule = t.rule(payload.to_string()).await;

        let tasks = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await.unwrap();
        let mut runats = tasks.iter().map(|t| t.runat).collect::<Vec<_>>();
        runats.sort_unstable();
        assert_eq!(runats, vec![NOW + 2 * DAY, NOW + 2 * DAY + 60]);
    }

    #[tokio::test]
    async fn inactive_rules_schedule_nothing() {
        let t = TestContext::new();
        t.option(1, NOW + 3 * DAY);
        t.user(42);
        let mut rule = t.rule(day_before_rule(&[42])).await;
        rule.isactive = false;

        let tasks = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await.unwrap();
        assert!(tasks.is_empty());
    }

    #[tokio::test]
    async fn dates_out_of_range_fail_the_rule_without_scheduling() {
        let t = TestContext::new();
        t.option(1, i64::MAX);
        t.user(42);
        let rule = t
            .rule(rulejson(
                json!({ "seconds": -DAY, "datefield": "coursestarttime" }),
                "select_users",
                json!({ "userids": [42] }),
            ))
            .await;

        let res = execute(ExecuteRuleUseCase::new(rule.clone()), &t.ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseErrors::InvalidRule(RuleError::MalformedRow(_)))
        ));
        assert!(t
            .ctx
            .repos
            .task_repo
            .find_by_rule(&rule.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn rejects_corrupt_rule_json() {
        let t = TestContext::new();
        let mut rule = t.rule(day_before_rule(&[42])).await;
        rule.rulejson = rule.rulejson.replace("select_users", "select_nobody");

        let res = execute(ExecuteRuleUseCase::new(rule), &t.ctx).await;
        assert!(matches!(
            res,
            Err(UseCaseErrors::InvalidRule(RuleError::UnknownCondition(_)))
        ));
    }
}
