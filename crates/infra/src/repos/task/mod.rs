mod inmemory;
mod mysql;
mod postgres;

pub use inmemory::InMemoryTaskRepo;
pub use mysql::MySqlTaskRepo;
pub use postgres::PostgresTaskRepo;

use crate::repos::shared::repo::DeleteResult;
use booking_rules_domain::{ScheduledTask, TaskStatus, ID};

#[async_trait::async_trait]
pub trait ITaskRepo: Send + Sync {
    /// Inserts the task or, when a task with the same key exists, updates
    /// its schedule, snapshot and data. The existing task becomes pending
    /// again unless it was scheduled for the same run time by the same rule
    /// json, so rescanning a rule does not repeat delivered notifications.
    async fn upsert(&self, task: &ScheduledTask) -> anyhow::Result<()>;
    async fn find(&self, task_id: &ID) -> Option<ScheduledTask>;
    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ScheduledTask>>;
    /// Pending tasks with `runat <= now`, ordered by `runat`
    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<ScheduledTask>>;
    async fn set_status(&self, task_id: &ID, status: TaskStatus) -> anyhow::Result<()>;
    async fn delete_pending_by_rule(&self, rule_id: &ID) -> anyhow::Result<DeleteResult>;
}

/// Tasks without optiondate are stored with optiondate `0` so that the
/// unique key on the task identity also covers them
pub(crate) fn optiondate_to_db(optiondateid: Option<i64>) -> i64 {
    optiondateid.unwrap_or(0)
}

pub(crate) fn optiondate_from_db(optiondateid: i64) -> Option<i64> {
    if optiondateid == 0 {
        None
    } else {
        Some(optiondateid)
    }
}

#[cfg(test)]
mod tests {
    use crate::BookingRulesContext;
    use booking_rules_domain::{ScheduledTask, TaskCustomData, TaskStatus, ID};

    fn task(ruleid: &ID, userid: i64, runat: i64) -> ScheduledTask {
        ScheduledTask {
            id: Default::default(),
            ruleid: ruleid.clone(),
            userid,
            optionid: 1,
            optiondateid: None,
            rowkey: format!("1_{}", userid),
            nextruntime: runat,
            runat,
            rulesnapshot: "{}".into(),
            customdata: TaskCustomData::default(),
            status: TaskStatus::Pending,
        }
    }

    #[tokio::test]
    async fn upsert_updates_the_task_with_the_same_key() {
        let ctx = BookingRulesContext::create_inmemory();
        let ruleid = ID::default();
        let first = task(&ruleid, 42, 100);
        ctx.repos.task_repo.upsert(&first).await.unwrap();
        ctx.repos
            .task_repo
            .set_status(&first.id, TaskStatus::Sent)
            .await
            .unwrap();

        let second = task(&ruleid, 42, 200);
        ctx.repos.task_repo.upsert(&second).await.unwrap();

        let tasks = ctx.repos.task_repo.find_by_rule(&ruleid).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, first.id);
        assert_eq!(tasks[0].runat, 200);
        assert_eq!(tasks[0].status, TaskStatus::Pending);

        let mut session = task(&ruleid, 42, 300);
        session.optiondateid = Some(7);
        session.rowkey = "1_7_42".into();
        ctx.repos.task_repo.upsert(&session).await.unwrap();
        assert_eq!(
            ctx.repos.task_repo.find_by_rule(&ruleid).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn rows_with_another_rowkey_get_their_own_task() {
        let ctx = BookingRulesContext::create_inmemory();
        let ruleid = ID::default();
        let mut first = task(&ruleid, 42, 100);
        first.rowkey = "1_500000_42".into();
        let mut second = task(&ruleid, 42, 400);
        second.rowkey = "1_900000_42".into();
        ctx.repos.task_repo.upsert(&first).await.unwrap();
        ctx.repos.task_repo.upsert(&second).await.unwrap();

        let mut runat: Vec<_> = ctx
            .repos
            .task_repo
            .find_by_rule(&ruleid)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.runat)
            .collect();
        runat.sort_unstable();
        assert_eq!(runat, vec![100, 400]);
    }

    #[tokio::test]
    async fn rescheduling_the_same_run_keeps_the_delivery_status() {
        let ctx = BookingRulesContext::create_inmemory();
        let ruleid = ID::default();
        let first = task(&ruleid, 42, 100);
        ctx.repos.task_repo.upsert(&first).await.unwrap();
        ctx.repos
            .task_repo
            .set_status(&first.id, TaskStatus::Sent)
            .await
            .unwrap();

        ctx.repos.task_repo.upsert(&task(&ruleid, 42, 100)).await.unwrap();
        let stored = ctx.repos.task_repo.find(&first.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Sent);

        let mut edited = task(&ruleid, 42, 100);
        edited.rulesnapshot = r#"{"name":"edited"}"#.into();
        ctx.repos.task_repo.upsert(&edited).await.unwrap();
        let stored = ctx.repos.task_repo.find(&first.id).await.unwrap();
        assert_eq!(stored.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn finds_due_pending_tasks() {
        let ctx = BookingRulesContext::create_inmemory();
        let ruleid = ID::default();
        let late = task(&ruleid, 1, 50);
        let early = task(&ruleid, 2, 10);
        let future = task(&ruleid, 3, 500);
        let sent = task(&ruleid, 4, 20);
        for t in [&late, &early, &future, &sent].iter() {
            ctx.repos.task_repo.upsert(t).await.unwrap();
        }
        ctx.repos
            .task_repo
            .set_status(&sent.id, TaskStatus::Sent)
            .await
            .unwrap();

        let due: Vec<_> = ctx
            .repos
            .task_repo
            .find_due(100)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.userid)
            .collect();
        assert_eq!(due, vec![2, 1]);
    }

    #[tokio::test]
    async fn deletes_only_pending_tasks_of_a_rule() {
        let ctx = BookingRulesContext::create_inmemory();
        let ruleid = ID::default();
        let pending = task(&ruleid, 1, 50);
        let sent = task(&ruleid, 2, 50);
        let other_rule = task(&ID::default(), 1, 50);
        for t in [&pending, &sent, &other_rule].iter() {
            ctx.repos.task_repo.upsert(t).await.unwrap();
        }
        ctx.repos
            .task_repo
            .set_status(&sent.id, TaskStatus::Sent)
            .await
            .unwrap();

        let res = ctx
            .repos
            .task_repo
            .delete_pending_by_rule(&ruleid)
            .await
            .unwrap();
        assert_eq!(res.deleted_count, 1);
        assert!(ctx.repos.task_repo.find(&pending.id).await.is_none());
        assert!(ctx.repos.task_repo.find(&sent.id).await.is_some());
        assert!(ctx.repos.task_repo.find(&other_rule.id).await.is_some());
    }
}
