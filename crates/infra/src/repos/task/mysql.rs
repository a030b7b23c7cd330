use super::{optiondate_from_db, optiondate_to_db, ITaskRepo};
use crate::repos::shared::repo::DeleteResult;
use booking_rules_domain::{ScheduledTask, TaskStatus, ID};
use sqlx::{FromRow, MySqlPool};
use std::convert::TryFrom;

pub struct MySqlTaskRepo {
    pool: MySqlPool,
}

impl MySqlTaskRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TaskRaw {
    task_uid: String,
    rule_uid: String,
    userid: i64,
    optionid: i64,
    optiondateid: i64,
    rowkey: String,
    nextruntime: i64,
    runat: i64,
    rulesnapshot: String,
    customdata: String,
    status: String,
}

impl TryFrom<TaskRaw> for ScheduledTask {
    type Error = anyhow::Error;

    fn try_from(raw: TaskRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.task_uid.parse()?,
            ruleid: raw.rule_uid.parse()?,
            userid: raw.userid,
            optionid: raw.optionid,
            optiondateid: optiondate_from_db(raw.optiondateid),
            rowkey: raw.rowkey,
            nextruntime: raw.nextruntime,
            runat: raw.runat,
            rulesnapshot: raw.rulesnapshot,
            customdata: serde_json::from_str(&raw.customdata)?,
            status: raw.status.parse()?,
        })
    }
}

#[async_trait::async_trait]
impl ITaskRepo for MySqlTaskRepo {
    async fn upsert(&self, task: &ScheduledTask) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_rule_tasks
                (task_uid, rule_uid, userid, optionid, optiondateid, rowkey, nextruntime, runat, rulesnapshot, customdata, status)
            VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = IF(
                    nextruntime = VALUES(nextruntime) AND rulesnapshot = VALUES(rulesnapshot),
                    status,
                    VALUES(status)
                ),
                nextruntime = VALUES(nextruntime),
                runat = VALUES(runat),
                rulesnapshot = VALUES(rulesnapshot),
                customdata = VALUES(customdata)
            "#,
        )
        .bind(task.id.as_string())
        .bind(task.ruleid.as_string())
        .bind(task.userid)
        .bind(task.optionid)
        .bind(optiondate_to_db(task.optiondateid))
        .bind(&task.rowkey)
        .bind(task.nextruntime)
        .bind(task.runat)
        .bind(&task.rulesnapshot)
        .bind(serde_json::to_string(&task.customdata)?)
        .bind(TaskStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, task_id: &ID) -> Option<ScheduledTask> {
        let raw: TaskRaw = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.task_uid = ?
            "#,
        )
        .bind(task_id.as_string())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        ScheduledTask::try_from(raw).ok()
    }

    async fn find_by_rule(&self, rule_id: &ID) -> anyhow::Result<Vec<ScheduledTask>> {
        let tasks: Vec<TaskRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.rule_uid = ?
            "#,
        )
        .bind(rule_id.as_string())
        .fetch_all(&self.pool)
        .await?;
        tasks.into_iter().map(ScheduledTask::try_from).collect()
    }

    async fn find_due(&self, now: i64) -> anyhow::Result<Vec<ScheduledTask>> {
        let tasks: Vec<TaskRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rule_tasks AS t
            WHERE t.status = ? AND t.runat <= ?
            ORDER BY t.runat
            "#,
        )
        .bind(TaskStatus::Pending.as_str())
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        tasks.into_iter().map(ScheduledTask::try_from).collect()
    }

    async fn set_status(&self, task_id: &ID, status: TaskStatus) -> anyhow::Result<()> {
        sqlx::query("UPDATE booking_rule_tasks SET status = ? WHERE task_uid = ?")
            .bind(status.as_str())
            .bind(task_id.as_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_pending_by_rule(&self, rule_id: &ID) -> anyhow::Result<DeleteResult> {
        let res = sqlx::query("DELETE FROM booking_rule_tasks WHERE rule_uid = ? AND status = ?")
            .bind(rule_id.as_string())
            .bind(TaskStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;
        Ok(DeleteResult {
            deleted_count: res.rows_affected() as i64,
        })
    }
}
