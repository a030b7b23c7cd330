use super::IRuleRepo;
use booking_rules_domain::{BookingRule, RuleType, ID};
use sqlx::{FromRow, MySqlPool};
use std::convert::TryFrom;

pub struct MySqlRuleRepo {
    pool: MySqlPool,
}

impl MySqlRuleRepo {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RuleRaw {
    rule_uid: String,
    contextid: i64,
    ruletype: String,
    isactive: bool,
    rulejson: String,
}

impl TryFrom<RuleRaw> for BookingRule {
    type Error = anyhow::Error;

    fn try_from(raw: RuleRaw) -> anyhow::Result<Self> {
        Ok(Self {
            id: raw.rule_uid.parse()?,
            contextid: raw.contextid,
            ruletype: raw.ruletype.parse()?,
            isactive: raw.isactive,
            rulejson: raw.rulejson,
        })
    }
}

#[async_trait::async_trait]
impl IRuleRepo for MySqlRuleRepo {
    async fn insert(&self, rule: &BookingRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_rules(rule_uid, contextid, ruletype, isactive, rulejson)
            VALUES(?, ?, ?, ?, ?)
            "#,
        )
        .bind(rule.id.as_string())
        .bind(rule.contextid)
        .bind(rule.ruletype.as_str())
        .bind(rule.isactive)
        .bind(&rule.rulejson)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save(&self, rule: &BookingRule) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE booking_rules
            SET contextid = ?,
                ruletype = ?,
                isactive = ?,
                rulejson = ?
            WHERE rule_uid = ?
            "#,
        )
        .bind(rule.contextid)
        .bind(rule.ruletype.as_str())
        .bind(rule.isactive)
        .bind(&rule.rulejson)
        .bind(rule.id.as_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find(&self, rule_id: &ID) -> Option<BookingRule> {
        let raw: RuleRaw = sqlx::query_as(
            r#"
            SELECT * FROM booking_rules AS r
            WHERE r.rule_uid = ?
            "#,
        )
        .bind(rule_id.as_string())
        .fetch_optional(&self.pool)
        .await
        .ok()??;
        BookingRule::try_from(raw).ok()
    }

    async fn find_active_by_type(&self, ruletype: RuleType) -> anyhow::Result<Vec<BookingRule>> {
        let rules: Vec<RuleRaw> = sqlx::query_as(
            r#"
            SELECT * FROM booking_rules AS r
            WHERE r.isactive = TRUE AND r.ruletype = ?
            "#,
        )
        .bind(ruletype.as_str())
        .fetch_all(&self.pool)
        .await?;
        rules.into_iter().map(BookingRule::try_from).collect()
    }

    async fn delete(&self, rule_id: &ID) -> Option<BookingRule> {
        // MySQL has no DELETE ... RETURNING
        let rule = self.find(rule_id).await?;
        sqlx::query("DELETE FROM booking_rules WHERE rule_uid = ?")
            .bind(rule_id.as_string())
            .execute(&self.pool)
            .await
            .ok()?;
        Some(rule)
    }
}
