use super::{render, unique_rows, Dialect, IConcernedRowsStore};
use booking_rules_domain::{
    query::{ComposedQuery, ResultRow, Value, ValueKind},
    StoreCapabilities,
};
use sqlx::{postgres::PgRow, PgPool, Row};

pub struct PostgresRowsStore {
    pool: PgPool,
}

impl PostgresRowsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode(row: &PgRow, query: &ComposedQuery) -> anyhow::Result<ResultRow> {
    let mut result = ResultRow::new();
    for item in &query.select {
        let value = match item.kind {
            ValueKind::Int => row.try_get::<Option<i64>, _>(item.alias.as_str())?.into(),
            ValueKind::Text => row.try_get::<Option<String>, _>(item.alias.as_str())?.into(),
        };
        result.insert(item.alias.clone(), value);
    }
    Ok(result)
}

#[async_trait::async_trait]
impl IConcernedRowsStore for PostgresRowsStore {
    fn capabilities(&self) -> StoreCapabilities {
        StoreCapabilities::postgres()
    }

    async fn fetch_rows(&self, query: &ComposedQuery) -> anyhow::Result<Vec<ResultRow>> {
        let rendered = render(query, Dialect::Postgres)?;
        let mut statement = sqlx::query(&rendered.sql);
        for param in rendered.params {
            statement = match param {
                Value::Int(v) => statement.bind(v),
                Value::Text(v) => statement.bind(v),
                Value::Null => statement.bind(None::<i64>),
            };
        }
        let rows = statement.fetch_all(&self.pool).await?;
        let rows = rows
            .iter()
            .map(|row| decode(row, query))
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(unique_rows(rows))
    }
}
