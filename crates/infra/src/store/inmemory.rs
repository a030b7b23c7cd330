use super::{unique_rows, IConcernedRowsStore};
use anyhow::{anyhow, bail};
use booking_rules_domain::{
    query::{
        ArithOp, CompareOp, ComposedQuery, Expr, Join, JoinKind, JoinSource, JsonColumn,
        ResultRow, Value, ValueKind, MAX_SPLIT_IDS, SPLIT_VALUE_COLUMN,
    },
    StoreCapabilities, TableRecord,
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

/// Rows of the joined tables visible while evaluating one result row.
/// `None` marks the missing side of a left join.
type Scope = BTreeMap<String, Option<ResultRow>>;

/// Evaluates composed queries over in-memory tables. Used by tests and
/// local runs, it follows SQL semantics (three valued logic, left joins,
/// lateral list and json expansion) for the constructs of the query AST.
pub struct InMemoryRowsStore {
    capabilities: StoreCapabilities,
    tables: Mutex<HashMap<String, Vec<ResultRow>>>,
}

impl InMemoryRowsStore {
    pub fn new(capabilities: StoreCapabilities) -> Self {
        Self {
            capabilities,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts the record or replaces the record with the same id
    pub fn insert<T: TableRecord>(&self, record: &T) {
        let mut tables = self.tables.lock().unwrap();
        let table = tables.entry(T::TABLE.to_string()).or_insert_with(Vec::new);
        let id = Value::Int(record.record_id());
        let row = record.to_row();
        match table.iter_mut().find(|r| r.get("id") == Some(&id)) {
            Some(existing) => *existing = row,
            None => table.push(row),
        }
    }

    pub fn delete<T: TableRecord>(&self, id: i64) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(table) = tables.get_mut(T::TABLE) {
            table.retain(|r| r.get("id") != Some(&Value::Int(id)));
        }
    }

    fn table(&self, name: &str) -> Vec<ResultRow> {
        let tables = self.tables.lock().unwrap();
        tables.get(name).cloned().unwrap_or_default()
    }
}

fn truth(value: &Value) -> Option<bool> {
    match value {
        Value::Null => None,
        v => v.as_i64().map(|v| v != 0),
    }
}

fn boolean(value: Option<bool>) -> Value {
    match value {
        Some(true) => Value::Int(1),
        Some(false) => Value::Int(0),
        None => Value::Null,
    }
}

struct Evaluator<'a> {
    params: &'a BTreeMap<String, Value>,
}

impl<'a> Evaluator<'a> {
    fn eval(&self, expr: &Expr, scope: &Scope) -> anyhow::Result<Value> {
        let value = match expr {
            Expr::Column(column) => match scope.get(&column.table) {
                None => bail!("Unknown table alias `{}`", column.table),
                Some(None) => Value::Null,
                Some(Some(row)) => row.get(&column.column).cloned().ok_or_else(|| {
                    anyhow!("Unknown column `{}.{}`", column.table, column.column)
                })?,
            },
            Expr::Param(name) => self
                .params
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("Parameter `{}` is used but was never bound", name))?,
            Expr::Literal(value) => value.clone(),
            Expr::True => Value::Int(1),
            Expr::Compare(op, a, b) => {
                let (a, b) = (self.eval(a, scope)?, self.eval(b, scope)?);
                if a.is_null() || b.is_null() {
                    Value::Null
                } else {
                    let ord = a.sql_cmp(&b);
                    boolean(Some(match op {
                        CompareOp::Eq => ord == Ordering::Equal,
                        CompareOp::NotEq => ord != Ordering::Equal,
                        CompareOp::Lt => ord == Ordering::Less,
                        CompareOp::Le => ord != Ordering::Greater,
                        CompareOp::Gt => ord == Ordering::Greater,
                        CompareOp::Ge => ord != Ordering::Less,
                    }))
                }
            }
            Expr::TextEquals(a, b) => {
                match (self.eval(a, scope)?.as_text(), self.eval(b, scope)?.as_text()) {
                    (Some(a), Some(b)) => boolean(Some(a == b)),
                    _ => Value::Null,
                }
            }
            Expr::Contains { haystack, needle } => match (
                self.eval(haystack, scope)?.as_text(),
                self.eval(needle, scope)?.as_text(),
            ) {
                (Some(h), Some(n)) => boolean(Some(h.to_lowercase().contains(&n.to_lowercase()))),
                _ => Value::Null,
            },
            Expr::StartsWith { haystack, prefix } => match (
                self.eval(haystack, scope)?.as_text(),
                self.eval(prefix, scope)?.as_text(),
            ) {
                (Some(h), Some(p)) => boolean(Some(h.starts_with(&p))),
                _ => Value::Null,
            },
            Expr::Arith(op, a, b) => {
                match (self.eval(a, scope)?.as_i64(), self.eval(b, scope)?.as_i64()) {
                    (Some(a), Some(b)) => {
                        let result = match op {
                            ArithOp::Add => a.checked_add(b),
                            ArithOp::Sub => a.checked_sub(b),
                            ArithOp::Mul => a.checked_mul(b),
                        };
                        Value::Int(result.ok_or_else(|| {
                            anyhow!("Integer out of range in {:?} of {} and {}", op, a, b)
                        })?)
                    }
                    _ => Value::Null,
                }
            }
            Expr::Concat(parts) => {
                let mut text = String::new();
                for part in parts {
                    if let Some(part) = self.eval(part, scope)?.as_text() {
                        text.push_str(&part);
                    }
                }
                Value::Text(text)
            }
            Expr::ToInt(e) => self.eval(e, scope)?.as_i64().into(),
            Expr::Coalesce(parts) => {
                for part in parts {
                    let value = self.eval(part, scope)?;
                    if !value.is_null() {
                        return Ok(value);
                    }
                }
                Value::Null
            }
            Expr::And(parts) => {
                let mut result = Some(true);
                for part in parts {
                    match truth(&self.eval(part, scope)?) {
                        Some(false) => return Ok(boolean(Some(false))),
                        None => result = None,
                        Some(true) => {}
                    }
                }
                boolean(result)
            }
            Expr::Or(parts) => {
                let mut result = Some(false);
                for part in parts {
                    match truth(&self.eval(part, scope)?) {
                        Some(true) => return Ok(boolean(Some(true))),
                        None => result = None,
                        Some(false) => {}
                    }
                }
                boolean(result)
            }
            Expr::Not(e) => boolean(truth(&self.eval(e, scope)?).map(|v| !v)),
            Expr::IsNull(e) => boolean(Some(self.eval(e, scope)?.is_null())),
            Expr::IsNotNull(e) => boolean(Some(!self.eval(e, scope)?.is_null())),
            Expr::InList(e, items) => {
                let value = self.eval(e, scope)?;
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut result = Some(false);
                for item in items {
                    let item = self.eval(item, scope)?;
                    if item.is_null() {
                        result = None;
                    } else if value.sql_cmp(&item) == Ordering::Equal {
                        return Ok(boolean(Some(true)));
                    }
                }
                boolean(result)
            }
        };
        Ok(value)
    }

    fn holds(&self, predicate: &Expr, scope: &Scope) -> anyhow::Result<bool> {
        Ok(truth(&self.eval(predicate, scope)?) == Some(true))
    }
}

fn json_value(value: Option<&serde_json::Value>, kind: ValueKind) -> Value {
    match (value, kind) {
        (None, _) | (Some(serde_json::Value::Null), _) => Value::Null,
        (Some(serde_json::Value::Number(n)), ValueKind::Int) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .into(),
        (Some(serde_json::Value::String(s)), ValueKind::Int) => Value::Text(s.clone()).as_i64().into(),
        (Some(serde_json::Value::Bool(b)), ValueKind::Int) => Value::Int(*b as i64),
        (Some(serde_json::Value::String(s)), ValueKind::Text) => Value::Text(s.clone()),
        (Some(other), ValueKind::Text) => Value::Text(other.to_string()),
        (Some(_), ValueKind::Int) => Value::Null,
    }
}

fn json_records(document: &Value, path: &[String], columns: &[JsonColumn]) -> anyhow::Result<Vec<ResultRow>> {
    let document = match document.as_text() {
        Some(document) => document,
        None => return Ok(vec![]),
    };
    let document: serde_json::Value = serde_json::from_str(&document)?;
    let records = path
        .iter()
        .try_fold(&document, |node, segment| node.get(segment))
        .and_then(|node| node.as_array());
    let records = match records {
        Some(records) => records,
        None => return Ok(vec![]),
    };
    Ok(records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|c| (c.name.clone(), json_value(record.get(&c.key), c.kind)))
                .collect()
        })
        .collect())
}

fn split_ids(list: &Value) -> Vec<ResultRow> {
    let list = match list.as_text() {
        Some(list) => list,
        None => return vec![],
    };
    list.split(',')
        .take(MAX_SPLIT_IDS)
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let mut row = ResultRow::new();
            row.insert(SPLIT_VALUE_COLUMN.to_string(), Value::Text(entry.to_string()));
            row
        })
        .collect()
}

impl InMemoryRowsStore {
    fn candidates(&self, join: &Join, evaluator: &Evaluator, scope: &Scope) -> anyhow::Result<Vec<ResultRow>> {
        match &join.source {
            JoinSource::Table(table) => Ok(self.table(table)),
            JoinSource::SplitIds(list) => {
                if self.capabilities.split_strategy.is_none() {
                    bail!(
                        "{} databases can not split comma separated lists",
                        self.capabilities.family
                    );
                }
                Ok(split_ids(&evaluator.eval(list, scope)?))
            }
            JoinSource::JsonRecords {
                document,
                path,
                columns,
            } => {
                if !self.capabilities.json_records {
                    bail!(
                        "{} databases can not expand json documents into records",
                        self.capabilities.family
                    );
                }
                json_records(&evaluator.eval(document, scope)?, path, columns)
            }
        }
    }

    fn evaluate(&self, query: &ComposedQuery) -> anyhow::Result<Vec<ResultRow>> {
        let evaluator = Evaluator {
            params: &query.params,
        };

        let mut scopes: Vec<Scope> = self
            .table(&query.base_table)
            .into_iter()
            .map(|row| {
                let mut scope = Scope::new();
                scope.insert(query.base_alias.clone(), Some(row));
                scope
            })
            .collect();

        for join in &query.joins {
            let mut joined = Vec::new();
            for scope in scopes {
                let mut matched = false;
                for candidate in self.candidates(join, &evaluator, &scope)? {
                    let mut next = scope.clone();
                    next.insert(join.alias.clone(), Some(candidate));
                    if evaluator.holds(&join.on, &next)? {
                        matched = true;
                        joined.push(next);
                    }
                }
                if !matched && join.kind == JoinKind::Left {
                    let mut next = scope;
                    next.insert(join.alias.clone(), None);
                    joined.push(next);
                }
            }
            scopes = joined;
        }

        let mut selected = Vec::new();
        for scope in scopes {
            let mut keep = true;
            for predicate in &query.predicates {
                if !evaluator.holds(predicate, &scope)? {
                    keep = false;
                    break;
                }
            }
            if keep {
                let mut sort_key = Vec::with_capacity(query.sort.len());
                for item in &query.sort {
                    sort_key.push(evaluator.eval(&item.expr, &scope)?);
                }
                selected.push((sort_key, scope));
            }
        }

        selected.sort_by(|(a, _), (b, _)| {
            for ((a, b), item) in a.iter().zip(b.iter()).zip(query.sort.iter()) {
                let ord = a.sql_cmp(b);
                let ord = if item.descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let mut rows = Vec::with_capacity(selected.len());
        for (_, scope) in selected {
            let mut row = ResultRow::new();
            for item in &query.select {
                let value = evaluator.eval(&item.expr, &scope)?;
                let value = match item.kind {
                    ValueKind::Int => value.as_i64().into(),
                    ValueKind::Text => value.as_text().into(),
                };
                row.insert(item.alias.clone(), value);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

#[async_trait::async_trait]
impl IConcernedRowsStore for InMemoryRowsStore {
    fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    async fn fetch_rows(&self, query: &ComposedQuery) -> anyhow::Result<Vec<ResultRow>> {
        Ok(unique_rows(self.evaluate(query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use booking_rules_domain::{
        query::{col, lit, QueryBuilder, UNIQUE_KEY},
        BookingOption, DatabaseFamily, Installment, InstallmentPlan, PaymentHistory, User,
    };

    fn store() -> InMemoryRowsStore {
        let store = InMemoryRowsStore::new(StoreCapabilities::postgres());
        for id in 1..=3 {
            store.insert(&User::new(id, &format!("user{}", id)));
        }
        let mut option = BookingOption::new(10, 1);
        option.responsiblecontact = Some("1, 3".into());
        store.insert(&option);
        store
    }

    fn option_query() -> QueryBuilder {
        let mut query = QueryBuilder::new("booking_options", "bo");
        query.push_key_part(col("bo", "id"));
        query
    }

    #[tokio::test]
    async fn splits_lists_and_joins_users() {
        let store = store();
        let mut query = option_query();
        query
            .add_join(Join {
                kind: JoinKind::Inner,
                source: JoinSource::SplitIds(col("bo", "responsiblecontact")),
                alias: "rc".into(),
                on: Expr::True,
            })
            .unwrap();
        query
            .add_join(Join::inner(
                "user",
                "u",
                col("u", "id").eq(col("rc", SPLIT_VALUE_COLUMN).to_int()),
            ))
            .unwrap();
        query.set_user(col("u", "id"));

        let rows = store.fetch_rows(&query.build().unwrap()).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r[UNIQUE_KEY].clone()).collect();
        assert_eq!(keys, vec![Value::Text("10_1".into()), Value::Text("10_3".into())]);
    }

    #[tokio::test]
    async fn skips_empty_list_entries() {
        let store = store();
        let mut trailing = BookingOption::new(11, 1);
        trailing.responsiblecontact = Some("2,".into());
        store.insert(&trailing);
        let mut empty = BookingOption::new(12, 1);
        empty.responsiblecontact = Some("".into());
        store.insert(&empty);
        let mut query = option_query();
        query
            .add_join(Join {
                kind: JoinKind::Inner,
                source: JoinSource::SplitIds(col("bo", "responsiblecontact")),
                alias: "rc".into(),
                on: Expr::True,
            })
            .unwrap();
        query.set_user(col("rc", SPLIT_VALUE_COLUMN).to_int());

        let rows = store.fetch_rows(&query.build().unwrap()).await.unwrap();
        let keys: Vec<_> = rows.iter().map(|r| r[UNIQUE_KEY].clone()).collect();
        assert_eq!(
            keys,
            vec![
                Value::Text("10_1".into()),
                Value::Text("10_3".into()),
                Value::Text("11_2".into())
            ]
        );
    }

    #[test]
    fn reads_at_most_the_capped_number_of_entries() {
        let list = (1..=MAX_SPLIT_IDS + 5)
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(split_ids(&Value::Text(list)).len(), MAX_SPLIT_IDS);
    }

    #[tokio::test]
    async fn containment_is_literal_and_case_insensitive() {
        let store = store();
        let mut query = option_query();
        query.set_user(col("bo", "id"));
        query.add_predicate(lit("Get 50% OFF today").contains(lit("50% off")));
        assert_eq!(store.fetch_rows(&query.build().unwrap()).await.unwrap().len(), 1);

        let mut query = option_query();
        query.set_user(col("bo", "id"));
        query.add_predicate(lit("Get 50 percent off").contains(lit("50%off")));
        assert!(store.fetch_rows(&query.build().unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflowing_arithmetic_is_an_error() {
        let store = store();
        let mut query = option_query();
        query.set_user(col("bo", "id"));
        query.add_predicate(lit(i64::MAX).add(lit(1)).gt(lit(0)));
        assert!(store.fetch_rows(&query.build().unwrap()).await.is_err());
    }

    #[tokio::test]
    async fn left_joins_keep_unmatched_rows_with_nulls() {
        let store = store();
        let mut query = QueryBuilder::new("user", "u");
        query
            .add_join(Join::left(
                "booking_options",
                "bo",
                col("bo", "id").eq(col("u", "id")),
            ))
            .unwrap();
        query.set_user(col("u", "id"));
        query.set_column("optionid", col("bo", "id"), ValueKind::Int);
        query.add_predicate(col("bo", "id").is_null());

        let rows = store.fetch_rows(&query.build().unwrap()).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r["optionid"] == Value::Null));
    }

    #[tokio::test]
    async fn null_comparisons_never_hold() {
        let store = store();
        let mut query = option_query();
        query.add_join(Join::inner("user", "u", Expr::True)).unwrap();
        query.set_user(col("u", "id"));
        query.add_predicate(col("bo", "coursestarttime").ge(lit(0)).negate());
        assert!(store.fetch_rows(&query.build().unwrap()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn keeps_the_first_row_per_unique_key_after_sorting() {
        let store = store();
        let mut query = option_query();
        query.add_join(Join::inner("user", "u", Expr::True)).unwrap();
        query.set_user(lit(7));
        query.set_column("username", col("u", "username"), ValueKind::Text);
        query.add_sort(col("u", "id"), true);

        let rows = store.fetch_rows(&query.build().unwrap()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], Value::Text("user3".into()));
    }

    #[tokio::test]
    async fn expands_json_records() {
        let store = store();
        store.insert(&PaymentHistory::new(
            1,
            10,
            2,
            InstallmentPlan {
                payments: vec![
                    Installment {
                        timestamp: 100,
                        price: 10.0,
                        paid: 1,
                    },
                    Installment {
                        timestamp: 200,
                        price: 10.0,
                        paid: 0,
                    },
                ],
            },
        ));
        let mut query = option_query();
        query
            .add_join(Join::inner(
                "booking_payment_history",
                "ph",
                col("ph", "optionid").eq(col("bo", "id")),
            ))
            .unwrap();
        query
            .add_join(Join {
                kind: JoinKind::Inner,
                source: JoinSource::JsonRecords {
                    document: col("ph", "json"),
                    path: vec!["installments".into(), "payments".into()],
                    columns: vec![
                        JsonColumn {
                            name: "duedate".into(),
                            key: "timestamp".into(),
                            kind: ValueKind::Int,
                        },
                        JsonColumn {
                            name: "paid".into(),
                            key: "paid".into(),
                            kind: ValueKind::Int,
                        },
                    ],
                },
                alias: "inst".into(),
                on: Expr::True,
            })
            .unwrap();
        query.add_predicate(col("inst", "paid").eq(lit(0)));
        query.set_user(col("ph", "userid"));
        query.set_column("datefield", col("inst", "duedate"), ValueKind::Int);

        let rows = store.fetch_rows(&query.build().unwrap()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["datefield"], Value::Int(200));
    }

    #[tokio::test]
    async fn fails_loudly_without_capabilities() {
        let store = InMemoryRowsStore::new(StoreCapabilities::negotiate(DatabaseFamily::Other, None));
        store.insert(&BookingOption::new(1, 1));
        let mut query = option_query();
        query
            .add_join(Join {
                kind: JoinKind::Inner,
                source: JoinSource::SplitIds(col("bo", "responsiblecontact")),
                alias: "rc".into(),
                on: Expr::True,
            })
            .unwrap();
        query.set_user(col("rc", SPLIT_VALUE_COLUMN));
        assert!(store.fetch_rows(&query.build().unwrap()).await.is_err());

        let mut query = option_query();
        query.set_user(Expr::Param("userid".into()));
        assert!(store.fetch_rows(&query.build().unwrap()).await.is_err());
    }
}
