use booking_rules_domain::query::{
    ArithOp, CompareOp, ComposedQuery, Expr, Join, JoinKind, JoinSource, JsonColumn, Value,
    ValueKind, MAX_SPLIT_IDS, SPLIT_VALUE_COLUMN,
};
use sea_query::{
    Alias, BinOper, Expr as SqlExpr, Func, IntoIden, JoinType, MysqlQueryBuilder, Order,
    PostgresQueryBuilder, Query, QueryStatementWriter, SelectStatement, SimpleExpr, TableRef,
    UnOper, UnionType, Value as SqlValue,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
}

#[derive(Error, Debug, PartialEq)]
pub enum RenderError {
    #[error("Parameter `{0}` is used but was never bound")]
    UnboundParam(String),
    #[error("`{0}` is not a valid identifier")]
    InvalidIdentifier(String),
    #[error("Can not bind the value `{0}`")]
    UnsupportedValue(String),
}

/// SQL text with positional placeholders and the values to bind, in order
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn checked(name: &str) -> Result<&str, RenderError> {
    if !valid_identifier(name) {
        return Err(RenderError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

fn iden(name: &str) -> Result<Alias, RenderError> {
    checked(name).map(Alias::new)
}

fn raw<S: Into<String>>(sql: S) -> SimpleExpr {
    SqlExpr::cust(sql).into()
}

fn binary(left: SimpleExpr, op: BinOper, right: SimpleExpr) -> SimpleExpr {
    SimpleExpr::Binary(Box::new(left), op, Box::new(right))
}

fn call(function: &str, args: Vec<SimpleExpr>) -> SimpleExpr {
    Func::cust(Alias::new(function)).args(args).into()
}

fn cast(expr: SimpleExpr, to: &str) -> SimpleExpr {
    Func::cast_as(expr, Alias::new(to)).into()
}

fn text(value: &str) -> SimpleExpr {
    SqlExpr::val(value).into()
}

fn column(table: &str, name: &str) -> Result<SimpleExpr, RenderError> {
    Ok(SqlExpr::col((iden(table)?, iden(name)?)).into())
}

fn join_type(kind: JoinKind) -> JoinType {
    match kind {
        JoinKind::Inner => JoinType::InnerJoin,
        JoinKind::Left => JoinType::LeftJoin,
    }
}

/// `SELECT 0 AS n UNION ALL SELECT 1 ... UNION ALL SELECT 9`
fn digits() -> SelectStatement {
    let mut digits = Query::select();
    digits.expr_as(raw("0"), Alias::new("n"));
    for digit in 1..10 {
        digits.union(
            UnionType::All,
            Query::select().expr(raw(digit.to_string())).to_owned(),
        );
    }
    digits
}

/// Numbers 1 to `MAX_SPLIT_IDS`, used to split comma separated lists on
/// MySQL
fn number_sequence() -> SelectStatement {
    let n = |table: &str| -> SimpleExpr {
        SqlExpr::col((Alias::new(table), Alias::new("n"))).into()
    };
    let tens = binary(n("tens"), BinOper::Mul, raw("10"));
    let mut numbers = Query::select();
    numbers
        .expr_as(
            binary(binary(n("units"), BinOper::Add, tens), BinOper::Add, raw("1")),
            Alias::new("n"),
        )
        .from_subquery(digits(), Alias::new("units"))
        .from_subquery(digits(), Alias::new("tens"));
    numbers
}

struct Renderer<'a> {
    dialect: Dialect,
    params: &'a BTreeMap<String, Value>,
    /// MySQL only: split aliases and the list they split. References to
    /// their `value` column are replaced by the extracted list entry.
    split_sources: HashMap<String, Expr>,
}

impl<'a> Renderer<'a> {
    fn new(dialect: Dialect, query: &'a ComposedQuery) -> Self {
        let mut split_sources = HashMap::new();
        if dialect == Dialect::MySql {
            for join in &query.joins {
                if let JoinSource::SplitIds(source) = &join.source {
                    split_sources.insert(join.alias.clone(), source.clone());
                }
            }
        }
        Self {
            dialect,
            params: &query.params,
            split_sources,
        }
    }

    fn bigint(&self) -> &'static str {
        match self.dialect {
            Dialect::Postgres => "BIGINT",
            Dialect::MySql => "SIGNED",
        }
    }

    fn text_type(&self) -> &'static str {
        match self.dialect {
            Dialect::Postgres => "TEXT",
            Dialect::MySql => "CHAR",
        }
    }

    fn value(&self, value: &Value) -> SimpleExpr {
        match value {
            Value::Int(v) => SqlExpr::val(*v).into(),
            Value::Text(v) => SqlExpr::val(v.as_str()).into(),
            Value::Null => raw("NULL"),
        }
    }

    fn fold(&self, parts: &[Expr], op: BinOper, empty: &str) -> Result<SimpleExpr, RenderError> {
        let mut parts = parts.iter();
        let first = match parts.next() {
            Some(first) => self.expr(first)?,
            None => return Ok(raw(empty)),
        };
        parts.try_fold(first, |acc, part| Ok(binary(acc, op.clone(), self.expr(part)?)))
    }

    fn list(&self, exprs: &[Expr]) -> Result<Vec<SimpleExpr>, RenderError> {
        exprs.iter().map(|e| self.expr(e)).collect()
    }

    /// The entry `alias.n` of a comma separated list, trimmed
    fn split_entry(&self, alias: &str, source: &Expr) -> Result<SimpleExpr, RenderError> {
        let upto = call(
            "SUBSTRING_INDEX",
            vec![self.expr(source)?, text(","), column(alias, "n")?],
        );
        let last = call("SUBSTRING_INDEX", vec![upto, text(","), SqlExpr::val(-1).into()]);
        Ok(call("TRIM", vec![last]))
    }

    /// Literal containment, case insensitive. Wildcards in `needle` match
    /// themselves.
    fn contains(&self, haystack: SimpleExpr, needle: SimpleExpr) -> SimpleExpr {
        let (haystack, needle) = (call("LOWER", vec![haystack]), call("LOWER", vec![needle]));
        let position = match self.dialect {
            Dialect::Postgres => call("STRPOS", vec![haystack, needle]),
            Dialect::MySql => call("LOCATE", vec![needle, haystack]),
        };
        binary(position, BinOper::GreaterThan, raw("0"))
    }

    fn starts_with(&self, haystack: SimpleExpr, prefix: SimpleExpr) -> SimpleExpr {
        let position = match self.dialect {
            Dialect::Postgres => call("STRPOS", vec![haystack, prefix]),
            Dialect::MySql => call("LOCATE", vec![prefix, haystack]),
        };
        binary(position, BinOper::Equal, raw("1"))
    }

    fn expr(&self, expr: &Expr) -> Result<SimpleExpr, RenderError> {
        let sql = match expr {
            Expr::Column(c) => {
                if c.column == SPLIT_VALUE_COLUMN {
                    if let Some(source) = self.split_sources.get(&c.table) {
                        return self.split_entry(&c.table, source);
                    }
                }
                column(&c.table, &c.column)?
            }
            Expr::Param(name) => {
                let value = self
                    .params
                    .get(name)
                    .ok_or_else(|| RenderError::UnboundParam(name.clone()))?;
                self.value(value)
            }
            Expr::Literal(value) => self.value(value),
            Expr::True => raw("1=1"),
            Expr::Compare(op, a, b) => {
                let op = match op {
                    CompareOp::Eq => BinOper::Equal,
                    CompareOp::NotEq => BinOper::NotEqual,
                    CompareOp::Lt => BinOper::SmallerThan,
                    CompareOp::Le => BinOper::SmallerThanOrEqual,
                    CompareOp::Gt => BinOper::GreaterThan,
                    CompareOp::Ge => BinOper::GreaterThanOrEqual,
                };
                binary(self.expr(a)?, op, self.expr(b)?)
            }
            Expr::TextEquals(a, b) => binary(self.expr(a)?, BinOper::Equal, self.expr(b)?),
            Expr::Contains { haystack, needle } => {
                self.contains(self.expr(haystack)?, self.expr(needle)?)
            }
            Expr::StartsWith { haystack, prefix } => {
                self.starts_with(self.expr(haystack)?, self.expr(prefix)?)
            }
            Expr::Arith(op, a, b) => {
                let op = match op {
                    ArithOp::Add => BinOper::Add,
                    ArithOp::Sub => BinOper::Sub,
                    ArithOp::Mul => BinOper::Mul,
                };
                binary(self.expr(a)?, op, self.expr(b)?)
            }
            Expr::Concat(parts) => call("CONCAT", self.list(parts)?),
            Expr::ToInt(e) => cast(self.expr(e)?, self.bigint()),
            Expr::Coalesce(parts) => Func::coalesce(self.list(parts)?).into(),
            Expr::And(parts) => self.fold(parts, BinOper::And, "1=1")?,
            Expr::Or(parts) => self.fold(parts, BinOper::Or, "1=0")?,
            Expr::Not(e) => SimpleExpr::Unary(UnOper::Not, Box::new(self.expr(e)?)),
            Expr::IsNull(e) => binary(self.expr(e)?, BinOper::Is, raw("NULL")),
            Expr::IsNotNull(e) => binary(self.expr(e)?, BinOper::IsNot, raw("NULL")),
            Expr::InList(_, items) if items.is_empty() => raw("1=0"),
            Expr::InList(e, items) => binary(
                self.expr(e)?,
                BinOper::In,
                SimpleExpr::Tuple(self.list(items)?),
            ),
        };
        Ok(sql)
    }

    fn json_column(&self, column: &JsonColumn) -> Result<String, RenderError> {
        let name = checked(&column.name)?;
        let key = checked(&column.key)?;
        Ok(match column.kind {
            ValueKind::Int => format!("{} BIGINT PATH '$.{}'", name, key),
            ValueKind::Text => format!("{} VARCHAR(255) PATH '$.{}'", name, key),
        })
    }

    fn join(&self, select: &mut SelectStatement, join: &Join) -> Result<(), RenderError> {
        let kind = join_type(join.kind);
        let alias = iden(&join.alias)?;
        let on = self.expr(&join.on)?;
        match (&join.source, self.dialect) {
            (JoinSource::Table(table), _) => {
                select.join_as(kind, iden(table)?, alias, on);
            }
            (JoinSource::SplitIds(source), Dialect::Postgres) => {
                let entry = call(
                    "TRIM",
                    vec![call(
                        "split_part",
                        vec![self.expr(source)?, text(","), SqlExpr::col(Alias::new("n")).into()],
                    )],
                );
                let series = Func::cust(Alias::new("generate_series"))
                    .args(vec![raw("1"), raw(MAX_SPLIT_IDS.to_string())]);
                let mut entries = Query::select();
                entries
                    .expr_as(entry.clone(), Alias::new(SPLIT_VALUE_COLUMN))
                    .from_function(series, Alias::new("n"))
                    .and_where(binary(entry, BinOper::NotEqual, text("")));
                select.join_lateral(kind, entries, alias, on);
            }
            (JoinSource::SplitIds(source), Dialect::MySql) => {
                let length = |e: SimpleExpr| call("CHAR_LENGTH", vec![e]);
                let list = self.expr(source)?;
                let without_commas = call("REPLACE", vec![list.clone(), text(","), text("")]);
                let entries = binary(
                    binary(raw("1"), BinOper::Add, length(list)),
                    BinOper::Sub,
                    length(without_commas),
                );
                let condition = binary(
                    binary(
                        binary(column(&join.alias, "n")?, BinOper::SmallerThanOrEqual, entries),
                        BinOper::And,
                        binary(
                            self.split_entry(&join.alias, source)?,
                            BinOper::NotEqual,
                            text(""),
                        ),
                    ),
                    BinOper::And,
                    on,
                );
                select.join_subquery(kind, number_sequence(), alias, condition);
            }
            (
                JoinSource::JsonRecords {
                    document,
                    path,
                    columns,
                },
                Dialect::Postgres,
            ) => {
                let mut location = vec![cast(self.expr(document)?, "jsonb")];
                for segment in path {
                    location.push(text(checked(segment)?));
                }
                let elements = Func::cust(Alias::new("jsonb_array_elements"))
                    .arg(call("jsonb_extract_path", location));
                let mut records = Query::select();
                for c in columns {
                    let field = call(
                        "jsonb_extract_path_text",
                        vec![SqlExpr::col(Alias::new("rec")).into(), text(checked(&c.key)?)],
                    );
                    let field = match c.kind {
                        ValueKind::Int => cast(field, "BIGINT"),
                        ValueKind::Text => field,
                    };
                    records.expr_as(field, iden(&c.name)?);
                }
                records.from_function(elements, Alias::new("rec"));
                select.join_lateral(kind, records, alias, on);
            }
            (
                JoinSource::JsonRecords {
                    document,
                    path,
                    columns,
                },
                Dialect::MySql,
            ) => {
                let path = path
                    .iter()
                    .map(|segment| checked(segment))
                    .collect::<Result<Vec<_>, _>>()?;
                let columns = columns
                    .iter()
                    .map(|c| self.json_column(c))
                    .collect::<Result<Vec<_>, _>>()?
                    .join(", ");
                let table = Func::cust(Alias::new("JSON_TABLE"))
                    .arg(self.expr(document)?)
                    .arg(raw(format!("'$.{}[*]' COLUMNS ({})", path.join("."), columns)));
                select.join(kind, TableRef::FunctionCall(table, alias.into_iden()), on);
            }
        }
        Ok(())
    }
}

fn bound(values: Vec<SqlValue>) -> Result<Vec<Value>, RenderError> {
    values
        .into_iter()
        .map(|value| match value {
            SqlValue::BigInt(v) => Ok(v.into()),
            SqlValue::Int(v) => Ok(v.map(i64::from).into()),
            SqlValue::String(v) => Ok(v.map(|s| *s).into()),
            other => Err(RenderError::UnsupportedValue(format!("{:?}", other))),
        })
        .collect()
}

/// Renders a composed query to SQL. Every item of the select list is cast
/// to its declared kind so that rows decode the same way on every database.
pub fn render(query: &ComposedQuery, dialect: Dialect) -> Result<RenderedQuery, RenderError> {
    let r = Renderer::new(dialect, query);

    let mut select = Query::select();
    for item in &query.select {
        let kind = match item.kind {
            ValueKind::Int => r.bigint(),
            ValueKind::Text => r.text_type(),
        };
        select.expr_as(cast(r.expr(&item.expr)?, kind), iden(&item.alias)?);
    }
    select.from_as(iden(&query.base_table)?, iden(&query.base_alias)?);
    for join in &query.joins {
        r.join(&mut select, join)?;
    }
    for predicate in &query.predicates {
        select.and_where(r.expr(predicate)?);
    }
    for item in &query.sort {
        let order = if item.descending { Order::Desc } else { Order::Asc };
        select.order_by_expr(r.expr(&item.expr)?, order);
    }

    let (sql, values) = match dialect {
        Dialect::Postgres => select.build(PostgresQueryBuilder),
        Dialect::MySql => select.build(MysqlQueryBuilder),
    };
    Ok(RenderedQuery {
        sql,
        params: bound(values.0)?,
    })
}
