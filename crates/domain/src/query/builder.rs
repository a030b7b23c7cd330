use super::expr::{col, lit, Expr, Join, SelectItem, SortItem};
use super::value::{Value, ValueKind};
use std::collections::BTreeMap;
use thiserror::Error;

/// Alias of the first projected column, unique per option / optiondate / user.
pub const UNIQUE_KEY: &str = "uniqueid";
/// Alias of the column holding the concerned user
pub const USER_ID: &str = "userid";

const KEY_SEPARATOR: &str = "_";

#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    #[error("The query has no user in its uniqueness key, a condition must call `set_user`")]
    MissingUser,
    #[error("The join alias `{0}` is already used in this query")]
    DuplicateAlias(String),
    #[error("Parameter name `{0}` is invalid, only lowercase ascii letters, digits and `_` are allowed")]
    InvalidParamName(String),
    #[error("Json path segment `{0}` is invalid")]
    InvalidJsonPath(String),
}

/// Composable query used by rules and conditions to select concerned rows.
///
/// Rules seed it with the option table and the option (and optiondate)
/// part of the uniqueness key, conditions add the user part plus their own
/// joins and predicates. Parameters live in one flat namespace, so
/// `bind_param` mints a fresh name every time a name is reused
/// (`userid`, `userid2`, `userid3`, ...). Minting only depends on the order
/// of calls, so composing the same rule twice yields the same names.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_table: String,
    base_alias: String,
    key_parts: Vec<Expr>,
    user: Option<Expr>,
    columns: Vec<SelectItem>,
    joins: Vec<Join>,
    predicates: Vec<Expr>,
    sort: Vec<SortItem>,
    params: BTreeMap<String, Value>,
}

/// A fully composed query, ready to be rendered or evaluated.
/// The first `select` item is always the `uniqueid` key.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub select: Vec<SelectItem>,
    pub base_table: String,
    pub base_alias: String,
    pub joins: Vec<Join>,
    pub predicates: Vec<Expr>,
    pub sort: Vec<SortItem>,
    pub params: BTreeMap<String, Value>,
}

fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

impl QueryBuilder {
    pub fn new(base_table: &str, base_alias: &str) -> Self {
        Self {
            base_table: base_table.to_string(),
            base_alias: base_alias.to_string(),
            key_parts: Vec::new(),
            user: None,
            columns: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            sort: Vec::new(),
            params: BTreeMap::new(),
        }
    }

    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    /// Binds `value` and returns the parameter expression to use in
    /// predicates. If `name` is taken, a numeric suffix starting at 2 is
    /// appended until the name is free.
    pub fn bind_param<V: Into<Value>>(&mut self, name: &str, value: V) -> Result<Expr, QueryError> {
        if !valid_identifier(name) {
            return Err(QueryError::InvalidParamName(name.to_string()));
        }
        let mut candidate = name.to_string();
        let mut suffix = 2;
        while self.params.contains_key(&candidate) {
            candidate = format!("{}{}", name, suffix);
            suffix += 1;
        }
        self.params.insert(candidate.clone(), value.into());
        Ok(Expr::Param(candidate))
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn has_alias(&self, alias: &str) -> bool {
        self.base_alias == alias || self.joins.iter().any(|j| j.alias == alias)
    }

    pub fn add_join(&mut self, join: Join) -> Result<(), QueryError> {
        if self.has_alias(&join.alias) {
            return Err(QueryError::DuplicateAlias(join.alias));
        }
        if let super::expr::JoinSource::JsonRecords { path, .. } = &join.source {
            if let Some(segment) = path.iter().find(|s| !valid_identifier(s)) {
                return Err(QueryError::InvalidJsonPath(segment.clone()));
            }
        }
        self.joins.push(join);
        Ok(())
    }

    pub fn add_predicate(&mut self, predicate: Expr) {
        self.predicates.push(predicate);
    }

    pub fn add_sort(&mut self, expr: Expr, descending: bool) {
        self.sort.push(SortItem { expr, descending });
    }

    /// Appends a part to the uniqueness key, e.g. the option id or the
    /// optiondate id.
    pub fn push_key_part(&mut self, part: Expr) {
        self.key_parts.push(part);
    }

    /// Declares the concerned user: sets the `userid` column and makes the
    /// user the last part of the uniqueness key.
    pub fn set_user(&mut self, user: Expr) {
        self.set_column(USER_ID, user.clone(), ValueKind::Int);
        self.user = Some(user);
    }

    pub fn user(&self) -> Option<&Expr> {
        self.user.as_ref()
    }

    /// Sets a projected column, replacing a previous column with the same alias.
    pub fn set_column(&mut self, alias: &str, expr: Expr, kind: ValueKind) {
        let item = SelectItem {
            expr,
            alias: alias.to_string(),
            kind,
        };
        match self.columns.iter_mut().find(|c| c.alias == alias) {
            Some(existing) => *existing = item,
            None => self.columns.push(item),
        }
    }

    pub fn column(&self, alias: &str) -> Option<&Expr> {
        self.columns.iter().find(|c| c.alias == alias).map(|c| &c.expr)
    }

    pub fn build(self) -> Result<ComposedQuery, QueryError> {
        let user = self.user.ok_or(QueryError::MissingUser)?;

        let mut parts = Vec::with_capacity(self.key_parts.len() * 2 + 1);
        for part in self.key_parts {
            parts.push(part);
            parts.push(lit(KEY_SEPARATOR));
        }
        parts.push(user);

        let mut select = Vec::with_capacity(self.columns.len() + 1);
        select.push(SelectItem {
            expr: Expr::Concat(parts),
            alias: UNIQUE_KEY.to_string(),
            kind: ValueKind::Text,
        });
        select.extend(self.columns.into_iter().filter(|c| c.alias != UNIQUE_KEY));

        Ok(ComposedQuery {
            select,
            base_table: self.base_table,
            base_alias: self.base_alias,
            joins: self.joins,
            predicates: self.predicates,
            sort: self.sort,
            params: self.params,
        })
    }
}

impl ComposedQuery {
    pub fn column(&self, alias: &str) -> Option<&SelectItem> {
        self.select.iter().find(|c| c.alias == alias)
    }

    pub fn base_column(&self, column: &str) -> Expr {
        col(&self.base_alias, column)
    }
}
