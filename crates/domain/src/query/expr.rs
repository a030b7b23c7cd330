use super::value::{Value, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

/// Expression tree of a composed query.
///
/// It is deliberately small: it only knows the constructs the conditions and
/// rules need, and every construct has a rendering for each supported SQL
/// dialect as well as an in-memory evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    /// Reference to a bound parameter. Only `QueryBuilder::bind_param`
    /// creates these so that names are unique within one query.
    Param(String),
    Literal(Value),
    /// Always true predicate, rendered as `1=1`
    True,
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// Database portable comparison of (possibly large) text values
    TextEquals(Box<Expr>, Box<Expr>),
    /// Case insensitive substring containment
    Contains {
        haystack: Box<Expr>,
        needle: Box<Expr>,
    },
    StartsWith {
        haystack: Box<Expr>,
        prefix: Box<Expr>,
    },
    Arith(ArithOp, Box<Expr>, Box<Expr>),
    Concat(Vec<Expr>),
    /// Cast of a text value to a 64 bit integer
    ToInt(Box<Expr>),
    Coalesce(Vec<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    IsNull(Box<Expr>),
    IsNotNull(Box<Expr>),
    InList(Box<Expr>, Vec<Expr>),
}

pub fn col(table: &str, column: &str) -> Expr {
    Expr::Column(ColumnRef {
        table: table.to_string(),
        column: column.to_string(),
    })
}

pub fn lit<V: Into<Value>>(value: V) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    fn compare(self, op: CompareOp, other: Expr) -> Expr {
        Expr::Compare(op, Box::new(self), Box::new(other))
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.compare(CompareOp::Eq, other)
    }

    pub fn not_eq(self, other: Expr) -> Expr {
        self.compare(CompareOp::NotEq, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.compare(CompareOp::Lt, other)
    }

    pub fn le(self, other: Expr) -> Expr {
        self.compare(CompareOp::Le, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.compare(CompareOp::Gt, other)
    }

    pub fn ge(self, other: Expr) -> Expr {
        self.compare(CompareOp::Ge, other)
    }

    pub fn text_eq(self, other: Expr) -> Expr {
        Expr::TextEquals(Box::new(self), Box::new(other))
    }

    pub fn contains(self, needle: Expr) -> Expr {
        Expr::Contains {
            haystack: Box::new(self),
            needle: Box::new(needle),
        }
    }

    pub fn starts_with(self, prefix: Expr) -> Expr {
        Expr::StartsWith {
            haystack: Box::new(self),
            prefix: Box::new(prefix),
        }
    }

    pub fn add(self, other: Expr) -> Expr {
        Expr::Arith(ArithOp::Add, Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Expr {
        Expr::Arith(ArithOp::Sub, Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Expr {
        Expr::Arith(ArithOp::Mul, Box::new(self), Box::new(other))
    }

    pub fn to_int(self) -> Expr {
        Expr::ToInt(Box::new(self))
    }

    pub fn and(self, other: Expr) -> Expr {
        match self {
            Expr::And(mut parts) => {
                parts.push(other);
                Expr::And(parts)
            }
            first => Expr::And(vec![first, other]),
        }
    }

    pub fn negate(self) -> Expr {
        Expr::Not(Box::new(self))
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::IsNotNull(Box::new(self))
    }

    pub fn in_list(self, items: Vec<Expr>) -> Expr {
        Expr::InList(Box::new(self), items)
    }

    /// Names of all parameters referenced by this expression
    pub fn params(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_params(&mut names);
        names
    }

    fn collect_params<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Param(name) => names.push(name),
            Expr::Column(_) | Expr::Literal(_) | Expr::True => {}
            Expr::Compare(_, a, b) | Expr::TextEquals(a, b) | Expr::Arith(_, a, b) => {
                a.collect_params(names);
                b.collect_params(names);
            }
            Expr::Contains { haystack, needle } => {
                haystack.collect_params(names);
                needle.collect_params(names);
            }
            Expr::StartsWith { haystack, prefix } => {
                haystack.collect_params(names);
                prefix.collect_params(names);
            }
            Expr::Concat(parts) | Expr::Coalesce(parts) | Expr::And(parts) | Expr::Or(parts) => {
                parts.iter().for_each(|p| p.collect_params(names))
            }
            Expr::ToInt(e) | Expr::Not(e) | Expr::IsNull(e) | Expr::IsNotNull(e) => {
                e.collect_params(names)
            }
            Expr::InList(e, items) => {
                e.collect_params(names);
                items.iter().for_each(|p| p.collect_params(names));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

/// A column produced by a `JoinSource::JsonRecords` source
#[derive(Debug, Clone, PartialEq)]
pub struct JsonColumn {
    /// Column name visible to the rest of the query
    pub name: String,
    /// Key of the value inside every json record
    pub key: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinSource {
    Table(String),
    /// One row per entry of a comma separated list of ids held in a text
    /// column, exposed as the trimmed text column `value`. Empty entries
    /// yield no row and only the first `MAX_SPLIT_IDS` entries are read.
    /// Needs a dialect specific splitting strategy.
    SplitIds(Expr),
    /// One row per element of a json array found at `path` inside a json
    /// document, exposing the listed columns. Needs json record functions
    /// in the backing store.
    JsonRecords {
        document: Expr,
        path: Vec<String>,
        columns: Vec<JsonColumn>,
    },
}

pub const SPLIT_VALUE_COLUMN: &str = "value";

/// Entries of a list read by `JoinSource::SplitIds`. MySQL splits lists
/// with a derived table of this many numbers.
pub const MAX_SPLIT_IDS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub source: JoinSource,
    pub alias: String,
    pub on: Expr,
}

impl Join {
    pub fn inner(table: &str, alias: &str, on: Expr) -> Self {
        Self {
            kind: JoinKind::Inner,
            source: JoinSource::Table(table.to_string()),
            alias: alias.to_string(),
            on,
        }
    }

    pub fn left(table: &str, alias: &str, on: Expr) -> Self {
        Self {
            kind: JoinKind::Left,
            source: JoinSource::Table(table.to_string()),
            alias: alias.to_string(),
            on,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: Expr,
    pub alias: String,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortItem {
    pub expr: Expr,
    pub descending: bool,
}
