use serde_json::Value;

use crate::dialect::Dialect;

#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    Column {
        table: Option<String>,
        name: String,
    },
    /// Reference to an output column of the enclosing SELECT (always quoted as an alias).
    Alias(String),
    Literal(Value),
    /// `YYYY-MM-DD HH:MM:SS` timestamp literal.
    Timestamp(String),
    Wildcard,
    Function {
        func: Function,
        args: Vec<SqlExpr>,
    },
    Case {
        branches: Vec<(SqlExpr, SqlExpr)>,
        else_expr: Box<SqlExpr>,
    },
    BinaryOp {
        op: SqlBinaryOperator,
        left: Box<SqlExpr>,
        right: Box<SqlExpr>,
    },
    Not(Box<SqlExpr>),
    IsNull {
        expr: Box<SqlExpr>,
        negated: bool,
    },
    Between {
        expr: Box<SqlExpr>,
        low: Box<SqlExpr>,
        high: Box<SqlExpr>,
    },
    Aggregate {
        agg: Aggregation,
        expr: Box<SqlExpr>,
    },
    InList {
        expr: Box<SqlExpr>,
        list: Vec<SqlExpr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<SqlExpr>,
        query: Box<SelectQuery>,
        negated: bool,
    },
    Exists(Box<SelectQuery>),
}

/// Dialect-neutral functions; each dialect decides the concrete spelling.
#[derive(Debug, Clone, PartialEq)]
pub enum Function {
    Lower,
    Upper,
    Trim,
    Concat,
    Coalesce,
    NullIf,
    Round,
    /// Drops the leading `/` of hierarchical user ids.
    StripLeadingSlash,
    /// Render a UTC timestamp as local `YYYY-MM-DD HH:MM:SS` text.
    FormatTimestamp { timezone: String },
    /// Render a timestamp/date as `YYYY-MM-DD` text.
    FormatDate,
    AddDays { days: i64 },
    CurrentTimestamp,
    /// Extract a scalar from a JSON text column at a dotted path.
    JsonExtract { path: String },
    ToNumber,
    ToInteger,
    ToVarchar,
    ToTimestamp,
    /// True when the timestamp holds a real value (not NULL, not a zero/epoch placeholder).
    IsValidTimestamp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    Count,
    CountDistinct,
    Sum,
    Min,
    Max,
    StringAgg { separator: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlBinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: SqlExpr,
    pub alias: Option<String>,
    /// Captions keep their exact spelling; internal names follow identifier quoting.
    pub caption: bool,
}

impl SelectItem {
    pub fn caption(expr: SqlExpr, caption: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(caption.into()),
            caption: true,
        }
    }

    pub fn named(expr: SqlExpr, name: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(name.into()),
            caption: false,
        }
    }

    pub fn bare(expr: SqlExpr) -> Self {
        Self {
            expr,
            alias: None,
            caption: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableSource {
    Table(String),
    Subquery(Box<SelectQuery>),
    /// `UNION ALL` of positionally aligned selects.
    UnionAll(Vec<SelectQuery>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub source: TableSource,
    pub alias: Option<String>,
}

impl TableRef {
    pub fn table(name: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            source: TableSource::Table(name.into()),
            alias: Some(alias.into()),
        }
    }

    pub fn subquery(query: SelectQuery, alias: impl Into<String>) -> Self {
        Self {
            source: TableSource::Subquery(Box::new(query)),
            alias: Some(alias.into()),
        }
    }
}

impl Default for TableRef {
    fn default() -> Self {
        Self {
            source: TableSource::Table(String::new()),
            alias: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlJoinType {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: SqlJoinType,
    pub table: TableRef,
    pub on: Vec<SqlExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub expr: SqlExpr,
    pub direction: SortDirection,
    pub nulls_last: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    pub select: Vec<SelectItem>,
    pub from: TableRef,
    pub joins: Vec<Join>,
    pub filters: Vec<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<u64>,
}

// ============================================================================
// Expression constructors
// ============================================================================

impl SqlExpr {
    pub fn col(table: &str, name: &str) -> Self {
        SqlExpr::Column {
            table: Some(table.to_string()),
            name: name.to_string(),
        }
    }

    pub fn str(value: &str) -> Self {
        SqlExpr::Literal(Value::String(value.to_string()))
    }

    pub fn int(value: i64) -> Self {
        SqlExpr::Literal(Value::from(value))
    }

    pub fn bool(value: bool) -> Self {
        SqlExpr::Literal(Value::Bool(value))
    }

    pub fn null() -> Self {
        SqlExpr::Literal(Value::Null)
    }

    pub fn func(func: Function, args: Vec<SqlExpr>) -> Self {
        SqlExpr::Function { func, args }
    }

    pub fn call(self, func: Function) -> Self {
        SqlExpr::Function {
            func,
            args: vec![self],
        }
    }

    pub fn agg(self, agg: Aggregation) -> Self {
        SqlExpr::Aggregate {
            agg,
            expr: Box::new(self),
        }
    }

    pub fn binary(self, op: SqlBinaryOperator, right: SqlExpr) -> Self {
        SqlExpr::BinaryOp {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn equals(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Eq, right)
    }

    pub fn gte(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Gte, right)
    }

    pub fn lte(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Lte, right)
    }

    pub fn gt(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Gt, right)
    }

    pub fn lt(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Lt, right)
    }

    pub fn and(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::And, right)
    }

    pub fn or(self, right: SqlExpr) -> Self {
        self.binary(SqlBinaryOperator::Or, right)
    }

    pub fn between(self, low: SqlExpr, high: SqlExpr) -> Self {
        SqlExpr::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
        }
    }

    pub fn is_null(self) -> Self {
        SqlExpr::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    pub fn is_not_null(self) -> Self {
        SqlExpr::IsNull {
            expr: Box::new(self),
            negated: true,
        }
    }

    pub fn in_list(self, list: Vec<SqlExpr>) -> Self {
        SqlExpr::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    pub fn in_subquery(self, query: SelectQuery) -> Self {
        SqlExpr::InSubquery {
            expr: Box::new(self),
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn coalesce(self, fallback: SqlExpr) -> Self {
        SqlExpr::func(Function::Coalesce, vec![self, fallback])
    }

    /// `CASE WHEN <cond> THEN <then> ... ELSE <else> END`.
    pub fn case(branches: Vec<(SqlExpr, SqlExpr)>, else_expr: SqlExpr) -> Self {
        SqlExpr::Case {
            branches,
            else_expr: Box::new(else_expr),
        }
    }
}

/// AND-chain predicates; `None` when there is nothing to restrict.
pub fn and_all(preds: Vec<SqlExpr>) -> Option<SqlExpr> {
    preds.into_iter().reduce(SqlExpr::and)
}

/// OR-chain predicates; `None` when there is nothing to restrict.
pub fn or_all(preds: Vec<SqlExpr>) -> Option<SqlExpr> {
    preds.into_iter().reduce(SqlExpr::or)
}

// ============================================================================
// Rendering
// ============================================================================

pub struct SqlRenderer<'d> {
    dialect: &'d dyn Dialect,
}

impl<'d> SqlRenderer<'d> {
    pub fn new(dialect: &'d dyn Dialect) -> Self {
        Self { dialect }
    }

    pub fn render_select(&self, query: &SelectQuery) -> String {
        let select_items: Vec<String> = query
            .select
            .iter()
            .map(|item| {
                let expr_sql = self.render_expr(&item.expr);
                match &item.alias {
                    Some(alias) if item.caption => {
                        format!("{expr_sql} AS {}", self.dialect.quote_alias(alias))
                    }
                    Some(name) => format!("{expr_sql} AS {}", self.dialect.quote_ident(name)),
                    None => expr_sql,
                }
            })
            .collect();

        let mut sql = format!(
            "SELECT {} FROM {}",
            select_items.join(", "),
            self.render_table_ref(&query.from)
        );

        for join in &query.joins {
            let join_kw = match join.join_type {
                SqlJoinType::Inner => "JOIN",
                SqlJoinType::Left => "LEFT JOIN",
            };
            let on_clause: Vec<String> = join.on.iter().map(|e| self.render_expr(e)).collect();
            sql.push_str(&format!(
                " {join_kw} {} ON {}",
                self.render_table_ref(&join.table),
                on_clause.join(" AND ")
            ));
        }

        if !query.filters.is_empty() {
            let filters: Vec<String> = query.filters.iter().map(|f| self.render_expr(f)).collect();
            sql.push_str(&format!(" WHERE {}", filters.join(" AND ")));
        }

        if !query.group_by.is_empty() {
            let groups: Vec<String> = query.group_by.iter().map(|g| self.render_expr(g)).collect();
            sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
        }

        if !query.order_by.is_empty() {
            let orders: Vec<String> = query
                .order_by
                .iter()
                .map(|o| {
                    let expr = self.render_expr(&o.expr);
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    if o.nulls_last {
                        format!("{expr} {dir} NULLS LAST")
                    } else {
                        format!("{expr} {dir}")
                    }
                })
                .collect();
            sql.push_str(&format!(" ORDER BY {}", orders.join(", ")));
        }

        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        sql
    }

    fn render_table_ref(&self, table: &TableRef) -> String {
        let source = match &table.source {
            TableSource::Table(name) => self.dialect.qualify_table(name),
            TableSource::Subquery(query) => format!("({})", self.render_select(query)),
            TableSource::UnionAll(branches) => {
                let rendered: Vec<String> =
                    branches.iter().map(|b| self.render_select(b)).collect();
                format!("({})", rendered.join(" UNION ALL "))
            }
        };
        match &table.alias {
            Some(alias) => format!("{source} AS {}", self.dialect.quote_ident(alias)),
            None => source,
        }
    }

    pub fn render_expr(&self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column { table, name } => match table {
                Some(t) => format!(
                    "{}.{}",
                    self.dialect.quote_ident(t),
                    self.dialect.quote_ident(name)
                ),
                None => self.dialect.quote_ident(name),
            },
            SqlExpr::Alias(alias) => self.dialect.quote_alias(alias),
            SqlExpr::Literal(v) => self.dialect.render_literal(v),
            SqlExpr::Timestamp(ts) => self.dialect.render_timestamp_literal(ts),
            SqlExpr::Wildcard => "*".to_string(),
            SqlExpr::Function { func, args } => {
                let rendered_args: Vec<String> = args.iter().map(|a| self.render_expr(a)).collect();
                self.dialect.render_function(func, rendered_args)
            }
            SqlExpr::Case {
                branches,
                else_expr,
            } => {
                let mut parts = Vec::new();
                parts.push("CASE".to_string());
                for (when, then) in branches {
                    parts.push(format!(
                        " WHEN {} THEN {}",
                        self.render_expr(when),
                        self.render_expr(then)
                    ));
                }
                parts.push(format!(" ELSE {} END", self.render_expr(else_expr)));
                parts.join("")
            }
            SqlExpr::BinaryOp { op, left, right } => {
                let left_sql = self.render_expr(left);
                let right_sql = self.render_expr(right);
                let op_sql = match op {
                    SqlBinaryOperator::Add => "+",
                    SqlBinaryOperator::Subtract => "-",
                    SqlBinaryOperator::Multiply => "*",
                    SqlBinaryOperator::Divide => "/",
                    SqlBinaryOperator::And => "AND",
                    SqlBinaryOperator::Or => "OR",
                    SqlBinaryOperator::Eq => "=",
                    SqlBinaryOperator::Neq => "!=",
                    SqlBinaryOperator::Gt => ">",
                    SqlBinaryOperator::Gte => ">=",
                    SqlBinaryOperator::Lt => "<",
                    SqlBinaryOperator::Lte => "<=",
                    SqlBinaryOperator::Like => "LIKE",
                    SqlBinaryOperator::ILike => {
                        return self.dialect.render_ilike(&left_sql, &right_sql)
                    }
                };
                format!("({left_sql} {op_sql} {right_sql})")
            }
            SqlExpr::Not(inner) => format!("(NOT {})", self.render_expr(inner)),
            SqlExpr::IsNull { expr, negated } => {
                let not_kw = if *negated { "NOT " } else { "" };
                format!("({} IS {not_kw}NULL)", self.render_expr(expr))
            }
            SqlExpr::Between { expr, low, high } => format!(
                "({} BETWEEN {} AND {})",
                self.render_expr(expr),
                self.render_expr(low),
                self.render_expr(high)
            ),
            SqlExpr::Aggregate { agg, expr } => self
                .dialect
                .render_aggregation(agg, &self.render_expr(expr)),
            SqlExpr::InList {
                expr,
                list,
                negated,
            } => {
                let rendered_values: Vec<String> =
                    list.iter().map(|v| self.render_expr(v)).collect();
                let not_kw = if *negated { "NOT " } else { "" };
                format!(
                    "{} {}IN ({})",
                    self.render_expr(expr),
                    not_kw,
                    rendered_values.join(", ")
                )
            }
            SqlExpr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let not_kw = if *negated { "NOT " } else { "" };
                format!(
                    "{} {}IN ({})",
                    self.render_expr(expr),
                    not_kw,
                    self.render_select(query)
                )
            }
            SqlExpr::Exists(query) => format!("EXISTS ({})", self.render_select(query)),
        }
    }
}
