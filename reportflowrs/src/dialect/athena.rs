//! Athena (Presto/Trino) dialect implementation.

use crate::sql_ast::{Aggregation, Function};

use super::{quote_string, Dialect, DialectKind, LIKE_ESCAPE};

#[derive(Debug, Default, Clone)]
pub struct AthenaDialect {
    schema: Option<String>,
}

impl AthenaDialect {
    pub fn new(schema: Option<String>) -> Self {
        Self { schema }
    }
}

impl Dialect for AthenaDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Athena
    }

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn qualify_table(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", self.quote_ident(schema), self.quote_ident(table)),
            None => self.quote_ident(table),
        }
    }

    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            // Presto has no STRING_AGG; aggregate into an array and join it
            Aggregation::StringAgg { separator } => {
                format!("array_join(array_agg({expr}), {})", quote_string(separator))
            }
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
        }
    }

    fn render_ilike(&self, left: &str, right: &str) -> String {
        format!("(lower({left}) LIKE lower({right}) ESCAPE '{LIKE_ESCAPE}')")
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::Lower => format!("lower({})", args.join(", ")),
            Function::Upper => format!("upper({})", args.join(", ")),
            Function::Trim => format!("trim({})", args.join(", ")),
            Function::Concat => format!("concat({})", args.join(", ")),
            Function::Coalesce => format!("coalesce({})", args.join(", ")),
            Function::NullIf => match args.as_slice() {
                [expr1, expr2] => format!("nullif({expr1}, {expr2})"),
                _ => "NULL".to_string(),
            },
            Function::Round => match args.as_slice() {
                [expr, decimals] => format!("round({expr}, {decimals})"),
                [expr] => format!("round({expr})"),
                _ => "NULL".to_string(),
            },
            Function::StripLeadingSlash => match args.as_slice() {
                [expr] => format!("regexp_replace({expr}, '^/', '')"),
                _ => "NULL".to_string(),
            },
            Function::FormatTimestamp { timezone } => match args.as_slice() {
                [expr] => format!(
                    "date_format(at_timezone({expr}, {}), '%Y-%m-%d %H:%i:%s')",
                    quote_string(timezone)
                ),
                _ => "NULL".to_string(),
            },
            Function::FormatDate => match args.as_slice() {
                [expr] => format!("date_format({expr}, '%Y-%m-%d')"),
                _ => "NULL".to_string(),
            },
            Function::AddDays { days } => match args.as_slice() {
                [expr] => format!("date_add('day', {days}, {expr})"),
                _ => "NULL".to_string(),
            },
            Function::CurrentTimestamp => "current_timestamp".to_string(),
            Function::JsonExtract { path } => match args.as_slice() {
                [expr] => format!(
                    "json_extract_scalar({expr}, {})",
                    quote_string(&format!("$.{path}"))
                ),
                _ => "NULL".to_string(),
            },
            Function::ToNumber => match args.as_slice() {
                [expr] => format!("TRY_CAST({expr} AS DOUBLE)"),
                _ => "NULL".to_string(),
            },
            Function::ToInteger => match args.as_slice() {
                [expr] => format!("TRY_CAST({expr} AS BIGINT)"),
                _ => "NULL".to_string(),
            },
            Function::ToVarchar => match args.as_slice() {
                [expr] => format!("CAST({expr} AS VARCHAR)"),
                _ => "NULL".to_string(),
            },
            Function::ToTimestamp => match args.as_slice() {
                [expr] => format!("TRY_CAST({expr} AS TIMESTAMP)"),
                _ => "NULL".to_string(),
            },
            Function::IsValidTimestamp => match args.as_slice() {
                [expr] => format!(
                    "({expr} IS NOT NULL AND {expr} > TIMESTAMP '1970-01-02 00:00:00')"
                ),
                _ => "FALSE".to_string(),
            },
        }
    }
}
