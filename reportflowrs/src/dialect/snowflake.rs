//! Snowflake dialect implementation.
//!
//! Unquoted Snowflake identifiers resolve case-insensitively, which is how the
//! replicated LMS tables are addressed; only identifiers that would not survive
//! unquoted are wrapped in double quotes.

use crate::sql_ast::{Aggregation, Function};

use super::{quote_string, Dialect, DialectKind};

#[derive(Debug, Default, Clone)]
pub struct SnowflakeDialect {
    schema: Option<String>,
}

impl SnowflakeDialect {
    pub fn new(schema: Option<String>) -> Self {
        Self { schema }
    }
}

const RESERVED: &[&str] = &[
    "ALL", "AND", "AS", "BETWEEN", "BY", "CASE", "CURRENT_DATE", "CURRENT_TIMESTAMP",
    "DISTINCT", "ELSE", "EXISTS", "FALSE", "FROM", "GROUP", "IN", "IS", "JOIN", "LEFT",
    "LIKE", "NOT", "NULL", "ON", "OR", "ORDER", "SELECT", "TABLE", "THEN", "TRUE", "UNION",
    "WHEN", "WHERE", "WITH",
];

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&ident.to_ascii_uppercase().as_str())
}

impl Dialect for SnowflakeDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Snowflake
    }

    fn quote_ident(&self, ident: &str) -> String {
        if is_plain_identifier(ident) {
            ident.to_string()
        } else {
            format!("\"{}\"", ident.replace('"', "\"\""))
        }
    }

    fn qualify_table(&self, table: &str) -> String {
        match &self.schema {
            Some(schema) => {
                let parts: Vec<String> = schema.split('.').map(|p| self.quote_ident(p)).collect();
                format!("{}.{}", parts.join("."), self.quote_ident(table))
            }
            None => self.quote_ident(table),
        }
    }

    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::StringAgg { separator } => {
                format!("LISTAGG({expr}, {})", quote_string(separator))
            }
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
        }
    }

    fn render_timestamp_literal(&self, ts: &str) -> String {
        format!("{}::TIMESTAMP_NTZ", quote_string(ts))
    }

    fn render_function(&self, func: &Function, args: Vec<String>) -> String {
        match func {
            Function::Lower => format!("LOWER({})", args.join(", ")),
            Function::Upper => format!("UPPER({})", args.join(", ")),
            Function::Trim => format!("TRIM({})", args.join(", ")),
            Function::Concat => format!("CONCAT({})", args.join(", ")),
            Function::Coalesce => format!("COALESCE({})", args.join(", ")),
            Function::NullIf => match args.as_slice() {
                [expr1, expr2] => format!("NULLIF({expr1}, {expr2})"),
                _ => "NULL".to_string(),
            },
            Function::Round => match args.as_slice() {
                [expr, decimals] => format!("ROUND({expr}, {decimals})"),
                [expr] => format!("ROUND({expr})"),
                _ => "NULL".to_string(),
            },
            Function::StripLeadingSlash => match args.as_slice() {
                [expr] => format!("LTRIM({expr}, '/')"),
                _ => "NULL".to_string(),
            },
            Function::FormatTimestamp { timezone } => match args.as_slice() {
                [expr] => format!(
                    "TO_CHAR(CONVERT_TIMEZONE('UTC', {}, {expr}), 'YYYY-MM-DD HH24:MI:SS')",
                    quote_string(timezone)
                ),
                _ => "NULL".to_string(),
            },
            Function::FormatDate => match args.as_slice() {
                [expr] => format!("TO_CHAR({expr}, 'YYYY-MM-DD')"),
                _ => "NULL".to_string(),
            },
            Function::AddDays { days } => match args.as_slice() {
                [expr] => format!("DATEADD(day, {days}, {expr})"),
                _ => "NULL".to_string(),
            },
            Function::CurrentTimestamp => "CURRENT_TIMESTAMP()".to_string(),
            Function::JsonExtract { path } => match args.as_slice() {
                [expr] => format!("JSON_EXTRACT_PATH_TEXT({expr}, {})", quote_string(path)),
                _ => "NULL".to_string(),
            },
            Function::ToNumber => match args.as_slice() {
                [expr] => format!("TRY_TO_DOUBLE(TO_VARCHAR({expr}))"),
                _ => "NULL".to_string(),
            },
            Function::ToInteger => match args.as_slice() {
                [expr] => format!("TRY_TO_NUMBER(TO_VARCHAR({expr}))"),
                _ => "NULL".to_string(),
            },
            Function::ToVarchar => match args.as_slice() {
                [expr] => format!("TO_VARCHAR({expr})"),
                _ => "NULL".to_string(),
            },
            Function::ToTimestamp => match args.as_slice() {
                [expr] => format!("TRY_TO_TIMESTAMP(TO_VARCHAR({expr}))"),
                _ => "NULL".to_string(),
            },
            Function::IsValidTimestamp => match args.as_slice() {
                [expr] => format!(
                    "({expr} IS NOT NULL AND {expr} > '1970-01-02 00:00:00'::TIMESTAMP_NTZ)"
                ),
                _ => "FALSE".to_string(),
            },
        }
    }
}
