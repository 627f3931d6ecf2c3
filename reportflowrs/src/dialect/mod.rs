//! SQL dialect abstractions for the supported warehouses.
//!
//! Each dialect is implemented in its own file. The report compiler walks
//! fields once and hands dialect-neutral [`SqlExpr`](crate::sql_ast::SqlExpr)
//! trees to the renderer; a dialect only maps primitive pieces (quoting,
//! casting, date arithmetic, JSON paths) to concrete SQL.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ReportflowError;
use crate::sql_ast::{Aggregation, Function};

mod athena;
mod snowflake;

pub use athena::AthenaDialect;
pub use snowflake::SnowflakeDialect;

/// Dialects render identifiers and primitive expression pieces.
pub trait Dialect: Send + Sync {
    fn kind(&self) -> DialectKind;
    fn quote_ident(&self, ident: &str) -> String;
    /// Output column aliases carry translated captions, so they are always quoted.
    fn quote_alias(&self, alias: &str) -> String {
        format!("\"{}\"", alias.replace('"', "\"\""))
    }
    fn qualify_table(&self, table: &str) -> String {
        self.quote_ident(table)
    }
    fn render_function(&self, func: &Function, args: Vec<String>) -> String;
    fn render_aggregation(&self, agg: &Aggregation, expr: &str) -> String {
        match agg {
            Aggregation::Count => format!("COUNT({expr})"),
            Aggregation::CountDistinct => format!("COUNT(DISTINCT {expr})"),
            Aggregation::Sum => format!("SUM({expr})"),
            Aggregation::Min => format!("MIN({expr})"),
            Aggregation::Max => format!("MAX({expr})"),
            Aggregation::StringAgg { separator } => {
                let escaped = separator.replace('\'', "''");
                format!("STRING_AGG({expr}, '{escaped}')")
            }
        }
    }
    fn render_literal(&self, value: &serde_json::Value) -> String {
        match value {
            serde_json::Value::Null => "NULL".to_string(),
            serde_json::Value::Bool(true) => "TRUE".to_string(),
            serde_json::Value::Bool(false) => "FALSE".to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => quote_string(s),
            serde_json::Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| self.render_literal(v)).collect();
                rendered.join(", ")
            }
            serde_json::Value::Object(_) => quote_string(&value.to_string()),
        }
    }
    fn render_timestamp_literal(&self, ts: &str) -> String {
        format!("TIMESTAMP {}", quote_string(ts))
    }
    /// `right` is a pattern escaped with [`LIKE_ESCAPE`].
    fn render_ilike(&self, left: &str, right: &str) -> String {
        format!("({left} ILIKE {right} ESCAPE '{LIKE_ESCAPE}')")
    }
}

/// Escape character for LIKE patterns built from user text. Not a backslash,
/// which Snowflake string literals already treat as an escape.
pub const LIKE_ESCAPE: char = '!';

/// Escape LIKE wildcards so `value` matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_') || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

pub(crate) fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// The warehouses a report can be compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    Athena,
    Snowflake,
}

impl DialectKind {
    /// Build the adapter for this warehouse, optionally qualifying tables with `schema`.
    pub fn build(self, schema: Option<String>) -> Box<dyn Dialect> {
        match self {
            DialectKind::Athena => Box::new(AthenaDialect::new(schema)),
            DialectKind::Snowflake => Box::new(SnowflakeDialect::new(schema)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DialectKind::Athena => "athena",
            DialectKind::Snowflake => "snowflake",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = ReportflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "athena" | "presto" | "trino" => Ok(DialectKind::Athena),
            "snowflake" => Ok(DialectKind::Snowflake),
            other => Err(ReportflowError::Validation(format!(
                "unsupported dialect {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dialect_names() {
        assert_eq!("Athena".parse::<DialectKind>().unwrap(), DialectKind::Athena);
        assert_eq!("trino".parse::<DialectKind>().unwrap(), DialectKind::Athena);
        assert_eq!(
            "snowflake".parse::<DialectKind>().unwrap(),
            DialectKind::Snowflake
        );
        assert!("mysql".parse::<DialectKind>().is_err());
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50!%!_off");
        assert_eq!(escape_like("wow!"), "wow!!");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn string_literals_are_escaped() {
        let dialect = DialectKind::Athena.build(None);
        assert_eq!(
            dialect.render_literal(&serde_json::json!("O'Brien")),
            "'O''Brien'"
        );
        assert_eq!(dialect.render_literal(&serde_json::json!(false)), "FALSE");
    }
}
