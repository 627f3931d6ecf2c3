use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::compiler::CompiledQuery;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
}

#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

/// Runs compiled SQL against a warehouse. Pagination, result caching and
/// retry policy belong to the implementation.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, query: &CompiledQuery) -> Result<QueryResult>;
}
