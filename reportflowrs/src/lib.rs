pub mod compiler;
pub mod config;
pub mod dashboard;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod fields;
pub mod lookup;
pub mod report;
pub mod runtime;
pub mod scope;
pub mod sql_ast;

use std::sync::Arc;

use crate::error::Result;
use crate::fields::FieldRegistry;

/// The built-in registry, validated once before first use.
pub fn load_and_validate() -> Result<Arc<FieldRegistry>> {
    let registry = FieldRegistry::shared();
    registry.validate()?;
    Ok(registry)
}

pub use compiler::{CompileOptions, CompiledQuery, LimitMode, ReportCompiler};
pub use config::ReportflowConfig;
pub use dashboard::{DashboardCompiler, DashboardKind, DashboardRequest};
pub use dialect::DialectKind;
pub use error::ReportflowError;
pub use executor::{QueryExecutor, QueryResult};
pub use report::{ReportSpecification, ReportType};
pub use runtime::run_report;
pub use scope::VisibilityScope;
