use crate::compiler::{CompileOptions, ReportCompiler};
use crate::error::Result;
use crate::executor::{QueryExecutor, QueryResult};
use crate::report::ReportSpecification;
use crate::scope::VisibilityScope;

/// Compile a report and hand the statement to `executor`.
pub async fn run_report(
    compiler: &ReportCompiler,
    executor: &dyn QueryExecutor,
    spec: &ReportSpecification,
    scope: &VisibilityScope,
    options: &CompileOptions,
) -> Result<QueryResult> {
    let query = compiler.compile(spec, scope, options).await?;
    tracing::debug!(
        fingerprint = %query.fingerprint(),
        mode = ?query.mode,
        limit = ?query.limit,
        "executing report"
    );
    executor.execute(&query).await
}
