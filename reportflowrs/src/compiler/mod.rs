//! Report compiler: turns a [`ReportSpecification`] plus the caller's
//! [`VisibilityScope`] into one SQL statement for a target warehouse.
//!
//! Compilation awaits two lookups (translations and the additional field
//! catalog) concurrently and exactly once; everything after that is a pure
//! function of the resolved inputs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Instant;

use chrono_tz::Tz;
use futures::future::try_join_all;
use serde::Serialize;

use crate::config::{ReportflowConfig, ResolvedWarehouseConfig};
use crate::dialect::DialectKind;
use crate::error::{Result, ReportflowError};
use crate::fields::extra::CatalogSnapshot;
use crate::fields::{label_keys, ColumnRef, FieldRegistry, Labels};
use crate::lookup::{ExtraFieldKind, FieldCatalog, TranslationService};
use crate::report::ReportSpecification;
use crate::scope::VisibilityScope;
use crate::sql_ast::SqlRenderer;

pub mod archive;
mod branch;
pub mod captions;
pub mod filters;
pub mod joins;
mod plan;
pub mod sorting;
pub mod visibility;

pub use archive::{ArchivalUnionBuilder, ArchiveMode};
pub use captions::OutputColumn;
pub use filters::{DateWindow, FilterComposer};
pub use joins::JoinPlanner;
pub use plan::UNION_ALIAS;
pub use sorting::{ResolvedSort, SortingResolver};
pub use visibility::VisibilityScoper;

use branch::{build_branch, BranchInputs};

/// How many rows the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitMode {
    #[default]
    Preview,
    Export,
    Unrestricted,
}

impl LimitMode {
    pub fn rows(&self, warehouse: &ResolvedWarehouseConfig) -> Option<u64> {
        match self {
            LimitMode::Preview => Some(warehouse.preview_rows),
            LimitMode::Export if warehouse.export_rows > 0 => Some(warehouse.export_rows),
            LimitMode::Export | LimitMode::Unrestricted => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub dialect: DialectKind,
    pub limit: LimitMode,
    /// Caption language; the configured default when absent.
    pub lang: Option<String>,
}

impl CompileOptions {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            dialect,
            limit: LimitMode::Preview,
            lang: None,
        }
    }

    pub fn limit(mut self, limit: LimitMode) -> Self {
        self.limit = limit;
        self
    }

    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Output of one compilation, handed straight to the executor.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledQuery {
    pub sql: String,
    pub dialect: DialectKind,
    pub limit: Option<u64>,
    pub mode: ArchiveMode,
    /// Output captions in SELECT order.
    pub columns: Vec<String>,
}

impl CompiledQuery {
    pub fn limit_applied(&self) -> bool {
        self.limit.is_some()
    }

    /// Stable key for result caching.
    pub fn fingerprint(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.dialect.as_str().hash(&mut hasher);
        self.sql.hash(&mut hasher);
        hex::encode(hasher.finish().to_be_bytes())
    }
}

pub struct ReportCompiler {
    registry: Arc<FieldRegistry>,
    translations: Arc<dyn TranslationService>,
    catalog: Arc<dyn FieldCatalog>,
    config: ReportflowConfig,
}

impl ReportCompiler {
    pub fn new(
        registry: Arc<FieldRegistry>,
        translations: Arc<dyn TranslationService>,
        catalog: Arc<dyn FieldCatalog>,
    ) -> Self {
        Self {
            registry,
            translations,
            catalog,
            config: ReportflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReportflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReportflowConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub async fn compile(
        &self,
        spec: &ReportSpecification,
        scope: &VisibilityScope,
        options: &CompileOptions,
    ) -> Result<CompiledQuery> {
        let report = self.registry.report(spec.report_type).ok_or_else(|| {
            ReportflowError::Validation(format!(
                "report type {} is not registered",
                spec.report_type
            ))
        })?;
        let warehouse = self.config.for_dialect(options.dialect);
        let tz = resolve_timezone(spec.timezone.as_deref(), &self.config.compiler.default_timezone);
        let lang = options
            .lang
            .as_deref()
            .unwrap_or(&self.config.compiler.default_lang);

        let column_refs = self.registry.resolve_columns(spec.report_type, &spec.fields);
        let keys = self.translation_keys(&column_refs);
        let kinds = catalog_kinds(&column_refs, spec);
        let (labels, catalog) = self.lookups(keys, lang, kinds).await?;

        let columns = captions::output_columns(&self.registry, &column_refs, &labels, &catalog);
        let composer = FilterComposer::new(tz);
        let mode =
            ArchivalUnionBuilder::new(self.config.archive.enabled).decide(spec, report, &composer);

        let inputs = BranchInputs {
            registry: &self.registry,
            spec,
            scope,
            columns: &columns,
            catalog: &catalog,
            labels: &labels,
            composer,
            timezone: tz.name(),
            lang,
        };
        let branches = mode
            .branches()
            .iter()
            .map(|branch| build_branch(&inputs, *branch))
            .collect();
        let order_by = SortingResolver::new(&columns, report.default_sort, &report.mandatory)
            .order_by(&spec.sorting_options);
        let limit = options.limit.rows(&warehouse);
        let query = plan::assemble(branches, order_by, limit)?;

        let dialect = options.dialect.build(warehouse.schema.clone());
        let sql = SqlRenderer::new(dialect.as_ref()).render_select(&query);
        tracing::debug!(
            report_type = %spec.report_type,
            dialect = %options.dialect,
            mode = ?mode,
            columns = columns.len(),
            "compiled report"
        );
        tracing::trace!(sql = %sql, "report sql");

        Ok(CompiledQuery {
            sql,
            dialect: options.dialect,
            limit,
            mode,
            columns: columns.into_iter().map(|c| c.caption).collect(),
        })
    }

    fn translation_keys(&self, columns: &[ColumnRef]) -> Vec<String> {
        let mut keys: Vec<String> = columns
            .iter()
            .filter_map(|c| match c {
                ColumnRef::Standard(id) => self.registry.field(id).map(|f| f.label_key.to_string()),
                ColumnRef::Extra { .. } => None,
            })
            .collect();
        keys.extend(label_keys().map(str::to_string));
        keys.sort();
        keys.dedup();
        keys
    }

    /// Await translations and catalog entries concurrently, each bounded by
    /// the configured lookup timeout.
    async fn lookups(
        &self,
        keys: Vec<String>,
        lang: &str,
        kinds: Vec<ExtraFieldKind>,
    ) -> Result<(Labels, CatalogSnapshot)> {
        let timeout = self.config.compiler.lookup_timeout();
        let started = Instant::now();

        let translations = async {
            let lookup = self.translations.get_translations(&keys, lang);
            match tokio::time::timeout(timeout, lookup).await {
                Ok(result) => result,
                Err(_) => Err(ReportflowError::Lookup(format!(
                    "translation lookup timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        };
        let catalog = try_join_all(kinds.iter().map(|kind| async move {
            match tokio::time::timeout(timeout, self.catalog.extra_fields(*kind)).await {
                Ok(fields) => fields.map(|fields| (*kind, fields)),
                Err(_) => Err(ReportflowError::Lookup(format!(
                    "{kind:?} field catalog lookup timed out after {}ms",
                    timeout.as_millis()
                ))),
            }
        }));

        let (translations, entries) = futures::try_join!(translations, catalog)?;
        let mut snapshot = CatalogSnapshot::default();
        for (kind, fields) in entries {
            snapshot.insert(kind, fields);
        }
        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            translations = translations.len(),
            catalogs = kinds.len(),
            "lookups resolved"
        );
        Ok((Labels::new(translations), snapshot))
    }
}

/// Catalogs the report needs: every additional field kind it selects, plus
/// user fields when it filters on them.
fn catalog_kinds(columns: &[ColumnRef], spec: &ReportSpecification) -> Vec<ExtraFieldKind> {
    let mut kinds = Vec::new();
    let filtered = spec
        .user_additional_fields
        .as_ref()
        .is_some_and(|f| !f.filters.is_empty());
    let referenced = columns
        .iter()
        .filter_map(|c| match c {
            ColumnRef::Extra { kind, .. } => Some(*kind),
            ColumnRef::Standard(_) => None,
        })
        .chain(filtered.then_some(ExtraFieldKind::User));
    for kind in referenced {
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    kinds
}

/// Parse an IANA timezone, falling back to the configured default.
pub fn resolve_timezone(requested: Option<&str>, default: &str) -> Tz {
    if let Some(name) = requested {
        match name.parse::<Tz>() {
            Ok(tz) => return tz,
            Err(_) => {
                tracing::warn!(timezone = name, fallback = default, "invalid report timezone")
            }
        }
    }
    default.parse::<Tz>().unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_limit_zero_means_unlimited() {
        let warehouse = ResolvedWarehouseConfig {
            schema: None,
            preview_rows: 100,
            export_rows: 0,
        };
        assert_eq!(LimitMode::Preview.rows(&warehouse), Some(100));
        assert_eq!(LimitMode::Export.rows(&warehouse), None);
        assert_eq!(LimitMode::Unrestricted.rows(&warehouse), None);
    }

    #[test]
    fn invalid_timezone_falls_back() {
        assert_eq!(resolve_timezone(Some("Mars/Olympus"), "Europe/Rome"), chrono_tz::Europe::Rome);
        assert_eq!(resolve_timezone(None, "nonsense"), chrono_tz::UTC);
        assert_eq!(resolve_timezone(Some("Asia/Tokyo"), "UTC"), chrono_tz::Asia::Tokyo);
    }

    #[test]
    fn fingerprint_depends_on_sql() {
        let query = CompiledQuery {
            sql: "SELECT 1".to_string(),
            dialect: DialectKind::Athena,
            limit: None,
            mode: ArchiveMode::ActiveOnly,
            columns: vec![],
        };
        let other = CompiledQuery {
            sql: "SELECT 2".to_string(),
            ..query.clone()
        };
        assert_eq!(query.fingerprint().len(), 16);
        assert_ne!(query.fingerprint(), other.fingerprint());
    }
}
