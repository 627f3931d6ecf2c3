//! Field registry: maps report field ids to dialect-neutral SQL renderings.
//!
//! Every report type owns a base source (live, and archived where the archival
//! union applies), the field categories it exposes, its mandatory fields and
//! its default sort. Registries are immutable once built and shared across
//! requests behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::error::{Result, ReportflowError};
use crate::lookup::ExtraFieldKind;
use crate::report::ReportType;
use crate::sql_ast::{Function, SqlExpr};

mod badge;
mod certification;
mod course;
mod enrollment;
pub mod extra;
pub mod joins;
mod labels;
mod learning_plan;
mod user;

pub use enrollment::EnrollmentColumns;
pub use joins::{base_source, enrollment_user, BaseSource, JoinKey};
pub use labels::{label_keys, Labels};

/// Which physical source a SELECT reads enrollments from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Live,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    User,
    Course,
    Enrollment,
    LearningPlan,
    Certification,
    Badge,
}

/// Rendered value shape; drives sort normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Text,
    Number,
    /// Local `YYYY-MM-DD HH:MM:SS` text.
    Timestamp,
    /// `YYYY-MM-DD` text.
    Date,
    /// Translated enumeration value.
    Label,
}

impl DataType {
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::Text | DataType::Label)
    }
}

/// Inputs a field rendering may depend on.
pub struct RenderContext<'a> {
    pub report_type: ReportType,
    pub branch: Branch,
    pub timezone: &'a str,
    pub lang: &'a str,
    pub labels: &'a Labels,
}

pub type RenderFn = fn(&RenderContext<'_>) -> SqlExpr;

#[derive(Clone, Copy)]
pub struct Rendering {
    pub joins: &'static [JoinKey],
    pub expr: RenderFn,
}

impl fmt::Debug for Rendering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rendering")
            .field("joins", &self.joins)
            .finish_non_exhaustive()
    }
}

/// How a field is read in the archived branch.
#[derive(Debug, Clone, Copy)]
pub enum ArchivedRendering {
    /// The live rendering reads tables joined in both branches.
    SameAsLive,
    Custom(Rendering),
    /// No snapshot value; a NULL keeps the union positionally aligned.
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub category: FieldCategory,
    pub label_key: &'static str,
    pub default_label: &'static str,
    pub data_type: DataType,
    pub sortable: bool,
    pub live: Rendering,
    pub archived: ArchivedRendering,
}

impl FieldDescriptor {
    pub fn new(
        id: &'static str,
        category: FieldCategory,
        label: (&'static str, &'static str),
        data_type: DataType,
        joins: &'static [JoinKey],
        expr: RenderFn,
    ) -> Self {
        Self {
            id,
            category,
            label_key: label.0,
            default_label: label.1,
            data_type,
            sortable: true,
            live: Rendering { joins, expr },
            archived: match category {
                FieldCategory::User => ArchivedRendering::SameAsLive,
                _ => ArchivedRendering::Placeholder,
            },
        }
    }

    pub fn archived(mut self, joins: &'static [JoinKey], expr: RenderFn) -> Self {
        self.archived = ArchivedRendering::Custom(Rendering { joins, expr });
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    /// Rendering for `branch`; `None` means a NULL placeholder.
    pub fn rendering(&self, branch: Branch) -> Option<Rendering> {
        match (branch, self.archived) {
            (Branch::Live, _) => Some(self.live),
            (Branch::Archived, ArchivedRendering::SameAsLive) => Some(self.live),
            (Branch::Archived, ArchivedRendering::Custom(r)) => Some(r),
            (Branch::Archived, ArchivedRendering::Placeholder) => None,
        }
    }
}

/// Per-report-type definition.
#[derive(Debug, Clone)]
pub struct ReportDefinition {
    pub report_type: ReportType,
    pub categories: Vec<FieldCategory>,
    pub extra_kinds: Vec<ExtraFieldKind>,
    pub mandatory: Vec<&'static str>,
    pub default_sort: &'static str,
    pub supports_archive: bool,
}

impl ReportDefinition {
    pub fn allows(&self, category: FieldCategory) -> bool {
        self.categories.contains(&category)
    }
}

/// A resolved output column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Standard(&'static str),
    Extra { kind: ExtraFieldKind, id: u64 },
}

impl ColumnRef {
    pub fn field_id(&self) -> String {
        match self {
            ColumnRef::Standard(id) => id.to_string(),
            ColumnRef::Extra { kind, id } => format!("{}{id}", kind.prefix()),
        }
    }
}

pub fn parse_extra_field_id(field_id: &str) -> Option<(ExtraFieldKind, u64)> {
    [
        ExtraFieldKind::User,
        ExtraFieldKind::Course,
        ExtraFieldKind::Enrollment,
    ]
    .into_iter()
    .find_map(|kind| {
        field_id
            .strip_prefix(kind.prefix())
            .and_then(|rest| rest.parse::<u64>().ok())
            .map(|id| (kind, id))
    })
}

#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: HashMap<&'static str, FieldDescriptor>,
    reports: HashMap<ReportType, ReportDefinition>,
    /// Ids registered more than once; reported by `validate`.
    duplicates: Vec<&'static str>,
}

static STANDARD: Lazy<Arc<FieldRegistry>> = Lazy::new(|| Arc::new(FieldRegistry::standard()));

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from explicit parts (fixtures, tenant-specific variants).
    pub fn from_parts(fields: Vec<FieldDescriptor>, reports: Vec<ReportDefinition>) -> Self {
        let mut registry = Self::new();
        for field in fields {
            if let Some(previous) = registry.fields.insert(field.id, field) {
                registry.duplicates.push(previous.id);
            }
        }
        for report in reports {
            registry.reports.insert(report.report_type, report);
        }
        registry
    }

    /// The built-in registry covering every report type.
    pub fn standard() -> Self {
        let mut fields = Vec::new();
        fields.extend(user::fields());
        fields.extend(course::fields());
        fields.extend(enrollment::fields());
        fields.extend(learning_plan::fields());
        fields.extend(certification::fields());
        fields.extend(badge::fields());
        Self::from_parts(fields, standard_reports())
    }

    /// Process-wide instance of [`FieldRegistry::standard`].
    pub fn shared() -> Arc<FieldRegistry> {
        STANDARD.clone()
    }

    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.get(id)
    }

    pub fn report(&self, report_type: ReportType) -> Option<&ReportDefinition> {
        self.reports.get(&report_type)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &&'static str> {
        self.fields.keys()
    }

    /// Resolve a field id for `report_type`; unknown or disallowed ids yield `None`.
    pub fn resolve(&self, report_type: ReportType, field_id: &str) -> Option<ColumnRef> {
        let report = self.reports.get(&report_type)?;
        if let Some(field) = self.fields.get(field_id) {
            return report
                .allows(field.category)
                .then_some(ColumnRef::Standard(field.id));
        }
        let (kind, id) = parse_extra_field_id(field_id)?;
        report
            .extra_kinds
            .contains(&kind)
            .then_some(ColumnRef::Extra { kind, id })
    }

    /// Resolve the requested fields: unknown ids are dropped, duplicates keep
    /// their first position and mandatory fields are appended when missing.
    pub fn resolve_columns(&self, report_type: ReportType, requested: &[String]) -> Vec<ColumnRef> {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for field_id in requested {
            match self.resolve(report_type, field_id) {
                Some(column) => {
                    if seen.insert(column.clone()) {
                        columns.push(column);
                    }
                }
                None => {
                    tracing::debug!(
                        field = %field_id,
                        report_type = %report_type,
                        "dropping unknown field"
                    );
                }
            }
        }
        if let Some(report) = self.reports.get(&report_type) {
            for id in &report.mandatory {
                let column = ColumnRef::Standard(*id);
                if seen.insert(column.clone()) {
                    columns.push(column);
                }
            }
        }
        columns
    }

    /// Self-check run at startup.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = self.duplicates.first() {
            return Err(ReportflowError::Validation(format!(
                "field {id} is registered more than once"
            )));
        }
        for report in self.reports.values() {
            for id in report.mandatory.iter().chain(std::iter::once(&report.default_sort)) {
                let field = self.fields.get(id).ok_or_else(|| {
                    ReportflowError::Validation(format!(
                        "report {} references unknown field {id}",
                        report.report_type
                    ))
                })?;
                if !report.allows(field.category) {
                    return Err(ReportflowError::Validation(format!(
                        "report {} cannot expose field {id}",
                        report.report_type
                    )));
                }
            }
            if !report.mandatory.contains(&report.default_sort) {
                return Err(ReportflowError::Validation(format!(
                    "default sort {} of report {} must be mandatory",
                    report.default_sort, report.report_type
                )));
            }
        }
        for field in self.fields.values() {
            if parse_extra_field_id(field.id).is_some() {
                return Err(ReportflowError::Validation(format!(
                    "field {} collides with the additional field namespace",
                    field.id
                )));
            }
        }
        Ok(())
    }
}

fn standard_reports() -> Vec<ReportDefinition> {
    use FieldCategory::*;
    vec![
        ReportDefinition {
            report_type: ReportType::Users,
            categories: vec![User],
            extra_kinds: vec![ExtraFieldKind::User],
            mandatory: vec!["user_userid"],
            default_sort: "user_userid",
            supports_archive: false,
        },
        ReportDefinition {
            report_type: ReportType::UsersCourses,
            categories: vec![User, Course, Enrollment],
            extra_kinds: vec![
                ExtraFieldKind::User,
                ExtraFieldKind::Course,
                ExtraFieldKind::Enrollment,
            ],
            mandatory: vec!["user_userid", "course_name"],
            default_sort: "user_userid",
            supports_archive: true,
        },
        ReportDefinition {
            report_type: ReportType::UsersLearningPlans,
            categories: vec![User, LearningPlan],
            extra_kinds: vec![ExtraFieldKind::User],
            mandatory: vec!["user_userid", "lp_name"],
            default_sort: "user_userid",
            supports_archive: false,
        },
        ReportDefinition {
            report_type: ReportType::UsersCertifications,
            categories: vec![User, Certification],
            extra_kinds: vec![ExtraFieldKind::User],
            mandatory: vec!["user_userid", "certification_title"],
            default_sort: "user_userid",
            supports_archive: false,
        },
        ReportDefinition {
            report_type: ReportType::UsersBadges,
            categories: vec![User, Badge],
            extra_kinds: vec![ExtraFieldKind::User],
            mandatory: vec!["user_userid", "badge_name"],
            default_sort: "user_userid",
            supports_archive: false,
        },
    ]
}

// ============================================================================
// Rendering helpers shared by the field tables
// ============================================================================

/// Local timestamp text, NULL for empty/placeholder values.
pub(crate) fn local_timestamp(expr: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    SqlExpr::case(
        vec![(
            expr.clone().call(Function::IsValidTimestamp),
            expr.call(Function::FormatTimestamp {
                timezone: ctx.timezone.to_string(),
            }),
        )],
        SqlExpr::null(),
    )
}

pub(crate) fn local_date(expr: SqlExpr) -> SqlExpr {
    SqlExpr::case(
        vec![(
            expr.clone().call(Function::IsValidTimestamp),
            expr.call(Function::FormatDate),
        )],
        SqlExpr::null(),
    )
}

pub(crate) fn yes_no(cond: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    SqlExpr::case(
        vec![(cond, SqlExpr::str(&ctx.labels.text("_YES")))],
        SqlExpr::str(&ctx.labels.text("_NO")),
    )
}

/// Map coded values to translated labels; unknown codes render NULL.
pub(crate) fn coded(expr: SqlExpr, codes: &[(SqlExpr, &str)], ctx: &RenderContext<'_>) -> SqlExpr {
    let branches = codes
        .iter()
        .map(|(code, key)| {
            (
                expr.clone().equals(code.clone()),
                SqlExpr::str(&ctx.labels.text(key)),
            )
        })
        .collect();
    SqlExpr::case(branches, SqlExpr::null())
}

/// Scalar from a JSON snapshot column.
pub(crate) fn json(table: &str, column: &str, path: &str) -> SqlExpr {
    SqlExpr::col(table, column).call(Function::JsonExtract {
        path: path.to_string(),
    })
}
