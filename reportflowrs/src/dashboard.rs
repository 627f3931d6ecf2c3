//! Branch dashboards over the org-chart tree: a per-user listing with
//! enrollment counts, or a single summary row.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::compiler::filters::text_filter;
use crate::compiler::visibility::{subtree_containment, VisibilityScoper};
use crate::compiler::{
    ArchiveMode, CompileOptions, CompiledQuery, JoinPlanner, OutputColumn, SortingResolver,
};
use crate::config::ReportflowConfig;
use crate::error::{Result, ReportflowError};
use crate::fields::{Branch, ColumnRef, DataType, FieldRegistry, Labels, RenderContext};
use crate::lookup::{BranchNode, OrgChartDirectory, TranslationService};
use crate::report::{ReportType, SortingOptions, TextOperator};
use crate::scope::VisibilityScope;
use crate::sql_ast::{
    or_all, Aggregation, Join, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr, SqlJoinType,
    SqlRenderer, TableRef,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardKind {
    #[default]
    Users,
    Summary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRequest {
    /// Org-chart node; the tree root when absent.
    #[serde(default)]
    pub branch_id: Option<u64>,
    #[serde(default)]
    pub include_descendants: bool,
    #[serde(default)]
    pub kind: DashboardKind,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub sorting_options: SortingOptions,
}

const USER_FIELDS: [&str; 3] = ["user_userid", "user_fullname", "user_email"];

struct Metric {
    id: &'static str,
    label_key: &'static str,
    default_label: &'static str,
    expr: fn() -> SqlExpr,
}

const USER_METRICS: [Metric; 3] = [
    Metric {
        id: "enrolled_courses",
        label_key: "_DASHBOARD_ENROLLED_COURSES",
        default_label: "Enrolled Courses",
        expr: distinct_courses,
    },
    Metric {
        id: "completed_courses",
        label_key: "_DASHBOARD_COMPLETED_COURSES",
        default_label: "Completed Courses",
        expr: completed,
    },
    Metric {
        id: "in_progress_courses",
        label_key: "_DASHBOARD_IN_PROGRESS_COURSES",
        default_label: "Courses In Progress",
        expr: in_progress,
    },
];

const SUMMARY_METRICS: [Metric; 4] = [
    Metric {
        id: "users",
        label_key: "_DASHBOARD_USERS",
        default_label: "Users",
        expr: distinct_users,
    },
    Metric {
        id: "enrollments",
        label_key: "_DASHBOARD_ENROLLMENTS",
        default_label: "Enrollments",
        expr: enrollments,
    },
    Metric {
        id: "completed_courses",
        label_key: "_DASHBOARD_COMPLETED_COURSES",
        default_label: "Completed Courses",
        expr: completed,
    },
    Metric {
        id: "in_progress_courses",
        label_key: "_DASHBOARD_IN_PROGRESS_COURSES",
        default_label: "Courses In Progress",
        expr: in_progress,
    },
];

fn distinct_users() -> SqlExpr {
    SqlExpr::col("u", "idst").agg(Aggregation::CountDistinct)
}

fn distinct_courses() -> SqlExpr {
    SqlExpr::col("cu", "idCourse").agg(Aggregation::CountDistinct)
}

fn enrollments() -> SqlExpr {
    SqlExpr::col("cu", "idCourse").agg(Aggregation::Count)
}

fn completed() -> SqlExpr {
    status_count(2)
}

fn in_progress() -> SqlExpr {
    status_count(1)
}

fn status_count(status: i64) -> SqlExpr {
    SqlExpr::case(
        vec![(SqlExpr::col("cu", "status").equals(SqlExpr::int(status)), SqlExpr::int(1))],
        SqlExpr::int(0),
    )
    .agg(Aggregation::Sum)
}

pub struct DashboardCompiler {
    registry: Arc<FieldRegistry>,
    org_chart: Arc<dyn OrgChartDirectory>,
    translations: Arc<dyn TranslationService>,
    config: ReportflowConfig,
}

impl DashboardCompiler {
    pub fn new(
        registry: Arc<FieldRegistry>,
        org_chart: Arc<dyn OrgChartDirectory>,
        translations: Arc<dyn TranslationService>,
    ) -> Self {
        Self {
            registry,
            org_chart,
            translations,
            config: ReportflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReportflowConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn compile(
        &self,
        request: &DashboardRequest,
        scope: &VisibilityScope,
        options: &CompileOptions,
    ) -> Result<CompiledQuery> {
        let lang = options
            .lang
            .as_deref()
            .unwrap_or(&self.config.compiler.default_lang);
        let (node, labels) = futures::try_join!(self.resolve_branch(request), self.labels(lang))?;

        let ctx = RenderContext {
            report_type: ReportType::Users,
            branch: Branch::Live,
            timezone: &self.config.compiler.default_timezone,
            lang,
            labels: &labels,
        };
        let warehouse = self.config.for_dialect(options.dialect);
        let limit = match request.kind {
            DashboardKind::Users => options.limit.rows(&warehouse),
            DashboardKind::Summary => None,
        };
        let (query, columns) = self.build(request, scope, &node, &ctx, limit);

        let dialect = options.dialect.build(warehouse.schema.clone());
        let sql = SqlRenderer::new(dialect.as_ref()).render_select(&query);
        tracing::debug!(
            branch = node.id,
            kind = ?request.kind,
            dialect = %options.dialect,
            "compiled dashboard"
        );
        tracing::trace!(sql = %sql, "dashboard sql");

        Ok(CompiledQuery {
            sql,
            dialect: options.dialect,
            limit,
            mode: ArchiveMode::ActiveOnly,
            columns: columns.into_iter().map(|c| c.caption).collect(),
        })
    }

    async fn resolve_branch(&self, request: &DashboardRequest) -> Result<BranchNode> {
        let timeout = self.config.compiler.lookup_timeout();
        let lookup = async {
            match request.branch_id {
                Some(id) => self.org_chart.branch(id).await?.ok_or_else(|| {
                    ReportflowError::not_found(
                        "branch_not_found",
                        format!("branch {id} does not exist"),
                    )
                }),
                None => self.org_chart.root().await,
            }
        };
        tokio::time::timeout(timeout, lookup)
            .await
            .map_err(|_| ReportflowError::Lookup("org chart lookup timed out".to_string()))?
    }

    async fn labels(&self, lang: &str) -> Result<Labels> {
        let mut keys: Vec<String> = USER_FIELDS
            .iter()
            .filter_map(|id| self.registry.field(id))
            .map(|f| f.label_key.to_string())
            .collect();
        keys.extend(
            USER_METRICS
                .iter()
                .chain(SUMMARY_METRICS.iter())
                .map(|m| m.label_key.to_string()),
        );
        keys.sort();
        keys.dedup();
        let timeout = self.config.compiler.lookup_timeout();
        let translations: HashMap<String, String> =
            tokio::time::timeout(timeout, self.translations.get_translations(&keys, lang))
                .await
                .map_err(|_| ReportflowError::Lookup("translation lookup timed out".to_string()))??;
        Ok(Labels::new(translations))
    }

    fn build(
        &self,
        request: &DashboardRequest,
        scope: &VisibilityScope,
        node: &BranchNode,
        ctx: &RenderContext<'_>,
        limit: Option<u64>,
    ) -> (SelectQuery, Vec<OutputColumn>) {
        // Root has no parent to stop at, so the whole tree is implied.
        let descendants = request.include_descendants || request.branch_id.is_none();
        let scoper = VisibilityScoper::new(scope);

        let mut membership = vec![subtree_containment("oct", node, descendants)];
        membership.extend(scoper.assigned_subtrees("oct"));
        let members = SelectQuery {
            select: vec![SelectItem::bare(SqlExpr::col("gm", "idstMember"))],
            from: TableRef::table("core_group_members", "gm"),
            joins: vec![Join {
                join_type: SqlJoinType::Inner,
                table: TableRef::table("core_org_chart_tree", "oct"),
                on: vec![SqlExpr::col("oct", "idst_oc").equals(SqlExpr::col("gm", "idst"))],
            }],
            filters: membership,
            ..Default::default()
        };

        let mut planner = JoinPlanner::with_base("u");
        planner.register_join("cu", || Join {
            join_type: SqlJoinType::Left,
            table: TableRef::table("learning_courseuser", "cu"),
            on: vec![SqlExpr::col("cu", "idUser").equals(SqlExpr::col("u", "idst"))],
        });
        scoper.restrict_users(&mut planner, SqlExpr::col("u", "idst"));

        let mut filters = vec![
            SqlExpr::col("u", "userid").binary(SqlBinaryOperator::Neq, SqlExpr::str("/Anonymous")),
            SqlExpr::col("u", "idst").in_subquery(members),
        ];
        filters.extend(search_filter(request.search.as_deref()));

        let mut query = SelectQuery {
            from: TableRef::table("core_user", "u"),
            filters,
            ..Default::default()
        };
        let mut columns = Vec::new();
        match request.kind {
            DashboardKind::Users => {
                for id in USER_FIELDS {
                    let Some(field) = self.registry.field(id) else {
                        continue;
                    };
                    let Some(rendering) = field.rendering(Branch::Live) else {
                        continue;
                    };
                    for key in rendering.joins {
                        planner.register_key(*key, ctx);
                    }
                    let caption = ctx
                        .labels
                        .get(field.label_key)
                        .unwrap_or(field.default_label)
                        .to_string();
                    query.select.push(SelectItem::caption((rendering.expr)(ctx), caption.clone()));
                    columns.push(OutputColumn {
                        column: ColumnRef::Standard(field.id),
                        caption,
                        data_type: field.data_type,
                        sortable: field.sortable,
                    });
                }
                query.group_by = vec![
                    SqlExpr::col("u", "idst"),
                    SqlExpr::col("u", "userid"),
                    SqlExpr::col("u", "firstname"),
                    SqlExpr::col("u", "lastname"),
                    SqlExpr::col("u", "email"),
                ];
                push_metrics(&mut query, &mut columns, &USER_METRICS, ctx.labels);
                query.order_by = SortingResolver::new(&columns, "user_userid", &["user_userid"])
                    .order_by(&request.sorting_options);
                query.limit = limit;
            }
            DashboardKind::Summary => {
                push_metrics(&mut query, &mut columns, &SUMMARY_METRICS, ctx.labels);
            }
        }
        query.joins = planner.into_joins();
        (query, columns)
    }
}

fn push_metrics(
    query: &mut SelectQuery,
    columns: &mut Vec<OutputColumn>,
    metrics: &[Metric],
    labels: &Labels,
) {
    for metric in metrics {
        let caption = labels
            .get(metric.label_key)
            .unwrap_or(metric.default_label)
            .to_string();
        query.select.push(SelectItem::caption((metric.expr)(), caption.clone()));
        columns.push(OutputColumn {
            column: ColumnRef::Standard(metric.id),
            caption,
            data_type: DataType::Number,
            sortable: true,
        });
    }
}

/// Case-insensitive match on username, names and email.
fn search_filter(search: Option<&str>) -> Option<SqlExpr> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    or_all(
        ["userid", "firstname", "lastname", "email"]
            .iter()
            .map(|column| text_filter(SqlExpr::col("u", column), TextOperator::Contains, term))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_adds_nothing() {
        assert!(search_filter(None).is_none());
        assert!(search_filter(Some("   ")).is_none());
        assert!(search_filter(Some("ann")).is_some());
    }

    #[test]
    fn request_parses_camel_case() {
        let request: DashboardRequest = serde_json::from_str(
            r#"{"branchId": 12, "includeDescendants": true, "kind": "summary"}"#,
        )
        .unwrap();
        assert_eq!(request.branch_id, Some(12));
        assert!(request.include_descendants);
        assert_eq!(request.kind, DashboardKind::Summary);
        assert!(request.search.is_none());
    }
}
