//! One SELECT per enrollment source. The same walk over the output columns
//! and filters produces the live and the archived branch; only the
//! per-field renderings and filter columns differ.

use crate::fields::extra::{render_extra, CatalogSnapshot};
use crate::fields::{
    base_source, enrollment_user, Branch, ColumnRef, EnrollmentColumns, FieldRegistry, Labels,
    RenderContext,
};
use crate::lookup::ExtraFieldKind;
use crate::report::{ReportSpecification, ReportType};
use crate::scope::VisibilityScope;
use crate::sql_ast::{
    or_all, Function, SelectItem, SelectQuery, SqlBinaryOperator, SqlExpr,
};

use super::captions::OutputColumn;
use super::filters::{
    combine, enrollment_status_filter, id_filter, text_filter, FilterComposer,
};
use super::joins::JoinPlanner;
use super::visibility::{branch_members, group_members, VisibilityScoper};

pub(crate) struct BranchInputs<'a> {
    pub registry: &'a FieldRegistry,
    pub spec: &'a ReportSpecification,
    pub scope: &'a VisibilityScope,
    pub columns: &'a [OutputColumn],
    pub catalog: &'a CatalogSnapshot,
    pub labels: &'a Labels,
    pub composer: FilterComposer,
    pub timezone: &'a str,
    pub lang: &'a str,
}

pub(crate) fn build_branch(inputs: &BranchInputs<'_>, branch: Branch) -> SelectQuery {
    let report_type = inputs.spec.report_type;
    let ctx = RenderContext {
        report_type,
        branch,
        timezone: inputs.timezone,
        lang: inputs.lang,
        labels: inputs.labels,
    };

    let base = base_source(report_type, branch);
    let mut planner = JoinPlanner::with_base(base.alias);
    for key in &base.joins {
        planner.register_key(*key, &ctx);
    }

    let select = inputs
        .columns
        .iter()
        .map(|column| {
            let expr = render_column(inputs, column, &ctx, &mut planner);
            SelectItem::caption(expr, column.caption.clone())
        })
        .collect();

    let mut filters = Vec::new();
    filters.extend(user_filters(inputs, &ctx, &mut planner));
    filters.extend(entity_filters(inputs, branch));
    if report_type == ReportType::UsersCourses {
        if let Some(enrollment) = &inputs.spec.enrollment {
            filters.extend(enrollment_status_filter(
                enrollment,
                &EnrollmentColumns::for_branch(branch),
            ));
        }
    }
    filters.extend(date_filters(inputs, branch));

    let scoper = VisibilityScoper::new(inputs.scope);
    scoper.restrict_users(&mut planner, enrollment_user(report_type, branch));
    if report_type == ReportType::UsersCourses {
        scoper.restrict_courses(&mut planner, course_id(branch));
    }

    SelectQuery {
        select,
        from: base.from,
        joins: planner.into_joins(),
        filters,
        ..Default::default()
    }
}

fn render_column(
    inputs: &BranchInputs<'_>,
    column: &OutputColumn,
    ctx: &RenderContext<'_>,
    planner: &mut JoinPlanner,
) -> SqlExpr {
    match &column.column {
        ColumnRef::Standard(id) => {
            let Some(rendering) = inputs.registry.field(id).and_then(|f| f.rendering(ctx.branch))
            else {
                return SqlExpr::null();
            };
            for key in rendering.joins {
                planner.register_key(*key, ctx);
            }
            (rendering.expr)(ctx)
        }
        ColumnRef::Extra { kind, id } => extra_value(inputs, *kind, *id, ctx, planner),
    }
}

fn extra_value(
    inputs: &BranchInputs<'_>,
    kind: ExtraFieldKind,
    id: u64,
    ctx: &RenderContext<'_>,
    planner: &mut JoinPlanner,
) -> SqlExpr {
    let rendering = render_extra(kind, id, inputs.catalog.get(kind, id), ctx);
    for key in &rendering.static_joins {
        planner.register_key(*key, ctx);
    }
    for (alias, join) in rendering.joins {
        planner.register_join(&alias, || join);
    }
    rendering.expr
}

fn course_id(branch: Branch) -> SqlExpr {
    match branch {
        Branch::Live => SqlExpr::col("cu", "idCourse"),
        Branch::Archived => SqlExpr::col("ae", "id_course"),
    }
}

fn course_category(branch: Branch) -> SqlExpr {
    match branch {
        Branch::Live => SqlExpr::col("c", "idCategory"),
        Branch::Archived => SqlExpr::col("ae", "course_info")
            .call(Function::JsonExtract {
                path: "course.idCategory".to_string(),
            })
            .call(Function::ToInteger),
    }
}

/// Anonymous user exclusion, user selection, deactivation and additional field filters.
fn user_filters(
    inputs: &BranchInputs<'_>,
    ctx: &RenderContext<'_>,
    planner: &mut JoinPlanner,
) -> Vec<SqlExpr> {
    let mut filters = vec![SqlExpr::col("u", "userid")
        .binary(SqlBinaryOperator::Neq, SqlExpr::str("/Anonymous"))];
    let user_id = SqlExpr::col("u", "idst");

    if let Some(users) = &inputs.spec.users {
        if users.hide_deactivated {
            filters.push(SqlExpr::col("u", "valid").equals(SqlExpr::int(1)));
        }
        if !users.all {
            let mut selection = Vec::new();
            if !users.users.is_empty() {
                selection.push(id_filter(user_id.clone(), &users.users));
            }
            let groups = inputs.scope.visible_groups(&users.groups);
            if !groups.is_empty() {
                selection.push(group_members(user_id.clone(), &groups));
            }
            selection.extend(branch_members(user_id.clone(), &users.branches));
            filters.push(or_all(selection).unwrap_or_else(|| SqlExpr::bool(false)));
        }
    }

    if let Some(additional) = &inputs.spec.user_additional_fields {
        let preds: Vec<SqlExpr> = additional
            .filters
            .iter()
            .filter_map(|condition| {
                let Some(field) = inputs.catalog.get(ExtraFieldKind::User, condition.field_id)
                else {
                    tracing::debug!(
                        field_id = condition.field_id,
                        "filter on unknown additional field ignored"
                    );
                    return None;
                };
                let value = extra_value(inputs, ExtraFieldKind::User, field.id, ctx, planner);
                Some(text_filter(value, condition.operator, &condition.value))
            })
            .collect();
        filters.extend(combine(preds, additional.conditions));
    }
    filters
}

/// Course, learning plan, certification and badge selections.
fn entity_filters(inputs: &BranchInputs<'_>, branch: Branch) -> Vec<SqlExpr> {
    let spec = inputs.spec;
    let mut filters = Vec::new();
    match spec.report_type {
        ReportType::UsersCourses => {
            if let Some(courses) = spec.courses.as_ref().filter(|c| !c.all) {
                let mut selection = Vec::new();
                let ids = inputs.scope.visible_courses(&courses.courses);
                if !ids.is_empty() {
                    selection.push(id_filter(course_id(branch), &ids));
                }
                if !courses.categories.is_empty() {
                    selection.push(id_filter(course_category(branch), &courses.categories));
                }
                filters.push(or_all(selection).unwrap_or_else(|| SqlExpr::bool(false)));
            }
        }
        ReportType::UsersLearningPlans => {
            if let Some(plans) = spec.learning_plans.as_ref().filter(|p| !p.all) {
                filters.push(id_filter(SqlExpr::col("lpu", "id_path"), &plans.ids));
            }
        }
        ReportType::UsersCertifications => {
            if let Some(certs) = spec.certifications.as_ref().filter(|c| !c.all) {
                filters.push(id_filter(SqlExpr::col("ceu", "id_cert"), &certs.ids));
            }
        }
        ReportType::UsersBadges => {
            if let Some(badges) = spec.badges.as_ref().filter(|b| !b.all) {
                filters.push(id_filter(SqlExpr::col("gab", "id_badge"), &badges.ids));
            }
        }
        ReportType::Users => {}
    }
    filters
}

/// Date range predicates combined with the report combinator. The live
/// branch has no archiving date, so that range only applies to snapshots.
fn date_filters(inputs: &BranchInputs<'_>, branch: Branch) -> Option<SqlExpr> {
    let ranges = inputs.spec.date_ranges.as_ref()?;
    let composer = &inputs.composer;
    let mut preds = Vec::new();
    match inputs.spec.report_type {
        ReportType::UsersCourses => {
            let cols = EnrollmentColumns::for_branch(branch);
            preds.extend(composer.build_date_filter(
                cols.enrolled_at,
                ranges.enrollment_date.as_ref(),
                false,
            ));
            preds.extend(composer.build_date_filter(
                cols.completed_at,
                ranges.completion_date.as_ref(),
                false,
            ));
            let course_end = match branch {
                Branch::Live => SqlExpr::col("c", "date_end"),
                Branch::Archived => SqlExpr::col("ae", "course_info")
                    .call(Function::JsonExtract {
                        path: "course.date_end".to_string(),
                    })
                    .call(Function::ToTimestamp),
            };
            preds.extend(composer.build_date_filter(
                course_end,
                ranges.course_expiration_date.as_ref(),
                true,
            ));
            if branch == Branch::Archived {
                preds.extend(composer.build_date_filter(
                    SqlExpr::col("ae", "archived_at"),
                    ranges.archiving_date.as_ref(),
                    false,
                ));
            }
        }
        ReportType::UsersLearningPlans => {
            preds.extend(composer.build_date_filter(
                SqlExpr::col("lpu", "date_assign"),
                ranges.lp_enrollment_date.as_ref(),
                false,
            ));
        }
        ReportType::UsersCertifications => {
            preds.extend(composer.build_date_filter(
                SqlExpr::col("ceu", "on_datetime"),
                ranges.certification_issue_date.as_ref(),
                false,
            ));
        }
        ReportType::UsersBadges => {
            preds.extend(composer.build_date_filter(
                SqlExpr::col("gab", "issued_on"),
                ranges.badge_issue_date.as_ref(),
                false,
            ));
        }
        ReportType::Users => {}
    }
    combine(preds, ranges.conditions)
}
