//! Static join catalog. Each key owns one alias; the compiler's join planner
//! registers a key at most once per SELECT.

use crate::report::ReportType;
use crate::sql_ast::{Aggregation, Join, SelectItem, SelectQuery, SqlExpr, SqlJoinType, TableRef};

use super::{Branch, RenderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKey {
    User,
    Course,
    LearningPlan,
    Certification,
    Badge,
    UserLevel,
    UserBranches,
    CategoryTranslation,
    BadgeTranslation,
    UserFieldValues,
    CourseFieldValues,
}

impl JoinKey {
    pub fn alias(&self) -> &'static str {
        match self {
            JoinKey::User => "u",
            JoinKey::Course => "c",
            JoinKey::LearningPlan => "lp",
            JoinKey::Certification => "cert",
            JoinKey::Badge => "gb",
            JoinKey::UserLevel => "cul",
            JoinKey::UserBranches => "ub",
            JoinKey::CategoryTranslation => "coct",
            JoinKey::BadgeTranslation => "gbt",
            JoinKey::UserFieldValues => "cufv",
            JoinKey::CourseFieldValues => "lcfv",
        }
    }

    pub fn build(&self, ctx: &RenderContext<'_>) -> Join {
        let alias = self.alias();
        match self {
            JoinKey::User => inner(
                TableRef::table("core_user", alias),
                vec![SqlExpr::col(alias, "idst")
                    .equals(enrollment_user(ctx.report_type, ctx.branch))],
            ),
            // Live base only; archived rows carry course snapshots.
            JoinKey::Course => inner(
                TableRef::table("learning_course", alias),
                vec![SqlExpr::col(alias, "idCourse").equals(SqlExpr::col("cu", "idCourse"))],
            ),
            JoinKey::LearningPlan => inner(
                TableRef::table("learning_coursepath", alias),
                vec![SqlExpr::col(alias, "id_path").equals(SqlExpr::col("lpu", "id_path"))],
            ),
            JoinKey::Certification => inner(
                TableRef::table("certification", alias),
                vec![SqlExpr::col(alias, "id_cert").equals(SqlExpr::col("ceu", "id_cert"))],
            ),
            JoinKey::Badge => inner(
                TableRef::table("gamification_badge", alias),
                vec![SqlExpr::col(alias, "id_badge").equals(SqlExpr::col("gab", "id_badge"))],
            ),
            JoinKey::UserLevel => left(
                TableRef::table("core_user_levels", alias),
                vec![SqlExpr::col(alias, "idUser").equals(SqlExpr::col("u", "idst"))],
            ),
            JoinKey::UserBranches => left(
                TableRef::subquery(branch_names_query(ctx.lang), alias),
                vec![SqlExpr::col(alias, "id_user").equals(SqlExpr::col("u", "idst"))],
            ),
            JoinKey::CategoryTranslation => left(
                TableRef::table("learning_category_translation", alias),
                vec![
                    SqlExpr::col(alias, "idCategory").equals(SqlExpr::col("c", "idCategory")),
                    SqlExpr::col(alias, "lang_code").equals(SqlExpr::str(ctx.lang)),
                ],
            ),
            JoinKey::BadgeTranslation => left(
                TableRef::table("gamification_badge_translation", alias),
                vec![
                    SqlExpr::col(alias, "id_badge").equals(SqlExpr::col("gb", "id_badge")),
                    SqlExpr::col(alias, "lang_code").equals(SqlExpr::str(ctx.lang)),
                ],
            ),
            JoinKey::UserFieldValues => left(
                TableRef::table("core_user_field_value", alias),
                vec![SqlExpr::col(alias, "id_user").equals(SqlExpr::col("u", "idst"))],
            ),
            JoinKey::CourseFieldValues => left(
                TableRef::table("learning_course_field_value", alias),
                vec![SqlExpr::col(alias, "id_course").equals(SqlExpr::col("c", "idCourse"))],
            ),
        }
    }
}

pub(crate) fn inner(table: TableRef, on: Vec<SqlExpr>) -> Join {
    Join {
        join_type: SqlJoinType::Inner,
        table,
        on,
    }
}

pub(crate) fn left(table: TableRef, on: Vec<SqlExpr>) -> Join {
    Join {
        join_type: SqlJoinType::Left,
        table,
        on,
    }
}

/// Comma separated branch names per user, in the report language.
fn branch_names_query(lang: &str) -> SelectQuery {
    SelectQuery {
        select: vec![
            SelectItem::named(SqlExpr::col("gm", "idstMember"), "id_user"),
            SelectItem::named(
                SqlExpr::col("oc", "translation").agg(Aggregation::StringAgg {
                    separator: ", ".to_string(),
                }),
                "branch_names",
            ),
        ],
        from: TableRef::table("core_group_members", "gm"),
        joins: vec![
            inner(
                TableRef::table("core_org_chart_tree", "oct"),
                vec![SqlExpr::col("oct", "idst_oc").equals(SqlExpr::col("gm", "idst"))],
            ),
            inner(
                TableRef::table("core_org_chart", "oc"),
                vec![
                    SqlExpr::col("oc", "id_dir").equals(SqlExpr::col("oct", "idOrg")),
                    SqlExpr::col("oc", "lang_code").equals(SqlExpr::str(lang)),
                ],
            ),
        ],
        group_by: vec![SqlExpr::col("gm", "idstMember")],
        ..Default::default()
    }
}

/// FROM clause of one report branch plus the joins every row needs.
#[derive(Debug, Clone)]
pub struct BaseSource {
    pub alias: &'static str,
    pub from: TableRef,
    pub joins: Vec<JoinKey>,
}

pub fn base_source(report_type: ReportType, branch: Branch) -> BaseSource {
    let (table, alias, joins) = match (report_type, branch) {
        (ReportType::Users, _) => ("core_user", "u", vec![]),
        (ReportType::UsersCourses, Branch::Live) => {
            ("learning_courseuser", "cu", vec![JoinKey::User, JoinKey::Course])
        }
        (ReportType::UsersCourses, Branch::Archived) => {
            ("archived_enrollments", "ae", vec![JoinKey::User])
        }
        (ReportType::UsersLearningPlans, _) => (
            "learning_coursepath_user",
            "lpu",
            vec![JoinKey::User, JoinKey::LearningPlan],
        ),
        (ReportType::UsersCertifications, _) => (
            "certification_user",
            "ceu",
            vec![JoinKey::User, JoinKey::Certification],
        ),
        (ReportType::UsersBadges, _) => (
            "gamification_assigned_badges",
            "gab",
            vec![JoinKey::User, JoinKey::Badge],
        ),
    };
    BaseSource {
        alias,
        from: TableRef::table(table, alias),
        joins,
    }
}

/// The user id column of the row source.
pub fn enrollment_user(report_type: ReportType, branch: Branch) -> SqlExpr {
    match (report_type, branch) {
        (ReportType::Users, _) => SqlExpr::col("u", "idst"),
        (ReportType::UsersCourses, Branch::Live) => SqlExpr::col("cu", "idUser"),
        (ReportType::UsersCourses, Branch::Archived) => SqlExpr::col("ae", "id_user"),
        (ReportType::UsersLearningPlans, _) => SqlExpr::col("lpu", "idUser"),
        (ReportType::UsersCertifications, _) => SqlExpr::col("ceu", "id_user"),
        (ReportType::UsersBadges, _) => SqlExpr::col("gab", "id_user"),
    }
}
