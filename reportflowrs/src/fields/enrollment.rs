use crate::sql_ast::{Function, SqlExpr};

use super::{
    json, local_timestamp, Branch, DataType, FieldCategory, FieldDescriptor, RenderContext,
};

/// Enrollment columns shared by field renderings and filters.
#[derive(Debug, Clone)]
pub struct EnrollmentColumns {
    pub status: SqlExpr,
    pub waiting: SqlExpr,
    pub enrolled_at: SqlExpr,
    pub completed_at: SqlExpr,
}

impl EnrollmentColumns {
    pub fn for_branch(branch: Branch) -> Self {
        match branch {
            Branch::Live => Self {
                status: SqlExpr::col("cu", "status"),
                waiting: SqlExpr::col("cu", "waiting"),
                enrolled_at: SqlExpr::col("cu", "date_inscr"),
                completed_at: SqlExpr::col("cu", "date_complete"),
            },
            Branch::Archived => Self {
                status: snapshot("enrollment.status").call(Function::ToInteger),
                waiting: snapshot("enrollment.waiting").call(Function::ToInteger),
                enrolled_at: snapshot("enrollment.date_inscr").call(Function::ToTimestamp),
                completed_at: snapshot("enrollment.date_complete").call(Function::ToTimestamp),
            },
        }
    }
}

fn snapshot(path: &str) -> SqlExpr {
    json("ae", "enrollment_info", path)
}

fn status_label(cols: &EnrollmentColumns, ctx: &RenderContext<'_>) -> SqlExpr {
    let status = &cols.status;
    let label = |key: &str| SqlExpr::str(&ctx.labels.text(key));
    SqlExpr::case(
        vec![
            (cols.waiting.clone().equals(SqlExpr::int(1)), label("_WAITING_USERS")),
            (status.clone().equals(SqlExpr::int(-2)), label("_USER_STATUS_CONFIRM")),
            (status.clone().equals(SqlExpr::int(0)), label("_USER_STATUS_SUBS")),
            (status.clone().equals(SqlExpr::int(1)), label("_USER_STATUS_BEGIN")),
            (status.clone().equals(SqlExpr::int(2)), label("_USER_STATUS_END")),
            (status.clone().equals(SqlExpr::int(3)), label("_USER_STATUS_SUSPEND")),
        ],
        SqlExpr::null(),
    )
}

fn level_label(level: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    super::coded(
        level,
        &[
            (SqlExpr::int(3), "_LEVEL_3"),
            (SqlExpr::int(4), "_LEVEL_4"),
            (SqlExpr::int(6), "_LEVEL_6"),
        ],
        ctx,
    )
}

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::Enrollment;

    vec![
        FieldDescriptor::new(
            "enrollment_level",
            Enrollment,
            ("_LEVEL", "Enrollment Level"),
            Label,
            &[],
            |ctx| level_label(SqlExpr::col("cu", "level"), ctx),
        )
        .archived(&[], |ctx| {
            level_label(snapshot("enrollment.level").call(Function::ToInteger), ctx)
        }),
        FieldDescriptor::new(
            "enrollment_status",
            Enrollment,
            ("_STATUS", "User Course Status"),
            Label,
            &[],
            |ctx| status_label(&EnrollmentColumns::for_branch(Branch::Live), ctx),
        )
        .archived(&[], |ctx| {
            status_label(&EnrollmentColumns::for_branch(Branch::Archived), ctx)
        }),
        FieldDescriptor::new(
            "enrollment_date",
            Enrollment,
            ("_DATE_INSCR", "Enrollment Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(EnrollmentColumns::for_branch(Branch::Live).enrolled_at, ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(EnrollmentColumns::for_branch(Branch::Archived).enrolled_at, ctx)
        }),
        FieldDescriptor::new(
            "enrollment_first_access",
            Enrollment,
            ("_DATE_FIRST_ACCESS", "Course First Access Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("cu", "date_first_access"), ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(
                snapshot("enrollment.date_first_access").call(Function::ToTimestamp),
                ctx,
            )
        }),
        FieldDescriptor::new(
            "enrollment_last_access",
            Enrollment,
            ("_DATE_LAST_ACCESS", "Course Last Access Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("cu", "date_last_access"), ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(
                snapshot("enrollment.date_last_access").call(Function::ToTimestamp),
                ctx,
            )
        }),
        FieldDescriptor::new(
            "enrollment_completion_date",
            Enrollment,
            ("_DATE_COMPLETE", "Course Completion Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(EnrollmentColumns::for_branch(Branch::Live).completed_at, ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(EnrollmentColumns::for_branch(Branch::Archived).completed_at, ctx)
        }),
        FieldDescriptor::new(
            "enrollment_expiration",
            Enrollment,
            ("_DATE_EXPIRE_VALIDITY", "Enrollment Deadline"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("cu", "date_expire_validity"), ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(
                snapshot("enrollment.date_expire_validity").call(Function::ToTimestamp),
                ctx,
            )
        }),
        FieldDescriptor::new(
            "enrollment_score",
            Enrollment,
            ("_FINAL_SCORE", "Final Score"),
            Number,
            &[],
            |_| SqlExpr::col("cu", "score_given"),
        )
        .archived(&[], |_| snapshot("enrollment.score_given").call(Function::ToNumber)),
        FieldDescriptor::new(
            "enrollment_initial_score",
            Enrollment,
            ("_INITIAL_SCORE", "Initial Score"),
            Number,
            &[],
            |_| SqlExpr::col("cu", "initial_score_given"),
        )
        .archived(&[], |_| {
            snapshot("enrollment.initial_score_given").call(Function::ToNumber)
        }),
        FieldDescriptor::new(
            "enrollment_session_time",
            Enrollment,
            ("_TOTAL_SESSION_TIME", "Training Material Time (sec)"),
            Number,
            &[],
            |_| SqlExpr::col("cu", "total_time"),
        )
        .archived(&[], |_| snapshot("enrollment.total_time").call(Function::ToInteger)),
        FieldDescriptor::new(
            "enrollment_archived",
            Enrollment,
            ("_ARCHIVED_ENROLLMENT", "Archived Enrollment"),
            Label,
            &[],
            |ctx| SqlExpr::str(&ctx.labels.text("_NO")),
        )
        .archived(&[], |ctx| SqlExpr::str(&ctx.labels.text("_YES"))),
        FieldDescriptor::new(
            "enrollment_archiving_date",
            Enrollment,
            ("_ARCHIVING_DATE", "Archiving Date"),
            Timestamp,
            &[],
            |_| SqlExpr::null(),
        )
        .archived(&[], |ctx| local_timestamp(SqlExpr::col("ae", "archived_at"), ctx)),
    ]
}
