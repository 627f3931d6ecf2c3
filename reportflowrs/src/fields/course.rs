//! Course fields. Archived rows read the course snapshot stored with the
//! enrollment (`archived_enrollments.course_info`).

use crate::sql_ast::{Function, SqlExpr};

use super::{
    coded, json, local_date, local_timestamp, yes_no, DataType, FieldCategory, FieldDescriptor,
    JoinKey, RenderContext,
};

fn snapshot(path: &str) -> SqlExpr {
    json("ae", "course_info", path)
}

fn course_type(expr: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    coded(
        expr,
        &[
            (SqlExpr::str("elearning"), "_ELEARNING"),
            (SqlExpr::str("classroom"), "_CLASSROOM"),
            (SqlExpr::str("webinar"), "_WEBINAR"),
        ],
        ctx,
    )
}

fn course_status(expr: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    SqlExpr::case(
        vec![(
            expr.equals(SqlExpr::int(0)),
            SqlExpr::str(&ctx.labels.text("_UNDER_MAINTENANCE")),
        )],
        SqlExpr::str(&ctx.labels.text("_PUBLISHED")),
    )
}

fn expired(date_end: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    yes_no(
        date_end
            .clone()
            .call(Function::IsValidTimestamp)
            .and(date_end.lt(SqlExpr::func(Function::CurrentTimestamp, vec![]))),
        ctx,
    )
}

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::Course;

    vec![
        FieldDescriptor::new(
            "course_id",
            Course,
            ("_COURSE_ID", "Course ID"),
            Number,
            &[],
            |_| SqlExpr::col("c", "idCourse"),
        )
        .archived(&[], |_| snapshot("course.idCourse").call(Function::ToInteger)),
        FieldDescriptor::new(
            "course_uid",
            Course,
            ("_COURSE_UNIQUE_ID", "Course Unique ID"),
            Text,
            &[],
            |_| SqlExpr::col("c", "uidCourse"),
        )
        .archived(&[], |_| snapshot("course.uidCourse")),
        FieldDescriptor::new(
            "course_code",
            Course,
            ("_COURSE_CODE", "Course Code"),
            Text,
            &[],
            |_| SqlExpr::col("c", "code"),
        )
        .archived(&[], |_| snapshot("course.code")),
        FieldDescriptor::new(
            "course_name",
            Course,
            ("_COURSE_NAME", "Course Name"),
            Text,
            &[],
            |_| SqlExpr::col("c", "name"),
        )
        .archived(&[], |_| snapshot("course.name")),
        FieldDescriptor::new(
            "course_type",
            Course,
            ("_COURSE_TYPE", "Course Type"),
            Label,
            &[],
            |ctx| course_type(SqlExpr::col("c", "course_type"), ctx),
        )
        .archived(&[], |ctx| course_type(snapshot("course.course_type"), ctx)),
        FieldDescriptor::new(
            "course_category",
            Course,
            ("_CATEGORY", "Course Category"),
            Text,
            &[JoinKey::CategoryTranslation],
            |_| SqlExpr::col("coct", "translation"),
        )
        .archived(&[], |_| snapshot("course.category")),
        FieldDescriptor::new(
            "course_category_path",
            Course,
            ("_CATEGORY_PATH", "Course Category Path"),
            Text,
            &[JoinKey::CategoryTranslation],
            |_| SqlExpr::col("coct", "path_translation"),
        )
        .archived(&[], |_| snapshot("course.category_path")),
        FieldDescriptor::new(
            "course_status",
            Course,
            ("_STATUS", "Course Status"),
            Label,
            &[],
            |ctx| course_status(SqlExpr::col("c", "status"), ctx),
        )
        .archived(&[], |ctx| {
            course_status(snapshot("course.status").call(Function::ToInteger), ctx)
        }),
        FieldDescriptor::new(
            "course_credits",
            Course,
            ("_CREDITS", "Credits (CEUs)"),
            Number,
            &[],
            |_| SqlExpr::col("c", "credits"),
        )
        .archived(&[], |_| snapshot("course.credits").call(Function::ToNumber)),
        FieldDescriptor::new(
            "course_date_begin",
            Course,
            ("_COURSE_BEGIN", "Course Start Date"),
            Date,
            &[],
            |_| local_date(SqlExpr::col("c", "date_begin")),
        )
        .archived(&[], |_| {
            local_date(snapshot("course.date_begin").call(Function::ToTimestamp))
        }),
        FieldDescriptor::new(
            "course_date_end",
            Course,
            ("_COURSE_END", "Course End Date"),
            Date,
            &[],
            |_| local_date(SqlExpr::col("c", "date_end")),
        )
        .archived(&[], |_| {
            local_date(snapshot("course.date_end").call(Function::ToTimestamp))
        }),
        FieldDescriptor::new(
            "course_creation_date",
            Course,
            ("_CREATION_DATE", "Course Creation Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("c", "create_date"), ctx),
        )
        .archived(&[], |ctx| {
            local_timestamp(snapshot("course.create_date").call(Function::ToTimestamp), ctx)
        }),
        FieldDescriptor::new(
            "course_language",
            Course,
            ("_COURSE_LANGUAGE", "Course Language"),
            Text,
            &[],
            |_| SqlExpr::col("c", "lang_code"),
        )
        .archived(&[], |_| snapshot("course.lang_code")),
        FieldDescriptor::new(
            "course_duration",
            Course,
            ("_AVERAGE_COURSE_DURATION", "Course Duration"),
            Number,
            &[],
            |_| SqlExpr::col("c", "mediumTime"),
        )
        .archived(&[], |_| snapshot("course.mediumTime").call(Function::ToNumber)),
        FieldDescriptor::new(
            "course_expired",
            Course,
            ("_COURSE_HAS_EXPIRED", "Course Has Expired"),
            Label,
            &[],
            |ctx| expired(SqlExpr::col("c", "date_end"), ctx),
        )
        .archived(&[], |ctx| {
            expired(snapshot("course.date_end").call(Function::ToTimestamp), ctx)
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{AthenaDialect, SnowflakeDialect};
    use crate::fields::{Branch, Labels};
    use crate::report::ReportType;
    use crate::sql_ast::SqlRenderer;

    #[test]
    fn archived_course_name_reads_snapshot_json() {
        let labels = Labels::default();
        let ctx = RenderContext {
            report_type: ReportType::UsersCourses,
            branch: Branch::Archived,
            timezone: "UTC",
            lang: "english",
            labels: &labels,
        };
        let field = fields().into_iter().find(|f| f.id == "course_name").unwrap();
        let rendering = field.rendering(Branch::Archived).unwrap();
        let expr = (rendering.expr)(&ctx);
        assert_eq!(
            SqlRenderer::new(&AthenaDialect::default()).render_expr(&expr),
            "json_extract_scalar(\"ae\".\"course_info\", '$.course.name')"
        );
        assert_eq!(
            SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&expr),
            "JSON_EXTRACT_PATH_TEXT(ae.course_info, 'course.name')"
        );
    }

    #[test]
    fn category_fields_share_one_join_alias() {
        let all = fields();
        let aliases: Vec<&str> = all
            .iter()
            .filter(|f| f.id.starts_with("course_category"))
            .flat_map(|f| f.live.joins.iter().map(|j| j.alias()))
            .collect();
        assert_eq!(aliases, vec!["coct", "coct"]);
    }
}
