use crate::sql_ast::{Function, SqlExpr};

use super::{
    coded, local_date, local_timestamp, yes_no, DataType, FieldCategory, FieldDescriptor, JoinKey,
};

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::User;

    vec![
        FieldDescriptor::new("user_userid", User, ("_USERNAME", "Username"), Text, &[], |_| {
            SqlExpr::col("u", "userid").call(Function::StripLeadingSlash)
        }),
        FieldDescriptor::new("user_id", User, ("_USER_ID", "User Unique ID"), Number, &[], |_| {
            SqlExpr::col("u", "idst")
        }),
        FieldDescriptor::new("user_firstname", User, ("_FIRSTNAME", "First Name"), Text, &[], |_| {
            SqlExpr::col("u", "firstname")
        }),
        FieldDescriptor::new("user_lastname", User, ("_LASTNAME", "Last Name"), Text, &[], |_| {
            SqlExpr::col("u", "lastname")
        }),
        FieldDescriptor::new("user_fullname", User, ("_FULLNAME", "Full Name"), Text, &[], |_| {
            SqlExpr::func(
                Function::Concat,
                vec![
                    SqlExpr::col("u", "firstname").coalesce(SqlExpr::str("")),
                    SqlExpr::str(" "),
                    SqlExpr::col("u", "lastname").coalesce(SqlExpr::str("")),
                ],
            )
            .call(Function::Trim)
        }),
        FieldDescriptor::new("user_email", User, ("_EMAIL", "Email"), Text, &[], |_| {
            SqlExpr::col("u", "email")
        }),
        FieldDescriptor::new(
            "user_email_validation_status",
            User,
            ("_EMAIL_VALIDATION_STATUS", "Email Validation Status"),
            Label,
            &[],
            |ctx| yes_no(SqlExpr::col("u", "email_status").equals(SqlExpr::int(1)), ctx),
        ),
        FieldDescriptor::new(
            "user_register_date",
            User,
            ("_REGISTER_DATE", "User Creation Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("u", "register_date"), ctx),
        ),
        FieldDescriptor::new(
            "user_last_access_date",
            User,
            ("_DATE_LAST_ACCESS", "Last Access Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("u", "lastenter"), ctx),
        ),
        FieldDescriptor::new(
            "user_expiration",
            User,
            ("_EXPIRATION_DATE", "User Expiration Date"),
            Date,
            &[],
            |_| local_date(SqlExpr::col("u", "expiration")),
        ),
        FieldDescriptor::new(
            "user_suspend_date",
            User,
            ("_SUSPEND_DATE", "User Deactivation Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("u", "suspend_date"), ctx),
        ),
        FieldDescriptor::new(
            "user_deactivated",
            User,
            ("_DEACTIVATED", "User Deactivated"),
            Label,
            &[],
            |ctx| yes_no(SqlExpr::col("u", "valid").equals(SqlExpr::int(0)), ctx),
        ),
        FieldDescriptor::new(
            "user_level",
            User,
            ("_LEVEL", "User Level"),
            Label,
            &[JoinKey::UserLevel],
            |ctx| {
                let level = SqlExpr::col("cul", "level");
                SqlExpr::case(
                    vec![
                        (
                            level.clone().equals(SqlExpr::str("/framework/level/godadmin")),
                            SqlExpr::str(&ctx.labels.text("_GODADMIN")),
                        ),
                        (
                            level.equals(SqlExpr::str("/framework/level/admin")),
                            SqlExpr::str(&ctx.labels.text("_POWER_USER")),
                        ),
                    ],
                    SqlExpr::str(&ctx.labels.text("_USER")),
                )
            },
        ),
        FieldDescriptor::new(
            "user_branch_names",
            User,
            ("_BRANCHES", "Branch Names"),
            Text,
            &[JoinKey::UserBranches],
            |_| SqlExpr::col("ub", "branch_names"),
        )
        .unsortable(),
        FieldDescriptor::new(
            "user_language",
            User,
            ("_LANGUAGE", "Language"),
            Text,
            &[],
            |_| SqlExpr::col("u", "language"),
        ),
        FieldDescriptor::new(
            "user_force_change_password",
            User,
            ("_FORCE_PASSWORD_CHANGE", "Force Password Change"),
            Label,
            &[],
            |ctx| {
                coded(
                    SqlExpr::col("u", "force_change"),
                    &[(SqlExpr::int(1), "_YES"), (SqlExpr::int(0), "_NO")],
                    ctx,
                )
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{AthenaDialect, SnowflakeDialect};
    use crate::fields::{Branch, Labels, RenderContext};
    use crate::report::ReportType;
    use crate::sql_ast::SqlRenderer;

    fn render(id: &str, dialect: &dyn crate::dialect::Dialect) -> String {
        let labels = Labels::default();
        let ctx = RenderContext {
            report_type: ReportType::Users,
            branch: Branch::Live,
            timezone: "Europe/Rome",
            lang: "english",
            labels: &labels,
        };
        let field = fields().into_iter().find(|f| f.id == id).unwrap();
        SqlRenderer::new(dialect).render_expr(&(field.live.expr)(&ctx))
    }

    #[test]
    fn userid_strips_leading_slash_per_dialect() {
        assert_eq!(
            render("user_userid", &AthenaDialect::default()),
            "regexp_replace(\"u\".\"userid\", '^/', '')"
        );
        assert_eq!(
            render("user_userid", &SnowflakeDialect::default()),
            "LTRIM(u.userid, '/')"
        );
    }

    #[test]
    fn timestamps_render_in_report_timezone() {
        let sql = render("user_register_date", &AthenaDialect::default());
        assert!(sql.starts_with("CASE WHEN (\"u\".\"register_date\" IS NOT NULL"));
        assert!(sql.contains("at_timezone(\"u\".\"register_date\", 'Europe/Rome')"));
        assert!(sql.ends_with("ELSE NULL END"));
    }
}
