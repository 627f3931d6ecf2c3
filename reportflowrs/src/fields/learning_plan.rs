use crate::sql_ast::{Function, SqlExpr};

use super::{local_timestamp, DataType, FieldCategory, FieldDescriptor, RenderContext};

fn lp_status(percentage: SqlExpr, ctx: &RenderContext<'_>) -> SqlExpr {
    let label = |key: &str| SqlExpr::str(&ctx.labels.text(key));
    SqlExpr::case(
        vec![
            (
                percentage.clone().coalesce(SqlExpr::int(0)).equals(SqlExpr::int(0)),
                label("_NOT_STARTED"),
            ),
            (percentage.gte(SqlExpr::int(100)), label("_USER_STATUS_END")),
        ],
        label("_USER_STATUS_BEGIN"),
    )
}

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::LearningPlan;

    vec![
        FieldDescriptor::new(
            "lp_name",
            LearningPlan,
            ("_LEARNING_PLAN_NAME", "Learning Plan Name"),
            Text,
            &[],
            |_| SqlExpr::col("lp", "path_name"),
        ),
        FieldDescriptor::new(
            "lp_code",
            LearningPlan,
            ("_LEARNING_PLAN_CODE", "Learning Plan Code"),
            Text,
            &[],
            |_| SqlExpr::col("lp", "path_code"),
        ),
        FieldDescriptor::new(
            "lp_credits",
            LearningPlan,
            ("_CREDITS", "Learning Plan Credits (CEUs)"),
            Number,
            &[],
            |_| SqlExpr::col("lp", "credits"),
        ),
        FieldDescriptor::new(
            "lp_enrollment_date",
            LearningPlan,
            ("_LP_ENROLLMENT_DATE", "Learning Plan Enrollment Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("lpu", "date_assign"), ctx),
        ),
        FieldDescriptor::new(
            "lp_completion_date",
            LearningPlan,
            ("_LP_COMPLETION_DATE", "Learning Plan Completion Date"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("lpu", "date_complete"), ctx),
        ),
        FieldDescriptor::new(
            "lp_status",
            LearningPlan,
            ("_LP_STATUS", "Learning Plan Status"),
            Label,
            &[],
            |ctx| lp_status(SqlExpr::col("lpu", "completion_percentage"), ctx),
        ),
        FieldDescriptor::new(
            "lp_completion_percentage",
            LearningPlan,
            ("_LP_COMPLETION_PERCENTAGE", "Completion Percentage"),
            Number,
            &[],
            |_| {
                SqlExpr::func(
                    Function::Round,
                    vec![
                        SqlExpr::col("lpu", "completion_percentage").coalesce(SqlExpr::int(0)),
                        SqlExpr::int(0),
                    ],
                )
            },
        ),
    ]
}
