use crate::sql_ast::{Function, SqlExpr};

use super::{local_timestamp, DataType, FieldCategory, FieldDescriptor};

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::Certification;

    vec![
        FieldDescriptor::new(
            "certification_title",
            Certification,
            ("_CERTIFICATION_TITLE", "Certification Title"),
            Text,
            &[],
            |_| SqlExpr::col("cert", "title"),
        ),
        FieldDescriptor::new(
            "certification_code",
            Certification,
            ("_CERTIFICATION_CODE", "Certification Code"),
            Text,
            &[],
            |_| SqlExpr::col("cert", "code"),
        ),
        FieldDescriptor::new(
            "certification_description",
            Certification,
            ("_DESCRIPTION", "Certification Description"),
            Text,
            &[],
            |_| SqlExpr::col("cert", "description"),
        )
        .unsortable(),
        FieldDescriptor::new(
            "certification_duration",
            Certification,
            ("_DURATION", "Certification Duration"),
            Number,
            &[],
            |_| SqlExpr::col("cert", "duration"),
        ),
        FieldDescriptor::new(
            "certification_issued_on",
            Certification,
            ("_ISSUED_ON", "Issued On"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("ceu", "on_datetime"), ctx),
        ),
        FieldDescriptor::new(
            "certification_to_renew_in",
            Certification,
            ("_TO_RENEW_IN", "To Renew In"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("ceu", "expire_at"), ctx),
        ),
        FieldDescriptor::new(
            "certification_status",
            Certification,
            ("_STATUS", "Certification Status"),
            Label,
            &[],
            |ctx| {
                let expire_at = SqlExpr::col("ceu", "expire_at");
                SqlExpr::case(
                    vec![(
                        expire_at
                            .clone()
                            .call(Function::IsValidTimestamp)
                            .and(expire_at.lt(SqlExpr::func(Function::CurrentTimestamp, vec![]))),
                        SqlExpr::str(&ctx.labels.text("_EXPIRED")),
                    )],
                    SqlExpr::str(&ctx.labels.text("_ACTIVE")),
                )
            },
        ),
    ]
}
