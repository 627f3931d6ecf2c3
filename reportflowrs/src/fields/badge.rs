use crate::sql_ast::SqlExpr;

use super::{local_timestamp, DataType, FieldCategory, FieldDescriptor, JoinKey};

pub(super) fn fields() -> Vec<FieldDescriptor> {
    use DataType::*;
    use FieldCategory::Badge;

    vec![
        FieldDescriptor::new(
            "badge_name",
            Badge,
            ("_BADGE_NAME", "Badge Name"),
            Text,
            &[JoinKey::BadgeTranslation],
            |_| SqlExpr::col("gbt", "name"),
        ),
        FieldDescriptor::new(
            "badge_description",
            Badge,
            ("_BADGE_DESCRIPTION", "Badge Description"),
            Text,
            &[JoinKey::BadgeTranslation],
            |_| SqlExpr::col("gbt", "description"),
        )
        .unsortable(),
        FieldDescriptor::new(
            "badge_score",
            Badge,
            ("_SCORE", "Badge Score"),
            Number,
            &[],
            |_| SqlExpr::col("gb", "score"),
        ),
        FieldDescriptor::new(
            "badge_issued_on",
            Badge,
            ("_ISSUED_ON", "Issued On"),
            Timestamp,
            &[],
            |ctx| local_timestamp(SqlExpr::col("gab", "issued_on"), ctx),
        ),
    ]
}
