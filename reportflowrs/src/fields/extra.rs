//! Additional ("extra") fields declared per tenant in the field catalog.
//!
//! Rendering depends on the declared type. Fields the catalog does not know,
//! or whose type has no rendering, become a NULL column so tenants with
//! different catalogs still get the same column layout.

use std::collections::HashMap;

use crate::lookup::{ExtraField, ExtraFieldKind};
use crate::sql_ast::{Function, Join, SqlExpr, TableRef};

use super::joins::left;
use super::{coded, json, local_date, Branch, JoinKey, RenderContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtraFieldType {
    Text,
    Date,
    Dropdown,
    YesNo,
    Country,
    Unsupported,
}

impl ExtraFieldType {
    pub fn parse(field_type: &str) -> Self {
        match field_type.to_ascii_lowercase().as_str() {
            "textfield" | "freetext" | "textarea" => ExtraFieldType::Text,
            "date" => ExtraFieldType::Date,
            "dropdown" => ExtraFieldType::Dropdown,
            "yesno" => ExtraFieldType::YesNo,
            "country" => ExtraFieldType::Country,
            _ => ExtraFieldType::Unsupported,
        }
    }
}

/// Catalog entries fetched for one compilation.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    fields: HashMap<(ExtraFieldKind, u64), ExtraField>,
}

impl CatalogSnapshot {
    pub fn insert(&mut self, kind: ExtraFieldKind, fields: Vec<ExtraField>) {
        for field in fields {
            self.fields.insert((kind, field.id), field);
        }
    }

    pub fn get(&self, kind: ExtraFieldKind, id: u64) -> Option<&ExtraField> {
        self.fields.get(&(kind, id))
    }
}

/// SQL for one additional field: the static joins it needs, then the
/// per-field joins (which may reference the static ones), then the value.
#[derive(Debug, Clone)]
pub struct ExtraRendering {
    pub static_joins: Vec<JoinKey>,
    pub joins: Vec<(String, Join)>,
    pub expr: SqlExpr,
}

impl ExtraRendering {
    fn null() -> Self {
        Self {
            static_joins: Vec::new(),
            joins: Vec::new(),
            expr: SqlExpr::null(),
        }
    }
}

pub fn render_extra(
    kind: ExtraFieldKind,
    id: u64,
    field: Option<&ExtraField>,
    ctx: &RenderContext<'_>,
) -> ExtraRendering {
    let Some(field) = field else {
        tracing::warn!(kind = ?kind, id, "additional field missing from catalog, rendering NULL");
        return ExtraRendering::null();
    };
    let field_type = ExtraFieldType::parse(&field.field_type);
    if field_type == ExtraFieldType::Unsupported {
        tracing::debug!(
            kind = ?kind,
            id,
            field_type = %field.field_type,
            "unsupported additional field type"
        );
        return ExtraRendering::null();
    }

    let (static_joins, raw) = raw_value(kind, id, ctx.branch);
    let mut rendering = ExtraRendering {
        static_joins,
        joins: Vec::new(),
        expr: SqlExpr::null(),
    };
    rendering.expr = match field_type {
        ExtraFieldType::Text => raw,
        ExtraFieldType::Date => local_date(raw.call(Function::ToTimestamp)),
        ExtraFieldType::YesNo => coded(
            raw.call(Function::ToInteger),
            &[(SqlExpr::int(1), "_YES"), (SqlExpr::int(2), "_NO")],
            ctx,
        ),
        ExtraFieldType::Dropdown => {
            let alias = format!("{}_{id}", dropdown_alias(kind));
            let (join, label) = dropdown_join(kind, &alias, raw, ctx.lang);
            rendering.joins.push((alias, join));
            label
        }
        ExtraFieldType::Country => {
            let alias = format!("cc_{}_{id}", kind_tag(kind));
            let join = left(
                TableRef::table("core_country", alias.clone()),
                vec![SqlExpr::col(&alias, "id_country").equals(raw.call(Function::ToInteger))],
            );
            let label = SqlExpr::col(&alias, "name_country");
            rendering.joins.push((alias, join));
            label
        }
        ExtraFieldType::Unsupported => SqlExpr::null(),
    };
    rendering
}

fn kind_tag(kind: ExtraFieldKind) -> &'static str {
    match kind {
        ExtraFieldKind::User => "u",
        ExtraFieldKind::Course => "c",
        ExtraFieldKind::Enrollment => "e",
    }
}

fn dropdown_alias(kind: ExtraFieldKind) -> &'static str {
    match kind {
        ExtraFieldKind::User => "cufdt",
        ExtraFieldKind::Course => "lcfdt",
        ExtraFieldKind::Enrollment => "lefd",
    }
}

/// Stored value of the field, before type-specific formatting.
fn raw_value(kind: ExtraFieldKind, id: u64, branch: Branch) -> (Vec<JoinKey>, SqlExpr) {
    let column = format!("field_{id}");
    match (kind, branch) {
        (ExtraFieldKind::User, _) => (
            vec![JoinKey::UserFieldValues],
            SqlExpr::col("cufv", &column),
        ),
        (ExtraFieldKind::Course, Branch::Live) => (
            vec![JoinKey::CourseFieldValues],
            SqlExpr::col("lcfv", &column),
        ),
        (ExtraFieldKind::Course, Branch::Archived) => (
            vec![],
            json("ae", "course_info", &format!("additional_fields.{id}")),
        ),
        (ExtraFieldKind::Enrollment, Branch::Live) => {
            (vec![], json("cu", "enrollment_fields", &id.to_string()))
        }
        (ExtraFieldKind::Enrollment, Branch::Archived) => (
            vec![],
            json("ae", "enrollment_info", &format!("enrollment_fields.{id}")),
        ),
    }
}

fn dropdown_join(kind: ExtraFieldKind, alias: &str, raw: SqlExpr, lang: &str) -> (Join, SqlExpr) {
    match kind {
        ExtraFieldKind::User | ExtraFieldKind::Course => {
            let table = match kind {
                ExtraFieldKind::User => "core_user_field_dropdown_translations",
                _ => "learning_course_field_dropdown_translations",
            };
            let join = left(
                TableRef::table(table, alias),
                vec![
                    SqlExpr::col(alias, "id_option").equals(raw.call(Function::ToInteger)),
                    SqlExpr::col(alias, "lang_code").equals(SqlExpr::str(lang)),
                ],
            );
            (join, SqlExpr::col(alias, "translation"))
        }
        // Enrollment dropdown options keep every language in one JSON document.
        ExtraFieldKind::Enrollment => {
            let join = left(
                TableRef::table("learning_enrollment_fields_dropdown", alias),
                vec![SqlExpr::col(alias, "id").equals(raw.call(Function::ToInteger))],
            );
            let label = SqlExpr::col(alias, "translation").call(Function::JsonExtract {
                path: lang.to_string(),
            });
            (join, label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::AthenaDialect;
    use crate::fields::Labels;
    use crate::report::ReportType;
    use crate::sql_ast::SqlRenderer;

    fn ctx(labels: &Labels, branch: Branch) -> RenderContext<'_> {
        RenderContext {
            report_type: ReportType::UsersCourses,
            branch,
            timezone: "UTC",
            lang: "english",
            labels,
        }
    }

    #[test]
    fn missing_catalog_entry_renders_null() {
        let labels = Labels::default();
        let rendering = render_extra(ExtraFieldKind::User, 9, None, &ctx(&labels, Branch::Live));
        assert_eq!(rendering.expr, SqlExpr::null());
        assert!(rendering.static_joins.is_empty());
    }

    #[test]
    fn dropdown_registers_translation_join() {
        let labels = Labels::default();
        let field = ExtraField::new(5, "Department", "dropdown");
        let rendering = render_extra(
            ExtraFieldKind::User,
            5,
            Some(&field),
            &ctx(&labels, Branch::Live),
        );
        assert_eq!(rendering.static_joins, vec![JoinKey::UserFieldValues]);
        assert_eq!(rendering.joins[0].0, "cufdt_5");
        let dialect = AthenaDialect::default();
        let on = SqlRenderer::new(&dialect).render_expr(&rendering.joins[0].1.on[0]);
        assert_eq!(
            on,
            "(\"cufdt_5\".\"id_option\" = TRY_CAST(\"cufv\".\"field_5\" AS BIGINT))"
        );
    }

    #[test]
    fn archived_course_field_reads_snapshot() {
        let labels = Labels::default();
        let field = ExtraField::new(2, "Vendor", "textfield");
        let rendering = render_extra(
            ExtraFieldKind::Course,
            2,
            Some(&field),
            &ctx(&labels, Branch::Archived),
        );
        let dialect = AthenaDialect::default();
        assert_eq!(
            SqlRenderer::new(&dialect).render_expr(&rendering.expr),
            "json_extract_scalar(\"ae\".\"course_info\", '$.additional_fields.2')"
        );
    }

    #[test]
    fn unknown_types_are_unsupported() {
        assert_eq!(ExtraFieldType::parse("upload"), ExtraFieldType::Unsupported);
        assert_eq!(ExtraFieldType::parse("FreeText"), ExtraFieldType::Text);
    }
}
