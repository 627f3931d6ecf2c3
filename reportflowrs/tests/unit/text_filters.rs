use reportflow::compiler::filters::{combine, text_filter};
use reportflow::dialect::{AthenaDialect, SnowflakeDialect};
use reportflow::report::{Conditions, TextOperator};
use reportflow::sql_ast::{SqlExpr, SqlRenderer};

fn department() -> SqlExpr {
    SqlExpr::col("cufv", "field_4")
}

#[test]
fn contains_uses_dialect_case_insensitive_like() {
    let pred = text_filter(department(), TextOperator::Contains, "Sales");
    assert_eq!(
        SqlRenderer::new(&AthenaDialect::default()).render_expr(&pred),
        "(lower(\"cufv\".\"field_4\") LIKE lower('%Sales%') ESCAPE '!')"
    );
    assert_eq!(
        SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&pred),
        "(cufv.field_4 ILIKE '%Sales%' ESCAPE '!')"
    );
}

#[test]
fn wildcards_in_user_text_match_literally() {
    let email = SqlExpr::col("u", "email");
    let contains = text_filter(email.clone(), TextOperator::Contains, "50%_off");
    assert_eq!(
        SqlRenderer::new(&AthenaDialect::default()).render_expr(&contains),
        "(lower(\"u\".\"email\") LIKE lower('%50!%!_off%') ESCAPE '!')"
    );
    assert_eq!(
        SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&contains),
        "(u.email ILIKE '%50!%!_off%' ESCAPE '!')"
    );

    let starts = text_filter(email.clone(), TextOperator::StartsWith, "hey!_");
    assert_eq!(
        SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&starts),
        "(u.email ILIKE 'hey!!!_%' ESCAPE '!')"
    );
    let ends = text_filter(email, TextOperator::EndsWith, "it's_");
    assert_eq!(
        SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&ends),
        "(u.email ILIKE '%it''s!_' ESCAPE '!')"
    );
}

#[test]
fn not_contains_escapes_and_treats_null_as_blank() {
    let pred = text_filter(department(), TextOperator::NotContains, "100%");
    let sql = SqlRenderer::new(&SnowflakeDialect::default()).render_expr(&pred);
    assert!(sql.contains("ILIKE '%100!%%' ESCAPE '!'"), "{sql}");
    assert!(sql.starts_with("(NOT "), "{sql}");
}

#[test]
fn emptiness_checks_treat_blank_as_empty() {
    let pred = text_filter(department(), TextOperator::IsEmpty, "");
    assert_eq!(
        SqlRenderer::new(&AthenaDialect::default()).render_expr(&pred),
        "((\"cufv\".\"field_4\" IS NULL) OR (trim(\"cufv\".\"field_4\") = ''))"
    );
}

#[test]
fn combinator_chooses_and_or() {
    let preds = || {
        vec![
            text_filter(department(), TextOperator::Equals, "a"),
            text_filter(department(), TextOperator::Equals, "b"),
        ]
    };
    let athena = AthenaDialect::default();
    let renderer = SqlRenderer::new(&athena);
    let all = renderer.render_expr(&combine(preds(), Conditions::AllConditions).unwrap());
    let any = renderer.render_expr(&combine(preds(), Conditions::AtLeastOneCondition).unwrap());
    assert!(all.contains(") AND ("));
    assert!(any.contains(") OR ("));
    assert!(combine(vec![], Conditions::AllConditions).is_none());
}
