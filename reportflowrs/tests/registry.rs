//! Integration tests for the FieldRegistry introspection and validation API.

use reportflow::fields::{
    ColumnRef, DataType, FieldCategory, FieldDescriptor, FieldRegistry, ReportDefinition,
};
use reportflow::lookup::ExtraFieldKind;
use reportflow::sql_ast::SqlExpr;
use reportflow::ReportType;

fn username() -> FieldDescriptor {
    FieldDescriptor::new(
        "user_userid",
        FieldCategory::User,
        ("_USERNAME", "Username"),
        DataType::Text,
        &[],
        |_| SqlExpr::col("u", "userid"),
    )
}

fn users_report(mandatory: Vec<&'static str>, default_sort: &'static str) -> ReportDefinition {
    ReportDefinition {
        report_type: ReportType::Users,
        categories: vec![FieldCategory::User],
        extra_kinds: vec![ExtraFieldKind::User],
        mandatory,
        default_sort,
        supports_archive: false,
    }
}

#[test]
fn standard_registry_is_valid() {
    let registry = FieldRegistry::standard();
    registry.validate().unwrap();
    for report_type in ReportType::ALL {
        let report = registry.report(report_type).unwrap();
        assert!(report.mandatory.contains(&"user_userid"));
    }
}

#[test]
fn shared_registry_is_built_once() {
    let first = FieldRegistry::shared();
    let second = FieldRegistry::shared();
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[test]
fn field_ids_are_unique_across_categories() {
    let registry = FieldRegistry::standard();
    let mut ids: Vec<_> = registry.field_ids().collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
    assert!(total > 40);
}

#[test]
fn duplicate_ids_fail_validation() {
    let registry = FieldRegistry::from_parts(
        vec![username(), username()],
        vec![users_report(vec!["user_userid"], "user_userid")],
    );
    let err = registry.validate().unwrap_err();
    assert!(err.to_string().contains("registered more than once"));
}

#[test]
fn unknown_mandatory_field_fails_validation() {
    let registry = FieldRegistry::from_parts(
        vec![username()],
        vec![users_report(vec!["user_userid", "user_email"], "user_userid")],
    );
    let err = registry.validate().unwrap_err();
    assert!(err.to_string().contains("unknown field user_email"));
}

#[test]
fn default_sort_must_be_mandatory() {
    let email = FieldDescriptor::new(
        "user_email",
        FieldCategory::User,
        ("_EMAIL", "Email"),
        DataType::Text,
        &[],
        |_| SqlExpr::col("u", "email"),
    );
    let registry = FieldRegistry::from_parts(
        vec![username(), email],
        vec![users_report(vec!["user_userid"], "user_email")],
    );
    assert!(registry.validate().is_err());
}

#[test]
fn resolution_respects_report_categories() {
    let registry = FieldRegistry::standard();
    assert_eq!(
        registry.resolve(ReportType::UsersCourses, "course_name"),
        Some(ColumnRef::Standard("course_name"))
    );
    assert_eq!(registry.resolve(ReportType::Users, "course_name"), None);
    assert_eq!(registry.resolve(ReportType::UsersBadges, "lp_name"), None);
    assert_eq!(
        registry.resolve(ReportType::UsersCourses, "enrollment_extrafield_7"),
        Some(ColumnRef::Extra {
            kind: ExtraFieldKind::Enrollment,
            id: 7
        })
    );
    assert_eq!(registry.resolve(ReportType::Users, "course_extrafield_7"), None);
    assert_eq!(registry.resolve(ReportType::Users, "user_extrafield_x"), None);
}

#[test]
fn mandatory_fields_are_appended_once() {
    let registry = FieldRegistry::standard();
    let columns = registry.resolve_columns(
        ReportType::UsersLearningPlans,
        &["lp_name".to_string(), "user_email".to_string(), "lp_name".to_string()],
    );
    let ids: Vec<String> = columns.iter().map(ColumnRef::field_id).collect();
    assert_eq!(ids, vec!["lp_name", "user_email", "user_userid"]);
}
