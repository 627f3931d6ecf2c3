//! Integration tests for branch dashboards.

use std::sync::Arc;

use reportflow::fields::FieldRegistry;
use reportflow::lookup::{BranchNode, StaticOrgChart, StaticTranslations};
use reportflow::{
    CompileOptions, DashboardCompiler, DashboardKind, DashboardRequest, DialectKind,
    VisibilityScope,
};

fn compiler() -> DashboardCompiler {
    let org_chart = StaticOrgChart::new(BranchNode { id: 1, ileft: 1, iright: 40 })
        .with_branch(BranchNode { id: 5, ileft: 10, iright: 25 });
    DashboardCompiler::new(
        FieldRegistry::shared(),
        Arc::new(org_chart),
        Arc::new(StaticTranslations::new("english")),
    )
}

fn request(branch_id: Option<u64>, include_descendants: bool) -> DashboardRequest {
    DashboardRequest {
        branch_id,
        include_descendants,
        ..Default::default()
    }
}

fn athena() -> CompileOptions {
    CompileOptions::new(DialectKind::Athena)
}

#[tokio::test]
async fn users_dashboard_groups_enrollment_counts() {
    let compiled = compiler()
        .compile(&request(Some(5), false), &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap();
    assert_eq!(
        compiled.columns,
        vec![
            "Username",
            "Full Name",
            "Email",
            "Enrolled Courses",
            "Completed Courses",
            "Courses In Progress"
        ]
    );
    assert!(compiled.sql.contains("(\"oct\".\"idOrg\" = 5)"));
    assert!(compiled.sql.contains("COUNT(DISTINCT \"cu\".\"idCourse\") AS \"Enrolled Courses\""));
    assert!(compiled.sql.contains(" GROUP BY \"u\".\"idst\""));
    assert!(compiled.sql.ends_with("ORDER BY lower(\"Username\") ASC NULLS LAST LIMIT 100"));
}

#[tokio::test]
async fn descendants_use_nested_set_bounds() {
    let compiled = compiler()
        .compile(&request(Some(5), true), &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap();
    assert!(compiled
        .sql
        .contains("((\"oct\".\"ileft\" >= 10) AND (\"oct\".\"iright\" <= 25))"));
}

#[tokio::test]
async fn missing_branch_defaults_to_whole_tree() {
    let compiled = compiler()
        .compile(&request(None, false), &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap();
    assert!(compiled
        .sql
        .contains("((\"oct\".\"ileft\" >= 1) AND (\"oct\".\"iright\" <= 40))"));
}

#[tokio::test]
async fn unknown_branch_is_not_found() {
    let err = compiler()
        .compile(&request(Some(404), false), &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "branch_not_found");
}

#[tokio::test]
async fn summary_is_a_single_aggregate_row() {
    let request = DashboardRequest {
        branch_id: Some(5),
        kind: DashboardKind::Summary,
        ..Default::default()
    };
    let compiled = compiler()
        .compile(&request, &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap();
    assert_eq!(compiled.columns.len(), 4);
    assert!(compiled.sql.starts_with("SELECT COUNT(DISTINCT \"u\".\"idst\") AS \"Users\""));
    assert!(!compiled.sql.contains("GROUP BY"));
    assert!(!compiled.sql.contains("ORDER BY"));
    assert!(!compiled.limit_applied());
}

#[tokio::test]
async fn power_user_is_limited_to_assigned_subtrees() {
    let scope = VisibilityScope::power_user(9).with_branches(vec![3]);
    let compiled = compiler()
        .compile(&request(Some(5), true), &scope, &athena())
        .await
        .unwrap();
    assert!(compiled
        .sql
        .contains("EXISTS (SELECT 1 FROM \"core_org_chart_tree\" AS \"pua\" WHERE \"pua\".\"idOrg\" IN (3)"));
    assert!(compiled.sql.contains("JOIN \"core_user_pu\" AS \"pu\""));
}

#[tokio::test]
async fn search_matches_names_and_email() {
    let request = DashboardRequest {
        search: Some("Ann".to_string()),
        ..request(Some(5), false)
    };
    let compiled = compiler()
        .compile(&request, &VisibilityScope::god_admin(1), &athena())
        .await
        .unwrap();
    assert!(compiled
        .sql
        .contains("(lower(\"u\".\"email\") LIKE lower('%Ann%') ESCAPE '!')"));
    assert!(compiled
        .sql
        .contains("(lower(\"u\".\"firstname\") LIKE lower('%Ann%') ESCAPE '!')"));
}
