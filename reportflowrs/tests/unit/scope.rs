use reportflow::VisibilityScope;

#[test]
fn scope_parses_session_payload() {
    let scope: VisibilityScope = serde_json::from_str(
        r#"{"userId": 12, "isPowerUser": true, "branchIds": [3], "courseIds": [7, 8]}"#,
    )
    .unwrap();
    assert!(scope.is_restricted());
    assert_eq!(scope.branch_ids, vec![3]);
    assert!(scope.group_ids.is_empty());
}

#[test]
fn higher_roles_lift_power_user_restrictions() {
    let mut scope = VisibilityScope::power_user(5).with_courses(vec![1, 2]);
    assert_eq!(scope.visible_courses(&[2, 3]), vec![2]);
    scope.is_erp_admin = true;
    assert!(!scope.is_restricted());
    assert_eq!(scope.visible_courses(&[2, 3]), vec![2, 3]);
}

#[test]
fn empty_accessible_set_keeps_selection() {
    let scope = VisibilityScope::power_user(5);
    assert_eq!(scope.visible_groups(&[4, 9]), vec![4, 9]);
}
