//! Role-based row visibility and org-chart (nested-set) membership.

use crate::lookup::BranchNode;
use crate::report::BranchSelection;
use crate::scope::VisibilityScope;
use crate::sql_ast::{or_all, Join, SelectItem, SelectQuery, SqlExpr, SqlJoinType, TableRef};

use super::filters::id_filter;
use super::joins::JoinPlanner;

pub const POWER_USER_USERS_ALIAS: &str = "pu";
pub const POWER_USER_COURSES_ALIAS: &str = "puc";

pub struct VisibilityScoper<'a> {
    scope: &'a VisibilityScope,
}

impl<'a> VisibilityScoper<'a> {
    pub fn new(scope: &'a VisibilityScope) -> Self {
        Self { scope }
    }

    pub fn is_restricted(&self) -> bool {
        self.scope.is_restricted()
    }

    /// Inner-join the power user's managed users; no-op for other roles.
    pub fn restrict_users(&self, planner: &mut JoinPlanner, user_id: SqlExpr) -> bool {
        if !self.is_restricted() {
            return false;
        }
        let alias = POWER_USER_USERS_ALIAS;
        let puser = self.scope.user_id;
        planner.register_join(alias, || Join {
            join_type: SqlJoinType::Inner,
            table: TableRef::table("core_user_pu", alias),
            on: vec![
                SqlExpr::col(alias, "user_id").equals(user_id),
                SqlExpr::col(alias, "puser_id").equals(SqlExpr::Literal(puser.into())),
            ],
        })
    }

    /// Inner-join the power user's assigned courses; no-op for other roles.
    pub fn restrict_courses(&self, planner: &mut JoinPlanner, course_id: SqlExpr) -> bool {
        if !self.is_restricted() {
            return false;
        }
        let alias = POWER_USER_COURSES_ALIAS;
        let puser = self.scope.user_id;
        planner.register_join(alias, || Join {
            join_type: SqlJoinType::Inner,
            table: TableRef::table("core_user_pu_course", alias),
            on: vec![
                SqlExpr::col(alias, "course_id").equals(course_id),
                SqlExpr::col(alias, "puser_id").equals(SqlExpr::Literal(puser.into())),
            ],
        })
    }

    /// Limit org-chart rows (`tree_alias`) to the power user's assigned
    /// subtrees. `None` when no pre-restriction applies.
    pub fn assigned_subtrees(&self, tree_alias: &str) -> Option<SqlExpr> {
        if !self.is_restricted() || self.scope.branch_ids.is_empty() {
            return None;
        }
        let assigned = "pua";
        Some(SqlExpr::Exists(Box::new(SelectQuery {
            select: vec![SelectItem::bare(SqlExpr::int(1))],
            from: TableRef::table("core_org_chart_tree", assigned),
            filters: vec![
                id_filter(SqlExpr::col(assigned, "idOrg"), &self.scope.branch_ids),
                SqlExpr::col(tree_alias, "ileft").gte(SqlExpr::col(assigned, "ileft")),
                SqlExpr::col(tree_alias, "iright").lte(SqlExpr::col(assigned, "iright")),
            ],
            ..Default::default()
        })))
    }
}

/// Org-chart rows inside `node`; with `descendants` false only the node itself.
pub fn subtree_containment(tree_alias: &str, node: &BranchNode, descendants: bool) -> SqlExpr {
    if !descendants {
        return SqlExpr::col(tree_alias, "idOrg").equals(SqlExpr::Literal(node.id.into()));
    }
    SqlExpr::col(tree_alias, "ileft")
        .gte(SqlExpr::Literal(node.ileft.into()))
        .and(SqlExpr::col(tree_alias, "iright").lte(SqlExpr::Literal(node.iright.into())))
}

/// `user_id` is a member of one of `groups`.
pub fn group_members(user_id: SqlExpr, groups: &[u64]) -> SqlExpr {
    user_id.in_subquery(SelectQuery {
        select: vec![SelectItem::bare(SqlExpr::col("gm", "idstMember"))],
        from: TableRef::table("core_group_members", "gm"),
        filters: vec![id_filter(SqlExpr::col("gm", "idst"), groups)],
        ..Default::default()
    })
}

/// `user_id` belongs to one of the selected branches. Selections with
/// `descendants` match the whole subtree via nested-set bounds.
pub fn branch_members(user_id: SqlExpr, branches: &[BranchSelection]) -> Option<SqlExpr> {
    let direct: Vec<u64> = branches.iter().filter(|b| !b.descendants).map(|b| b.id).collect();
    let subtrees: Vec<u64> = branches.iter().filter(|b| b.descendants).map(|b| b.id).collect();

    let members = |filters: Vec<SqlExpr>, extra_join: Option<Join>| SelectQuery {
        select: vec![SelectItem::bare(SqlExpr::col("gm", "idstMember"))],
        from: TableRef::table("core_group_members", "gm"),
        joins: std::iter::once(Join {
            join_type: SqlJoinType::Inner,
            table: TableRef::table("core_org_chart_tree", "oct"),
            on: vec![SqlExpr::col("oct", "idst_oc").equals(SqlExpr::col("gm", "idst"))],
        })
        .chain(extra_join)
        .collect(),
        filters,
        ..Default::default()
    };

    let mut preds = Vec::new();
    if !direct.is_empty() {
        preds.push(user_id.clone().in_subquery(members(
            vec![id_filter(SqlExpr::col("oct", "idOrg"), &direct)],
            None,
        )));
    }
    if !subtrees.is_empty() {
        let root = Join {
            join_type: SqlJoinType::Inner,
            table: TableRef::table("core_org_chart_tree", "sel"),
            on: vec![
                SqlExpr::col("oct", "ileft").gte(SqlExpr::col("sel", "ileft")),
                SqlExpr::col("oct", "iright").lte(SqlExpr::col("sel", "iright")),
            ],
        };
        preds.push(user_id.in_subquery(members(
            vec![id_filter(SqlExpr::col("sel", "idOrg"), &subtrees)],
            Some(root),
        )));
    }
    or_all(preds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::AthenaDialect;
    use crate::sql_ast::SqlRenderer;

    #[test]
    fn god_admin_gets_no_scope_join() {
        let scope = VisibilityScope::god_admin(1);
        let mut planner = JoinPlanner::with_base("u");
        let scoper = VisibilityScoper::new(&scope);
        assert!(!scoper.restrict_users(&mut planner, SqlExpr::col("u", "idst")));
        assert!(planner.is_empty());
    }

    #[test]
    fn power_user_scope_is_registered_once() {
        let scope = VisibilityScope::power_user(77);
        let scoper = VisibilityScoper::new(&scope);
        let mut planner = JoinPlanner::with_base("cu");
        assert!(scoper.restrict_users(&mut planner, SqlExpr::col("cu", "idUser")));
        assert!(!scoper.restrict_users(&mut planner, SqlExpr::col("cu", "idUser")));
        assert!(scoper.restrict_courses(&mut planner, SqlExpr::col("cu", "idCourse")));
        let joins = planner.into_joins();
        assert_eq!(joins.len(), 2);
        let dialect = AthenaDialect::default();
        let on = SqlRenderer::new(&dialect).render_expr(&joins[0].on[1]);
        assert_eq!(on, "(\"pu\".\"puser_id\" = 77)");
    }

    #[test]
    fn descendant_branches_use_nested_set_bounds() {
        let dialect = AthenaDialect::default();
        let pred = branch_members(
            SqlExpr::col("u", "idst"),
            &[
                BranchSelection { id: 3, descendants: false },
                BranchSelection { id: 8, descendants: true },
            ],
        )
        .unwrap();
        let sql = SqlRenderer::new(&dialect).render_expr(&pred);
        assert!(sql.contains("WHERE \"oct\".\"idOrg\" IN (3)"));
        assert!(sql.contains("(\"oct\".\"ileft\" >= \"sel\".\"ileft\")"));
        assert!(sql.contains("WHERE \"sel\".\"idOrg\" IN (8)"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn subtree_containment_uses_resolved_bounds() {
        let node = BranchNode { id: 4, ileft: 10, iright: 25 };
        let dialect = AthenaDialect::default();
        let sql = SqlRenderer::new(&dialect).render_expr(&subtree_containment("oct", &node, true));
        assert_eq!(sql, "((\"oct\".\"ileft\" >= 10) AND (\"oct\".\"iright\" <= 25))");
    }
}
