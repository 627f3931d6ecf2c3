use crate::error::{Result, ReportflowError};
use crate::sql_ast::{OrderItem, SelectItem, SelectQuery, SqlExpr, TableRef, TableSource};

pub const UNION_ALIAS: &str = "report_rows";

/// Final query shape: a single branch is ordered and limited directly; two
/// branches are wrapped in `SELECT * FROM (<live> UNION ALL <archived>)`.
pub(crate) fn assemble(
    mut branches: Vec<SelectQuery>,
    order_by: Vec<OrderItem>,
    limit: Option<u64>,
) -> Result<SelectQuery> {
    match branches.len() {
        1 => {
            let mut query = branches.remove(0);
            query.order_by = order_by;
            query.limit = limit;
            Ok(query)
        }
        2 => {
            let width = branches[0].select.len();
            if branches.iter().any(|b| b.select.len() != width) {
                return Err(ReportflowError::Sql(format!(
                    "union branches differ in width: {:?}",
                    branches.iter().map(|b| b.select.len()).collect::<Vec<_>>()
                )));
            }
            Ok(SelectQuery {
                select: vec![SelectItem::bare(SqlExpr::Wildcard)],
                from: TableRef {
                    source: TableSource::UnionAll(branches),
                    alias: Some(UNION_ALIAS.to_string()),
                },
                order_by,
                limit,
                ..Default::default()
            })
        }
        n => Err(ReportflowError::Sql(format!(
            "expected one or two report branches, got {n}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(width: usize) -> SelectQuery {
        SelectQuery {
            select: (0..width)
                .map(|i| SelectItem::caption(SqlExpr::null(), format!("c{i}")))
                .collect(),
            from: TableRef::table("t", "t"),
            ..Default::default()
        }
    }

    #[test]
    fn mismatched_union_is_rejected() {
        let err = assemble(vec![branch(2), branch(3)], vec![], None).unwrap_err();
        assert_eq!(err.code(), "sql_error");
    }

    #[test]
    fn single_branch_carries_limit() {
        let query = assemble(vec![branch(2)], vec![], Some(100)).unwrap();
        assert_eq!(query.limit, Some(100));
        assert!(matches!(query.from.source, TableSource::Table(_)));
    }
}
