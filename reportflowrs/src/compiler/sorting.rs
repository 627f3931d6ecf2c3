//! ORDER BY resolution against the selected, sortable columns.

use crate::report::{SortOrder, SortSelector, SortingOptions};
use crate::sql_ast::{Function, OrderItem, SortDirection, SqlExpr};

use super::captions::OutputColumn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSort {
    pub field_id: String,
    pub direction: SortDirection,
    /// The requested field was absent or not allowed.
    pub fell_back: bool,
}

pub struct SortingResolver<'a> {
    columns: &'a [OutputColumn],
    default_field: &'a str,
    tie_breakers: &'a [&'static str],
}

impl<'a> SortingResolver<'a> {
    pub fn new(
        columns: &'a [OutputColumn],
        default_field: &'a str,
        tie_breakers: &'a [&'static str],
    ) -> Self {
        Self {
            columns,
            default_field,
            tie_breakers,
        }
    }

    fn allowed(&self, field_id: &str) -> Option<&OutputColumn> {
        self.columns
            .iter()
            .find(|c| c.sortable && c.field_id() == field_id)
    }

    pub fn resolve(&self, options: &SortingOptions) -> ResolvedSort {
        let direction = match options.order_by {
            SortOrder::Asc => SortDirection::Asc,
            SortOrder::Desc => SortDirection::Desc,
        };
        let requested = match options.selector {
            SortSelector::Custom => options
                .selected_field
                .as_deref()
                .map(str::trim)
                .filter(|f| !f.is_empty()),
            SortSelector::Default => None,
        };
        match requested {
            Some(field) if self.allowed(field).is_some() => ResolvedSort {
                field_id: field.to_string(),
                direction,
                fell_back: false,
            },
            _ => {
                if let Some(field) = requested {
                    tracing::debug!(
                        field,
                        fallback = self.default_field,
                        "sort field not allowed, falling back"
                    );
                }
                ResolvedSort {
                    field_id: self.default_field.to_string(),
                    direction,
                    fell_back: requested.is_some(),
                }
            }
        }
    }

    /// Sort on the output captions: the resolved field first, then every
    /// tie-breaker not already used, all with NULLS LAST.
    pub fn order_by(&self, options: &SortingOptions) -> Vec<OrderItem> {
        let resolved = self.resolve(options);
        let mut items = Vec::new();
        let mut used = vec![resolved.field_id.clone()];
        if let Some(column) = self.column(&resolved.field_id) {
            items.push(order_item(column, resolved.direction));
        }
        for tie in self.tie_breakers {
            if used.iter().any(|u| u == tie) {
                continue;
            }
            used.push(tie.to_string());
            if let Some(column) = self.column(tie) {
                items.push(order_item(column, SortDirection::Asc));
            }
        }
        items
    }

    fn column(&self, field_id: &str) -> Option<&OutputColumn> {
        self.columns.iter().find(|c| c.field_id() == field_id)
    }
}

fn order_item(column: &OutputColumn, direction: SortDirection) -> OrderItem {
    let reference = SqlExpr::Alias(column.caption.clone());
    OrderItem {
        expr: if column.data_type.is_textual() {
            reference.call(Function::Lower)
        } else {
            reference
        },
        direction,
        nulls_last: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{ColumnRef, DataType};

    fn columns() -> Vec<OutputColumn> {
        vec![
            OutputColumn {
                column: ColumnRef::Standard("user_email"),
                caption: "Email".to_string(),
                data_type: DataType::Text,
                sortable: true,
            },
            OutputColumn {
                column: ColumnRef::Standard("course_credits"),
                caption: "Credits".to_string(),
                data_type: DataType::Number,
                sortable: true,
            },
            OutputColumn {
                column: ColumnRef::Standard("user_userid"),
                caption: "Username".to_string(),
                data_type: DataType::Text,
                sortable: true,
            },
            OutputColumn {
                column: ColumnRef::Standard("course_name"),
                caption: "Course Name".to_string(),
                data_type: DataType::Text,
                sortable: true,
            },
        ]
    }

    fn custom(field: Option<&str>) -> SortingOptions {
        SortingOptions {
            selector: SortSelector::Custom,
            selected_field: field.map(str::to_string),
            order_by: SortOrder::Desc,
        }
    }

    #[test]
    fn invalid_selection_matches_absent_selection() {
        let cols = columns();
        let resolver = SortingResolver::new(&cols, "user_userid", &["user_userid", "course_name"]);
        let invalid = resolver.order_by(&custom(Some("lp_name")));
        let absent = resolver.order_by(&custom(None));
        let blank = resolver.order_by(&custom(Some("  ")));
        assert_eq!(invalid, absent);
        assert_eq!(blank, absent);
        assert!(resolver.resolve(&custom(Some("lp_name"))).fell_back);
    }

    #[test]
    fn selected_field_comes_first_then_tie_breakers() {
        let cols = columns();
        let resolver = SortingResolver::new(&cols, "user_userid", &["user_userid", "course_name"]);
        let items = resolver.order_by(&custom(Some("course_credits")));
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].expr, SqlExpr::Alias("Credits".to_string()));
        assert_eq!(items[0].direction, SortDirection::Desc);
        assert_eq!(
            items[1].expr,
            SqlExpr::Alias("Username".to_string()).call(Function::Lower)
        );
        assert!(items.iter().all(|i| i.nulls_last));
    }

    #[test]
    fn default_selector_ignores_selected_field() {
        let cols = columns();
        let resolver = SortingResolver::new(&cols, "user_userid", &["user_userid"]);
        let options = SortingOptions {
            selector: SortSelector::Default,
            selected_field: Some("user_email".to_string()),
            order_by: SortOrder::Asc,
        };
        let resolved = resolver.resolve(&options);
        assert_eq!(resolved.field_id, "user_userid");
        assert!(!resolved.fell_back);
    }
}
