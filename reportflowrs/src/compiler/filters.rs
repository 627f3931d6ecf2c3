//! Filter composition: date windows, enrollment statuses, text and id filters.
//!
//! Every builder returns `Option<SqlExpr>`; `None` means "unrestricted" and is
//! simply skipped when predicates are AND-chained.

use chrono::{LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::dialect::escape_like;
use crate::fields::EnrollmentColumns;
use crate::report::{
    Conditions, DateDescriptor, DateOperator, EnrollmentStatusFilter, TextOperator,
};
use crate::sql_ast::{and_all, or_all, Function, SqlBinaryOperator, SqlExpr};

const FAR_FUTURE: &str = "9999-12-31 23:59:59";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A resolved date restriction; absolute bounds are already in UTC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateWindow {
    /// Between now and `n` days ahead.
    Next(i64),
    /// Between `n` days ago and now.
    Last(i64),
    Between(NaiveDateTime, NaiveDateTime),
    From(NaiveDateTime),
    Until(NaiveDateTime),
}

#[derive(Debug, Clone, Copy)]
pub struct FilterComposer {
    timezone: Tz,
}

impl FilterComposer {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn date_window(&self, desc: &DateDescriptor) -> Option<DateWindow> {
        if desc.any {
            return None;
        }
        if let (Some(operator), Some(days)) = (desc.operator, desc.days) {
            if days < 0 {
                tracing::warn!(days, "negative relative date window ignored");
                return None;
            }
            return Some(match operator {
                DateOperator::ExpiringIn => DateWindow::Next(days),
                DateOperator::Range => DateWindow::Last(days),
            });
        }
        let from = desc
            .from
            .as_deref()
            .and_then(parse_day)
            .and_then(|d| self.local_to_utc(d.and_hms_opt(0, 0, 0)?));
        let to = desc
            .to
            .as_deref()
            .and_then(parse_day)
            .and_then(|d| self.local_to_utc(d.and_hms_opt(23, 59, 59)?));
        match (from, to) {
            (Some(from), Some(to)) => Some(DateWindow::Between(from, to)),
            (Some(from), None) => Some(DateWindow::From(from)),
            (None, Some(to)) => Some(DateWindow::Until(to)),
            // `any: false` without usable bounds stays unrestricted.
            (None, None) => None,
        }
    }

    pub fn is_restrictive(&self, desc: Option<&DateDescriptor>) -> bool {
        desc.and_then(|d| self.date_window(d)).is_some()
    }

    /// Predicate for `column` under `desc`. With `null_as_far`, NULL values
    /// count as the far future (open-ended expirations).
    pub fn build_date_filter(
        &self,
        column: SqlExpr,
        desc: Option<&DateDescriptor>,
        null_as_far: bool,
    ) -> Option<SqlExpr> {
        let window = self.date_window(desc?)?;
        let column = if null_as_far {
            column.coalesce(SqlExpr::Timestamp(FAR_FUTURE.to_string()))
        } else {
            column
        };
        let now = || SqlExpr::func(Function::CurrentTimestamp, vec![]);
        let ts = |value: NaiveDateTime| {
            SqlExpr::Timestamp(value.format(TIMESTAMP_FORMAT).to_string())
        };
        Some(match window {
            DateWindow::Next(days) => column.between(now(), now().call(Function::AddDays { days })),
            DateWindow::Last(days) => {
                column.between(now().call(Function::AddDays { days: -days }), now())
            }
            DateWindow::Between(from, to) => column.between(ts(from), ts(to)),
            DateWindow::From(from) => column.gte(ts(from)),
            DateWindow::Until(to) => column.lte(ts(to)),
        })
    }

    fn local_to_utc(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        let zoned = match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(zoned) => zoned,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => return None,
        };
        Some(zoned.with_timezone(&Utc).naive_utc())
    }
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    let day = value.trim().get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Join predicates with the report-level combinator.
pub fn combine(preds: Vec<SqlExpr>, conditions: Conditions) -> Option<SqlExpr> {
    match conditions {
        Conditions::AllConditions => and_all(preds),
        Conditions::AtLeastOneCondition => or_all(preds),
    }
}

/// Enrollment status predicate. Regular codes form an `IN` set restricted to
/// non-waiting rows; waiting list and to-confirm are separate OR branches.
pub fn enrollment_status_filter(
    filter: &EnrollmentStatusFilter,
    cols: &EnrollmentColumns,
) -> Option<SqlExpr> {
    if filter.all_selected() {
        return None;
    }
    let codes: Vec<SqlExpr> = [
        (filter.not_started, 0),
        (filter.in_progress, 1),
        (filter.completed, 2),
        (filter.suspended, 3),
    ]
    .into_iter()
    .filter(|(selected, _)| *selected)
    .map(|(_, code)| SqlExpr::int(code))
    .collect();

    let mut branches = Vec::new();
    if !codes.is_empty() {
        branches.push(
            cols.status
                .clone()
                .in_list(codes)
                .and(cols.waiting.clone().equals(SqlExpr::int(0))),
        );
    }
    if filter.waiting_list {
        branches.push(cols.waiting.clone().equals(SqlExpr::int(1)));
    }
    if filter.enrollments_to_confirm {
        branches.push(cols.status.clone().equals(SqlExpr::int(-2)));
    }
    Some(or_all(branches).unwrap_or_else(|| SqlExpr::bool(false)))
}

/// Case-insensitive text comparison. Pattern operators match `value`
/// literally; LIKE wildcards in it are escaped.
pub fn text_filter(expr: SqlExpr, operator: TextOperator, value: &str) -> SqlExpr {
    let lowered = value.to_lowercase();
    let literal = escape_like(value);
    let like = |expr: SqlExpr, pattern: String| {
        expr.binary(SqlBinaryOperator::ILike, SqlExpr::str(&pattern))
    };
    let blank = || SqlExpr::str("");
    match operator {
        TextOperator::Equals => expr.call(Function::Lower).equals(SqlExpr::str(&lowered)),
        TextOperator::NotEquals => expr
            .call(Function::Lower)
            .coalesce(blank())
            .binary(SqlBinaryOperator::Neq, SqlExpr::str(&lowered)),
        TextOperator::Contains => like(expr, format!("%{literal}%")),
        TextOperator::NotContains => {
            SqlExpr::Not(Box::new(like(expr.coalesce(blank()), format!("%{literal}%"))))
        }
        TextOperator::StartsWith => like(expr, format!("{literal}%")),
        TextOperator::EndsWith => like(expr, format!("%{literal}")),
        TextOperator::IsEmpty => expr
            .clone()
            .is_null()
            .or(expr.call(Function::Trim).equals(blank())),
        TextOperator::IsNotEmpty => expr
            .clone()
            .is_not_null()
            .and(expr.call(Function::Trim).binary(SqlBinaryOperator::Neq, blank())),
    }
}

/// `expr IN (ids)`; an empty selection matches nothing.
pub fn id_filter(expr: SqlExpr, ids: &[u64]) -> SqlExpr {
    if ids.is_empty() {
        return SqlExpr::bool(false);
    }
    expr.in_list(ids.iter().map(|id| SqlExpr::Literal((*id).into())).collect())
}
