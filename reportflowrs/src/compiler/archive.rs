//! Archival union decision: which enrollment sources a report reads.

use serde::Serialize;

use crate::fields::{Branch, ReportDefinition};
use crate::report::{Conditions, EnrollmentTypes, ReportSpecification};

use super::filters::FilterComposer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveMode {
    ActiveOnly,
    ArchivedOnly,
    UnionBoth,
}

impl ArchiveMode {
    /// Branches to emit, live first.
    pub fn branches(&self) -> &'static [Branch] {
        match self {
            ArchiveMode::ActiveOnly => &[Branch::Live],
            ArchiveMode::ArchivedOnly => &[Branch::Archived],
            ArchiveMode::UnionBoth => &[Branch::Live, Branch::Archived],
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArchivalUnionBuilder {
    enabled: bool,
}

impl ArchivalUnionBuilder {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn decide(
        &self,
        spec: &ReportSpecification,
        report: &ReportDefinition,
        composer: &FilterComposer,
    ) -> ArchiveMode {
        if spec.enrollment_types == EnrollmentTypes::Active {
            return ArchiveMode::ActiveOnly;
        }
        if !report.supports_archive || !self.enabled {
            tracing::warn!(
                report_type = %spec.report_type,
                archive_enabled = self.enabled,
                "archived enrollments requested but unavailable, reading live data only"
            );
            return ArchiveMode::ActiveOnly;
        }
        if spec.enrollment_types == EnrollmentTypes::Archived {
            return ArchiveMode::ArchivedOnly;
        }

        let ranges = spec.date_ranges.clone().unwrap_or_default();
        let archiving = composer.is_restrictive(ranges.archiving_date.as_ref());
        let others = [
            ranges.enrollment_date.as_ref(),
            ranges.completion_date.as_ref(),
            ranges.course_expiration_date.as_ref(),
        ]
        .into_iter()
        .filter(|desc| composer.is_restrictive(*desc))
        .count();

        // Live rows have no archiving date, so a mandatory archiving-date
        // predicate can only match snapshots.
        let mode = if archiving
            && (others == 0 || ranges.conditions == Conditions::AllConditions)
        {
            ArchiveMode::ArchivedOnly
        } else {
            ArchiveMode::UnionBoth
        };
        tracing::debug!(mode = ?mode, archiving, others, "archival mode chosen");
        mode
    }
}
