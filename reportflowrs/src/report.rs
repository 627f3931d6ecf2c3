//! Report specifications as persisted by the metadata store.
//!
//! Field names follow the stored camelCase JSON so specifications written by
//! older releases keep deserializing; unknown blocks are ignored.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    #[default]
    Users,
    UsersCourses,
    UsersLearningPlans,
    UsersCertifications,
    UsersBadges,
}

impl ReportType {
    pub const ALL: [ReportType; 5] = [
        ReportType::Users,
        ReportType::UsersCourses,
        ReportType::UsersLearningPlans,
        ReportType::UsersCertifications,
        ReportType::UsersBadges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Users => "users",
            ReportType::UsersCourses => "usersCourses",
            ReportType::UsersLearningPlans => "usersLearningPlans",
            ReportType::UsersCertifications => "usersCertifications",
            ReportType::UsersBadges => "usersBadges",
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSpecification {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub timezone: Option<String>,
    /// Requested field ids, in output order.
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub sorting_options: SortingOptions,
    #[serde(default)]
    pub enrollment_types: EnrollmentTypes,
    #[serde(default)]
    pub users: Option<UsersFilter>,
    #[serde(default)]
    pub courses: Option<CoursesFilter>,
    #[serde(default)]
    pub learning_plans: Option<EntityFilter>,
    #[serde(default)]
    pub certifications: Option<EntityFilter>,
    #[serde(default)]
    pub badges: Option<EntityFilter>,
    #[serde(default)]
    pub enrollment: Option<EnrollmentStatusFilter>,
    #[serde(default)]
    pub date_ranges: Option<DateRanges>,
    #[serde(default)]
    pub user_additional_fields: Option<AdditionalFieldsFilter>,
}

impl ReportSpecification {
    pub fn new(report_type: ReportType) -> Self {
        Self {
            report_type,
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a specification file; `.yml`/`.yaml` are parsed as YAML, everything else as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yml") | Some("yaml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingOptions {
    #[serde(default)]
    pub selector: SortSelector,
    #[serde(default)]
    pub selected_field: Option<String>,
    #[serde(default)]
    pub order_by: SortOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortSelector {
    #[default]
    Default,
    Custom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

// ============================================================================
// Entity filters
// ============================================================================

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsersFilter {
    #[serde(default = "default_true")]
    pub all: bool,
    #[serde(default)]
    pub users: Vec<u64>,
    #[serde(default)]
    pub groups: Vec<u64>,
    #[serde(default)]
    pub branches: Vec<BranchSelection>,
    #[serde(default)]
    pub hide_deactivated: bool,
}

impl Default for UsersFilter {
    fn default() -> Self {
        Self {
            all: true,
            users: Vec::new(),
            groups: Vec::new(),
            branches: Vec::new(),
            hide_deactivated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchSelection {
    pub id: u64,
    /// Include every branch below `id` in the org chart.
    #[serde(default)]
    pub descendants: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoursesFilter {
    #[serde(default = "default_true")]
    pub all: bool,
    #[serde(default)]
    pub courses: Vec<u64>,
    #[serde(default)]
    pub categories: Vec<u64>,
}

impl Default for CoursesFilter {
    fn default() -> Self {
        Self {
            all: true,
            courses: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// Selection of learning plans, certifications or badges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityFilter {
    #[serde(default = "default_true")]
    pub all: bool,
    #[serde(
        default,
        alias = "learningPlans",
        alias = "certifications",
        alias = "badges"
    )]
    pub ids: Vec<u64>,
}

impl Default for EntityFilter {
    fn default() -> Self {
        Self {
            all: true,
            ids: Vec::new(),
        }
    }
}

// ============================================================================
// Enrollment filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EnrollmentTypes {
    #[default]
    Active,
    Archived,
    ActiveAndArchived,
}

/// Which enrollment statuses to keep. Every flag defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStatusFilter {
    #[serde(default = "default_true")]
    pub completed: bool,
    #[serde(default = "default_true")]
    pub in_progress: bool,
    #[serde(default = "default_true")]
    pub not_started: bool,
    #[serde(default = "default_true")]
    pub suspended: bool,
    #[serde(default = "default_true")]
    pub waiting_list: bool,
    #[serde(default = "default_true")]
    pub enrollments_to_confirm: bool,
}

impl Default for EnrollmentStatusFilter {
    fn default() -> Self {
        Self {
            completed: true,
            in_progress: true,
            not_started: true,
            suspended: true,
            waiting_list: true,
            enrollments_to_confirm: true,
        }
    }
}

impl EnrollmentStatusFilter {
    pub fn all_selected(&self) -> bool {
        self.completed
            && self.in_progress
            && self.not_started
            && self.suspended
            && self.waiting_list
            && self.enrollments_to_confirm
    }
}

// ============================================================================
// Date filters
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Conditions {
    #[default]
    AllConditions,
    AtLeastOneCondition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRanges {
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default)]
    pub enrollment_date: Option<DateDescriptor>,
    #[serde(default)]
    pub completion_date: Option<DateDescriptor>,
    #[serde(default)]
    pub archiving_date: Option<DateDescriptor>,
    #[serde(default)]
    pub course_expiration_date: Option<DateDescriptor>,
    #[serde(default)]
    pub certification_issue_date: Option<DateDescriptor>,
    #[serde(default)]
    pub lp_enrollment_date: Option<DateDescriptor>,
    #[serde(default)]
    pub badge_issue_date: Option<DateDescriptor>,
}

/// Tri-state date restriction: `any` means unrestricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateDescriptor {
    #[serde(default = "default_true")]
    pub any: bool,
    #[serde(default)]
    pub operator: Option<DateOperator>,
    #[serde(default)]
    pub days: Option<i64>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

impl Default for DateDescriptor {
    fn default() -> Self {
        Self::any()
    }
}

impl DateDescriptor {
    pub fn any() -> Self {
        Self {
            any: true,
            operator: None,
            days: None,
            from: None,
            to: None,
        }
    }

    pub fn between(from: &str, to: &str) -> Self {
        Self {
            any: false,
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..Self::any()
        }
    }

    pub fn relative(operator: DateOperator, days: i64) -> Self {
        Self {
            any: false,
            operator: Some(operator),
            days: Some(days),
            ..Self::any()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateOperator {
    /// Within the next `days` days.
    ExpiringIn,
    /// Within the last `days` days.
    Range,
}

// ============================================================================
// Additional (custom) field filters
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFieldsFilter {
    #[serde(default)]
    pub conditions: Conditions,
    #[serde(default)]
    pub filters: Vec<AdditionalFieldCondition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFieldCondition {
    pub field_id: u64,
    pub operator: TextOperator,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    IsEmpty,
    IsNotEmpty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_json_with_defaults() {
        let spec = ReportSpecification::from_json(
            r#"{
                "type": "usersCourses",
                "timezone": "Europe/Rome",
                "fields": ["user_userid", "course_name"],
                "sortingOptions": {"selector": "custom", "selectedField": "course_name", "orderBy": "desc"},
                "enrollment": {"waitingList": false},
                "learningPlans": {"all": false, "learningPlans": [3, 4]},
                "assets": {"all": true}
            }"#,
        )
        .unwrap();
        assert_eq!(spec.report_type, ReportType::UsersCourses);
        assert_eq!(spec.sorting_options.order_by, SortOrder::Desc);
        assert_eq!(spec.enrollment_types, EnrollmentTypes::Active);
        let enrollment = spec.enrollment.unwrap();
        assert!(!enrollment.waiting_list);
        assert!(enrollment.completed);
        assert_eq!(spec.learning_plans.unwrap().ids, vec![3, 4]);
    }

    #[test]
    fn date_descriptor_defaults_to_any() {
        let desc: DateDescriptor = serde_json::from_str("{}").unwrap();
        assert!(desc.any);
        let desc: DateDescriptor =
            serde_json::from_str(r#"{"any": false, "operator": "expiringIn", "days": 30}"#)
                .unwrap();
        assert_eq!(desc, DateDescriptor::relative(DateOperator::ExpiringIn, 30));
    }

    #[test]
    fn parses_yaml() {
        let spec = ReportSpecification::from_yaml(
            "type: users\nfields: [user_email]\nusers:\n  all: false\n  groups: [7]\n",
        )
        .unwrap();
        assert_eq!(spec.report_type, ReportType::Users);
        let users = spec.users.unwrap();
        assert!(!users.all);
        assert_eq!(users.groups, vec![7]);
    }
}
