use serde::{Deserialize, Serialize};

/// Row visibility of the requesting administrator, derived from the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VisibilityScope {
    pub user_id: u64,
    pub is_power_user: bool,
    pub is_god_admin: bool,
    pub is_erp_admin: bool,
    /// Branches assigned to a power user.
    pub branch_ids: Vec<u64>,
    pub group_ids: Vec<u64>,
    pub course_ids: Vec<u64>,
}

impl VisibilityScope {
    pub fn god_admin(user_id: u64) -> Self {
        Self {
            user_id,
            is_god_admin: true,
            ..Default::default()
        }
    }

    pub fn power_user(user_id: u64) -> Self {
        Self {
            user_id,
            is_power_user: true,
            ..Default::default()
        }
    }

    pub fn with_branches(mut self, branch_ids: Vec<u64>) -> Self {
        self.branch_ids = branch_ids;
        self
    }

    pub fn with_groups(mut self, group_ids: Vec<u64>) -> Self {
        self.group_ids = group_ids;
        self
    }

    pub fn with_courses(mut self, course_ids: Vec<u64>) -> Self {
        self.course_ids = course_ids;
        self
    }

    /// Power-user restrictions apply unless a higher admin role overrides them.
    pub fn is_restricted(&self) -> bool {
        self.is_power_user && !self.is_god_admin && !self.is_erp_admin
    }

    /// Keep only ids the scope may see; unrestricted scopes or empty sets keep everything.
    pub fn visible_groups(&self, requested: &[u64]) -> Vec<u64> {
        intersect(self.is_restricted(), &self.group_ids, requested)
    }

    pub fn visible_courses(&self, requested: &[u64]) -> Vec<u64> {
        intersect(self.is_restricted(), &self.course_ids, requested)
    }
}

fn intersect(restricted: bool, allowed: &[u64], requested: &[u64]) -> Vec<u64> {
    if !restricted || allowed.is_empty() {
        return requested.to_vec();
    }
    requested
        .iter()
        .copied()
        .filter(|id| allowed.contains(id))
        .collect()
}
