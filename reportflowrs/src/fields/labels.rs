use std::collections::HashMap;

/// Translation keys for rendered values, with the English fallback used when
/// the translation service has no entry.
const VALUE_LABELS: &[(&str, &str)] = &[
    ("_YES", "Yes"),
    ("_NO", "No"),
    ("_USER_STATUS_SUBS", "Enrolled"),
    ("_USER_STATUS_BEGIN", "In Progress"),
    ("_USER_STATUS_END", "Completed"),
    ("_USER_STATUS_SUSPEND", "Suspended"),
    ("_WAITING_USERS", "Waiting list"),
    ("_USER_STATUS_CONFIRM", "To be confirmed"),
    ("_LEVEL_3", "Learner"),
    ("_LEVEL_4", "Tutor"),
    ("_LEVEL_6", "Instructor"),
    ("_GODADMIN", "Superadmin"),
    ("_POWER_USER", "Power User"),
    ("_USER", "User"),
    ("_ELEARNING", "E-Learning"),
    ("_CLASSROOM", "ILT"),
    ("_WEBINAR", "Webinar"),
    ("_PUBLISHED", "Published"),
    ("_UNDER_MAINTENANCE", "Under maintenance"),
    ("_NOT_STARTED", "Not started"),
    ("_ACTIVE", "Active"),
    ("_EXPIRED", "Expired"),
];

/// Every value-label key, requested in the same batch as captions.
pub fn label_keys() -> impl Iterator<Item = &'static str> {
    VALUE_LABELS.iter().map(|(key, _)| *key)
}

/// Translated strings for one compilation.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    translations: HashMap<String, String>,
}

impl Labels {
    pub fn new(translations: HashMap<String, String>) -> Self {
        Self { translations }
    }

    /// Translated text for `key`, else the built-in English value, else the key.
    pub fn text(&self, key: &str) -> String {
        if let Some(value) = self.translations.get(key) {
            return value.clone();
        }
        VALUE_LABELS
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
            .unwrap_or_else(|| key.to_string())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.translations.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_builtin_english() {
        let mut map = HashMap::new();
        map.insert("_YES".to_string(), "Sì".to_string());
        let labels = Labels::new(map);
        assert_eq!(labels.text("_YES"), "Sì");
        assert_eq!(labels.text("_NO"), "No");
        assert_eq!(labels.text("_UNKNOWN"), "_UNKNOWN");
    }
}
