//! External lookups awaited during compilation: translations, the additional
//! field catalog and the org chart. In-memory implementations back tests and
//! the CLI.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use glob::glob;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ReportflowError};

#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Resolve `keys` in `lang`, falling back to the default locale for keys the
    /// language lacks. Keys unknown everywhere are omitted from the map.
    async fn get_translations(&self, keys: &[String], lang: &str)
        -> Result<HashMap<String, String>>;
}

/// Which entity an additional field hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraFieldKind {
    User,
    Course,
    Enrollment,
}

impl ExtraFieldKind {
    /// Field id prefix, e.g. `user_extrafield_`.
    pub fn prefix(&self) -> &'static str {
        match self {
            ExtraFieldKind::User => "user_extrafield_",
            ExtraFieldKind::Course => "course_extrafield_",
            ExtraFieldKind::Enrollment => "enrollment_extrafield_",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraField {
    pub id: u64,
    pub title: String,
    #[serde(rename = "type")]
    pub field_type: String,
}

impl ExtraField {
    pub fn new(id: u64, title: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            field_type: field_type.into(),
        }
    }
}

#[async_trait]
pub trait FieldCatalog: Send + Sync {
    async fn user_extra_fields(&self) -> Result<Vec<ExtraField>>;
    async fn course_extra_fields(&self) -> Result<Vec<ExtraField>>;
    async fn courseuser_extra_fields(&self) -> Result<Vec<ExtraField>>;

    async fn extra_fields(&self, kind: ExtraFieldKind) -> Result<Vec<ExtraField>> {
        match kind {
            ExtraFieldKind::User => self.user_extra_fields().await,
            ExtraFieldKind::Course => self.course_extra_fields().await,
            ExtraFieldKind::Enrollment => self.courseuser_extra_fields().await,
        }
    }
}

/// One org-chart node with its nested-set bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchNode {
    pub id: u64,
    pub ileft: u64,
    pub iright: u64,
}

#[async_trait]
pub trait OrgChartDirectory: Send + Sync {
    async fn branch(&self, id: u64) -> Result<Option<BranchNode>>;

    /// The root of the tree, used when a dashboard names no branch.
    async fn root(&self) -> Result<BranchNode>;
}

// ============================================================================
// In-memory implementations
// ============================================================================

/// Translations held in memory, keyed by language then key.
#[derive(Debug, Clone)]
pub struct StaticTranslations {
    default_lang: String,
    languages: HashMap<String, HashMap<String, String>>,
}

impl StaticTranslations {
    pub fn new(default_lang: impl Into<String>) -> Self {
        Self {
            default_lang: default_lang.into(),
            languages: HashMap::new(),
        }
    }

    pub fn insert(&mut self, lang: &str, key: impl Into<String>, value: impl Into<String>) {
        self.languages
            .entry(lang.to_string())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn with(mut self, lang: &str, key: &str, value: &str) -> Self {
        self.insert(lang, key, value);
        self
    }

    /// Load every `<lang>.yml` / `<lang>.yaml` file (a flat key/value map) under `dir`.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P, default_lang: &str) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Err(ReportflowError::Validation(format!(
                "translations directory not found: {}",
                dir.display()
            )));
        }
        let mut translations = Self::new(default_lang);
        for pattern in ["*.yml", "*.yaml"] {
            for entry in glob(&format!("{}/{pattern}", dir.display()))
                .map_err(|e| ReportflowError::Other(e.into()))?
                .flatten()
            {
                let Some(lang) = entry.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let contents = fs::read_to_string(&entry)?;
                let map: HashMap<String, String> = serde_yaml::from_str(&contents)?;
                tracing::debug!(lang, keys = map.len(), "loaded translations");
                translations
                    .languages
                    .entry(lang.to_string())
                    .or_default()
                    .extend(map);
            }
        }
        Ok(translations)
    }
}

#[async_trait]
impl TranslationService for StaticTranslations {
    async fn get_translations(
        &self,
        keys: &[String],
        lang: &str,
    ) -> Result<HashMap<String, String>> {
        let primary = self.languages.get(lang);
        let fallback = self.languages.get(&self.default_lang);
        let mut out = HashMap::with_capacity(keys.len());
        for key in keys {
            let value = primary
                .and_then(|m| m.get(key))
                .or_else(|| fallback.and_then(|m| m.get(key)));
            if let Some(value) = value {
                out.insert(key.clone(), value.clone());
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticFieldCatalog {
    pub user: Vec<ExtraField>,
    pub course: Vec<ExtraField>,
    pub enrollment: Vec<ExtraField>,
}

impl StaticFieldCatalog {
    pub fn with_user_field(mut self, field: ExtraField) -> Self {
        self.user.push(field);
        self
    }

    pub fn with_course_field(mut self, field: ExtraField) -> Self {
        self.course.push(field);
        self
    }

    pub fn with_enrollment_field(mut self, field: ExtraField) -> Self {
        self.enrollment.push(field);
        self
    }
}

#[async_trait]
impl FieldCatalog for StaticFieldCatalog {
    async fn user_extra_fields(&self) -> Result<Vec<ExtraField>> {
        Ok(self.user.clone())
    }

    async fn course_extra_fields(&self) -> Result<Vec<ExtraField>> {
        Ok(self.course.clone())
    }

    async fn courseuser_extra_fields(&self) -> Result<Vec<ExtraField>> {
        Ok(self.enrollment.clone())
    }
}

#[derive(Debug, Clone)]
pub struct StaticOrgChart {
    root: BranchNode,
    nodes: HashMap<u64, BranchNode>,
}

impl StaticOrgChart {
    pub fn new(root: BranchNode) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(root.id, root);
        Self { root, nodes }
    }

    pub fn with_branch(mut self, node: BranchNode) -> Self {
        self.nodes.insert(node.id, node);
        self
    }
}

#[async_trait]
impl OrgChartDirectory for StaticOrgChart {
    async fn branch(&self, id: u64) -> Result<Option<BranchNode>> {
        Ok(self.nodes.get(&id).copied())
    }

    async fn root(&self) -> Result<BranchNode> {
        Ok(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn translations_fall_back_to_default_language() {
        let translations = StaticTranslations::new("english")
            .with("english", "_EMAIL", "Email")
            .with("english", "_USERNAME", "Username")
            .with("italian", "_USERNAME", "Nome utente");
        let keys = vec![
            "_USERNAME".to_string(),
            "_EMAIL".to_string(),
            "_MISSING".to_string(),
        ];
        let map = translations.get_translations(&keys, "italian").await.unwrap();
        assert_eq!(map["_USERNAME"], "Nome utente");
        assert_eq!(map["_EMAIL"], "Email");
        assert!(!map.contains_key("_MISSING"));
    }

    #[test]
    fn loads_language_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("english.yml"), "_USERNAME: Username\n").unwrap();
        fs::write(dir.path().join("german.yaml"), "_USERNAME: Benutzername\n").unwrap();
        let translations = StaticTranslations::load_from_dir(dir.path(), "english").unwrap();
        assert_eq!(translations.languages.len(), 2);
        assert_eq!(translations.languages["german"]["_USERNAME"], "Benutzername");
    }

    #[tokio::test]
    async fn catalog_dispatches_by_kind() {
        let catalog =
            StaticFieldCatalog::default()
                .with_course_field(ExtraField::new(4, "Vendor", "textfield"));
        let fields = catalog.extra_fields(ExtraFieldKind::Course).await.unwrap();
        assert_eq!(fields.len(), 1);
        assert!(catalog
            .extra_fields(ExtraFieldKind::User)
            .await
            .unwrap()
            .is_empty());
    }
}
