//! Integration tests for file-backed lookups and the executor hand-off.

use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reportflow::error::Result;
use reportflow::executor::{ColumnMeta, QueryExecutor, QueryResult};
use reportflow::fields::FieldRegistry;
use reportflow::lookup::{StaticFieldCatalog, StaticTranslations, TranslationService};
use reportflow::{
    run_report, CompileOptions, CompiledQuery, DialectKind, ReportCompiler, ReportSpecification,
    VisibilityScope,
};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingExecutor {
    seen: Mutex<Vec<CompiledQuery>>,
}

#[async_trait]
impl QueryExecutor for RecordingExecutor {
    async fn execute(&self, query: &CompiledQuery) -> Result<QueryResult> {
        self.seen.lock().unwrap().push(query.clone());
        Ok(QueryResult {
            columns: query
                .columns
                .iter()
                .map(|name| ColumnMeta { name: name.clone() })
                .collect(),
            rows: vec![],
        })
    }
}

#[tokio::test]
async fn translations_load_from_yaml_with_default_fallback() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("english.yml"), "_USERNAME: Username\n_EMAIL: Email\n").unwrap();
    fs::write(dir.path().join("italian.yaml"), "_USERNAME: Nome utente\n").unwrap();

    let translations = StaticTranslations::load_from_dir(dir.path(), "english").unwrap();
    let keys = vec!["_USERNAME".to_string(), "_EMAIL".to_string(), "_MISSING".to_string()];
    let italian = translations.get_translations(&keys, "italian").await.unwrap();
    assert_eq!(italian["_USERNAME"], "Nome utente");
    assert_eq!(italian["_EMAIL"], "Email");
    assert!(!italian.contains_key("_MISSING"));
}

#[test]
fn missing_translation_dir_is_an_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    assert!(StaticTranslations::load_from_dir(&missing, "english").is_err());
}

#[test]
fn report_specification_loads_by_extension() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("report.yml");
    fs::write(
        &yaml,
        "type: usersBadges\nfields: [badge_name]\nbadges:\n  all: false\n  badges: [3, 4]\n",
    )
    .unwrap();
    let spec = ReportSpecification::load(&yaml).unwrap();
    assert_eq!(spec.report_type, reportflow::ReportType::UsersBadges);
    assert_eq!(spec.badges.unwrap().ids, vec![3, 4]);
}

#[tokio::test]
async fn run_report_hands_compiled_query_to_executor() {
    let compiler = ReportCompiler::new(
        FieldRegistry::shared(),
        Arc::new(StaticTranslations::new("english")),
        Arc::new(StaticFieldCatalog::default()),
    );
    let executor = RecordingExecutor::default();
    let spec =
        ReportSpecification::from_json(r#"{"type": "usersBadges", "fields": ["badge_name"]}"#)
            .unwrap();

    let result = run_report(
        &compiler,
        &executor,
        &spec,
        &VisibilityScope::god_admin(1),
        &CompileOptions::new(DialectKind::Snowflake),
    )
    .await
    .unwrap();

    let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Badge Name", "Username"]);
    let seen = executor.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].sql.contains("FROM gamification_assigned_badges AS gab"));
    assert_eq!(seen[0].limit, Some(100));
}
