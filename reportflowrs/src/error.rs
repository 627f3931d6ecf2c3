use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportflowError>;

#[derive(Debug, Error)]
pub enum ReportflowError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    /// A filter or request references an entity the caller cannot resolve.
    #[error("not found ({code}): {message}")]
    NotFound { code: &'static str, message: String },
    #[error("lookup error: {0}")]
    Lookup(String),
    #[error("sql generation error: {0}")]
    Sql(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReportflowError {
    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        ReportflowError::NotFound {
            code,
            message: message.into(),
        }
    }

    /// Stable machine-readable code, safe to surface to API callers.
    pub fn code(&self) -> &'static str {
        match self {
            ReportflowError::Io(_) => "io_error",
            ReportflowError::Yaml(_) => "yaml_error",
            ReportflowError::Json(_) => "json_error",
            ReportflowError::Config(_) => "config_error",
            ReportflowError::Validation(_) => "validation_error",
            ReportflowError::NotFound { code, .. } => code,
            ReportflowError::Lookup(_) => "lookup_error",
            ReportflowError::Sql(_) => "sql_error",
            ReportflowError::Other(_) => "internal_error",
        }
    }
}
