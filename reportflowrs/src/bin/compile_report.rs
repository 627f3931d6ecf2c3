//! Compile a report specification to warehouse SQL.
//!
//! Usage:
//!   compile_report <spec.json|spec.yml> [athena|snowflake] [--export] [--scope scope.json]
//!
//! Additional field captions and translations are resolved from local files
//! only: `--translations <dir>` holds `<lang>.yml` maps.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use reportflow::lookup::{StaticFieldCatalog, StaticTranslations};
use reportflow::{
    CompileOptions, DialectKind, LimitMode, ReportCompiler, ReportSpecification, ReportflowConfig,
    VisibilityScope,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "compile_report")]
#[command(about = "Compile a report specification to Athena or Snowflake SQL")]
#[command(version)]
struct Cli {
    /// Report specification (.json, .yml or .yaml)
    spec: PathBuf,

    /// Target warehouse
    #[arg(default_value = "athena")]
    dialect: DialectArg,

    /// Apply the export row cap instead of the preview cap
    #[arg(long)]
    export: bool,

    /// Caption language
    #[arg(long)]
    lang: Option<String>,

    /// Visibility scope as JSON; god admin when omitted
    #[arg(long)]
    scope: Option<PathBuf>,

    /// Directory of `<lang>.yml` translation maps
    #[arg(long)]
    translations: Option<PathBuf>,

    /// Print the compiled query as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Athena,
    Snowflake,
}

impl From<DialectArg> for DialectKind {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Athena => DialectKind::Athena,
            DialectArg::Snowflake => DialectKind::Snowflake,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run(cli)) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<String> {
    let config = ReportflowConfig::load_default();
    let registry = reportflow::load_and_validate()?;

    let spec = ReportSpecification::load(&cli.spec)
        .with_context(|| format!("reading {}", cli.spec.display()))?;
    let scope = match &cli.scope {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).context("parsing visibility scope")?
        }
        None => VisibilityScope::god_admin(0),
    };
    let translations = match &cli.translations {
        Some(dir) => StaticTranslations::load_from_dir(dir, &config.compiler.default_lang)?,
        None => StaticTranslations::new(config.compiler.default_lang.clone()),
    };

    let compiler = ReportCompiler::new(
        registry,
        Arc::new(translations),
        Arc::new(StaticFieldCatalog::default()),
    )
    .with_config(config);

    let mut options = CompileOptions::new(cli.dialect.into()).limit(if cli.export {
        LimitMode::Export
    } else {
        LimitMode::Preview
    });
    if let Some(lang) = cli.lang {
        options = options.lang(lang);
    }

    let query = compiler.compile(&spec, &scope, &options).await?;
    if cli.json {
        Ok(serde_json::to_string_pretty(&query)?)
    } else {
        Ok(query.sql)
    }
}
