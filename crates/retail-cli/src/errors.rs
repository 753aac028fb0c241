use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Could not find retail project root.\nExpected to find 'retail.yml'.\nHint: Pass --database to work on a database file directly.")]
    ProjectRootNotFound,

    #[error("Failed to load configuration file: {path}\n{source}")]
    ConfigLoadError {
        path: PathBuf,
        source: anyhow::Error,
    },

    #[error("Target '{target}' not found in retail.yml. Available targets: {}", available.join(", "))]
    UnknownTarget {
        target: String,
        available: Vec<String>,
    },

    #[error("Database not found: {path}\nHint: Run 'retail generate' to create a demo database.")]
    DatabaseNotFound { path: PathBuf },

    #[error("Report '{report}' failed to render:\n  {source}")]
    RenderError {
        report: String,
        #[source]
        source: anyhow::Error,
    },
}
