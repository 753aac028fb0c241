use crate::errors::CliError;
use anyhow::Result;
use retail_store::TableRef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "retail.yml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub name: String,
    pub version: u32,
    pub targets: HashMap<String, Target>,
    #[serde(default = "default_target")]
    pub default_target: String,
}

fn default_target() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Target {
    /// DuckDB file, relative to the project root.
    pub database: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_schema() -> String {
    "main".to_string()
}

fn default_table() -> String {
    "sales".to_string()
}

impl Target {
    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.table)
    }
}

impl Config {
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE);
        let content =
            std::fs::read_to_string(&config_path).map_err(|e| CliError::ConfigLoadError {
                path: config_path.clone(),
                source: e.into(),
            })?;

        serde_yaml::from_str(&content).map_err(|e| {
            CliError::ConfigLoadError {
                path: config_path,
                source: e.into(),
            }
            .into()
        })
    }

    /// Look up a target by name, falling back to `default_target`.
    pub fn target(&self, name: Option<&str>) -> Result<&Target> {
        let name = name.unwrap_or(self.default_target.as_str());
        self.targets.get(name).ok_or_else(|| {
            let mut available: Vec<String> = self.targets.keys().cloned().collect();
            available.sort();
            CliError::UnknownTarget {
                target: name.to_string(),
                available,
            }
            .into()
        })
    }
}

/// Database file and table a command operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub database: PathBuf,
    pub table: TableRef,
}

/// Work out which database and table to use.
///
/// With a project, the target's database is resolved against the project
/// root and `database_override` replaces it. Without one, `database_override`
/// alone is enough and the table defaults to `main.sales`.
pub fn resolve_target(
    start_dir: &Path,
    target: Option<&str>,
    database_override: Option<&Path>,
) -> Result<ResolvedTarget> {
    match find_project_root(start_dir) {
        Ok(project_dir) => {
            let config = Config::load(&project_dir)?;
            let target = config.target(target)?;
            let database = database_override
                .map(Path::to_path_buf)
                .unwrap_or_else(|| project_dir.join(&target.database));

            Ok(ResolvedTarget {
                database,
                table: target.table_ref(),
            })
        }
        Err(err) => match database_override {
            Some(database) => Ok(ResolvedTarget {
                database: database.to_path_buf(),
                table: TableRef::default(),
            }),
            None => Err(err),
        },
    }
}

/// Find the retail project root by looking for retail.yml
pub fn find_project_root(start_dir: &Path) -> Result<PathBuf> {
    let mut current = start_dir.to_path_buf();

    // Walk up max 5 levels
    for _ in 0..5 {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }

        if let Some(parent) = current.parent() {
            current = parent.to_path_buf();
        } else {
            break;
        }
    }

    Err(CliError::ProjectRootNotFound.into())
}
