//! Command implementations shared by the binary and its tests.

use crate::config::ResolvedTarget;
use crate::errors::CliError;
use crate::render::{self, Format};
use anyhow::{Context, Result};
use retail_core::{ReportKind, RetailError};
use retail_datagen::{SalesConfig, SalesGenerator};
use retail_store::{DuckDbStore, EnrichmentSummary, ReportResult, SalesStore};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Open the target's database, which must already exist.
pub fn open_existing(target: &ResolvedTarget) -> Result<DuckDbStore> {
    if !target.database.exists() {
        return Err(CliError::DatabaseNotFound {
            path: target.database.clone(),
        }
        .into());
    }
    open(target)
}

/// Open the target's database, creating the file if needed.
pub fn open(target: &ResolvedTarget) -> Result<DuckDbStore> {
    DuckDbStore::open(&target.database, target.table.clone())
        .with_context(|| format!("Failed to open DuckDB at {:?}", target.database))
}

pub fn enrich(store: &mut DuckDbStore) -> Result<EnrichmentSummary> {
    store
        .enrich()
        .with_context(|| format!("Enrichment of {} failed", store.table()))
}

/// Parse a report selection: a catalog name or `all`.
pub fn select_reports(selection: &str) -> Result<Vec<ReportKind>, RetailError> {
    if selection.eq_ignore_ascii_case("all") {
        Ok(ReportKind::ALL.to_vec())
    } else {
        Ok(vec![selection.parse()?])
    }
}

pub fn run_reports(store: &DuckDbStore, kinds: &[ReportKind]) -> Result<Vec<ReportResult>> {
    store
        .run_reports(kinds)
        .with_context(|| format!("Reports over {} failed", store.table()))
}

pub fn render_result(result: &ReportResult, format: Format) -> Result<String> {
    render::render(&result.report, format).map_err(|e| {
        CliError::RenderError {
            report: result.report.name().to_string(),
            source: e.into(),
        }
        .into()
    })
}

/// Where a rendered report goes when `--output` is given.
///
/// A single report writes to the path itself. Several reports treat the
/// path as a directory and write one file per report.
pub fn output_path(output: &Path, kind: ReportKind, several: bool, format: Format) -> PathBuf {
    if several {
        let extension = match format {
            Format::Table => "txt",
            Format::Csv => "csv",
        };
        output.join(format!("{}.{}", kind.name(), extension))
    } else {
        output.to_path_buf()
    }
}

pub fn write_output(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    debug!(path = %path.display(), bytes = rendered.len(), "writing report");
    std::fs::write(path, rendered).with_context(|| format!("Failed to write {:?}", path))
}

/// Create the sales table if needed and fill it with synthetic sales.
///
/// With `replace`, existing rows are deleted first.
pub fn generate(store: &mut DuckDbStore, config: SalesConfig, replace: bool) -> Result<usize> {
    store
        .create_table()
        .with_context(|| format!("Failed to create {}", store.table()))?;

    if replace {
        let removed = store.clear()?;
        debug!(rows = removed, "cleared existing sales");
    }

    let sales: Vec<_> = SalesGenerator::new(config).collect();
    store
        .insert_transactions(&sales)
        .with_context(|| format!("Failed to insert into {}", store.table()))
}
