use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use super::loader::load_file;
use super::model::Table;
use super::schema::{DashboardKind, Schema};
use crate::error::DataFormatError;

/// Tables loaded so far in this process. An entry is written once, on the
/// first successful load, and never replaced; there is no file watching,
/// so a changed source is only picked up after a restart.
static TABLES: Lazy<Mutex<HashMap<(PathBuf, DashboardKind), Arc<Table>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load `path` once per process and return the shared table afterwards.
/// Failed loads are not cached.
pub fn load_cached(path: &Path, schema: &Schema) -> Result<Arc<Table>, DataFormatError> {
    let key = (path.to_path_buf(), schema.kind);
    let mut tables = TABLES.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(table) = tables.get(&key) {
        log::debug!("Using cached table for {}", path.display());
        return Ok(Arc::clone(table));
    }

    let table = Arc::new(load_file(path, schema)?);
    tables.insert(key, Arc::clone(&table));
    Ok(table)
}

/// Whether `path` has already been loaded for this dashboard.
pub fn is_cached(path: &Path, kind: DashboardKind) -> bool {
    TABLES
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .contains_key(&(path.to_path_buf(), kind))
}
