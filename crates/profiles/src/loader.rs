//! Loading profile documents into a registry.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use switchyard_config::AppConfig;
use switchyard_core::{Error, Result};

use crate::builtin;
use crate::document::ProfileSet;
use crate::registry::ProfileRegistry;

/// Load one document into the registry, all-or-nothing.
pub fn load_document(registry: &ProfileRegistry, path: &Path) -> Result<usize> {
    let set = ProfileSet::from_path(path)?;
    let count = registry.register_all(set)?;
    info!(path = %path.display(), count, "Loaded profile document");
    Ok(count)
}

/// Load every `*.toml` / `*.json` document in `dir`, in file-name order.
///
/// Stops at the first failing document; documents loaded before it stay
/// registered.
pub fn load_dir(registry: &ProfileRegistry, dir: &Path) -> Result<usize> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::validation(
            dir.display().to_string(),
            format!("cannot read profile directory: {e}"),
        )
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_profile_document(p))
        .collect();
    paths.sort();

    let mut total = 0;
    for path in &paths {
        total += load_document(registry, path)?;
    }
    debug!(dir = %dir.display(), documents = paths.len(), total, "Scanned profile directory");
    Ok(total)
}

fn is_profile_document(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("toml") | Some("json")
    )
}

/// Build a registry from configuration: built-in catalog, then the
/// profile directory, then any extra files.
///
/// A configured directory that does not exist is skipped with a warning.
pub fn from_config(config: &AppConfig) -> Result<ProfileRegistry> {
    let registry = ProfileRegistry::new();

    if config.profiles.builtin {
        registry.register_all(builtin::catalog()?)?;
    }

    if let Some(dir) = &config.profiles.dir {
        let dir = Path::new(dir);
        if dir.is_dir() {
            load_dir(&registry, dir)?;
        } else {
            warn!(dir = %dir.display(), "Profile directory not found, skipping");
        }
    }

    for file in &config.profiles.files {
        load_document(&registry, Path::new(file))?;
    }

    info!(profiles = registry.len(), "Profile registry ready");
    Ok(registry)
}
