//! Filesystem module catalog.
//!
//! Enumerates an installed module tree laid out as
//! `modules/<name>/v<N>[suffix]/...`. Used only when the backend cannot
//! report its attached modules.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use trainerbot_core::discovery::catalog::{InstalledModule, InstalledVersion, ModuleCatalog};

/// Module directory candidates searched when none is configured.
const DEFAULT_ROOTS: [&str; 3] = ["modules", "../modules", "../../modules"];

/// Directory names that are never modules.
const IGNORED_DIRS: [&str; 2] = ["__pycache__", "tests"];

pub struct FsModuleCatalog {
    roots: Vec<PathBuf>,
}

impl FsModuleCatalog {
    /// Catalog over `modules_dir`, or over the conventional locations
    /// relative to the working directory when `None`.
    pub fn new(modules_dir: Option<PathBuf>) -> Self {
        let roots = match modules_dir {
            Some(dir) => vec![dir],
            None => DEFAULT_ROOTS.iter().map(PathBuf::from).collect(),
        };
        Self { roots }
    }

    /// First candidate root that exists as a directory.
    pub async fn locate(&self) -> Option<PathBuf> {
        for root in &self.roots {
            if is_dir(root).await {
                return Some(root.clone());
            }
        }
        None
    }
}

impl ModuleCatalog for FsModuleCatalog {
    async fn installed_modules(&self) -> Result<Vec<InstalledModule>, io::Error> {
        let Some(root) = self.locate().await else {
            info!(candidates = ?self.roots, "No local modules directory found");
            return Ok(Vec::new());
        };
        info!(path = %root.display(), "Scanning local modules directory");

        let mut modules = Vec::new();
        let mut entries = tokio::fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if name.starts_with('.') || IGNORED_DIRS.contains(&name.as_str()) {
                continue;
            }
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let versions = scan_versions(&entry.path()).await?;
            debug!(module = %name, versions = ?versions, "Found local module");
            modules.push(InstalledModule { name, versions });
        }

        modules.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(modules)
    }
}

/// The `v<digits>...` subdirectories of `module_dir`, by version.
async fn scan_versions(module_dir: &Path) -> Result<Vec<InstalledVersion>, io::Error> {
    let mut versions = Vec::new();
    let mut entries = tokio::fs::read_dir(module_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let Some(version) = entry
            .file_name()
            .to_str()
            .and_then(InstalledVersion::from_dir)
        else {
            continue;
        };
        if entry.file_type().await?.is_dir() {
            versions.push(version);
        }
    }
    versions.sort();
    Ok(versions)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
