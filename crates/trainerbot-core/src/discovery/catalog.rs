//! Local module catalog, the last-resort discovery strategy.
//!
//! When the backend cannot say what is attached, the installed module tree
//! is enumerated instead and each module is bound without probing.

use std::future::Future;

use trainerbot_types::config::DuplicatePolicy;
use trainerbot_types::module::{ModuleBinding, ModuleIdentity, ModuleVersion};

use crate::discovery::registry::ModuleRegistry;

/// A version directory: its numeric prefix and its name on disk
/// (`v4_beta` has number 4 and keeps `v4_beta` as its path segment).
///
/// Ordered by number, then by directory name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct InstalledVersion {
    pub number: ModuleVersion,
    pub dir: String,
}

impl InstalledVersion {
    /// Parse a `v<digits>...` directory name.
    pub fn from_dir(dir: &str) -> Option<Self> {
        ModuleVersion::parse_prefix(dir).map(|number| Self {
            number,
            dir: dir.to_string(),
        })
    }
}

/// One installed module and the versions found for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledModule {
    pub name: String,
    pub versions: Vec<InstalledVersion>,
}

impl InstalledModule {
    pub fn latest(&self) -> Option<&InstalledVersion> {
        self.versions.iter().max()
    }

    /// Binding for the highest installed version, assuming the conventional
    /// `start` entry point under the version directory.
    pub fn binding(&self) -> Option<ModuleBinding> {
        let latest = self.latest();
        let identity = ModuleIdentity::new(self.name.clone(), latest.map(|v| v.number))?;
        let (endpoint, description) = match latest {
            Some(v) => (
                format!("/{}/{}/start", identity.name, v.dir),
                format!("{} ({})", identity.name, v.dir),
            ),
            None => (
                format!("/{}/start", identity.name),
                format!("{} (no version)", identity.name),
            ),
        };
        Some(ModuleBinding {
            identity,
            endpoint,
            description,
        })
    }
}

/// Enumerates installed modules.
pub trait ModuleCatalog: Send + Sync {
    fn installed_modules(
        &self,
    ) -> impl Future<Output = Result<Vec<InstalledModule>, std::io::Error>> + Send;
}

/// Build a registry from an installed-module listing, visiting modules in
/// name order.
pub fn bindings_from_installed(
    mut modules: Vec<InstalledModule>,
    policy: DuplicatePolicy,
) -> ModuleRegistry {
    modules.sort_by(|a, b| a.name.cmp(&b.name));
    let mut registry = ModuleRegistry::new();
    for binding in modules.iter().filter_map(InstalledModule::binding) {
        registry.insert(binding, policy);
    }
    registry
}
