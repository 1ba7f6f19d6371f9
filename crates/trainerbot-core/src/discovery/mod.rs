//! Module discovery: probing, the command registry, and the fallback chain
//! that decides where the module list comes from.

pub mod catalog;
pub mod contract;
pub mod prober;
pub mod registry;

use std::fmt;

use tracing::{info, warn};

use trainerbot_types::config::DiscoverySettings;

use crate::backend::ModuleBackend;
use crate::discovery::catalog::{ModuleCatalog, bindings_from_installed};
use crate::discovery::prober::EndpointProber;
use crate::discovery::registry::{ModuleRegistry, RegistryBuilder};

/// Which strategy produced the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoverySource {
    Backend,
    Descriptors,
    Catalog,
    /// Every strategy came back empty.
    Empty,
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySource::Backend => write!(f, "backend"),
            DiscoverySource::Descriptors => write!(f, "descriptors"),
            DiscoverySource::Catalog => write!(f, "catalog"),
            DiscoverySource::Empty => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Discovery {
    pub registry: ModuleRegistry,
    pub source: DiscoverySource,
}

/// Run the discovery chain: backend summary, then static descriptors, then
/// the local catalog. The first non-empty registry wins.
///
/// Never fails; an empty registry is a valid outcome.
pub async fn discover_modules<B, C>(
    backend: &B,
    catalog: &C,
    prober: EndpointProber,
    settings: &DiscoverySettings,
) -> Discovery
where
    B: ModuleBackend,
    C: ModuleCatalog,
{
    let builder = RegistryBuilder::new(backend)
        .with_prober(prober)
        .with_policy(settings.duplicate_policy);

    let registry = builder.build().await;
    if !registry.is_empty() {
        return found(registry, DiscoverySource::Backend);
    }

    if !settings.modules.is_empty() {
        let registry = builder.build_from_descriptors(&settings.modules).await;
        if !registry.is_empty() {
            return found(registry, DiscoverySource::Descriptors);
        }
    }

    info!("Falling back to local module catalog");
    match catalog.installed_modules().await {
        Ok(modules) => {
            let registry = bindings_from_installed(modules, settings.duplicate_policy);
            if !registry.is_empty() {
                return found(registry, DiscoverySource::Catalog);
            }
        }
        Err(e) => warn!(error = %e, "Failed to enumerate local modules"),
    }

    warn!("No modules discovered; only built-in commands are available");
    Discovery {
        registry: ModuleRegistry::new(),
        source: DiscoverySource::Empty,
    }
}

fn found(registry: ModuleRegistry, source: DiscoverySource) -> Discovery {
    info!(
        count = registry.len(),
        source = %source,
        commands = ?registry.iter().map(|b| b.command()).collect::<Vec<_>>(),
        "Discovered module commands"
    );
    Discovery { registry, source }
}
