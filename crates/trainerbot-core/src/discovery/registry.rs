//! Module registry and its builder.
//!
//! The registry is an ordered command table (`/name` -> binding). It is
//! built once per discovery run and then only read; a rebuild produces a new
//! table that replaces the old one wholesale.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use trainerbot_types::config::DuplicatePolicy;
use trainerbot_types::module::{ModuleBinding, ModuleDescriptor, ModuleIdentity};

use crate::backend::ModuleBackend;
use crate::discovery::prober::{EndpointProber, probe_candidates};

/// Ordered command table of resolved module bindings.
///
/// Iteration follows insertion order. A binding that replaces an existing
/// one keeps the existing slot, so listings stay stable.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    bindings: Vec<ModuleBinding>,
    index: HashMap<String, usize>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding, resolving a name clash with `policy`.
    ///
    /// Returns `true` if the binding was stored.
    pub fn insert(&mut self, binding: ModuleBinding, policy: DuplicatePolicy) -> bool {
        let command = binding.command();
        match self.index.get(&command) {
            Some(&slot) => {
                let existing = &self.bindings[slot];
                let replace = match policy {
                    DuplicatePolicy::LastWins => true,
                    // Absent versions rank lowest.
                    DuplicatePolicy::HighestVersion => {
                        binding.identity.version >= existing.identity.version
                    }
                };
                if replace {
                    debug!(
                        command = %command,
                        old = %existing.identity,
                        new = %binding.identity,
                        "Replacing module binding"
                    );
                    self.bindings[slot] = binding;
                } else {
                    debug!(
                        command = %command,
                        kept = %existing.identity,
                        skipped = %binding.identity,
                        "Keeping higher module version"
                    );
                }
                replace
            }
            None => {
                self.index.insert(command, self.bindings.len());
                self.bindings.push(binding);
                true
            }
        }
    }

    /// Look up a binding by its command (e.g. `/arena`).
    pub fn get(&self, command: &str) -> Option<&ModuleBinding> {
        self.index.get(command).map(|&slot| &self.bindings[slot])
    }

    pub fn contains(&self, command: &str) -> bool {
        self.index.contains_key(command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModuleBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Builds a [`ModuleRegistry`] by asking the backend what is attached and
/// probing each module for a working entry point.
pub struct RegistryBuilder<'a, B> {
    backend: &'a B,
    prober: EndpointProber,
    policy: DuplicatePolicy,
}

impl<'a, B: ModuleBackend> RegistryBuilder<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            backend,
            prober: EndpointProber::default(),
            policy: DuplicatePolicy::default(),
        }
    }

    pub fn with_prober(mut self, prober: EndpointProber) -> Self {
        self.prober = prober;
        self
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Discover modules from the backend's attached-module list.
    ///
    /// An unreachable backend or an empty list yields an empty registry.
    /// Modules that cannot be parsed or bound are skipped individually.
    pub async fn build(&self) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();

        let summary = match self.backend.routes_summary().await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(error = %e, "Failed to fetch routes summary");
                return registry;
            }
        };

        if summary.attached.is_empty() {
            info!("Backend reported no attached modules");
            return registry;
        }
        if !summary.errors.is_empty() {
            debug!(errors = ?summary.errors, "Backend reported attach errors");
        }
        info!(count = summary.attached.len(), "Backend reported attached modules");

        for path in &summary.attached {
            let Some(identity) = ModuleIdentity::parse_attached(path) else {
                debug!(path = %path, "Skipping unparseable module path");
                continue;
            };
            match self.bind(identity).await {
                Some(binding) => {
                    registry.insert(binding, self.policy);
                }
                None => warn!(path = %path, "No working entry point found for module"),
            }
        }

        registry
    }

    /// Probe one identity: with its version first, then without.
    pub async fn bind(&self, identity: ModuleIdentity) -> Option<ModuleBinding> {
        if identity.version.is_some() {
            if let Some(endpoint) = self
                .prober
                .probe(self.backend, &identity.name, identity.version)
                .await
            {
                return Some(ModuleBinding::discovered(identity, endpoint));
            }
        }
        let endpoint = self.prober.probe(self.backend, &identity.name, None).await?;
        Some(ModuleBinding::discovered(identity, endpoint))
    }

    /// Bind a static registration list.
    ///
    /// A descriptor with explicit candidate endpoints is probed against that
    /// list only; otherwise it goes through the default templates.
    pub async fn build_from_descriptors(&self, descriptors: &[ModuleDescriptor]) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for descriptor in descriptors {
            let Some(identity) = descriptor.identity() else {
                warn!("Skipping module descriptor with an empty name");
                continue;
            };
            let binding = if descriptor.candidate_endpoints.is_empty() {
                self.bind(identity).await
            } else {
                probe_candidates(self.backend, &descriptor.candidate_endpoints)
                    .await
                    .map(|endpoint| ModuleBinding::discovered(identity, endpoint))
            };
            match binding {
                Some(binding) => {
                    registry.insert(binding, self.policy);
                }
                None => warn!(module = %descriptor.name, "No working entry point for registered module"),
            }
        }
        registry
    }
}
