//! Endpoint prober.
//!
//! Modules name their entry points inconsistently (`start`, `start_session`,
//! `run`, ...), so each module is probed against an ordered list of path
//! templates. The list is a priority chain: the first candidate answering
//! with a 2xx status wins and no further candidates are tried.

use tracing::{debug, info};

use trainerbot_types::module::ModuleVersion;

use crate::backend::ModuleBackend;

/// Default candidate templates, highest priority first.
pub const DEFAULT_TEMPLATES: [&str; 5] = [
    "/{name}/{version}/start",
    "/{name}/{version}/start_session",
    "/{name}/{version}/run",
    "/{name}/{version}/init",
    "/{name}/start",
];

/// Ordered-template endpoint prober.
#[derive(Debug, Clone)]
pub struct EndpointProber {
    templates: Vec<String>,
}

impl EndpointProber {
    /// Create a prober with a custom template list.
    ///
    /// Templates may contain `{name}` and `{version}` placeholders.
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Render the candidate list for a module, in priority order.
    ///
    /// Without a version the `{version}` segment collapses away, and
    /// duplicate candidates are dropped (first occurrence kept).
    pub fn candidates(&self, name: &str, version: Option<ModuleVersion>) -> Vec<String> {
        let version = version.map(|v| v.to_string()).unwrap_or_default();
        let mut out: Vec<String> = Vec::with_capacity(self.templates.len());
        for template in &self.templates {
            let candidate = render_template(template, name, &version);
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }

    /// Find the first candidate endpoint for `name`/`version` that answers
    /// a probe with a 2xx status. Returns `None` when every candidate fails.
    pub async fn probe<B: ModuleBackend>(
        &self,
        backend: &B,
        name: &str,
        version: Option<ModuleVersion>,
    ) -> Option<String> {
        let candidates = self.candidates(name, version);
        probe_candidates(backend, &candidates).await
    }
}

impl Default for EndpointProber {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATES.iter().map(|t| t.to_string()).collect())
    }
}

/// Probe an explicit candidate list with first-success short-circuit.
///
/// Network failures and non-2xx statuses are logged and skipped; they never
/// abort the chain.
pub async fn probe_candidates<B: ModuleBackend>(backend: &B, candidates: &[String]) -> Option<String> {
    for candidate in candidates {
        match backend.probe(candidate).await {
            Ok(reply) if reply.is_success() => {
                info!(endpoint = %candidate, status = reply.status, "Probe OK");
                return Some(candidate.clone());
            }
            Ok(reply) => {
                debug!(endpoint = %candidate, status = reply.status, "Probe candidate rejected");
            }
            Err(e) => {
                debug!(endpoint = %candidate, error = %e, "Probe candidate failed");
            }
        }
    }
    None
}

/// Substitute placeholders and collapse empty path segments.
fn render_template(template: &str, name: &str, version: &str) -> String {
    let raw = template.replace("{name}", name).replace("{version}", version);
    let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}
