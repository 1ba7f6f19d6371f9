//! Module identity, version, and binding types.
//!
//! A *module* is an independently deployed training service exposed by the
//! backend under a versioned path prefix (e.g. `/arena/v4/...`). Discovery
//! turns the backend's attached-module list into [`ModuleIdentity`] values,
//! and probing turns each identity into a [`ModuleBinding`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Trailing endpoint segments that name an entry point rather than a module
/// prefix. Stripped when deriving a binding's base path.
const ENTRY_SEGMENTS: [&str; 4] = ["start", "start_session", "run", "init"];

/// Numeric module version, written `v<digits>` on the wire (e.g. `v4`).
///
/// Ordered numerically, so `v10 > v9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleVersion(pub u32);

impl ModuleVersion {
    /// Parse a leading `v<digits>` prefix, ignoring anything after the digits.
    ///
    /// `v4` and `v4_beta` both yield `4`; `version4` and `v` yield `None`.
    /// Used for directory names, where suffixes are tolerated.
    pub fn parse_prefix(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('v')?;
        let end = digits
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(digits.len());
        if end == 0 {
            return None;
        }
        digits[..end].parse().ok().map(ModuleVersion)
    }
}

impl fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for ModuleVersion {
    type Err = String;

    /// Strict parse: the whole string must be `v<digits>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s
            .strip_prefix('v')
            .ok_or_else(|| format!("invalid module version: '{s}'"))?;
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("invalid module version: '{s}'"));
        }
        digits
            .parse()
            .map(ModuleVersion)
            .map_err(|_| format!("module version out of range: '{s}'"))
    }
}

impl TryFrom<String> for ModuleVersion {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModuleVersion> for String {
    fn from(value: ModuleVersion) -> Self {
        value.to_string()
    }
}

/// The (name, version) pair naming one attached module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleIdentity {
    /// Module name; never empty.
    pub name: String,
    /// Version segment, absent for unversioned modules.
    pub version: Option<ModuleVersion>,
}

impl ModuleIdentity {
    /// Build an identity, rejecting an empty name.
    pub fn new(name: impl Into<String>, version: Option<ModuleVersion>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() {
            return None;
        }
        Some(Self { name, version })
    }

    /// Parse a dotted import-like path such as `modules.arena.v4.routes`.
    ///
    /// Requires at least three segments, the first being `modules` and the
    /// second (the name) non-empty. The version is the first of segments
    /// 2..5 that is exactly `v<digits>`; if none is, the version is absent.
    /// Malformed paths yield `None`.
    pub fn parse_attached(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('.').collect();
        if parts.len() < 3 || parts[0] != "modules" {
            return None;
        }

        let version = parts
            .iter()
            .skip(2)
            .take(3)
            .find_map(|p| p.parse::<ModuleVersion>().ok());

        Self::new(parts[1], version)
    }

    /// The chat command that invokes this module: `/` + name.
    pub fn command(&self) -> String {
        format!("/{}", self.name)
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}/{}", self.name, v),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A resolved association between a module and a working endpoint.
///
/// Created once discovery finds an endpoint that answers; immutable for the
/// lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleBinding {
    pub identity: ModuleIdentity,
    /// Absolute URL path on the backend (e.g. `/arena/v4/start`).
    pub endpoint: String,
    /// Human-readable label shown in module listings.
    pub description: String,
}

impl ModuleBinding {
    /// Binding produced by probing a backend-reported module.
    pub fn discovered(identity: ModuleIdentity, endpoint: impl Into<String>) -> Self {
        let description = match identity.version {
            Some(v) => format!("{} ({v})", identity.name),
            None => format!("{} (no-version)", identity.name),
        };
        Self {
            identity,
            endpoint: endpoint.into(),
            description,
        }
    }

    /// Registry key for this binding.
    pub fn command(&self) -> String {
        self.identity.command()
    }

    /// Module path prefix: the endpoint with a trailing entry segment removed.
    ///
    /// `/arena/v4/start` becomes `/arena/v4`; endpoints without a known entry
    /// segment are returned unchanged.
    pub fn base_path(&self) -> &str {
        match self.endpoint.rsplit_once('/') {
            Some((base, last)) if ENTRY_SEGMENTS.contains(&last) && !base.is_empty() => base,
            _ => &self.endpoint,
        }
    }
}

/// Static registration entry for a module known at startup.
///
/// Lets a deployment list its modules explicitly instead of relying on the
/// backend's route summary. Each descriptor is probed like a discovered
/// module; `candidate_endpoints`, when non-empty, replaces the default
/// template list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub name: String,
    #[serde(default)]
    pub version: Option<ModuleVersion>,
    #[serde(default)]
    pub candidate_endpoints: Vec<String>,
    /// Free-form capability tags (e.g. "dialog", "exam"); informational only.
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl ModuleDescriptor {
    /// Identity for this descriptor, or `None` for an empty name.
    pub fn identity(&self) -> Option<ModuleIdentity> {
        ModuleIdentity::new(self.name.clone(), self.version)
    }
}
