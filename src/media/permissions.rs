//! Permission registry consulted by the authorization gate.

use std::collections::{HashMap, HashSet};

/// Component name media capabilities are scoped to.
pub const MEDIA_COMPONENT: &str = "media";

/// Capability that implies every other capability on a component.
pub const ADMIN_CAPABILITY: &str = "core.admin";

/// Actor name matching every actor in a grant table.
pub const ANY_ACTOR: &str = "*";

/// Answers whether an actor holds a capability on a component.
pub trait PermissionRegistry: Send + Sync {
    /// True if `actor` may exercise `capability` (e.g. `core.create`) on
    /// `component`.
    fn authorize(&self, actor: &str, capability: &str, component: &str) -> bool;
}

/// Static grants loaded from configuration.
///
/// Grant specs look like `alice=core.create,core.delete`. A capability without
/// a dot is read as `core.<name>`, so `bob=create` grants `core.create`. The
/// actor `*` applies to everyone.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    component: String,
    grants: HashMap<String, HashSet<String>>,
}

impl GrantTable {
    /// Create an empty table for `component` (denies everything).
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            grants: HashMap::new(),
        }
    }

    /// Parse grant specs for `component`.
    pub fn from_specs<I, T>(component: impl Into<String>, specs: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut table = Self::new(component);
        for spec in specs {
            let spec = spec.as_ref().trim();
            if spec.is_empty() {
                continue;
            }
            let (actor, capabilities) = spec
                .split_once('=')
                .ok_or_else(|| format!("Invalid grant '{}': expected actor=capability,...", spec))?;
            let actor = actor.trim();
            if actor.is_empty() {
                return Err(format!("Invalid grant '{}': actor is empty", spec));
            }
            for capability in capabilities.split(',').map(str::trim) {
                if capability.is_empty() {
                    continue;
                }
                table = table.grant(actor, capability);
            }
        }
        Ok(table)
    }

    /// Grant `capability` to `actor`.
    pub fn grant(mut self, actor: impl Into<String>, capability: &str) -> Self {
        self.grants
            .entry(actor.into())
            .or_default()
            .insert(normalize_capability(capability));
        self
    }

    /// Number of actors with at least one grant.
    pub fn actor_count(&self) -> usize {
        self.grants.len()
    }

    fn holds(&self, actor: &str, capability: &str) -> bool {
        self.grants
            .get(actor)
            .map(|caps| caps.contains(capability) || caps.contains(ADMIN_CAPABILITY))
            .unwrap_or(false)
    }
}

impl PermissionRegistry for GrantTable {
    fn authorize(&self, actor: &str, capability: &str, component: &str) -> bool {
        if component != self.component {
            return false;
        }
        let capability = normalize_capability(capability);
        self.holds(actor, &capability) || self.holds(ANY_ACTOR, &capability)
    }
}

fn normalize_capability(capability: &str) -> String {
    let capability = capability.trim().to_lowercase();
    if capability.contains('.') {
        capability
    } else {
        format!("core.{}", capability)
    }
}
