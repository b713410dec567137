//! Authorization gate shared by the upload and delete handlers.

use std::fmt;

use tracing::warn;

use crate::error::MediaError;
use crate::media::{PermissionRegistry, MEDIA_COMPONENT};

/// Mutating actions guarded by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Delete => "delete",
        }
    }

    /// Capability checked against the registry, e.g. `core.create`.
    pub fn capability(&self) -> String {
        format!("core.{}", self.as_str())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ask `registry` whether `actor` may perform `action` on the media component.
///
/// A denial is logged as a 403-class warning and returned as
/// [`MediaError::Unauthorized`]; nothing else happens.
pub fn authorize_action(
    registry: &dyn PermissionRegistry,
    actor: &str,
    action: Action,
) -> Result<(), MediaError> {
    if registry.authorize(actor, &action.capability(), MEDIA_COMPONENT) {
        return Ok(());
    }

    let err = MediaError::Unauthorized {
        action: action.as_str().to_string(),
    };
    warn!(
        error_type = err.kind(),
        status = err.status().as_u16(),
        action = action.as_str(),
        actor = actor,
        "Authorization denied: {}",
        err
    );
    Err(err)
}
