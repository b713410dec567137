//! Before/after notifications around every mutation.
//!
//! Listeners are registered on an [`EventDispatcher`] and called synchronously
//! in registration order. Before-hooks return a [`ListenerOutcome`]; the first
//! listener that declines to proceed stops the chain and vetoes the action.
//! Errors reported by every listener called so far are collected into the
//! resulting [`Veto`].

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::MediaError;

// =============================================================================
// Event Types
// =============================================================================

/// What kind of entry an event concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventContext {
    File,
    Folder,
}

impl EventContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventContext::File => "media.file",
            EventContext::Folder => "media.folder",
        }
    }
}

impl fmt::Display for EventContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entry being saved or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEvent {
    /// Actor performing the action
    pub actor: String,

    /// Absolute path of the entry
    pub path: PathBuf,

    /// Path relative to the base directory, with a leading `/`
    pub relative_path: String,

    /// Size in bytes, known for uploads
    pub size: Option<u64>,
}

impl MediaEvent {
    /// Final path component, used by name-based listeners.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Answer from a before-hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerOutcome {
    /// False vetoes the action
    pub proceed: bool,

    /// Reasons shown to the actor when the action is vetoed
    pub errors: Vec<String>,
}

impl ListenerOutcome {
    /// Let the action continue.
    pub fn proceed() -> Self {
        Self {
            proceed: true,
            errors: Vec::new(),
        }
    }

    /// Block the action with a reason.
    pub fn veto(reason: impl Into<String>) -> Self {
        Self {
            proceed: false,
            errors: vec![reason.into()],
        }
    }
}

/// A vetoed action, with the errors collected along the listener chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Veto {
    /// Listener that declined to proceed
    pub listener: String,

    pub errors: Vec<String>,
}

impl From<Veto> for MediaError {
    fn from(veto: Veto) -> Self {
        MediaError::CollaboratorVeto {
            errors: veto.errors,
        }
    }
}

// =============================================================================
// EventListener Trait
// =============================================================================

/// Hooks fired around uploads and deletions.
///
/// Every hook has a default that does nothing and lets the action proceed, so
/// listeners only implement what they care about.
pub trait EventListener: Send + Sync {
    /// Name used in logs and veto reports.
    fn name(&self) -> &str;

    fn before_save(&self, _context: EventContext, _event: &MediaEvent) -> ListenerOutcome {
        ListenerOutcome::proceed()
    }

    fn after_save(&self, _context: EventContext, _event: &MediaEvent) {}

    fn before_delete(&self, _context: EventContext, _event: &MediaEvent) -> ListenerOutcome {
        ListenerOutcome::proceed()
    }

    fn after_delete(&self, _context: EventContext, _event: &MediaEvent) {}
}

// =============================================================================
// EventDispatcher
// =============================================================================

/// Ordered list of listeners.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no listeners (every action proceeds).
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Append a listener; it runs after every listener registered before it.
    pub fn with_listener(mut self, listener: impl EventListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Names of the registered listeners, in call order.
    pub fn listener_names(&self) -> Vec<String> {
        self.listeners.iter().map(|l| l.name().to_string()).collect()
    }

    pub fn before_save(&self, context: EventContext, event: &MediaEvent) -> Result<(), Veto> {
        self.run_before(|listener| listener.before_save(context, event))
    }

    pub fn after_save(&self, context: EventContext, event: &MediaEvent) {
        for listener in &self.listeners {
            listener.after_save(context, event);
        }
    }

    pub fn before_delete(&self, context: EventContext, event: &MediaEvent) -> Result<(), Veto> {
        self.run_before(|listener| listener.before_delete(context, event))
    }

    pub fn after_delete(&self, context: EventContext, event: &MediaEvent) {
        for listener in &self.listeners {
            listener.after_delete(context, event);
        }
    }

    fn run_before<F>(&self, mut hook: F) -> Result<(), Veto>
    where
        F: FnMut(&dyn EventListener) -> ListenerOutcome,
    {
        let mut errors = Vec::new();

        for listener in &self.listeners {
            let outcome = hook(listener.as_ref());
            errors.extend(outcome.errors);

            if !outcome.proceed {
                debug!(listener = listener.name(), "listener vetoed action");
                return Err(Veto {
                    listener: listener.name().to_string(),
                    errors,
                });
            }
        }

        Ok(())
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_names())
            .finish()
    }
}

// =============================================================================
// Built-in Listeners
// =============================================================================

/// Logs every completed save and delete.
#[derive(Debug, Clone, Default)]
pub struct AuditListener;

impl EventListener for AuditListener {
    fn name(&self) -> &str {
        "audit"
    }

    fn after_save(&self, context: EventContext, event: &MediaEvent) {
        info!(
            context = %context,
            actor = %event.actor,
            path = %event.relative_path,
            size = event.size.unwrap_or(0),
            "media saved"
        );
    }

    fn after_delete(&self, context: EventContext, event: &MediaEvent) {
        info!(
            context = %context,
            actor = %event.actor,
            path = %event.relative_path,
            "media deleted"
        );
    }
}

/// Refuses to create or remove entries with reserved names.
///
/// Names are compared case-insensitively against the final path component.
#[derive(Debug, Clone, Default)]
pub struct ProtectedNames {
    names: HashSet<String>,
}

impl ProtectedNames {
    pub fn new<I, T>(names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim().to_lowercase())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    fn check(&self, event: &MediaEvent, verb: &str) -> ListenerOutcome {
        let name = event.file_name();
        if self.names.contains(&name.to_lowercase()) {
            ListenerOutcome::veto(format!("\"{}\" is protected and cannot be {}", name, verb))
        } else {
            ListenerOutcome::proceed()
        }
    }
}

impl EventListener for ProtectedNames {
    fn name(&self) -> &str {
        "protected-names"
    }

    fn before_save(&self, _context: EventContext, event: &MediaEvent) -> ListenerOutcome {
        self.check(event, "overwritten")
    }

    fn before_delete(&self, _context: EventContext, event: &MediaEvent) -> ListenerOutcome {
        self.check(event, "deleted")
    }
}

// =============================================================================
// Tests
// =============================================================================
