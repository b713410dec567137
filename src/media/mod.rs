//! Collaborators the media controller depends on.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        MediaController                          │
//! └──────┬──────────────┬──────────────────┬───────────────┬────────┘
//!        │              │                  │               │
//!        ▼              ▼                  ▼               ▼
//! ┌────────────┐ ┌──────────────────┐ ┌──────────────┐ ┌──────────────┐
//! │ MediaStore │ │PermissionRegistry│ │EventDispatch │ │ UploadFilter │
//! │ (disk I/O) │ │   (grants)       │ │ (listeners)  │ │ (allow-list) │
//! └────────────┘ └──────────────────┘ └──────────────┘ └──────────────┘
//! ```
//!
//! Each collaborator is a trait with one shipped implementation, injected into
//! the controller at construction time.

pub mod events;
pub mod filter;
pub mod permissions;
pub mod store;

pub use events::{
    AuditListener, EventContext, EventDispatcher, EventListener, ListenerOutcome, MediaEvent,
    ProtectedNames, Veto,
};
pub use filter::{
    AllowAll, ExtensionPolicy, UploadCandidate, UploadFilter, DEFAULT_ALLOWED_EXTENSIONS,
    EXECUTABLE_EXTENSIONS,
};
pub use permissions::{GrantTable, PermissionRegistry, ADMIN_CAPABILITY, ANY_ACTOR, MEDIA_COMPONENT};
pub use store::{LocalMediaStore, MediaStore};
