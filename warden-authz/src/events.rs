//! Change notifications for configuration listeners

use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Entity class affected by a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A user
    User,
    /// A role
    Role,
    /// A privilege
    Privilege,
    /// A user role mapping
    UserRoleMapping,
    /// An external role mapping
    RoleMapping,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::User => write!(f, "user"),
            EntityKind::Role => write!(f, "role"),
            EntityKind::Privilege => write!(f, "privilege"),
            EntityKind::UserRoleMapping => write!(f, "user role mapping"),
            EntityKind::RoleMapping => write!(f, "role mapping"),
        }
    }
}

/// Kind of change applied to an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// The entity was created
    Created,
    /// The entity was replaced
    Updated,
    /// The entity was removed
    Deleted,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Created => write!(f, "created"),
            ChangeKind::Updated => write!(f, "updated"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// Notification sent to listeners after the configuration changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationEvent {
    /// A mutation was committed and persisted
    ConfigurationChanged {
        /// Entity class
        kind: EntityKind,
        /// Kind of change
        change: ChangeKind,
        /// Identity of the entity, as displayed in logs
        id: String,
    },
    /// The cached configuration was dropped and will be reloaded
    CacheCleared,
}

/// Fire-and-forget broadcast of [`AuthorizationEvent`]s.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped, and slow subscribers see a lag error from their
/// receiver instead of slowing the publisher down.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthorizationEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events
    pub fn subscribe(&self) -> broadcast::Receiver<AuthorizationEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to current subscribers
    pub fn publish(&self, event: AuthorizationEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers = receivers, "Published authorization event"),
            Err(broadcast::error::SendError(event)) => {
                debug!(event = ?event, "No listeners for authorization event")
            }
        }
    }
}
