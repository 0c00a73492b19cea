//! Outbox indicator state shared by front ends.

use serde::Serialize;

/// What a status banner should show for the outbox.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutboxIndicator {
    /// Online with nothing queued
    Hidden,
    Offline { queued: usize },
    /// Online with queued work; `syncing` while a sync is in flight
    ReadyToSync { queued: usize, syncing: bool },
}

impl OutboxIndicator {
    pub const fn new(online: bool, queued: usize, syncing: bool) -> Self {
        match (online, queued) {
            (false, _) => Self::Offline { queued },
            (true, 0) => Self::Hidden,
            (true, _) => Self::ReadyToSync { queued, syncing },
        }
    }

    pub const fn is_visible(self) -> bool {
        !matches!(self, Self::Hidden)
    }

    /// Whether a manual "sync now" action applies.
    pub const fn can_sync(self) -> bool {
        matches!(self, Self::ReadyToSync { syncing: false, .. })
    }

    /// Banner text, empty when hidden.
    pub fn message(self) -> String {
        match self {
            Self::Hidden => String::new(),
            Self::Offline { queued: 0 } => "You are offline. Actions will be queued.".to_string(),
            Self::Offline { queued } => {
                format!("You are offline. {queued} consultation(s) queued for sync.")
            }
            Self::ReadyToSync { queued, .. } => {
                format!("{queued} queued consultation(s) ready to sync.")
            }
        }
    }

    /// Label for the sync action, if one is shown.
    pub const fn action_label(self) -> Option<&'static str> {
        match self {
            Self::ReadyToSync { syncing: true, .. } => Some("Syncing..."),
            Self::ReadyToSync { syncing: false, .. } => Some("Sync now"),
            Self::Hidden | Self::Offline { .. } => None,
        }
    }
}
