//! Typed model of the events a streaming transport delivers. The wire format
//! is the transport's concern; by the time an event reaches the core it is a
//! [`RawFeedEvent`] whose optional sections drive classification.

use crate::model::{AccountId, RemoteActor};
use serde::{Deserialize, Serialize};

/// One parsed event from a live stream. An event with no section set is a
/// protocol keepalive and still counts as connection activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFeedEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disconnect: Option<DisconnectNotice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<WarningNotice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_change: Option<StateChangeNotice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<InboundPost>,
}

impl RawFeedEvent {
    pub fn keepalive() -> Self {
        Self::default()
    }

    pub fn from_post(post: InboundPost) -> Self {
        Self {
            post: Some(post),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.disconnect.is_none()
            && self.warning.is_none()
            && self.state_change.is_none()
            && self.post.is_none()
    }
}

/// Server-initiated notice that the stream is about to end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectNotice {
    pub reason: DisconnectReason,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    ServerShutdown,
    DuplicateStream,
    Stall,
    Normal,
    TokenRevoked,
    AccountDeleted,
    AccountSuspended,
}

impl DisconnectReason {
    /// Reasons that invalidate the stored credentials and warrant a
    /// revalidation call, independent of session removal.
    pub fn revokes_credentials(self) -> bool {
        matches!(
            self,
            Self::TokenRevoked | Self::AccountDeleted | Self::AccountSuspended
        )
    }
}

/// Non-fatal operational warning carried in-band on the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningNotice {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl WarningNotice {
    /// The upstream service emits this for every account following many
    /// users; it is expected and carries no actionable signal.
    pub const FOLLOWS_OVER_LIMIT: &'static str = "FOLLOWS_OVER_LIMIT";

    pub fn is_benign(&self) -> bool {
        self.code == Self::FOLLOWS_OVER_LIMIT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateChangeKind {
    Blocked,
    Unblocked,
}

/// Echo of a block-list change performed on the account, possibly from
/// another client of the same account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateChangeNotice {
    pub kind: StateChangeKind,
    #[serde(default)]
    pub subject: Option<RemoteActor>,
}

/// A textual post delivered on the stream. Only posts with an attributable
/// author that are not reshares qualify as mentions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundPost {
    pub text: String,
    #[serde(default)]
    pub author: Option<RemoteActor>,
    /// Author of the original post when this payload reshares another
    /// account's post.
    #[serde(default)]
    pub reshare_of: Option<AccountId>,
}
