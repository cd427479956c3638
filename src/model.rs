//! Core data model shared across the supervisor, classifier, and policy
//! engine. All of these types are snapshots: the authoritative copies live in
//! the external account store and action queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of an account on the upstream platform, used both for
/// tracked accounts and for the senders of inbound events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque reference to credentials held by the external credential store.
/// The core never sees secrets; it only forwards this reference to the
/// transport and query collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialRef(String);

impl CredentialRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The two independently toggleable auto-block policies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFlags {
    pub block_new_accounts: bool,
    pub block_low_followers: bool,
}

impl PolicyFlags {
    pub fn any_enabled(&self) -> bool {
        self.block_new_accounts || self.block_low_followers
    }
}

/// Read-only snapshot of one tracked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccount {
    pub id: AccountId,
    pub credentials: CredentialRef,
    pub flags: PolicyFlags,
    pub deactivated: bool,
}

/// Transient representation of the sender of a mention or the subject of a
/// block/unblock echo. Not persisted by the core; optionally forwarded to the
/// external user cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteActor {
    pub id: AccountId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub followers: u64,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Which policy threshold produced a block decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCause {
    NewAccount,
    LowFollowers,
}

/// A pending block decision handed to the external action queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCandidate {
    pub recipient: AccountId,
    pub target: AccountId,
    pub cause: BlockCause,
}
