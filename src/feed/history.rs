//! The historical-query seam used by the catch-up fetcher at session start.

use crate::model::{RemoteActor, TrackedAccount};
use anyhow::Result;
use futures::future::BoxFuture;

/// One historical mention returned by the point-in-time query.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionRecord {
    pub sender: RemoteActor,
    pub text: String,
}

pub trait MentionHistory: Send + Sync {
    /// Returns up to `limit` of the account's most recent mentions,
    /// most-recent-first.
    fn fetch_recent_mentions<'a>(
        &'a self,
        account: &'a TrackedAccount,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<MentionRecord>>>;
}
