//! The streaming-transport seam. The concrete client library (wire format,
//! TLS, reconnect plumbing at the socket level) lives behind
//! [`StreamTransport`]; the supervisor only sees parsed events and an
//! HTTP-style terminal status.

use crate::feed::events::RawFeedEvent;
use crate::model::TrackedAccount;
use futures::future::BoxFuture;
use std::fmt;
use std::time::Duration;

/// Options applied when opening a stream.
#[derive(Debug, Clone, Default)]
pub struct StreamFilter {
    /// Restrict delivery to events addressed to the tracked account.
    pub mentions_only: bool,
}

/// Error surfaced when a stream cannot be opened. Carries the HTTP-style
/// status when the upstream rejected the request, so open failures feed the
/// same termination policy as stream ends.
#[derive(Debug)]
pub struct TransportError {
    status: Option<u16>,
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "stream open failed with status {status}: {}", self.message),
            None => write!(f, "stream open failed: {}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// One item delivered by a live stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem {
    Event(RawFeedEvent),
    /// Terminal HTTP-style status. The stream yields nothing afterwards.
    End(u16),
}

/// A live streaming session handle.
pub trait FeedStream: Send {
    /// Awaits the next item. Callers must stop polling after
    /// [`StreamItem::End`].
    fn next_event(&mut self) -> BoxFuture<'_, StreamItem>;

    /// Forwards the configured idle window to transports that can enforce it
    /// at the socket. The supervisor enforces its own watchdog regardless.
    fn set_idle_timeout(&mut self, timeout: Duration);

    /// Tears the underlying connection down immediately.
    fn abort(&mut self);
}

pub trait StreamTransport: Send + Sync {
    fn open<'a>(
        &'a self,
        account: &'a TrackedAccount,
        filter: &'a StreamFilter,
    ) -> BoxFuture<'a, Result<Box<dyn FeedStream>, TransportError>>;
}
