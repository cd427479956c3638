//! Maps raw feed events to typed dispositions. The rules are ordered: the
//! first matching section of the payload wins.

use crate::feed::events::{DisconnectNotice, RawFeedEvent, StateChangeKind, WarningNotice};
use crate::model::RemoteActor;

/// Typed disposition of one inbound event, in classification priority order.
#[derive(Debug, Clone, PartialEq)]
pub enum EventDisposition {
    /// Empty payload used as a protocol heartbeat.
    Keepalive,
    /// Server announced the stream is ending.
    Disconnect(DisconnectNotice),
    Warning(WarningNotice),
    /// Block-list change echo for the receiving account.
    StateChange {
        kind: StateChangeKind,
        subject: Option<RemoteActor>,
    },
    /// A post addressed to the tracked account, attributed to its author.
    Mention(RemoteActor),
    /// Payload carried no known section, or a post that cannot be attributed
    /// (reshare, or missing author).
    Unrecognized,
}

pub fn classify(event: RawFeedEvent) -> EventDisposition {
    if event.is_empty() {
        return EventDisposition::Keepalive;
    }
    if let Some(disconnect) = event.disconnect {
        return EventDisposition::Disconnect(disconnect);
    }
    if let Some(warning) = event.warning {
        return EventDisposition::Warning(warning);
    }
    if let Some(change) = event.state_change {
        return EventDisposition::StateChange {
            kind: change.kind,
            subject: change.subject,
        };
    }
    if let Some(post) = event.post {
        // A reshare carries another account's text; it must never be
        // attributed to the resharer.
        if post.reshare_of.is_some() {
            return EventDisposition::Unrecognized;
        }
        if let Some(author) = post.author {
            return EventDisposition::Mention(author);
        }
    }
    EventDisposition::Unrecognized
}
