//! Inbound feed concerns: the typed event model delivered by streaming
//! transports, the transport and historical-query seams, and the classifier
//! that maps raw events to dispositions.

pub mod classify;
pub mod events;
pub mod history;
pub mod transport;

pub use classify::{classify, EventDisposition};
pub use events::{
    DisconnectNotice, DisconnectReason, InboundPost, RawFeedEvent, StateChangeKind,
    StateChangeNotice, WarningNotice,
};
pub use history::{MentionHistory, MentionRecord};
pub use transport::{FeedStream, StreamFilter, StreamItem, StreamTransport, TransportError};
