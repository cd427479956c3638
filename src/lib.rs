pub mod feed;
pub mod model;
pub mod policy;
pub mod runtime;
pub mod stores;
pub mod supervisor;

pub use feed::classify::{classify, EventDisposition};
pub use feed::events::{
    DisconnectNotice, DisconnectReason, InboundPost, RawFeedEvent, StateChangeKind,
    StateChangeNotice, WarningNotice,
};
pub use feed::history::{MentionHistory, MentionRecord};
pub use feed::transport::{FeedStream, StreamFilter, StreamItem, StreamTransport, TransportError};
pub use model::{
    AccountId, BlockCandidate, BlockCause, CredentialRef, PolicyFlags, RemoteActor, TrackedAccount,
};
pub use policy::debounce::ReconciliationDebouncer;
pub use policy::decision::{DecisionEngine, PolicyThresholds};
pub use runtime::config::{WardenConfig, WardenConfigBuilder, WardenConfigParams};
pub use runtime::runner::Runner;
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
pub use stores::{AccountStore, ActionQueue, ReconciliationService, UserCache};
pub use supervisor::lifecycle::{Supervisor, SupervisorParams};
pub use supervisor::registry::SessionRegistry;
pub use supervisor::session::{SessionGeneration, SessionState, TerminationReason};
