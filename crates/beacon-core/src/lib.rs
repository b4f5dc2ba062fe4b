//! Beacon Core - join-event relay and delivery queue
//!
//! Two cooperating agents share this crate: an **Observer** that watches many
//! communities and relays what it sees, and a **Notifier** that owns the
//! direct-message channel to the recipient and also watches its own
//! communities.
//!
//! # Architecture
//!
//! ```text
//!  platform events ──► Agent loop ──► EventTranslator ──► DeliveryStrategy
//!                        │                                   │
//!                        ▼                        ┌──────────┴──────────┐
//!                   ScopeSet/Store                │                     │
//!                                           RelayClient        NotificationSender
//!                                           (Observer)          (Notifier)
//!                                                │                 │      │
//!                                                └── HTTP ──► RelayLink   ▼
//!                                                                  DeliveryQueue
//! ```
//!
//! Every agent processes its commands on a single task, so scope mutations,
//! relayed records and queue drains never interleave within one agent.

pub mod agent;
pub mod delivery;
pub mod error;
pub mod platform;
pub mod queue;
pub mod relay;
pub mod scope;
pub mod sender;
pub mod translator;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{Agent, AgentCommand, AgentHandle, AgentStatus};
pub use delivery::{DeliveryOutcome, DeliveryStrategy};
pub use error::{BeaconError, Result};
pub use platform::{Community, CommunityDirectory, PlatformEvent};
pub use queue::{DeliveryQueue, DrainReport, Enqueued, OverflowPolicy, QueueSettings};
pub use relay::{RelayClient, RelayLink, RelayResponse, RelayStatus};
pub use scope::{ReconcileOutcome, ScopeReconciler, ScopeSet, ScopeStore};
pub use sender::{Deliver, DirectChannel, Messenger, NotificationSender, Recipient, SenderState};
pub use translator::EventTranslator;
pub use types::{AgentRole, CommunityId, MemberJoined, NotificationRecord};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
