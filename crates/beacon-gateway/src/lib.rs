//! Beacon Gateway - platform adapter and process runtime
//!
//! This crate connects the agents from `beacon-core` to the outside world:
//! a Discord session per agent, one small HTTP server per agent, and the
//! startup sequence that brings both roles up in one process.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────── beacon process ────────────────────────┐
//! │                                                                │
//! │  Discord ──ws──▶ DiscordClient ──events──▶ Agent<RelayClient>  │
//! │   (Monitor)                                  (Observer)        │
//! │                                                  │             │
//! │                                    POST /send-notification     │
//! │                                                  ▼             │
//! │  Discord ──ws──▶ DiscordClient ──events──▶ Agent<Notification- │
//! │   (Sender)          ▲                         Sender>          │
//! │                     └────── DM to the recipient ◀──┘ (Notifier)│
//! │                                                                │
//! │  GET /  GET /health on every agent's StatusServer              │
//! └────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod discord;
pub mod error;
pub mod runtime;
pub mod server;

pub use config::{AgentConfig, BeaconConfig, RoleSelection};
pub use discord::DiscordClient;
pub use error::{GatewayError, Result};
pub use runtime::RunningAgent;
pub use server::{ServerState, StatusServer};

/// Gateway version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bind host for the status servers
pub const DEFAULT_HOST: &str = "0.0.0.0";
