//! Discord adapter
//!
//! [`DiscordClient`] is one logged-in account. It feeds the agent loop with
//! [`beacon_core::PlatformEvent`]s from its gateway session, answers
//! membership snapshots from its cache, and sends direct messages over REST.

pub mod cache;
pub mod gateway;
pub mod rest;

use async_trait::async_trait;
use beacon_core::{AgentCommand, CommunityDirectory, Messenger, Recipient, ScopeSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use cache::CommunityCache;
pub use gateway::{DispatchState, GatewaySession, DEFAULT_INTENTS, GATEWAY_URL};
pub use rest::{RestClient, API_BASE};

use crate::{GatewayError, Result};

pub struct DiscordClient {
    label: String,
    token: String,
    gateway_url: String,
    intents: u64,
    rest: RestClient,
    cache: Arc<CommunityCache>,
}

impl DiscordClient {
    pub fn new(label: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        Ok(Self {
            label: label.into(),
            rest: RestClient::new(token.clone())?,
            token,
            gateway_url: GATEWAY_URL.to_string(),
            intents: DEFAULT_INTENTS,
            cache: Arc::new(CommunityCache::new()),
        })
    }

    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Point REST calls at another API base
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.rest = self.rest.with_base(base);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn cache(&self) -> Arc<CommunityCache> {
        self.cache.clone()
    }

    /// Log in and start the session on its own task.
    ///
    /// Returns after READY, once `SessionReady` has been queued on `events`.
    /// A rejected token surfaces as [`GatewayError::AuthenticationFailed`].
    pub async fn login(&self, events: mpsc::Sender<AgentCommand>) -> Result<JoinHandle<()>> {
        tracing::info!("[{}] 🔐 Logging in...", self.label);
        let session = GatewaySession::connect(
            &self.label,
            &self.gateway_url,
            &self.token,
            self.intents,
            self.cache.clone(),
            &events,
        )
        .await?;
        tracing::info!("[{}] ✅ Logged in successfully!", self.label);

        let label = self.label.clone();
        Ok(tokio::spawn(async move {
            match session.run(events).await {
                Ok(()) => tracing::info!("[{}] Gateway session closed", label),
                Err(GatewayError::AuthenticationFailed(reason)) => {
                    tracing::error!("[{}] ❌ Token rejected: {}", label, reason)
                }
                Err(e) => tracing::error!("[{}] ❌ Gateway session ended: {}", label, e),
            }
        }))
    }
}

#[async_trait]
impl Messenger for DiscordClient {
    async fn resolve_user(&self, user_id: &str) -> beacon_core::Result<Recipient> {
        let user = self.rest.user(user_id).await?;
        Ok(Recipient {
            id: user.id,
            name: user.username,
        })
    }

    async fn send_direct(&self, recipient: &Recipient, content: &str) -> beacon_core::Result<()> {
        let channel = self.rest.open_dm(&recipient.id).await?;
        self.rest.create_message(&channel.id, content).await
    }
}

#[async_trait]
impl CommunityDirectory for DiscordClient {
    async fn live_communities(&self) -> ScopeSet {
        self.cache.snapshot()
    }
}
