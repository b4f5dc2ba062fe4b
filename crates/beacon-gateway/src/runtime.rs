//! Process runtime: builds each agent, its platform session and its server

use beacon_core::agent::DEFAULT_COMMAND_BUFFER;
use beacon_core::{
    Agent, AgentHandle, AgentRole, DeliveryStrategy, NotificationSender, RelayClient,
    ScopeReconciler, ScopeStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::config::{AgentConfig, BeaconConfig, RoleSelection};
use crate::discord::DiscordClient;
use crate::server::StatusServer;
use crate::Result;

/// One agent with its session and server tasks
pub struct RunningAgent {
    pub label: String,
    pub handle: AgentHandle,
    pub addr: SocketAddr,
    session: JoinHandle<()>,
    server: JoinHandle<()>,
}

impl RunningAgent {
    /// Stop the session and server, then wait for the agent loop to drain
    pub async fn shutdown(self) {
        self.session.abort();
        self.server.abort();
        let _ = self.session.await;
        let _ = self.server.await;
        self.handle.join().await;
        tracing::info!("[{}] Stopped", self.label);
    }
}

/// Build and start the Notifier
pub async fn launch_notifier(config: &BeaconConfig) -> Result<RunningAgent> {
    let agent_config = &config.notifier;
    let client = Arc::new(DiscordClient::new(&agent_config.label, &agent_config.token)?);
    let sender = NotificationSender::new(client.clone(), &config.recipient_id, &config.queue);
    tracing::info!(
        "[{}] 🎯 Target User ID: {}",
        agent_config.label,
        config.recipient_id
    );

    launch(config, agent_config, AgentRole::Notifier, client, sender).await
}

/// Build and start the Observer
pub async fn launch_observer(config: &BeaconConfig) -> Result<RunningAgent> {
    let agent_config = &config.observer;
    let client = Arc::new(DiscordClient::new(&agent_config.label, &agent_config.token)?);
    let relay = RelayClient::new(&config.relay_url, config.relay_timeout())?;
    tracing::info!(
        "[{}] 📡 Relaying to {}",
        agent_config.label,
        relay.endpoint()
    );

    launch(config, agent_config, AgentRole::Observer, client, relay).await
}

async fn launch<S: DeliveryStrategy + 'static>(
    config: &BeaconConfig,
    agent_config: &AgentConfig,
    role: AgentRole,
    client: Arc<DiscordClient>,
    strategy: S,
) -> Result<RunningAgent> {
    let label = agent_config.label.clone();
    let store = ScopeStore::for_agent(&config.data_dir, &label);

    let mut agent = Agent::new(role, label.clone(), store, strategy, client.clone())
        .with_reconciler(ScopeReconciler::new(config.settle_delay()));
    match agent.load_scope().await {
        Ok(()) => tracing::info!(
            "[{}] ✅ Loaded {} monitored servers",
            label,
            agent.scope().len()
        ),
        Err(e) => tracing::error!("[{}] ❌ Error loading servers: {}", label, e),
    }

    let handle = agent.spawn(DEFAULT_COMMAND_BUFFER);

    let mut server = StatusServer::new(handle.status());
    if role == AgentRole::Notifier {
        server = server.with_relay(handle.relay_link());
    }
    let (addr, server) = server.bind(config.socket_addr(agent_config)?).await?;

    let session = match client.login(handle.commands()).await {
        Ok(session) => session,
        Err(e) => {
            server.abort();
            handle.join().await;
            return Err(e);
        }
    };

    Ok(RunningAgent {
        label,
        handle,
        addr,
        session,
        server,
    })
}

/// Start the selected roles and run until Ctrl-C.
///
/// The Notifier comes up first so the Observer's relay target exists.
pub async fn run(config: BeaconConfig, roles: RoleSelection) -> Result<()> {
    tracing::info!("🚀 Starting Beacon ({})", roles);
    let mut running = Vec::new();

    if roles.runs_notifier() {
        running.push(launch_notifier(&config).await?);
    }

    if roles.runs_observer() {
        if roles.runs_notifier() {
            tokio::time::sleep(config.startup_stagger()).await;
        }
        match launch_observer(&config).await {
            Ok(agent) => running.push(agent),
            Err(e) => {
                for agent in running {
                    agent.shutdown().await;
                }
                return Err(e);
            }
        }
    }

    tracing::info!("{}", "=".repeat(50));
    tracing::info!("✅ BEACON FULLY OPERATIONAL");
    for agent in &running {
        tracing::info!(
            "📊 {}: {} servers, status on http://{}",
            agent.label,
            agent.handle.status().scope_size(),
            agent.addr
        );
    }
    tracing::info!("{}", "=".repeat(50));

    tokio::signal::ctrl_c().await?;
    tracing::info!("🛑 Shutting down gracefully...");

    for agent in running {
        agent.shutdown().await;
    }
    Ok(())
}
