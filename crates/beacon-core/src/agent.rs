//! Agent - one role's event loop
//!
//! An [`Agent`] owns its scope, its store and its delivery strategy. All of
//! its inputs (platform events, relayed records, the delayed reconcile) arrive
//! as [`AgentCommand`]s on one channel and are handled strictly one at a time.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::delivery::{DeliveryOutcome, DeliveryStrategy};
use crate::platform::{Community, CommunityDirectory, PlatformEvent};
use crate::relay::RelayLink;
use crate::scope::{ScopeReconciler, ScopeSet, ScopeStore};
use crate::translator::EventTranslator;
use crate::types::{AgentRole, MemberJoined, NotificationRecord};
use crate::{BeaconError, Result};

/// Default capacity of an agent's command channel
pub const DEFAULT_COMMAND_BUFFER: usize = 256;

/// Input to an agent loop
#[derive(Debug)]
pub enum AgentCommand {
    /// Event from the platform client
    Platform(PlatformEvent),

    /// Live membership snapshot taken after the settling delay
    Reconcile(ScopeSet),

    /// Record relayed from a remote Observer
    Relay {
        record: NotificationRecord,
        reply: oneshot::Sender<DeliveryOutcome>,
    },
}

impl From<PlatformEvent> for AgentCommand {
    fn from(event: PlatformEvent) -> Self {
        AgentCommand::Platform(event)
    }
}

/// Read-only snapshot of an agent, published after every command
#[derive(Debug)]
pub struct AgentStatus {
    role: AgentRole,
    label: String,
    ready: AtomicBool,
    pending: AtomicUsize,
    scope_size: AtomicUsize,
    account: RwLock<Option<String>>,
}

impl AgentStatus {
    pub fn new(role: AgentRole, label: impl Into<String>) -> Self {
        Self {
            role,
            label: label.into(),
            ready: AtomicBool::new(false),
            pending: AtomicUsize::new(0),
            scope_size: AtomicUsize::new(0),
            account: RwLock::new(None),
        }
    }

    pub fn role(&self) -> AgentRole {
        self.role
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Records waiting in the pending queue
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Communities currently in scope
    pub fn scope_size(&self) -> usize {
        self.scope_size.load(Ordering::Acquire)
    }

    /// Logged-in account name, once the session is ready
    pub fn account(&self) -> Option<String> {
        self.account.read().clone()
    }

    /// Ready with `pending` records still draining
    fn publish_draining(&self, pending: usize) {
        self.ready.store(true, Ordering::Release);
        self.pending.store(pending, Ordering::Release);
    }
}

pub struct Agent<S> {
    label: String,
    scope: ScopeSet,
    store: ScopeStore,
    reconciler: ScopeReconciler,
    translator: EventTranslator,
    strategy: S,
    directory: Arc<dyn CommunityDirectory>,
    status: Arc<AgentStatus>,
    commands: Option<mpsc::WeakSender<AgentCommand>>,
    session_ready: bool,
}

impl<S: DeliveryStrategy + 'static> Agent<S> {
    pub fn new(
        role: AgentRole,
        label: impl Into<String>,
        store: ScopeStore,
        strategy: S,
        directory: Arc<dyn CommunityDirectory>,
    ) -> Self {
        let label = label.into();
        let agent = Self {
            status: Arc::new(AgentStatus::new(role, label.clone())),
            translator: EventTranslator::new(label.clone()),
            label,
            scope: ScopeSet::new(),
            store,
            reconciler: ScopeReconciler::default(),
            strategy,
            directory,
            commands: None,
            session_ready: false,
        };
        agent.publish();
        agent
    }

    pub fn with_reconciler(mut self, reconciler: ScopeReconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn scope(&self) -> &ScopeSet {
        &self.scope
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn status(&self) -> Arc<AgentStatus> {
        self.status.clone()
    }

    /// Replace the in-memory scope with the persisted one.
    ///
    /// On error the current scope is left untouched.
    pub async fn load_scope(&mut self) -> Result<()> {
        let scope = self.store.load().await?;
        self.scope = scope;
        self.publish();
        Ok(())
    }

    /// Start the loop on its own task
    pub fn spawn(mut self, buffer: usize) -> AgentHandle {
        let (tx, rx) = mpsc::channel(buffer);
        self.commands = Some(tx.downgrade());

        let status = self.status.clone();
        let span = tracing::info_span!("agent", name = %self.label);
        let task = tokio::spawn(self.run(rx).instrument(span));

        AgentHandle {
            commands: tx,
            status,
            task,
        }
    }

    /// Process commands until every sender is gone
    pub async fn run(mut self, mut commands: mpsc::Receiver<AgentCommand>) {
        while let Some(command) = commands.recv().await {
            self.handle(command).await;
        }
        tracing::debug!("Agent loop stopped");
    }

    /// Handle one command to completion
    pub async fn handle(&mut self, command: AgentCommand) {
        match command {
            AgentCommand::Platform(PlatformEvent::SessionReady { account }) => {
                self.on_session_ready(account).await
            }
            AgentCommand::Platform(PlatformEvent::CommunityJoined(community)) => {
                self.on_community_joined(community).await
            }
            AgentCommand::Platform(PlatformEvent::CommunityLeft(community)) => {
                self.on_community_left(community).await
            }
            AgentCommand::Platform(PlatformEvent::MemberJoined(event)) => {
                self.on_member_joined(event).await;
            }
            AgentCommand::Reconcile(live) => {
                self.reconciler
                    .reconcile(&mut self.scope, live, &self.store)
                    .await;
            }
            AgentCommand::Relay { record, reply } => {
                tracing::info!(
                    "📬 Received notification from {}: {}",
                    record.source,
                    record.subject_name
                );
                let outcome = self.strategy.accept_relayed(record).await;
                let _ = reply.send(outcome);
            }
        }
        self.publish();
    }

    async fn on_session_ready(&mut self, account: String) {
        if self.session_ready {
            tracing::debug!("Session ready received again for {}", account);
            return;
        }
        self.session_ready = true;
        tracing::info!("✅ Bot logged in as {}", account);
        *self.status.account.write() = Some(account);

        // backlog goes out before the next command is looked at
        let status = &self.status;
        self.strategy
            .activate(&|pending| status.publish_draining(pending))
            .await;
        self.schedule_reconcile();
    }

    fn schedule_reconcile(&self) {
        let Some(commands) = self.commands.as_ref().and_then(|weak| weak.upgrade()) else {
            return;
        };
        let directory = self.directory.clone();
        let delay = self.reconciler.settle_delay();
        tracing::info!("⏳ Waiting {:?} for cache...", delay);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let live = directory.live_communities().await;
            let _ = commands.send(AgentCommand::Reconcile(live)).await;
        });
    }

    async fn on_community_joined(&mut self, community: Community) {
        tracing::info!("Joined: {}", community.name);
        if self.scope.insert(community.id) {
            self.persist().await;
        }
    }

    async fn on_community_left(&mut self, community: Community) {
        if self.scope.remove(&community.id) {
            self.persist().await;
            tracing::info!("Left: {}", community.name);
        }
    }

    async fn on_member_joined(&mut self, event: MemberJoined) -> Option<DeliveryOutcome> {
        if !self.scope.contains(&event.community.id) {
            return None;
        }

        tracing::info!(
            "🆕 New member detected: {} in {}",
            event.username,
            event.community.name
        );
        let record = self.translator.translate(&event);
        Some(self.strategy.dispatch(record).await)
    }

    async fn persist(&mut self) {
        let (store, scope) = (&self.store, &self.scope);
        if let Err(e) = store.save(scope).await {
            tracing::error!("❌ Error saving monitored servers: {}", e);
        }
    }

    fn publish(&self) {
        self.status.ready.store(
            self.session_ready && self.strategy.is_ready(),
            Ordering::Release,
        );
        self.status
            .pending
            .store(self.strategy.pending(), Ordering::Release);
        self.status
            .scope_size
            .store(self.scope.len(), Ordering::Release);
    }
}

/// Handle to a running agent loop
#[derive(Debug)]
pub struct AgentHandle {
    commands: mpsc::Sender<AgentCommand>,
    status: Arc<AgentStatus>,
    task: JoinHandle<()>,
}

impl AgentHandle {
    pub fn commands(&self) -> mpsc::Sender<AgentCommand> {
        self.commands.clone()
    }

    pub fn relay_link(&self) -> RelayLink {
        RelayLink::new(self.commands.clone())
    }

    pub fn status(&self) -> Arc<AgentStatus> {
        self.status.clone()
    }

    pub async fn send(&self, event: PlatformEvent) -> Result<()> {
        self.commands
            .send(event.into())
            .await
            .map_err(|_| BeaconError::AgentUnavailable(self.status.label().to_string()))
    }

    /// Drop this handle's sender and wait for the loop to finish
    pub async fn join(self) {
        let AgentHandle { commands, task, .. } = self;
        drop(commands);
        let _ = task.await;
    }
}
