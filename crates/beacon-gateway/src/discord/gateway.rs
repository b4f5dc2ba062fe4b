//! Discord gateway session
//!
//! Handshake: Hello → Identify → READY. After that the session heartbeats on
//! the interval from Hello and turns dispatches into [`PlatformEvent`]s.
//! Translation of dispatch payloads lives in [`DispatchState`] so it can be
//! tested without a socket.

use beacon_core::{AgentCommand, Community, CommunityId, MemberJoined, PlatformEvent};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::cache::CommunityCache;
use crate::{GatewayError, Result};

/// Default gateway endpoint
pub const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_MEMBERS
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 1);

/// Close code for a rejected token
pub const CLOSE_AUTHENTICATION_FAILED: u16 = 4004;

pub mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One gateway frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

impl GatewayPayload {
    fn new(op: u8, d: Value) -> Self {
        Self {
            op,
            d,
            s: None,
            t: None,
        }
    }

    /// IDENTIFY takes the bare token, without the `Bot ` scheme REST uses
    fn identify(token: &str, intents: u64) -> Self {
        let token = token.trim();
        let token = token.strip_prefix("Bot ").unwrap_or(token);
        Self::new(
            opcode::IDENTIFY,
            serde_json::json!({
                "token": token,
                "intents": intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "beacon",
                    "device": "beacon",
                },
            }),
        )
    }

    fn heartbeat(sequence: Option<u64>) -> Self {
        Self::new(opcode::HEARTBEAT, serde_json::json!(sequence))
    }

    fn to_message(&self) -> Result<Message> {
        Ok(Message::Text(serde_json::to_string(self)?))
    }
}

#[derive(Deserialize)]
struct ReadyData {
    user: ReadyUser,
    #[serde(default)]
    guilds: Vec<GuildData>,
}

#[derive(Deserialize)]
struct ReadyUser {
    username: String,
}

#[derive(Deserialize)]
struct GuildData {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    unavailable: bool,
}

#[derive(Deserialize)]
struct MemberAddData {
    guild_id: String,
    user: MemberUser,
}

#[derive(Deserialize)]
struct MemberUser {
    id: String,
    username: String,
}

/// Dispatch translation and cache upkeep for one session
pub struct DispatchState {
    cache: Arc<CommunityCache>,
    /// Communities announced in READY whose GUILD_CREATE has not arrived yet
    expected: HashSet<CommunityId>,
}

impl DispatchState {
    pub fn new(cache: Arc<CommunityCache>) -> Self {
        Self {
            cache,
            expected: HashSet::new(),
        }
    }

    /// Apply one dispatch and return the events it produces
    pub fn apply(&mut self, event_type: &str, data: Value) -> Result<Vec<PlatformEvent>> {
        let events = match event_type {
            "READY" => {
                let ready: ReadyData = serde_json::from_value(data)?;
                for guild in ready.guilds {
                    let id = CommunityId::from(guild.id);
                    match guild.name {
                        Some(name) if !guild.unavailable => {
                            self.cache.insert(&Community { id, name });
                        }
                        _ => {
                            self.expected.insert(id);
                        }
                    }
                }
                vec![PlatformEvent::SessionReady {
                    account: ready.user.username,
                }]
            }
            "GUILD_CREATE" => {
                let guild: GuildData = serde_json::from_value(data)?;
                let community = Community {
                    id: CommunityId::from(guild.id.clone()),
                    name: guild.name.unwrap_or(guild.id),
                };
                let was_expected = self.expected.remove(&community.id);
                let is_new = self.cache.insert(&community);
                if is_new && !was_expected {
                    vec![PlatformEvent::CommunityJoined(community)]
                } else {
                    Vec::new()
                }
            }
            "GUILD_DELETE" => {
                let guild: GuildData = serde_json::from_value(data)?;
                let id = CommunityId::from(guild.id);
                if guild.unavailable {
                    tracing::debug!("Community {} unavailable (outage)", id);
                    Vec::new()
                } else {
                    self.expected.remove(&id);
                    let community = self.cache.remove(&id).unwrap_or(Community {
                        name: id.to_string(),
                        id,
                    });
                    vec![PlatformEvent::CommunityLeft(community)]
                }
            }
            "GUILD_MEMBER_ADD" => {
                let member: MemberAddData = serde_json::from_value(data)?;
                let community = self.cache.resolve(&CommunityId::from(member.guild_id));
                vec![PlatformEvent::MemberJoined(MemberJoined {
                    user_id: member.user.id,
                    username: member.user.username,
                    community,
                })]
            }
            _ => Vec::new(),
        };
        Ok(events)
    }
}

/// A connected, identified session waiting to be run
pub struct GatewaySession {
    label: String,
    socket: Socket,
    heartbeat_interval: Duration,
    sequence: Option<u64>,
    state: DispatchState,
}

impl GatewaySession {
    /// Connect and identify, returning once READY arrives.
    ///
    /// `events` receives `SessionReady` before this returns.
    pub async fn connect(
        label: &str,
        url: &str,
        token: &str,
        intents: u64,
        cache: Arc<CommunityCache>,
        events: &mpsc::Sender<AgentCommand>,
    ) -> Result<Self> {
        let (mut socket, _) = tokio_tungstenite::connect_async(url).await?;

        let hello = next_payload(&mut socket).await?;
        if hello.op != opcode::HELLO {
            return Err(GatewayError::Platform(format!(
                "expected Hello, got op {}",
                hello.op
            )));
        }
        let interval_ms = hello.d["heartbeat_interval"]
            .as_u64()
            .ok_or_else(|| GatewayError::Platform("Hello without heartbeat_interval".to_string()))?;

        socket
            .send(GatewayPayload::identify(token, intents).to_message()?)
            .await?;

        let mut session = Self {
            label: label.to_string(),
            socket,
            heartbeat_interval: Duration::from_millis(interval_ms.max(1)),
            sequence: None,
            state: DispatchState::new(cache),
        };

        loop {
            let payload = next_payload(&mut session.socket).await?;
            match payload.op {
                opcode::DISPATCH => {
                    if payload.s.is_some() {
                        session.sequence = payload.s;
                    }
                    let is_ready = payload.t.as_deref() == Some("READY");
                    session.forward(payload, events).await?;
                    if is_ready {
                        return Ok(session);
                    }
                }
                opcode::INVALID_SESSION => {
                    return Err(GatewayError::AuthenticationFailed(
                        "session rejected during identify".to_string(),
                    ));
                }
                opcode::HEARTBEAT => {
                    let beat = GatewayPayload::heartbeat(session.sequence).to_message()?;
                    session.socket.send(beat).await?;
                }
                _ => {}
            }
        }
    }

    /// Heartbeat and forward dispatches until the connection ends.
    ///
    /// Events reach the agent through a forwarding task, so reading the socket
    /// and heartbeating never wait on a busy agent loop.
    pub async fn run(self, events: mpsc::Sender<AgentCommand>) -> Result<()> {
        let period = self.heartbeat_interval;
        let first = period.mul_f64(rand::random::<f64>());
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + first, period);

        let (mut sink, mut stream) = self.socket.split();
        let label = self.label;
        let mut sequence = self.sequence;
        let mut state = self.state;

        let (forward, mut backlog) = mpsc::unbounded_channel::<PlatformEvent>();
        tokio::spawn(async move {
            while let Some(event) = backlog.recv().await {
                if events.send(event.into()).await.is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    sink.send(GatewayPayload::heartbeat(sequence).to_message()?).await?;
                }
                message = stream.next() => {
                    let Some(message) = message else {
                        return Err(GatewayError::WebSocket("connection closed".to_string()));
                    };
                    let payload = match decode(message?)? {
                        Some(payload) => payload,
                        None => continue,
                    };

                    if payload.s.is_some() {
                        sequence = payload.s;
                    }
                    match payload.op {
                        opcode::DISPATCH => {
                            let event_type = payload.t.unwrap_or_default();
                            match state.apply(&event_type, payload.d) {
                                Ok(produced) => {
                                    for event in produced {
                                        if forward.send(event).is_err() {
                                            tracing::debug!("[{}] Agent loop gone, closing session", label);
                                            return Ok(());
                                        }
                                    }
                                }
                                Err(e) => tracing::warn!("[{}] Ignoring malformed {}: {}", label, event_type, e),
                            }
                        }
                        opcode::HEARTBEAT => {
                            sink.send(GatewayPayload::heartbeat(sequence).to_message()?).await?;
                        }
                        opcode::HEARTBEAT_ACK => tracing::trace!("[{}] Heartbeat acknowledged", label),
                        opcode::RECONNECT | opcode::INVALID_SESSION => {
                            return Err(GatewayError::Platform(format!(
                                "gateway asked to reconnect (op {})",
                                payload.op
                            )));
                        }
                        other => tracing::debug!("[{}] Unhandled op {}", label, other),
                    }
                }
            }
        }
    }

    async fn forward(
        &mut self,
        payload: GatewayPayload,
        events: &mpsc::Sender<AgentCommand>,
    ) -> Result<()> {
        let event_type = payload.t.unwrap_or_default();
        for event in self.state.apply(&event_type, payload.d)? {
            events
                .send(event.into())
                .await
                .map_err(|_| GatewayError::Internal(format!("{} agent loop stopped", self.label)))?;
        }
        Ok(())
    }
}

async fn next_payload(socket: &mut Socket) -> Result<GatewayPayload> {
    while let Some(message) = socket.next().await {
        if let Some(payload) = decode(message?)? {
            return Ok(payload);
        }
    }
    Err(GatewayError::WebSocket(
        "connection closed during handshake".to_string(),
    ))
}

/// Decode one frame. Control frames yield `None`; a close frame is an error.
fn decode(message: Message) -> Result<Option<GatewayPayload>> {
    match message {
        Message::Text(text) => Ok(Some(serde_json::from_str(&text)?)),
        Message::Binary(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Message::Close(frame) => {
            let (code, reason) = frame
                .map(|f| (u16::from(f.code), f.reason.into_owned()))
                .unwrap_or((u16::from(CloseCode::Normal), String::new()));
            Err(close_error(code, reason))
        }
        _ => Ok(None),
    }
}

fn close_error(code: u16, reason: String) -> GatewayError {
    if code == CLOSE_AUTHENTICATION_FAILED {
        GatewayError::AuthenticationFailed(if reason.is_empty() {
            "token rejected".to_string()
        } else {
            reason
        })
    } else {
        GatewayError::WebSocket(format!("closed with code {}: {}", code, reason))
    }
}
