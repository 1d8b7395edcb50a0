//! One shard's gateway session
//!
//! A `ShardSession` is a single long-lived task that owns its connection
//! exclusively: Hello/Identify handshake, heartbeats, dispatch forwarding,
//! resume-with-backoff on transient loss, and graceful close. Auth
//! failures are fatal for this shard only.

use crate::backoff::ReconnectBackoff;
use crate::protocol::{CloseCode, Frame, HelloPayload, IdentifyPayload, OpCode, ResumePayload};
use crate::shard::{ShardState, ShardStatus};
use crate::transport::{GatewayConnector, GatewayTransport, TransportError};
use bot_common::ReconnectConfig;
use bot_core::InboundEvent;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Per-session configuration
#[derive(Debug, Clone)]
pub struct ShardSessionConfig {
    /// Authentication token for Identify/Resume
    pub token: String,
    /// Total shard count the fleet identifies with
    pub shard_count: u32,
    /// Delay before the first connect (identify stagger)
    pub start_delay: Duration,
    /// Reconnect/backoff settings
    pub reconnect: ReconnectConfig,
    /// Bound on the Hello/Ready handshake
    pub handshake_timeout: Duration,
}

impl ShardSessionConfig {
    /// Default handshake bound
    pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Why a connection ended without a transport error
enum SessionEnd {
    /// Cooperative shutdown was requested
    Shutdown,
    /// The server asked us to reconnect
    Reconnect { resumable: bool },
}

/// Why a connection ended with an error
enum SessionError {
    /// Transient: reconnect with backoff
    Transient { reason: String, resumable: bool },
    /// Fatal for this shard: terminate the session task
    Fatal(String),
}

/// A single shard's session task
pub struct ShardSession {
    shard_id: u32,
    config: ShardSessionConfig,
    connector: Arc<dyn GatewayConnector>,
    events: mpsc::Sender<InboundEvent>,
    status: Arc<ShardStatus>,
    shutdown: watch::Receiver<bool>,
    backoff: ReconnectBackoff,
    session_id: Option<String>,
    last_seq: Option<u64>,
    connected_at: Option<Instant>,
}

impl ShardSession {
    /// Create a session (does not connect; call `run`)
    #[must_use]
    pub fn new(
        shard_id: u32,
        config: ShardSessionConfig,
        connector: Arc<dyn GatewayConnector>,
        events: mpsc::Sender<InboundEvent>,
        status: Arc<ShardStatus>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let backoff = ReconnectBackoff::new(&config.reconnect);
        Self {
            shard_id,
            config,
            connector,
            events,
            status,
            shutdown,
            backoff,
            session_id: None,
            last_seq: None,
            connected_at: None,
        }
    }

    /// Run the session until shutdown or permanent failure
    pub async fn run(mut self) {
        if !self.config.start_delay.is_zero() && self.wait_or_shutdown(self.config.start_delay).await
        {
            self.status.set_state(ShardState::Disconnected);
            return;
        }

        self.status.set_state(ShardState::Connecting);

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            let resumable = match self.run_connection().await {
                Ok(SessionEnd::Shutdown) => break,
                Ok(SessionEnd::Reconnect { resumable }) => {
                    tracing::info!(shard_id = self.shard_id, "Server requested reconnect");
                    resumable
                }
                Err(SessionError::Fatal(reason)) => {
                    self.status.mark_failed(reason);
                    return;
                }
                Err(SessionError::Transient { reason, resumable }) => {
                    tracing::warn!(
                        shard_id = self.shard_id,
                        reason = %reason,
                        "Shard connection lost"
                    );
                    resumable
                }
            };

            if !resumable {
                self.session_id = None;
                self.last_seq = None;
            }

            // A stable stretch of connectivity earns a fresh attempt budget
            if let Some(connected_at) = self.connected_at.take() {
                let stability = Duration::from_secs(self.config.reconnect.stability_window_secs);
                if connected_at.elapsed() >= stability {
                    self.backoff.reset();
                    self.status.reset_reconnect_attempts();
                }
            }

            let attempt = self.status.record_reconnect_attempt();
            if attempt > self.config.reconnect.max_attempts {
                self.status.mark_failed(format!(
                    "reconnect attempts exhausted ({} tries)",
                    attempt - 1
                ));
                return;
            }

            self.status.set_state(if self.session_id.is_some() {
                ShardState::Resuming
            } else {
                ShardState::Connecting
            });

            let delay = self.backoff.next_delay();
            tracing::debug!(
                shard_id = self.shard_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                "Backing off before reconnect"
            );
            if self.wait_or_shutdown(delay).await {
                break;
            }
        }

        self.status.set_state(ShardState::Disconnected);
    }

    /// Sleep for `delay`, returning true if shutdown arrived first
    async fn wait_or_shutdown(&mut self, delay: Duration) -> bool {
        tokio::select! {
            () = tokio::time::sleep(delay) => false,
            _ = self.shutdown.changed() => *self.shutdown.borrow(),
        }
    }

    /// Drive one connection from open to close
    async fn run_connection(&mut self) -> Result<SessionEnd, SessionError> {
        let mut transport = self
            .connector
            .open(self.shard_id, self.config.shard_count)
            .await
            .map_err(|e| SessionError::Transient {
                reason: e.to_string(),
                resumable: true,
            })?;

        let heartbeat_interval = self.handshake(transport.as_mut()).await?;

        self.status.set_state(ShardState::Connected);
        self.connected_at = Some(Instant::now());
        tracing::info!(
            shard_id = self.shard_id,
            heartbeat_interval_ms = heartbeat_interval.as_millis() as u64,
            "Shard connected"
        );

        let mut heartbeat = tokio::time::interval(heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately and doubles as the initial beat
        let mut acked = true;

        enum Wake {
            Shutdown,
            Heartbeat,
            Frame(Result<Frame, TransportError>),
        }

        loop {
            let wake = tokio::select! {
                _ = self.shutdown.changed() => Wake::Shutdown,
                _ = heartbeat.tick() => Wake::Heartbeat,
                frame = transport.receive() => Wake::Frame(frame),
            };

            match wake {
                Wake::Shutdown => {
                    if !*self.shutdown.borrow() {
                        continue;
                    }
                    self.status.set_state(ShardState::Closing);
                    if let Err(e) = transport.close().await {
                        tracing::debug!(
                            shard_id = self.shard_id,
                            error = %e,
                            "Error closing transport"
                        );
                    }
                    return Ok(SessionEnd::Shutdown);
                }
                Wake::Heartbeat => {
                    if !acked {
                        // A missed ack means the link is dead even if TCP
                        // has not noticed yet
                        return Err(SessionError::Transient {
                            reason: "heartbeat not acknowledged".to_string(),
                            resumable: true,
                        });
                    }
                    transport
                        .send(Frame::heartbeat(self.last_seq))
                        .await
                        .map_err(|e| self.classify(e))?;
                    acked = false;
                }
                Wake::Frame(frame) => {
                    let frame = frame.map_err(|e| self.classify(e))?;
                    match frame.op {
                        OpCode::Dispatch => self.handle_dispatch(frame).await,
                        OpCode::Heartbeat => {
                            // Server requested an immediate beat
                            transport
                                .send(Frame::heartbeat(self.last_seq))
                                .await
                                .map_err(|e| self.classify(e))?;
                        }
                        OpCode::HeartbeatAck => {
                            acked = true;
                            self.status.record_heartbeat();
                        }
                        OpCode::Reconnect => {
                            return Ok(SessionEnd::Reconnect { resumable: true });
                        }
                        OpCode::InvalidSession => {
                            let resumable = frame.invalid_session_resumable().unwrap_or(false);
                            return Ok(SessionEnd::Reconnect { resumable });
                        }
                        other => {
                            tracing::trace!(
                                shard_id = self.shard_id,
                                op = %other,
                                "Ignoring unexpected frame"
                            );
                        }
                    }
                }
            }
        }
    }

    /// Hello → Identify/Resume → (Ready) handshake
    ///
    /// Returns the heartbeat interval announced by the server.
    async fn handshake(
        &mut self,
        transport: &mut dyn GatewayTransport,
    ) -> Result<Duration, SessionError> {
        let deadline = self.config.handshake_timeout;

        let hello = tokio::time::timeout(deadline, transport.receive())
            .await
            .map_err(|_| SessionError::Transient {
                reason: "timed out waiting for hello".to_string(),
                resumable: true,
            })?
            .map_err(|e| self.classify(e))?;

        let heartbeat_interval = match hello.as_hello() {
            Some(HelloPayload { heartbeat_interval }) => heartbeat_interval,
            None => {
                tracing::warn!(
                    shard_id = self.shard_id,
                    frame = %hello,
                    "Expected hello, using default heartbeat interval"
                );
                HelloPayload::DEFAULT_HEARTBEAT_INTERVAL
            }
        };

        if let (Some(session_id), Some(seq)) = (self.session_id.clone(), self.last_seq) {
            // Resume the previous session; the server replays missed
            // dispatches into the regular event loop
            transport
                .send(Frame::resume(&ResumePayload {
                    token: self.config.token.clone(),
                    session_id,
                    seq,
                }))
                .await
                .map_err(|e| self.classify(e))?;

            tracing::info!(shard_id = self.shard_id, seq = seq, "Resuming session");
        } else {
            transport
                .send(Frame::identify(&IdentifyPayload::new(
                    self.config.token.clone(),
                    self.shard_id,
                    self.config.shard_count,
                )))
                .await
                .map_err(|e| self.classify(e))?;

            let ready = tokio::time::timeout(deadline, async {
                loop {
                    let frame = transport.receive().await?;
                    if let Some(ready) = frame.as_ready() {
                        return Ok(ready);
                    }
                    match frame.op {
                        OpCode::InvalidSession => {
                            return Err(TransportError::closed("session invalidated"));
                        }
                        _ => {
                            tracing::trace!(frame = %frame, "Skipping pre-ready frame");
                        }
                    }
                }
            })
            .await
            .map_err(|_| SessionError::Transient {
                reason: "timed out waiting for ready".to_string(),
                resumable: false,
            })?
            .map_err(|e| self.classify(e))?;

            if let Some(guild_count) = ready.guild_count {
                self.status.set_guild_count(guild_count);
            }
            tracing::info!(
                shard_id = self.shard_id,
                session_id = %ready.session_id,
                guild_count = ?ready.guild_count,
                "Shard identified"
            );
            self.session_id = Some(ready.session_id);
            self.last_seq = None;
        }

        Ok(Duration::from_millis(heartbeat_interval))
    }

    /// Forward a dispatch frame into the event channel
    async fn handle_dispatch(&mut self, frame: Frame) {
        if let Some(seq) = frame.s {
            self.last_seq = Some(seq);
        }

        let Some(event_type) = frame.t else { return };

        match event_type.as_str() {
            "RESUMED" => {
                tracing::info!(shard_id = self.shard_id, "Session resumed");
            }
            "READY" => {
                // Unexpected mid-session READY; adopt the new session id
                if let Some(d) = &frame.d {
                    if let Ok(ready) =
                        serde_json::from_value::<crate::protocol::ReadyPayload>(d.clone())
                    {
                        self.session_id = Some(ready.session_id);
                    }
                }
            }
            _ => {
                let event = InboundEvent::from_dispatch(
                    self.shard_id,
                    &event_type,
                    frame.d.unwrap_or(serde_json::Value::Null),
                );
                if self.events.send(event).await.is_err() {
                    tracing::warn!(shard_id = self.shard_id, "Event channel closed");
                }
            }
        }
    }

    /// Map a transport failure onto the session taxonomy
    fn classify(&self, err: TransportError) -> SessionError {
        match err.close_code().and_then(CloseCode::from_u16) {
            Some(code) if !code.should_reconnect() => SessionError::Fatal(code.to_string()),
            Some(code) => SessionError::Transient {
                reason: code.to_string(),
                resumable: code.can_resume(),
            },
            None => SessionError::Transient {
                reason: err.to_string(),
                resumable: true,
            },
        }
    }
}

impl std::fmt::Debug for ShardSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardSession")
            .field("shard_id", &self.shard_id)
            .field("session_id", &self.session_id)
            .field("last_seq", &self.last_seq)
            .finish()
    }
}
