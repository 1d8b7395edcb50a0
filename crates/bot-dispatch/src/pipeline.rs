//! Dispatch pipeline
//!
//! `handle` is a non-blocking enqueue; a bounded pool of worker tasks
//! drains per-worker queues. Events are routed to a worker by shard id, so
//! same-shard arrival order is preserved while shards interleave freely.
//! Handler invocations run as short-lived tasks so a slow command never
//! stalls ingestion; commands sharing an exclusion key are serialized.

use crate::classify::{disposition, Disposition, FailureContext};
use crate::cooldown::CooldownBuckets;
use crate::incident::IncidentReporter;
use crate::prefix::{longest_match, PrefixResolver};
use crate::registry::CommandRegistry;
use crate::telemetry::{UsageCounters, COMMANDS_USED, EVENTS_RECEIVED, MESSAGES_READ};
use bot_core::{
    CommandDescriptor, CommandError, CommandInvocation, EventPayload, GuardDenial, InboundEvent,
    MessagePayload, Reply, ReplySink, Snowflake,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;

/// Pipeline configuration
#[derive(Debug, Clone, Copy)]
pub struct DispatchPipelineConfig {
    /// Number of worker tasks
    pub workers: usize,
    /// Bounded queue depth per worker
    pub queue_depth: usize,
    /// Grace period for in-flight handlers on shutdown
    pub grace_timeout: Duration,
    /// Instance number stamped into incident records
    pub instance_id: u32,
}

impl Default for DispatchPipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 1024,
            grace_timeout: Duration::from_secs(5),
            instance_id: 0,
        }
    }
}

impl DispatchPipelineConfig {
    /// Build from the shared dispatch configuration
    #[must_use]
    pub fn from_config(config: &bot_common::DispatchConfig, instance_id: u32) -> Self {
        Self {
            workers: config.workers,
            queue_depth: config.queue_depth,
            grace_timeout: Duration::from_secs(config.grace_timeout_secs),
            instance_id,
        }
    }
}

struct Inner {
    registry: Arc<CommandRegistry>,
    resolver: PrefixResolver,
    cooldowns: CooldownBuckets,
    counters: Arc<UsageCounters>,
    sink: Arc<dyn ReplySink>,
    reporter: IncidentReporter,
    instance_id: u32,
    /// One lock per declared exclusion key
    exclusions: DashMap<String, Arc<Mutex<()>>>,
    /// Handler invocations currently running
    in_flight: AtomicUsize,
    idle: Notify,
}

/// The command dispatch pipeline
pub struct DispatchPipeline {
    inner: Arc<Inner>,
    queues: Vec<mpsc::Sender<InboundEvent>>,
    workers: Vec<JoinHandle<()>>,
    grace_timeout: Duration,
}

impl DispatchPipeline {
    /// Create the pipeline and spawn its worker pool
    #[must_use]
    pub fn new(
        config: DispatchPipelineConfig,
        registry: Arc<CommandRegistry>,
        resolver: PrefixResolver,
        counters: Arc<UsageCounters>,
        sink: Arc<dyn ReplySink>,
        reporter: IncidentReporter,
    ) -> Self {
        let inner = Arc::new(Inner {
            registry,
            resolver,
            cooldowns: CooldownBuckets::new(),
            counters,
            sink,
            reporter,
            instance_id: config.instance_id,
            exclusions: DashMap::new(),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let worker_count = config.workers.max(1);
        let mut queues = Vec::with_capacity(worker_count);
        let mut workers = Vec::with_capacity(worker_count);

        for worker_id in 0..worker_count {
            let (tx, rx) = mpsc::channel(config.queue_depth.max(1));
            queues.push(tx);
            workers.push(tokio::spawn(worker_loop(
                Arc::clone(&inner),
                rx,
                worker_id,
            )));
        }

        tracing::info!(workers = worker_count, "Dispatch pipeline started");

        Self {
            inner,
            queues,
            workers,
            grace_timeout: config.grace_timeout,
        }
    }

    /// Enqueue an event without blocking
    ///
    /// Routing by shard id keeps same-shard events on one worker, which
    /// preserves their arrival order. When the worker's queue is full the
    /// event is dropped with a warning rather than stalling the caller.
    pub fn handle(&self, event: InboundEvent) {
        let index = event.shard_id as usize % self.queues.len();
        match self.queues[index].try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    shard_id = event.shard_id,
                    worker = index,
                    "Dispatch queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("Dispatch pipeline stopped, dropping event");
            }
        }
    }

    /// Shared usage counters
    #[must_use]
    pub fn counters(&self) -> Arc<UsageCounters> {
        Arc::clone(&self.inner.counters)
    }

    /// Drain queues, then wait out in-flight handlers up to the grace
    /// timeout; handlers still running afterwards are abandoned
    pub async fn stop(mut self) {
        // Dropping the senders lets each worker finish its queue and exit
        self.queues.clear();

        let deadline = tokio::time::Instant::now() + self.grace_timeout;
        for (worker_id, mut worker) in self.workers.drain(..).enumerate() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if tokio::time::timeout(remaining, &mut worker).await.is_err() {
                tracing::warn!(worker_id = worker_id, "Worker did not drain in time");
                worker.abort();
            }
        }

        while self.inner.in_flight.load(Ordering::SeqCst) > 0 {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero()
                || tokio::time::timeout(remaining, self.inner.idle.notified())
                    .await
                    .is_err()
            {
                tracing::warn!(
                    abandoned = self.inner.in_flight.load(Ordering::SeqCst),
                    "Abandoning in-flight handlers"
                );
                break;
            }
        }

        tracing::info!("Dispatch pipeline stopped");
    }
}

impl std::fmt::Debug for DispatchPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchPipeline")
            .field("workers", &self.workers.len())
            .finish()
    }
}

async fn worker_loop(inner: Arc<Inner>, mut rx: mpsc::Receiver<InboundEvent>, worker_id: usize) {
    tracing::debug!(worker_id = worker_id, "Dispatch worker started");
    while let Some(event) = rx.recv().await {
        Arc::clone(&inner).process(event).await;
    }
    tracing::debug!(worker_id = worker_id, "Dispatch worker stopped");
}

impl Inner {
    async fn process(self: Arc<Self>, event: InboundEvent) {
        self.counters.incr(EVENTS_RECEIVED);

        match event.payload {
            EventPayload::Message(message) => {
                self.process_message(event.shard_id, message).await;
            }
            EventPayload::Presence(presence) => {
                tracing::trace!(user_id = %presence.user_id, status = %presence.status, "Presence change");
            }
            EventPayload::Other { event_type, .. } => {
                tracing::trace!(event_type = %event_type, "Unhandled event kind");
            }
        }
    }

    async fn process_message(self: Arc<Self>, shard_id: u32, message: MessagePayload) {
        self.counters.incr(MESSAGES_READ);

        // Other bots never trigger commands
        if message.author_is_bot {
            return;
        }

        let prefixes = self.resolver.resolve(message.author_id).await;
        let Some(prefix_len) = longest_match(&prefixes, &message.content) else {
            return;
        };

        let remainder = &message.content[prefix_len..];
        let mut tokens = remainder.split_whitespace();
        let Some(name) = tokens.next() else {
            // Bare prefix with no command
            return;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        // A registry miss is not an error
        let Some(descriptor) = self.registry.lookup(name) else {
            tracing::trace!(shard_id = shard_id, token = %name, "No such command");
            return;
        };

        let invocation = CommandInvocation {
            author_id: message.author_id,
            channel_id: message.channel_id,
            guild_id: message.guild_id,
            command_name: descriptor.canonical_name.clone(),
            args,
        };

        // Guards, in registration order, first failure wins
        for guard in &descriptor.guards {
            if let Err(denial) = guard.check(&invocation) {
                let error = match denial {
                    GuardDenial::NotAllowed => CommandError::NotAllowed,
                    GuardDenial::GuildOnly => CommandError::PrivateMessageNotAllowed,
                    GuardDenial::Disabled => CommandError::Disabled,
                };
                self.react_to_failure(&descriptor, &invocation, error).await;
                return;
            }
        }

        // Cooldown: deny without executing, report the remaining window
        if let Err(remaining) = self.cooldowns.check(&descriptor.cooldown, &invocation) {
            self.react_to_failure(&descriptor, &invocation, CommandError::OnCooldown(remaining))
                .await;
            return;
        }

        // Invoke as a short-lived task so a slow handler never blocks this
        // worker's queue
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            inner.invoke(descriptor, invocation).await;
            if inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                inner.idle.notify_waiters();
            }
        });
    }

    async fn invoke(&self, descriptor: Arc<CommandDescriptor>, invocation: CommandInvocation) {
        let _exclusive = match &descriptor.exclusion_key {
            Some(key) => Some(self.exclusion_lock(key).lock_owned().await),
            None => None,
        };

        self.counters.incr(COMMANDS_USED);
        self.counters.incr_command(&invocation.command_name);

        tracing::debug!(
            command = %invocation.command_name,
            author_id = %invocation.author_id,
            args = invocation.args.len(),
            "Dispatching command"
        );

        let channel_id = invocation.channel_id;
        match descriptor.handler.invoke(&invocation).await {
            Ok(Some(reply)) => self.deliver(channel_id, reply).await,
            Ok(None) => {}
            Err(error) => self.react_to_failure(&descriptor, &invocation, error).await,
        }
    }

    async fn react_to_failure(
        &self,
        descriptor: &CommandDescriptor,
        invocation: &CommandInvocation,
        error: CommandError,
    ) {
        let ctx = FailureContext {
            command_name: &descriptor.canonical_name,
            usage: descriptor.usage.as_deref(),
            instance_id: self.instance_id,
            invoker_id: invocation.author_id,
        };

        match disposition(&error, ctx) {
            Disposition::Silent => {
                tracing::trace!(
                    command = %descriptor.canonical_name,
                    error = %error,
                    "Silently dropped failure"
                );
            }
            Disposition::Notice {
                content,
                delete_after,
            } => {
                let reply = Reply {
                    content,
                    delete_after,
                };
                self.deliver(invocation.channel_id, reply).await;
            }
            Disposition::Report { notice, incident } => {
                tracing::error!(
                    command = %descriptor.canonical_name,
                    invoker_id = %invocation.author_id,
                    error = %error,
                    "Command handler failed"
                );
                self.deliver(invocation.channel_id, Reply::new(notice)).await;

                // Short-lived task per outbound call; delivery is
                // best-effort
                let reporter = self.reporter.clone();
                tokio::spawn(async move {
                    reporter.report(incident).await;
                });
            }
        }
    }

    async fn deliver(&self, channel_id: Snowflake, reply: Reply) {
        if let Err(e) = self.sink.send(channel_id, reply).await {
            tracing::warn!(channel_id = %channel_id, error = %e, "Failed to deliver reply");
        }
    }

    fn exclusion_lock(&self, key: &str) -> Arc<Mutex<()>> {
        self.exclusions
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
