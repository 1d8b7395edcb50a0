//! Bot orchestrator
//!
//! `Bot` owns the shard manager, command registry, dispatch pipeline, and
//! cache client as named fields and wires them together: shard events flow
//! into the pipeline, statistics flow out to the cache, and shutdown stops
//! everything in bounded order.

use crate::modules::{self, ModuleContext};
use crate::sender::HttpReplySink;
use bot_cache::{InstanceCounterStore, InstanceStat, MemoryCache, PreferenceStore, RedisPool};
use bot_common::{AppError, AppResult, BotConfig};
use bot_core::{InboundEvent, KeyValueCache, ReplySink, Snowflake};
use bot_dispatch::{
    CommandRegistry, DispatchPipeline, DispatchPipelineConfig, IncidentReporter, PrefixResolver,
    UsageCounters, COMMANDS_USED, MESSAGES_READ,
};
use bot_gateway::{GatewayConnector, ShardManager, ShardManagerConfig, ShardSessionConfig, WsConnector};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

/// How often instance statistics are published to the cache
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// The assembled bot
pub struct Bot {
    config: BotConfig,
    manager: ShardManager,
    pipeline: DispatchPipeline,
    registry: Arc<CommandRegistry>,
    counters: Arc<UsageCounters>,
    counter_store: InstanceCounterStore,
    shutdown_command: Arc<Notify>,
    events_rx: Option<mpsc::Receiver<InboundEvent>>,
}

impl Bot {
    /// Assemble the bot with production parts (Redis cache, WebSocket
    /// gateway, HTTP reply delivery)
    pub fn new(config: BotConfig) -> AppResult<Self> {
        let cache: Arc<dyn KeyValueCache> = match &config.redis {
            Some(redis) => Arc::new(RedisPool::from_config(redis).map_err(AppError::cache)?),
            None if config.app.debug => {
                tracing::info!("Debug mode: using in-memory cache");
                Arc::new(MemoryCache::new())
            }
            None => return Err(AppError::cache("redis configuration missing")),
        };

        let connector = Arc::new(WsConnector::new(config.gateway.url.clone()));
        let sink = Arc::new(HttpReplySink::new(config.reporting.rest_url.clone()));

        Self::with_parts(config, cache, connector, sink)
    }

    /// Assemble the bot over explicit cache/transport/delivery parts
    ///
    /// Used by `new` and by integration tests that run the bot over the
    /// in-process loopback.
    pub fn with_parts(
        config: BotConfig,
        cache: Arc<dyn KeyValueCache>,
        connector: Arc<dyn GatewayConnector>,
        sink: Arc<dyn ReplySink>,
    ) -> AppResult<Self> {
        let preferences = PreferenceStore::new(Arc::clone(&cache));
        let counters = Arc::new(UsageCounters::new());
        let shutdown_command = Arc::new(Notify::new());

        let ctx = ModuleContext {
            preferences: preferences.clone(),
            counters: Arc::clone(&counters),
            started_at: Utc::now(),
            shard_count: config.gateway.shard_count,
            owner_id: config.app.owner_id.map(Snowflake::new),
            shutdown: Arc::clone(&shutdown_command),
        };
        let registry = Arc::new(modules::build_registry(&ctx));

        let resolver =
            PrefixResolver::new(preferences, config.gateway.bot_user_id, config.app.debug);
        let pipeline = DispatchPipeline::new(
            DispatchPipelineConfig::from_config(&config.dispatch, config.app.instance),
            Arc::clone(&registry),
            resolver,
            Arc::clone(&counters),
            sink,
            IncidentReporter::new(config.reporting.webhook_url.clone()),
        );

        let manager_config = ShardManagerConfig {
            token: config.gateway.token.clone(),
            shard_count: config.gateway.shard_count,
            identify_delay: Duration::from_millis(config.gateway.identify_delay_ms),
            reconnect: config.reconnect,
            shutdown_timeout: Duration::from_secs(config.dispatch.shutdown_timeout_secs),
            handshake_timeout: ShardSessionConfig::DEFAULT_HANDSHAKE_TIMEOUT,
            event_buffer: config.dispatch.queue_depth,
        };
        let (manager, events_rx) = ShardManager::new(manager_config, connector);

        let counter_store = InstanceCounterStore::new(cache, config.app.instance);

        Ok(Self {
            config,
            manager,
            pipeline,
            registry,
            counters,
            counter_store,
            shutdown_command,
            events_rx: Some(events_rx),
        })
    }

    /// The command registry
    #[must_use]
    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    /// The shared usage counters
    #[must_use]
    pub fn counters(&self) -> Arc<UsageCounters> {
        Arc::clone(&self.counters)
    }

    /// Run until a shutdown signal, the owner's shutdown command, or a
    /// process-fatal gateway condition
    pub async fn run(mut self) -> AppResult<()> {
        let Some(mut events_rx) = self.events_rx.take() else {
            return Err(AppError::gateway("bot already running"));
        };

        tracing::info!(
            instance = self.config.app.instance,
            shards = self.config.gateway.shard_count,
            commands = self.registry.len(),
            debug = self.config.app.debug,
            "Bot ready"
        );

        self.manager.start(&self.config.gateway.effective_shard_ids());

        let shutdown_command = Arc::clone(&self.shutdown_command);
        let owner_shutdown = shutdown_command.notified();
        tokio::pin!(owner_shutdown);

        let mut stats_tick = tokio::time::interval(STATS_INTERVAL);
        stats_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let outcome: AppResult<()> = loop {
            tokio::select! {
                maybe_event = events_rx.recv() => match maybe_event {
                    Some(event) => self.pipeline.handle(event),
                    None => break Ok(()),
                },
                _ = stats_tick.tick() => {
                    // Whole-fleet loss is the only shard condition that is
                    // process-fatal
                    if self.manager.all_failed() {
                        break Err(AppError::gateway("all shards permanently failed"));
                    }
                    self.publish_stats().await;
                }
                () = &mut owner_shutdown => {
                    tracing::info!("Shutdown command received");
                    break Ok(());
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break Ok(());
                }
            }
        };

        // Shards stop first so no new events arrive, then the pipeline
        // drains within its grace period
        self.manager.stop().await;
        self.pipeline.stop().await;

        outcome
    }

    /// Publish this instance's statistics, best-effort
    async fn publish_stats(&self) {
        let stats = [
            (InstanceStat::Messages, self.counters.get(MESSAGES_READ)),
            (InstanceStat::Commands, self.counters.get(COMMANDS_USED)),
            (InstanceStat::Guilds, self.manager.total_guild_count()),
        ];

        for (stat, value) in stats {
            if let Err(e) = self.counter_store.publish(stat, value).await {
                tracing::debug!(stat = %stat, error = %e, "Failed to publish instance stats");
                return;
            }
        }
    }
}

impl std::fmt::Debug for Bot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("instance", &self.config.app.instance)
            .field("shards", &self.config.gateway.shard_count)
            .field("commands", &self.registry.len())
            .finish()
    }
}
