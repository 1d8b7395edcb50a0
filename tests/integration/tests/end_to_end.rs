//! End-to-end tests over the loopback gateway
//!
//! Each test plays the server role frame by frame against a fully wired
//! bot: loopback transport, in-memory cache, recording reply sink.

use bot_cache::{FailMode, MemoryCache};
use bot_client::Bot;
use bot_core::{KeyValueCache, ReplySink};
use bot_gateway::ChannelConnector;
use integration_tests::{complete_handshake, message, message_in, test_config, RecordingSink};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

struct Harness {
    cache: Arc<MemoryCache>,
    sink: Arc<RecordingSink>,
    counters: Arc<bot_dispatch::UsageCounters>,
    accept: tokio::sync::mpsc::UnboundedReceiver<bot_gateway::PeerHandle>,
    bot_task: JoinHandle<bot_common::AppResult<()>>,
}

fn spawn_bot() -> Harness {
    let (connector, accept) = ChannelConnector::new();
    let cache = Arc::new(MemoryCache::new());
    let sink = Arc::new(RecordingSink::default());

    let bot = Bot::with_parts(
        test_config(),
        Arc::clone(&cache) as Arc<dyn KeyValueCache>,
        Arc::new(connector),
        Arc::clone(&sink) as Arc<dyn ReplySink>,
    )
    .expect("failed to assemble bot");

    let counters = bot.counters();
    let bot_task = tokio::spawn(bot.run());

    Harness {
        cache,
        sink,
        counters,
        accept,
        bot_task,
    }
}

async fn wait_until(description: &str, mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {description}"));
}

#[tokio::test]
async fn test_choose_command_end_to_end() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.expect("no connection opened");
    assert_eq!(peer.shard_id, 0);
    assert_eq!(peer.shard_count, 1);
    complete_handshake(&mut peer, "sess-1").await;

    peer.to_client
        .send(message(1, 123, "n!choose a b c"))
        .unwrap();

    let replies = h.sink.wait_for(1).await;
    assert!(["a", "b", "c"].contains(&replies[0].1.content.as_str()));
    assert_eq!(h.counters.command_usage("choose"), 1);

    h.bot_task.abort();
}

#[tokio::test]
async fn test_bot_author_is_counted_but_never_dispatched() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    peer.to_client
        .send(message_in(1, 321, "n!ping", None, true))
        .unwrap();

    wait_until("bot message to be counted", || {
        h.counters.get(bot_dispatch::MESSAGES_READ) >= 1
    })
    .await;

    // Counted, but no command ran and nothing was sent back
    assert_eq!(h.counters.get(bot_dispatch::COMMANDS_USED), 0);
    assert!(h.sink.replies().is_empty());

    h.bot_task.abort();
}

#[tokio::test]
async fn test_cache_timeout_still_matches_default_prefix() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    // Every cache read now times out; prefix resolution must degrade to
    // the defaults instead of failing the invocation
    h.cache.set_fail_mode(Some(FailMode::Timeout));

    peer.to_client.send(message(1, 123, "n!ping")).unwrap();

    let replies = h.sink.wait_for(1).await;
    assert_eq!(replies[0].1.content, "Pong!");

    h.bot_task.abort();
}

#[tokio::test]
async fn test_custom_prefix_roundtrip_through_commands() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    peer.to_client
        .send(message(1, 123, "n!setprefix $"))
        .unwrap();
    let replies = h.sink.wait_for(1).await;
    assert!(replies[0].1.content.contains("Prefix set"));

    // The stored prefix works, and the defaults still do
    peer.to_client.send(message(2, 123, "$ping")).unwrap();
    peer.to_client.send(message(3, 456, "N!ping")).unwrap();

    let replies = h.sink.wait_for(3).await;
    assert_eq!(replies[1].1.content, "Pong!");
    assert_eq!(replies[2].1.content, "Pong!");

    h.bot_task.abort();
}

#[tokio::test]
async fn test_cooldown_denied_with_remaining_time_notice() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    peer.to_client.send(message(1, 42, "n!ping")).unwrap();
    let replies = h.sink.wait_for(1).await;
    assert_eq!(replies[0].1.content, "Pong!");

    peer.to_client.send(message(2, 42, "n!ping")).unwrap();
    let replies = h.sink.wait_for(2).await;
    assert!(replies[1].1.content.contains("left until you can use"));
    assert_eq!(replies[1].1.delete_after, Some(5));
    // The denied invocation never reached the handler
    assert_eq!(h.counters.command_usage("ping"), 1);

    h.bot_task.abort();
}

#[tokio::test]
async fn test_guild_only_command_silent_in_direct_messages() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    // Direct message: silently dropped
    peer.to_client
        .send(message_in(1, 123, "n!stats", None, false))
        .unwrap();
    // Guild channel: answered
    peer.to_client
        .send(message_in(2, 123, "n!stats", Some(789), false))
        .unwrap();

    let replies = h.sink.wait_for(1).await;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1.content.contains("No commands used yet"));

    h.bot_task.abort();
}

#[tokio::test]
async fn test_mention_prefix_always_accepted() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    // Cache down entirely; the mention form still dispatches
    h.cache.set_fail_mode(Some(FailMode::Unavailable));
    peer.to_client
        .send(message(1, 123, "<@999> choose x y"))
        .unwrap();

    let replies = h.sink.wait_for(1).await;
    assert!(["x", "y"].contains(&replies[0].1.content.as_str()));

    h.bot_task.abort();
}

#[tokio::test]
async fn test_owner_shutdown_command_stops_the_bot() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;

    // A non-owner is denied with an expiring notice
    peer.to_client.send(message(1, 123, "n!shutdown")).unwrap();
    let replies = h.sink.wait_for(1).await;
    assert_eq!(
        replies[0].1.content,
        "You are not allowed to use that command."
    );

    // The owner (user 1) shuts the bot down gracefully
    peer.to_client.send(message(2, 1, "n!shutdown")).unwrap();
    let replies = h.sink.wait_for(2).await;
    assert_eq!(replies[1].1.content, "Shutting down.");

    let result = tokio::time::timeout(Duration::from_secs(5), h.bot_task)
        .await
        .expect("bot did not stop in time")
        .expect("bot task panicked");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_shard_resume_preserves_command_flow() {
    let mut h = spawn_bot();

    let mut peer = h.accept.recv().await.unwrap();
    complete_handshake(&mut peer, "sess-1").await;
    peer.to_client.send(message(7, 123, "n!ping")).unwrap();
    let _ = h.sink.wait_for(1).await;

    // Drop the connection; the client reconnects and resumes
    drop(peer);

    let mut peer2 = h.accept.recv().await.expect("no reconnect attempt");
    peer2
        .to_client
        .send(integration_tests::hello())
        .unwrap();

    let resume = peer2.from_client.recv().await.unwrap();
    assert_eq!(resume.op, bot_gateway::OpCode::Resume);
    let d = resume.d.clone().unwrap();
    assert_eq!(d["session_id"], "sess-1");
    assert_eq!(d["seq"], 7);

    // Replayed traffic flows into the same pipeline
    peer2.to_client.send(message(8, 456, "n!ping")).unwrap();
    let replies = h.sink.wait_for(2).await;
    assert_eq!(replies[1].1.content, "Pong!");

    h.bot_task.abort();
}
