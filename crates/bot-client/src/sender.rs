//! Outbound reply delivery
//!
//! Posts replies as JSON to the platform's REST endpoint, best-effort.
//! Without a configured endpoint (debug mode), replies are logged instead.

use async_trait::async_trait;
use bot_core::{Reply, ReplySink, SinkError, SinkResult, Snowflake};
use serde_json::json;

/// HTTP-backed `ReplySink`
#[derive(Debug, Clone)]
pub struct HttpReplySink {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl HttpReplySink {
    /// Create a sink; `None` logs replies instead of posting them
    #[must_use]
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.map(|url| url.trim_end_matches('/').to_string()),
        }
    }
}

#[async_trait]
impl ReplySink for HttpReplySink {
    async fn send(&self, channel_id: Snowflake, reply: Reply) -> SinkResult {
        let Some(base_url) = &self.base_url else {
            tracing::info!(
                channel_id = %channel_id,
                content = %reply.content,
                "Reply (no REST endpoint configured)"
            );
            return Ok(());
        };

        let url = format!("{base_url}/channels/{channel_id}/messages");
        let payload = json!({
            "content": reply.content,
            "delete_after": reply.delete_after,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SinkError::Delivery(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
