//! Incident reporting
//!
//! Uncaught handler faults become structured incident records POSTed to a
//! configured webhook. Delivery is best-effort: failures are logged and
//! swallowed, never surfaced to the invoker.

use bot_core::Snowflake;
use serde_json::json;

/// Embed color used for incident reports
pub const EMBED_COLOR: u32 = 16_740_159;

/// A structured failure report for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncidentRecord {
    /// Command that faulted
    pub command_name: String,
    /// Instance the fault happened on
    pub instance_id: u32,
    /// User whose invocation triggered the fault
    pub invoker_id: Snowflake,
    /// Rendered error text
    pub error_text: String,
}

/// Posts incident records to the operator webhook
#[derive(Debug, Clone)]
pub struct IncidentReporter {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl IncidentReporter {
    /// Create a reporter; `None` disables delivery (records are logged only)
    #[must_use]
    pub fn new(webhook_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url,
        }
    }

    /// Deliver one incident record, best-effort
    pub async fn report(&self, record: IncidentRecord) {
        let Some(url) = &self.webhook_url else {
            tracing::debug!(
                command = %record.command_name,
                "No incident webhook configured, skipping report"
            );
            return;
        };

        let payload = json!({
            "embeds": [{
                "title": format!(
                    "Command: {}, Instance: {}",
                    record.command_name, record.instance_id
                ),
                "description": format!(
                    "```\n{}\n```\nBy `{}`",
                    record.error_text, record.invoker_id
                ),
                "color": EMBED_COLOR,
            }]
        });

        match self.client.post(url).json(&payload).send().await {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    status = %response.status(),
                    command = %record.command_name,
                    "Incident webhook rejected the report"
                );
            }
            Ok(_) => {
                tracing::debug!(command = %record.command_name, "Incident reported");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    command = %record.command_name,
                    "Incident webhook unreachable"
                );
            }
        }
    }
}
