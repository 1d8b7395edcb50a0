//! # bot-dispatch
//!
//! Command dispatch pipeline: consumes the merged inbound event stream,
//! resolves accepted prefixes per user, matches commands against the
//! registry, enforces guards and cooldowns, invokes handlers, and routes
//! every outcome (reply, silent drop, user-facing notice, operator
//! incident) without blocking event ingestion.

pub mod classify;
pub mod cooldown;
pub mod incident;
pub mod pipeline;
pub mod prefix;
pub mod registry;
pub mod telemetry;

pub use classify::{classify, disposition, Disposition, ErrorKind, FailureContext, NOTICE_EXPIRY_SECS};
pub use cooldown::CooldownBuckets;
pub use incident::{IncidentRecord, IncidentReporter, EMBED_COLOR};
pub use pipeline::{DispatchPipeline, DispatchPipelineConfig};
pub use prefix::{longest_match, PrefixResolver, DEBUG_PREFIX, DEFAULT_PREFIXES};
pub use registry::{CommandRegistry, RegistryError};
pub use telemetry::{UsageCounters, COMMANDS_USED, EVENTS_RECEIVED, MESSAGES_READ};
