//! Typed stores over the key-value cache

mod counters;
mod preferences;

pub use counters::{InstanceCounterStore, InstanceStat};
pub use preferences::PreferenceStore;
