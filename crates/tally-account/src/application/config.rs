//! Runtime configuration for account workers.

use std::time::Duration;

/// Settings shared by every account worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Capacity of each worker's inbound queue. Senders wait when it is full.
    pub mailbox_capacity: usize,
    /// How long a caller waits for a reply before giving up.
    pub reply_timeout: Duration,
}

impl RuntimeConfig {
    /// Default inbound queue capacity.
    pub const DEFAULT_MAILBOX_CAPACITY: usize = 16;
    /// Default reply timeout.
    pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: Self::DEFAULT_MAILBOX_CAPACITY,
            reply_timeout: Self::DEFAULT_REPLY_TIMEOUT,
        }
    }
}
