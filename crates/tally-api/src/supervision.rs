//! Escalation of account worker faults.

use tally_account::application::registry::WorkerFault;
use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;

/// Logs every fault published by the registry until the registry is dropped.
/// Returns how many faults were escalated.
///
/// A burst larger than the channel skips the oldest faults; the loss is
/// logged and escalation carries on.
pub async fn escalate_faults(mut faults: Receiver<WorkerFault>) -> u64 {
    let mut escalated = 0;
    loop {
        match faults.recv().await {
            Ok(fault) => {
                tracing::error!(
                    account_id = %fault.account_id,
                    error = %fault.message,
                    "account worker fault escalated"
                );
                escalated += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "account worker faults dropped in a burst");
            }
            Err(RecvError::Closed) => return escalated,
        }
    }
}
