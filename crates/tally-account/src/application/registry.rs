//! Routes commands to the single live worker of each account.

use std::collections::HashMap;
use std::sync::Arc;

use tally_core::clock::Clock;
use tally_core::repository::EventRepository;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::application::config::RuntimeConfig;
use crate::application::error::AccountError;
use crate::application::worker::{AccountHandle, expect_reply, spawn_account_worker};
use crate::domain::account::BankAccountId;
use crate::domain::commands::BankAccountCommand;
use crate::domain::replies::BankAccountReply;

const FAULT_CHANNEL_CAPACITY: usize = 64;

/// A worker that halted with an error, published to supervisors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerFault {
    /// The account whose worker halted.
    pub account_id: BankAccountId,
    /// Rendered error.
    pub message: String,
}

/// Keeps at most one live worker per account and spawns them on demand.
///
/// Workers that stop, passivate or halt are forgotten once their task ends.
pub struct AccountRegistry {
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
    config: RuntimeConfig,
    workers: Arc<Mutex<HashMap<BankAccountId, AccountHandle>>>,
    faults: broadcast::Sender<WorkerFault>,
}

impl std::fmt::Debug for AccountRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountRegistry")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccountRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        repository: Arc<dyn EventRepository>,
        clock: Arc<dyn Clock>,
        config: RuntimeConfig,
    ) -> Self {
        let (faults, _) = broadcast::channel(FAULT_CHANNEL_CAPACITY);
        Self {
            repository,
            clock,
            config,
            workers: Arc::new(Mutex::new(HashMap::new())),
            faults,
        }
    }

    /// Receives every worker that halts with an error from now on.
    #[must_use]
    pub fn subscribe_faults(&self) -> broadcast::Receiver<WorkerFault> {
        self.faults.subscribe()
    }

    /// Returns the live worker for `account_id`, spawning (and so replaying)
    /// one if none is running.
    pub async fn handle(&self, account_id: BankAccountId) -> AccountHandle {
        let mut workers = self.workers.lock().await;
        match workers.get(&account_id) {
            Some(handle) if !handle.is_closed() => handle.clone(),
            _ => {
                let (handle, task) = spawn_account_worker(
                    account_id,
                    Arc::clone(&self.repository),
                    Arc::clone(&self.clock),
                    &self.config,
                );
                debug!(%account_id, "spawned account worker");
                self.supervise(account_id, task);
                workers.insert(account_id, handle.clone());
                handle
            }
        }
    }

    /// Delivers `command` to the worker of the account it targets.
    ///
    /// A command the worker refused undecided, because it stopped before
    /// reaching it, is delivered once more to a fresh worker.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn execute(
        &self,
        command: BankAccountCommand,
    ) -> Result<BankAccountReply, AccountError> {
        let account_id = command.account_id();
        match self.handle(account_id).await.execute(command.clone()).await {
            Err(AccountError::Unavailable(_)) => {
                trace!(%account_id, "worker stopped before deciding, redelivering");
                self.handle(account_id).await.execute(command).await
            }
            outcome => outcome,
        }
    }

    /// Like [`AccountRegistry::execute`], converting the reply to the kind
    /// the command is answered with.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::ask`].
    pub async fn ask<R>(&self, command: BankAccountCommand) -> Result<R, AccountError>
    where
        R: TryFrom<BankAccountReply, Error = BankAccountReply>,
    {
        let expected = command.reply_type();
        expect_reply(self.execute(command).await?, expected)
    }

    /// Stops the running worker of `account_id` once it has decided the
    /// commands queued before the stop. Returns `false` if no worker was
    /// running.
    ///
    /// # Errors
    ///
    /// Returns the error the worker halted on, or `Timeout`.
    pub async fn shutdown_account(&self, account_id: BankAccountId) -> Result<bool, AccountError> {
        let handle = match self.workers.lock().await.get(&account_id) {
            Some(handle) if !handle.is_closed() => handle.clone(),
            _ => return Ok(false),
        };
        match handle.stop().await {
            // A never created account passivates on the unhandled stop.
            Ok(_) | Err(AccountError::NoReply(_) | AccountError::Unavailable(_)) => {
                debug!(%account_id, "account worker shut down");
                Ok(true)
            }
            Err(err) => Err(err),
        }
    }

    /// Stops every running worker. Returns how many were stopped.
    pub async fn shutdown_all(&self) -> usize {
        let account_ids: Vec<BankAccountId> = self.workers.lock().await.keys().copied().collect();
        let mut stopped = 0;
        for account_id in account_ids {
            match self.shutdown_account(account_id).await {
                Ok(true) => stopped += 1,
                Ok(false) => {}
                Err(err) => warn!(%account_id, error = %err, "account worker did not stop cleanly"),
            }
        }
        stopped
    }

    /// Number of workers the registry holds a handle to.
    pub async fn len(&self) -> usize {
        self.workers.lock().await.len()
    }

    /// True when no worker handle is held.
    pub async fn is_empty(&self) -> bool {
        self.workers.lock().await.is_empty()
    }

    fn supervise(&self, account_id: BankAccountId, task: JoinHandle<Result<(), AccountError>>) {
        let workers = Arc::clone(&self.workers);
        let faults = self.faults.clone();
        tokio::spawn(async move {
            let outcome = task.await;
            {
                // The entry may already belong to a respawned worker.
                let mut workers = workers.lock().await;
                if workers.get(&account_id).is_some_and(AccountHandle::is_closed) {
                    workers.remove(&account_id);
                    trace!(%account_id, "forgot finished account worker");
                }
            }
            let message = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(err)) => err.to_string(),
                Err(join_error) => format!("account worker panicked: {join_error}"),
            };
            warn!(%account_id, %message, "account worker halted");
            // No subscriber is fine.
            let _ = faults.send(WorkerFault {
                account_id,
                message,
            });
        });
    }
}
