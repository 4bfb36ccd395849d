//! Per-account worker.
//!
//! Each account is owned by one tokio task fed by one bounded queue. The task
//! replays the journal on start, then decides commands one at a time: it
//! appends the resulting event, folds it into the state and only then sends
//! the reply. Nothing else reads or writes the state.

use std::sync::Arc;
use std::time::Duration;

use tally_core::clock::Clock;
use tally_core::command::Command;
use tally_core::event::DomainEvent;
use tally_core::repository::{EventRepository, StoredEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::application::command_handlers::{Decision, decide};
use crate::application::config::RuntimeConfig;
use crate::application::error::AccountError;
use crate::application::query_handlers::reconstitute;
use crate::domain::account::BankAccountId;
use crate::domain::aggregates::AggregateState;
use crate::domain::commands::BankAccountCommand;
use crate::domain::money::Money;
use crate::domain::replies::{
    BankAccountReply, CreateReply, DepositCashReply, GetBalanceReply, StopReply,
    WithdrawCashReply,
};

/// What a command is answered with: the account's reply, or the reason the
/// worker could not decide or persist it.
pub type Answer = Result<BankAccountReply, AccountError>;

/// Where the single answer to a command is delivered. Dropped unanswered
/// when the command does not apply to the account's state.
pub type ReplyTo = oneshot::Sender<Answer>;

/// A command on its way to a worker, with its reply destination.
#[derive(Debug)]
pub struct CommandEnvelope {
    /// The command.
    pub command: BankAccountCommand,
    /// Recorded on the events the command produces.
    pub correlation_id: Uuid,
    /// Receives the answer, if the command gets one.
    pub reply_to: ReplyTo,
}

/// Cloneable sending side of an account worker.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    account_id: BankAccountId,
    sender: mpsc::Sender<CommandEnvelope>,
    reply_timeout: Duration,
}

impl AccountHandle {
    /// The account this handle addresses.
    #[must_use]
    pub fn account_id(&self) -> BankAccountId {
        self.account_id
    }

    /// True once the worker has stopped taking commands.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends `command` and waits for its reply.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` if the worker stopped before deciding the
    /// command, `NoReply` if the command did not apply, `Domain` or `Fault`
    /// if the worker halted on a journal failure, and `Timeout` if no answer
    /// arrived within the configured timeout.
    pub async fn execute(
        &self,
        command: BankAccountCommand,
    ) -> Result<BankAccountReply, AccountError> {
        let (reply_to, reply) = oneshot::channel();
        let envelope = CommandEnvelope {
            command,
            correlation_id: Uuid::new_v4(),
            reply_to,
        };
        let exchange = async {
            if self.sender.send(envelope).await.is_err() {
                return Err(AccountError::Unavailable(self.account_id));
            }
            reply
                .await
                .unwrap_or_else(|_| Err(AccountError::NoReply(self.account_id)))
        };
        tokio::time::timeout(self.reply_timeout, exchange)
            .await
            .map_err(|_| AccountError::Timeout {
                account_id: self.account_id,
                timeout: self.reply_timeout,
            })?
    }

    /// Sends `command` and converts the reply to the kind it is answered with.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`]; `ReplyMismatch` if another kind of
    /// reply arrives.
    pub async fn ask<R>(&self, command: BankAccountCommand) -> Result<R, AccountError>
    where
        R: TryFrom<BankAccountReply, Error = BankAccountReply>,
    {
        let expected = command.reply_type();
        expect_reply(self.execute(command).await?, expected)
    }

    /// Opens the account.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn create(&self, limit: Money, balance: Money) -> Result<CreateReply, AccountError> {
        let command = BankAccountCommand::Create {
            account_id: self.account_id,
            limit,
            balance,
        };
        self.ask(command).await
    }

    /// Deposits `amount`.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn deposit_cash(&self, amount: Money) -> Result<DepositCashReply, AccountError> {
        let command = BankAccountCommand::DepositCash {
            account_id: self.account_id,
            amount,
        };
        self.ask(command).await
    }

    /// Withdraws `amount`.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn withdraw_cash(&self, amount: Money) -> Result<WithdrawCashReply, AccountError> {
        let command = BankAccountCommand::WithdrawCash {
            account_id: self.account_id,
            amount,
        };
        self.ask(command).await
    }

    /// Reads the balance.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn get_balance(&self) -> Result<GetBalanceReply, AccountError> {
        let command = BankAccountCommand::GetBalance {
            account_id: self.account_id,
        };
        self.ask(command).await
    }

    /// Asks the worker to stop after acknowledging.
    ///
    /// # Errors
    ///
    /// See [`AccountHandle::execute`].
    pub async fn stop(&self) -> Result<StopReply, AccountError> {
        let command = BankAccountCommand::Stop {
            account_id: self.account_id,
        };
        self.ask(command).await
    }
}

pub(crate) fn expect_reply<R>(
    reply: BankAccountReply,
    expected: &'static str,
) -> Result<R, AccountError>
where
    R: TryFrom<BankAccountReply, Error = BankAccountReply>,
{
    R::try_from(reply).map_err(|other| AccountError::ReplyMismatch {
        expected,
        actual: other.reply_type(),
    })
}

/// Spawns the worker for `account_id`.
///
/// The returned task resolves to `Ok(())` when the worker stops normally and
/// to an error when replay faults or the journal fails. A worker stops on
/// `Stop`, when every handle is dropped, or when a command leaves a never
/// created account unanswered. Commands still queued when it stops are
/// answered with `Unavailable`, or with the error it halted on.
pub fn spawn_account_worker(
    account_id: BankAccountId,
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
    config: &RuntimeConfig,
) -> (AccountHandle, JoinHandle<Result<(), AccountError>>) {
    let (sender, receiver) = mpsc::channel(config.mailbox_capacity.max(1));
    let task = tokio::spawn(run_account_worker(account_id, receiver, repository, clock));
    let handle = AccountHandle {
        account_id,
        sender,
        reply_timeout: config.reply_timeout,
    };
    (handle, task)
}

async fn run_account_worker(
    account_id: BankAccountId,
    mut receiver: mpsc::Receiver<CommandEnvelope>,
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
) -> Result<(), AccountError> {
    let (state, version) = match reconstitute(account_id, repository.as_ref()).await {
        Ok(recovered) => recovered,
        Err(err) => {
            error!(%account_id, error = %err, "replay failed, halting account worker");
            refuse_queued(&mut receiver, &err).await;
            return Err(err);
        }
    };
    debug!(
        %account_id,
        aggregate_type = BankAccountId::AGGREGATE_TYPE_NAME,
        version,
        state = state.state_name(),
        "account recovered"
    );

    let mut worker = AccountWorker {
        account_id,
        state,
        version,
        repository,
        clock,
    };

    while let Some(envelope) = receiver.recv().await {
        let CommandEnvelope {
            command,
            correlation_id,
            reply_to,
        } = envelope;

        match worker.handle(&command, correlation_id).await {
            Ok(Some(reply)) if reply.stops_instance() => {
                // Closed before the acknowledgement so callers that see it
                // also see this worker as gone.
                receiver.close();
                answer(reply_to, Ok(reply));
                info!(%account_id, "account worker stopped on request");
                refuse_queued(&mut receiver, &AccountError::Unavailable(account_id)).await;
                return Ok(());
            }
            Ok(Some(reply)) => answer(reply_to, Ok(reply)),
            Ok(None) if worker.state.account().is_none() => {
                receiver.close();
                drop(reply_to);
                debug!(%account_id, "account never created, passivating worker");
                refuse_queued(&mut receiver, &AccountError::Unavailable(account_id)).await;
                return Ok(());
            }
            Ok(None) => drop(reply_to),
            Err(err) => {
                receiver.close();
                error!(%account_id, error = %err, "halting account worker");
                answer(reply_to, Err(err.clone()));
                refuse_queued(&mut receiver, &err).await;
                return Err(err);
            }
        }
    }

    trace!(%account_id, "all handles dropped, stopping account worker");
    Ok(())
}

/// Closes the queue and answers every command still in it with `reason`.
async fn refuse_queued(receiver: &mut mpsc::Receiver<CommandEnvelope>, reason: &AccountError) {
    receiver.close();
    while let Some(envelope) = receiver.recv().await {
        trace!(
            command = envelope.command.command_type(),
            %reason,
            "refusing queued command"
        );
        answer(envelope.reply_to, Err(reason.clone()));
    }
}

fn answer(reply_to: ReplyTo, answer: Answer) {
    if reply_to.send(answer).is_err() {
        trace!("reply destination gone before the answer was sent");
    }
}

struct AccountWorker {
    account_id: BankAccountId,
    state: AggregateState,
    version: i64,
    repository: Arc<dyn EventRepository>,
    clock: Arc<dyn Clock>,
}

impl AccountWorker {
    /// Decides `command` and persists its event. `None` means the command
    /// gets no reply.
    async fn handle(
        &mut self,
        command: &BankAccountCommand,
        correlation_id: Uuid,
    ) -> Result<Option<BankAccountReply>, AccountError> {
        if command.account_id() != self.account_id {
            warn!(
                account_id = %self.account_id,
                addressed_to = %command.account_id(),
                command = command.command_type(),
                "command addressed to another account, dropping"
            );
            return Ok(None);
        }

        match decide(&self.state, command, self.clock.as_ref()) {
            Decision::PersistAndReply { event, reply } => {
                let sequence_number = self.version + 1;
                let stored = StoredEvent::encode(&event, sequence_number, correlation_id)?;
                self.repository
                    .append_events(
                        self.account_id.as_uuid(),
                        self.version,
                        std::slice::from_ref(&stored),
                    )
                    .await?;
                self.state = self.state.apply_event(&event)?;
                self.version = sequence_number;
                debug!(
                    account_id = %self.account_id,
                    event_type = event.event_type(),
                    sequence_number,
                    %correlation_id,
                    "event persisted"
                );
                Ok(Some(reply))
            }
            Decision::RejectAndReply(reply) => {
                debug!(
                    account_id = %self.account_id,
                    command = command.command_type(),
                    reason = reply.error().map(|e| e.code()),
                    "command rejected"
                );
                Ok(Some(reply))
            }
            Decision::ReadAndReply(reply) => Ok(Some(reply)),
            Decision::Unhandled => {
                debug!(
                    account_id = %self.account_id,
                    command = command.command_type(),
                    state = self.state.state_name(),
                    "command unhandled, no reply"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use futures::stream;
    use tally_core::error::DomainError;
    use tally_core::repository::EventStream;
    use tally_event_store::in_memory_event_repository::InMemoryEventRepository;
    use tally_test_support::{
        FailingEventRepository, FixedClock, RecordingEventRepository, SteppingClock,
        UnwritableEventRepository,
    };

    use super::*;
    use crate::domain::errors::BankAccountError;
    use crate::domain::events::{BankAccountEvent, CashWithdrew};

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        ))
    }

    fn spawn(repository: Arc<dyn EventRepository>) -> AccountHandle {
        let (handle, _task) = spawn_account_worker(
            BankAccountId::generate(),
            repository,
            clock(),
            &RuntimeConfig::default(),
        );
        handle
    }

    #[tokio::test]
    async fn test_reference_scenario_end_to_end() {
        // Arrange
        let repository = Arc::new(InMemoryEventRepository::new());
        let handle = spawn(repository.clone());
        let account_id = handle.account_id();

        // Act + Assert
        assert_eq!(
            handle.create(Money::yens(100_000), Money::yens(0)).await.unwrap(),
            CreateReply::Succeeded { account_id }
        );
        assert_eq!(
            handle.deposit_cash(Money::yens(50_000)).await.unwrap(),
            DepositCashReply::Succeeded {
                account_id,
                amount: Money::yens(50_000),
            }
        );
        assert_eq!(
            handle.deposit_cash(Money::yens(60_000)).await.unwrap(),
            DepositCashReply::Failed {
                account_id,
                error: BankAccountError::LimitOver,
            }
        );
        assert_eq!(
            handle.withdraw_cash(Money::yens(20_000)).await.unwrap(),
            WithdrawCashReply::Succeeded {
                account_id,
                amount: Money::yens(20_000),
            }
        );
        assert_eq!(
            handle.withdraw_cash(Money::yens(40_000)).await.unwrap(),
            WithdrawCashReply::Failed {
                account_id,
                error: BankAccountError::InsufficientFunds,
            }
        );
        assert_eq!(
            handle.get_balance().await.unwrap(),
            GetBalanceReply::Succeeded {
                account_id,
                balance: Money::yens(30_000),
            }
        );

        // Only the accepted movements reached the journal.
        assert_eq!(repository.event_count(account_id.as_uuid()), 3);
    }

    #[tokio::test]
    async fn test_state_survives_a_restart_through_replay() {
        // Arrange
        let repository: Arc<dyn EventRepository> = Arc::new(InMemoryEventRepository::new());
        let account_id = BankAccountId::generate();
        let config = RuntimeConfig::default();
        let (first, task) = spawn_account_worker(account_id, repository.clone(), clock(), &config);
        first.create(Money::yens(100_000), Money::yens(0)).await.unwrap();
        first.deposit_cash(Money::yens(1_234)).await.unwrap();
        assert_eq!(
            first.stop().await.unwrap(),
            StopReply::Succeeded { account_id }
        );
        task.await.unwrap().unwrap();

        // Act
        let (second, _task) = spawn_account_worker(account_id, repository, clock(), &config);

        // Assert
        assert_eq!(
            second.get_balance().await.unwrap(),
            GetBalanceReply::Succeeded {
                account_id,
                balance: Money::yens(1_234),
            }
        );
        assert!(first.is_closed());
    }

    #[tokio::test]
    async fn test_unhandled_command_on_a_new_account_passivates_the_worker() {
        // Arrange
        let (handle, task) = spawn_account_worker(
            BankAccountId::generate(),
            Arc::new(InMemoryEventRepository::new()),
            clock(),
            &RuntimeConfig::default(),
        );

        // Act: deposit before the account exists.
        let result = handle.deposit_cash(Money::yens(1)).await;

        // Assert
        assert!(matches!(result, Err(AccountError::NoReply(_))));
        task.await.unwrap().unwrap();
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_commands_queued_behind_stop_are_refused_undecided() {
        // Arrange
        let repository = Arc::new(InMemoryEventRepository::new());
        let handle = spawn(repository.clone());
        let account_id = handle.account_id();
        handle.create(Money::yens(1_000), Money::yens(0)).await.unwrap();

        // Act
        let (stopped, deposited) =
            tokio::join!(handle.stop(), handle.deposit_cash(Money::yens(5)));

        // Assert
        assert_eq!(stopped.unwrap(), StopReply::Succeeded { account_id });
        assert!(matches!(deposited, Err(AccountError::Unavailable(id)) if id == account_id));
        assert_eq!(repository.event_count(account_id.as_uuid()), 1);
    }

    #[tokio::test]
    async fn test_events_are_appended_at_the_next_version_with_their_tag() {
        // Arrange
        let repository = Arc::new(RecordingEventRepository::new(Vec::new()));
        let opened_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let (handle, _task) = spawn_account_worker(
            BankAccountId::generate(),
            repository.clone(),
            Arc::new(SteppingClock::new(opened_at, chrono::Duration::seconds(1))),
            &RuntimeConfig::default(),
        );
        let account_id = handle.account_id();

        // Act
        handle.create(Money::yens(1_000), Money::yens(0)).await.unwrap();
        handle.deposit_cash(Money::yens(300)).await.unwrap();

        // Assert
        let appended = repository.appended_events();
        assert_eq!(appended.len(), 2);
        let (aggregate_id, expected_version, events) = &appended[1];
        assert_eq!(*aggregate_id, account_id.as_uuid());
        assert_eq!(*expected_version, 1);
        assert_eq!(events[0].sequence_number, 2);
        assert_eq!(events[0].aggregate_type, BankAccountId::AGGREGATE_TYPE_NAME);
        assert_eq!(events[0].event_type, "bank_account.cash_deposited");
        assert_eq!(appended[0].2[0].occurred_at, opened_at);
        assert_eq!(
            events[0].occurred_at,
            opened_at + chrono::Duration::seconds(1)
        );
    }

    #[tokio::test]
    async fn test_second_create_is_unhandled() {
        let handle = spawn(Arc::new(InMemoryEventRepository::new()));
        handle.create(Money::yens(10), Money::yens(0)).await.unwrap();

        let result = handle.create(Money::yens(10), Money::yens(0)).await;

        assert!(matches!(result, Err(AccountError::NoReply(_))));
    }

    #[tokio::test]
    async fn test_persistence_failure_is_reported_and_halts() {
        // Arrange
        let account_id = BankAccountId::generate();
        let (handle, task) = spawn_account_worker(
            account_id,
            Arc::new(UnwritableEventRepository::new(Vec::new())),
            clock(),
            &RuntimeConfig::default(),
        );

        // Act
        let result = handle.create(Money::yens(10), Money::yens(0)).await;

        // Assert: the caller learns why, and never sees a success.
        assert!(matches!(
            result,
            Err(AccountError::Domain(DomainError::Infrastructure(_)))
        ));
        assert!(matches!(
            task.await.unwrap(),
            Err(AccountError::Domain(DomainError::Infrastructure(_)))
        ));
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn test_replay_failure_is_reported_to_queued_commands() {
        // Arrange
        let (handle, task) = spawn_account_worker(
            BankAccountId::generate(),
            Arc::new(FailingEventRepository),
            clock(),
            &RuntimeConfig::default(),
        );

        // Act: queued before the worker has replayed.
        let result = handle.get_balance().await;

        // Assert
        assert!(matches!(
            result,
            Err(AccountError::Domain(DomainError::Infrastructure(_)))
        ));
        assert!(task.await.unwrap().is_err());
    }

    #[tokio::test]
    async fn test_replay_failure_halts_the_worker() {
        let (handle, task) = spawn_account_worker(
            BankAccountId::generate(),
            Arc::new(FailingEventRepository),
            clock(),
            &RuntimeConfig::default(),
        );

        assert!(task.await.unwrap().is_err());
        assert!(matches!(
            handle.get_balance().await,
            Err(AccountError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_illegal_history_is_escalated_as_fault() {
        // Arrange: a withdrawal recorded on an account that was never created.
        let account_id = BankAccountId::generate();
        let event = BankAccountEvent::CashWithdrew(CashWithdrew {
            account_id,
            amount: Money::yens(1),
            occurred_at: Utc::now(),
        });
        let stored = StoredEvent::encode(&event, 1, Uuid::new_v4()).unwrap();

        // Act
        let (_handle, task) = spawn_account_worker(
            account_id,
            Arc::new(UnwritableEventRepository::new(vec![stored])),
            clock(),
            &RuntimeConfig::default(),
        );

        // Assert
        assert!(matches!(task.await.unwrap(), Err(AccountError::Fault(_))));
    }

    /// Journal whose append never completes.
    struct StalledEventRepository;

    #[async_trait]
    impl EventRepository for StalledEventRepository {
        fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
            Box::pin(stream::empty())
        }

        async fn append_events(
            &self,
            _aggregate_id: Uuid,
            _expected_version: i64,
            _events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            futures::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_reply_waits_for_persistence_and_times_out() {
        // Arrange
        let config = RuntimeConfig {
            reply_timeout: Duration::from_millis(50),
            ..RuntimeConfig::default()
        };
        let (handle, _task) = spawn_account_worker(
            BankAccountId::generate(),
            Arc::new(StalledEventRepository),
            clock(),
            &config,
        );

        // Act
        let result = handle.create(Money::yens(10), Money::yens(0)).await;

        // Assert
        assert!(matches!(result, Err(AccountError::Timeout { .. })));
    }

    /// Journal that records the order appends arrive in.
    #[derive(Default)]
    struct OrderedEventRepository {
        appended: Mutex<Vec<(i64, i64)>>,
    }

    #[async_trait]
    impl EventRepository for OrderedEventRepository {
        fn load_events(&self, _aggregate_id: Uuid) -> EventStream<'_> {
            Box::pin(stream::empty())
        }

        async fn append_events(
            &self,
            _aggregate_id: Uuid,
            expected_version: i64,
            events: &[StoredEvent],
        ) -> Result<(), DomainError> {
            tokio::task::yield_now().await;
            let mut appended = self.appended.lock().unwrap();
            for event in events {
                appended.push((expected_version, event.sequence_number));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_callers_are_serialized() {
        // Arrange
        let repository = Arc::new(OrderedEventRepository::default());
        let handle = spawn(repository.clone());
        handle.create(Money::yens(1_000), Money::yens(0)).await.unwrap();

        // Act
        let deposits = (0..10).map(|_| {
            let handle = handle.clone();
            tokio::spawn(async move { handle.deposit_cash(Money::yens(10)).await })
        });
        for deposit in deposits.collect::<Vec<_>>() {
            let reply = deposit.await.unwrap().unwrap();
            assert!(matches!(reply, DepositCashReply::Succeeded { .. }));
        }

        // Assert
        let appended = repository.appended.lock().unwrap().clone();
        let expected: Vec<(i64, i64)> = (0..11).map(|v| (v, v + 1)).collect();
        assert_eq!(appended, expected);
        assert_eq!(
            handle.get_balance().await.unwrap(),
            GetBalanceReply::Succeeded {
                account_id: handle.account_id(),
                balance: Money::yens(100),
            }
        );
    }

    #[test]
    fn test_expect_reply_reports_mismatch() {
        let account_id = BankAccountId::generate();

        let result: Result<CreateReply, _> =
            expect_reply(StopReply::Succeeded { account_id }.into(), "create");

        assert!(matches!(
            result,
            Err(AccountError::ReplyMismatch {
                expected: "create",
                actual: "stop"
            })
        ));
    }
}
