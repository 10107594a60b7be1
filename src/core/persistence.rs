//! Background dispatch of month writes.
//!
//! Writes are queued to a single writer thread in the order they were made,
//! so the last write of a month wins. The caller never waits on storage unless
//! it asks to with [`PersistenceWriter::flush`].

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, warn};

use crate::domain::{BudgetMonth, MonthId};
use crate::storage::MonthStorage;

/// Completion records kept before the oldest are dropped.
pub const EVENT_LOG_CAPACITY: usize = 256;

/// How month writes are retried. The default sends each write once and only
/// records a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PersistencePolicy {
    pub retry_attempts: u32,
}

impl PersistencePolicy {
    pub fn fire_and_forget() -> Self {
        Self::default()
    }

    pub fn with_retries(retry_attempts: u32) -> Self {
        Self { retry_attempts }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceOutcome {
    Saved { attempts: u32 },
    Failed { attempts: u32, error: String },
}

/// Completion record of one dispatched month write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceEvent {
    pub month_id: MonthId,
    pub outcome: PersistenceOutcome,
}

impl PersistenceEvent {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, PersistenceOutcome::Failed { .. })
    }
}

enum Job {
    Save(BudgetMonth),
    Flush(Sender<()>),
}

type EventLog = Arc<Mutex<VecDeque<PersistenceEvent>>>;

/// State shared between the caller and the writer thread.
struct Shared {
    user_id: String,
    storage: Arc<dyn MonthStorage>,
    retry_attempts: AtomicU32,
    events: EventLog,
}

pub(crate) struct PersistenceWriter {
    shared: Arc<Shared>,
    sender: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl PersistenceWriter {
    pub(crate) fn spawn(user_id: String, storage: Arc<dyn MonthStorage>) -> Self {
        let shared = Arc::new(Shared {
            user_id,
            storage,
            retry_attempts: AtomicU32::new(0),
            events: Arc::new(Mutex::new(VecDeque::new())),
        });
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker_state = Arc::clone(&shared);
        let spawned = thread::Builder::new()
            .name("month-writer".into())
            .spawn(move || {
                for job in receiver {
                    match job {
                        Job::Save(month) => write_month(&worker_state, &month),
                        Job::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
            });
        match spawned {
            Ok(worker) => Self {
                shared,
                sender: Some(sender),
                worker: Some(worker),
            },
            Err(err) => {
                warn!(error = %err, "month writer thread unavailable, writing inline");
                Self {
                    shared,
                    sender: None,
                    worker: None,
                }
            }
        }
    }

    pub(crate) fn storage(&self) -> &dyn MonthStorage {
        self.shared.storage.as_ref()
    }

    pub(crate) fn policy(&self) -> PersistencePolicy {
        PersistencePolicy::with_retries(self.shared.retry_attempts.load(Ordering::SeqCst))
    }

    pub(crate) fn set_policy(&self, policy: PersistencePolicy) {
        self.shared
            .retry_attempts
            .store(policy.retry_attempts, Ordering::SeqCst);
    }

    /// Queues a write and returns immediately.
    pub(crate) fn dispatch(&self, month: BudgetMonth) {
        let month = match &self.sender {
            Some(sender) => match sender.send(Job::Save(month)) {
                Ok(()) => return,
                Err(mpsc::SendError(job)) => match job {
                    Job::Save(month) => month,
                    Job::Flush(_) => return,
                },
            },
            None => month,
        };
        write_month(&self.shared, &month);
    }

    /// Blocks until every write queued so far has completed.
    pub(crate) fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (ack, done) = mpsc::channel();
        if sender.send(Job::Flush(ack)).is_ok() {
            let _ = done.recv();
        }
    }

    /// Waits for queued writes, then drains the completion log.
    pub(crate) fn take_events(&self) -> Vec<PersistenceEvent> {
        self.flush();
        lock(&self.shared.events).drain(..).collect()
    }
}

impl Drop for PersistenceWriter {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("month writer thread panicked");
            }
        }
    }
}

fn write_month(shared: &Shared, month: &BudgetMonth) {
    let allowed = shared
        .retry_attempts
        .load(Ordering::SeqCst)
        .saturating_add(1);
    let mut attempts = 0;
    let outcome = loop {
        attempts += 1;
        match shared.storage.save_month(&shared.user_id, month.id, month) {
            Ok(()) => break PersistenceOutcome::Saved { attempts },
            Err(err) if attempts < allowed => {
                debug!(month = %month.id, attempts, error = %err, "retrying month write");
            }
            Err(err) => {
                warn!(month = %month.id, attempts, error = %err, "month write failed");
                break PersistenceOutcome::Failed {
                    attempts,
                    error: err.to_string(),
                };
            }
        }
    };
    record_event(
        &shared.events,
        PersistenceEvent {
            month_id: month.id,
            outcome,
        },
    );
}

fn record_event(log: &Mutex<VecDeque<PersistenceEvent>>, event: PersistenceEvent) {
    let mut events = lock(log);
    if events.len() == EVENT_LOG_CAPACITY {
        if let Some(dropped) = events.pop_front() {
            debug!(month = %dropped.month_id, "persistence event log full, dropping oldest");
        }
    }
    events.push_back(event);
}

fn lock(log: &Mutex<VecDeque<PersistenceEvent>>) -> MutexGuard<'_, VecDeque<PersistenceEvent>> {
    log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn event(month: &str) -> PersistenceEvent {
        PersistenceEvent {
            month_id: month.parse().unwrap(),
            outcome: PersistenceOutcome::Saved { attempts: 1 },
        }
    }

    #[test]
    fn event_log_keeps_only_the_newest_entries() {
        let log = Mutex::new(VecDeque::new());
        record_event(&log, event("2024-01"));
        for _ in 0..EVENT_LOG_CAPACITY {
            record_event(&log, event("2025-01"));
        }
        let events = lock(&log);
        assert_eq!(events.len(), EVENT_LOG_CAPACITY);
        assert!(events.iter().all(|e| e.month_id.to_string() == "2025-01"));
    }

    #[test]
    fn writes_complete_in_dispatch_order() {
        let storage = MemoryStorage::new();
        let writer = PersistenceWriter::spawn("tester".into(), Arc::new(storage.clone()));
        let id: MonthId = "2025-03".parse().unwrap();
        let mut month = BudgetMonth::empty(id);
        for debt in 1..=20 {
            month.starting_credit_card_debt = debt.into();
            writer.dispatch(month.clone());
        }
        let events = writer.take_events();
        assert_eq!(events.len(), 20);
        assert_eq!(storage.save_count(), 20);
        assert_eq!(storage.month("tester", id), Some(month));
    }

    #[test]
    fn dropping_the_writer_finishes_queued_writes() {
        let storage = MemoryStorage::new();
        let writer = PersistenceWriter::spawn("tester".into(), Arc::new(storage.clone()));
        writer.dispatch(BudgetMonth::empty("2025-04".parse().unwrap()));
        drop(writer);
        assert_eq!(storage.save_count(), 1);
    }
}
