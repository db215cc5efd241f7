//! In-memory scheduler and fetcher for driving a [`ButtonPoller`](super::ButtonPoller)
//! without an event loop.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::time::Duration;

use super::{FetchTicket, Fetcher, Scheduler, TimerHandle, TimerKey, TimerKind};
use crate::{pipeline::PipelineRequest, settings::InstanceId, Error, Result};

#[derive(Debug, Clone)]
struct Scheduled {
    id: u64,
    key: TimerKey,
    delay: Duration,
    due: Duration,
}

#[derive(Debug, Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    pending: Vec<Scheduled>,
    cancelled: HashSet<u64>,
    history: Vec<Scheduled>,
}

/// Scheduler on a virtual clock that only moves when told to.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    state: Rc<RefCell<ManualState>>,
}

/// Handle returned by [`ManualScheduler`].
#[derive(Debug)]
pub struct ManualTimer {
    id: u64,
    state: Rc<RefCell<ManualState>>,
}

impl TimerHandle for ManualTimer {
    fn cancel(self) {
        let mut state = self.state.borrow_mut();
        state.pending.retain(|entry| entry.id != self.id);
        state.cancelled.insert(self.id);
    }
}

impl Scheduler for ManualScheduler {
    type Timer = ManualTimer;

    fn schedule(&mut self, key: TimerKey, delay: Duration) -> Result<ManualTimer> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let entry = Scheduled {
            id: state.next_id,
            key,
            delay,
            due: state.now + delay,
        };
        state.pending.push(entry.clone());
        state.history.push(entry);
        Ok(ManualTimer {
            id: state.next_id,
            state: self.state.clone(),
        })
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward and return the keys of timers that came due, earliest first.
    pub fn advance(&mut self, by: Duration) -> Vec<TimerKey> {
        let mut state = self.state.borrow_mut();
        state.now += by;
        let now = state.now;
        let mut due: Vec<Scheduled> = Vec::new();
        state.pending.retain(|entry| {
            if entry.due <= now {
                due.push(entry.clone());
                false
            } else {
                true
            }
        });
        due.sort_by_key(|entry| (entry.due, entry.id));
        due.into_iter().map(|entry| entry.key).collect()
    }

    /// Timers scheduled and neither cancelled nor fired.
    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Pending timers of `kind` for `instance`, with their delays.
    pub fn pending_for(&self, instance: &InstanceId, kind: TimerKind) -> Vec<Duration> {
        self.state
            .borrow()
            .pending
            .iter()
            .filter(|entry| &entry.key.instance == instance && entry.key.kind == kind)
            .map(|entry| entry.delay)
            .collect()
    }

    pub fn cancelled(&self) -> usize {
        self.state.borrow().cancelled.len()
    }

    /// Every timer ever scheduled, in order.
    pub fn scheduled(&self) -> usize {
        self.state.borrow().history.len()
    }

    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }
}

/// Fetcher that records requests and leaves completion to the test.
#[derive(Debug, Default)]
pub struct RecordingFetcher {
    pending: Vec<(FetchTicket, PipelineRequest)>,
    dispatched: usize,
    refuse: bool,
}

impl RecordingFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make dispatch itself fail, as when a worker cannot be started.
    pub fn refuse_dispatch(&mut self, refuse: bool) {
        self.refuse = refuse;
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    pub fn pending(&self) -> &[(FetchTicket, PipelineRequest)] {
        &self.pending
    }

    pub fn take_pending(&mut self) -> Vec<(FetchTicket, PipelineRequest)> {
        std::mem::take(&mut self.pending)
    }

    /// Take the most recent outstanding request for `instance`.
    pub fn take_for(&mut self, instance: &InstanceId) -> Option<(FetchTicket, PipelineRequest)> {
        let idx = self
            .pending
            .iter()
            .rposition(|(ticket, _)| &ticket.instance == instance)?;
        Some(self.pending.remove(idx))
    }
}

impl Fetcher for RecordingFetcher {
    fn dispatch(&mut self, ticket: FetchTicket, request: PipelineRequest) -> Result<()> {
        if self.refuse {
            return Err(Error::Io(std::io::Error::other("worker unavailable")));
        }
        self.dispatched += 1;
        self.pending.push((ticket, request));
        Ok(())
    }
}
