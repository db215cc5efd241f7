//! Per-button polling state machine.
//!
//! Every visible button instance gets its own entry: the settings it was last
//! given, an optional in-flight fetch, and (in the [`InstanceRegistry`]) its
//! press and refresh timers. Nothing is shared between instances.

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveTime;

use crate::{
    host::{Host, HostEvent},
    pipeline::{PipelineRequest, StageStatus},
    settings::{ButtonConfig, InstanceId},
    FetchFailureKind, Result,
};

pub mod cycle;
pub mod fake;
pub mod press;
pub mod registry;

pub use press::{PressPhase, PressRelease};
pub use registry::{InstanceRegistry, TimerHandle, TimerKey, TimerKind};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(1300);

/// Creates timers that are later delivered back through [`ButtonPoller::on_timer`].
pub trait Scheduler {
    type Timer: TimerHandle;

    fn schedule(&mut self, key: TimerKey, delay: Duration) -> Result<Self::Timer>;
}

/// Starts pipeline fetches whose results come back through [`ButtonPoller::complete`].
pub trait Fetcher {
    fn dispatch(&mut self, ticket: FetchTicket, request: PipelineRequest) -> Result<()>;
}

/// Identifies one dispatched fetch so its completion can be matched to the instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTicket {
    pub instance: InstanceId,
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub refresh_interval: Duration,
    pub long_press: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            long_press: DEFAULT_LONG_PRESS,
        }
    }
}

/// What a poll step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Settings incomplete; placeholder shown, nothing fetched.
    NotConfigured,
    /// A fetch for this instance is still outstanding; this poll was dropped.
    AlreadyInFlight,
    Dispatched,
    /// Every stage succeeded; refreshing stopped.
    Settled,
    /// Some stage is not done; refresh timer armed.
    Refreshing,
    Failed(FetchFailureKind),
    /// The result belonged to a fetch this instance no longer waits for.
    Stale,
    /// The instance is not visible.
    Unknown,
}

struct InstanceState {
    config: ButtonConfig,
    in_flight: Option<u64>,
    last_icon_crc: Option<u32>,
}

impl InstanceState {
    fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            in_flight: None,
            last_icon_crc: None,
        }
    }
}

fn local_clock() -> NaiveTime {
    chrono::Local::now().time()
}

pub struct ButtonPoller<H, S, F>
where
    H: Host,
    S: Scheduler,
    F: Fetcher,
{
    host: H,
    scheduler: S,
    fetcher: F,
    registry: InstanceRegistry<S::Timer>,
    instances: HashMap<InstanceId, InstanceState>,
    timings: Timings,
    next_ticket: u64,
    clock: fn() -> NaiveTime,
}

impl<H, S, F> ButtonPoller<H, S, F>
where
    H: Host,
    S: Scheduler,
    F: Fetcher,
{
    pub fn new(host: H, scheduler: S, fetcher: F, timings: Timings) -> Self {
        Self {
            host,
            scheduler,
            fetcher,
            registry: InstanceRegistry::new(),
            instances: HashMap::new(),
            timings,
            next_ticket: 0,
            clock: local_clock,
        }
    }

    /// Replace the wall clock used for the "last refreshed" caption.
    pub fn with_clock(mut self, clock: fn() -> NaiveTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn handle_event(&mut self, event: HostEvent) -> Result<()> {
        let kind = event.kind();
        match event {
            HostEvent::Activate { instance, settings } => {
                let outcome = self.activate(&instance, settings)?;
                log::debug!("{instance}: {kind} -> {outcome:?}");
            }
            HostEvent::Deactivate { instance } => self.deactivate(&instance),
            HostEvent::PressDown { instance, settings } => {
                let outcome = self.press_down(&instance, settings)?;
                log::debug!("{instance}: {kind} -> {outcome:?}");
            }
            HostEvent::PressUp { instance, .. } => {
                let release = self.press_up(&instance);
                log::debug!("{instance}: {kind} -> {release:?}");
            }
            HostEvent::SettingsChanged { instance, settings } => {
                let outcome = self.settings_changed(&instance, settings)?;
                log::debug!("{instance}: {kind} -> {outcome:?}");
            }
            HostEvent::PluginMessage { instance, payload } => {
                log::debug!(
                    "plugin message for {}: {payload}",
                    instance.as_ref().map(InstanceId::as_str).unwrap_or("-")
                );
            }
        }
        Ok(())
    }

    /// The instance became visible: remember its settings and poll once.
    pub fn activate(&mut self, instance: &InstanceId, settings: ButtonConfig) -> Result<PollOutcome> {
        self.upsert(instance, settings);
        self.poll(instance)
    }

    /// The instance is gone: cancel its timers and drop its state.
    pub fn deactivate(&mut self, instance: &InstanceId) {
        self.registry.disarm_all(instance);
        if self.instances.remove(instance).is_some() {
            log::debug!("{instance}: deactivated");
        }
    }

    /// Store and echo new settings, then poll so the icon reflects them.
    pub fn settings_changed(
        &mut self,
        instance: &InstanceId,
        settings: ButtonConfig,
    ) -> Result<PollOutcome> {
        self.host.persist_settings(instance, &settings)?;
        if self.upsert(instance, settings) {
            // A fetch started with the old settings must not paint over the new ones.
            if let Some(state) = self.instances.get_mut(instance) {
                state.in_flight = None;
            }
        }
        self.poll(instance)
    }

    /// Deliver a timer created by the scheduler.
    pub fn on_timer(&mut self, key: TimerKey) -> Result<()> {
        if !self.registry.fired(&key) {
            log::trace!(
                "{}: ignoring stale {} timer #{}",
                key.instance,
                key.kind.as_str(),
                key.serial
            );
            return Ok(());
        }
        match key.kind {
            TimerKind::Press => self.long_press(&key.instance),
            TimerKind::Refresh => {
                let outcome = self.poll(&key.instance)?;
                log::debug!("{}: scheduled refresh -> {outcome:?}", key.instance);
                Ok(())
            }
        }
    }

    pub fn is_active(&self, instance: &InstanceId) -> bool {
        self.instances.contains_key(instance)
    }

    pub fn active_instances(&self) -> usize {
        self.instances.len()
    }

    pub fn in_flight(&self, instance: &InstanceId) -> bool {
        self.instances
            .get(instance)
            .map(|state| state.in_flight.is_some())
            .unwrap_or(false)
    }

    pub fn config(&self, instance: &InstanceId) -> Option<&ButtonConfig> {
        self.instances.get(instance).map(|state| &state.config)
    }

    pub fn registry(&self) -> &InstanceRegistry<S::Timer> {
        &self.registry
    }

    pub fn timings(&self) -> Timings {
        self.timings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn fetcher_mut(&mut self) -> &mut F {
        &mut self.fetcher
    }

    /// Insert or update an instance's settings. Returns true when they changed.
    fn upsert(&mut self, instance: &InstanceId, settings: ButtonConfig) -> bool {
        match self.instances.get_mut(instance) {
            Some(state) if state.config == settings => false,
            Some(state) => {
                state.config = settings;
                true
            }
            None => {
                log::debug!("{instance}: tracking new instance");
                self.instances
                    .insert(instance.clone(), InstanceState::new(settings));
                true
            }
        }
    }

    /// Schedule a timer of `kind`, cancelling the previous one first.
    fn arm(&mut self, instance: &InstanceId, kind: TimerKind, delay: Duration) -> Result<()> {
        self.registry.disarm(instance, kind);
        let key = self.registry.key(instance, kind);
        let timer = self.scheduler.schedule(key.clone(), delay)?;
        self.registry.arm(key, timer);
        Ok(())
    }
}

/// Statuses carried by a completed fetch.
pub type FetchResult = Result<Vec<StageStatus>>;
