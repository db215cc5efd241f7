//! calloop glue: timers, fetch workers and the stdin reader feed one
//! single-threaded loop that owns the [`ButtonPoller`].

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use calloop::{
    channel::{self, Channel, Event, Sender},
    timer::{TimeoutAction, Timer},
    EventLoop, LoopHandle, LoopSignal, RegistrationToken,
};

use crate::{
    host::{EventBridge, Host, StdioHost},
    pipeline::{PipelineClient, PipelineRequest},
    poller::{
        ButtonPoller, FetchResult, FetchTicket, Fetcher, Scheduler, TimerHandle, TimerKey, Timings,
    },
    Error, Result,
};

/// A fetch result travelling back from a worker thread.
#[derive(Debug)]
pub struct FetchCompletion {
    pub ticket: FetchTicket,
    pub result: FetchResult,
}

/// Schedules one-shot calloop timers that call back into [`PluginState::on_timer`].
pub struct CalloopScheduler<H: Host + 'static> {
    handle: LoopHandle<'static, PluginState<H>>,
}

pub struct CalloopTimer<H: Host + 'static> {
    handle: LoopHandle<'static, PluginState<H>>,
    token: RegistrationToken,
}

impl<H: Host + 'static> TimerHandle for CalloopTimer<H> {
    fn cancel(self) {
        self.handle.remove(self.token);
    }
}

impl<H: Host + 'static> Scheduler for CalloopScheduler<H> {
    type Timer = CalloopTimer<H>;

    fn schedule(&mut self, key: TimerKey, delay: Duration) -> Result<CalloopTimer<H>> {
        let token = self
            .handle
            .insert_source(Timer::from_duration(delay), move |_deadline, _, state| {
                state.on_timer(key.clone());
                TimeoutAction::Drop
            })
            .map_err(|e| Error::EventLoop(format!("cannot arm timer: {}", e.error)))?;
        Ok(CalloopTimer {
            handle: self.handle.clone(),
            token,
        })
    }
}

/// Runs each fetch on its own short-lived thread.
pub struct ThreadFetcher {
    client: Arc<dyn PipelineClient>,
    completions: Sender<FetchCompletion>,
}

impl ThreadFetcher {
    pub fn new(client: Arc<dyn PipelineClient>, completions: Sender<FetchCompletion>) -> Self {
        Self {
            client,
            completions,
        }
    }
}

impl Fetcher for ThreadFetcher {
    fn dispatch(&mut self, ticket: FetchTicket, request: PipelineRequest) -> Result<()> {
        let client = self.client.clone();
        let completions = self.completions.clone();
        thread::Builder::new()
            .name(format!("pipeline-fetch-{}", ticket.id))
            .spawn(move || {
                let result = client.pipeline_state(&request);
                // The loop may already be gone; nothing left to deliver to.
                let _ = completions.send(FetchCompletion { ticket, result });
            })?;
        Ok(())
    }
}

pub type LoopPoller<H> = ButtonPoller<H, CalloopScheduler<H>, ThreadFetcher>;

/// Everything the event loop callbacks can reach.
pub struct PluginState<H: Host + 'static> {
    poller: LoopPoller<H>,
    bridge: EventBridge,
    signal: LoopSignal,
    failure: Option<Error>,
}

impl<H: Host + 'static> PluginState<H> {
    fn on_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let event = match self.bridge.ingest_line(line) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(err) => {
                log::warn!("skipping host message: {err}");
                return;
            }
        };
        let result = self.poller.handle_event(event);
        self.check(result);
    }

    fn on_timer(&mut self, key: TimerKey) {
        let result = self.poller.on_timer(key);
        self.check(result);
    }

    fn on_completion(&mut self, completion: FetchCompletion) {
        let result = self
            .poller
            .complete(completion.ticket, completion.result)
            .map(|_| ());
        self.check(result);
    }

    /// Errors reaching here mean the host channel is broken; stop the loop.
    fn check(&mut self, result: Result<()>) {
        if let Err(err) = result {
            log::error!("host connection lost: {err}");
            if self.failure.is_none() {
                self.failure = Some(err);
            }
            self.signal.stop();
        }
    }
}

/// Spawn the thread that forwards host lines from `input` into the loop.
/// The channel closes when `input` reaches EOF.
pub fn spawn_line_reader<R>(input: R) -> Result<Channel<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = channel::channel();
    thread::Builder::new()
        .name("pipeline-deck-stdin".into())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::error!("reading host input failed: {err}");
                        break;
                    }
                }
            }
        })?;
    Ok(rx)
}

/// The event loop together with the state its callbacks drive.
pub struct Runtime<H: Host + 'static> {
    event_loop: EventLoop<'static, PluginState<H>>,
    state: PluginState<H>,
}

impl<H: Host + 'static> Runtime<H> {
    pub fn new(
        host: H,
        lines: Channel<String>,
        client: Arc<dyn PipelineClient>,
        bridge: EventBridge,
        timings: Timings,
    ) -> Result<Self> {
        let event_loop: EventLoop<'static, PluginState<H>> = EventLoop::try_new()
            .map_err(|e| Error::EventLoop(format!("cannot create event loop: {e}")))?;
        let handle = event_loop.handle();
        let signal = event_loop.get_signal();

        let (completion_tx, completion_rx) = channel::channel::<FetchCompletion>();
        handle
            .insert_source(completion_rx, |event, _, state| {
                if let Event::Msg(completion) = event {
                    state.on_completion(completion);
                }
            })
            .map_err(|e| Error::EventLoop(format!("cannot watch fetch results: {}", e.error)))?;
        handle
            .insert_source(lines, |event, _, state| match event {
                Event::Msg(line) => state.on_line(&line),
                Event::Closed => {
                    log::info!("host input closed, shutting down");
                    state.signal.stop();
                }
            })
            .map_err(|e| Error::EventLoop(format!("cannot watch host input: {}", e.error)))?;

        let scheduler = CalloopScheduler {
            handle: handle.clone(),
        };
        let fetcher = ThreadFetcher::new(client, completion_tx);
        let state = PluginState {
            poller: ButtonPoller::new(host, scheduler, fetcher, timings),
            bridge,
            signal,
            failure: None,
        };
        Ok(Self { event_loop, state })
    }

    pub fn signal(&self) -> LoopSignal {
        self.event_loop.get_signal()
    }

    /// Drive the poller until the input closes, the loop is stopped, or the host breaks.
    pub fn run(mut self) -> Result<()> {
        self.event_loop
            .run(None::<Duration>, &mut self.state, |_| {})
            .map_err(|e| Error::EventLoop(e.to_string()))?;

        log::info!(
            "stopped with {} active instance(s), {} host message(s) ignored",
            self.state.poller.active_instances(),
            self.state.bridge.ignored()
        );
        match self.state.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Host on the process's stdout, input from stdin, Ctrl-C stops the loop.
pub fn run_stdio(
    client: Arc<dyn PipelineClient>,
    bridge: EventBridge,
    timings: Timings,
) -> Result<()> {
    let lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()))?;
    let host = StdioHost::new(LineStdout(std::io::stdout()));
    let runtime = Runtime::new(host, lines, client, bridge, timings)?;
    super::lifecycle::install_shutdown_handler(runtime.signal())?;
    runtime.run()
}

/// Locks stdout per write so log output on other threads never interleaves mid-line.
struct LineStdout(std::io::Stdout);

impl Write for LineStdout {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().write(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.0.lock().write_all(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.lock().flush()
    }
}
