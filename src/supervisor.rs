// src/supervisor.rs
//! Lifecycle supervision for the render server.
//!
//! ```text
//! Uninitialized ──► Connecting ──► Running ──► Quitting ──► Terminated
//!                        │            │                        ▲
//!                        └────────────┴── (probe / sink fail) ─┘
//! ```
//!
//! The launcher sees exactly one of `Running` / `ConnectionFailed` at startup,
//! then at most one of `Quitting` / `Failed` at shutdown.

use crate::config::Config;
use crate::control::{Command, ControlReceiver, ControlSender};
use crate::params::ParameterStore;
use crate::renderer::PlaidRenderer;
use crate::scheduler::{FrameScheduler, FrameTiming, SchedulerExit, SchedulerStats};
use crate::sink::DisplaySink;
use anyhow::{anyhow, Context, Result};
use log::*;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Status reports sent from the render server to whoever launched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// The sink probe failed; the render loop never started.
    ConnectionFailed,
    /// The sink is reachable and the render loop is starting.
    Running,
    /// The loop stopped on request.
    Quitting,
    /// The loop stopped on an unrecoverable error.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Connecting,
    Running,
    Quitting,
    Terminated,
}

impl LifecycleState {
    /// Transitions only move forward; no state is revisited.
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Uninitialized, Connecting)
                | (Connecting, Running)
                | (Connecting, Terminated)
                | (Running, Quitting)
                | (Running, Terminated)
                | (Quitting, Terminated)
        )
    }
}

/// What the server thread hands back once it has terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    pub state: LifecycleState,
    pub stats: SchedulerStats,
    /// Set when the loop ended on an error.
    pub failure: Option<String>,
}

/// Owns the startup handshake and shutdown reporting around one [`FrameScheduler`] run.
pub struct RenderServer {
    state: LifecycleState,
    params: Option<ParameterStore>,
    renderer: PlaidRenderer,
    timing: FrameTiming,
    responses: Sender<Response>,
}

impl RenderServer {
    /// Builds the parameter store from the configured initial channels.
    ///
    /// Fails on degenerate initial channels or a frame rate with no usable interval.
    pub fn new(config: &Config, responses: Sender<Response>) -> Result<Self> {
        let params = ParameterStore::with_plaid_defaults(config.channels.plaid_params())
            .context("Invalid initial channel parameters")?;
        let timing = FrameTiming::from_config(config).context("Invalid render timing")?;
        Ok(Self {
            state: LifecycleState::Uninitialized,
            params: Some(params),
            renderer: PlaidRenderer::from_config(config),
            timing,
            responses,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Probes the sink once and reports the result.
    ///
    /// There is no retry here; reconnection policy belongs to the sink.
    pub fn start(&mut self, sink: &mut dyn DisplaySink) -> Response {
        self.transition(LifecycleState::Connecting);
        let response = if sink.connect_probe() {
            self.transition(LifecycleState::Running);
            Response::Running
        } else {
            warn!("RenderServer: display sink unreachable");
            self.transition(LifecycleState::Terminated);
            Response::ConnectionFailed
        };
        self.report(response.clone());
        response
    }

    /// Runs the render loop until it stops, then reports and terminates.
    ///
    /// Must follow a `start` that returned `Running`.
    pub fn serve(&mut self, sink: &mut dyn DisplaySink, control: &ControlReceiver) -> RenderOutcome {
        if self.state != LifecycleState::Running {
            return self.outcome(SchedulerStats::default(), None);
        }
        let params = match self.params.take() {
            Some(params) => params,
            None => return self.fail(SchedulerStats::default(), "parameter store already consumed".to_string()),
        };

        let mut scheduler =
            match FrameScheduler::new(params, self.renderer.clone(), self.timing, control, sink) {
                Ok(scheduler) => scheduler,
                Err(e) => return self.fail(SchedulerStats::default(), e.to_string()),
            };
        let result = scheduler.run();
        let stats = scheduler.stats();
        info!(
            "RenderServer: loop ended after {} frames ({} updates applied, {} rejected, {} ticks skipped)",
            stats.frames_sent, stats.commands_applied, stats.commands_rejected, stats.ticks_skipped
        );

        match result {
            Ok(exit) => {
                if exit == SchedulerExit::ControlClosed {
                    info!("RenderServer: no control producers left, shutting down");
                }
                self.transition(LifecycleState::Quitting);
                self.report(Response::Quitting);
                self.transition(LifecycleState::Terminated);
                self.outcome(stats, None)
            }
            Err(e) => self.fail(stats, e.to_string()),
        }
    }

    /// `start` followed by `serve` when the sink is reachable.
    pub fn run(&mut self, sink: &mut dyn DisplaySink, control: &ControlReceiver) -> RenderOutcome {
        match self.start(sink) {
            Response::Running => self.serve(sink, control),
            _ => self.outcome(SchedulerStats::default(), None),
        }
    }

    fn fail(&mut self, stats: SchedulerStats, reason: String) -> RenderOutcome {
        error!("RenderServer: terminating on failure: {}", reason);
        self.transition(LifecycleState::Terminated);
        self.report(Response::Failed(reason.clone()));
        self.outcome(stats, Some(reason))
    }

    fn outcome(&self, stats: SchedulerStats, failure: Option<String>) -> RenderOutcome {
        RenderOutcome {
            state: self.state,
            stats,
            failure,
        }
    }

    fn transition(&mut self, next: LifecycleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal lifecycle transition {:?} -> {:?}",
            self.state,
            next
        );
        info!("RenderServer: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn report(&self, response: Response) {
        if self.responses.send(response).is_err() {
            warn!("RenderServer: launcher stopped listening for responses");
        }
    }
}

/// Runs a [`RenderServer`] on a dedicated `render` thread.
pub struct RenderSupervisor {
    thread_handle: Option<JoinHandle<RenderOutcome>>,
}

impl RenderSupervisor {
    /// Spawns the render thread. Responses arrive on the sender the server was built with.
    pub fn spawn(
        mut server: RenderServer,
        mut sink: Box<dyn DisplaySink + Send>,
        control: ControlReceiver,
    ) -> Result<Self> {
        let thread_handle = thread::Builder::new()
            .name("render".to_string())
            .spawn(move || {
                debug!("RenderSupervisor: render thread started");
                let outcome = server.run(sink.as_mut(), &control);
                debug!("RenderSupervisor: render thread exiting in {:?}", outcome.state);
                outcome
            })
            .context("Failed to spawn render thread")?;

        info!("RenderSupervisor spawned successfully");
        Ok(Self {
            thread_handle: Some(thread_handle),
        })
    }

    /// Asks the render loop to quit, then waits for it.
    ///
    /// Consumes `control` so that a loop still running on other live senders
    /// cannot keep the join waiting.
    pub fn shutdown(self, control: ControlSender) -> Result<RenderOutcome> {
        if control.push(Command::Quit).is_err() {
            debug!("RenderSupervisor: render loop already gone, joining");
        }
        drop(control);
        self.join()
    }

    /// Waits for the render thread to terminate.
    pub fn join(mut self) -> Result<RenderOutcome> {
        let handle = self
            .thread_handle
            .take()
            .ok_or_else(|| anyhow!("render thread already joined"))?;
        handle
            .join()
            .map_err(|e| anyhow!("render thread panicked: {:?}", e))
    }
}

impl Drop for RenderSupervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            debug!("RenderSupervisor dropped, joining render thread");
            if let Err(e) = handle.join() {
                error!("Render thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SinkConfig;
    use crate::control::control_channel;
    use crate::frame::Frame;
    use crate::sink::{HeadlessSink, SinkError};
    use std::io;
    use std::sync::mpsc::{self, Receiver};
    use std::time::Duration;
    use test_log::test;

    fn config() -> Config {
        let mut config = Config::default();
        config.render.pixel_count = 16;
        config.render.fps = 100.0;
        config.sink = SinkConfig::Headless;
        config
    }

    fn drain(rx: &Receiver<Response>) -> Vec<Response> {
        rx.try_iter().collect()
    }

    /// Sink that fails every write after a successful probe.
    struct BrokenSink {
        attempts: usize,
    }

    impl DisplaySink for BrokenSink {
        fn connect_probe(&mut self) -> bool {
            true
        }

        fn send_frame(&mut self, _frame: &Frame) -> Result<(), SinkError> {
            self.attempts += 1;
            Err(SinkError::Io(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    #[test]
    fn transitions_only_move_forward() {
        use LifecycleState::*;
        assert!(Uninitialized.can_transition_to(Connecting));
        assert!(Connecting.can_transition_to(Running));
        assert!(Connecting.can_transition_to(Terminated));
        assert!(Running.can_transition_to(Quitting));
        assert!(Quitting.can_transition_to(Terminated));
        assert!(!Running.can_transition_to(Connecting));
        assert!(!Terminated.can_transition_to(Running));
        assert!(!Quitting.can_transition_to(Running));
        assert!(!Uninitialized.can_transition_to(Running));
    }

    #[test]
    fn unreachable_sink_reports_connection_failed_and_never_renders() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (ctl_tx, ctl_rx) = control_channel();
        ctl_tx.push(Command::Quit).unwrap();
        let mut sink = HeadlessSink::unreachable();
        let mut server = RenderServer::new(&config(), resp_tx).unwrap();

        let outcome = server.run(&mut sink, &ctl_rx);

        assert_eq!(drain(&resp_rx), vec![Response::ConnectionFailed]);
        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert_eq!(outcome.stats.frames_sent, 0);
        assert_eq!(sink.frames_received(), 0);
    }

    #[test]
    fn quit_reports_running_then_exactly_one_quitting() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (ctl_tx, ctl_rx) = control_channel();
        let mut sink = HeadlessSink::new();
        let mut server = RenderServer::new(&config(), resp_tx).unwrap();

        assert_eq!(server.start(&mut sink), Response::Running);
        assert_eq!(server.state(), LifecycleState::Running);
        ctl_tx.push(Command::Quit).unwrap();
        ctl_tx.push(Command::Quit).unwrap();
        let outcome = server.serve(&mut sink, &ctl_rx);

        assert_eq!(drain(&resp_rx), vec![Response::Running, Response::Quitting]);
        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert_eq!(outcome.failure, None);
        assert_eq!(sink.frames_received(), 0);
    }

    #[test]
    fn sink_failure_is_reported_and_terminal() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (_ctl_tx, ctl_rx) = control_channel();
        let mut sink = BrokenSink { attempts: 0 };
        let mut server = RenderServer::new(&config(), resp_tx).unwrap();

        let outcome = server.run(&mut sink, &ctl_rx);

        let responses = drain(&resp_rx);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0], Response::Running);
        assert!(matches!(&responses[1], Response::Failed(reason) if reason.contains("reset")));
        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert!(outcome.failure.is_some());
        assert_eq!(sink.attempts, 1);
    }

    #[test]
    fn new_rejects_degenerate_initial_channels() {
        let (resp_tx, _resp_rx) = mpsc::channel();
        let mut config = config();
        config.channels.red.speed = 0.0;
        assert!(RenderServer::new(&config, resp_tx).is_err());
    }

    #[test]
    fn new_rejects_fps_without_usable_interval() {
        for fps in [1e-20, 1e10] {
            let (resp_tx, _resp_rx) = mpsc::channel();
            let mut config = config();
            config.render.fps = fps;
            let err = RenderServer::new(&config, resp_tx).err().unwrap();
            assert!(err.to_string().contains("Invalid render timing"));
        }
    }

    #[test]
    fn shutdown_stops_loop_while_other_senders_are_alive() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (ctl_tx, ctl_rx) = control_channel();
        // Stands in for a control source that is still running.
        let _other_producer = ctl_tx.clone();
        let server = RenderServer::new(&config(), resp_tx).unwrap();
        let supervisor =
            RenderSupervisor::spawn(server, Box::new(HeadlessSink::new()), ctl_rx).unwrap();
        assert_eq!(
            resp_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            Response::Running
        );

        let outcome = supervisor.shutdown(ctl_tx).unwrap();

        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert_eq!(outcome.failure, None);
        assert_eq!(drain(&resp_rx), vec![Response::Quitting]);
    }

    #[test]
    fn shutdown_after_connection_failure_still_joins() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (ctl_tx, ctl_rx) = control_channel();
        let server = RenderServer::new(&config(), resp_tx).unwrap();
        let supervisor =
            RenderSupervisor::spawn(server, Box::new(HeadlessSink::unreachable()), ctl_rx)
                .unwrap();
        assert_eq!(
            resp_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            Response::ConnectionFailed
        );

        let outcome = supervisor.shutdown(ctl_tx).unwrap();

        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert_eq!(outcome.stats.frames_sent, 0);
    }

    #[test]
    fn supervisor_thread_renders_until_quit() {
        let (resp_tx, resp_rx) = mpsc::channel();
        let (ctl_tx, ctl_rx) = control_channel();
        let server = RenderServer::new(&config(), resp_tx).unwrap();

        let supervisor =
            RenderSupervisor::spawn(server, Box::new(HeadlessSink::new()), ctl_rx).unwrap();

        assert_eq!(
            resp_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            Response::Running
        );
        std::thread::sleep(Duration::from_millis(60));
        ctl_tx.push(Command::Quit).unwrap();
        assert_eq!(
            resp_rx.recv_timeout(Duration::from_secs(2)).unwrap(),
            Response::Quitting
        );

        let outcome = supervisor.join().unwrap();
        assert_eq!(outcome.state, LifecycleState::Terminated);
        assert!(outcome.stats.frames_sent >= 1);
    }
}
