//! Real-time parametric plaid animation server.
//!
//! Control updates arrive asynchronously on a [`control`] channel; the
//! [`scheduler`] drains them between ticks, renders a frame with the
//! [`renderer`] at a fixed cadence and forwards it to a [`sink`]. The
//! [`supervisor`] wraps the loop with a startup handshake and shutdown
//! reporting.

/// Configuration loading and validation.
pub mod config;
/// Control channel, control-line parsing and the stdin control source.
pub mod control;
/// Rendered frame type.
pub mod frame;
/// Parameter store for the color channels.
pub mod params;
/// Pure plaid pixel renderer.
pub mod renderer;
/// Fixed-cadence render loop.
pub mod scheduler;
/// Termination signal handling.
pub mod signals;
/// Display sink trait and drivers.
pub mod sink;
/// Startup handshake and lifecycle reporting.
pub mod supervisor;

pub use config::Config;
pub use control::{control_channel, ColorUpdate, Command, ControlReceiver, ControlSender};
pub use frame::{Frame, Rgb};
pub use params::{ColorParams, ParamError, ParameterStore, PlaidParams};
pub use renderer::PlaidRenderer;
pub use scheduler::{FrameScheduler, FrameTiming, InvalidFrameRate, SchedulerExit, SchedulerStats};
pub use sink::{DisplaySink, SinkError};
pub use supervisor::{LifecycleState, RenderOutcome, RenderServer, RenderSupervisor, Response};
