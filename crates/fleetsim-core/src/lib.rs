//! Simulation core for Fleetsim: registry, random walk, and tick scheduler.
//!
//! The core is deliberately free of HTTP and SQL. It owns:
//!
//! - [`registry`] -- the in-memory device table shared between the
//!   control plane and the tick loop
//! - [`walk`] -- the pure bounded random-walk step function and the
//!   [`WalkRng`](walk::WalkRng) randomness seam
//! - [`control`] -- atomic lifecycle state (running/stopped, stop
//!   signal, tick counter, auto-stop bound)
//! - [`scheduler`] -- the periodic tick loop orchestrating
//!   simulate -> persist -> broadcast per device
//! - [`sink`] -- dyn-safe async traits the persistence layer implements
//! - [`config`] -- typed YAML configuration with env overrides
//!
//! # Data flow
//!
//! ```text
//! Scheduler tick
//!     |
//!     +-- registry.snapshot()           (lock held briefly)
//!     +-- walk::step() per device       (pure)
//!     +-- ReadingSink::append()         (per-device, failure isolated)
//!     +-- registry.set_value()
//!     +-- broadcast TickBatch           (best-effort fan-out)
//! ```

pub mod config;
pub mod control;
pub mod registry;
pub mod scheduler;
pub mod sink;
pub mod walk;

pub use config::{ConfigError, FleetsimConfig};
pub use control::{ControlState, SchedulerStatus};
pub use registry::{DeviceRegistry, SimulationState};
pub use scheduler::{Scheduler, SchedulerError, StartOutcome, StopOutcome};
pub use sink::{DeviceCatalog, MemoryCatalog, MemorySink, ReadingSink, SinkError};
pub use walk::{ScriptedWalkRng, ThreadWalkRng, WalkRng};
