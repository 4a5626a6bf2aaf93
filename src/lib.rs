//! Avatar Autopilot
//!
//! A behavior arbitration engine that keeps a game avatar plausibly busy:
//! wandering, building, poking at chests, sleeping through the night and
//! defending itself, while staying connected and in the right privilege mode.
//!
//! ## Architecture
//!
//! ```text
//! Supervisor  (supervisor.rs)            ← connect / reconnect lifecycle
//!   └── per session: AgentContext (context.rs)
//!         ├── ModeEnforcer   ┐
//!         ├── IdleDetector   │ monitors.rs, combat.rs
//!         ├── Keepalive      │   (independent timers)
//!         ├── ThreatMonitor  ┘
//!         └── ActivityScheduler (scheduler.rs)
//!               ├── activity/{explore,build,idle,interact}.rs
//!               └── sleep.rs
//!
//! Arbiter  (arbiter.rs)   ← sole owner of control state; every component
//!                            above asks it for a ControlGrant
//! WorldInterface (world.rs) ← queries + commands; SimWorld (sim.rs) in-process
//! ```
//!
//! Threat classification, waypoint generation, configuration and the error
//! taxonomy are plain synchronous code and build without the `runtime`
//! feature.

// Pure modules are always available (no runtime feature needed).
pub mod config;
pub mod error;
pub mod pacing;
pub mod threat;
pub mod types;
pub mod waypoints;

// Async engine modules require the `runtime` feature.
#[cfg(feature = "runtime")]
pub mod activity;
#[cfg(feature = "runtime")]
pub mod arbiter;
#[cfg(feature = "runtime")]
pub mod combat;
#[cfg(feature = "runtime")]
pub mod context;
#[cfg(feature = "runtime")]
pub mod monitors;
#[cfg(feature = "runtime")]
pub mod motion;
#[cfg(feature = "runtime")]
pub mod provision;
#[cfg(feature = "runtime")]
pub mod scheduler;
#[cfg(feature = "runtime")]
pub mod sim;
#[cfg(feature = "runtime")]
pub mod sleep;
#[cfg(feature = "runtime")]
pub mod supervisor;
#[cfg(feature = "runtime")]
pub mod world;

// Convenience re-exports (runtime only)
#[cfg(feature = "runtime")]
pub use arbiter::{Arbiter, ArbiterHandle, ControlGrant, ControlSnapshot, ControlState, Role};
#[cfg(feature = "runtime")]
pub use context::AgentContext;
#[cfg(feature = "runtime")]
pub use scheduler::ActivityScheduler;
#[cfg(feature = "runtime")]
pub use sim::{Scenario, SimConnector, SimWorld};
#[cfg(feature = "runtime")]
pub use supervisor::Supervisor;
#[cfg(feature = "runtime")]
pub use world::{Connection, Connector, WorldEvent, WorldInterface};
pub use config::AgentConfig;
pub use error::{AgentError, WorldError};
pub use types::{BlockPos, Entity, EntityId, GameMode, Item, Vec3};
