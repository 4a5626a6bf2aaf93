//! Reconnection supervisor.
//!
//! Owns the connect → spawn → run → disconnect lifecycle. Each session gets a
//! fresh [`AgentContext`]; monitors and the scheduler start once on the first
//! spawn and are stopped and awaited before the next connection attempt, so
//! no timer from an old session can act on a new one.
//!
//! ```text
//!   connect ──▶ session ──▶ Disconnected ──▶ backoff ──▶ connect …
//!      │           │                            │
//!      │ auth      │ auth error / shutdown      │ attempts exhausted
//!      ▼           ▼                            ▼
//!    fatal       stop                         fatal
//! ```

use crate::arbiter::{Arbiter, ArbiterHandle};
use crate::combat::ThreatMonitor;
use crate::config::AgentConfig;
use crate::context::AgentContext;
use crate::error::{AgentError, Result};
use crate::monitors::{run_monitor, Glance, IdleDetector, Keepalive, ModeEnforcer};
use crate::pacing::jitter;
use crate::scheduler::ActivityScheduler;
use crate::types::MovementProfile;
use crate::world::{Connection, Connector, WorldEvent};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

// ---------------------------------------------------------------------------
// Reconnect bookkeeping
// ---------------------------------------------------------------------------

/// Consecutive-disconnect counter. A successful spawn resets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectState {
    attempts: u32,
    ceiling: u32,
}

impl ReconnectState {
    pub fn new(ceiling: u32) -> Self {
        Self { attempts: 0, ceiling }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Count a disconnect. Returns the attempt number to make next, or
    /// [`AgentError::ReconnectExhausted`] once the ceiling is reached.
    pub fn record_disconnect(&mut self) -> Result<u32> {
        self.attempts += 1;
        if self.attempts >= self.ceiling {
            return Err(AgentError::ReconnectExhausted {
                attempts: self.attempts,
            });
        }
        Ok(self.attempts)
    }
}

// ---------------------------------------------------------------------------
// Monitor set
// ---------------------------------------------------------------------------

/// The background tasks of one session, stopped together.
pub struct MonitorSet {
    stop: CancellationToken,
    tasks: JoinSet<()>,
}

impl MonitorSet {
    /// Start every monitor and the scheduler. Each begins after `startup`.
    pub fn start(ctx: &AgentContext, startup: Duration) -> Self {
        let stop = CancellationToken::new();
        let mut tasks = JoinSet::new();

        if ctx.config.mode_enforcement {
            tasks.spawn(run_monitor(ModeEnforcer::new(ctx.clone()), stop.clone(), startup));
        }
        tasks.spawn(run_monitor(IdleDetector::new(ctx.clone()), stop.clone(), startup));
        tasks.spawn(run_monitor(ThreatMonitor::new(ctx.clone()), stop.clone(), startup));
        tasks.spawn(run_monitor(Keepalive::new(ctx.clone()), stop.clone(), startup));
        tasks.spawn(run_monitor(Glance::new(ctx.clone()), stop.clone(), startup));
        tasks.spawn(ActivityScheduler::new(ctx.clone()).run(stop.clone(), startup));

        info!("Started {} background tasks", tasks.len());
        Self { stop, tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Cancel every task and wait for all of them to finish.
    pub async fn stop(mut self) {
        self.stop.cancel();
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!("Background task ended abnormally: {}", e);
            }
        }
        debug!("All background tasks stopped");
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

/// How a session ended, when it did not end fatally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    Disconnected(String),
    Shutdown,
}

pub struct Supervisor<C: Connector> {
    connector: C,
    config: Arc<AgentConfig>,
    arbiter: ArbiterHandle,
    reconnect: ReconnectState,
    shutdown: CancellationToken,
    sessions: u64,
}

impl<C: Connector> Supervisor<C> {
    /// Must be called inside a Tokio runtime (spawns the arbiter task).
    pub fn new(connector: C, config: Arc<AgentConfig>, shutdown: CancellationToken) -> Self {
        let reconnect = ReconnectState::new(config.timings.max_reconnect_attempts);
        Self {
            connector,
            config,
            arbiter: Arbiter::spawn(),
            reconnect,
            shutdown,
            sessions: 0,
        }
    }

    pub fn arbiter(&self) -> &ArbiterHandle {
        &self.arbiter
    }

    pub fn reconnect_state(&self) -> &ReconnectState {
        &self.reconnect
    }

    /// Run sessions until shutdown (`Ok`) or a fatal error.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }

            self.sessions += 1;
            let span = tracing::info_span!("session", n = self.sessions);
            let end = self.session().instrument(span).await?;

            let reason = match end {
                SessionEnd::Shutdown => {
                    info!("Shutting down");
                    return Ok(());
                }
                SessionEnd::Disconnected(reason) => reason,
            };

            let attempt = match self.reconnect.record_disconnect() {
                Ok(attempt) => attempt,
                Err(e) => {
                    error!("Disconnected ({}) - giving up: {}", reason, e);
                    return Err(e);
                }
            };
            let delay = self.config.timings.reconnect_delay();
            info!(
                "Disconnected ({}) - reconnecting in {:.0}s (attempt {}/{})",
                reason,
                delay.as_secs_f64(),
                attempt,
                self.reconnect.ceiling()
            );

            tokio::select! {
                _ = self.shutdown.cancelled() => return Ok(()),
                _ = sleep(delay) => {}
            }
            self.arbiter.reset();
        }
    }

    async fn session(&mut self) -> Result<SessionEnd> {
        let Connection { world, mut events } = match self.connector.connect().await {
            Ok(connection) => connection,
            Err(e) if e.is_fatal() => {
                error!("Connection refused: {}", e);
                return Err(AgentError::Authentication(e.to_string()));
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                return Ok(SessionEnd::Disconnected(e.to_string()));
            }
        };

        let ctx = AgentContext::new(world.clone(), self.config.clone(), self.arbiter.clone());
        let mut monitors: Option<MonitorSet> = None;

        let end = loop {
            let event = tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(SessionEnd::Shutdown),
                event = events.recv() => event,
            };
            let Some(event) = event else {
                break Ok(SessionEnd::Disconnected("event stream closed".into()));
            };
            // No subscribers is fine.
            let _ = ctx.events.send(event.clone());

            match event {
                WorldEvent::Connected => info!("Connected"),
                WorldEvent::Spawned => {
                    info!("Spawned at {}", world.position().map_or("?".into(), |p| p.to_string()));
                    self.reconnect.reset();
                    self.arbiter.spawned();
                    world.set_movement_profile(MovementProfile::new(self.config.can_dig));
                    if monitors.is_none() {
                        monitors = Some(MonitorSet::start(&ctx, jitter(2_000, 5_000)));
                    }
                }
                WorldEvent::Died => {
                    info!("Died - waiting for respawn");
                    self.arbiter.died();
                }
                WorldEvent::Signal | WorldEvent::TimeChanged(_) => self.arbiter.record_signal(),
                WorldEvent::Wake => debug!("Woke up"),
                WorldEvent::Chat { username, message } => {
                    info!("<{}> {}", username, message);
                    self.arbiter.touch_activity();
                }
                WorldEvent::Kicked(reason) => {
                    warn!("Kicked: {}", reason);
                    break Ok(SessionEnd::Disconnected(format!("kicked: {}", reason)));
                }
                WorldEvent::Disconnected => {
                    break Ok(SessionEnd::Disconnected("connection closed".into()));
                }
                WorldEvent::Error(e) if e.is_fatal() => {
                    error!("Fatal world error: {}", e);
                    break Err(AgentError::Authentication(e.to_string()));
                }
                WorldEvent::Error(e) if e.is_connectivity() => {
                    warn!("Connection error: {}", e);
                    break Ok(SessionEnd::Disconnected(e.to_string()));
                }
                WorldEvent::Error(e) => warn!("World error: {}", e),
            }
        };

        if let Some(monitors) = monitors {
            monitors.stop().await;
        }
        if matches!(end, Ok(SessionEnd::Shutdown) | Err(_)) {
            world.cancel_movement();
            world.disconnect().await;
        }
        end
    }
}
