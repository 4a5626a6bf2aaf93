//! Control arbiter – the single owner of shared agent state.
//!
//! Every component that wants to drive the avatar asks the arbiter for a
//! [`ControlGrant`] and gets either a grant or a refusal. All transitions are
//! serialized through one task, so monitors firing on independent timers can
//! never interleave a check and a set.
//!
//! ```text
//! ThreatMonitor ─┐
//! IdleDetector  ─┤  Command::Acquire ─▶ ┌─────────────┐
//! Keepalive     ─┼────────────────────▶ │ Arbiter     │ owns ControlState
//! Scheduler     ─┘  ◀── Option<grant> ─ │ (one task)  │
//!                                        └─────────────┘
//! ```
//!
//! Grants are RAII guards: dropping one releases it, so every exit path
//! (completion, timeout, error, cancellation) gives control back.

use crate::error::{AgentError, Result};
use log::debug;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Who is asking for control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The activity scheduler running one behavior.
    Activity { preemptible: bool },
    /// The threat monitor engaging a hostile.
    Combat,
    /// The scheduler's night-time sleep attempt.
    Sleep,
    /// The idle detector's filler gesture.
    Filler,
    /// The keepalive jump pulse.
    Keepalive,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Role::Activity { .. } => "activity",
            Role::Combat => "combat",
            Role::Sleep => "sleep",
            Role::Filler => "filler",
            Role::Keepalive => "keepalive",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Holder {
    pub grant: u64,
    pub role: Role,
}

/// Outcome of asking for control, before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Grant,
    /// Grant by superseding the current (preemptible) holder.
    Preempt,
    Deny,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Point-in-time copy of the control state.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSnapshot {
    pub holder: Option<Holder>,
    pub sleeping: bool,
    pub in_combat: bool,
    pub activity_count: u64,
    pub since_activity: Duration,
    pub since_signal: Duration,
    /// Bumped on every spawn and death.
    pub life: u64,
}

impl ControlSnapshot {
    /// Something else is in control (or the avatar is asleep / fighting).
    pub fn is_busy(&self) -> bool {
        self.holder.is_some() || self.sleeping || self.in_combat
    }

    pub fn holds(&self, grant: u64) -> bool {
        self.holder.is_some_and(|h| h.grant == grant)
    }
}

/// The shared state itself. Only the arbiter task mutates it; it is public so
/// the priority rules can be exercised directly.
#[derive(Debug, Clone)]
pub struct ControlState {
    holder: Option<Holder>,
    sleeping: bool,
    in_combat: bool,
    activity_count: u64,
    last_activity: Instant,
    last_signal: Instant,
    life: u64,
    next_grant: u64,
}

impl ControlState {
    pub fn new(now: Instant) -> Self {
        Self {
            holder: None,
            sleeping: false,
            in_combat: false,
            activity_count: 0,
            last_activity: now,
            last_signal: now,
            life: 0,
            next_grant: 1,
        }
    }

    /// Priority rules. Pure: checking never changes state.
    pub fn decide(&self, role: Role) -> Decision {
        match role {
            Role::Activity { .. } | Role::Filler | Role::Keepalive => {
                if self.holder.is_none() && !self.sleeping && !self.in_combat {
                    Decision::Grant
                } else {
                    Decision::Deny
                }
            }
            Role::Combat => {
                if self.in_combat || self.sleeping {
                    return Decision::Deny;
                }
                match self.holder.map(|h| h.role) {
                    None => Decision::Grant,
                    Some(Role::Activity { preemptible: true }) => Decision::Preempt,
                    Some(_) => Decision::Deny,
                }
            }
            Role::Sleep => {
                if self.in_combat || self.sleeping {
                    return Decision::Deny;
                }
                match self.holder.map(|h| h.role) {
                    None => Decision::Grant,
                    Some(Role::Activity { .. }) => Decision::Preempt,
                    Some(_) => Decision::Deny,
                }
            }
        }
    }

    /// Apply [`ControlState::decide`]; returns the new grant id on success.
    pub fn acquire(&mut self, role: Role) -> Option<u64> {
        let decision = self.decide(role);
        if decision == Decision::Deny {
            return None;
        }
        if decision == Decision::Preempt {
            if let Some(prev) = self.holder {
                debug!("{} preempts {} (grant {})", role, prev.role, prev.grant);
            }
        }

        let grant = self.next_grant;
        self.next_grant += 1;
        self.holder = Some(Holder { grant, role });
        match role {
            Role::Combat => self.in_combat = true,
            Role::Sleep => self.sleeping = true,
            Role::Activity { .. } => self.activity_count += 1,
            Role::Filler | Role::Keepalive => {}
        }
        Some(grant)
    }

    /// Release `grant`. Stale (superseded) grants are ignored.
    pub fn release(&mut self, grant: u64) -> bool {
        match self.holder {
            Some(h) if h.grant == grant => {
                self.holder = None;
                match h.role {
                    Role::Combat => self.in_combat = false,
                    Role::Sleep => self.sleeping = false,
                    _ => {}
                }
                true
            }
            _ => false,
        }
    }

    /// Let combat take over from the activity holding `grant` from now on.
    pub fn relax(&mut self, grant: u64) -> bool {
        match &mut self.holder {
            Some(h) if h.grant == grant && matches!(h.role, Role::Activity { .. }) => {
                h.role = Role::Activity { preemptible: true };
                true
            }
            _ => false,
        }
    }

    pub fn touch_activity(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn record_signal(&mut self, now: Instant) {
        self.last_signal = now;
    }

    pub fn spawned(&mut self, now: Instant) {
        self.life += 1;
        self.last_signal = now;
    }

    /// Death drops combat/sleep control; the scheduler re-anchors on the
    /// life bump.
    pub fn died(&mut self) {
        self.life += 1;
        if matches!(
            self.holder.map(|h| h.role),
            Some(Role::Combat) | Some(Role::Sleep)
        ) {
            self.holder = None;
        }
        self.in_combat = false;
        self.sleeping = false;
    }

    /// Back to initial values, keeping the grant counter monotonic so no
    /// grant from before the reset can release a later one.
    pub fn reset(&mut self, now: Instant) {
        let next_grant = self.next_grant;
        let life = self.life;
        *self = ControlState::new(now);
        self.next_grant = next_grant;
        self.life = life + 1;
    }

    pub fn snapshot(&self, now: Instant) -> ControlSnapshot {
        ControlSnapshot {
            holder: self.holder,
            sleeping: self.sleeping,
            in_combat: self.in_combat,
            activity_count: self.activity_count,
            since_activity: now.saturating_duration_since(self.last_activity),
            since_signal: now.saturating_duration_since(self.last_signal),
            life: self.life,
        }
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

enum Command {
    Acquire {
        role: Role,
        reply: oneshot::Sender<Option<u64>>,
    },
    Release {
        grant: u64,
    },
    Relax {
        grant: u64,
    },
    TouchActivity,
    RecordSignal,
    Spawned,
    Died,
    Reset,
    Snapshot {
        reply: oneshot::Sender<ControlSnapshot>,
    },
}

/// Background task that owns [`ControlState`].
pub struct Arbiter {
    state: ControlState,
    command_rx: mpsc::UnboundedReceiver<Command>,
}

impl Arbiter {
    /// Spawn the arbiter task. It runs until every handle is dropped.
    pub fn spawn() -> ArbiterHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let worker = Arbiter {
            state: ControlState::new(Instant::now()),
            command_rx,
        };
        tokio::spawn(worker.run());
        ArbiterHandle { command_tx }
    }

    async fn run(mut self) {
        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }
        debug!("Arbiter stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        let now = Instant::now();
        match cmd {
            Command::Acquire { role, reply } => {
                let grant = self.state.acquire(role);
                match grant {
                    Some(id) => debug!("Granted {} control (grant {})", role, id),
                    None => debug!("Denied {} control", role),
                }
                if reply.send(grant).is_err() {
                    // Requester went away before hearing back.
                    if let Some(id) = grant {
                        self.state.release(id);
                    }
                }
            }
            Command::Release { grant } => {
                if self.state.release(grant) {
                    debug!("Released grant {}", grant);
                }
            }
            Command::Relax { grant } => {
                if self.state.relax(grant) {
                    debug!("Grant {} is now preemptible", grant);
                }
            }
            Command::TouchActivity => self.state.touch_activity(now),
            Command::RecordSignal => self.state.record_signal(now),
            Command::Spawned => self.state.spawned(now),
            Command::Died => self.state.died(),
            Command::Reset => self.state.reset(now),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot(now));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable façade over the arbiter task.
#[derive(Clone)]
pub struct ArbiterHandle {
    command_tx: mpsc::UnboundedSender<Command>,
}

impl ArbiterHandle {
    /// Ask for control. `Ok(None)` is a refusal.
    pub async fn acquire(&self, role: Role) -> Result<Option<ControlGrant>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Acquire {
            role,
            reply: reply_tx,
        })?;
        let grant = reply_rx.await.map_err(|_| AgentError::ArbiterClosed)?;
        Ok(grant.map(|id| ControlGrant {
            id,
            role,
            command_tx: self.command_tx.clone(),
        }))
    }

    pub async fn snapshot(&self) -> Result<ControlSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot { reply: reply_tx })?;
        reply_rx.await.map_err(|_| AgentError::ArbiterClosed)
    }

    pub fn touch_activity(&self) {
        let _ = self.send(Command::TouchActivity);
    }

    pub fn record_signal(&self) {
        let _ = self.send(Command::RecordSignal);
    }

    pub fn spawned(&self) {
        let _ = self.send(Command::Spawned);
    }

    pub fn died(&self) {
        let _ = self.send(Command::Died);
    }

    pub fn reset(&self) {
        let _ = self.send(Command::Reset);
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|_| AgentError::ArbiterClosed)
    }
}

// ---------------------------------------------------------------------------
// Grant guard
// ---------------------------------------------------------------------------

/// Exclusive control of the avatar. Released on drop.
pub struct ControlGrant {
    id: u64,
    role: Role,
    command_tx: mpsc::UnboundedSender<Command>,
}

impl ControlGrant {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Mark an activity grant preemptible. Ordered after every command this
    /// grant's owner already sent.
    pub fn relax(&mut self) {
        if let Role::Activity { .. } = self.role {
            self.role = Role::Activity { preemptible: true };
            let _ = self.command_tx.send(Command::Relax { grant: self.id });
        }
    }

    /// Give control back now rather than at end of scope.
    pub fn release(self) {}
}

impl std::fmt::Debug for ControlGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlGrant")
            .field("id", &self.id)
            .field("role", &self.role)
            .finish()
    }
}

impl Drop for ControlGrant {
    fn drop(&mut self) {
        let _ = self.command_tx.send(Command::Release { grant: self.id });
    }
}
