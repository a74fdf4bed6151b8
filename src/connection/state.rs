// Push-channel lifecycle as an explicit state machine.
//
// The manager performs no I/O. Every transition returns the effects the event loop must
// carry out (open/close a socket, arm/cancel the retry timer, notify observers), which
// keeps reconnect behaviour testable without real sockets or clocks.

use std::fmt;
use std::time::Duration;
use tracing::debug;

use crate::config::ConnectionConfig;

/// Epoch of a socket/timer lifecycle. Bumped on every new socket attempt and on
/// teardown; events tagged with any other generation are stale and ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Retrying,
    GivenUp,
}

/// Observer notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSignal {
    Connected,
    Disconnected,
    GivenUp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    OpenChannel { generation: Generation },
    ScheduleRetry { generation: Generation, delay: Duration },
    CancelRetry,
    CloseChannel,
    Notify(ConnectionSignal),
}

/// Bounded exponential backoff: `base_delay * 2^attempt` for attempt < max_attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl ReconnectPolicy {
    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Delay before retry number `attempt` (0-based), or `None` once the budget is spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionManager {
    state: ConnectionState,
    attempts: u32,
    generation: Generation,
    policy: ReconnectPolicy,
}

impl ConnectionManager {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            attempts: 0,
            generation: Generation::default(),
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Inbound frames are only accepted from the live socket while it is open.
    pub fn accepts_frame(&self, generation: Generation) -> bool {
        self.is_open() && generation == self.generation
    }

    /// Explicit connect. Accepted from Idle and GivenUp; a manual connect after giving
    /// up starts a fresh retry budget.
    pub fn connect(&mut self) -> Vec<Effect> {
        match self.state {
            ConnectionState::Idle | ConnectionState::GivenUp => {
                self.attempts = 0;
                self.begin_attempt()
            }
            _ => {
                debug!(state = ?self.state, "connect ignored");
                Vec::new()
            }
        }
    }

    pub fn on_open(&mut self, generation: Generation) -> Vec<Effect> {
        if !self.is_current(generation) || self.state != ConnectionState::Connecting {
            return Vec::new();
        }
        self.state = ConnectionState::Open;
        self.attempts = 0;
        vec![Effect::Notify(ConnectionSignal::Connected)]
    }

    /// Channel error or close (including a failed connect).
    pub fn on_closed(&mut self, generation: Generation) -> Vec<Effect> {
        if !self.is_current(generation)
            || !matches!(
                self.state,
                ConnectionState::Connecting | ConnectionState::Open
            )
        {
            return Vec::new();
        }
        match self.policy.delay_for(self.attempts) {
            Some(delay) => {
                self.state = ConnectionState::Retrying;
                self.attempts += 1;
                vec![
                    Effect::Notify(ConnectionSignal::Disconnected),
                    Effect::ScheduleRetry {
                        generation: self.generation,
                        delay,
                    },
                ]
            }
            None => {
                self.state = ConnectionState::GivenUp;
                vec![Effect::Notify(ConnectionSignal::GivenUp)]
            }
        }
    }

    /// Retry timer expiry. A timer armed under an older generation is a no-op.
    pub fn on_retry_due(&mut self, generation: Generation) -> Vec<Effect> {
        if !self.is_current(generation) || self.state != ConnectionState::Retrying {
            return Vec::new();
        }
        self.begin_attempt()
    }

    /// Back to Idle from any state. Invalidates every outstanding socket and timer.
    pub fn teardown(&mut self) -> Vec<Effect> {
        self.state = ConnectionState::Idle;
        self.attempts = 0;
        self.generation = self.generation.next();
        vec![Effect::CancelRetry, Effect::CloseChannel]
    }

    fn begin_attempt(&mut self) -> Vec<Effect> {
        self.generation = self.generation.next();
        self.state = ConnectionState::Connecting;
        vec![Effect::OpenChannel {
            generation: self.generation,
        }]
    }

    fn is_current(&self, generation: Generation) -> bool {
        if generation != self.generation {
            debug!(%generation, current = %self.generation, "stale connection event ignored");
            return false;
        }
        true
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(ReconnectPolicy::default())
    }
}
