use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where an emitter sits in its one-way lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitterState {
    /// Not initialized, or initialized without a usable endpoint.
    DisabledByConfig,
    Enabled,
    /// A bulk request failed at the transport level. Terminal.
    DisabledByFailure,
}

impl EmitterState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => EmitterState::Enabled,
            2 => EmitterState::DisabledByFailure,
            _ => EmitterState::DisabledByConfig,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            EmitterState::DisabledByConfig => 0,
            EmitterState::Enabled => 1,
            EmitterState::DisabledByFailure => 2,
        }
    }
}

impl fmt::Display for EmitterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitterState::DisabledByConfig => write!(f, "disabled-by-config"),
            EmitterState::Enabled => write!(f, "enabled"),
            EmitterState::DisabledByFailure => write!(f, "disabled-by-failure"),
        }
    }
}

/// One-shot breaker shared between an emitter and its in-flight requests.
///
/// Transitions only move forward: `DisabledByConfig -> Enabled ->
/// DisabledByFailure`. Nothing leads back to `Enabled`.
#[derive(Debug)]
pub struct FailureGuard {
    state: AtomicU8,
}

impl Default for FailureGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl FailureGuard {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(EmitterState::DisabledByConfig.as_u8()),
        }
    }

    pub fn state(&self) -> EmitterState {
        EmitterState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == EmitterState::Enabled
    }

    /// Enable a guard that has never been enabled. Returns `false` if the
    /// guard was already enabled or has tripped.
    pub fn enable(&self) -> bool {
        self.transition(EmitterState::DisabledByConfig, EmitterState::Enabled)
    }

    /// Trip the breaker. Returns `true` only for the call that performed the
    /// transition, so the failure is reported once.
    pub fn trip(&self) -> bool {
        self.transition(EmitterState::Enabled, EmitterState::DisabledByFailure)
    }

    fn transition(&self, from: EmitterState, to: EmitterState) -> bool {
        self.state
            .compare_exchange(from.as_u8(), to.as_u8(), Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}
