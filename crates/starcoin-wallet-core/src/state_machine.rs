use thiserror::Error;

use crate::domain::ReadyState;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal ready state transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: ReadyState,
    pub to: ReadyState,
}

/// Readiness only moves towards `Installed`; `Unsupported` and `Installed` never move.
pub fn ready_transition(from: ReadyState, to: ReadyState) -> Result<ReadyState, TransitionError> {
    use ReadyState::*;

    match (from, to) {
        (NotDetected, Loadable) | (NotDetected, Installed) | (Loadable, Installed) => Ok(to),
        _ => Err(TransitionError { from, to }),
    }
}

/// Initial readiness derived from the host environment.
pub fn initial_ready_state(environment_supported: bool) -> ReadyState {
    if environment_supported {
        ReadyState::NotDetected
    } else {
        ReadyState::Unsupported
    }
}
