use thiserror::Error;

/// Lifecycle of one launcher run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Preflighting,
    /// Runtime missing; nothing was launched.
    Aborted,
    Launching,
    Running,
    ShuttingDown,
    Exited,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition: {0:?} -> {1:?}")]
    InvalidTransition(State, State),
}

pub struct StateMachine {
    state: State,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self { state: State::Idle }
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn can_transition(&self, to: State) -> bool {
        matches!(
            (self.state, to),
            (State::Idle, State::Preflighting)
                | (State::Preflighting, State::Aborted)
                | (State::Preflighting, State::Launching)
                // interrupted while the stale sweep settles
                | (State::Preflighting, State::ShuttingDown)
                | (State::Launching, State::Running)
                | (State::Launching, State::ShuttingDown)
                | (State::Running, State::ShuttingDown)
                | (State::ShuttingDown, State::Exited)
        )
    }

    pub fn transition(&mut self, to: State) -> Result<(), TransitionError> {
        if self.can_transition(to) {
            tracing::debug!("State transition: {:?} -> {:?}", self.state, to);
            self.state = to;
            Ok(())
        } else {
            Err(TransitionError::InvalidTransition(self.state, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        let mut sm = StateMachine::new();
        assert_eq!(sm.state(), State::Idle);
        assert!(sm.transition(State::Preflighting).is_ok());
        assert!(sm.transition(State::Launching).is_ok());
        assert!(sm.transition(State::Running).is_ok());
        assert!(sm.transition(State::ShuttingDown).is_ok());
        assert!(sm.transition(State::Exited).is_ok());
        assert_eq!(sm.state(), State::Exited);
        assert!(!sm.can_transition(State::Preflighting));
    }

    #[test]
    fn abort_is_final() {
        let mut sm = StateMachine::new();
        sm.transition(State::Preflighting).unwrap();
        sm.transition(State::Aborted).unwrap();
        assert_eq!(sm.state(), State::Aborted);
        assert!(sm.transition(State::Launching).is_err());
        assert!(sm.transition(State::ShuttingDown).is_err());
    }

    #[test]
    fn no_relaunch_once_running() {
        let mut sm = StateMachine::new();
        sm.transition(State::Preflighting).unwrap();
        sm.transition(State::Launching).unwrap();
        sm.transition(State::Running).unwrap();
        let res = sm.transition(State::Launching);
        assert_eq!(
            res,
            Err(TransitionError::InvalidTransition(State::Running, State::Launching))
        );
    }

    #[test]
    fn shutdown_happens_once() {
        let mut sm = StateMachine::new();
        sm.transition(State::Preflighting).unwrap();
        sm.transition(State::Launching).unwrap();
        sm.transition(State::ShuttingDown).unwrap();
        assert!(sm.transition(State::ShuttingDown).is_err());
        sm.transition(State::Exited).unwrap();
        assert!(sm.transition(State::ShuttingDown).is_err());
    }

    #[test]
    fn cannot_skip_preflight() {
        let mut sm = StateMachine::new();
        assert!(sm.transition(State::Launching).is_err());
        assert!(sm.transition(State::Running).is_err());
    }
}
