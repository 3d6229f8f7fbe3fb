use thiserror::Error;

/// Phases of a play session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Waiting for the player to answer the current card.
    Question,
    /// The outcome of the current card is shown.
    Reveal,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Player answered the current card.
    Answer,
    /// Player moved on after a reveal.
    Next,
    /// Player picked another deck; allowed from any phase.
    ChangeDeck(String),
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when applying a planned transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    /// State machine phase changed since the plan was created.
    #[error("phase changed since planning (expected {expected:?}, got {actual:?})")]
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    #[error("version changed since planning (expected {expected}, got {actual})")]
    VersionMismatch {
        /// Version when plan was created.
        expected: u64,
        /// Current version.
        actual: u64,
    },
}

/// A validated transition that has not been applied yet.
///
/// Planning first lets the tracker run the side effects of a transition (persisting an
/// answer, drawing a new order) only once it knows the transition is legal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Phase before the transition.
    pub from: SessionPhase,
    /// Phase after the transition.
    pub to: SessionPhase,
    /// Triggering event.
    pub event: SessionEvent,
    /// Version the machine will have once applied.
    pub version_next: u64,
}

/// Question/reveal cycle with a version counter bumped on every applied transition.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
    version: u64,
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Question,
            version: 0,
        }
    }
}

impl SessionMachine {
    /// Create a machine waiting on its first question.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of applied transitions.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate `event` against the current phase.
    pub fn plan(&self, event: SessionEvent) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(&event)?;
        Ok(Plan {
            from: self.phase,
            to,
            event,
            version_next: self.version + 1,
        })
    }

    /// Apply a plan produced by [`SessionMachine::plan`], returning the new phase.
    pub fn apply(&mut self, plan: Plan) -> Result<SessionPhase, ApplyError> {
        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        Ok(self.phase)
    }

    /// Bump the version without changing phase, for state changes outside the cycle.
    pub fn touch(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    fn compute_transition(&self, event: &SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Question, SessionEvent::Answer) => SessionPhase::Reveal,
            (SessionPhase::Reveal, SessionEvent::Next) => SessionPhase::Question,
            (_, SessionEvent::ChangeDeck(_)) => SessionPhase::Question,
            (from, event) => {
                return Err(InvalidTransition {
                    from,
                    event: event.clone(),
                });
            }
        };
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan).unwrap()
    }

    #[test]
    fn initial_state_is_question() {
        let sm = SessionMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Question);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn answer_next_cycle_bumps_version() {
        let mut sm = SessionMachine::new();
        assert_eq!(apply(&mut sm, SessionEvent::Answer), SessionPhase::Reveal);
        assert_eq!(apply(&mut sm, SessionEvent::Next), SessionPhase::Question);
        assert_eq!(sm.version(), 2);
    }

    #[test]
    fn change_deck_is_allowed_from_reveal() {
        let mut sm = SessionMachine::new();
        apply(&mut sm, SessionEvent::Answer);
        assert_eq!(
            apply(&mut sm, SessionEvent::ChangeDeck("Exercise".into())),
            SessionPhase::Question
        );
    }

    #[test]
    fn invalid_transition_returns_error() {
        let sm = SessionMachine::new();
        let err = sm.plan(SessionEvent::Next).unwrap_err();
        assert_eq!(err.from, SessionPhase::Question);
        assert_eq!(err.event, SessionEvent::Next);

        let mut sm = SessionMachine::new();
        apply(&mut sm, SessionEvent::Answer);
        assert!(sm.plan(SessionEvent::Answer).is_err());
    }

    #[test]
    fn stale_plan_is_rejected() {
        let mut sm = SessionMachine::new();
        let stale = sm.plan(SessionEvent::ChangeDeck("All".into())).unwrap();
        sm.touch();
        assert!(matches!(
            sm.apply(stale),
            Err(ApplyError::VersionMismatch { .. })
        ));
    }
}
