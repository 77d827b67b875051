//! Worker lifecycle states and the transitions allowed between them.

use super::WorkerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Created, nothing cached yet
    #[default]
    Parsed,
    Installing,
    /// Precache done, waiting to take over
    Installed,
    Activating,
    /// Intercepting requests
    Activated,
    /// Failed or replaced; passes everything through
    Redundant,
}

impl WorkerState {
    /// Whether requests should go through the routing strategies
    pub fn intercepts(self) -> bool {
        self == WorkerState::Activated
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkerState::Parsed => "parsed",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Activated => "activated",
            WorkerState::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

fn is_valid_transition(from: WorkerState, to: WorkerState) -> bool {
    use WorkerState::*;

    matches!(
        (from, to),
        (Parsed, Installing)
            | (Installing, Installed)
            | (Installing, Redundant)
            | (Installed, Activating)
            | (Activating, Activated)
            | (Activating, Redundant)
            | (Activated, Redundant)
    )
}

/// Validated state holder
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: WorkerState,
}

impl Lifecycle {
    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn transition(&mut self, to: WorkerState) -> Result<WorkerState, WorkerError> {
        let from = self.state;
        if !is_valid_transition(from, to) {
            return Err(WorkerError::InvalidStateTransition { from, to });
        }
        self.state = to;
        Ok(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_normal_lifecycle() {
        let mut lifecycle = Lifecycle::default();
        assert_eq!(lifecycle.state(), WorkerState::Parsed);

        for next in [
            WorkerState::Installing,
            WorkerState::Installed,
            WorkerState::Activating,
            WorkerState::Activated,
        ] {
            lifecycle.transition(next).unwrap();
        }
        assert!(lifecycle.state().intercepts());

        lifecycle.transition(WorkerState::Redundant).unwrap();
        assert!(!lifecycle.state().intercepts());
    }

    #[test]
    fn test_rejects_skipping_install() {
        let mut lifecycle = Lifecycle::default();
        let err = lifecycle.transition(WorkerState::Activated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(lifecycle.state(), WorkerState::Parsed);
    }

    #[test]
    fn test_redundant_is_terminal() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.transition(WorkerState::Installing).unwrap();
        lifecycle.transition(WorkerState::Redundant).unwrap();
        assert!(lifecycle.transition(WorkerState::Installing).is_err());
        assert!(lifecycle.transition(WorkerState::Activated).is_err());
    }
}
