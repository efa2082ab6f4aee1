//! Per-alert two-state lifecycle.
//!
//! An alert is either armed (`Active`) or has already fired and is dormant
//! (`Notified`). The store persists this as the `isNotified` flag; this module
//! decides which events are legal from which state before anything is sent.
//!
//! ```text
//!   create ──► Active ──notify──► Notified
//!                ▲                   │
//!                └──────reset────────┘
//!   edit: either state, unchanged unless the form sets it
//!   delete: either state, terminal
//! ```

use crate::error::LifecycleError;
use crate::models::Alert;
use std::fmt;

/// Lifecycle state of a single alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertState {
    /// Armed; considered by the price monitor.
    Active,
    /// Fired once; ignored by the monitor until reset.
    Notified,
}

/// Something that happens to an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// User submits a validated create form.
    Create,
    /// Server-side monitor observed the threshold crossing.
    Notify,
    /// User re-arms a fired alert.
    Reset,
    /// User submits an edit form. `None` keeps the current state.
    Edit { notified: Option<bool> },
    /// User confirmed removal.
    Delete,
}

impl AlertState {
    /// State of a freshly created alert.
    pub fn initial() -> Self {
        AlertState::Active
    }

    pub fn from_notified(is_notified: bool) -> Self {
        if is_notified {
            AlertState::Notified
        } else {
            AlertState::Active
        }
    }

    pub fn of(alert: &Alert) -> Self {
        Self::from_notified(alert.is_notified)
    }

    pub fn is_notified(self) -> bool {
        self == AlertState::Notified
    }

    /// Apply `event`, returning the next state or `None` once the alert is gone.
    pub fn apply(self, event: Event) -> Result<Option<AlertState>, LifecycleError> {
        let next = match (self, event) {
            (AlertState::Active, Event::Notify) => AlertState::Notified,
            (AlertState::Notified, Event::Reset) => AlertState::Active,
            (current, Event::Edit { notified }) => {
                notified.map(AlertState::from_notified).unwrap_or(current)
            }
            (_, Event::Delete) => return Ok(None),
            (from, event) => return Err(LifecycleError { from, event }),
        };
        Ok(Some(next))
    }

    /// Whether the price monitor should evaluate alerts in this state.
    pub fn is_armed(self) -> bool {
        self == AlertState::Active
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertState::Active => write!(f, "ACTIVE"),
            AlertState::Notified => write!(f, "NOTIFIED"),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Create => write!(f, "create"),
            Event::Notify => write!(f, "notify"),
            Event::Reset => write!(f, "reset"),
            Event::Edit { .. } => write!(f, "edit"),
            Event::Delete => write!(f, "delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_then_reset_round_trip() {
        let state = AlertState::initial();
        let fired = state.apply(Event::Notify).unwrap().unwrap();
        assert_eq!(fired, AlertState::Notified);
        assert!(!fired.is_armed());

        let rearmed = fired.apply(Event::Reset).unwrap().unwrap();
        assert_eq!(rearmed, AlertState::Active);
    }

    #[test]
    fn test_reset_requires_notified() {
        let err = AlertState::Active.apply(Event::Reset).unwrap_err();
        assert_eq!(err.from, AlertState::Active);
        assert_eq!(err.event, Event::Reset);
    }

    #[test]
    fn test_notify_twice_is_rejected() {
        assert!(AlertState::Notified.apply(Event::Notify).is_err());
    }

    #[test]
    fn test_edit_preserves_state_by_default() {
        for state in [AlertState::Active, AlertState::Notified] {
            let next = state.apply(Event::Edit { notified: None }).unwrap();
            assert_eq!(next, Some(state));
        }
        let next = AlertState::Notified
            .apply(Event::Edit {
                notified: Some(false),
            })
            .unwrap();
        assert_eq!(next, Some(AlertState::Active));
    }

    #[test]
    fn test_delete_is_terminal_from_any_state() {
        assert_eq!(AlertState::Active.apply(Event::Delete).unwrap(), None);
        assert_eq!(AlertState::Notified.apply(Event::Delete).unwrap(), None);
    }

    #[test]
    fn test_create_only_as_initial_event() {
        assert!(AlertState::Active.apply(Event::Create).is_err());
        assert_eq!(AlertState::initial(), AlertState::Active);
    }
}
