//! Error types for alert validation, storage, and lifecycle operations.

use crate::lifecycle::{AlertState, Event};
use crate::models::AlertId;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// Client-side form validation failure. Blocks submission and is shown inline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter a ticker symbol.")]
    EmptyTicker,

    #[error("Please enter a valid price greater than 0.")]
    InvalidPrice,

    #[error("Please select a direction.")]
    MissingDirection,

    /// The registry lookup did not recognize the symbol.
    #[error("Invalid ticker symbol. Please check the symbol or try selecting from the list.")]
    UnknownTicker(String),
}

/// Failure talking to the alert or ticker store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {0}")]
    Status(StatusCode),

    #[error("alert {0} not found")]
    NotFound(AlertId),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A lifecycle event that is not allowed from the alert's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot apply {event} to an alert in state {from}")]
pub struct LifecycleError {
    pub from: AlertState,
    pub event: Event,
}

/// User-initiated store action, used to name failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Fetch,
    Create,
    Update,
    Delete,
    Reset,
}

impl Action {
    /// User-facing failure message for this action.
    pub fn failure_message(self) -> &'static str {
        match self {
            Action::Load => "Failed to load alerts.",
            Action::Fetch => "Failed to load alert.",
            Action::Create => "Failed to create alert.",
            Action::Update => "Failed to update alert.",
            Action::Delete => "Failed to delete alert.",
            Action::Reset => "Failed to reactivate alert.",
        }
    }

    /// User-facing success message for this action.
    pub fn success_message(self) -> &'static str {
        match self {
            Action::Load => "Alerts loaded.",
            Action::Fetch => "Alert loaded.",
            Action::Create => "Alert created!",
            Action::Update => "Alert updated!",
            Action::Delete => "Alert has been deleted.",
            Action::Reset => "Alert reactivated!",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Load => "load",
            Action::Fetch => "fetch",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Reset => "reset",
        };
        f.write_str(name)
    }
}

/// Error returned by controller operations.
///
/// None of these are fatal: the controller stays usable after every variant.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Transport or not-found failure from the store.
    #[error("{}", .action.failure_message())]
    Failed {
        action: Action,
        #[source]
        source: StoreError,
    },

    /// The id is not part of the currently displayed list.
    #[error("alert {0} is not in the current list")]
    UnknownAlert(AlertId),
}

impl AlertError {
    pub(crate) fn failed(action: Action, source: StoreError) -> Self {
        AlertError::Failed { action, source }
    }
}
