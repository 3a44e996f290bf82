//! Per-screen request/response mirror.
//!
//! Each screen moves `Idle -> Loading -> Success | Failed`. Every operation
//! takes a [`Ticket`]; only the most recently issued ticket may settle the
//! screen, so a slow response for a superseded request is dropped.

pub mod failure;
pub mod orchestrator;

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, warn};

use crate::backend::ApiError;

pub use failure::{Failure, FailureKind};
pub use orchestrator::ViewOrchestrator;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewState<T> {
    Idle,
    Loading,
    Success {
        data: T,
    },
    Failed {
        failure: Failure,
    },
}

impl<T> ViewState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed { failure } => Some(failure),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            Self::Idle => ViewState::Idle,
            Self::Loading => ViewState::Loading,
            Self::Success { data } => ViewState::Success { data: f(data) },
            Self::Failed { failure } => ViewState::Failed { failure },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug)]
pub struct ViewModel<T> {
    name: &'static str,
    state: ViewState<T>,
    issued: u64,
}

impl<T> ViewModel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: ViewState::Idle,
            issued: 0,
        }
    }

    pub fn state(&self) -> &ViewState<T> {
        &self.state
    }

    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        self.state = ViewState::Loading;
        debug!(screen = self.name, ticket = self.issued, "operation started");
        Ticket(self.issued)
    }

    /// Applies `outcome` if `ticket` is still current. Returns whether it was applied.
    pub fn settle(&mut self, ticket: Ticket, outcome: Result<T, ApiError>) -> bool {
        if ticket.0 != self.issued {
            warn!(
                screen = self.name,
                stale = ticket.0,
                current = self.issued,
                "discarding superseded response"
            );
            return false;
        }
        self.state = match outcome {
            Ok(data) => ViewState::Success { data },
            Err(err) => ViewState::Failed {
                failure: Failure::from(&err),
            },
        };
        true
    }

    /// Fails without contacting the backend, superseding anything in flight.
    pub fn fail_locally(&mut self, err: ApiError) {
        let ticket = self.begin();
        self.settle(ticket, Err(err));
    }

    /// Back to idle; responses still in flight will be discarded.
    pub fn clear(&mut self) {
        self.issued += 1;
        self.state = ViewState::Idle;
    }
}

pub(crate) fn lock<T>(view: &Mutex<ViewModel<T>>) -> MutexGuard<'_, ViewModel<T>> {
    view.lock().expect("view mutex poisoned")
}

/// Runs `operation` against `view`, honouring last-write-wins.
pub async fn drive<T, F>(view: &Mutex<ViewModel<T>>, operation: F) -> bool
where
    F: Future<Output = Result<T, ApiError>>,
{
    let ticket = lock(view).begin();
    finish(view, ticket, operation).await
}

/// Settles an operation whose ticket was issued earlier.
pub async fn finish<T, F>(view: &Mutex<ViewModel<T>>, ticket: Ticket, operation: F) -> bool
where
    F: Future<Output = Result<T, ApiError>>,
{
    let outcome = operation.await;
    lock(view).settle(ticket, outcome)
}
