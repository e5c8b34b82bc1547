//! Lifecycle of a session's cooperating tasks under one cancel context.

use crate::error::{SessionError, SessionErrorType};
use accord_model::gateway::CloseCode;
use std::{future::Future, sync::Arc};
use tokio::{sync::watch, task::JoinHandle};

/// Reason carried on the cancel context when a session is shut down on
/// purpose. Error-driven shutdown carries no signal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Signal {
    /// The user asked the session to disconnect.
    Disconnect,
    /// The session should be reopened.
    Reconnect,
}

/// Classified result of waiting for a session's tasks to finish.
#[derive(Debug)]
#[non_exhaustive]
pub enum Outcome {
    /// No tasks were running.
    None,
    /// The session was disconnected on request.
    Disconnect,
    /// The session ended in a way that calls for a reconnect.
    Reconnect,
    /// A task failed.
    Error(SessionError),
    /// The session was disconnecting when a task failed; carries the failure.
    DisconnectError(SessionError),
    /// Every task exited without an error or a signal.
    Undefined,
}

#[derive(Clone, Debug)]
enum CancelState {
    Active,
    Cancelled(Option<Signal>),
}

/// Cancel context shared by every task of one session.
///
/// Cancellation is cooperative: each task selects on [`Context::done`] every
/// iteration. The first cancellation wins; later ones do not overwrite the
/// recorded signal.
#[derive(Clone, Debug)]
pub(crate) struct Context {
    tx: Arc<watch::Sender<CancelState>>,
    rx: watch::Receiver<CancelState>,
}

impl Context {
    fn new() -> Self {
        let (tx, rx) = watch::channel(CancelState::Active);

        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel the session with an explicit signal.
    pub fn cancel(&self, signal: Signal) {
        self.cancel_with(Some(signal));
    }

    /// Cancel the session because of an error; no signal is recorded.
    pub fn cancel_on_error(&self) {
        self.cancel_with(None);
    }

    fn cancel_with(&self, signal: Option<Signal>) {
        self.tx.send_if_modified(|state| {
            if matches!(state, CancelState::Active) {
                *state = CancelState::Cancelled(signal);

                true
            } else {
                false
            }
        });
    }

    /// Whether the context has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.rx.borrow(), CancelState::Cancelled(_))
    }

    /// The recorded signal, if the context was cancelled with one.
    pub fn signal(&self) -> Option<Signal> {
        match *self.rx.borrow() {
            CancelState::Cancelled(signal) => signal,
            CancelState::Active => None,
        }
    }

    /// Resolve once the context is cancelled.
    pub async fn done(&mut self) {
        loop {
            if matches!(*self.rx.borrow_and_update(), CancelState::Cancelled(_)) {
                return;
            }

            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// A group of session tasks sharing one cancel context.
///
/// The group ends exactly when all tasks have exited; [`TaskGroup::wait`]
/// collects the first error and classifies the shutdown.
#[derive(Debug)]
pub(crate) struct TaskGroup {
    context: Context,
    handles: Vec<JoinHandle<Result<(), SessionError>>>,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self {
            context: Context::new(),
            handles: Vec::new(),
        }
    }

    pub fn context(&self) -> Context {
        self.context.clone()
    }

    pub fn spawn(
        &mut self,
        task: impl Future<Output = Result<(), SessionError>> + Send + 'static,
    ) {
        self.handles.push(tokio::spawn(task));
    }

    pub fn take_handles(&mut self) -> Vec<JoinHandle<Result<(), SessionError>>> {
        std::mem::take(&mut self.handles)
    }
}

/// Classify a finished task group into an [`Outcome`].
pub(crate) fn classify(
    signal: Option<Signal>,
    error: Option<SessionError>,
    ran: bool,
) -> Outcome {
    match (signal, error) {
        (Some(Signal::Reconnect), _) => Outcome::Reconnect,
        (Some(Signal::Disconnect), None) => Outcome::Disconnect,
        (Some(Signal::Disconnect), Some(error)) => Outcome::DisconnectError(error),
        (None, Some(error)) => {
            // A close error whose code the table marks reconnectable still
            // means reopen, even when no task recorded the signal.
            if let SessionErrorType::Close {
                code: Some(code), ..
            } = error.kind()
            {
                if CloseCode::from_code(*code).map_or(false, CloseCode::can_reconnect) {
                    return Outcome::Reconnect;
                }
            }

            Outcome::Error(error)
        }
        (None, None) => {
            if ran {
                Outcome::Undefined
            } else {
                Outcome::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, Context, Outcome, Signal};
    use crate::error::{SessionError, SessionErrorType};

    #[test]
    fn first_cancellation_wins() {
        let context = Context::new();

        context.cancel(Signal::Disconnect);
        context.cancel(Signal::Reconnect);

        assert_eq!(Some(Signal::Disconnect), context.signal());
        assert!(context.is_cancelled());
    }

    #[test]
    fn classification() {
        assert!(matches!(classify(None, None, false), Outcome::None));
        assert!(matches!(classify(None, None, true), Outcome::Undefined));
        assert!(matches!(
            classify(Some(Signal::Disconnect), None, true),
            Outcome::Disconnect
        ));
        assert!(matches!(
            classify(Some(Signal::Reconnect), None, true),
            Outcome::Reconnect
        ));

        let fatal = SessionError::new(SessionErrorType::Close {
            code: Some(4004),
            description: Some("authentication failed"),
        });
        assert!(matches!(classify(None, Some(fatal), true), Outcome::Error(_)));

        let resumable = SessionError::new(SessionErrorType::Close {
            code: Some(4009),
            description: Some("session timed out"),
        });
        assert!(matches!(
            classify(None, Some(resumable), true),
            Outcome::Reconnect
        ));

        let failed = SessionError::new(SessionErrorType::Sending);
        assert!(matches!(
            classify(Some(Signal::Disconnect), Some(failed), true),
            Outcome::DisconnectError(_)
        ));
    }

    #[tokio::test]
    async fn done_resolves_after_cancel() {
        let context = Context::new();
        let mut waiter = context.clone();

        let handle = tokio::spawn(async move {
            waiter.done().await;
        });

        context.cancel(Signal::Reconnect);
        handle.await.unwrap();
    }
}
