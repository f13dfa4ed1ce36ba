//! Completion handles for dispatched requests.
//!
//! A [`Callback`] carries "what to run on success" and "what to run on
//! failure" for exactly one request. It is bound in one of two styles:
//!
//! * a receiver plus one method per outcome ([`Callback::with_delegate`]),
//! * a closure per outcome ([`Callback::with_closures`]).
//!
//! Resolution never panics. Malformed bindings and panicking handlers come
//! back as a [`DispatchError`] and are logged.

use std::any::Any;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde_json::Value;

use crate::Error;

type SuccessFn = Box<dyn FnOnce(Value) + Send + 'static>;
type FailureFn = Box<dyn FnOnce(Error) + Send + 'static>;

/// Which completion path a resolution targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Failure => f.write_str("failure"),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("receiver does not implement the {0} method")]
    MissingMethod(Outcome),
    #[error("receiver was dropped before the {0} method could run")]
    ReceiverGone(Outcome),
    #[error("{0} handler panicked : {1}")]
    Panicked(Outcome, String),
    #[error("callback was already resolved, {0} ignored")]
    AlreadyResolved(Outcome),
}

trait DelegateBinding: Send {
    fn success(self: Box<Self>, response: Value) -> Result<(), DispatchError>;

    fn failure(self: Box<Self>, error: Error) -> Result<(), DispatchError>;
}

struct MethodBinding<R> {
    receiver: Weak<R>,
    on_success: Option<fn(&R, Value)>,
    on_failure: Option<fn(&R, Error)>,
}

impl<R> DelegateBinding for MethodBinding<R>
where
    R: Send + Sync + 'static,
{
    fn success(self: Box<Self>, response: Value) -> Result<(), DispatchError> {
        let method = self
            .on_success
            .ok_or(DispatchError::MissingMethod(Outcome::Success))?;
        let receiver = self
            .receiver
            .upgrade()
            .ok_or(DispatchError::ReceiverGone(Outcome::Success))?;
        method(&receiver, response);
        Ok(())
    }

    fn failure(self: Box<Self>, error: Error) -> Result<(), DispatchError> {
        let method = self
            .on_failure
            .ok_or(DispatchError::MissingMethod(Outcome::Failure))?;
        let receiver = self
            .receiver
            .upgrade()
            .ok_or(DispatchError::ReceiverGone(Outcome::Failure))?;
        method(&receiver, error);
        Ok(())
    }
}

enum Binding {
    Unbound,
    Delegate(Box<dyn DelegateBinding>),
    Closures {
        on_success: Option<SuccessFn>,
        on_failure: Option<FailureFn>,
    },
}

impl Binding {
    fn style(&self) -> &'static str {
        match self {
            Binding::Unbound => "unbound",
            Binding::Delegate(_) => "delegate",
            Binding::Closures { .. } => "closures",
        }
    }
}

enum State {
    Pending(Binding),
    Resolved(Outcome),
}

/// The completion handle of a single request.
///
/// Resolve it with [`resolve_success`](Callback::resolve_success) or
/// [`resolve_failure`](Callback::resolve_failure). Only the first resolution
/// runs caller logic; later ones are ignored and logged.
pub struct Callback {
    state: Mutex<State>,
}

impl Default for Callback {
    fn default() -> Self {
        Callback::unbound()
    }
}

impl Callback {
    /// A handle with neither style bound. Resolving it does nothing.
    pub fn unbound() -> Self {
        Callback::from_binding(Binding::Unbound)
    }

    /// Bind a receiver and one method per outcome.
    ///
    /// The receiver is held weakly: keep your `Arc` alive until the request
    /// resolves. A `None` method stands for a method the receiver does not
    /// provide; resolving into it reports [`DispatchError::MissingMethod`].
    ///
    /// ```
    /// use std::sync::Arc;
    /// use oauth1_dispatch::{Callback, Error};
    /// use serde_json::Value;
    ///
    /// struct Timeline;
    ///
    /// impl Timeline {
    ///     fn loaded(&self, _body: Value) {}
    ///     fn failed(&self, _err: Error) {}
    /// }
    ///
    /// let timeline = Arc::new(Timeline);
    /// let callback = Callback::with_delegate(
    ///     &timeline,
    ///     Some(Timeline::loaded),
    ///     Some(Timeline::failed),
    /// );
    /// assert!(callback.resolve_success(Value::Null).is_ok());
    /// ```
    pub fn with_delegate<R>(
        receiver: &Arc<R>,
        on_success: Option<fn(&R, Value)>,
        on_failure: Option<fn(&R, Error)>,
    ) -> Self
    where
        R: Send + Sync + 'static,
    {
        Callback::from_binding(Binding::Delegate(Box::new(MethodBinding {
            receiver: Arc::downgrade(receiver),
            on_success,
            on_failure,
        })))
    }

    /// Bind one closure per outcome.
    pub fn with_closures<S, F>(on_success: S, on_failure: F) -> Self
    where
        S: FnOnce(Value) + Send + 'static,
        F: FnOnce(Error) + Send + 'static,
    {
        Callback::from_binding(Binding::Closures {
            on_success: Some(Box::new(on_success)),
            on_failure: Some(Box::new(on_failure)),
        })
    }

    /// Bind only a success closure. Failures are dropped silently.
    pub fn on_success<S>(on_success: S) -> Self
    where
        S: FnOnce(Value) + Send + 'static,
    {
        Callback::from_binding(Binding::Closures {
            on_success: Some(Box::new(on_success)),
            on_failure: None,
        })
    }

    /// Bind only a failure closure. Successes are dropped silently.
    pub fn on_failure<F>(on_failure: F) -> Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        Callback::from_binding(Binding::Closures {
            on_success: None,
            on_failure: Some(Box::new(on_failure)),
        })
    }

    fn from_binding(binding: Binding) -> Self {
        Callback {
            state: Mutex::new(State::Pending(binding)),
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(*self.lock(), State::Resolved(_))
    }

    /// Run the success path with the decoded response.
    pub fn resolve_success(&self, response: Value) -> Result<(), DispatchError> {
        let result = self.take(Outcome::Success).and_then(|binding| {
            guarded(Outcome::Success, move || match binding {
                Binding::Unbound => Ok(()),
                Binding::Delegate(delegate) => delegate.success(response),
                Binding::Closures { on_success, .. } => {
                    if let Some(f) = on_success {
                        f(response);
                    }
                    Ok(())
                }
            })
        });
        report(result)
    }

    /// Run the failure path with the error that ended the request.
    pub fn resolve_failure(&self, error: Error) -> Result<(), DispatchError> {
        let result = self.take(Outcome::Failure).and_then(|binding| {
            guarded(Outcome::Failure, move || match binding {
                Binding::Unbound => Ok(()),
                Binding::Delegate(delegate) => delegate.failure(error),
                Binding::Closures { on_failure, .. } => {
                    if let Some(f) = on_failure {
                        f(error);
                    }
                    Ok(())
                }
            })
        });
        report(result)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, outcome: Outcome) -> Result<Binding, DispatchError> {
        let mut state = self.lock();
        match mem::replace(&mut *state, State::Resolved(outcome)) {
            State::Pending(binding) => Ok(binding),
            State::Resolved(first) => {
                *state = State::Resolved(first);
                Err(DispatchError::AlreadyResolved(outcome))
            }
        }
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        let mut dbg = f.debug_struct("Callback");
        match &*state {
            State::Pending(binding) => dbg.field("binding", &binding.style()),
            State::Resolved(outcome) => dbg.field("resolved", outcome),
        };
        dbg.finish()
    }
}

fn guarded<F>(outcome: Outcome, f: F) -> Result<(), DispatchError>
where
    F: FnOnce() -> Result<(), DispatchError>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(DispatchError::Panicked(outcome, panic_message(&*payload))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn report(result: Result<(), DispatchError>) -> Result<(), DispatchError> {
    match &result {
        Err(err @ DispatchError::AlreadyResolved(_)) => {
            tracing::warn!(error = %err, "ignoring repeated callback resolution");
        }
        Err(err) => {
            tracing::error!(error = %err, "callback dispatch failed");
        }
        Ok(()) => {}
    }
    result
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use http::StatusCode;
    use serde_json::json;
    use tracing::field::{Field, Visit};
    use tracing::{span, Level};

    use super::*;

    fn rejected() -> Error {
        Error::Protocol {
            status: StatusCode::UNAUTHORIZED,
            body: String::new(),
        }
    }

    #[derive(Default)]
    struct Receiver {
        successes: Mutex<Vec<Value>>,
        failures: AtomicUsize,
    }

    impl Receiver {
        fn done(&self, response: Value) {
            self.successes.lock().unwrap().push(response);
        }

        fn failed(&self, _error: Error) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn closures_receive_the_value() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let callback = Callback::with_closures(
            move |v| *sink.lock().unwrap() = Some(v),
            |_| panic!("failure path must not run"),
        );

        callback.resolve_success(json!({"ok": true})).unwrap();
        assert_eq!(*seen.lock().unwrap(), Some(json!({"ok": true})));
        assert!(callback.is_resolved());
    }

    #[test]
    fn success_only_closure_ignores_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback = Callback::on_success(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(callback.resolve_failure(rejected()), Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unbound_is_a_no_op() {
        assert_eq!(Callback::default().resolve_success(Value::Null), Ok(()));
        assert_eq!(Callback::unbound().resolve_failure(rejected()), Ok(()));
    }

    #[test]
    fn delegate_methods_run_on_receiver() {
        let receiver = Arc::new(Receiver::default());
        let ok = Callback::with_delegate(&receiver, Some(Receiver::done), Some(Receiver::failed));
        ok.resolve_success(json!([1, 2])).unwrap();
        let ng = Callback::with_delegate(&receiver, Some(Receiver::done), Some(Receiver::failed));
        ng.resolve_failure(rejected()).unwrap();

        assert_eq!(*receiver.successes.lock().unwrap(), vec![json!([1, 2])]);
        assert_eq!(receiver.failures.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_delegate_method_is_reported() {
        let receiver = Arc::new(Receiver::default());
        let callback = Callback::with_delegate(&receiver, Some(Receiver::done), None);

        assert_eq!(
            callback.resolve_failure(rejected()),
            Err(DispatchError::MissingMethod(Outcome::Failure))
        );
        assert!(callback.is_resolved());
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let receiver = Arc::new(Receiver::default());
        let callback = Callback::with_delegate(&receiver, Some(Receiver::done), None);
        drop(receiver);

        assert_eq!(
            callback.resolve_success(Value::Null),
            Err(DispatchError::ReceiverGone(Outcome::Success))
        );
    }

    #[test]
    fn panicking_handler_is_caught() {
        let callback = Callback::on_failure(|_| panic!("handler exploded"));

        assert_eq!(
            callback.resolve_failure(rejected()),
            Err(DispatchError::Panicked(
                Outcome::Failure,
                "handler exploded".to_string()
            ))
        );
    }

    #[test]
    fn second_resolution_is_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b) = (Arc::clone(&calls), Arc::clone(&calls));
        let callback = Callback::with_closures(
            move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            },
            move |_| {
                b.fetch_add(1, Ordering::SeqCst);
            },
        );

        callback.resolve_success(Value::Null).unwrap();
        assert_eq!(
            callback.resolve_success(Value::Null),
            Err(DispatchError::AlreadyResolved(Outcome::Success))
        );
        assert_eq!(
            callback.resolve_failure(rejected()),
            Err(DispatchError::AlreadyResolved(Outcome::Failure))
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    /// Collects warn and error events emitted on the current thread.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<(Level, String)>>>);

    impl Captured {
        fn events(&self) -> Vec<(Level, String)> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Fields(String);

    impl Visit for Fields {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push_str(&format!("{}={:?} ", field.name(), value));
        }
    }

    impl tracing::Subscriber for Captured {
        fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id {
            span::Id::from_u64(1)
        }

        fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

        fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

        fn event(&self, event: &tracing::Event<'_>) {
            let level = *event.metadata().level();
            if level == Level::WARN || level == Level::ERROR {
                let mut fields = Fields(String::new());
                event.record(&mut fields);
                self.0.lock().unwrap().push((level, fields.0));
            }
        }

        fn enter(&self, _span: &span::Id) {}

        fn exit(&self, _span: &span::Id) {}
    }

    #[test]
    fn dispatch_errors_are_logged() {
        let captured = Captured::default();
        tracing::subscriber::with_default(captured.clone(), || {
            let receiver = Arc::new(Receiver::default());
            let callback = Callback::with_delegate(&receiver, None, Some(Receiver::failed));
            let _ = callback.resolve_success(Value::Null);
            let _ = callback.resolve_failure(rejected());
            let _ = Callback::on_success(|_| panic!("handler exploded")).resolve_success(Value::Null);
        });

        let events = captured.events();
        assert_eq!(events.len(), 3, "{:?}", events);

        assert_eq!(events[0].0, Level::ERROR);
        assert!(events[0].1.contains("callback dispatch failed"));
        assert!(events[0].1.contains("receiver does not implement the success method"));

        assert_eq!(events[1].0, Level::WARN);
        assert!(events[1].1.contains("ignoring repeated callback resolution"));
        assert!(events[1].1.contains("callback was already resolved, failure ignored"));

        assert_eq!(events[2].0, Level::ERROR);
        assert!(events[2].1.contains("success handler panicked : handler exploded"));
    }

    #[test]
    fn clean_resolution_logs_nothing() {
        let captured = Captured::default();
        tracing::subscriber::with_default(captured.clone(), || {
            Callback::on_success(|_| {}).resolve_success(Value::Null).unwrap();
            Callback::unbound().resolve_failure(rejected()).unwrap();
        });
        assert!(captured.events().is_empty());
    }

    #[test]
    fn debug_names_the_binding() {
        let callback = Callback::on_success(|_| {});
        assert_eq!(format!("{:?}", callback), "Callback { binding: \"closures\" }");
        callback.resolve_success(Value::Null).unwrap();
        assert_eq!(format!("{:?}", callback), "Callback { resolved: Success }");
    }
}
