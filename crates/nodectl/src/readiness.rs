//!
//! Readiness polling used after a node's main service is (re)started.
//!
//! The probe is retried while the service refuses or cannot accept
//! connections, or answers with an `error` member. Any other backend failure
//! propagates immediately, and an answer carrying neither `error` nor
//! `result` is a contract violation.
//!

use crate::{
    backend::{BackendError, TransportFault},
    config::schema::ReadinessConfig,
    error::NodeControlError,
    log,
    log::Topic,
};
use serde_json::Value;
use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    thread,
    time::{Duration, Instant},
};

///
/// ReadinessPolicy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReadinessPolicy {
    pub poll_interval: Duration,
    /// Overall deadline; `None` retries forever.
    pub timeout: Option<Duration>,
}

impl ReadinessPolicy {
    #[must_use]
    pub const fn unbounded(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            timeout: None,
        }
    }

    #[must_use]
    pub fn from_config(config: &ReadinessConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            timeout: config.timeout(),
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from_config(&ReadinessConfig::default())
    }
}

///
/// CancelToken
///
/// Cloneable cancellation flag. Cancelling wakes any thread currently
/// sleeping between readiness attempts.
///

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Option<Arc<CancelState>>,
}

#[derive(Debug, Default)]
struct CancelState {
    cancelled: Mutex<bool>,
    wake: Condvar,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Some(Arc::default()),
        }
    }

    /// A token that can never be cancelled.
    #[must_use]
    pub const fn never() -> Self {
        Self { inner: None }
    }

    pub fn cancel(&self) {
        if let Some(state) = &self.inner {
            *state.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
            state.wake.notify_all();
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.as_ref().is_some_and(|state| {
            *state.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
        })
    }

    /// Sleep for `dur` unless cancelled first. Returns true if cancelled.
    pub fn sleep(&self, dur: Duration) -> bool {
        let Some(state) = &self.inner else {
            thread::sleep(dur);
            return false;
        };

        let guard = state.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = state
            .wake
            .wait_timeout_while(guard, dur, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);

        *guard
    }
}

// probe_is_up
// Ok(true) when the response is a valid success, Ok(false) when the service
// reported an error, Err on a shape violation.
fn probe_is_up(node: &str, response: &Value) -> Result<bool, NodeControlError> {
    if response.get("error").is_some() {
        return Ok(false);
    }

    if response.get("result").is_none() {
        return Err(NodeControlError::ReadinessShape {
            node: node.to_string(),
            response: response.clone(),
        });
    }

    Ok(true)
}

const fn is_not_ready(err: &BackendError) -> bool {
    match err.transport_fault() {
        Some(fault) => TransportFault::is_not_ready(fault),
        None => false,
    }
}

/// Block until `probe` reports the node as up.
pub(crate) fn wait_until_ready(
    node: &str,
    policy: &ReadinessPolicy,
    cancel: &CancelToken,
    mut probe: impl FnMut() -> Result<Value, BackendError>,
) -> Result<(), NodeControlError> {
    let started = Instant::now();

    loop {
        if cancel.is_cancelled() {
            return Err(NodeControlError::Cancelled {
                node: node.to_string(),
            });
        }

        match probe() {
            Ok(response) => {
                if probe_is_up(node, &response)? {
                    log!(Topic::Readiness, Info, "Node {} is up", node);
                    return Ok(());
                }
            }
            Err(err) if is_not_ready(&err) => {}
            Err(err) => return Err(err.into()),
        }

        let mut delay = policy.poll_interval;
        if let Some(timeout) = policy.timeout {
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(NodeControlError::ReadinessTimedOut {
                    node: node.to_string(),
                    waited,
                });
            }
            delay = delay.min(timeout - waited);
        }

        log!(
            Topic::Readiness,
            Info,
            "Node {} is not ready yet, will check again in {} seconds",
            node,
            delay.as_secs_f64()
        );

        if cancel.sleep(delay) {
            return Err(NodeControlError::Cancelled {
                node: node.to_string(),
            });
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;

    const FAST: ReadinessPolicy = ReadinessPolicy::unbounded(Duration::from_millis(1));

    fn scripted(
        responses: Vec<Result<Value, BackendError>>,
    ) -> (impl FnMut() -> Result<Value, BackendError>, Arc<Mutex<usize>>) {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let mut queue: VecDeque<_> = responses.into();

        let probe = move || {
            *counter.lock().unwrap() += 1;
            queue
                .pop_front()
                .unwrap_or_else(|| Err(BackendError::other("probe script exhausted")))
        };

        (probe, calls)
    }

    fn refused() -> Result<Value, BackendError> {
        Err(BackendError::transport(
            TransportFault::ConnectionRefused,
            "connection refused",
        ))
    }

    #[test]
    fn retries_through_not_ready_responses_until_result() {
        let (probe, calls) = scripted(vec![
            refused(),
            Err(BackendError::transport(TransportFault::Connect, "no route")),
            Ok(json!({"error": "not synced"})),
            Ok(json!({"result": {"current_validators": []}})),
            Ok(json!({"result": "never reached"})),
        ]);

        wait_until_ready("node0", &FAST, &CancelToken::never(), probe).unwrap();

        assert_eq!(*calls.lock().unwrap(), 4);
    }

    #[test]
    fn explicit_null_error_is_still_not_ready() {
        let (probe, calls) = scripted(vec![
            Ok(json!({"error": null, "result": 1})),
            Ok(json!({"result": 1})),
        ]);

        wait_until_ready("node0", &FAST, &CancelToken::never(), probe).unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn missing_result_is_a_fatal_shape_violation() {
        let (probe, calls) = scripted(vec![refused(), Ok(json!({"id": "dontcare"}))]);

        let err = wait_until_ready("node1", &FAST, &CancelToken::never(), probe).unwrap_err();

        assert!(matches!(err, NodeControlError::ReadinessShape { ref node, .. } if node == "node1"));
        assert!(err.is_fatal());
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn other_transport_faults_propagate_without_retry() {
        let (probe, calls) = scripted(vec![
            Err(BackendError::transport(TransportFault::Timeout, "read timed out")),
            Ok(json!({"result": 1})),
        ]);

        let err = wait_until_ready("node0", &FAST, &CancelToken::never(), probe).unwrap_err();

        assert!(matches!(err, NodeControlError::Backend(_)));
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn progress_line_reports_the_actual_delay() {
        let policy = ReadinessPolicy::unbounded(Duration::from_millis(250));
        let (probe, _) = scripted(vec![refused(), Ok(json!({"result": 1}))]);

        wait_until_ready("node-250ms", &policy, &CancelToken::never(), probe).unwrap();

        let expected = "Node node-250ms is not ready yet, will check again in 0.25 seconds";
        assert!(
            crate::log::LogBuffer::snapshot()
                .iter()
                .any(|e| e.message == expected)
        );
    }

    #[test]
    fn deadline_bounds_the_wait() {
        let policy = ReadinessPolicy::unbounded(Duration::from_millis(5))
            .with_timeout(Duration::from_millis(20));
        let probe = refused;

        let err = wait_until_ready("node2", &policy, &CancelToken::never(), probe).unwrap_err();

        assert!(matches!(err, NodeControlError::ReadinessTimedOut { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn cancel_interrupts_the_sleep() {
        let cancel = CancelToken::new();
        let policy = ReadinessPolicy::unbounded(Duration::from_secs(3_600));

        let remote = cancel.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.cancel();
        });

        let started = Instant::now();
        let err = wait_until_ready("node3", &policy, &cancel, refused).unwrap_err();
        handle.join().unwrap();

        assert!(matches!(err, NodeControlError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn never_token_is_never_cancelled() {
        let token = CancelToken::never();
        token.cancel();
        assert!(!token.is_cancelled());
        assert!(!token.sleep(Duration::from_millis(1)));
    }
}
