// onStatus event waiting

use std::collections::{HashMap, VecDeque};

use thiserror::Error;
use tokio::sync::oneshot;

use crate::amf::{AMF0Object, AMF0Value};

/// Why a status waiter did not get its event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusFailure {
    /// The onStatus info object did not carry a `code`
    #[error("onStatus info object without a code")]
    Contract,

    /// A different status code arrived than the one waited for
    #[error("waiting for status {expected}, got {got}")]
    UnexpectedStatus { expected: String, got: String },

    /// The connection went away first
    #[error("disconnected: {0}")]
    Disconnected(String),
}

/// Outcome of a status wait: the info object or a failure
pub type StatusResult = Result<AMF0Object, StatusFailure>;

/// Handle for a registered status wait
pub struct StatusWaiter {
    receiver: oneshot::Receiver<StatusResult>,
}

impl StatusWaiter {
    /// Waits for the matching onStatus event
    pub async fn wait(self) -> StatusResult {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(StatusFailure::Disconnected(
                "status wait abandoned".to_string(),
            )),
        }
    }
}

/// Pending onStatus waiters, a FIFO per message stream
///
/// A waiter either names the exact status code it wants or waits for
/// whatever comes (wildcard). Each incoming event consumes the front
/// waiter of its stream: a matching code resolves it, a mismatch
/// fails it.
#[derive(Default)]
pub struct StatusWaiters {
    waiting: HashMap<u32, VecDeque<(Option<String>, oneshot::Sender<StatusResult>)>>,
}

impl StatusWaiters {
    pub fn new() -> StatusWaiters {
        StatusWaiters::default()
    }

    /// Registers a waiter; None waits for any code
    pub fn wait_status(&mut self, ms_id: u32, code: Option<String>) -> StatusWaiter {
        let (sender, receiver) = oneshot::channel();

        self.waiting
            .entry(ms_id)
            .or_default()
            .push_back((code, sender));

        StatusWaiter { receiver }
    }

    /// Feeds an onStatus info value to the front waiter of the stream
    ///
    /// Returns true when a waiter consumed the event.
    pub fn dispatch(&mut self, ms_id: u32, info: &AMF0Value) -> bool {
        let queue = match self.waiting.get_mut(&ms_id) {
            Some(queue) => queue,
            None => return false,
        };

        let (expected, sender) = match queue.pop_front() {
            Some(waiter) => waiter,
            None => return false,
        };

        let code = match info.get_object_property("code") {
            Some(AMF0Value::String { value }) => value.clone(),
            _ => {
                let _ = sender.send(Err(StatusFailure::Contract));
                return true;
            }
        };

        let result = match expected {
            None => Ok(info.get_object().cloned().unwrap_or_default()),
            Some(expected) if expected == code => {
                Ok(info.get_object().cloned().unwrap_or_default())
            }
            Some(expected) => Err(StatusFailure::UnexpectedStatus {
                expected,
                got: code,
            }),
        };

        let _ = sender.send(result);
        true
    }

    /// Fails every waiter with the disconnect reason
    pub fn cancel_all(&mut self, reason: &str) {
        for (_, queue) in self.waiting.drain() {
            for (_, sender) in queue {
                let _ = sender.send(Err(StatusFailure::Disconnected(reason.to_string())));
            }
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn status_info(code: &str) -> AMF0Value {
        AMF0Value::Object {
            properties: AMF0Object::new()
                .with("level", AMF0Value::string("status"))
                .with("code", AMF0Value::string(code)),
        }
    }

    #[tokio::test]
    async fn test_exact_code_match() {
        let mut waiters = StatusWaiters::new();

        let waiter = waiters.wait_status(1, Some("NetStream.Play.Start".to_string()));

        assert!(waiters.dispatch(1, &status_info("NetStream.Play.Start")));

        let info = waiter.wait().await.unwrap();
        assert_eq!(
            info.get("code"),
            Some(&AMF0Value::string("NetStream.Play.Start"))
        );
    }

    #[tokio::test]
    async fn test_wildcard_matches_any_code() {
        let mut waiters = StatusWaiters::new();

        let waiter = waiters.wait_status(1, None);

        waiters.dispatch(1, &status_info("NetStream.Publish.Start"));

        assert!(waiter.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_code_mismatch_fails_waiter_and_consumes_event() {
        let mut waiters = StatusWaiters::new();

        let waiter = waiters.wait_status(1, Some("NetStream.Play.Start".to_string()));

        assert!(waiters.dispatch(1, &status_info("NetStream.Play.Failed")));

        match waiter.wait().await {
            Err(StatusFailure::UnexpectedStatus { expected, got }) => {
                assert_eq!(expected, "NetStream.Play.Start");
                assert_eq!(got, "NetStream.Play.Failed");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_info_without_code_fails_waiter() {
        let mut waiters = StatusWaiters::new();

        let waiter = waiters.wait_status(1, None);

        let info = AMF0Value::Object {
            properties: AMF0Object::new().with("level", AMF0Value::string("status")),
        };

        assert!(waiters.dispatch(1, &info));
        assert_eq!(waiter.wait().await, Err(StatusFailure::Contract));
    }

    #[tokio::test]
    async fn test_fifo_order_per_stream() {
        let mut waiters = StatusWaiters::new();

        let first = waiters.wait_status(1, None);
        let second = waiters.wait_status(1, None);

        waiters.dispatch(1, &status_info("A"));
        waiters.dispatch(1, &status_info("B"));

        assert_eq!(
            first.wait().await.unwrap().get("code"),
            Some(&AMF0Value::string("A"))
        );
        assert_eq!(
            second.wait().await.unwrap().get("code"),
            Some(&AMF0Value::string("B"))
        );
    }

    #[test]
    fn test_unconsumed_event() {
        let mut waiters = StatusWaiters::new();

        assert!(!waiters.dispatch(1, &status_info("A")));
    }

    #[tokio::test]
    async fn test_cancel_all() {
        let mut waiters = StatusWaiters::new();

        let waiter = waiters.wait_status(1, None);

        waiters.cancel_all("connection lost");

        assert!(matches!(
            waiter.wait().await,
            Err(StatusFailure::Disconnected(_))
        ));
    }
}
