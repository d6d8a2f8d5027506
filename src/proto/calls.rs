// Remote call correlation

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::oneshot;

use crate::amf::AMF0Value;

/// Why a pending call did not resolve to a result
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallFailure {
    /// Peer replied with `_error`; the reply arguments are attached
    #[error("peer replied _error")]
    CommandResultError { args: Vec<AMF0Value> },

    /// The connection went away before the reply arrived
    #[error("disconnected: {0}")]
    Disconnected(String),
}

/// Outcome of a remote call: the `_result` arguments or a failure
pub type CallResult = Result<Vec<AMF0Value>, CallFailure>;

/// Handle for an in-flight remote call
pub struct PendingCall {
    transaction_id: u64,
    receiver: oneshot::Receiver<CallResult>,
}

impl PendingCall {
    /// The transaction id correlating the reply
    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    /// Waits for the `_result` / `_error` reply
    pub async fn wait(self) -> CallResult {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(CallFailure::Disconnected("call abandoned".to_string())),
        }
    }
}

/// Table of pending remote calls, keyed by (ms_id, transaction id)
///
/// A per-ms_id counter supplies transaction ids, starting at 1.
/// Transaction id 0 means "no reply expected" and is never allocated.
#[derive(Default)]
pub struct CallTable {
    pending: HashMap<(u32, u64), oneshot::Sender<CallResult>>,
    next_transaction: HashMap<u32, u64>,
}

impl CallTable {
    pub fn new() -> CallTable {
        CallTable::default()
    }

    /// Allocates the next transaction id for a message stream
    pub fn next_transaction_id(&mut self, ms_id: u32) -> u64 {
        let next = self.next_transaction.entry(ms_id).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    /// Installs a pending call under a fresh transaction id
    pub fn register(&mut self, ms_id: u32) -> PendingCall {
        let transaction_id = self.next_transaction_id(ms_id);
        let (sender, receiver) = oneshot::channel();

        self.pending.insert((ms_id, transaction_id), sender);

        PendingCall {
            transaction_id,
            receiver,
        }
    }

    /// Completes a pending call with a `_result` / `_error` outcome
    ///
    /// Returns false when no call was waiting under that key; such
    /// results are unexpected and routed to a hook by the caller.
    pub fn complete(&mut self, ms_id: u32, transaction_id: u64, result: CallResult) -> bool {
        match self.pending.remove(&(ms_id, transaction_id)) {
            Some(sender) => {
                let _ = sender.send(result);
                true
            }
            None => false,
        }
    }

    /// Number of calls still waiting
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Fails every pending call with the disconnect reason
    pub fn cancel_all(&mut self, reason: &str) {
        for (_, sender) in self.pending.drain() {
            let _ = sender.send(Err(CallFailure::Disconnected(reason.to_string())));
        }
    }
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_start_at_one_per_stream() {
        let mut table = CallTable::new();

        assert_eq!(table.next_transaction_id(1), 1);
        assert_eq!(table.next_transaction_id(1), 2);
        assert_eq!(table.next_transaction_id(2), 1);
    }

    #[tokio::test]
    async fn test_complete_resolves_pending_call() {
        let mut table = CallTable::new();

        let call = table.register(1);
        assert_eq!(call.transaction_id(), 1);

        assert!(table.complete(
            1,
            1,
            Ok(vec![AMF0Value::Null, AMF0Value::string("sing it back")])
        ));

        let result = call.wait().await.unwrap();
        assert_eq!(
            result,
            vec![AMF0Value::Null, AMF0Value::string("sing it back")]
        );
    }

    #[tokio::test]
    async fn test_error_reply_fails_call() {
        let mut table = CallTable::new();

        let call = table.register(1);

        table.complete(
            1,
            1,
            Err(CallFailure::CommandResultError {
                args: vec![AMF0Value::Null],
            }),
        );

        assert!(matches!(
            call.wait().await,
            Err(CallFailure::CommandResultError { .. })
        ));
    }

    #[test]
    fn test_unexpected_result_not_consumed() {
        let mut table = CallTable::new();

        assert!(!table.complete(1, 42, Ok(vec![])));
    }

    #[tokio::test]
    async fn test_cancel_all_fails_pending() {
        let mut table = CallTable::new();

        let call_a = table.register(1);
        let call_b = table.register(2);

        table.cancel_all("connection lost");

        assert_eq!(table.pending_count(), 0);

        for call in [call_a, call_b] {
            match call.wait().await {
                Err(CallFailure::Disconnected(reason)) => {
                    assert_eq!(reason, "connection lost");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }
}
