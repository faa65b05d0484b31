use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde_json::Value;
use tokio::sync::oneshot;
use uuid::Uuid;

use super::MessageReference;

struct Pending {
    expects: MessageReference,
    tx: oneshot::Sender<Value>,
    registered: Instant,
}

/// Requests still waiting for their response, keyed by request id.
#[derive(Default)]
pub struct PendingRequests {
    inner: Mutex<HashMap<Uuid, Pending>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `id` as awaiting a message tagged `expects`. The entry lives
    /// until the returned guard is dropped.
    pub fn register(&self, id: Uuid, expects: MessageReference) -> (PendingGuard<'_>, oneshot::Receiver<Value>) {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id, Pending { expects, tx, registered: Instant::now() });
        (PendingGuard { requests: self, id }, rx)
    }

    /// Hands `message` to the request it answers. Returns false when no such
    /// request is waiting or the reference does not match.
    pub fn resolve(&self, request_id: Uuid, reference: MessageReference, message: Value) -> bool {
        let mut pending = self.lock();
        match pending.get(&request_id) {
            Some(entry) if entry.expects == reference => {}
            Some(entry) => {
                tracing::debug!(
                    request_id = %request_id,
                    expected = ?entry.expects,
                    got = ?reference,
                    "Response reference mismatch"
                );
                return false;
            }
            None => return false,
        }
        let Some(entry) = pending.remove(&request_id) else {
            return false;
        };
        tracing::trace!(
            request_id = %request_id,
            elapsed_ms = entry.registered.elapsed().as_millis() as u64,
            "Response matched"
        );
        entry.tx.send(message).is_ok()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn remove(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Pending>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its request from the map on drop, whichever way the wait ended.
pub struct PendingGuard<'a> {
    requests: &'a PendingRequests,
    id: Uuid,
}

impl PendingGuard<'_> {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.requests.remove(&self.id);
    }
}
