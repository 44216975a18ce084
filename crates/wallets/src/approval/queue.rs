use std::collections::VecDeque;

use tokio::sync::oneshot;
use uuid::Uuid;

/// A queued request together with the channel its answer is delivered on.
#[derive(Debug)]
pub(crate) struct Entry<Req, Resp> {
    pub id: Uuid,
    pub request: Req,
    pub responder: oneshot::Sender<Resp>,
}

/// FIFO of requests waiting for an answer, keyed by request id.
#[derive(Debug)]
pub(crate) struct RequestQueue<Req, Resp> {
    entries: VecDeque<Entry<Req, Resp>>,
}

impl<Req, Resp> Default for RequestQueue<Req, Resp> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Resp> RequestQueue<Req, Resp> {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self { entries: VecDeque::new() }
    }

    /// Add a request to the back of the queue.
    pub fn add_request(&mut self, id: Uuid, request: Req, responder: oneshot::Sender<Resp>) {
        self.entries.push_back(Entry { id, request, responder });
    }

    /// Check if a request with the given id is queued.
    pub fn has_request(&self, id: &Uuid) -> bool {
        self.entries.iter().any(|entry| entry.id == *id)
    }

    /// Read the request at the front of the queue.
    pub fn read_request(&self) -> Option<&Req> {
        self.entries.front().map(|entry| &entry.request)
    }

    /// Take the request at the front of the queue.
    pub fn pop_request(&mut self) -> Option<Entry<Req, Resp>> {
        self.entries.pop_front()
    }

    /// Remove the request with the given id, wherever it is in the queue.
    pub fn remove_request(&mut self, id: &Uuid) -> Option<Entry<Req, Resp>> {
        let idx = self.entries.iter().position(|entry| entry.id == *id)?;
        self.entries.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
