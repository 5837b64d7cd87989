//! "Switch to latest" bookkeeping for derived background work.
//!
//! Each new request aborts the task started for the previous one and
//! receives a fresh [`Ticket`]. Results carry the ticket they were started
//! with, so anything finishing after being superseded can be recognised and
//! discarded even if it raced the abort.

use tokio::task::JoinHandle;

/// Monotonic sequence number identifying one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(u64);

#[derive(Debug, Default)]
pub struct SwitchLatest {
    seq: u64,
    current: Option<JoinHandle<()>>,
}

impl SwitchLatest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the in-flight task, if any, and issue the ticket for the next
    /// request.
    pub fn begin(&mut self) -> Ticket {
        self.abort_current();
        self.seq += 1;
        Ticket(self.seq)
    }

    /// Record the task working on the current ticket.
    pub fn attach(&mut self, handle: JoinHandle<()>) {
        if let Some(previous) = self.current.replace(handle) {
            previous.abort();
        }
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.seq
    }

    /// Abort the in-flight task and invalidate every ticket issued so far.
    pub fn cancel(&mut self) {
        self.abort_current();
        self.seq += 1;
    }

    /// Abort the in-flight task and wait until it is gone.
    pub async fn shutdown(&mut self) {
        self.seq += 1;
        if let Some(handle) = self.current.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    fn abort_current(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.abort();
        }
    }
}
