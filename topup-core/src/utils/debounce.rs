use std::time::Duration;
use tokio::time::Instant;

/// Tracks the quiet-period deadline of a stream of input events.
///
/// Every [`arm`](Debouncer::arm) pushes the deadline back by the window;
/// [`elapsed`](Debouncer::elapsed) resolves once the deadline passes and
/// never resolves while disarmed.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    /// Waits for the current deadline. The caller must
    /// [`disarm`](Debouncer::disarm) after it fires.
    pub async fn elapsed(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_rearming_pushes_deadline_back() {
        let mut debouncer = Debouncer::new(Duration::from_millis(700));
        let start = Instant::now();

        debouncer.arm();
        tokio::time::advance(Duration::from_millis(500)).await;
        debouncer.arm();

        debouncer.elapsed().await;
        assert_eq!(Instant::now() - start, Duration::from_millis(1200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarmed_never_fires() {
        let debouncer = Debouncer::new(Duration::from_millis(10));
        let fired = tokio::time::timeout(Duration::from_secs(60), debouncer.elapsed()).await;
        assert!(fired.is_err());
    }
}
