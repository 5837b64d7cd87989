//! Transaction status polling.
//!
//! [`TransactionStatusPoller::watch`] returns a lazy stream: nothing is
//! fetched until it is first polled. It fetches the transaction right away
//! and then on every interval tick. A tick that arrives while a fetch is still
//! in flight drops that fetch and starts a new one, so a slow response never
//! overtakes a newer one.
//!
//! The stream ends right after delivering a final status. Dropping it stops
//! the timer and cancels the in-flight fetch.

use futures_util::Stream;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use topup_sdk::objects::{TransactionResponse, TransactionStatus};
use tracing::{debug, warn};

use crate::config::{DEFAULT_POLL_INTERVAL, PollerConfig};
use crate::services::{ServiceError, TransactionSource};

/// Which statuses a watcher is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Card and wallet providers: final statuses only.
    #[default]
    Provider,
    /// Local payment methods: also report when the user still has to pay.
    LocalPayment,
}

impl StatusFilter {
    pub fn is_final(status: TransactionStatus) -> bool {
        matches!(
            status,
            TransactionStatus::Completed
                | TransactionStatus::Failed
                | TransactionStatus::Canceled
                | TransactionStatus::InvalidTransaction
        )
    }

    pub fn delivers(self, status: TransactionStatus) -> bool {
        match self {
            StatusFilter::Provider => Self::is_final(status),
            StatusFilter::LocalPayment => {
                Self::is_final(status) || status == TransactionStatus::PendingUserPayment
            }
        }
    }
}

/// Polls a [`TransactionSource`] until a transaction settles.
#[derive(Clone)]
pub struct TransactionStatusPoller {
    source: Arc<dyn TransactionSource>,
    interval: Duration,
}

impl TransactionStatusPoller {
    /// A zero interval falls back to [`DEFAULT_POLL_INTERVAL`].
    pub fn new(source: Arc<dyn TransactionSource>, config: PollerConfig) -> Self {
        let interval = if config.interval.is_zero() {
            warn!("Zero poll interval, using {:?}", DEFAULT_POLL_INTERVAL);
            DEFAULT_POLL_INTERVAL
        } else {
            config.interval
        };
        Self { source, interval }
    }

    /// Stream of the updates of `uid` that pass `filter`.
    ///
    /// Consecutive duplicates are suppressed. The stream ends after the first
    /// final status.
    pub fn watch(
        &self,
        uid: impl Into<String>,
        filter: StatusFilter,
    ) -> impl Stream<Item = TransactionResponse> + Send + 'static {
        let state = PollState {
            source: self.source.clone(),
            uid: uid.into(),
            filter,
            period: self.interval,
            ticker: None,
            last_delivered: None,
            finished: false,
        };
        futures_util::stream::unfold(state, |mut state| async move {
            let update = state.next_update().await?;
            Some((update, state))
        })
    }
}

struct PollState {
    source: Arc<dyn TransactionSource>,
    uid: String,
    filter: StatusFilter,
    period: Duration,
    ticker: Option<Interval>,
    last_delivered: Option<TransactionStatus>,
    finished: bool,
}

enum Step {
    Tick,
    Fetched(Result<TransactionResponse, ServiceError>),
}

impl PollState {
    async fn next_update(&mut self) -> Option<TransactionResponse> {
        if self.finished {
            return None;
        }

        let period = self.period;
        let ticker = self.ticker.get_or_insert_with(|| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });
        let mut in_flight: Option<BoxFuture<'static, Result<TransactionResponse, ServiceError>>> =
            None;

        loop {
            let step = match in_flight.as_mut() {
                None => {
                    ticker.tick().await;
                    Step::Tick
                }
                Some(fetch) => {
                    tokio::select! {
                        biased;

                        result = fetch => Step::Fetched(result),
                        _ = ticker.tick() => Step::Tick,
                    }
                }
            };

            match step {
                Step::Tick => {
                    if in_flight.is_some() {
                        debug!(uid = %self.uid, "Status fetch superseded by a newer tick");
                    }
                    let source = self.source.clone();
                    let uid = self.uid.clone();
                    in_flight = Some(Box::pin(async move { source.transaction(&uid).await }));
                }
                Step::Fetched(Ok(response)) => {
                    in_flight = None;
                    let status = response.status;
                    debug!(uid = %self.uid, %status, "Fetched transaction status");
                    if !self.filter.delivers(status) || self.last_delivered == Some(status) {
                        continue;
                    }
                    self.last_delivered = Some(status);
                    self.finished = StatusFilter::is_final(status);
                    if self.finished {
                        // Release the timer as soon as the stream is done.
                        self.ticker = None;
                    }
                    return Some(response);
                }
                Step::Fetched(Err(e)) => {
                    in_flight = None;
                    warn!(uid = %self.uid, error = %e, "Failed to fetch transaction status");
                }
            }
        }
    }
}
