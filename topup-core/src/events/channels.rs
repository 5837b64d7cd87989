//! Event channel factories and handles.

use super::types::{AmountInput, SessionEvent, UiEffect};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Default buffer size for event channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Sender handle for SessionEvent events.
pub type SessionEventSender = mpsc::Sender<SessionEvent>;
/// Receiver handle for SessionEvent events.
pub type SessionEventReceiver = mpsc::Receiver<SessionEvent>;

/// Sender handle for AmountInput events.
pub type AmountInputSender = mpsc::Sender<AmountInput>;
/// Receiver handle for AmountInput events.
pub type AmountInputReceiver = mpsc::Receiver<AmountInput>;

/// Sender handle for UiEffect events.
pub type UiEffectSender = mpsc::Sender<UiEffect>;
/// Receiver handle for UiEffect events.
pub type UiEffectReceiver = mpsc::Receiver<UiEffect>;

pub fn session_event_channel() -> (SessionEventSender, SessionEventReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

pub fn amount_input_channel() -> (AmountInputSender, AmountInputReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

pub fn ui_effect_channel() -> (UiEffectSender, UiEffectReceiver) {
    mpsc::channel(DEFAULT_CHANNEL_BUFFER)
}

/// Resolves once `shutdown_rx` is raised or its sender is gone.
pub async fn shutdown_raised(mut shutdown_rx: watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|down| *down).await;
}

/// Delivers UI effects for as long as the screen is alive.
///
/// Once the shutdown signal is raised every effect is dropped, so work that
/// is still unwinding cannot reach a torn-down screen. A send waiting on a
/// full channel is abandoned as soon as shutdown is raised.
#[derive(Debug, Clone)]
pub struct EffectSink {
    tx: UiEffectSender,
    shutdown_rx: watch::Receiver<bool>,
}

impl EffectSink {
    pub fn new(tx: UiEffectSender, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self { tx, shutdown_rx }
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown_rx.borrow() || self.tx.is_closed()
    }

    pub async fn emit(&self, effect: UiEffect) {
        if self.is_closed() {
            debug!(effect = ?effect, "Screen torn down, dropping UiEffect");
            return;
        }
        tokio::select! {
            biased;

            _ = shutdown_raised(self.shutdown_rx.clone()) => {
                debug!("Screen torn down while delivering UiEffect");
            }
            sent = self.tx.send(effect) => {
                if sent.is_err() {
                    debug!("UiEffect receiver dropped");
                }
            }
        }
    }
}
