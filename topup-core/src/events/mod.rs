//! Event system of a top-up session.
//!
//! # Event Flow
//!
//! 1. The presentation layer sends `SessionEvent`s to `TopUpSession`
//! 2. `TopUpSession` routes amount related events as `AmountInput` to the
//!    `AmountInputPipeline`
//! 3. Both emit `UiEffect`s through an `EffectSink`
//!
//! Events carry immutable values; no state is shared between stages.

pub mod channels;
pub mod types;

pub use channels::{
    AmountInputReceiver, AmountInputSender, DEFAULT_CHANNEL_BUFFER, EffectSink,
    SessionEventReceiver, SessionEventSender, UiEffectReceiver, UiEffectSender,
    amount_input_channel, session_event_channel, shutdown_raised, ui_effect_channel,
};

pub use types::{AmountInput, PaymentSubmission, SessionEvent, UiEffect};
