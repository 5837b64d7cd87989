//! Processors of a top-up session.
//!
//! - `ConversionService`: converts amounts through the broker, floors results
//! - `TransactionStatusPoller`: follows a transaction until it settles
//! - `PaymentMethodGate`: supported methods, top-up bounds, submit gating
//! - `AmountInputPipeline`: receives `AmountInput`, emits `UiEffect`
//! - `PaymentOrchestrator`: resolves the wallet and routing, submits payments
//! - `TopUpSession`: receives `SessionEvent`, drives all of the above

pub mod amount_pipeline;
pub mod conversion;
pub mod payment_gate;
pub mod payment_orchestrator;
pub mod status_poller;
pub mod top_up_session;

pub use amount_pipeline::AmountInputPipeline;
pub use conversion::{APPC, ConversionError, ConversionService, ETH};
pub use payment_gate::{BoundsCheck, EffectiveLimits, PaymentMethodGate, validate_bounds};
pub use payment_orchestrator::{
    PaymentError, PaymentOrchestrator, PaymentOrder, PaymentOutcome, TOP_UP_TRANSACTION_TYPE,
};
pub use status_poller::{StatusFilter, TransactionStatusPoller};
pub use top_up_session::{SessionHandle, TopUpServices, TopUpSession};
