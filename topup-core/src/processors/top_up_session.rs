//! TopUpSession processor.
//!
//! One session drives one top-up screen from creation to teardown:
//! - Loads the payment methods and the local currency concurrently, then
//!   sets up the screen
//! - Routes amount related `SessionEvent`s to the `AmountInputPipeline`
//! - Submits the payment on a next click and follows the transaction with the
//!   `TransactionStatusPoller` until it settles
//!
//! Every task of the session shares its shutdown signal. Teardown raises it
//! and waits for all of them, so no effect reaches the screen afterwards.

use compact_str::CompactString;
use futures_util::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use topup_sdk::objects::{ConversionResult, PaymentMethodData};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::amount_pipeline::AmountInputPipeline;
use super::conversion::{ConversionError, ConversionService};
use super::payment_gate::PaymentMethodGate;
use super::payment_orchestrator::{
    PaymentError, PaymentOrchestrator, PaymentOrder, PaymentOutcome,
};
use super::status_poller::{StatusFilter, TransactionStatusPoller};
use crate::config::TopUpConfig;
use crate::events::{
    AmountInput, AmountInputSender, EffectSink, PaymentSubmission, SessionEvent,
    SessionEventReceiver, SessionEventSender, UiEffect, UiEffectSender, amount_input_channel,
    session_event_channel, shutdown_raised,
};
use crate::services::{BonusService, PaymentProvider, ServiceError, TopUpLimitsService};
use crate::state::{LocalCurrency, TopUpState};

/// Remote collaborators of a session.
#[derive(Clone)]
pub struct TopUpServices {
    pub conversion: ConversionService,
    pub payments: Arc<dyn PaymentProvider>,
    pub limits: Arc<dyn TopUpLimitsService>,
    pub bonus: Arc<dyn BonusService>,
    pub orchestrator: PaymentOrchestrator,
}

#[derive(Debug, Error)]
enum SetupError {
    #[error("failed to load payment methods: {0}")]
    Methods(#[from] ServiceError),

    #[error("failed to load local currency: {0}")]
    Currency(#[from] ConversionError),
}

type SetupResult = Result<(Vec<PaymentMethodData>, ConversionResult), SetupError>;

/// Payment methods and local currency, fetched concurrently.
async fn load_setup(
    payments: Arc<dyn PaymentProvider>,
    conversion: ConversionService,
) -> SetupResult {
    let (methods, currency) =
        tokio::join!(payments.payment_methods(), conversion.local_currency());
    Ok((methods?, currency?))
}

/// A top-up screen session.
pub struct TopUpSession {
    id: Uuid,
    services: TopUpServices,
    config: TopUpConfig,
    package_name: String,
    runtime: Handle,
}

/// Handle to a running session.
pub struct SessionHandle {
    id: Uuid,
    events: SessionEventSender,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Sender for presentation layer events.
    pub fn events(&self) -> SessionEventSender {
        self.events.clone()
    }

    /// Cancel every pending call and timer of the session and wait until
    /// they are gone. No effect is delivered once this returns.
    pub async fn teardown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            warn!(session_id = %self.id, error = %e, "TopUpSession task failed");
        }
    }
}

impl TopUpSession {
    pub fn new(
        services: TopUpServices,
        config: TopUpConfig,
        package_name: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            services,
            config,
            package_name: package_name.into(),
            runtime,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Start the session. Effects are delivered to `effects_tx` until
    /// teardown.
    pub fn start(self, effects_tx: UiEffectSender) -> SessionHandle {
        let (events, events_rx) = session_event_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let id = self.id;
        let span = info_span!("top_up_session", session_id = %id);
        let runtime = self.runtime.clone();
        let effects = EffectSink::new(effects_tx, shutdown_rx.clone());

        let task = runtime.spawn(self.run(shutdown_rx, events_rx, effects).instrument(span));

        SessionHandle {
            id,
            events,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut events_rx: SessionEventReceiver,
        effects: EffectSink,
    ) {
        info!(package = %self.package_name, "TopUpSession started");

        let gate = PaymentMethodGate::new(self.config.gate.clone());
        let pipeline = AmountInputPipeline::new(
            self.services.conversion.clone(),
            self.services.limits.clone(),
            self.services.bonus.clone(),
            gate.clone(),
            self.config.pipeline.clone(),
            self.package_name.clone(),
            self.runtime.clone(),
        );
        let state_rx = pipeline.subscribe();
        let (amount_tx, amount_rx) = amount_input_channel();
        let pipeline_task = self.runtime.spawn(
            pipeline
                .run(shutdown_rx.clone(), amount_rx, effects.clone())
                .in_current_span(),
        );

        let mut setup_task = self.runtime.spawn(
            load_setup(
                self.services.payments.clone(),
                self.services.conversion.clone(),
            )
            .in_current_span(),
        );
        let mut setup_pending = true;

        let poller = TransactionStatusPoller::new(
            Arc::new(self.services.orchestrator.clone()),
            self.config.poller.clone(),
        );
        let mut session = SessionLoop {
            gate,
            orchestrator: self.services.orchestrator.clone(),
            poller,
            package_name: self.package_name.clone(),
            runtime: self.runtime.clone(),
            methods: Vec::new(),
            state_rx,
            amount_tx,
            effects,
            shutdown_rx: shutdown_rx.clone(),
            payment_task: None,
        };

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("TopUpSession received shutdown signal");
                        break;
                    }
                }

                setup = &mut setup_task, if setup_pending => {
                    setup_pending = false;
                    match setup {
                        Ok(Ok((methods, currency))) => session.on_setup(methods, &currency).await,
                        Ok(Err(e)) => warn!(error = %e, "TopUpSession setup failed"),
                        Err(e) => warn!(error = %e, "TopUpSession setup task failed"),
                    }
                }

                event = events_rx.recv() => match event {
                    Some(event) => session.handle_event(event).await,
                    None => {
                        info!("SessionEvent channel closed");
                        break;
                    }
                },
            }
        }

        if setup_pending {
            setup_task.abort();
            let _ = setup_task.await;
        }
        if let Some(task) = session.payment_task.take() {
            task.abort();
            let _ = task.await;
        }
        drop(session);
        if let Err(e) = pipeline_task.await {
            warn!(error = %e, "AmountInputPipeline task failed");
        }

        info!("TopUpSession shutdown complete");
    }
}

/// Mutable part of a running session.
struct SessionLoop {
    gate: PaymentMethodGate,
    orchestrator: PaymentOrchestrator,
    poller: TransactionStatusPoller,
    package_name: String,
    runtime: Handle,
    methods: Vec<PaymentMethodData>,
    state_rx: watch::Receiver<TopUpState>,
    amount_tx: AmountInputSender,
    effects: EffectSink,
    shutdown_rx: watch::Receiver<bool>,
    payment_task: Option<JoinHandle<()>>,
}

impl SessionLoop {
    async fn on_setup(&mut self, methods: Vec<PaymentMethodData>, currency: &ConversionResult) {
        let methods = self.gate.filter_supported(methods);
        let currency = LocalCurrency::from(currency);
        info!(
            methods = methods.len(),
            currency = %currency.code,
            "TopUpSession set up"
        );
        self.methods = methods.clone();
        self.forward(AmountInput::Setup {
            methods: methods.clone(),
            currency: currency.clone(),
        })
        .await;
        self.effects
            .emit(UiEffect::SetupUi { methods, currency })
            .await;
    }

    async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::AmountChanged(text) => {
                self.forward(AmountInput::Edit(CompactString::from(text)))
                    .await;
            }
            SessionEvent::ChangeCurrencyClicked => {
                self.forward(AmountInput::SwitchCurrency).await;
            }
            SessionEvent::PaymentMethodSelected(id) => {
                match self.methods.iter().find(|m| m.id == id) {
                    Some(method) => {
                        let method = method.clone();
                        self.forward(AmountInput::SelectMethod(method)).await;
                    }
                    None => warn!(method = %id, "Selected payment method is not offered"),
                }
            }
            SessionEvent::NextClicked(submission) => self.on_next(submission).await,
            SessionEvent::RedirectReturned {
                uid,
                details,
                payment_data,
            } => {
                if self.payment_in_progress() {
                    debug!(uid = %uid, "Payment already in progress, ignoring redirect");
                    return;
                }
                let orchestrator = self.orchestrator.clone();
                self.spawn_payment(async move {
                    orchestrator
                        .submit_redirect(&uid, &details, payment_data.as_deref())
                        .await
                });
            }
        }
    }

    async fn on_next(&mut self, submission: PaymentSubmission) {
        if self.payment_in_progress() {
            debug!("Payment already in progress, ignoring next click");
            return;
        }
        let state = self.state_rx.borrow().clone();
        if !self.gate.can_submit(&state) {
            debug!("Amount not submittable, ignoring next click");
            return;
        }
        let order = state.selected_method.as_ref().and_then(|method| {
            PaymentOrder::top_up(method, &state.entry, submission, self.package_name.clone())
        });
        let Some(order) = order else {
            return;
        };

        self.effects.emit(UiEffect::ShowLoading).await;
        let orchestrator = self.orchestrator.clone();
        self.spawn_payment(async move { orchestrator.submit_top_up(&order).await });
    }

    fn payment_in_progress(&self) -> bool {
        self.payment_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Run `payment` and follow the resulting transaction until it settles.
    fn spawn_payment<F>(&mut self, payment: F)
    where
        F: Future<Output = Result<PaymentOutcome, PaymentError>> + Send + 'static,
    {
        let poller = self.poller.clone();
        let effects = self.effects.clone();

        let task = self.runtime.spawn(
            async move {
                let outcome = match payment.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(error = %e, "Payment failed");
                        effects
                            .emit(UiEffect::PaymentFailed {
                                message: e.to_string(),
                            })
                            .await;
                        return;
                    }
                };

                match outcome {
                    PaymentOutcome::Redirect { uid, action } => {
                        effects.emit(UiEffect::Redirect { uid, action }).await;
                    }
                    PaymentOutcome::Finished { uid, status } => {
                        effects.emit(UiEffect::PaymentFinished { uid, status }).await;
                    }
                    PaymentOutcome::Pending { uid } => {
                        let mut updates =
                            Box::pin(poller.watch(uid.clone(), StatusFilter::Provider));
                        while let Some(update) = updates.next().await {
                            if StatusFilter::is_final(update.status) {
                                effects
                                    .emit(UiEffect::PaymentFinished {
                                        uid: update.uid,
                                        status: update.status,
                                    })
                                    .await;
                            }
                        }
                        debug!(uid = %uid, "Stopped following transaction");
                    }
                }
            }
            .in_current_span(),
        );
        self.payment_task = Some(task);
    }

    /// Hand `input` to the pipeline. Gives up once shutdown is raised.
    async fn forward(&self, input: AmountInput) {
        tokio::select! {
            biased;

            _ = shutdown_raised(self.shutdown_rx.clone()) => {
                debug!("TopUpSession shutting down, dropping input");
            }
            sent = self.amount_tx.send(input) => {
                if sent.is_err() {
                    debug!("AmountInputPipeline stopped, dropping input");
                }
            }
        }
    }
}
