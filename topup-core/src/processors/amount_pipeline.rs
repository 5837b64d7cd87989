//! AmountInputPipeline processor.
//!
//! The pipeline owns the amount half of a top-up screen:
//! - Receives `AmountInput` events from the session
//! - Drops edits that are not numeric before they change anything
//! - Waits for the input to go quiet, then converts the typed side into the
//!   other one
//! - Once a conversion settles, checks the top-up limits and refreshes the
//!   bonus forecast
//! - Emits `UiEffect`s and publishes every new `TopUpState`
//!
//! Background work runs on the injected runtime handle and reports back
//! through a completion channel. Every completion carries the ticket it was
//! started with; results of superseded work are discarded.

use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use topup_sdk::objects::{ForecastBonus, TopUpLimits};
use tracing::{debug, info, warn};

use super::conversion::ConversionService;
use super::payment_gate::{BoundsCheck, PaymentMethodGate};
use crate::config::PipelineConfig;
use crate::events::{AmountInput, AmountInputReceiver, EffectSink, UiEffect};
use crate::services::{BonusService, TopUpLimitsService};
use crate::state::{AmountValue, CurrencySide, TopUpAction, TopUpState, reduce};
use crate::utils::debounce::Debouncer;
use crate::utils::switch_latest::{SwitchLatest, Ticket};

/// Result of a background task.
#[derive(Debug)]
enum Completion {
    Converted {
        ticket: Ticket,
        derived: AmountValue,
    },
    LimitsLoaded(Option<TopUpLimits>),
    BonusLoaded {
        ticket: Ticket,
        bonus: Option<ForecastBonus>,
    },
}

/// Debounced conversion, validation and bonus lookup of the amount field.
pub struct AmountInputPipeline {
    conversion: ConversionService,
    limits: Arc<dyn TopUpLimitsService>,
    bonus: Arc<dyn BonusService>,
    gate: PaymentMethodGate,
    config: PipelineConfig,
    package_name: String,
    runtime: Handle,

    state: TopUpState,
    state_tx: watch::Sender<TopUpState>,
    debouncer: Debouncer,
    conversions: SwitchLatest,
    bonuses: SwitchLatest,
    limits_task: Option<JoinHandle<()>>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: Option<mpsc::UnboundedReceiver<Completion>>,
}

impl AmountInputPipeline {
    /// Create a pipeline spawning its network calls on `runtime`.
    pub fn new(
        conversion: ConversionService,
        limits: Arc<dyn TopUpLimitsService>,
        bonus: Arc<dyn BonusService>,
        gate: PaymentMethodGate,
        config: PipelineConfig,
        package_name: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        let (state_tx, _) = watch::channel(TopUpState::default());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        Self {
            conversion,
            limits,
            bonus,
            gate,
            debouncer: Debouncer::new(config.debounce),
            config,
            package_name: package_name.into(),
            runtime,
            state: TopUpState::default(),
            state_tx,
            conversions: SwitchLatest::new(),
            bonuses: SwitchLatest::new(),
            limits_task: None,
            completion_tx,
            completion_rx: Some(completion_rx),
        }
    }

    /// Receiver of every state the pipeline goes through.
    pub fn subscribe(&self) -> watch::Receiver<TopUpState> {
        self.state_tx.subscribe()
    }

    /// Run the pipeline until shutdown is signaled or the input channel
    /// closes. All background work is cancelled and awaited before this
    /// returns.
    pub async fn run(
        mut self,
        mut shutdown_rx: watch::Receiver<bool>,
        mut input_rx: AmountInputReceiver,
        effects: EffectSink,
    ) {
        let Some(mut completion_rx) = self.completion_rx.take() else {
            warn!("AmountInputPipeline started twice");
            return;
        };
        info!("AmountInputPipeline started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("AmountInputPipeline received shutdown signal");
                        break;
                    }
                }

                input = input_rx.recv() => match input {
                    Some(input) => self.handle_input(input, &effects).await,
                    None => {
                        info!("AmountInput channel closed");
                        break;
                    }
                },

                _ = self.debouncer.elapsed() => {
                    self.debouncer.disarm();
                    self.start_conversion(&effects).await;
                }

                Some(completion) = completion_rx.recv() => {
                    self.handle_completion(completion, &effects).await;
                }
            }
        }

        self.conversions.shutdown().await;
        self.bonuses.shutdown().await;
        if let Some(task) = self.limits_task.take() {
            task.abort();
            let _ = task.await;
        }

        info!("AmountInputPipeline shutdown complete");
    }

    fn apply(&mut self, action: TopUpAction) {
        self.state = reduce(&self.state, action);
        self.state_tx.send_replace(self.state.clone());
    }

    async fn handle_input(&mut self, input: AmountInput, effects: &EffectSink) {
        match input {
            AmountInput::Setup { methods, currency } => {
                self.apply(TopUpAction::SetupLoaded { methods, currency });
                self.fetch_limits();
            }
            AmountInput::Edit(text) => {
                if AmountValue::from_text(&text).is_none() {
                    debug!(text = %text, "Ignoring non-numeric amount");
                    return;
                }
                self.conversions.cancel();
                self.bonuses.cancel();
                self.apply(TopUpAction::AmountEdited { text });
                effects.emit(UiEffect::SetSubmitEnabled(false)).await;
                self.debouncer.arm();
            }
            AmountInput::SwitchCurrency => {
                self.apply(TopUpAction::CurrencySwitched);
                effects
                    .emit(UiEffect::CurrencySwitched(self.state.entry.selected))
                    .await;
                if !self.state.conversion_settled {
                    // The value being converted is no longer the typed one.
                    self.conversions.cancel();
                    self.debouncer.arm();
                }
            }
            AmountInput::SelectMethod(method) => {
                self.apply(TopUpAction::MethodSelected(method));
                if self.state.conversion_settled {
                    self.bonuses.cancel();
                    self.validate(effects).await;
                }
            }
        }
    }

    async fn handle_completion(&mut self, completion: Completion, effects: &EffectSink) {
        match completion {
            Completion::Converted { ticket, derived } => {
                if !self.conversions.is_current(ticket) {
                    debug!("Discarding stale conversion");
                    return;
                }
                self.settle(derived, effects).await;
            }
            Completion::LimitsLoaded(limits) => {
                self.limits_task = None;
                let Some(limits) = limits else {
                    return;
                };
                self.apply(TopUpAction::LimitsLoaded(limits));
                if self.state.conversion_settled && self.state.bounds.is_none() {
                    self.validate(effects).await;
                }
            }
            Completion::BonusLoaded { ticket, bonus } => {
                if !self.bonuses.is_current(ticket) {
                    debug!("Discarding stale bonus forecast");
                    return;
                }
                match bonus.as_ref() {
                    Some(bonus) if bonus.is_visible() => {
                        effects
                            .emit(UiEffect::ShowBonus {
                                amount: bonus.amount,
                                currency: bonus.currency.clone(),
                            })
                            .await;
                    }
                    _ => effects.emit(UiEffect::HideBonus).await,
                }
                self.apply(TopUpAction::BonusUpdated(bonus));
                effects
                    .emit(UiEffect::SetSubmitEnabled(self.gate.can_submit(&self.state)))
                    .await;
            }
        }
    }

    /// Derive the other side from the typed one. Only positive amounts need
    /// the broker.
    async fn start_conversion(&mut self, effects: &EffectSink) {
        let side = self.state.entry.selected;
        let amount = match *self.state.entry.source() {
            AmountValue::Unknown => return self.settle(AmountValue::Unknown, effects).await,
            AmountValue::Zero => return self.settle(AmountValue::Zero, effects).await,
            AmountValue::Value(v) if v <= Decimal::ZERO => {
                return self.settle(AmountValue::Unknown, effects).await;
            }
            AmountValue::Value(v) => v,
        };

        let ticket = self.conversions.begin();
        let conversion = self.conversion.clone();
        let tx = self.completion_tx.clone();
        let currency = self.state.entry.currency.code.clone();
        let scale = self.config.conversion_scale;
        let value = amount.to_string();

        let handle = self.runtime.spawn(async move {
            let result = match side {
                CurrencySide::Fiat => conversion.fiat_to_appc(&currency, &value, scale).await,
                CurrencySide::Token => conversion.appc_to_local_fiat(&value, scale).await,
            };
            match result {
                Ok(result) => {
                    let _ = tx.send(Completion::Converted {
                        ticket,
                        derived: AmountValue::from_conversion(&result),
                    });
                }
                Err(e) => warn!(%side, value = %value, error = %e, "Conversion failed"),
            }
        });
        self.conversions.attach(handle);
    }

    async fn settle(&mut self, derived: AmountValue, effects: &EffectSink) {
        self.apply(TopUpAction::ConversionSettled { derived });
        effects
            .emit(UiEffect::ConversionValue(self.state.entry.clone()))
            .await;
        self.validate(effects).await;
    }

    /// Check the fiat amount against the limits. Within the limits the bonus
    /// forecast is refreshed, which in turn decides the submit state.
    async fn validate(&mut self, effects: &EffectSink) {
        if self.state.limits.is_none() {
            self.fetch_limits();
            return;
        }
        let Some((check, limits)) = self.gate.check(&self.state) else {
            return;
        };
        self.apply(TopUpAction::BoundsValidated(check));

        match limits.warning(check) {
            Some(bound) if check == BoundsCheck::TooHigh => {
                effects.emit(UiEffect::ShowMaxValueWarning(bound)).await;
            }
            Some(bound) => effects.emit(UiEffect::ShowMinValueWarning(bound)).await,
            None => effects.emit(UiEffect::HideValueWarning).await,
        }

        if check != BoundsCheck::Ok {
            self.bonuses.cancel();
            self.apply(TopUpAction::BonusUpdated(None));
            effects.emit(UiEffect::HideBonus).await;
            effects.emit(UiEffect::MainValueValid(false)).await;
            effects.emit(UiEffect::SetSubmitEnabled(false)).await;
            return;
        }
        effects.emit(UiEffect::MainValueValid(true)).await;

        let Some(fiat) = self.state.entry.fiat.positive() else {
            return;
        };
        self.fetch_bonus(fiat);
    }

    fn fetch_bonus(&mut self, fiat: Decimal) {
        let ticket = self.bonuses.begin();
        let conversion = self.conversion.clone();
        let bonus = self.bonus.clone();
        let tx = self.completion_tx.clone();
        let currency = self.state.entry.currency.code.clone();
        let scale = self.config.bonus_scale;
        let package = self.package_name.clone();

        let handle = self.runtime.spawn(async move {
            let forecast = async {
                let appc = conversion
                    .fiat_to_appc(&currency, &fiat.to_string(), scale)
                    .await
                    .map_err(|e| e.to_string())?;
                bonus
                    .forecast(&package, appc.amount)
                    .await
                    .map_err(|e| e.to_string())
            };
            let bonus = match forecast.await {
                Ok(bonus) => Some(bonus),
                Err(e) => {
                    warn!(error = %e, "Bonus forecast failed");
                    None
                }
            };
            let _ = tx.send(Completion::BonusLoaded { ticket, bonus });
        });
        self.bonuses.attach(handle);
    }

    fn fetch_limits(&mut self) {
        if self.state.limits.is_some() || self.limits_task.is_some() {
            return;
        }
        let service = self.limits.clone();
        let tx = self.completion_tx.clone();
        let currency = self.state.entry.currency.code.clone();

        self.limits_task = Some(self.runtime.spawn(async move {
            let limits = match service.limits(&currency).await {
                Ok(limits) => Some(limits),
                Err(e) => {
                    warn!(currency = %currency, error = %e, "Failed to load top-up limits");
                    None
                }
            };
            let _ = tx.send(Completion::LimitsLoaded(limits));
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{
        AmountInputSender, UiEffectReceiver, amount_input_channel, ui_effect_channel,
    };
    use crate::state::LocalCurrency;
    use crate::test_utils::{MockBonus, MockConversion, MockLimits, dec, limits, method};
    use std::time::Duration;

    struct Harness {
        input: AmountInputSender,
        effects: UiEffectReceiver,
        state: watch::Receiver<TopUpState>,
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
        api: Arc<MockConversion>,
        bonus: Arc<MockBonus>,
        limits: Arc<MockLimits>,
    }

    impl Harness {
        async fn send(&self, input: AmountInput) {
            self.input.send(input).await.unwrap();
        }

        async fn edit(&self, text: &str) {
            self.send(AmountInput::Edit(text.into())).await;
        }

        async fn setup(&self) {
            self.send(AmountInput::Setup {
                methods: vec![method("paypal"), method("credit_card")],
                currency: LocalCurrency::new("EUR", "€"),
            })
            .await;
            self.send(AmountInput::SelectMethod(method("paypal"))).await;
        }

        fn drain(&mut self) -> Vec<UiEffect> {
            let mut effects = Vec::new();
            while let Ok(effect) = self.effects.try_recv() {
                effects.push(effect);
            }
            effects
        }
    }

    fn start(api: MockConversion) -> Harness {
        let api = Arc::new(api);
        let bonus = Arc::new(MockBonus::new(Some("2.5")));
        let limits_service = Arc::new(MockLimits::new(limits("5", "500")));
        let pipeline = AmountInputPipeline::new(
            ConversionService::new(api.clone()),
            limits_service.clone(),
            bonus.clone(),
            PaymentMethodGate::default(),
            PipelineConfig::default(),
            "com.example.game",
            Handle::current(),
        );
        let state = pipeline.subscribe();
        let (input, input_rx) = amount_input_channel();
        let (effects_tx, effects) = ui_effect_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let sink = EffectSink::new(effects_tx, shutdown_rx.clone());
        let task = tokio::spawn(pipeline.run(shutdown_rx, input_rx, sink));
        Harness {
            input,
            effects,
            state,
            shutdown,
            task,
            api,
            bonus,
            limits: limits_service,
        }
    }

    async fn settle_for(duration_ms: u64) {
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_amount_enables_submit() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        h.edit("10").await;
        settle_for(2_000).await;

        let effects = h.drain();
        assert_eq!(effects.len(), 6, "{effects:?}");
        assert_eq!(effects[0], UiEffect::SetSubmitEnabled(false));
        match &effects[1] {
            UiEffect::ConversionValue(entry) => {
                assert_eq!(entry.fiat, AmountValue::Value(dec("10")));
                assert_eq!(entry.token, AmountValue::Value(dec("200")));
                assert_eq!(entry.token.display(), "200.00");
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(effects[2], UiEffect::HideValueWarning);
        assert_eq!(effects[3], UiEffect::MainValueValid(true));
        assert_eq!(
            effects[4],
            UiEffect::ShowBonus {
                amount: dec("2.5"),
                currency: "APPC".into()
            }
        );
        assert_eq!(effects[5], UiEffect::SetSubmitEnabled(true));

        let calls = h.api.calls();
        assert_eq!(calls[0].currency, "EUR");
        assert_eq!(calls[0].value, "10");
        assert_eq!(calls[0].target.as_deref(), Some("APPC"));
        assert_eq!(h.bonus.calls(), [dec("200")]);
        assert_eq!(h.limits.call_count(), 1);
        assert_eq!(h.state.borrow().bounds, Some(BoundsCheck::Ok));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_numeric_edit_is_dropped() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        h.edit("10").await;
        settle_for(2_000).await;
        h.drain();
        let before = h.state.borrow().clone();
        let calls = h.api.call_count();

        for text in ["abc", "1.", "--", "1,5", " 2"] {
            h.edit(text).await;
        }
        settle_for(2_000).await;

        assert!(h.drain().is_empty());
        assert_eq!(h.api.call_count(), calls);
        assert_eq!(*h.state.borrow(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_issues_one_conversion_with_last_value() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        for text in ["1", "12", "123"] {
            h.edit(text).await;
            settle_for(300).await;
        }
        settle_for(2_000).await;

        let calls = h.api.calls();
        // One call for the amount, one for the bonus forecast.
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].value, "123");
        let conversions = h
            .drain()
            .into_iter()
            .filter(|e| matches!(e, UiEffect::ConversionValue(_)))
            .count();
        assert_eq!(conversions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_edit_discards_in_flight_conversion() {
        let mut h = start(MockConversion::with_rate("20").delayed(Duration::from_secs(1)));
        h.setup().await;
        h.edit("10").await;
        // Debounce fired, conversion of 10 is in flight.
        settle_for(900).await;
        h.edit("20").await;
        settle_for(5_000).await;

        let values: Vec<_> = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                UiEffect::ConversionValue(entry) => Some(entry.fiat),
                _ => None,
            })
            .collect();
        assert_eq!(values, [AmountValue::Value(dec("20"))]);
        assert_eq!(h.api.calls()[0].value, "10");
        assert_eq!(h.api.calls()[1].value, "20");
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_bounds_amount_warns() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        h.edit("1000").await;
        settle_for(2_000).await;

        let effects = h.drain();
        assert_eq!(
            &effects[2..],
            [
                UiEffect::ShowMaxValueWarning("500 EUR".into()),
                UiEffect::HideBonus,
                UiEffect::MainValueValid(false),
                UiEffect::SetSubmitEnabled(false),
            ]
        );
        assert!(h.bonus.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_and_empty_need_no_broker() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        h.edit("0").await;
        settle_for(2_000).await;

        let effects = h.drain();
        match &effects[1] {
            UiEffect::ConversionValue(entry) => {
                assert_eq!(entry.token, AmountValue::Zero);
                assert_eq!(entry.token.display(), "--");
            }
            other => panic!("unexpected effect {other:?}"),
        }
        assert_eq!(effects[2], UiEffect::ShowMinValueWarning("5 EUR".into()));

        h.edit("").await;
        settle_for(2_000).await;
        let effects = h.drain();
        assert_eq!(effects.len(), 2, "{effects:?}");
        assert!(matches!(
            &effects[1],
            UiEffect::ConversionValue(entry) if entry.token == AmountValue::Unknown
        ));
        assert_eq!(h.api.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conversion_failure_keeps_pipeline_alive() {
        let mut h = start(MockConversion::failing());
        h.setup().await;
        h.edit("10").await;
        settle_for(2_000).await;
        assert_eq!(h.drain(), [UiEffect::SetSubmitEnabled(false)]);

        h.edit("11").await;
        settle_for(2_000).await;
        assert_eq!(h.drain(), [UiEffect::SetSubmitEnabled(false)]);
        assert_eq!(h.api.call_count(), 2);
        assert!(!h.state.borrow().conversion_settled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_settled_currency_keeps_values() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        h.edit("10").await;
        settle_for(2_000).await;
        h.drain();

        h.send(AmountInput::SwitchCurrency).await;
        settle_for(2_000).await;

        assert_eq!(h.drain(), [UiEffect::CurrencySwitched(CurrencySide::Token)]);
        let state = h.state.borrow().clone();
        assert_eq!(state.entry.selected, CurrencySide::Token);
        assert_eq!(state.entry.fiat, AmountValue::Value(dec("10")));
        assert_eq!(h.api.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_token_side_converts_to_local_fiat() {
        let mut h = start(MockConversion::with_rate("0.05"));
        h.setup().await;
        h.send(AmountInput::SwitchCurrency).await;
        h.edit("200").await;
        settle_for(2_000).await;

        let calls = h.api.calls();
        assert_eq!(calls[0].currency, "APPC");
        assert_eq!(calls[0].target, None);
        let state = h.state.borrow().clone();
        assert_eq!(state.entry.fiat, AmountValue::Value(dec("10")));
        assert_eq!(state.bounds, Some(BoundsCheck::Ok));
        assert!(h.drain().contains(&UiEffect::SetSubmitEnabled(true)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_effects_after_teardown() {
        let mut h = start(MockConversion::with_rate("20").delayed(Duration::from_secs(5)));
        h.setup().await;
        h.edit("10").await;
        settle_for(1_000).await;

        h.shutdown.send(true).unwrap();
        (&mut h.task).await.unwrap();
        settle_for(10_000).await;

        assert_eq!(h.drain(), [UiEffect::SetSubmitEnabled(false)]);
        assert_eq!(h.effects.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_with_unread_effects() {
        let mut h = start(MockConversion::with_rate("20"));
        h.setup().await;
        // Every edit emits an effect; nobody reads them, so the effect
        // channel fills and the pipeline blocks mid-emit.
        for amount in 1..=70 {
            h.edit(&amount.to_string()).await;
        }
        settle_for(100).await;

        h.shutdown.send(true).unwrap();
        let joined = tokio::time::timeout(Duration::from_secs(30), &mut h.task).await;
        assert!(matches!(joined, Ok(Ok(()))));
        assert_eq!(h.drain().len(), crate::events::DEFAULT_CHANNEL_BUFFER);
    }
}
