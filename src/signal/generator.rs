//! Tier 4: stateless signal generation

use super::confirmation::{confirmation_from_config, ExitConfirmation};
use super::types::{SignalError, SignalType, TradeSignal};
use crate::config::SignalConfig;
use crate::technical::{clamp_unit, TechnicalIndicators};
use crate::telemetry::{increment_counter, CounterMetric};
use crate::window::WindowStore;
use rust_decimal::Decimal;

/// Indicators that vote on direction: MACD, stochastic, RSI
const VOTERS: u32 = 3;

/// Direction votes for one indicator snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agreement {
    pub long: u32,
    pub exit: u32,
}

impl Agreement {
    pub fn of(indicators: &TechnicalIndicators) -> Self {
        let macd = &indicators.macd;
        let fastest = indicators.fastest_stochastic();
        let rsi_mid = Decimal::from(50);

        let long = [
            macd.crossover_up || macd.value > macd.signal,
            fastest.is_some_and(|s| s.k > s.d),
            indicators.rsi > rsi_mid,
        ];
        let exit = [
            macd.crossover_down || macd.value < macd.signal,
            fastest.is_some_and(|s| s.k < s.d),
            indicators.rsi < rsi_mid,
        ];
        Self {
            long: long.iter().filter(|v| **v).count() as u32,
            exit: exit.iter().filter(|v| **v).count() as u32,
        }
    }
}

/// Maps indicator snapshots to Hold / EntryLong / Exit
///
/// Keeps no per-ticker state; position pairing belongs to the consumer.
pub struct SignalGenerator {
    overbought: Decimal,
    agreement_weight: Decimal,
    momentum_weight: Decimal,
    confirmation: Box<dyn ExitConfirmation>,
}

impl SignalGenerator {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            overbought: config.overbought,
            agreement_weight: config.agreement_weight,
            momentum_weight: config.momentum_weight,
            confirmation: confirmation_from_config(&config.exit_confirmation),
        }
    }

    pub fn with_confirmation(mut self, confirmation: Box<dyn ExitConfirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Signal without market context
    pub fn generate_signal(
        &self,
        indicators: &TechnicalIndicators,
    ) -> Result<TradeSignal, SignalError> {
        self.generate(indicators, None)
    }

    /// Signal with the window store available to the exit confirmation hook
    pub fn generate_with_store(
        &self,
        indicators: &TechnicalIndicators,
        store: &WindowStore,
    ) -> Result<TradeSignal, SignalError> {
        self.generate(indicators, Some(store))
    }

    fn generate(
        &self,
        indicators: &TechnicalIndicators,
        store: Option<&WindowStore>,
    ) -> Result<TradeSignal, SignalError> {
        let not_ready = || SignalError::NotReady {
            ticker: indicators.ticker.clone(),
        };
        if !indicators.ready {
            return Err(not_ready());
        }
        let fastest = indicators.fastest_stochastic().ok_or_else(not_ready)?;
        let macd = &indicators.macd;

        let entry = macd.crossover_up && fastest.k < self.overbought;
        let exit_condition = macd.crossover_down || fastest.k > self.overbought;

        let signal_type = if entry {
            SignalType::EntryLong
        } else if exit_condition {
            if self.confirmation.confirm(indicators, store) {
                SignalType::Exit
            } else {
                tracing::debug!(
                    ticker = %indicators.ticker,
                    hook = self.confirmation.name(),
                    "Exit not confirmed"
                );
                SignalType::Hold
            }
        } else {
            SignalType::Hold
        };

        let confidence = self.confidence(signal_type, indicators);
        increment_counter(
            match signal_type {
                SignalType::EntryLong => CounterMetric::SignalsEntryLong,
                SignalType::Exit => CounterMetric::SignalsExit,
                SignalType::Hold => CounterMetric::SignalsHold,
            },
            1,
        );

        Ok(TradeSignal {
            timestamp: indicators.as_of,
            ticker: indicators.ticker.clone(),
            signal_type,
            confidence,
            price: indicators.close,
        })
    }

    /// Weighted agreement plus momentum, non-decreasing in the number of
    /// concurring indicators
    pub fn confidence(&self, signal_type: SignalType, indicators: &TechnicalIndicators) -> Decimal {
        let agreement = Agreement::of(indicators);
        let momentum = clamp_unit(indicators.momentum_score);
        let long = self.side_confidence(agreement.long, momentum);
        let exit = self.side_confidence(agreement.exit, Decimal::ONE - momentum);

        match signal_type {
            SignalType::EntryLong => long,
            SignalType::Exit => exit,
            SignalType::Hold => clamp_unit(Decimal::ONE - long.max(exit)),
        }
    }

    fn side_confidence(&self, concurring: u32, momentum: Decimal) -> Decimal {
        let share = Decimal::from(concurring) / Decimal::from(VOTERS);
        clamp_unit(self.agreement_weight * share + self.momentum_weight * momentum)
    }
}
