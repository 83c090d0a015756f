//! Prometheus metrics

use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterMetric {
    /// Feed socket reconnects after a dropped session
    FeedReconnects,
    /// Feed messages turned into domain events
    EventsNormalized,
    /// Feed messages dropped as malformed
    EventsMalformed,
    /// Events dropped by the ingest queue under drop-oldest backpressure
    EventsDropped,
    /// Events the window store refused (out of order, duplicate, stale)
    EventsRejected,
    /// Activity alerts raised
    AlertsRaised,
    /// Indicator sets computed
    IndicatorsComputed,
    /// EntryLong signals emitted
    SignalsEntryLong,
    /// Exit signals emitted
    SignalsExit,
    /// Hold signals emitted
    SignalsHold,
    /// Per-ticker failures inside a tier cycle
    TickerFailures,
    /// Batch write attempts that failed and were retried
    BatchRetries,
    /// Batches handed to the dead-letter sink
    BatchesDeadLettered,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaugeMetric {
    /// Events waiting in the ingest queues
    IngestQueueDepth,
    /// Tickers currently held by the window store
    WindowTickers,
    /// Eligible symbols in the published universe
    UniverseSize,
    /// 1 when the universe is stale after a failed refresh
    UniverseDegraded,
    /// Symbols in the tier 3 working set
    ActiveSymbols,
}

/// Latency metric types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyMetric {
    /// Tier 1 refresh
    UniverseCycle,
    /// Tier 2 detection over the universe
    ActivityCycle,
    /// Tier 3 + 4 over the working set
    TechnicalCycle,
    /// One time-series batch write, retries included
    BatchWrite,
}

impl CounterMetric {
    pub fn name(self) -> &'static str {
        match self {
            CounterMetric::FeedReconnects => "scanner_feed_reconnects_total",
            CounterMetric::EventsNormalized => "scanner_events_normalized_total",
            CounterMetric::EventsMalformed => "scanner_events_malformed_total",
            CounterMetric::EventsDropped => "scanner_events_dropped_total",
            CounterMetric::EventsRejected => "scanner_events_rejected_total",
            CounterMetric::AlertsRaised => "scanner_activity_alerts_total",
            CounterMetric::IndicatorsComputed => "scanner_indicators_computed_total",
            CounterMetric::SignalsEntryLong => "scanner_signals_entry_long_total",
            CounterMetric::SignalsExit => "scanner_signals_exit_total",
            CounterMetric::SignalsHold => "scanner_signals_hold_total",
            CounterMetric::TickerFailures => "scanner_ticker_failures_total",
            CounterMetric::BatchRetries => "scanner_batch_retries_total",
            CounterMetric::BatchesDeadLettered => "scanner_batches_dead_lettered_total",
        }
    }
}

impl GaugeMetric {
    pub fn name(self) -> &'static str {
        match self {
            GaugeMetric::IngestQueueDepth => "scanner_ingest_queue_depth",
            GaugeMetric::WindowTickers => "scanner_window_tickers",
            GaugeMetric::UniverseSize => "scanner_universe_size",
            GaugeMetric::UniverseDegraded => "scanner_universe_degraded",
            GaugeMetric::ActiveSymbols => "scanner_active_symbols",
        }
    }
}

impl LatencyMetric {
    pub fn name(self) -> &'static str {
        match self {
            LatencyMetric::UniverseCycle => "scanner_universe_cycle_ms",
            LatencyMetric::ActivityCycle => "scanner_activity_cycle_ms",
            LatencyMetric::TechnicalCycle => "scanner_technical_cycle_ms",
            LatencyMetric::BatchWrite => "scanner_batch_write_ms",
        }
    }
}

/// Increment a counter
pub fn increment_counter(metric: CounterMetric, by: u64) {
    metrics::counter!(metric.name()).increment(by);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    metrics::gauge!(metric.name()).set(value);
}

/// Record a latency measurement
pub fn record_latency(metric: LatencyMetric, duration: Duration) {
    metrics::histogram!(metric.name()).record(duration.as_secs_f64() * 1000.0);
    tracing::trace!(
        metric = metric.name(),
        value_ms = duration.as_millis() as u64,
        "Recording latency"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_are_prefixed() {
        let counters = [
            CounterMetric::EventsNormalized,
            CounterMetric::EventsDropped,
            CounterMetric::BatchesDeadLettered,
        ];
        for metric in counters {
            assert!(metric.name().starts_with("scanner_"));
        }
        assert_eq!(GaugeMetric::IngestQueueDepth.name(), "scanner_ingest_queue_depth");
        assert_eq!(LatencyMetric::TechnicalCycle.name(), "scanner_technical_cycle_ms");
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        increment_counter(CounterMetric::AlertsRaised, 2);
        set_gauge(GaugeMetric::UniverseSize, 12.0);
        record_latency(LatencyMetric::ActivityCycle, Duration::from_millis(5));
    }
}
