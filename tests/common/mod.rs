//! Shared helpers for integration tests.

use tradelang::adapters::spot_indicator_adapter::SpotIndicatorAdapter;
use tradelang::adapters::stream_action_adapter::StreamActionAdapter;
use tradelang::domain::candle::Candle;
use tradelang::domain::error::TradeLangError;
use tradelang::domain::runner::run_source;

/// The reference host's candle: a Monday morning bar.
pub fn sample_candle() -> Candle {
    Candle {
        open: 100.0,
        high: 110.0,
        low: 95.0,
        close: 108.0,
        volume: 1_000_000.0,
        date: 20_251_117,
        time: 940,
        hour: 9,
        minute: 40,
        weekday: 1,
    }
}

/// Run a program against a candle and return the emitted trade lines.
pub fn run_lines(source: &str, candle: Candle) -> Result<Vec<String>, TradeLangError> {
    let mut sink = StreamActionAdapter::new(Vec::new());
    run_source(source, candle, &SpotIndicatorAdapter, &mut sink)?;
    let output = String::from_utf8(sink.into_inner()).expect("sink output is utf-8");
    Ok(output.lines().map(str::to_string).collect())
}
