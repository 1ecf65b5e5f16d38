use analysis_core::{
    round_to, BollingerOutput, IndicatorSet, MacdOutput, MovingAverages, PriceSeries, RsiOutput,
};

use crate::indicators::*;

/// Window lengths used by `TechnicalAnalysisEngine`.
#[derive(Debug, Clone)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub bollinger_window: usize,
    pub bollinger_k: f64,
    pub sma_short: usize,
    pub sma_long: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            bollinger_window: 20,
            bollinger_k: 2.0,
            sma_short: 50,
            sma_long: 200,
        }
    }
}

/// Stateless: no upstream calls and no caching.
pub struct TechnicalAnalysisEngine {
    params: IndicatorParams,
}

impl Default for TechnicalAnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TechnicalAnalysisEngine {
    pub fn new() -> Self {
        Self {
            params: IndicatorParams::default(),
        }
    }

    pub fn analyze(&self, series: &PriceSeries) -> IndicatorSet {
        self.compute_all(&series.closes())
    }

    /// Every sequence drops its own undefined entries, so lengths differ
    /// between indicators for the same input.
    pub fn compute_all(&self, closes: &[f64]) -> IndicatorSet {
        let p = &self.params;

        let rsi_series: Vec<f64> = rsi(closes, p.rsi_period)
            .into_iter()
            .map(|v| round_to(v, 2))
            .collect();
        let rsi_latest = rsi_series.last().copied();

        let m = macd(closes, p.macd_fast, p.macd_slow, p.macd_signal);
        let hist_latest = m.histogram.last().copied();

        let bb = bollinger_bands(closes, p.bollinger_window, p.bollinger_k);

        IndicatorSet {
            rsi: RsiOutput {
                series: rsi_series,
                latest: rsi_latest,
            },
            macd: MacdOutput {
                line: m.macd_line,
                signal: m.signal_line,
                hist: m.histogram,
                hist_latest,
            },
            moving_averages: MovingAverages {
                sma_50: sma(closes, p.sma_short),
                sma_200: sma(closes, p.sma_long),
                sma50_latest: None,
                sma200_latest: None,
            },
            bollinger_bands: BollingerOutput {
                ma_latest: bb.middle.last().copied(),
                upper_latest: bb.upper.last().copied(),
                lower_latest: bb.lower.last().copied(),
                ma: bb.middle,
                upper: bb.upper,
                lower: bb.lower,
            },
        }
    }
}
