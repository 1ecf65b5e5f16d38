/// Simple Moving Average
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let sum: f64 = data[i + 1 - period..=i].iter().sum();
        result.push(sum / period as f64);
    }
    result
}

/// Rolling sample standard deviation (n - 1 denominator), aligned with `sma`.
pub fn rolling_std(data: &[f64], period: usize) -> Vec<f64> {
    if period < 2 || data.len() < period {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    for i in period - 1..data.len() {
        let slice = &data[i + 1 - period..=i];
        let mean = slice.iter().sum::<f64>() / period as f64;
        let variance = slice.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - 1) as f64;
        result.push(variance.sqrt());
    }
    result
}

/// Exponential Moving Average, seeded with the first value (no SMA warm-up):
/// `ema[i] = a * x[i] + (1 - a) * ema[i - 1]`, `a = 2 / (span + 1)`.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    if span == 0 || data.is_empty() {
        return vec![];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut result = Vec::with_capacity(data.len());
    result.push(data[0]);

    for i in 1..data.len() {
        let ema_val = alpha * data[i] + (1.0 - alpha) * result[i - 1];
        result.push(ema_val);
    }

    result
}

/// Relative Strength Index over simple rolling means of gains and losses.
///
/// Output is aligned with `data`: the first `period` entries are `None`, and so
/// is every window whose average loss is zero (the ratio is undefined there).
pub fn rsi_aligned(data: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; data.len()];
    if period == 0 || data.len() <= period {
        return out;
    }

    let mut gains = Vec::with_capacity(data.len() - 1);
    let mut losses = Vec::with_capacity(data.len() - 1);
    for i in 1..data.len() {
        let change = data[i] - data[i - 1];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    // deltas[j] belongs to data[j + 1]
    for j in period - 1..gains.len() {
        let avg_gain = gains[j + 1 - period..=j].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[j + 1 - period..=j].iter().sum::<f64>() / period as f64;
        if avg_loss == 0.0 {
            continue;
        }
        let rs = avg_gain / avg_loss;
        let value = 100.0 - (100.0 / (1.0 + rs));
        if value.is_finite() {
            out[j + 1] = Some(value);
        }
    }

    out
}

/// RSI values with undefined entries removed.
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    rsi_aligned(data, period).into_iter().flatten().collect()
}

/// MACD (Moving Average Convergence Divergence)
pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// All three series are aligned with `data`; first-value-seeded EMAs leave no
/// undefined prefix.
pub fn macd(data: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> MacdResult {
    if fast_period == 0 || slow_period == 0 || signal_period == 0 || data.is_empty() {
        return MacdResult { macd_line: vec![], signal_line: vec![], histogram: vec![] };
    }

    let ema_fast = ema(data, fast_period);
    let ema_slow = ema(data, slow_period);

    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal_period);

    let histogram = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();

    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

/// Bollinger Bands
pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Middle band is `sma(period)`; the width uses the rolling sample standard deviation.
pub fn bollinger_bands(data: &[f64], period: usize, std_dev: f64) -> BollingerBands {
    if period < 2 || data.len() < period {
        return BollingerBands { upper: vec![], middle: vec![], lower: vec![] };
    }

    let middle = sma(data, period);
    let stds = rolling_std(data, period);

    let upper = middle.iter().zip(&stds).map(|(m, s)| m + std_dev * s).collect();
    let lower = middle.iter().zip(&stds).map(|(m, s)| m - std_dev * s).collect();

    BollingerBands {
        upper,
        middle,
        lower,
    }
}
