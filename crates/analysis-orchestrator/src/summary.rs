use analysis_core::{FundamentalsSnapshot, IndicatorSet, Signal, Summary};

pub const REASON_RSI_NEUTRAL: &str = "RSI in neutral-to-positive zone";
pub const REASON_RSI_OVERSOLD: &str = "RSI indicates oversold (bearish risk)";
pub const REASON_RSI_OVERBOUGHT: &str = "RSI indicates overbought (pullback risk)";
pub const REASON_MACD_POSITIVE: &str = "MACD histogram positive (bullish momentum)";
pub const REASON_PE: &str = "Reasonable P/E valuation";
pub const REASON_ROE: &str = "Healthy ROE (>12%)";
pub const REASON_DEBT: &str = "Manageable debt (D/E < 100)";

/// Rule-based score over the latest indicators and fundamentals.
///
/// Each metric is evaluated on its own; an absent metric adds neither points
/// nor a reason. Reasons keep rule order.
pub fn score(technicals: &IndicatorSet, fundamentals: &FundamentalsSnapshot) -> (i32, Vec<String>) {
    let mut score = 0;
    let mut reasons = Vec::new();

    if let Some(rsi) = technicals.rsi.latest {
        if (45.0..=60.0).contains(&rsi) {
            score += 1;
            reasons.push(REASON_RSI_NEUTRAL.to_string());
        } else if rsi < 35.0 {
            score -= 1;
            reasons.push(REASON_RSI_OVERSOLD.to_string());
        } else if rsi > 70.0 {
            score -= 1;
            reasons.push(REASON_RSI_OVERBOUGHT.to_string());
        }
    }

    if technicals.macd.hist_latest.is_some_and(|h| h > 0.0) {
        score += 1;
        reasons.push(REASON_MACD_POSITIVE.to_string());
    }

    if fundamentals.trailing_pe.is_some_and(|pe| pe > 0.0 && pe < 35.0) {
        score += 1;
        reasons.push(REASON_PE.to_string());
    }

    if fundamentals.return_on_equity.is_some_and(|roe| roe > 0.12) {
        score += 1;
        reasons.push(REASON_ROE.to_string());
    }

    if fundamentals.debt_to_equity.is_some_and(|de| de < 100.0) {
        score += 1;
        reasons.push(REASON_DEBT.to_string());
    }

    (score, reasons)
}

pub fn build_summary(technicals: IndicatorSet, fundamentals: FundamentalsSnapshot) -> Summary {
    let (score, reasons) = score(&technicals, &fundamentals);
    Summary {
        score,
        signal: Signal::from_score(score),
        reasons,
        technicals,
        fundamentals,
    }
}
