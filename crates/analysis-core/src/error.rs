use std::fmt;

use thiserror::Error;

use crate::{Interval, Period};

/// How a single resolution attempt ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    /// Upstream answered, but with no usable data.
    Empty,
    /// Transport or parse failure for this attempt.
    Failed(String),
}

/// One (candidate, period, interval) pair tried while resolving a symbol.
/// `period`/`interval` are `None` for fundamentals lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub candidate: String,
    pub period: Option<Period>,
    pub interval: Option<Interval>,
    pub outcome: AttemptOutcome,
}

impl Attempt {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Failed(_))
    }
}

impl fmt::Display for Attempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.period, self.interval) {
            (Some(p), Some(iv)) => write!(f, "{}({},{})", self.candidate, p, iv)?,
            _ => write!(f, "{}", self.candidate)?,
        }
        if let AttemptOutcome::Failed(reason) = &self.outcome {
            write!(f, " [error: {}]", reason)?;
        }
        Ok(())
    }
}

fn join_attempts(attempts: &[Attempt]) -> String {
    attempts
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No price history found for symbol: {symbol}. Tried: {}", join_attempts(.attempts))]
    HistoryNotFound { symbol: String, attempts: Vec<Attempt> },

    #[error("Could not fetch fundamentals for symbol: {symbol}. Tried: {}", join_attempts(.attempts))]
    InfoNotFound { symbol: String, attempts: Vec<Attempt> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("API error: {0}")]
    ApiError(String),
}

impl AnalysisError {
    /// True for resolver exhaustion, i.e. the user-facing "symbol not found" condition.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AnalysisError::HistoryNotFound { .. } | AnalysisError::InfoNotFound { .. }
        )
    }

    pub fn attempts(&self) -> &[Attempt] {
        match self {
            AnalysisError::HistoryNotFound { attempts, .. }
            | AnalysisError::InfoNotFound { attempts, .. } => attempts,
            _ => &[],
        }
    }
}
