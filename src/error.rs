use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TargeterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Invalid rate {0}: target rate must be greater than zero")]
    InvalidRate(Decimal),

    #[error("Amount out of range: {0}")]
    Overflow(String),

    #[error("Rate API returned no rates: {0}")]
    NoRatesAvailable(String),

    #[error("No USD/EUR rate available for {date}: {reason}")]
    RateUnavailable { date: NaiveDate, reason: String },

    #[error("{message}")]
    Argument { message: String },

    #[error("Rate request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),
}

impl TargeterError {
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument {
            message: message.into(),
        }
    }

    pub fn rate_unavailable(date: NaiveDate, reason: impl Into<String>) -> Self {
        Self::RateUnavailable {
            date,
            reason: reason.into(),
        }
    }

    /// Process exit status used when this error reaches the command boundary.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Argument { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, TargeterError>;
