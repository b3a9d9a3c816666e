use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{Result, TargeterError};

/// One calendar day of USD-based rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub date: NaiveDate,
    /// EUR per 1 USD.
    pub eur: Decimal,
    /// Always 1: USD is the base currency.
    pub usd: Decimal,
    /// GBP per 1 USD.
    pub gbp: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: i64,
    pub name: String,
    pub base_value: Decimal,
    pub target_value: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub base_value: Decimal,
    pub target_value: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub targets: Vec<Target>,
    pub total: Totals,
}

impl Report {
    pub fn from_targets(targets: Vec<Target>) -> Result<Self> {
        let mut total = Totals::default();
        for t in &targets {
            total.base_value = total
                .base_value
                .checked_add(t.base_value)
                .ok_or_else(|| TargeterError::Overflow("base value total".into()))?;
            total.target_value = total
                .target_value
                .checked_add(t.target_value)
                .ok_or_else(|| TargeterError::Overflow("target value total".into()))?;
        }
        Ok(Self { targets, total })
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Parses a user-supplied amount such as `1500`, `1500.25` or `1e3`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    raw.parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}
