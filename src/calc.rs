use rust_decimal::Decimal;

use crate::error::{Result, TargeterError};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Percentage deductions applied on top of a base value, validated once on load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deductions {
    tax_rate: Decimal,
    additional_withhold: Decimal,
}

impl Deductions {
    /// Both percentages must lie in `[0, 100)`.
    pub fn new(tax_rate: Decimal, additional_withhold: Decimal) -> Result<Self> {
        check_percentage("tax_rate", tax_rate)?;
        check_percentage("additional_withhold", additional_withhold)?;
        Ok(Self {
            tax_rate,
            additional_withhold,
        })
    }

    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            tax_rate: Decimal::ZERO,
            additional_withhold: Decimal::ZERO,
        }
    }

    pub fn tax_rate(&self) -> Decimal {
        self.tax_rate
    }

    pub fn additional_withhold(&self) -> Decimal {
        self.additional_withhold
    }
}

fn check_percentage(field: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO || value >= HUNDRED {
        return Err(TargeterError::InvalidConfiguration(format!(
            "{field} must be at least 0 and below 100 (got {value})"
        )));
    }
    Ok(())
}

/// Grosses `base_value` up by the withholding, then by the tax rate, and
/// converts it at `target_rate`.
///
/// The two deductions compound; `1/(1-a)/(1-b)` is not `1/(1-(a+b))`.
pub fn calculate_target(
    base_value: Decimal,
    target_rate: Decimal,
    deductions: &Deductions,
) -> Result<Decimal> {
    if target_rate <= Decimal::ZERO {
        return Err(TargeterError::InvalidRate(target_rate));
    }

    let withheld = gross_up(base_value, deductions.additional_withhold)?;
    let taxed = gross_up(withheld, deductions.tax_rate)?;
    taxed.checked_div(target_rate).ok_or_else(|| {
        TargeterError::Overflow(format!("{base_value} at rate {target_rate}"))
    })
}

fn gross_up(value: Decimal, percent: Decimal) -> Result<Decimal> {
    if percent.is_zero() {
        return Ok(value);
    }
    value
        .checked_div(Decimal::ONE - percent / HUNDRED)
        .ok_or_else(|| TargeterError::Overflow(format!("{value} grossed up by {percent}%")))
}
