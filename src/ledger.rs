use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::calc::{Deductions, calculate_target};
use crate::db::Db;
use crate::domain::{RateSnapshot, Report, Target};
use crate::error::{Result, TargeterError};
use crate::provider::RateProvider;

/// Active coefficients plus whatever USD/EUR rate is cached for the day.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerInfo {
    pub deductions: Deductions,
    pub date: NaiveDate,
    pub usd_eur: Option<Decimal>,
}

pub struct Ledger {
    db: Db,
    deductions: Deductions,
}

impl Ledger {
    pub fn new(db: Db, deductions: Deductions) -> Self {
        Self { db, deductions }
    }

    /// USD/EUR for `date`, fetching and caching today's rates on a miss.
    pub fn rate_for(&self, date: NaiveDate, provider: &dyn RateProvider) -> Result<Decimal> {
        if let Some(rate) = self.db.get_rate_for_date(date)? {
            debug!(%date, %rate, "rate cache hit");
            return Ok(rate);
        }

        debug!(%date, "rate cache miss, fetching latest rates");
        let snapshot = provider
            .fetch_latest()
            .and_then(|latest| latest.snapshot(date))
            .map_err(|err| match err {
                TargeterError::NoRatesAvailable(reason) => {
                    TargeterError::rate_unavailable(date, reason)
                }
                other => other,
            })?;

        self.db.record_snapshot(&snapshot)?;
        info!(%date, eur = %snapshot.eur, gbp = %snapshot.gbp, "recorded rate snapshot");

        self.db
            .get_rate_for_date(date)?
            .ok_or_else(|| TargeterError::rate_unavailable(date, "snapshot was not stored"))
    }

    pub fn add(
        &self,
        name: &str,
        base_value: Decimal,
        today: NaiveDate,
        provider: &dyn RateProvider,
    ) -> Result<Target> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TargeterError::argument("Target name must not be empty"));
        }

        let (target, usd_eur) = self.db.atomically(|| {
            let usd_eur = self.rate_for(today, provider)?;
            let target_value = calculate_target(base_value, usd_eur, &self.deductions)?;
            let target = self.db.insert_target(name, base_value, target_value)?;
            Ok((target, usd_eur))
        })?;
        let target_value = target.target_value;
        info!(id = target.id, name, %base_value, %target_value, %usd_eur, "added target");
        Ok(target)
    }

    pub fn report(&self) -> Result<Report> {
        Report::from_targets(self.db.list_targets()?)
    }

    pub fn reset(&mut self) -> Result<usize> {
        let removed = self.db.clear_targets()?;
        info!(removed, "cleared targets");
        Ok(removed)
    }

    pub fn calc(&self, base_value: Decimal, target_rate: Decimal) -> Result<Decimal> {
        calculate_target(base_value, target_rate, &self.deductions)
    }

    /// Never reaches the network.
    pub fn info(&self, today: NaiveDate) -> Result<LedgerInfo> {
        Ok(LedgerInfo {
            deductions: self.deductions,
            date: today,
            usd_eur: self.db.get_rate_for_date(today)?,
        })
    }

    pub fn rates(&self, limit: usize) -> Result<Vec<RateSnapshot>> {
        self.db.list_snapshots(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::LatestRates;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    fn today() -> NaiveDate {
        "2026-10-19".parse().unwrap()
    }

    struct FakeProvider {
        rates: Option<Vec<(&'static str, &'static str)>>,
        calls: Cell<usize>,
    }

    impl FakeProvider {
        fn with(rates: &[(&'static str, &'static str)]) -> Self {
            Self {
                rates: Some(rates.to_vec()),
                calls: Cell::new(0),
            }
        }

        fn without_rates() -> Self {
            Self {
                rates: None,
                calls: Cell::new(0),
            }
        }
    }

    impl RateProvider for FakeProvider {
        fn fetch_latest(&self) -> Result<LatestRates> {
            self.calls.set(self.calls.get() + 1);
            match &self.rates {
                Some(rates) => Ok(LatestRates::new(
                    rates
                        .iter()
                        .map(|(code, rate)| (code.to_string(), dec(rate)))
                        .collect::<HashMap<_, _>>(),
                )),
                None => Err(TargeterError::NoRatesAvailable(
                    "response has no `rates` field".into(),
                )),
            }
        }
    }

    fn ledger(tax: &str, withhold: &str) -> Ledger {
        let deductions = Deductions::new(dec(tax), dec(withhold)).unwrap();
        Ledger::new(Db::open_in_memory().unwrap(), deductions)
    }

    #[test]
    fn miss_fetches_once_then_hits_cache() {
        let ledger = ledger("0", "0");
        let provider = FakeProvider::with(&[("EUR", "0.8"), ("GBP", "0.75")]);

        assert_eq!(ledger.rate_for(today(), &provider).unwrap(), dec("0.8"));
        assert_eq!(ledger.rate_for(today(), &provider).unwrap(), dec("0.8"));
        assert_eq!(provider.calls.get(), 1);
        assert_eq!(ledger.rates(10).unwrap().len(), 1);
    }

    #[test]
    fn cached_rate_never_calls_provider() {
        let ledger = ledger("0", "0");
        ledger
            .db
            .record_snapshot(&RateSnapshot {
                date: today(),
                eur: dec("0.9"),
                usd: Decimal::ONE,
                gbp: dec("0.8"),
            })
            .unwrap();

        let provider = FakeProvider::without_rates();
        let target = ledger.add("Camera", dec("90"), today(), &provider).unwrap();
        assert_eq!(target.target_value, dec("100"));
        assert_eq!(provider.calls.get(), 0);
    }

    #[test]
    fn missing_rates_surface_as_rate_unavailable() {
        let ledger = ledger("0", "0");
        let provider = FakeProvider::without_rates();

        let err = ledger.add("Camera", dec("90"), today(), &provider).unwrap_err();
        assert!(matches!(err, TargeterError::RateUnavailable { date, .. } if date == today()));
        assert!(ledger.report().unwrap().is_empty());
        assert!(ledger.rates(10).unwrap().is_empty());
    }

    #[test]
    fn zero_quote_is_not_cached_and_next_add_refetches() {
        let ledger = ledger("0", "0");
        let broken = FakeProvider::with(&[("EUR", "0"), ("GBP", "0.75")]);

        let err = ledger.add("Camera", dec("90"), today(), &broken).unwrap_err();
        assert!(matches!(err, TargeterError::RateUnavailable { .. }), "{err:?}");
        assert_eq!(ledger.info(today()).unwrap().usd_eur, None);

        let healthy = FakeProvider::with(&[("EUR", "0.9"), ("GBP", "0.75")]);
        let target = ledger.add("Camera", dec("90"), today(), &healthy).unwrap();
        assert_eq!(target.target_value, dec("100"));
        assert_eq!(healthy.calls.get(), 1);
    }

    #[test]
    fn failed_add_rolls_back_fetched_snapshot() {
        let ledger = ledger("20", "0");
        let provider = FakeProvider::with(&[("EUR", "0.5"), ("GBP", "0.4")]);

        let err = ledger
            .add("Yacht", dec("70000000000000000000000000000"), today(), &provider)
            .unwrap_err();
        assert!(matches!(err, TargeterError::Overflow(_)), "{err:?}");
        assert!(ledger.rates(10).unwrap().is_empty());
        assert!(ledger.report().unwrap().is_empty());
    }

    #[test]
    fn missing_eur_quote_is_rate_unavailable() {
        let ledger = ledger("0", "0");
        let provider = FakeProvider::with(&[("GBP", "0.75")]);

        let err = ledger.rate_for(today(), &provider).unwrap_err();
        assert!(matches!(err, TargeterError::RateUnavailable { .. }));
    }

    #[test]
    fn add_applies_deductions_at_the_day_rate() {
        let ledger = ledger("20", "0");
        let provider = FakeProvider::with(&[("EUR", "2.0"), ("GBP", "1.5")]);

        let target = ledger.add("  Piano  ", dec("100"), today(), &provider).unwrap();
        assert_eq!(target.name, "Piano");
        assert_eq!(target.target_value, dec("62.5"));
    }

    #[test]
    fn report_totals_match_rows() {
        let ledger = ledger("10", "5");
        let provider = FakeProvider::with(&[("EUR", "0.92"), ("GBP", "0.79")]);

        let a = ledger.add("Laptop", dec("1200"), today(), &provider).unwrap();
        let b = ledger.add("Bike", dec("340.5"), today(), &provider).unwrap();

        let report = ledger.report().unwrap();
        assert_eq!(report.targets, vec![a.clone(), b.clone()]);
        assert_eq!(report.total.base_value, a.base_value + b.base_value);
        assert_eq!(report.total.target_value, a.target_value + b.target_value);
    }

    #[test]
    fn reset_empties_the_ledger() {
        let mut ledger = ledger("0", "0");
        let provider = FakeProvider::with(&[("EUR", "0.92"), ("GBP", "0.79")]);
        ledger.add("One", dec("1"), today(), &provider).unwrap();
        ledger.add("Two", dec("2"), today(), &provider).unwrap();

        assert_eq!(ledger.reset().unwrap(), 2);
        let report = ledger.report().unwrap();
        assert!(report.is_empty());
        assert!(report.total.base_value.is_zero());
        assert!(report.total.target_value.is_zero());

        // Cached rates survive a reset.
        assert_eq!(ledger.rates(10).unwrap().len(), 1);
    }

    #[test]
    fn empty_name_is_an_argument_error() {
        let ledger = ledger("0", "0");
        let provider = FakeProvider::with(&[("EUR", "0.92"), ("GBP", "0.79")]);

        let err = ledger.add("   ", dec("1"), today(), &provider).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert_eq!(provider.calls.get(), 0);
    }

    #[test]
    fn info_reports_cached_rate_without_fetching() {
        let ledger = ledger("19", "3");
        let provider = FakeProvider::with(&[("EUR", "0.92"), ("GBP", "0.79")]);

        assert_eq!(ledger.info(today()).unwrap().usd_eur, None);
        ledger.rate_for(today(), &provider).unwrap();

        let info = ledger.info(today()).unwrap();
        assert_eq!(info.usd_eur, Some(dec("0.92")));
        assert_eq!(info.deductions.tax_rate(), dec("19"));
    }

    #[test]
    fn calc_rejects_non_positive_rate() {
        let ledger = ledger("0", "0");
        assert!(matches!(
            ledger.calc(dec("100"), Decimal::ZERO),
            Err(TargeterError::InvalidRate(_))
        ));
    }
}
