use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::domain::{RateSnapshot, parse_amount};
use crate::error::{Result, TargeterError};

pub const APP_ID_ENV: &str = "OPEN_EXCHANGE_RATES_APP_ID";

/// Source of the latest USD-based exchange rates.
pub trait RateProvider {
    fn fetch_latest(&self) -> Result<LatestRates>;
}

/// Currency code to units per 1 USD.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestRates {
    rates: HashMap<String, Decimal>,
}

impl LatestRates {
    pub fn new(rates: HashMap<String, Decimal>) -> Self {
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<Decimal> {
        self.rates.get(code).copied()
    }

    /// Picks the EUR and GBP quotes out for `date`. USD is fixed at 1.
    pub fn snapshot(&self, date: NaiveDate) -> Result<RateSnapshot> {
        let pick = |code: &str| match self.get(code) {
            Some(rate) if rate > Decimal::ZERO => Ok(rate),
            Some(rate) => Err(TargeterError::NoRatesAvailable(format!(
                "{code} quote {rate} is not positive"
            ))),
            None => Err(TargeterError::NoRatesAvailable(format!(
                "response has no {code} quote"
            ))),
        };

        Ok(RateSnapshot {
            date,
            eur: pick("EUR")?,
            usd: Decimal::ONE,
            gbp: pick("GBP")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: Option<HashMap<String, serde_json::Number>>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Open Exchange Rates `latest.json` client.
pub struct OpenExchangeRates {
    client: Client,
    base_url: String,
    app_id: Option<String>,
}

impl OpenExchangeRates {
    pub fn new(base_url: &str, app_id: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("targeter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut base_url = base_url.trim().to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            app_id: app_id.filter(|id| !id.trim().is_empty()),
        })
    }

    fn latest_url(&self) -> String {
        format!("{}latest.json", self.base_url)
    }
}

impl RateProvider for OpenExchangeRates {
    fn fetch_latest(&self) -> Result<LatestRates> {
        let Some(app_id) = self.app_id.as_deref() else {
            return Err(TargeterError::InvalidConfiguration(format!(
                "{APP_ID_ENV} is not set; it is required to fetch rates"
            )));
        };

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        pb.set_message("Fetching latest exchange rates...");

        let url = self.latest_url();
        debug!(%url, "requesting latest rates");
        let sent = self
            .client
            .get(&url)
            .query(&[("app_id", app_id)])
            .send()
            .and_then(|resp| {
                let status = resp.status();
                resp.text().map(|body| (status, body))
            });
        pb.finish_and_clear();

        let (status, body) = sent?;
        debug!(status = status.as_u16(), bytes = body.len(), "rates response received");
        decode_latest(status.as_u16(), &body)
    }
}

fn decode_latest(status: u16, body: &str) -> Result<LatestRates> {
    let parsed: LatestResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(status, %err, "rates response is not valid JSON");
            return Err(TargeterError::NoRatesAvailable(format!(
                "HTTP {status}, unreadable body ({err})"
            )));
        }
    };

    let Some(raw_rates) = parsed.rates else {
        let detail = parsed
            .description
            .or(parsed.message)
            .unwrap_or_else(|| "response has no `rates` field".to_string());
        warn!(status, %detail, "rates response carried no rates");
        return Err(TargeterError::NoRatesAvailable(format!("HTTP {status}: {detail}")));
    };

    let mut rates = HashMap::with_capacity(raw_rates.len());
    for (code, number) in raw_rates {
        match parse_amount(&number.to_string()) {
            Some(rate) => {
                rates.insert(code, rate);
            }
            None => warn!(%code, %number, "skipping unparsable rate"),
        }
    }
    Ok(LatestRates::new(rates))
}
