use clap::{ArgGroup, Parser};
use rust_decimal::Decimal;

use crate::domain::parse_amount;
use crate::error::{Result, TargeterError};
use crate::provider::APP_ID_ENV;

#[derive(Debug, Parser)]
#[command(name = "targeter")]
#[command(about = "Tax-adjusted sale targets at the day's USD/EUR rate", long_about = None)]
#[command(group(
    ArgGroup::new("action")
        .required(true)
        .args(["print", "add", "calc", "reset", "info", "rates"]),
))]
pub struct Cli {
    /// Override targeter home directory (config/data subdirs will be created inside it).
    #[arg(long, env = "TARGETER_HOME")]
    pub home: Option<std::path::PathBuf>,

    /// Open Exchange Rates app id used when today's rate is not cached yet.
    #[arg(long = "app-id", env = APP_ID_ENV, hide_env_values = true)]
    pub app_id: Option<String>,

    /// Print every target with a total row.
    #[arg(short, long)]
    pub print: bool,

    /// Add a target: every value but the last forms the name, the last is the base value.
    #[arg(short, long, num_args = 2.., value_names = ["NAME", "BASE_VALUE"])]
    pub add: Option<Vec<String>>,

    /// Compute a target for an explicit rate without touching the ledger.
    #[arg(
        short,
        long,
        num_args = 2,
        value_names = ["BASE_VALUE", "TARGET_RATE"],
        value_parser = parse_decimal_arg,
        allow_negative_numbers = true
    )]
    pub calc: Option<Vec<Decimal>>,

    /// Remove every target.
    #[arg(short, long)]
    pub reset: bool,

    /// Show active coefficients and today's cached USD/EUR rate.
    #[arg(short, long)]
    pub info: bool,

    /// List stored daily rate snapshots, newest first.
    #[arg(long)]
    pub rates: bool,

    /// Number of snapshots shown by --rates.
    #[arg(long, default_value_t = 30, requires = "rates")]
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Print,
    Add { name: String, base_value: Decimal },
    Calc { base_value: Decimal, target_rate: Decimal },
    Reset,
    Info,
    Rates { limit: usize },
}

impl Cli {
    pub fn action(&self) -> Result<Action> {
        if let Some(values) = &self.add {
            return parse_add_values(values);
        }
        if let Some(values) = &self.calc {
            let [base_value, target_rate] = values.as_slice() else {
                return Err(TargeterError::argument(
                    "Usage: targeter --calc <BASE_VALUE> <TARGET_RATE>",
                ));
            };
            return Ok(Action::Calc {
                base_value: *base_value,
                target_rate: *target_rate,
            });
        }
        if self.print {
            return Ok(Action::Print);
        }
        if self.reset {
            return Ok(Action::Reset);
        }
        if self.info {
            return Ok(Action::Info);
        }
        if self.rates {
            return Ok(Action::Rates { limit: self.limit });
        }
        Err(TargeterError::argument(
            "No action given. Usage: targeter <-p|-a NAME... BASE_VALUE|-c BASE_VALUE TARGET_RATE|-r|-i>",
        ))
    }
}

fn parse_add_values(values: &[String]) -> Result<Action> {
    let Some((raw_value, name_parts)) = values.split_last() else {
        return Err(TargeterError::argument(
            "Usage: targeter --add <NAME>... <BASE_VALUE>",
        ));
    };
    if name_parts.is_empty() {
        return Err(TargeterError::argument(
            "Usage: targeter --add <NAME>... <BASE_VALUE>",
        ));
    }

    let base_value = parse_amount(raw_value).ok_or_else(|| {
        TargeterError::argument(format!(
            "Invalid base value: {raw_value}. Usage: targeter --add <NAME>... <BASE_VALUE>"
        ))
    })?;

    Ok(Action::Add {
        name: name_parts.join(" "),
        base_value,
    })
}

fn parse_decimal_arg(raw: &str) -> std::result::Result<Decimal, String> {
    parse_amount(raw).ok_or_else(|| format!("invalid number: {raw}"))
}
