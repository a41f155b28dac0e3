//! Purchase schedule parameters

use anyhow::{Result, anyhow, bail};
use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// Moves `day` forward by one period. Month steps clamp to the last day
    /// of the target month.
    pub fn advance(&self, day: NaiveDate) -> NaiveDate {
        let next = match self {
            Frequency::Daily => day.checked_add_days(Days::new(1)),
            Frequency::Weekly => day.checked_add_days(Days::new(7)),
            Frequency::Monthly => day.checked_add_months(Months::new(1)),
        };
        next.unwrap_or(NaiveDate::MAX)
    }
}

impl Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Frequency::Daily => "daily",
                Frequency::Weekly => "weekly",
                Frequency::Monthly => "monthly",
            }
        )
    }
}

impl FromStr for Frequency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" | "d" => Ok(Frequency::Daily),
            "weekly" | "w" => Ok(Frequency::Weekly),
            "monthly" | "m" => Ok(Frequency::Monthly),
            _ => Err(anyhow!("Invalid frequency: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleParameters {
    pub amount_per_purchase: f64,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScheduleParameters {
    pub fn new(
        amount_per_purchase: f64,
        frequency: Frequency,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Self> {
        if !amount_per_purchase.is_finite() || amount_per_purchase <= 0.0 {
            bail!("Purchase amount must be positive, got {amount_per_purchase}");
        }
        if start_date > end_date {
            bail!("Start date {start_date} is after end date {end_date}");
        }
        Ok(Self {
            amount_per_purchase,
            frequency,
            start_date,
            end_date,
        })
    }
}
