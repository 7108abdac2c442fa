//! Admin report models and filters

use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::User;
use crate::repayment::{iso_millis, LoanBalance};

/// Customer filter value meaning "no filter"
pub const ALL_CUSTOMERS: &str = "All Customers";

/// Reporting period for the repayment history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    AllTime,
    Last30Days,
    Last90Days,
    ThisYear,
    LastYear,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::AllTime => "All Time",
            TimeFilter::Last30Days => "Last 30 Days",
            TimeFilter::Last90Days => "Last 90 Days",
            TimeFilter::ThisYear => "This Year",
            TimeFilter::LastYear => "Last Year",
        }
    }

    /// `[from, to)` bounds relative to `now`, UTC. `None` is open.
    pub fn window(&self, now: DateTime<Utc>) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        match self {
            TimeFilter::AllTime => (None, None),
            TimeFilter::Last30Days => (Some(now - Duration::days(30)), None),
            TimeFilter::Last90Days => (Some(now - Duration::days(90)), None),
            TimeFilter::ThisYear => calendar_year(now.year()),
            TimeFilter::LastYear => calendar_year(now.year() - 1),
        }
    }

    pub fn contains(&self, date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let (from, to) = self.window(now);
        from.map_or(true, |from| date >= from) && to.map_or(true, |to| date < to)
    }
}

fn calendar_year(year: i32) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    (
        Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single(),
        Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single(),
    )
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "All Time" => Ok(TimeFilter::AllTime),
            "Last 30 Days" => Ok(TimeFilter::Last30Days),
            "Last 90 Days" => Ok(TimeFilter::Last90Days),
            "This Year" => Ok(TimeFilter::ThisYear),
            "Last Year" => Ok(TimeFilter::LastYear),
            other => Err(format!(
                "Invalid timeFilter: '{}'. Expected: All Time, Last 30 Days, Last 90 Days, This Year or Last Year",
                other
            )),
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query string of the repayment history report
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentHistoryQuery {
    pub time_filter: Option<String>,
    pub customer_filter: Option<String>,
}

/// Parsed history filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub period: TimeFilter,
    /// Exact customer name; `None` keeps everyone.
    pub customer: Option<String>,
}

impl HistoryFilter {
    pub fn matches_customer(&self, name: &str) -> bool {
        self.customer.as_deref().map_or(true, |customer| customer == name)
    }
}

impl TryFrom<RepaymentHistoryQuery> for HistoryFilter {
    type Error = String;

    fn try_from(query: RepaymentHistoryQuery) -> Result<Self, Self::Error> {
        let period = query
            .time_filter
            .as_deref()
            .map(str::parse)
            .transpose()?
            .unwrap_or_default();

        let customer = query
            .customer_filter
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty() && c != ALL_CUSTOMERS);

        Ok(Self { period, customer })
    }
}

/// One row of the repayment history report
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RepaymentHistoryEntry {
    pub id: Uuid,
    #[serde(serialize_with = "iso_millis")]
    pub date: DateTime<Utc>,
    pub customer: String,
    pub loan_id: Uuid,
    pub amount: f64,
    /// Stored repayments are always settled.
    pub status: &'static str,
}

/// Repayment totals for one calendar month
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyRepayments {
    /// `YYYY-MM`, UTC
    pub month: String,
    pub count: usize,
    pub total: f64,
}

/// A user with every loan they hold and the money that moved on them
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub user: User,
    pub loans: Vec<LoanBalance>,
    pub total_loaned: f64,
    pub total_repaid: f64,
}

impl UserDetails {
    pub fn new(user: User, loans: Vec<LoanBalance>) -> Self {
        let total_loaned = loans.iter().map(|l| l.loan.amount).sum();
        let total_repaid = loans.iter().map(|l| l.total_repaid).sum();
        Self {
            user,
            loans,
            total_loaned,
            total_repaid,
        }
    }
}
