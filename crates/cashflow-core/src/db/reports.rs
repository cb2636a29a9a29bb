//! Report queries: fetch the visible row set, delegate to the engine
//!
//! All math lives in [`crate::reports`]; this module only resolves periods,
//! fetches rows through the transaction filter, and hands them over.

use chrono::{Days, NaiveDate, Utc};

use super::{Database, TransactionFilter};
use crate::error::Result;
use crate::models::TransactionType;
use crate::reports::{
    self, CategoryBreakdownReport, MonthlyReport, ReportPeriod, SummaryReport, TrendGranularity,
    TrendReport, DEFAULT_SUMMARY_DAYS,
};

/// Default period for summary and breakdown reports: the trailing
/// [`DEFAULT_SUMMARY_DAYS`] days including today.
pub fn default_period(today: NaiveDate) -> ReportPeriod {
    ReportPeriod {
        start_date: today - Days::new(DEFAULT_SUMMARY_DAYS - 1),
        end_date: today,
    }
}

impl Database {
    /// Summary report over an explicit or default period
    pub fn summary_report(
        &self,
        user_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<SummaryReport> {
        let period = resolve_period(start_date, end_date);
        let filter = TransactionFilter::new().between(period.start_date, period.end_date);
        let rows = self.visible_transactions(user_id, &filter)?;
        Ok(reports::summary(&rows, period))
    }

    /// Category breakdown over an explicit or default period, optionally
    /// restricted to one transaction type
    pub fn category_breakdown_report(
        &self,
        user_id: i64,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        kind: Option<TransactionType>,
    ) -> Result<CategoryBreakdownReport> {
        let period = resolve_period(start_date, end_date);
        let mut filter = TransactionFilter::new().between(period.start_date, period.end_date);
        filter.kind = kind;
        let rows = self.visible_transactions(user_id, &filter)?;
        let categories = self.list_categories(user_id)?;
        Ok(reports::by_category(&rows, &categories, period))
    }

    /// Trailing calendar-month history (default 12 months)
    pub fn monthly_report(&self, user_id: i64, months: u32) -> Result<MonthlyReport> {
        let today = Utc::now().date_naive();
        // Fetch only what the window can use; the engine re-buckets by month
        let probe = reports::monthly_history(&[], months, today);
        let filter = TransactionFilter::new()
            .between(probe.period.start_date, probe.period.end_date);
        let rows = self.visible_transactions(user_id, &filter)?;
        Ok(reports::monthly_history(&rows, months, today))
    }

    /// Trend report at the requested granularity
    pub fn trends_report(
        &self,
        user_id: i64,
        granularity: TrendGranularity,
    ) -> Result<TrendReport> {
        let today = Utc::now().date_naive();
        let probe = reports::trends(&[], granularity, today);
        let filter = TransactionFilter::new()
            .between(probe.period.start_date, probe.period.end_date);
        let rows = self.visible_transactions(user_id, &filter)?;
        Ok(reports::trends(&rows, granularity, today))
    }
}

fn resolve_period(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> ReportPeriod {
    let today = Utc::now().date_naive();
    match (start_date, end_date) {
        (Some(start), Some(end)) => ReportPeriod {
            start_date: start,
            end_date: end,
        },
        (Some(start), None) => ReportPeriod {
            start_date: start,
            end_date: today,
        },
        (None, Some(end)) => ReportPeriod {
            start_date: end - Days::new(DEFAULT_SUMMARY_DAYS - 1),
            end_date: end,
        },
        (None, None) => default_period(today),
    }
}
